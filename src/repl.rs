use crate::ast::Stmt;
use crate::config::InterpreterConfig;
use crate::console::StdConsole;
use crate::evaluator::Evaluator;
use crate::runner::compile;
use crate::stdlib::Registry;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Interactive loop. One evaluator lives for the whole session, so
/// variables and functions persist between lines.
pub fn start(config: InterpreterConfig) {
    println!("Flex Interpreter v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl+D to quit");
    println!();

    let mut evaluator = Evaluator::new(
        Arc::new(Registry::standard()),
        Box::new(StdConsole::new()),
        config,
    );

    let stdin = io::stdin();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    println!("Goodbye!");
                    break;
                }
                run_line(line, &mut evaluator);
            }
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
        }
    }
}

/// Missing trailing semicolons are supplied so `1 + 2` works at the prompt.
fn complete_line(line: &str) -> String {
    if line.ends_with(';') || line.ends_with('}') {
        line.to_string()
    } else {
        format!("{};", line)
    }
}

fn run_line(line: &str, evaluator: &mut Evaluator) {
    let source = complete_line(line);
    let program = match compile(&source) {
        Ok(program) => program,
        Err(error) => {
            error.report(&source, None);
            return;
        }
    };

    let echo = matches!(program.statements.as_slice(), [Stmt::Expression { .. }]);
    match evaluator.execute_program(&program) {
        Ok(value) if echo => println!("{}", value),
        Ok(_) => {}
        Err(error) => error.report(&source, None),
    }
}
