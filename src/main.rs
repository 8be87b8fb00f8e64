use clap::{value_parser, Arg, ArgAction, Command};
use flex::{
    AssignScope, DebugController, DebugSnapshot, DebugState, InterpreterConfig, Registry,
    SourceView, StdConsole,
};
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let matches = Command::new("flex")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Interpreter and stepping debugger for the Flex scripting language")
        .arg(
            Arg::new("file")
                .help("The script file to execute")
                .value_name("FILE")
                .index(1),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .help("Start in interactive REPL mode")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .help("Report every syntax error without running the script")
                .requires("file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Step through the script in a terminal debug session")
                .requires("file")
                .conflicts_with("check")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("break")
                .short('b')
                .long("break")
                .value_name("LINE")
                .help("Set a breakpoint before the debug session starts")
                .requires("debug")
                .value_parser(value_parser!(usize))
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .value_name("N")
                .help("Maximum nesting of user function calls")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("global-assign")
                .long("global-assign")
                .help("Assignments to undeclared names create globals")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .help("Seed for random()")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("yield")
                .long("yield")
                .help("Yield the thread on every loop iteration")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    init_tracing();

    let mut config = InterpreterConfig::default().with_loop_yield(matches.get_flag("yield"));
    if let Some(depth) = matches.get_one::<usize>("max-depth") {
        config = config.with_max_call_depth(*depth);
    }
    if matches.get_flag("global-assign") {
        config = config.with_assign_scope(AssignScope::Global);
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config = config.with_seed(*seed);
    }

    match matches.get_one::<String>("file") {
        Some(file_path) => {
            let source = match read_source(file_path) {
                Ok(source) => source,
                Err(code) => return code,
            };
            if matches.get_flag("check") {
                check_file(&source, file_path)
            } else if matches.get_flag("debug") {
                let breakpoints = matches
                    .get_many::<usize>("break")
                    .map(|lines| lines.copied().collect())
                    .unwrap_or_default();
                debug_file(&source, breakpoints, config)
            } else if flex::run(&source, Some(file_path), config) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        None => {
            flex::start_repl(config);
            ExitCode::SUCCESS
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Only initialize if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn read_source(path: &str) -> Result<String, ExitCode> {
    let path = Path::new(path);

    if !path.exists() {
        eprintln!("Error: File '{}' not found", path.display());
        return Err(ExitCode::FAILURE);
    }

    fs::read_to_string(path).map_err(|e| {
        eprintln!("Error reading file '{}': {}", path.display(), e);
        ExitCode::FAILURE
    })
}

fn check_file(source: &str, path: &str) -> ExitCode {
    let errors = flex::check(source);
    for error in &errors {
        error.report(source, Some(path));
    }

    if errors.is_empty() {
        println!("{}: no errors", path);
        ExitCode::SUCCESS
    } else {
        eprintln!("{}: {} error(s)", path, errors.len());
        ExitCode::FAILURE
    }
}

/// Source listing driven by the debug session.
struct TerminalView {
    lines: Vec<String>,
    breakpoints: BTreeSet<usize>,
}

impl TerminalView {
    fn toggle(&mut self, line: usize) -> bool {
        if self.breakpoints.remove(&line) {
            false
        } else {
            self.breakpoints.insert(line);
            true
        }
    }
}

impl SourceView for TerminalView {
    fn breakpoints(&self) -> BTreeSet<usize> {
        self.breakpoints.clone()
    }

    fn highlight_line(&mut self, line: usize) {
        let first = line.saturating_sub(2).max(1);
        let last = (line + 2).min(self.lines.len());
        for number in first..=last {
            let marker = if number == line { "->" } else { "  " };
            let dot = if self.breakpoints.contains(&number) { "*" } else { " " };
            let text = self.lines.get(number - 1).map(String::as_str).unwrap_or("");
            println!("{}{} {:>4} | {}", marker, dot, number, text);
        }
    }

    fn show_snapshot(&mut self, snapshot: &DebugSnapshot) {
        if !snapshot.variables.is_empty() {
            println!("  variables:");
            for (name, value) in &snapshot.variables {
                println!("    {} = {}", name, value);
            }
        }
        println!("  stack: {}", snapshot.call_stack.join(" <- "));
    }
}

const DEBUG_HELP: &str = "commands: s(tep) n(ext) o(ut) c(ontinue) b <line> q(uit)";

fn debug_file(source: &str, breakpoints: BTreeSet<usize>, config: InterpreterConfig) -> ExitCode {
    let view = TerminalView {
        lines: source.lines().map(str::to_string).collect(),
        breakpoints,
    };
    let mut controller = DebugController::new(view, Arc::new(Registry::standard()), config);

    println!("{}", DEBUG_HELP);
    let mut state = match controller.debug(source, Box::new(StdConsole::new())) {
        Ok(state) => state,
        Err(error) => {
            eprintln!("Error: {}", error);
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    while matches!(state, DebugState::Paused | DebugState::Running) {
        let prompt = match controller.awaiting_input() {
            Some(prompt) => prompt.to_string(),
            None => "(debug) ".to_string(),
        };
        print!("{}", prompt);
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => {
                state = controller.stop();
                break;
            }
            Ok(_) => {}
        }
        let line = line.trim_end_matches(&['\n', '\r'][..]);

        if controller.awaiting_input().is_some() {
            state = match controller.provide_input(line) {
                Ok(state) => state,
                Err(error) => {
                    eprintln!("Error: {}", error);
                    controller.state()
                }
            };
            continue;
        }

        let result = match line.trim() {
            "s" | "step" => controller.step_into(),
            "n" | "next" => controller.step_over(),
            "o" | "out" => controller.step_out(),
            "c" | "continue" => controller.resume(),
            "q" | "quit" => Ok(controller.stop()),
            command if command.starts_with('b') => {
                match command[1..].trim().parse::<usize>() {
                    Ok(number) => {
                        let set = controller.view_mut().toggle(number);
                        println!(
                            "breakpoint {} line {}",
                            if set { "set at" } else { "cleared from" },
                            number
                        );
                    }
                    Err(_) => println!("usage: b <line>"),
                }
                Ok(controller.state())
            }
            _ => {
                println!("{}", DEBUG_HELP);
                Ok(controller.state())
            }
        };

        state = match result {
            Ok(state) => state,
            Err(error) => {
                eprintln!("Error: {}", error);
                controller.state()
            }
        };
    }

    if let Some(error) = controller.last_error() {
        error.report(source, None);
        return ExitCode::FAILURE;
    }
    println!("session {}", state);
    ExitCode::SUCCESS
}
