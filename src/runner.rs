use crate::ast::Program;
use crate::config::InterpreterConfig;
use crate::console::StdConsole;
use crate::error::FlexError;
use crate::evaluator::Evaluator;
use crate::lexer::tokenize;
use crate::parser::Parser;
use crate::stdlib::Registry;
use crate::value::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Structured result of one run.
#[derive(Debug)]
pub struct RunOutcome {
    pub succeeded: bool,
    /// Value of the last top-level expression statement, or the error that
    /// ended the run.
    pub value: Result<Value, FlexError>,
    pub elapsed: Duration,
}

/// Lexes and parses `source`. Any error aborts the compile; nothing runs.
pub fn compile(source: &str) -> Result<Program, FlexError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse()
}

/// Lexes and parses `source`, collecting every syntax error instead of
/// stopping at the first.
pub fn check(source: &str) -> Vec<FlexError> {
    match tokenize(source) {
        Ok(tokens) => Parser::new(tokens).parse_recovering().1,
        Err(error) => vec![error],
    }
}

/// Compiles and runs `source` on `evaluator`.
pub fn execute(evaluator: &mut Evaluator, source: &str) -> RunOutcome {
    let started = Instant::now();
    let value = compile(source).and_then(|program| evaluator.execute_program(&program));
    let elapsed = started.elapsed();

    tracing::debug!(?elapsed, ok = value.is_ok(), "run finished");
    RunOutcome {
        succeeded: value.is_ok(),
        value,
        elapsed,
    }
}

/// Runs a program against the terminal, reporting any error as a diagnostic.
/// Returns whether the run succeeded.
pub fn run(source: &str, filename: Option<&str>, config: InterpreterConfig) -> bool {
    let mut evaluator = Evaluator::new(
        Arc::new(Registry::standard()),
        Box::new(StdConsole::new()),
        config,
    );

    let outcome = execute(&mut evaluator, source);
    if let Err(ref error) = outcome.value {
        error.report(source, filename);
    }
    outcome.succeeded
}
