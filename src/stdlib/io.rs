use super::{check_count, RegistryBuilder};
use crate::console::{Severity, DEFAULT_INPUT_PROMPT};
use crate::error::FlexError;
use crate::evaluator::Evaluator;
use crate::value::{Arity, Value};
use std::thread;
use std::time::{Duration, Instant};

const MAX_SLEEP_MS: f64 = 10_000.0;
const SLEEP_SLICE: Duration = Duration::from_millis(10);

pub(super) fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .native("print", Arity::Fixed(1), print)
        .aliases(&["etb3", "printLine", "println"], Arity::Fixed(1), print_line)
        .aliases(&["input", "da5l", "d5l", "scan"], Arity::Variadic, input)
        .aliases(&["clearScreen", "clear"], Arity::Fixed(0), clear_screen)
        .native("sleep", Arity::Fixed(1), sleep)
}

fn print(evaluator: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    let text = args[0].to_string();
    evaluator.console().write(&text);
    Ok(Value::Null)
}

fn print_line(evaluator: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    let text = args[0].to_string();
    evaluator.console().write_line(&text, Severity::Output);
    Ok(Value::Null)
}

fn input(evaluator: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    check_count("input", args, 0, 1)?;
    let prompt = match args.first() {
        None | Some(Value::Null) => DEFAULT_INPUT_PROMPT.to_string(),
        Some(Value::String(s)) if s.is_empty() => DEFAULT_INPUT_PROMPT.to_string(),
        Some(value) => value.to_string(),
    };
    evaluator.read_input(&prompt).map(Value::String)
}

fn clear_screen(evaluator: &mut Evaluator, _args: &[Value]) -> Result<Value, FlexError> {
    evaluator.console().clear();
    Ok(Value::Null)
}

/// Sleeps in short slices so a stop request cuts the wait short.
fn sleep(evaluator: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    let ms = match args[0] {
        Value::Number(n) if n > 0.0 => n.min(MAX_SLEEP_MS),
        _ => 0.0,
    };
    let deadline = Instant::now() + Duration::from_secs_f64(ms / 1000.0);

    while !evaluator.is_stopped() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
    Ok(Value::Null)
}
