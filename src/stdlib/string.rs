use super::{check_count, integer_arg, number_arg, text_arg, RegistryBuilder};
use crate::error::FlexError;
use crate::evaluator::Evaluator;
use crate::value::{Arity, Value};

/// Longest string, in characters, that `repeat` and the pad helpers build.
const MAX_STRING_LENGTH: usize = 10_000_000;

pub(super) fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .native("length", Arity::Fixed(1), length)
        .aliases(&["toUpper", "toUpperCase"], Arity::Fixed(1), to_upper)
        .aliases(&["toLower", "toLowerCase"], Arity::Fixed(1), to_lower)
        .native("substring", Arity::Variadic, substring)
        .native("replace", Arity::Fixed(3), replace)
        .native("split", Arity::Fixed(2), split)
        .native("trim", Arity::Fixed(1), trim)
        .native("startsWith", Arity::Fixed(2), starts_with)
        .native("endsWith", Arity::Fixed(2), ends_with)
        .native("contains", Arity::Fixed(2), contains)
        .native("indexOf", Arity::Fixed(2), index_of)
        .native("repeat", Arity::Fixed(2), repeat)
        .native("padLeft", Arity::Variadic, pad_left)
        .native("padRight", Arity::Variadic, pad_right)
}

fn length(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    match &args[0] {
        Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
        other => Err(FlexError::native(format!(
            "length() argument must be a string, got {}",
            other.type_name()
        ))
        .with_help("Use arrayLength() or .length for arrays.")),
    }
}

fn to_upper(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    Ok(Value::String(text_arg(args, 0).to_uppercase()))
}

fn to_lower(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    Ok(Value::String(text_arg(args, 0).to_lowercase()))
}

/// Both bounds are clamped into the string and swapped when reversed.
fn substring(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    check_count("substring", args, 2, 3)?;
    let chars: Vec<char> = text_arg(args, 0).chars().collect();
    let clamp = |n: f64| -> usize {
        if n.is_nan() || n <= 0.0 {
            0
        } else {
            (n.trunc() as usize).min(chars.len())
        }
    };

    let start = clamp(number_arg("substring", args, 1)?);
    let end = match args.get(2) {
        Some(Value::Null) | None => chars.len(),
        Some(_) => clamp(number_arg("substring", args, 2)?),
    };
    let (from, to) = if start > end { (end, start) } else { (start, end) };
    Ok(Value::String(chars[from..to].iter().collect()))
}

/// Replaces every occurrence of the search text; the pattern is literal.
fn replace(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    let text = text_arg(args, 0);
    let search = text_arg(args, 1);
    let replacement = text_arg(args, 2);
    Ok(Value::String(text.replace(&search, &replacement)))
}

fn split(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    let text = text_arg(args, 0);
    let delimiter = text_arg(args, 1);
    let parts: Vec<Value> = if delimiter.is_empty() {
        text.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        text.split(delimiter.as_str()).map(Value::from).collect()
    };
    Ok(Value::new_array(parts))
}

fn trim(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    Ok(Value::String(text_arg(args, 0).trim().to_string()))
}

fn starts_with(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    Ok(Value::Bool(text_arg(args, 0).starts_with(&text_arg(args, 1))))
}

fn ends_with(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    Ok(Value::Bool(text_arg(args, 0).ends_with(&text_arg(args, 1))))
}

fn contains(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    Ok(Value::Bool(text_arg(args, 0).contains(&text_arg(args, 1))))
}

/// Character index of the first match, or -1.
fn index_of(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    let text = text_arg(args, 0);
    let index = match text.find(&text_arg(args, 1)) {
        Some(byte) => text[..byte].chars().count() as f64,
        None => -1.0,
    };
    Ok(Value::Number(index))
}

fn repeat(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    let count = integer_arg("repeat", args, 1)?;
    if count < 0 {
        return Err(FlexError::native("repeat() count must be non-negative"));
    }
    let text = text_arg(args, 0);
    let count = count as u64;
    let total = (text.chars().count() as u64).saturating_mul(count);
    if total > MAX_STRING_LENGTH as u64 {
        return Err(FlexError::native("Invalid string length"));
    }
    if total == 0 {
        return Ok(Value::String(String::new()));
    }
    Ok(Value::String(text.repeat(count as usize)))
}

fn padding(name: &str, args: &[Value]) -> Result<(String, String), FlexError> {
    check_count(name, args, 2, 3)?;
    let text = text_arg(args, 0);
    let target = integer_arg(name, args, 1)?;
    if target > MAX_STRING_LENGTH as i64 {
        return Err(FlexError::native("Invalid string length"));
    }
    let target = target.max(0) as usize;
    let fill = if args.len() == 3 { text_arg(args, 2) } else { " ".to_string() };

    let current = text.chars().count();
    if target <= current || fill.is_empty() {
        return Ok((text, String::new()));
    }
    let pad: String = fill.chars().cycle().take(target - current).collect();
    Ok((text, pad))
}

fn pad_left(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    let (text, pad) = padding("padLeft", args)?;
    Ok(Value::String(pad + &text))
}

fn pad_right(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    let (text, pad) = padding("padRight", args)?;
    Ok(Value::String(text + &pad))
}
