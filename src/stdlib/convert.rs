use super::{check_count, integer_arg, text_arg, RegistryBuilder};
use crate::error::FlexError;
use crate::evaluator::Evaluator;
use crate::value::{Arity, Value};

pub(super) fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .native("typeof", Arity::Fixed(1), type_of)
        .native("parseInt", Arity::Variadic, parse_int)
        .native("parseFloat", Arity::Fixed(1), parse_float)
        .native("toString", Arity::Fixed(1), to_string)
}

fn type_of(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    Ok(Value::from(args[0].type_name()))
}

fn to_string(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    Ok(Value::String(args[0].to_string()))
}

fn parse_int(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    check_count("parseInt", args, 1, 2)?;
    let radix = match args.get(1) {
        None | Some(Value::Null) => 10,
        Some(_) => integer_arg("parseInt", args, 1)?,
    };
    if !(2..=36).contains(&radix) {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(Value::Number(leading_integer(&text_arg(args, 0), radix as u32)))
}

fn parse_float(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    Ok(Value::Number(leading_float(&text_arg(args, 0))))
}

fn split_sign(text: &str) -> (f64, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (-1.0, rest)
    } else {
        (1.0, text.strip_prefix('+').unwrap_or(text))
    }
}

/// Value of the longest run of digits after optional whitespace and sign.
pub(crate) fn leading_integer(text: &str, radix: u32) -> f64 {
    let (sign, digits) = split_sign(text.trim_start());
    let mut value = 0.0;
    let mut seen = false;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => {
                value = value * radix as f64 + d as f64;
                seen = true;
            }
            None => break,
        }
    }
    if seen {
        sign * value
    } else {
        f64::NAN
    }
}

/// Longest decimal prefix, with optional fraction and exponent.
pub(crate) fn leading_float(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let (sign, body) = split_sign(trimmed);
    if body.starts_with("Infinity") {
        return sign * f64::INFINITY;
    }

    let bytes = body.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let int_end = digits_from(0);
    let mut end = int_end;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_end = digits_from(end + 1);
        if frac_end > end + 1 || int_end > 0 {
            end = frac_end;
        }
    }
    if end == 0 {
        return f64::NAN;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    body[..end]
        .parse::<f64>()
        .map(|n| sign * n)
        .unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_stop_at_first_non_digit() {
        assert_eq!(leading_integer("42px", 10), 42.0);
        assert_eq!(leading_integer("  -7", 10), -7.0);
        assert_eq!(leading_integer("3.9", 10), 3.0);
        assert_eq!(leading_integer("ff", 16), 255.0);
        assert!(leading_integer("px", 10).is_nan());
    }

    #[test]
    fn floats_accept_fraction_and_exponent() {
        assert_eq!(leading_float("3.25abc"), 3.25);
        assert_eq!(leading_float(".5"), 0.5);
        assert_eq!(leading_float("1e3x"), 1000.0);
        assert_eq!(leading_float("2e"), 2.0);
        assert_eq!(leading_float("-Infinity"), f64::NEG_INFINITY);
        assert!(leading_float(".").is_nan());
        assert!(leading_float("abc").is_nan());
    }
}
