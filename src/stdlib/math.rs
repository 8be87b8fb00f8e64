use super::{check_count, number_arg, RegistryBuilder};
use crate::error::FlexError;
use crate::evaluator::Evaluator;
use crate::value::{Arity, Value};
use rand::Rng;

pub(super) fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .native("abs", Arity::Fixed(1), abs)
        .native("round", Arity::Fixed(1), round)
        .native("floor", Arity::Fixed(1), floor)
        .native("ceil", Arity::Fixed(1), ceil)
        .native("sqrt", Arity::Fixed(1), sqrt)
        .native("sin", Arity::Fixed(1), sin)
        .native("cos", Arity::Fixed(1), cos)
        .native("tan", Arity::Fixed(1), tan)
        .native("pow", Arity::Fixed(2), pow)
        .native("random", Arity::Variadic, random)
        .native("min", Arity::Variadic, min)
        .native("max", Arity::Variadic, max)
        .constant("PI", std::f64::consts::PI)
        .constant("E", std::f64::consts::E)
}

fn unary(name: &str, args: &[Value], op: fn(f64) -> f64) -> Result<Value, FlexError> {
    Ok(Value::Number(op(number_arg(name, args, 0)?)))
}

fn abs(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    unary("abs", args, f64::abs)
}

/// Halves round toward positive infinity: `round(-2.5)` is -2.
fn round(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    unary("round", args, |n| {
        let floor = n.floor();
        if n - floor >= 0.5 {
            floor + 1.0
        } else {
            floor
        }
    })
}

fn floor(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    unary("floor", args, f64::floor)
}

fn ceil(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    unary("ceil", args, f64::ceil)
}

fn sqrt(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    let n = number_arg("sqrt", args, 0)?;
    if n < 0.0 {
        return Err(FlexError::native("Cannot calculate square root of negative number"));
    }
    Ok(Value::Number(n.sqrt()))
}

fn sin(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    unary("sin", args, f64::sin)
}

fn cos(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    unary("cos", args, f64::cos)
}

fn tan(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    unary("tan", args, f64::tan)
}

fn pow(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    let base = number_arg("pow", args, 0)?;
    let exponent = number_arg("pow", args, 1)?;
    Ok(Value::Number(base.powf(exponent)))
}

/// `random()` is a float in [0, 1); `random(n)` an integer in [0, n);
/// `random(lo, hi)` an integer in [lo, hi).
fn random(evaluator: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    check_count("random", args, 0, 2)?;
    let (low, high) = match args.len() {
        0 => return Ok(Value::Number(evaluator.rng().gen::<f64>())),
        1 => (0.0, number_arg("random", args, 0)?),
        _ => (number_arg("random", args, 0)?, number_arg("random", args, 1)?),
    };
    let unit: f64 = evaluator.rng().gen();
    Ok(Value::Number((unit * (high - low)).floor() + low))
}

fn extremum(name: &str, args: &[Value], pick: fn(f64, f64) -> f64) -> Result<Value, FlexError> {
    check_count(name, args, 1, usize::MAX)?;
    let mut result = number_arg(name, args, 0)?;
    for index in 1..args.len() {
        let n = number_arg(name, args, index)?;
        result = if result.is_nan() || n.is_nan() {
            f64::NAN
        } else {
            pick(result, n)
        };
    }
    Ok(Value::Number(result))
}

fn min(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    extremum("min", args, f64::min)
}

fn max(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    extremum("max", args, f64::max)
}
