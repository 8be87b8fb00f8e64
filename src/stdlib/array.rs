use super::{check_count, integer_arg, RegistryBuilder};
use crate::error::FlexError;
use crate::evaluator::Evaluator;
use crate::value::{Arity, Value};

/// Upper bound for `arrayNew` so a typo can't exhaust memory.
const MAX_NEW_ARRAY: i64 = 10_000_000;

pub(super) fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .native("arrayNew", Arity::Variadic, array_new)
        .native("arrayLength", Arity::Fixed(1), array_length)
        .native("arrayPush", Arity::Fixed(2), array_push)
        .native("arrayPop", Arity::Fixed(1), array_pop)
}

fn array_new(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    check_count("arrayNew", args, 0, 1)?;
    let size = if args.is_empty() {
        0
    } else {
        integer_arg("arrayNew", args, 0)?
    };
    if !(0..=MAX_NEW_ARRAY).contains(&size) {
        return Err(FlexError::native(format!("Invalid array length: {}", size)));
    }
    Ok(Value::new_array(vec![Value::Null; size as usize]))
}

fn array_length(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    let len = match &args[0] {
        Value::Array(items) => items.borrow().len(),
        Value::String(s) => s.chars().count(),
        _ => 0,
    };
    Ok(Value::Number(len as f64))
}

/// Appends in place and hands the same array back.
fn array_push(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    match &args[0] {
        Value::Array(items) => {
            items.borrow_mut().push(args[1].clone());
            Ok(args[0].clone())
        }
        Value::Null => Ok(Value::Null),
        other => Err(FlexError::native(format!(
            "arrayPush() expects an array, got {}",
            other.type_name()
        ))),
    }
}

fn array_pop(_: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    match &args[0] {
        Value::Array(items) => Ok(items.borrow_mut().pop().unwrap_or(Value::Null)),
        Value::Null => Ok(Value::Null),
        other => Err(FlexError::native(format!(
            "arrayPop() expects an array, got {}",
            other.type_name()
        ))),
    }
}
