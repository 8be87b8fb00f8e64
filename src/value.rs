use crate::ast::FunctionDecl;
use crate::environment::EnvRef;
use crate::error::FlexError;
use crate::evaluator::Evaluator;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared, mutable array storage. Two array values are equal only when they
/// point at the same storage.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(ArrayRef),
    Closure(Rc<Closure>),
    Native(NativeFunction),
}

/// A user function bundled with the frame it was declared in.
pub struct Closure {
    pub declaration: Rc<FunctionDecl>,
    pub env: EnvRef,
}

impl Closure {
    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// Any argument count; the native checks its own bounds.
    Variadic,
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => *n == count,
            Arity::Variadic => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::Variadic => write!(f, "any number of"),
        }
    }
}

pub type NativeFn = fn(&mut Evaluator, &[Value]) -> Result<Value, FlexError>;

#[derive(Clone, Copy)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: Arity,
    pub func: NativeFn,
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.borrow().is_empty(),
            Value::Closure(_) | Value::Native(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Closure(_) | Value::Native(_) => "function",
        }
    }

    pub fn new_array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Shallow equality: primitives by value, arrays and functions by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Number(l), Value::Number(r)) => l == r,
            (Value::String(l), Value::String(r)) => l == r,
            (Value::Array(l), Value::Array(r)) => Rc::ptr_eq(l, r),
            (Value::Closure(l), Value::Closure(r)) => Rc::ptr_eq(l, r),
            (Value::Native(l), Value::Native(r)) => l.name == r.name,
            _ => false,
        }
    }
}

/// Renders a number the way programs print it: integral values without a
/// fractional part, `NaN` and `Infinity` spelled out.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        // -0 prints as 0
        format!("{}", n as i128)
    } else {
        format!("{}", n)
    }
}

// Nesting past this depth prints as `[...]`.
const MAX_DISPLAY_DEPTH: usize = 32;

/// `open` holds the arrays currently being printed, outermost first. An array
/// that is its own ancestor prints as `[...]`.
fn write_value(
    f: &mut fmt::Formatter,
    value: &Value,
    open: &mut Vec<*const RefCell<Vec<Value>>>,
) -> fmt::Result {
    match value {
        Value::Null => write!(f, "null"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Number(n) => write!(f, "{}", format_number(*n)),
        Value::String(s) => write!(f, "{}", s),
        Value::Array(items) => {
            let ptr = Rc::as_ptr(items);
            if open.len() >= MAX_DISPLAY_DEPTH || open.contains(&ptr) {
                return write!(f, "[...]");
            }
            open.push(ptr);
            write!(f, "[")?;
            for (i, item) in items.borrow().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_value(f, item, open)?;
            }
            open.pop();
            write!(f, "]")
        }
        Value::Closure(closure) => write!(f, "<function {}>", closure.name()),
        Value::Native(native) => write!(f, "<native fn: {}>", native.name),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_value(f, self, &mut Vec::new())
    }
}

// Closures can reach themselves through their captured frame, so Debug never
// descends into environments.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<function {}>", self.name())
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_language_rules() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(!Value::new_array(vec![]).is_truthy());
        assert!(Value::new_array(vec![Value::Null]).is_truthy());
    }

    #[test]
    fn arrays_compare_by_identity() {
        let a = Value::new_array(vec![Value::Number(1.0)]);
        let b = Value::new_array(vec![Value::Number(1.0)]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn numbers_print_without_trailing_zero() {
        assert_eq!(format_number(7.0), "7");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn arrays_display_nested() {
        let inner = Value::new_array(vec![Value::from("x"), Value::Null]);
        let outer = Value::new_array(vec![Value::Number(1.0), inner, Value::Bool(true)]);
        assert_eq!(outer.to_string(), "[1, [x, null], true]");
    }

    #[test]
    fn self_containing_arrays_print_once() {
        let array = Value::new_array(vec![Value::Null, Value::Null]);
        if let Value::Array(items) = &array {
            let mut items = items.borrow_mut();
            items[0] = array.clone();
            items[1] = array.clone();
        }
        assert_eq!(array.to_string(), "[[...], [...]]");
        assert_eq!(format!("{:?}", array), "[[...], [...]]");

        let shared = Value::new_array(vec![Value::Number(1.0)]);
        let pair = Value::new_array(vec![shared.clone(), shared]);
        assert_eq!(pair.to_string(), "[[1], [1]]");

        // Break the cycle so the test does not leak.
        if let Value::Array(items) = &array {
            items.borrow_mut().clear();
        }
    }
}
