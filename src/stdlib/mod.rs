//! Native functions pre-bound into the root environment.
//!
//! A [`Registry`] is assembled once with a [`RegistryBuilder`] and then shared
//! read-only between interpreters; each evaluator copies it into its own
//! global frame at construction.

mod array;
mod convert;
mod io;
mod math;
mod string;

use crate::environment::EnvRef;
use crate::error::FlexError;
use crate::value::{Arity, NativeFn, NativeFunction, Value};
use std::collections::BTreeMap;

/// What a registry name is bound to. Kept free of `Rc` so a registry can be
/// shared across threads.
#[derive(Debug, Clone, Copy)]
pub enum Binding {
    Native(NativeFunction),
    Number(f64),
}

impl Binding {
    pub fn to_value(self) -> Value {
        match self {
            Binding::Native(native) => Value::Native(native),
            Binding::Number(n) => Value::Number(n),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    bindings: BTreeMap<&'static str, Binding>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Every native the language ships with.
    pub fn standard() -> Self {
        let builder = RegistryBuilder::new();
        let builder = io::register(builder);
        let builder = math::register(builder);
        let builder = string::register(builder);
        let builder = array::register(builder);
        let builder = convert::register(builder);
        builder.build()
    }

    pub fn get(&self, name: &str) -> Option<Binding> {
        self.bindings.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bindings.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn install(&self, env: &EnvRef) {
        let mut env = env.borrow_mut();
        for (name, binding) in &self.bindings {
            env.define(*name, binding.to_value());
        }
        tracing::debug!(count = self.bindings.len(), "installed native bindings");
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    bindings: BTreeMap<&'static str, Binding>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `func` under `name`; a later registration of the same name
    /// replaces the earlier one.
    pub fn native(mut self, name: &'static str, arity: Arity, func: NativeFn) -> Self {
        self.bindings
            .insert(name, Binding::Native(NativeFunction { name, arity, func }));
        self
    }

    /// Registers one implementation under several spellings.
    pub fn aliases(mut self, names: &[&'static str], arity: Arity, func: NativeFn) -> Self {
        for name in names {
            self = self.native(*name, arity, func);
        }
        self
    }

    pub fn constant(mut self, name: &'static str, value: f64) -> Self {
        self.bindings.insert(name, Binding::Number(value));
        self
    }

    /// Adds every binding of `other`, shadowing names already present.
    pub fn extend(mut self, other: &Registry) -> Self {
        self.bindings.extend(other.bindings.iter().map(|(k, v)| (*k, *v)));
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            bindings: self.bindings,
        }
    }
}

pub(crate) fn check_count(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), FlexError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        format!("exactly {} argument{}", min, if min == 1 { "" } else { "s" })
    } else if max == usize::MAX {
        format!("at least {} argument{}", min, if min == 1 { "" } else { "s" })
    } else {
        format!("{} or {} arguments", min, max)
    };
    Err(FlexError::native(format!("{}() requires {}", name, expected)))
}

pub(crate) fn number_arg(name: &str, args: &[Value], index: usize) -> Result<f64, FlexError> {
    match args.get(index) {
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(FlexError::native(format!(
            "{}() argument must be a number, got {}",
            name,
            other.type_name()
        ))),
        None => Err(FlexError::native(format!("{}() is missing an argument", name))),
    }
}

/// Stringifies any argument; a missing one reads as the empty string.
pub(crate) fn text_arg(args: &[Value], index: usize) -> String {
    args.get(index).map(Value::to_string).unwrap_or_default()
}

/// Integer view of a numeric argument, truncated toward zero. NaN is 0.
pub(crate) fn integer_arg(name: &str, args: &[Value], index: usize) -> Result<i64, FlexError> {
    let n = number_arg(name, args, index)?;
    Ok(if n.is_nan() { 0 } else { n.trunc() as i64 })
}
