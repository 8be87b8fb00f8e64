use crate::error::FlexError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type EnvRef = Rc<RefCell<Environment>>;

/// One lexical scope frame. A child holds a shared reference to its parent,
/// so a parent lives as long as any frame or closure below it.
#[derive(Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Self {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn new_global() -> EnvRef {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn new_child(parent: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Self::with_enclosing(Rc::clone(parent))))
    }

    pub fn enclosing(&self) -> Option<EnvRef> {
        self.enclosing.clone()
    }

    /// Binds `name` in this frame, shadowing any outer binding.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Result<Value, FlexError> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(ref enclosing) = self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Overwrites the nearest existing binding of `name`.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), FlexError> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(ref enclosing) = self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.values.contains_key(name)
            || self
                .enclosing
                .as_ref()
                .is_some_and(|enclosing| enclosing.borrow().is_defined(name))
    }

    /// Bindings of this frame only, sorted by name.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        let mut bindings: Vec<(String, Value)> = self
            .values
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        bindings.sort_by(|a, b| a.0.cmp(&b.0));
        bindings
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Called when execution leaves `frame`. If every remaining reference to the
    /// frame comes from closures stored in its own bindings, and nothing else
    /// holds those closures, the frame is unreachable apart from that cycle and
    /// its bindings are dropped.
    pub fn release(frame: EnvRef) {
        let unreachable = {
            let env = frame.borrow();
            let mut self_refs = 0;
            let mut escaped = false;
            for value in env.values.values() {
                if let Value::Closure(closure) = value {
                    if Rc::ptr_eq(&closure.env, &frame) {
                        self_refs += 1;
                        escaped |= Rc::strong_count(closure) > 1;
                    }
                }
            }
            self_refs > 0 && !escaped && Rc::strong_count(&frame) == self_refs + 1
        };
        if unreachable {
            frame.borrow_mut().clear();
        }
    }
}

fn undefined(name: &str) -> FlexError {
    FlexError::native(format!("Undefined variable '{}'.", name))
        .with_help("Assign a value to the variable before reading it.")
}
