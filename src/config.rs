/// Where an assignment to a name no frame defines creates the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignScope {
    /// The innermost frame; the name disappears when that block exits.
    #[default]
    CurrentFrame,
    /// The root frame, so the name outlives the block that created it.
    Global,
}

#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Nested closure calls allowed before "Maximum call depth exceeded".
    pub max_call_depth: usize,
    pub undeclared_assignment: AssignScope,
    /// Yield the OS thread after every loop iteration.
    pub yield_in_loops: bool,
    pub random_seed: Option<u64>,
}

pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            undeclared_assignment: AssignScope::default(),
            yield_in_loops: false,
            random_seed: None,
        }
    }
}

impl InterpreterConfig {
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_assign_scope(mut self, scope: AssignScope) -> Self {
        self.undeclared_assignment = scope;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_loop_yield(mut self, enabled: bool) -> Self {
        self.yield_in_loops = enabled;
        self
    }
}
