//! Stack growth for deeply nested programs.
//!
//! Parsing, statement execution and expression evaluation recurse on the
//! native stack.
//! The configured call-depth limit is what should stop a runaway program, so
//! the stack is grown on demand instead of overflowing first.

/// Minimum stack space to keep available (100KB red zone).
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
