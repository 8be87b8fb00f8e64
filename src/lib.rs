// Flex Language Interpreter Library
//
// Lexer, parser and tree-walking evaluator for Flex, a small dynamic
// scripting language, plus its builtin library and a stepping debugger.

pub mod ast;
pub mod config;
pub mod console;
pub mod debugger;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod runner;
mod stack;
pub mod stdlib;
pub mod value;

// Re-export commonly used items
pub use ast::{Expr, Program, Stmt};
pub use config::{AssignScope, InterpreterConfig};
pub use console::{Console, InputReply, ScriptedConsole, Severity, StdConsole, StopHandle};
pub use debugger::{DebugController, DebugSnapshot, DebugState, SourceView, StepMode};
pub use error::{ErrorKind, FlexError, Span};
pub use evaluator::Evaluator;
pub use lexer::{tokenize, Token, TokenType};
pub use parser::Parser;
pub use stdlib::Registry;
pub use value::Value;

// Re-export main functions
pub use repl::start as start_repl;
pub use runner::{check, compile, execute, run, RunOutcome};
