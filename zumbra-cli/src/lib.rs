//! Zumbra command-line front end: file runner, REPL and disassembler.

pub mod commands;
pub mod repl;
pub mod session;

pub use session::{EvalError, Session};
