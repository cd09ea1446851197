//! Zumbra front end: source text to AST.
//!
//! ```text
//! var add << fct(a, b) { a + b };
//! show(add(1, 2));
//! ```
//!
//! [`parse`] tokenizes and parses a whole file. The compiler consumes the
//! resulting [`Program`]; it never sees tokens.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{Block, Expression, InfixOp, PrefixOp, Program, Statement};
pub use error::SyntaxError;
pub use parser::parse;
