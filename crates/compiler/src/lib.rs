//! Zumbra bytecode compiler.
//!
//! Turns a parsed [`Program`](zumbra_syntax::Program) into a
//! [`Bytecode`](zumbra_common::Bytecode): a top-level instruction stream
//! plus a constant pool holding literals and compiled function bodies.
//!
//! - [`SymbolTable`]: lexical scopes, free-variable capture, builtin binding
//! - [`Compiler`]: single-pass emission with back-patched jumps
//! - [`CompileError`]: everything that can stop a compile
//!
//! Compilers can be chained for interactive use: [`Compiler::into_state`]
//! hands back the symbol table and constant pool, and
//! [`Compiler::with_state`] picks them up again.

pub mod compiler;
pub mod error;
pub mod symbol_table;

pub use compiler::{compile, Compiler};
pub use error::CompileError;
pub use symbol_table::{Scope, Symbol, SymbolScope, SymbolTable};
