//! Zumbra common types and instruction encoding.
//!
//! This crate provides the data structures shared by the compiler and the VM:
//!
//! - [`Opcode`]: the instruction set and its operand-width table
//! - [`Instructions`]: byte-level instruction streams with encode/decode
//! - [`Value`]: runtime values, dict hash keys and truthiness
//! - [`Bytecode`]: a compiled program (instructions + constant pool)
//! - [`builtins`]: the ordered builtin registry and the [`Host`] capability
//! - [`DecodeError`]: errors from decoding instruction streams

pub mod builtins;
pub mod error;
pub mod instruction;
pub mod opcode;
pub mod program;
pub mod type_tag;
pub mod value;

// Re-export commonly used types at the crate root.
pub use builtins::{Builtin, BufferHost, Host, StdHost, BUILTINS};
pub use error::DecodeError;
pub use instruction::{make, Instructions};
pub use opcode::Opcode;
pub use program::Bytecode;
pub use type_tag::TypeTag;
pub use value::{Closure, CompiledFunction, Dict, HashKey, Value};
