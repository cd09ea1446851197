//! Zumbra virtual machine: executes compiled bytecode.
//!
//! The VM is a stack machine with:
//! - An operand stack that also holds each frame's locals
//! - A fixed-size global store that can outlive one run
//! - A call stack of closure frames
//! - A [`Host`](zumbra_common::Host) that builtins use for I/O
//!
//! # Usage
//!
//! ```
//! use zumbra_common::{make, Bytecode, Instructions, Opcode, Value};
//! use zumbra_vm::run;
//!
//! let bytecode = Bytecode::new(
//!     Instructions::concat([
//!         make(Opcode::Constant, &[0]),
//!         make(Opcode::Constant, &[1]),
//!         make(Opcode::Add, &[]),
//!         make(Opcode::Pop, &[]),
//!     ]),
//!     vec![Value::Integer(40), Value::Integer(2)],
//! );
//!
//! assert_eq!(run(bytecode).unwrap(), Value::Integer(42));
//! ```

pub mod error;
pub mod execute;
pub mod machine;

pub use error::RuntimeError;
pub use execute::values_equal;
pub use machine::{Frame, Vm, VmConfig};

use zumbra_common::{Bytecode, Value};

/// Execute a program with default limits and stdio, returning the value of
/// the last expression statement.
///
/// # Errors
///
/// Returns [`RuntimeError`] if execution halts on a fatal or language
/// error.
pub fn run(bytecode: Bytecode) -> Result<Value, RuntimeError> {
    let mut vm = Vm::new(bytecode);
    vm.run()?;
    Ok(vm.last_popped().clone())
}
