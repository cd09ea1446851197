//! Runtime errors for the Zumbra VM.
//!
//! Two families share one enum. Fatal errors mean the bytecode or the
//! machine state is broken (bad decode, stack or frame limits, dangling
//! references) and carry the offending instruction offset. The rest are
//! ordinary language errors a correct program can hit, and display as the
//! message the user sees. Both halt the run; [`RuntimeError::is_fatal`]
//! tells them apart.

use thiserror::Error;
use zumbra_common::{DecodeError, TypeTag};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    // ---- fatal ----
    /// The instruction stream did not decode.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Pushing would exceed the configured stack size.
    #[error("stack overflow at instruction {at}")]
    StackOverflow { at: usize },

    /// Popped an empty stack.
    #[error("stack underflow at instruction {at}")]
    StackUnderflow { at: usize },

    /// A call would exceed the configured frame limit.
    #[error("call depth exceeded {max} frames at instruction {at}")]
    FrameOverflow { at: usize, max: usize },

    /// Returned from the top-level frame.
    #[error("return outside of a function at instruction {at}")]
    FrameUnderflow { at: usize },

    /// A constant index that is out of range or names the wrong kind.
    #[error("malformed constant reference {index} at instruction {at}")]
    MalformedConstant { at: usize, index: usize },

    /// A global, local, free or builtin slot that does not exist.
    #[error("{kind} slot {index} out of range at instruction {at}")]
    SlotOutOfRange {
        at: usize,
        kind: &'static str,
        index: usize,
    },

    // ---- language ----
    /// Arithmetic or comparison on operands it does not support.
    #[error("unsupported types for binary operation: {left} {operator} {right}")]
    UnsupportedOperands {
        at: usize,
        operator: &'static str,
        left: TypeTag,
        right: TypeTag,
    },

    /// Unary minus on a non-number.
    #[error("unsupported type for negation: {operand}")]
    UnsupportedNegation { at: usize, operand: TypeTag },

    /// Indexing something that is not an array or dict, or an array with a
    /// non-integer.
    #[error("index operator not supported: {left}[{index}]")]
    IndexNotSupported {
        at: usize,
        left: TypeTag,
        index: TypeTag,
    },

    /// `obj.name` where `obj` is not a dict.
    #[error("attribute access not supported on {receiver}: .{property}")]
    AttributeNotSupported {
        at: usize,
        receiver: TypeTag,
        property: String,
    },

    /// A closure called with the wrong number of arguments.
    #[error("wrong number of arguments: want={want}, got={got}")]
    WrongArity { at: usize, want: usize, got: usize },

    /// Calling a value that is neither a closure nor a builtin.
    #[error("calling non-function and non-builtin")]
    NotCallable { at: usize },

    /// A dict key of an unhashable kind.
    #[error("unusable as dict key: {kind}")]
    UnhashableKey { at: usize, kind: TypeTag },

    /// Integer division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero { at: usize },
}

impl RuntimeError {
    /// True for errors that indicate malformed bytecode or exhausted
    /// machine limits rather than a mistake in the running program.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RuntimeError::Decode(_)
                | RuntimeError::StackOverflow { .. }
                | RuntimeError::StackUnderflow { .. }
                | RuntimeError::FrameOverflow { .. }
                | RuntimeError::FrameUnderflow { .. }
                | RuntimeError::MalformedConstant { .. }
                | RuntimeError::SlotOutOfRange { .. }
        )
    }

    /// Offset of the instruction that failed, within its function.
    pub fn at(&self) -> usize {
        match self {
            RuntimeError::Decode(e) => match e {
                DecodeError::IllegalOpcode { at }
                | DecodeError::UnknownOpcode { at, .. }
                | DecodeError::TruncatedOperand { at, .. }
                | DecodeError::OutOfBounds { at, .. } => *at,
            },
            RuntimeError::StackOverflow { at }
            | RuntimeError::StackUnderflow { at }
            | RuntimeError::FrameOverflow { at, .. }
            | RuntimeError::FrameUnderflow { at }
            | RuntimeError::MalformedConstant { at, .. }
            | RuntimeError::SlotOutOfRange { at, .. }
            | RuntimeError::UnsupportedOperands { at, .. }
            | RuntimeError::UnsupportedNegation { at, .. }
            | RuntimeError::IndexNotSupported { at, .. }
            | RuntimeError::AttributeNotSupported { at, .. }
            | RuntimeError::WrongArity { at, .. }
            | RuntimeError::NotCallable { at }
            | RuntimeError::UnhashableKey { at, .. }
            | RuntimeError::DivisionByZero { at } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats() {
        assert_eq!(
            RuntimeError::WrongArity {
                at: 4,
                want: 2,
                got: 1
            }
            .to_string(),
            "wrong number of arguments: want=2, got=1"
        );
        assert_eq!(
            RuntimeError::NotCallable { at: 0 }.to_string(),
            "calling non-function and non-builtin"
        );
        assert_eq!(
            RuntimeError::UnhashableKey {
                at: 0,
                kind: TypeTag::Array
            }
            .to_string(),
            "unusable as dict key: ARRAY"
        );
        assert_eq!(
            RuntimeError::UnsupportedOperands {
                at: 0,
                operator: "+",
                left: TypeTag::Integer,
                right: TypeTag::String,
            }
            .to_string(),
            "unsupported types for binary operation: INTEGER + STRING"
        );
        assert_eq!(
            RuntimeError::StackOverflow { at: 17 }.to_string(),
            "stack overflow at instruction 17"
        );
    }

    #[test]
    fn decode_errors_convert_and_are_fatal() {
        let e: RuntimeError = DecodeError::UnknownOpcode { at: 3, byte: 0xEE }.into();
        assert_eq!(e.to_string(), "decode error: unknown opcode 0xee at offset 3");
        assert!(e.is_fatal());
        assert_eq!(e.at(), 3);
    }

    #[test]
    fn language_errors_are_not_fatal() {
        assert!(!RuntimeError::DivisionByZero { at: 0 }.is_fatal());
        assert!(!RuntimeError::NotCallable { at: 0 }.is_fatal());
        assert!(!RuntimeError::WrongArity {
            at: 0,
            want: 0,
            got: 1
        }
        .is_fatal());
        assert!(RuntimeError::FrameUnderflow { at: 0 }.is_fatal());
        assert!(RuntimeError::MalformedConstant { at: 0, index: 9 }.is_fatal());
    }
}
