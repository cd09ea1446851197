//! Decode errors for Zumbra instruction streams.

use thiserror::Error;

/// Errors that occur while decoding an instruction stream.
///
/// Decoding is total: every byte sequence either decodes or produces one of
/// these variants. The VM treats all of them as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Opcode 0x00 is illegal and always rejected.
    #[error("illegal opcode 0x00 at offset {at}")]
    IllegalOpcode { at: usize },

    /// Byte does not name any opcode.
    #[error("unknown opcode {byte:#04x} at offset {at}")]
    UnknownOpcode { at: usize, byte: u8 },

    /// The stream ended in the middle of an instruction's operands.
    #[error("truncated operand for {mnemonic} at offset {at}: need {needed} byte(s), have {available}")]
    TruncatedOperand {
        at: usize,
        mnemonic: &'static str,
        needed: usize,
        available: usize,
    },

    /// Decode was asked to start past the end of the stream.
    #[error("offset {at} is past the end of the instruction stream (length {len})")]
    OutOfBounds { at: usize, len: usize },
}
