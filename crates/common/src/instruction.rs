//! Instruction encoding and decoding for the Zumbra instruction set.
//!
//! An instruction is one opcode byte followed by its operands, big-endian:
//! ```text
//! CONSTANT 0x0102   ->  01 01 02
//! CLOSURE  3 2      ->  73 00 03 02
//! ADD               ->  10
//! ```
//! Operand widths come from [`Opcode::operand_widths`]; they never vary for a
//! given opcode.

use std::fmt;

use crate::error::DecodeError;
use crate::opcode::Opcode;

/// Encode one instruction.
///
/// Operands beyond the opcode's arity are ignored, missing ones encode as 0.
/// Each operand is truncated to its width; the compiler checks ranges
/// before emitting.
pub fn make(op: Opcode, operands: &[usize]) -> Vec<u8> {
    let widths = op.operand_widths();
    let mut bytes = Vec::with_capacity(op.encoded_len());
    bytes.push(op as u8);

    for (i, &width) in widths.iter().enumerate() {
        let operand = operands.get(i).copied().unwrap_or(0);
        match width {
            2 => bytes.extend_from_slice(&(operand as u16).to_be_bytes()),
            _ => bytes.push(operand as u8),
        }
    }

    bytes
}

/// Read the operands of `op` from `bytes`, which starts right after the
/// opcode byte. `at` is the opcode's offset, used for error reporting.
///
/// Returns the operands and the number of bytes consumed.
pub fn read_operands(
    op: Opcode,
    bytes: &[u8],
    at: usize,
) -> Result<(Vec<usize>, usize), DecodeError> {
    let widths = op.operand_widths();
    let mut operands = Vec::with_capacity(widths.len());
    let mut offset = 0;

    for &width in widths {
        let available = bytes.len().saturating_sub(offset);
        if available < width {
            return Err(DecodeError::TruncatedOperand {
                at,
                mnemonic: op.mnemonic(),
                needed: width,
                available,
            });
        }
        let operand = match width {
            2 => read_u16(&bytes[offset..]) as usize,
            _ => read_u8(&bytes[offset..]) as usize,
        };
        operands.push(operand);
        offset += width;
    }

    Ok((operands, offset))
}

/// Decode the instruction starting at `offset`.
///
/// Returns the opcode, its operands and the full instruction length.
pub fn decode(bytes: &[u8], offset: usize) -> Result<(Opcode, Vec<usize>, usize), DecodeError> {
    let byte = *bytes.get(offset).ok_or(DecodeError::OutOfBounds {
        at: offset,
        len: bytes.len(),
    })?;
    let op = Opcode::lookup(byte, offset)?;
    let (operands, read) = read_operands(op, &bytes[offset + 1..], offset)?;
    Ok((op, operands, 1 + read))
}

/// Read a big-endian u16 from the first two bytes.
#[inline]
pub fn read_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// Read a u8 from the first byte.
#[inline]
pub fn read_u8(bytes: &[u8]) -> u8 {
    bytes[0]
}

/// An append-only instruction stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instructions(pub Vec<u8>);

impl Instructions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Append encoded bytes, returning the offset they start at.
    pub fn push(&mut self, encoded: &[u8]) -> usize {
        let pos = self.0.len();
        self.0.extend_from_slice(encoded);
        pos
    }

    /// Overwrite bytes in place starting at `pos`.
    pub fn replace(&mut self, pos: usize, encoded: &[u8]) {
        self.0[pos..pos + encoded.len()].copy_from_slice(encoded);
    }

    /// Drop everything from `pos` onward.
    pub fn truncate(&mut self, pos: usize) {
        self.0.truncate(pos);
    }

    /// Concatenate several streams. Handy for building expected bytecode.
    pub fn concat(parts: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self(parts.into_iter().flatten().collect())
    }
}

impl From<Vec<u8>> for Instructions {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Disassembly: one instruction per line, `offset MNEMONIC operands`.
impl fmt::Display for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut i = 0;
        while i < self.0.len() {
            match decode(&self.0, i) {
                Ok((op, operands, len)) => {
                    write!(f, "{i:04} {}", op.mnemonic())?;
                    for operand in operands {
                        write!(f, " {operand}")?;
                    }
                    writeln!(f)?;
                    i += len;
                }
                Err(e) => {
                    writeln!(f, "ERROR: {e}")?;
                    break;
                }
            }
        }
        Ok(())
    }
}
