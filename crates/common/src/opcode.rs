//! Opcode definitions for the Zumbra instruction set.
//!
//! Every opcode is a single byte followed by zero or more fixed-width,
//! big-endian operands. The width table in [`Opcode::operand_widths`] is the
//! only source of truth for decoding.

use crate::error::DecodeError;

/// Identifies the operation to perform.
///
/// The `#[repr(u8)]` attribute gives each variant a stable byte value. Values
/// are grouped by concern; gaps between groups are unassigned.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Stack & literals
    /// Push `constants[arg0]`.
    Constant = 0x01,
    /// Discard the top of the stack.
    Pop = 0x02,
    /// Push `true`.
    True = 0x03,
    /// Push `false`.
    False = 0x04,
    /// Push `null`.
    Null = 0x05,

    // Arithmetic
    /// Pop two, push the sum (or string concatenation).
    Add = 0x10,
    /// Pop two, push `left - right`.
    Sub = 0x11,
    /// Pop two, push the product.
    Mul = 0x12,
    /// Pop two, push the quotient. Integer division truncates toward zero.
    Div = 0x13,
    /// Pop two, push the remainder.
    Mod = 0x14,
    /// Pop one number, push its negation.
    Minus = 0x15,

    // Comparison
    /// Pop two, push `left == right`.
    Equal = 0x20,
    /// Pop two, push `left != right`.
    NotEqual = 0x21,
    /// Pop two, push `left > right`.
    GreaterThan = 0x22,
    /// Pop two, push `left < right`.
    LessThan = 0x23,
    /// Pop two, push `left >= right`.
    GreaterOrEqual = 0x24,
    /// Pop two, push `left <= right`.
    LessOrEqual = 0x25,

    // Logic
    /// Pop one, push its inverted truthiness.
    Bang = 0x30,
    /// Pop two, push `truthy(left) && truthy(right)`. Both operands are
    /// already evaluated when this runs.
    And = 0x31,
    /// Pop two, push `truthy(left) || truthy(right)`. Both operands are
    /// already evaluated when this runs.
    Or = 0x32,

    // Jumps
    /// Jump to absolute offset `arg0`.
    Jump = 0x40,
    /// Pop the condition; jump to `arg0` when it is falsy.
    JumpNotTruthy = 0x41,

    // Bindings
    /// Pop into `globals[arg0]`.
    SetGlobal = 0x50,
    /// Push `globals[arg0]`.
    GetGlobal = 0x51,
    /// Pop into the current frame's local slot `arg0`.
    SetLocal = 0x52,
    /// Push the current frame's local slot `arg0`.
    GetLocal = 0x53,
    /// Push builtin registry entry `arg0`.
    GetBuiltin = 0x54,
    /// Push the current closure's captured value `arg0`.
    GetFree = 0x55,
    /// Push the closure that is currently executing.
    CurrentClosure = 0x56,

    // Data
    /// Pop `arg0` values, push them as an array.
    Array = 0x60,
    /// Pop `arg0` values (alternating key, value), push a dict.
    Dict = 0x61,
    /// Pop index and collection, push the element or `null`.
    Index = 0x62,
    /// Pop property name and receiver, push the property or `null`.
    GetAttr = 0x63,

    // Functions
    /// Call the value below the top `arg0` arguments.
    Call = 0x70,
    /// Return the top of the stack from the current frame.
    ReturnValue = 0x71,
    /// Return `null` from the current frame.
    Return = 0x72,
    /// Build a closure over `constants[arg0]`, capturing the top `arg1` values.
    Closure = 0x73,
}

/// All valid opcodes, in definition order. Useful for exhaustive testing.
pub const ALL_OPCODES: [Opcode; 36] = [
    Opcode::Constant,
    Opcode::Pop,
    Opcode::True,
    Opcode::False,
    Opcode::Null,
    Opcode::Add,
    Opcode::Sub,
    Opcode::Mul,
    Opcode::Div,
    Opcode::Mod,
    Opcode::Minus,
    Opcode::Equal,
    Opcode::NotEqual,
    Opcode::GreaterThan,
    Opcode::LessThan,
    Opcode::GreaterOrEqual,
    Opcode::LessOrEqual,
    Opcode::Bang,
    Opcode::And,
    Opcode::Or,
    Opcode::Jump,
    Opcode::JumpNotTruthy,
    Opcode::SetGlobal,
    Opcode::GetGlobal,
    Opcode::SetLocal,
    Opcode::GetLocal,
    Opcode::GetBuiltin,
    Opcode::GetFree,
    Opcode::CurrentClosure,
    Opcode::Array,
    Opcode::Dict,
    Opcode::Index,
    Opcode::GetAttr,
    Opcode::Call,
    Opcode::ReturnValue,
    Opcode::Return,
];

impl TryFrom<u8> for Opcode {
    type Error = u8;

    /// Map a byte to its opcode. The error carries the rejected byte; callers
    /// that know the stream offset wrap it into a [`DecodeError`].
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Opcode::Constant),
            0x02 => Ok(Opcode::Pop),
            0x03 => Ok(Opcode::True),
            0x04 => Ok(Opcode::False),
            0x05 => Ok(Opcode::Null),

            0x10 => Ok(Opcode::Add),
            0x11 => Ok(Opcode::Sub),
            0x12 => Ok(Opcode::Mul),
            0x13 => Ok(Opcode::Div),
            0x14 => Ok(Opcode::Mod),
            0x15 => Ok(Opcode::Minus),

            0x20 => Ok(Opcode::Equal),
            0x21 => Ok(Opcode::NotEqual),
            0x22 => Ok(Opcode::GreaterThan),
            0x23 => Ok(Opcode::LessThan),
            0x24 => Ok(Opcode::GreaterOrEqual),
            0x25 => Ok(Opcode::LessOrEqual),

            0x30 => Ok(Opcode::Bang),
            0x31 => Ok(Opcode::And),
            0x32 => Ok(Opcode::Or),

            0x40 => Ok(Opcode::Jump),
            0x41 => Ok(Opcode::JumpNotTruthy),

            0x50 => Ok(Opcode::SetGlobal),
            0x51 => Ok(Opcode::GetGlobal),
            0x52 => Ok(Opcode::SetLocal),
            0x53 => Ok(Opcode::GetLocal),
            0x54 => Ok(Opcode::GetBuiltin),
            0x55 => Ok(Opcode::GetFree),
            0x56 => Ok(Opcode::CurrentClosure),

            0x60 => Ok(Opcode::Array),
            0x61 => Ok(Opcode::Dict),
            0x62 => Ok(Opcode::Index),
            0x63 => Ok(Opcode::GetAttr),

            0x70 => Ok(Opcode::Call),
            0x71 => Ok(Opcode::ReturnValue),
            0x72 => Ok(Opcode::Return),
            0x73 => Ok(Opcode::Closure),

            other => Err(other),
        }
    }
}

impl Opcode {
    /// Decode the opcode byte found at `at` in a stream.
    pub fn lookup(byte: u8, at: usize) -> Result<Self, DecodeError> {
        match Opcode::try_from(byte) {
            Ok(op) => Ok(op),
            Err(0x00) => Err(DecodeError::IllegalOpcode { at }),
            Err(byte) => Err(DecodeError::UnknownOpcode { at, byte }),
        }
    }

    /// Width in bytes of each operand, in order.
    pub fn operand_widths(&self) -> &'static [usize] {
        match self {
            Opcode::Constant
            | Opcode::Jump
            | Opcode::JumpNotTruthy
            | Opcode::SetGlobal
            | Opcode::GetGlobal
            | Opcode::Array
            | Opcode::Dict => &[2],

            Opcode::SetLocal
            | Opcode::GetLocal
            | Opcode::GetBuiltin
            | Opcode::GetFree
            | Opcode::Call => &[1],

            Opcode::Closure => &[2, 1],

            Opcode::Pop
            | Opcode::True
            | Opcode::False
            | Opcode::Null
            | Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Minus
            | Opcode::Equal
            | Opcode::NotEqual
            | Opcode::GreaterThan
            | Opcode::LessThan
            | Opcode::GreaterOrEqual
            | Opcode::LessOrEqual
            | Opcode::Bang
            | Opcode::And
            | Opcode::Or
            | Opcode::CurrentClosure
            | Opcode::Index
            | Opcode::GetAttr
            | Opcode::ReturnValue
            | Opcode::Return => &[],
        }
    }

    /// Total encoded length of this instruction, opcode byte included.
    pub fn encoded_len(&self) -> usize {
        1 + self.operand_widths().iter().sum::<usize>()
    }

    /// Returns the disassembly mnemonic for this opcode.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Constant => "CONSTANT",
            Opcode::Pop => "POP",
            Opcode::True => "TRUE",
            Opcode::False => "FALSE",
            Opcode::Null => "NULL",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Minus => "MINUS",
            Opcode::Equal => "EQUAL",
            Opcode::NotEqual => "NOT_EQUAL",
            Opcode::GreaterThan => "GREATER_THAN",
            Opcode::LessThan => "LESS_THAN",
            Opcode::GreaterOrEqual => "GREATER_OR_EQUAL",
            Opcode::LessOrEqual => "LESS_OR_EQUAL",
            Opcode::Bang => "BANG",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Jump => "JUMP",
            Opcode::JumpNotTruthy => "JUMP_NOT_TRUTHY",
            Opcode::SetGlobal => "SET_GLOBAL",
            Opcode::GetGlobal => "GET_GLOBAL",
            Opcode::SetLocal => "SET_LOCAL",
            Opcode::GetLocal => "GET_LOCAL",
            Opcode::GetBuiltin => "GET_BUILTIN",
            Opcode::GetFree => "GET_FREE",
            Opcode::CurrentClosure => "CURRENT_CLOSURE",
            Opcode::Array => "ARRAY",
            Opcode::Dict => "DICT",
            Opcode::Index => "INDEX",
            Opcode::GetAttr => "GET_ATTR",
            Opcode::Call => "CALL",
            Opcode::ReturnValue => "RETURN_VALUE",
            Opcode::Return => "RETURN",
            Opcode::Closure => "CLOSURE",
        }
    }
}
