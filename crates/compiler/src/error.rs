//! Compile errors.

use std::path::PathBuf;

use thiserror::Error;
use zumbra_syntax::SyntaxError;

use crate::symbol_table::SymbolScope;

/// Errors produced while compiling a program. Compilation stops at the
/// first one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// An identifier that resolves in no enclosing scope.
    #[error("undefined variable {name}")]
    Undefined { name: String },

    /// `var` of a name already declared in the same scope.
    #[error("variable {name} is already declared in this scope")]
    Redeclared { name: String },

    /// Assignment to something that is not a global or local variable.
    #[error("cannot assign to {name}: it is a {scope} binding")]
    InvalidAssignTarget { name: String, scope: SymbolScope },

    /// An operator with no opcode.
    #[error("unknown operator {operator}")]
    UnknownOperator { operator: &'static str },

    /// A dict literal key that can never be hashed.
    #[error("unusable as dict key: {kind}")]
    UnhashableKey { kind: &'static str },

    /// An operand too large for its encoded width.
    #[error("operand {operand} for {mnemonic} exceeds maximum {max}")]
    OperandOverflow {
        mnemonic: &'static str,
        operand: usize,
        max: usize,
    },

    /// An imported file could not be read.
    #[error("could not read imported file {}: {message}", .path.display())]
    ImportRead { path: PathBuf, message: String },

    /// An imported file did not parse.
    #[error("could not parse imported file {}: {}", .path.display(), first_error(.errors))]
    ImportParse {
        path: PathBuf,
        errors: Vec<SyntaxError>,
    },
}

fn first_error(errors: &[SyntaxError]) -> String {
    match errors {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_undefined() {
        let e = CompileError::Undefined {
            name: "foo".to_string(),
        };
        assert_eq!(e.to_string(), "undefined variable foo");
    }

    #[test]
    fn display_invalid_assign_target() {
        let e = CompileError::InvalidAssignTarget {
            name: "show".to_string(),
            scope: SymbolScope::Builtin,
        };
        assert_eq!(e.to_string(), "cannot assign to show: it is a BUILTIN binding");
    }

    #[test]
    fn display_operand_overflow() {
        let e = CompileError::OperandOverflow {
            mnemonic: "CONSTANT",
            operand: 65536,
            max: 65535,
        };
        assert_eq!(e.to_string(), "operand 65536 for CONSTANT exceeds maximum 65535");
    }

    #[test]
    fn display_import_parse_summarizes_errors() {
        let e = CompileError::ImportParse {
            path: PathBuf::from("/lib/a.zb"),
            errors: vec![
                SyntaxError::UnterminatedString { line: 3 },
                SyntaxError::UnterminatedString { line: 9 },
            ],
        };
        assert_eq!(
            e.to_string(),
            "could not parse imported file /lib/a.zb: line 3: unterminated string literal (and 1 more)"
        );
    }
}
