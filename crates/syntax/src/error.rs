//! Error types for the Zumbra front end.

use thiserror::Error;

/// Errors produced while lexing or parsing source text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    /// A character that starts no token.
    #[error("line {line}: unexpected character '{ch}'")]
    UnexpectedChar { line: usize, ch: char },

    /// A string literal ran to the end of input.
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    /// A numeric literal could not be parsed or is out of range.
    #[error("line {line}: invalid number '{literal}'")]
    InvalidNumber { line: usize, literal: String },

    /// A token appeared where a different one was required.
    #[error("line {line}: expected {expected}, found '{found}'")]
    UnexpectedToken {
        line: usize,
        expected: &'static str,
        found: String,
    },

    /// A token cannot start an expression.
    #[error("line {line}: no expression starts with '{token}'")]
    NoPrefixParse { line: usize, token: String },
}

impl SyntaxError {
    /// The source line the error was reported on.
    pub fn line(&self) -> usize {
        match self {
            SyntaxError::UnexpectedChar { line, .. }
            | SyntaxError::UnterminatedString { line }
            | SyntaxError::InvalidNumber { line, .. }
            | SyntaxError::UnexpectedToken { line, .. }
            | SyntaxError::NoPrefixParse { line, .. } => *line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_unexpected_char() {
        let e = SyntaxError::UnexpectedChar { line: 2, ch: '@' };
        assert_eq!(e.to_string(), "line 2: unexpected character '@'");
    }

    #[test]
    fn error_display_unexpected_token() {
        let e = SyntaxError::UnexpectedToken {
            line: 4,
            expected: "')'",
            found: "}".to_string(),
        };
        assert_eq!(e.to_string(), "line 4: expected ')', found '}'");
    }

    #[test]
    fn error_display_invalid_number() {
        let e = SyntaxError::InvalidNumber {
            line: 1,
            literal: "99999999999999999999".to_string(),
        };
        assert_eq!(e.to_string(), "line 1: invalid number '99999999999999999999'");
        assert_eq!(e.line(), 1);
    }

    #[test]
    fn error_display_no_prefix_parse() {
        let e = SyntaxError::NoPrefixParse {
            line: 7,
            token: "*".to_string(),
        };
        assert_eq!(e.to_string(), "line 7: no expression starts with '*'");
    }
}
