//! Tokenizer for Zumbra source text.

use std::fmt;

use crate::error::SyntaxError;

/// A single token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),

    /// `<<`. A lone `=` is not a token.
    Assign,
    Eq,
    NotEq,
    Plus,
    Minus,
    Bang,
    Star,
    Slash,
    Percent,
    Power,
    Lt,
    Gt,
    Le,
    Ge,
    Dot,

    Comma,
    Colon,
    Semicolon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Fct,
    Var,
    True,
    False,
    If,
    Else,
    Return,
    While,
    Import,
    And,
    Or,

    Eof,
}

/// A token and the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

fn keyword(ident: &str) -> Option<Token> {
    let token = match ident {
        "fct" => Token::Fct,
        "var" => Token::Var,
        "true" => Token::True,
        "false" => Token::False,
        "if" => Token::If,
        "else" => Token::Else,
        "return" => Token::Return,
        "while" => Token::While,
        "import" => Token::Import,
        "and" => Token::And,
        "or" => Token::Or,
        _ => return None,
    };
    Some(token)
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Ident(name) => return f.write_str(name),
            Token::Int(i) => return write!(f, "{i}"),
            Token::Float(x) => return write!(f, "{x:?}"),
            Token::Str(s) => return write!(f, "\"{s}\""),
            Token::Assign => "<<",
            Token::Eq => "==",
            Token::NotEq => "!=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Bang => "!",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Power => "**",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Le => "<=",
            Token::Ge => ">=",
            Token::Dot => ".",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Semicolon => ";",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Fct => "fct",
            Token::Var => "var",
            Token::True => "true",
            Token::False => "false",
            Token::If => "if",
            Token::Else => "else",
            Token::Return => "return",
            Token::While => "while",
            Token::Import => "import",
            Token::And => "and",
            Token::Or => "or",
            Token::Eof => "end of input",
        };
        f.write_str(text)
    }
}

/// Tokenize a whole source file.
///
/// The result always ends with [`Token::Eof`]. Comments start with `//` and
/// extend to end of line.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, SyntaxError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '/' && next == Some('/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        let start_line = line;
        let (token, len) = match (c, next) {
            ('<', Some('<')) => (Token::Assign, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('=', Some('=')) => (Token::Eq, 2),
            ('!', Some('=')) => (Token::NotEq, 2),
            ('*', Some('*')) => (Token::Power, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('!', _) => (Token::Bang, 1),
            ('*', _) => (Token::Star, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('.', _) => (Token::Dot, 1),
            (',', _) => (Token::Comma, 1),
            (':', _) => (Token::Colon, 1),
            (';', _) => (Token::Semicolon, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('{', _) => (Token::LBrace, 1),
            ('}', _) => (Token::RBrace, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            ('"', _) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != '"' {
                    if chars[end] == '\n' {
                        line += 1;
                    }
                    end += 1;
                }
                if end == chars.len() {
                    return Err(SyntaxError::UnterminatedString { line: start_line });
                }
                let text: String = chars[start..end].iter().collect();
                (Token::Str(text), end + 1 - i)
            }
            (c, _) if c.is_ascii_digit() => lex_number(&chars[i..], line)?,
            (c, _) if is_ident_start(c) => {
                let len = chars[i..]
                    .iter()
                    .take_while(|&&ch| is_ident_start(ch) || ch.is_ascii_digit())
                    .count();
                let word: String = chars[i..i + len].iter().collect();
                let token = keyword(&word).unwrap_or(Token::Ident(word));
                (token, len)
            }
            (c, _) => return Err(SyntaxError::UnexpectedChar { line, ch: c }),
        };

        tokens.push(Spanned {
            token,
            line: start_line,
        });
        i += len;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        line,
    });
    Ok(tokens)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Lex an integer or float literal at the start of `chars`. A `.` only
/// belongs to the number when a digit follows it.
fn lex_number(chars: &[char], line: usize) -> Result<(Token, usize), SyntaxError> {
    let mut len = chars.iter().take_while(|c| c.is_ascii_digit()).count();
    let is_float = chars.get(len) == Some(&'.')
        && chars.get(len + 1).is_some_and(|c| c.is_ascii_digit());
    if is_float {
        len += 1;
        len += chars[len..].iter().take_while(|c| c.is_ascii_digit()).count();
    }

    let literal: String = chars[..len].iter().collect();
    let invalid = || SyntaxError::InvalidNumber {
        line,
        literal: literal.clone(),
    };
    let token = if is_float {
        Token::Float(literal.parse().map_err(|_| invalid())?)
    } else {
        Token::Int(literal.parse().map_err(|_| invalid())?)
    };
    Ok((token, len))
}
