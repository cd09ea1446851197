//! Pratt parser: tokens to [`Program`].
//!
//! Statement-level errors are collected; after each one the parser skips to
//! the next `;` and carries on, so a single run reports every broken
//! statement.

use crate::ast::{Block, Expression, InfixOp, PrefixOp, Program, Statement};
use crate::error::SyntaxError;
use crate::lexer::{tokenize, Spanned, Token};

/// Binding power, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Or,
    And,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

fn infix_precedence(token: &Token) -> Precedence {
    match token {
        Token::Or => Precedence::Or,
        Token::And => Precedence::And,
        Token::Eq | Token::NotEq => Precedence::Equals,
        Token::Lt | Token::Gt | Token::Le | Token::Ge => Precedence::LessGreater,
        Token::Plus | Token::Minus => Precedence::Sum,
        Token::Star | Token::Slash | Token::Percent | Token::Power => Precedence::Product,
        Token::LParen | Token::LBracket | Token::Dot => Precedence::Call,
        _ => Precedence::Lowest,
    }
}

fn infix_op(token: &Token) -> Option<InfixOp> {
    let op = match token {
        Token::Plus => InfixOp::Add,
        Token::Minus => InfixOp::Sub,
        Token::Star => InfixOp::Mul,
        Token::Slash => InfixOp::Div,
        Token::Percent => InfixOp::Mod,
        Token::Power => InfixOp::Pow,
        Token::Eq => InfixOp::Eq,
        Token::NotEq => InfixOp::NotEq,
        Token::Lt => InfixOp::Lt,
        Token::Gt => InfixOp::Gt,
        Token::Le => InfixOp::Le,
        Token::Ge => InfixOp::Ge,
        Token::And => InfixOp::And,
        Token::Or => InfixOp::Or,
        _ => return None,
    };
    Some(op)
}

/// Parse a complete source file.
///
/// A lexing error stops immediately; parse errors are collected per
/// statement.
pub fn parse(source: &str) -> Result<Program, Vec<SyntaxError>> {
    let tokens = tokenize(source).map_err(|e| vec![e])?;
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse_program(mut self) -> Result<Program, Vec<SyntaxError>> {
        let mut statements = Vec::new();
        let mut errors = Vec::new();

        while !self.check(&Token::Eof) {
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(e) => {
                    errors.push(e);
                    self.synchronize();
                }
            }
        }

        if errors.is_empty() {
            Ok(Program { statements })
        } else {
            Err(errors)
        }
    }

    // ---- token cursor ----

    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)].token
    }

    fn line(&self) -> usize {
        let last = self.tokens.len() - 1;
        self.tokens[self.pos.min(last)].line
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token != Token::Eof {
            self.pos += 1;
        }
        token
    }

    /// Undo the `advance` that returned `token`.
    fn step_back(&mut self, token: &Token) {
        if *token != Token::Eof {
            self.pos -= 1;
        }
    }

    /// Consume `token` if it is next.
    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, expected: &'static str) -> Result<(), SyntaxError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> Result<String, SyntaxError> {
        match self.peek() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn unexpected(&self, expected: &'static str) -> SyntaxError {
        SyntaxError::UnexpectedToken {
            line: self.line(),
            expected,
            found: self.peek().to_string(),
        }
    }

    /// Skip past the next `;`, or to end of input.
    fn synchronize(&mut self) {
        while !self.check(&Token::Eof) {
            if self.advance() == Token::Semicolon {
                break;
            }
        }
    }

    // ---- statements ----

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        let statement = match self.peek() {
            Token::Var => self.parse_var()?,
            Token::Return => {
                self.advance();
                Statement::Return(self.parse_expression(Precedence::Lowest)?)
            }
            Token::While => {
                self.advance();
                let condition = self.parse_expression(Precedence::Lowest)?;
                let body = self.parse_block()?;
                Statement::While { condition, body }
            }
            Token::Import => {
                self.advance();
                match self.advance() {
                    Token::Str(path) => Statement::Import { path },
                    other => {
                        self.step_back(&other);
                        return Err(self.unexpected("import path string"));
                    }
                }
            }
            Token::Ident(_) if *self.peek_nth(1) == Token::Assign => {
                let name = self.expect_ident("identifier")?;
                self.advance();
                let value = self.parse_expression(Precedence::Lowest)?;
                Statement::Assign { name, value }
            }
            _ => Statement::Expression(self.parse_expression(Precedence::Lowest)?),
        };
        self.eat(&Token::Semicolon);
        Ok(statement)
    }

    fn parse_var(&mut self) -> Result<Statement, SyntaxError> {
        self.advance();
        let name = self.expect_ident("variable name")?;
        self.expect(&Token::Assign, "'<<'")?;
        let mut value = self.parse_expression(Precedence::Lowest)?;
        if let Expression::Function { name: fn_name, .. } = &mut value {
            if fn_name.is_none() {
                *fn_name = Some(name.clone());
            }
        }
        Ok(Statement::Var { name, value })
    }

    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        self.expect(&Token::LBrace, "'{'")?;
        let mut statements = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.check(&Token::Eof) {
                return Err(self.unexpected("'}'"));
            }
            statements.push(self.parse_statement()?);
        }
        self.advance();
        Ok(Block { statements })
    }

    // ---- expressions ----

    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expression, SyntaxError> {
        let mut left = self.parse_prefix()?;
        while precedence < infix_precedence(self.peek()) {
            left = self.parse_infix(left)?;
        }
        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expression, SyntaxError> {
        let line = self.line();
        let expr = match self.advance() {
            Token::Ident(name) => Expression::Identifier(name),
            Token::Int(i) => Expression::Integer(i),
            Token::Float(x) => Expression::Float(x),
            Token::Str(s) => Expression::String(s),
            Token::True => Expression::Boolean(true),
            Token::False => Expression::Boolean(false),
            Token::Bang => self.parse_prefix_op(PrefixOp::Bang)?,
            Token::Minus => self.parse_prefix_op(PrefixOp::Minus)?,
            Token::LParen => {
                let inner = self.parse_expression(Precedence::Lowest)?;
                self.expect(&Token::RParen, "')'")?;
                inner
            }
            Token::If => self.parse_if()?,
            Token::Fct => self.parse_function()?,
            Token::LBracket => {
                Expression::Array(self.parse_expression_list(&Token::RBracket, "']'")?)
            }
            Token::LBrace => self.parse_dict()?,
            other => {
                self.step_back(&other);
                return Err(SyntaxError::NoPrefixParse {
                    line,
                    token: other.to_string(),
                });
            }
        };
        Ok(expr)
    }

    fn parse_prefix_op(&mut self, operator: PrefixOp) -> Result<Expression, SyntaxError> {
        let right = self.parse_expression(Precedence::Prefix)?;
        Ok(Expression::Prefix {
            operator,
            right: Box::new(right),
        })
    }

    fn parse_infix(&mut self, left: Expression) -> Result<Expression, SyntaxError> {
        let token = self.advance();
        let expr = match token {
            Token::LParen => Expression::Call {
                function: Box::new(left),
                arguments: self.parse_expression_list(&Token::RParen, "')'")?,
            },
            Token::LBracket => {
                let index = self.parse_expression(Precedence::Lowest)?;
                self.expect(&Token::RBracket, "']'")?;
                Expression::Index {
                    left: Box::new(left),
                    index: Box::new(index),
                }
            }
            Token::Dot => Expression::Attribute {
                object: Box::new(left),
                property: self.expect_ident("property name")?,
            },
            other => {
                let precedence = infix_precedence(&other);
                let Some(operator) = infix_op(&other) else {
                    return Err(SyntaxError::NoPrefixParse {
                        line: self.line(),
                        token: other.to_string(),
                    });
                };
                let right = self.parse_expression(precedence)?;
                Expression::Infix {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                }
            }
        };
        Ok(expr)
    }

    fn parse_if(&mut self) -> Result<Expression, SyntaxError> {
        let condition = self.parse_expression(Precedence::Lowest)?;
        let consequence = self.parse_block()?;
        let alternative = if self.eat(&Token::Else) {
            if self.eat(&Token::If) {
                // `else if` nests as an alternative holding a single if.
                let nested = self.parse_if()?;
                Some(Block {
                    statements: vec![Statement::Expression(nested)],
                })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_function(&mut self) -> Result<Expression, SyntaxError> {
        self.expect(&Token::LParen, "'('")?;
        let mut parameters = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                parameters.push(self.expect_ident("parameter name")?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(&Token::Comma, "',' or ')'")?;
            }
        }
        let body = self.parse_block()?;
        Ok(Expression::Function {
            name: None,
            parameters,
            body,
        })
    }

    fn parse_expression_list(
        &mut self,
        end: &Token,
        expected_end: &'static str,
    ) -> Result<Vec<Expression>, SyntaxError> {
        let mut items = Vec::new();
        if self.eat(end) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_expression(Precedence::Lowest)?);
            if self.eat(end) {
                return Ok(items);
            }
            if !self.eat(&Token::Comma) {
                return Err(self.unexpected(expected_end));
            }
        }
    }

    fn parse_dict(&mut self) -> Result<Expression, SyntaxError> {
        let mut pairs = Vec::new();
        if self.eat(&Token::RBrace) {
            return Ok(Expression::Dict(pairs));
        }
        loop {
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect(&Token::Colon, "':'")?;
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));
            if self.eat(&Token::RBrace) {
                return Ok(Expression::Dict(pairs));
            }
            self.expect(&Token::Comma, "',' or '}'")?;
        }
    }
}
