//! Abstract syntax tree for Zumbra programs.
//!
//! Every node has a `Display` form. The compiler orders dict literal keys
//! by it, so it must be deterministic.

use std::fmt;

/// A parsed source file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// A `{ ... }` statement list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `var name << value;`
    Var { name: String, value: Expression },
    /// `name << value;`
    Assign { name: String, value: Expression },
    /// `return value;`
    Return(Expression),
    /// An expression whose value is discarded.
    Expression(Expression),
    /// `while (condition) { body }`
    While { condition: Expression, body: Block },
    /// `import "path";`
    Import { path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Bang,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl PrefixOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrefixOp::Bang => "!",
            PrefixOp::Minus => "-",
        }
    }
}

impl InfixOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfixOp::Add => "+",
            InfixOp::Sub => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Mod => "%",
            InfixOp::Pow => "**",
            InfixOp::Eq => "==",
            InfixOp::NotEq => "!=",
            InfixOp::Lt => "<",
            InfixOp::Gt => ">",
            InfixOp::Le => "<=",
            InfixOp::Ge => ">=",
            InfixOp::And => "and",
            InfixOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(String),
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Prefix {
        operator: PrefixOp,
        right: Box<Expression>,
    },
    Infix {
        left: Box<Expression>,
        operator: InfixOp,
        right: Box<Expression>,
    },
    If {
        condition: Box<Expression>,
        consequence: Block,
        alternative: Option<Block>,
    },
    /// `fct(params) { body }`. `name` is set when the literal is bound by
    /// a `var` statement, so the body can call itself.
    Function {
        name: Option<String>,
        parameters: Vec<String>,
        body: Block,
    },
    Call {
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
    Array(Vec<Expression>),
    /// Pairs in source order.
    Dict(Vec<(Expression, Expression)>),
    Index {
        left: Box<Expression>,
        index: Box<Expression>,
    },
    /// `object.property`
    Attribute {
        object: Box<Expression>,
        property: String,
    },
}

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            write!(f, "{statement}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{ ")?;
        for statement in &self.statements {
            write!(f, "{statement} ")?;
        }
        f.write_str("}")
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Var { name, value } => write!(f, "var {name} << {value};"),
            Statement::Assign { name, value } => write!(f, "{name} << {value};"),
            Statement::Return(value) => write!(f, "return {value};"),
            Statement::Expression(expr) => write!(f, "{expr}"),
            Statement::While { condition, body } => write!(f, "while {condition} {body}"),
            Statement::Import { path } => write!(f, "import \"{path}\";"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier(name) => f.write_str(name),
            Expression::Integer(i) => write!(f, "{i}"),
            Expression::Float(x) => write!(f, "{x:?}"),
            Expression::String(s) => f.write_str(s),
            Expression::Boolean(b) => write!(f, "{b}"),
            Expression::Prefix { operator, right } => {
                write!(f, "({}{right})", operator.as_str())
            }
            Expression::Infix {
                left,
                operator,
                right,
            } => write!(f, "({left} {} {right})", operator.as_str()),
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if {condition} {consequence}")?;
                if let Some(alternative) = alternative {
                    write!(f, " else {alternative}")?;
                }
                Ok(())
            }
            Expression::Function {
                name,
                parameters,
                body,
            } => {
                f.write_str("fct")?;
                if let Some(name) = name {
                    write!(f, "<{name}>")?;
                }
                f.write_str("(")?;
                join(f, parameters, ", ")?;
                write!(f, ") {body}")
            }
            Expression::Call {
                function,
                arguments,
            } => {
                write!(f, "{function}(")?;
                join(f, arguments, ", ")?;
                f.write_str(")")
            }
            Expression::Array(elements) => {
                f.write_str("[")?;
                join(f, elements, ", ")?;
                f.write_str("]")
            }
            Expression::Dict(pairs) => {
                f.write_str("{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Expression::Index { left, index } => write!(f, "({left}[{index}])"),
            Expression::Attribute { object, property } => write!(f, "{object}.{property}"),
        }
    }
}
