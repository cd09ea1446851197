//! Integration tests for the Zumbra parser, driven from source text.

use zumbra_syntax::{parse, Block, Expression, InfixOp, PrefixOp, Program, Statement, SyntaxError};

// ============================================================
// Helper functions
// ============================================================

fn parse_ok(source: &str) -> Program {
    match parse(source) {
        Ok(program) => program,
        Err(errors) => panic!("parse failed for {source:?}: {errors:?}"),
    }
}

fn single_expression(source: &str) -> Expression {
    let mut program = parse_ok(source);
    assert_eq!(program.statements.len(), 1, "source: {source}");
    match program.statements.remove(0) {
        Statement::Expression(e) => e,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

fn ident(name: &str) -> Expression {
    Expression::Identifier(name.to_string())
}

fn infix(left: Expression, operator: InfixOp, right: Expression) -> Expression {
    Expression::Infix {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

// ============================================================
// Statements
// ============================================================

#[test]
fn var_statements() {
    let program = parse_ok(
        "
        var x << 5;
        var y << 10;
        var foobar << 838383;
        ",
    );
    let names: Vec<&str> = program
        .statements
        .iter()
        .map(|s| match s {
            Statement::Var { name, .. } => name.as_str(),
            other => panic!("expected var statement, got {other:?}"),
        })
        .collect();
    assert_eq!(names, vec!["x", "y", "foobar"]);
}

#[test]
fn var_rejects_single_equals() {
    assert_eq!(
        parse("var x = 1;").unwrap_err(),
        vec![SyntaxError::UnexpectedChar { line: 1, ch: '=' }]
    );
    assert_eq!(
        parse("var x << 1;\nx = 2;").unwrap_err(),
        vec![SyntaxError::UnexpectedChar { line: 2, ch: '=' }]
    );
}

#[test]
fn assignment_statement() {
    let program = parse_ok("var n << 1; n << n + 1;");
    assert_eq!(
        program.statements[1],
        Statement::Assign {
            name: "n".to_string(),
            value: infix(ident("n"), InfixOp::Add, Expression::Integer(1)),
        }
    );
}

#[test]
fn return_statement() {
    let program = parse_ok("return 1 + 2;");
    assert_eq!(
        program.statements,
        vec![Statement::Return(infix(
            Expression::Integer(1),
            InfixOp::Add,
            Expression::Integer(2)
        ))]
    );
}

#[test]
fn while_statement() {
    let program = parse_ok("while (i < 5) { i << i + 1; }");
    match &program.statements[0] {
        Statement::While { condition, body } => {
            assert_eq!(condition.to_string(), "(i < 5)");
            assert_eq!(body.statements.len(), 1);
        }
        other => panic!("expected while, got {other:?}"),
    }
}

#[test]
fn import_statement() {
    let program = parse_ok("import \"lib/math.zb\";");
    assert_eq!(
        program.statements,
        vec![Statement::Import {
            path: "lib/math.zb".to_string()
        }]
    );
}

#[test]
fn import_requires_string() {
    let errors = parse("import math;").unwrap_err();
    assert_eq!(
        errors,
        vec![SyntaxError::UnexpectedToken {
            line: 1,
            expected: "import path string",
            found: "math".to_string(),
        }]
    );
}

#[test]
fn semicolons_are_optional() {
    let program = parse_ok("var a << 1\nvar b << 2\na + b");
    assert_eq!(program.statements.len(), 3);
}

#[test]
fn comments_are_ignored() {
    let program = parse_ok("// header\nvar a << 1; // trailing\n");
    assert_eq!(program.statements.len(), 1);
}

// ============================================================
// Expressions
// ============================================================

#[test]
fn literals() {
    assert_eq!(single_expression("5;"), Expression::Integer(5));
    assert_eq!(single_expression("2.5;"), Expression::Float(2.5));
    assert_eq!(
        single_expression("\"hello world\";"),
        Expression::String("hello world".to_string())
    );
    assert_eq!(single_expression("true;"), Expression::Boolean(true));
    assert_eq!(single_expression("false;"), Expression::Boolean(false));
    assert_eq!(single_expression("foobar;"), ident("foobar"));
}

#[test]
fn prefix_expressions() {
    assert_eq!(
        single_expression("!true;"),
        Expression::Prefix {
            operator: PrefixOp::Bang,
            right: Box::new(Expression::Boolean(true)),
        }
    );
    assert_eq!(
        single_expression("-15;"),
        Expression::Prefix {
            operator: PrefixOp::Minus,
            right: Box::new(Expression::Integer(15)),
        }
    );
}

#[test]
fn infix_operators() {
    let cases = [
        ("5 + 5", InfixOp::Add),
        ("5 - 5", InfixOp::Sub),
        ("5 * 5", InfixOp::Mul),
        ("5 / 5", InfixOp::Div),
        ("5 % 5", InfixOp::Mod),
        ("5 ** 5", InfixOp::Pow),
        ("5 > 5", InfixOp::Gt),
        ("5 < 5", InfixOp::Lt),
        ("5 >= 5", InfixOp::Ge),
        ("5 <= 5", InfixOp::Le),
        ("5 == 5", InfixOp::Eq),
        ("5 != 5", InfixOp::NotEq),
        ("5 and 5", InfixOp::And),
        ("5 or 5", InfixOp::Or),
    ];
    for (source, op) in cases {
        assert_eq!(
            single_expression(source),
            infix(Expression::Integer(5), op, Expression::Integer(5)),
            "source: {source}"
        );
    }
}

#[test]
fn if_else_expression() {
    let expr = single_expression("if (x < y) { x } else { y }");
    assert_eq!(
        expr,
        Expression::If {
            condition: Box::new(infix(ident("x"), InfixOp::Lt, ident("y"))),
            consequence: Block {
                statements: vec![Statement::Expression(ident("x"))],
            },
            alternative: Some(Block {
                statements: vec![Statement::Expression(ident("y"))],
            }),
        }
    );
}

#[test]
fn else_if_chains_nest() {
    let expr = single_expression("if (a) { 1 } else if (b) { 2 } else { 3 }");
    assert_eq!(
        expr.to_string(),
        "if a { 1 } else { if b { 2 } else { 3 } }"
    );
}

#[test]
fn function_literal() {
    let expr = single_expression("fct(x, y) { x + y; }");
    assert_eq!(
        expr,
        Expression::Function {
            name: None,
            parameters: vec!["x".to_string(), "y".to_string()],
            body: Block {
                statements: vec![Statement::Expression(infix(
                    ident("x"),
                    InfixOp::Add,
                    ident("y")
                ))],
            },
        }
    );
}

#[test]
fn function_parameter_lists() {
    let cases: [(&str, &[&str]); 3] = [
        ("fct() {};", &[]),
        ("fct(x) {};", &["x"]),
        ("fct(x, y, z) {};", &["x", "y", "z"]),
    ];
    for (source, expected) in cases {
        match single_expression(source) {
            Expression::Function { parameters, .. } => assert_eq!(parameters, expected),
            other => panic!("expected function, got {other:?}"),
        }
    }
}

#[test]
fn var_names_its_function_literal() {
    let program = parse_ok("var countDown << fct(x) { countDown(x - 1); };");
    match &program.statements[0] {
        Statement::Var {
            value: Expression::Function { name, .. },
            ..
        } => assert_eq!(name.as_deref(), Some("countDown")),
        other => panic!("expected var of function, got {other:?}"),
    }
}

#[test]
fn call_expression() {
    let expr = single_expression("add(1, 2 * 3, 4 + 5);");
    assert_eq!(expr.to_string(), "add(1, (2 * 3), (4 + 5))");
}

#[test]
fn array_and_index() {
    assert_eq!(
        single_expression("[1, 2 * 2, 3 + 3]").to_string(),
        "[1, (2 * 2), (3 + 3)]"
    );
    assert_eq!(single_expression("myArray[1 + 1]").to_string(), "(myArray[(1 + 1)])");
    assert_eq!(single_expression("[]"), Expression::Array(vec![]));
}

#[test]
fn dict_literals() {
    assert_eq!(single_expression("{}"), Expression::Dict(vec![]));
    let expr = single_expression("{\"one\": 1, \"two\": 2, 3: 10 - 7}");
    match expr {
        Expression::Dict(pairs) => {
            let rendered: Vec<String> = pairs
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            assert_eq!(rendered, vec!["one=1", "two=2", "3=(10 - 7)"]);
        }
        other => panic!("expected dict, got {other:?}"),
    }
}

#[test]
fn attribute_access_chains() {
    assert_eq!(
        single_expression("config.server.port").to_string(),
        "config.server.port"
    );
    assert_eq!(single_expression("user.tags[0]").to_string(), "(user.tags[0])");
}

// ============================================================
// Errors
// ============================================================

#[test]
fn error_lines_are_reported() {
    let errors = parse("var a << 1;\nvar b << );\n").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line(), 2);
}

#[test]
fn missing_closing_paren() {
    let errors = parse("add(1, 2;").unwrap_err();
    assert_eq!(
        errors[0],
        SyntaxError::UnexpectedToken {
            line: 1,
            expected: "')'",
            found: ";".to_string(),
        }
    );
}

#[test]
fn dict_requires_colon() {
    let errors = parse("{\"a\" 1}").unwrap_err();
    assert_eq!(
        errors[0],
        SyntaxError::UnexpectedToken {
            line: 1,
            expected: "':'",
            found: "1".to_string(),
        }
    );
}
