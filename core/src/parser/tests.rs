//! Parser tests - verify parsing and AST structure
//!
//! These tests do NOT execute the code; that's covered by the executor tests.

use super::*;

/* ===================== Helpers ===================== */

/// Parse a program and return its top-level statements
fn statements(source: &str) -> Vec<Rc<Stmt>> {
    let script = parse_program(source).expect("Should parse");
    let Stmt::Block { body, .. } = &*script.body else {
        panic!("Program body should be a block");
    };
    body.to_vec()
}

fn expr(source: &str) -> Expr {
    (*parse_expression(source).expect("Should parse")).clone()
}

/* ===================== Statements ===================== */

#[test]
fn test_parse_declarations() {
    let stmts = statements("let a = 1, b; const c = 'x'; var d = 2");

    assert_eq!(stmts.len(), 3);
    match &*stmts[0] {
        Stmt::Declare {
            var_kind: VarKind::Let,
            declarations,
            ..
        } => {
            assert_eq!(declarations.len(), 2);
            assert_eq!(declarations[0].name, "a");
            assert!(declarations[1].init.is_none());
        }
        other => panic!("Expected let declaration, got {:?}", other),
    }
    assert!(matches!(
        &*stmts[2],
        Stmt::Declare {
            var_kind: VarKind::Var,
            ..
        }
    ));
}

#[test]
fn test_statement_spans() {
    let stmts = statements("let a = 1;\n  a++;");

    let span = stmts[1].span();
    assert_eq!(span.start_line, 1);
    assert_eq!(span.start_col, 2);
}

#[test]
fn test_parse_if_else_absorbs_checkpoint() {
    let stmts = statements("if (x) a(); yield 1; else b();");

    assert_eq!(stmts.len(), 1);
    let Stmt::If { then_s, else_s, .. } = &*stmts[0] else {
        panic!("Expected if statement, got {:?}", stmts[0]);
    };
    match &**then_s {
        Stmt::Block { body, .. } => {
            assert_eq!(body.len(), 2);
            assert!(matches!(&*body[1], Stmt::Yield { .. }));
        }
        other => panic!("Expected block, got {:?}", other),
    }
    assert!(else_s.is_some());
}

#[test]
fn test_parse_if_without_else_keeps_checkpoint_outside() {
    let stmts = statements("if (x) a(); yield 1;");

    assert_eq!(stmts.len(), 2);
    assert!(matches!(&*stmts[1], Stmt::Yield { .. }));
}

#[test]
fn test_parse_do_while_absorbs_checkpoint() {
    let stmts = statements("do x++; yield 1; while (x < 3);");

    assert_eq!(stmts.len(), 1);
    let Stmt::DoWhile { body, .. } = &*stmts[0] else {
        panic!("Expected do/while, got {:?}", stmts[0]);
    };
    assert!(matches!(&**body, Stmt::Block { body, .. } if body.len() == 2));
}

#[test]
fn test_parse_classic_for() {
    let stmts = statements("for (let i = 0; i < 3; i++) {}");

    match &*stmts[0] {
        Stmt::For {
            init: Some(init),
            test: Some(_),
            update: Some(_),
            ..
        } => assert!(matches!(&**init, Stmt::Declare { .. })),
        other => panic!("Expected for loop, got {:?}", other),
    }

    let stmts = statements("for (;;) { break; }");
    assert!(matches!(
        &*stmts[0],
        Stmt::For {
            init: None,
            test: None,
            update: None,
            ..
        }
    ));
}

#[test]
fn test_parse_for_of_and_in() {
    let stmts = statements("for (const v of list) {} for (k in obj) {}");

    match &*stmts[0] {
        Stmt::ForLoop {
            kind: ForLoopKind::Of,
            var_kind: Some(VarKind::Const),
            binding,
            ..
        } => assert_eq!(binding, "v"),
        other => panic!("Expected for/of, got {:?}", other),
    }
    assert!(matches!(
        &*stmts[1],
        Stmt::ForLoop {
            kind: ForLoopKind::In,
            var_kind: None,
            ..
        }
    ));
}

#[test]
fn test_parse_try_catch_finally() {
    let stmts = statements("try { a(); } catch (e) { b(); } finally { c(); }");

    match &*stmts[0] {
        Stmt::Try {
            catch_var,
            catch_body,
            finally_body,
            ..
        } => {
            assert_eq!(catch_var.as_deref(), Some("e"));
            assert!(catch_body.is_some());
            assert!(finally_body.is_some());
        }
        other => panic!("Expected try, got {:?}", other),
    }
}

#[test]
fn test_try_without_handler_is_error() {
    let err = parse_program("try { a(); }").unwrap_err();
    assert!(err.message().contains("Missing catch or finally"));
    assert!(matches!(err, ParseError::BuildError(_, Some(_))));
}

#[test]
fn test_parse_function_declaration() {
    let stmts = statements("function add(a, b) { return a + b; }");

    let Stmt::Function { def, .. } = &*stmts[0] else {
        panic!("Expected function, got {:?}", stmts[0]);
    };
    assert_eq!(def.name.as_deref(), Some("add"));
    assert_eq!(def.params, vec!["a".to_string(), "b".to_string()]);
    assert!(!def.is_arrow);
}

#[test]
fn test_arrow_function_takes_binding_name() {
    let stmts = statements("const square = x => x * x;");

    let Stmt::Declare { declarations, .. } = &*stmts[0] else {
        panic!("Expected declaration");
    };
    let Some(init) = &declarations[0].init else {
        panic!("Expected initializer");
    };
    match &**init {
        Expr::Function { def } => {
            assert_eq!(def.name.as_deref(), Some("square"));
            assert!(def.is_arrow);
            assert!(matches!(def.body, FunctionBody::Expr { .. }));
        }
        other => panic!("Expected function, got {:?}", other),
    }
}

#[test]
fn test_keywords_are_not_identifiers() {
    assert!(parse_program("let if = 1;").is_err());
    assert!(parse_program("let index = 1; let format = 2; let dot = 3;").is_ok());
}

#[test]
fn test_syntax_error_location() {
    let err = parse_program("let a = 1;\nlet = ;").unwrap_err();

    let span = err.span().expect("Pest errors carry a location");
    assert_eq!(span.start_line, 1);
    assert!(matches!(err, ParseError::PestError(..)));
}

/* ===================== Expressions ===================== */

#[test]
fn test_operator_precedence() {
    match expr("1 + 2 * 3") {
        Expr::Binary {
            op: BinaryOp::Add,
            right,
            ..
        } => assert!(matches!(
            &*right,
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        )),
        other => panic!("Expected addition, got {:?}", other),
    }
}

#[test]
fn test_exponent_is_right_associative() {
    match expr("2 ** 3 ** 2") {
        Expr::Binary {
            op: BinaryOp::Pow,
            left,
            right,
        } => {
            assert!(matches!(&*left, Expr::LitNum { v } if *v == 2.0));
            assert!(matches!(
                &*right,
                Expr::Binary {
                    op: BinaryOp::Pow,
                    ..
                }
            ));
        }
        other => panic!("Expected power, got {:?}", other),
    }
}

#[test]
fn test_logical_and_nullish() {
    assert!(matches!(
        expr("a && b || c"),
        Expr::Logical {
            op: LogicalOp::Or,
            ..
        }
    ));
    assert!(matches!(
        expr("a ?? b"),
        Expr::Logical {
            op: LogicalOp::Nullish,
            ..
        }
    ));
}

#[test]
fn test_compound_assignment() {
    match expr("total += 2") {
        Expr::Assign { op, target, .. } => {
            assert_eq!(op, AssignOp::Compound(BinaryOp::Add));
            assert!(matches!(&*target, Expr::Ident { name } if name == "total"));
        }
        other => panic!("Expected assignment, got {:?}", other),
    }
}

#[test]
fn test_invalid_assignment_target() {
    let err = parse_expression("1 = 2").unwrap_err();
    assert!(err.message().contains("Invalid left-hand side"));
}

#[test]
fn test_member_index_and_call_chain() {
    match expr("a.b[0](1, 2)") {
        Expr::Call { callee, args } => {
            assert_eq!(args.len(), 2);
            assert!(matches!(&*callee, Expr::Index { object, .. }
                if matches!(&**object, Expr::Member { property, .. } if property == "b")));
        }
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn test_new_expression() {
    match expr("new Error('boom')") {
        Expr::New { callee, args } => {
            assert!(matches!(&*callee, Expr::Ident { name } if name == "Error"));
            assert_eq!(args.len(), 1);
        }
        other => panic!("Expected new, got {:?}", other),
    }
}

#[test]
fn test_update_expressions() {
    assert!(matches!(
        expr("i++"),
        Expr::Update {
            increment: true,
            prefix: false,
            ..
        }
    ));
    assert!(matches!(
        expr("--i"),
        Expr::Update {
            increment: false,
            prefix: true,
            ..
        }
    ));
}

#[test]
fn test_template_literal() {
    match expr("`a${x}b${y + 1}`") {
        Expr::Template { quasis, exprs } => {
            assert_eq!(&*quasis, &["a".to_string(), "b".to_string(), String::new()]);
            assert_eq!(exprs.len(), 2);
        }
        other => panic!("Expected template, got {:?}", other),
    }
}

#[test]
fn test_object_literal_keys() {
    match expr("({ a: 1, 'b c': 2, 3: x, [k]: 4, short, m() { return 1; } })") {
        Expr::LitObj { properties } => {
            let names: Vec<Option<&str>> = properties
                .iter()
                .map(|p| match &p.key {
                    PropKey::Static { name } => Some(name.as_str()),
                    PropKey::Computed { .. } => None,
                })
                .collect();
            assert_eq!(
                names,
                vec![Some("a"), Some("b c"), Some("3"), None, Some("short"), Some("m")]
            );
        }
        other => panic!("Expected object, got {:?}", other),
    }
}

#[test]
fn test_string_escapes() {
    assert!(matches!(expr(r#""a\nb""#), Expr::LitStr { v } if v == "a\nb"));
    assert!(matches!(expr(r"'A\x42'"), Expr::LitStr { v } if v == "AB"));
    assert!(matches!(expr(r#""\uD83D\uDE00""#), Expr::LitStr { v } if v == "\u{1F600}"));
    assert!(matches!(expr(r"'\u{1F600}'"), Expr::LitStr { v } if v == "\u{1F600}"));
}

#[test]
fn test_number_literals() {
    assert!(matches!(expr("0x1F"), Expr::LitNum { v } if v == 31.0));
    assert!(matches!(expr("1.5e3"), Expr::LitNum { v } if v == 1500.0));
    assert!(matches!(expr(".25"), Expr::LitNum { v } if v == 0.25));
}

#[test]
fn test_intrinsics() {
    assert!(matches!(expr("__evaluate"), Expr::Capability));
    assert!(matches!(expr("__watch()"), Expr::WatchSnapshot));
    assert!(matches!(expr("__watch(1)"), Expr::Call { .. }));
}

#[test]
fn test_sequence_expression() {
    assert!(matches!(expr("a, b, c"), Expr::Sequence { exprs } if exprs.len() == 3));
}

/* ===================== Eval Sources ===================== */

#[test]
fn test_eval_source_prefers_expression() {
    assert!(matches!(
        parse_eval_source("x + 1").unwrap(),
        EvalSource::Expression(_)
    ));
    assert!(matches!(
        parse_eval_source("x + 1;").unwrap(),
        EvalSource::Expression(_)
    ));
    assert!(matches!(
        parse_eval_source("let y = 2; y").unwrap(),
        EvalSource::Script(_)
    ));
    assert!(parse_eval_source("let = ").is_err());
}
