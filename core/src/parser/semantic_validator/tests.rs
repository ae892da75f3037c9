use super::*;
use crate::parser::parse_program;

fn validate(source: &str) -> Vec<ValidationError> {
    let script = parse_program(source).expect("Parse should succeed");
    validate_script(&script)
}

fn has_rule(errors: &[ValidationError], rule_id: &str) -> bool {
    errors.iter().any(|e| e.rule_id == rule_id)
}

fn for_rule<'a>(errors: &'a [ValidationError], rule_id: &str) -> Vec<&'a ValidationError> {
    errors.iter().filter(|e| e.rule_id == rule_id).collect()
}

/* ===================== Loop Control ===================== */

#[test]
fn test_break_outside_loop() {
    let errors = validate("let x = 1;\nbreak;");

    let loop_errors = for_rule(&errors, "loop-control");
    assert_eq!(loop_errors.len(), 1);
    assert_eq!(loop_errors[0].message, "Illegal break statement");
    assert_eq!(loop_errors[0].span.start_line, 1);
}

#[test]
fn test_break_and_continue_inside_loops_ok() {
    let source = r#"
while (true) { break; }
for (let i = 0; i < 3; i++) { if (i) continue; }
for (const k in {}) { break; }
do { continue; } while (false);
"#;

    let errors = validate(source);
    assert!(!has_rule(&errors, "loop-control"));
}

#[test]
fn test_continue_in_callback_inside_loop() {
    let source = r#"
while (true) {
    [1, 2].forEach((x) => { continue; });
    break;
}
"#;

    let errors = validate(source);
    let loop_errors = for_rule(&errors, "loop-control");
    assert_eq!(loop_errors.len(), 1);
    assert!(loop_errors[0].message.contains("continue"));
}

/* ===================== Const Initializer ===================== */

#[test]
fn test_const_without_initializer() {
    let errors = validate("const x;");

    let const_errors = for_rule(&errors, "const-initializer");
    assert_eq!(const_errors.len(), 1);
    assert!(const_errors[0].message.contains("'x'"));
}

#[test]
fn test_const_in_nested_function() {
    let source = r#"
function outer() {
    const inner = () => { const y; return 1; };
    return inner;
}
"#;

    let errors = validate(source);
    assert!(has_rule(&errors, "const-initializer"));
}

#[test]
fn test_let_without_initializer_ok() {
    let errors = validate("let x; var y;");
    assert!(errors.is_empty());
}

/* ===================== Duplicate Declaration ===================== */

#[test]
fn test_duplicate_let() {
    let errors = validate("let x = 1;\nlet x = 2;");

    let dupes = for_rule(&errors, "duplicate-declaration");
    assert_eq!(dupes.len(), 1);
    assert_eq!(dupes[0].message, "Identifier 'x' has already been declared");
}

#[test]
fn test_let_shadowing_in_inner_block_ok() {
    let source = r#"
let x = 1;
{ let x = 2; }
if (x) { const x = 3; }
"#;

    let errors = validate(source);
    assert!(!has_rule(&errors, "duplicate-declaration"));
}

#[test]
fn test_var_redeclaration_ok() {
    let errors = validate("var a = 1; var a = 2;");
    assert!(errors.is_empty());
}

#[test]
fn test_let_clashes_with_var_and_params() {
    let source = r#"
var a = 1;
let a = 2;
function f(p) { let p = 1; return p; }
"#;

    let errors = validate(source);
    let dupes = for_rule(&errors, "duplicate-declaration");
    assert_eq!(dupes.len(), 2);
}

#[test]
fn test_duplicate_function_declaration() {
    let errors = validate("function f() {}\nfunction f() {}");
    assert!(has_rule(&errors, "duplicate-declaration"));
}

/* ===================== Validator Integration ===================== */

#[test]
fn test_valid_script_has_no_errors() {
    let source = r#"
let total = 0;
for (const n of [1, 2, 3]) {
    total += n;
}
function double(v) { return v * 2; }
console.log(double(total));
"#;

    assert!(validate(source).is_empty());
}

#[test]
fn test_errors_sorted_by_position() {
    let errors = validate("const a;\nbreak;\nlet b = 1; let b = 2;");

    assert_eq!(errors.len(), 3);
    let lines: Vec<usize> = errors.iter().map(|e| e.span.start_line).collect();
    assert_eq!(lines, vec![0, 1, 2]);
}

#[test]
fn test_display_format() {
    let errors = validate("\n  break;");

    assert_eq!(
        errors[0].to_string(),
        "Illegal break statement at 2:3 (loop-control)"
    );
}

#[test]
fn test_rules_listing() {
    let validator = Validator::default();
    let ids: Vec<&str> = validator.rule_ids().collect();
    assert_eq!(
        ids,
        vec!["loop-control", "const-initializer", "duplicate-declaration"]
    );
}
