//! Tests for If statements

use super::helpers::{num, returned, s};

#[test]
fn test_if_true_branch() {
    assert_eq!(returned("let x = 0; if (true) { x = 1; } return x;"), num(1.0));
}

#[test]
fn test_if_false_without_else() {
    assert_eq!(returned("let x = 0; if (0) { x = 1; } return x;"), num(0.0));
}

#[test]
fn test_if_else_chain() {
    let source = r#"
        function grade(n) {
            if (n >= 90) return 'A';
            else if (n >= 80) return 'B';
            else return 'C';
        }
        return grade(95) + grade(85) + grade(10);
    "#;

    assert_eq!(returned(source), s("ABC"));
}

#[test]
fn test_truthiness() {
    let source = r#"
        let count = 0;
        for (const v of [0, '', null, undefined, NaN, 'x', [], {}, -1]) {
            if (v) count++;
        }
        return count;
    "#;

    assert_eq!(returned(source), num(4.0));
}

#[test]
fn test_if_branch_scope() {
    let source = r#"
        let x = 'outer';
        if (true) {
            let x = 'inner';
        }
        return x;
    "#;

    assert_eq!(returned(source), s("outer"));
}
