//! Tests for assignment to bindings, members and indices

use super::helpers::{list, num, returned, s, thrown};
use crate::interpreter::executor::Val;

#[test]
fn test_assign_returns_value() {
    assert_eq!(returned("let a; let b = (a = 4); return a + b;"), num(8.0));
}

#[test]
fn test_assign_undeclared_throws() {
    let (name, message) = thrown("y = 1;");

    assert_eq!(name, "ReferenceError");
    assert_eq!(message, "y is not defined");
}

#[test]
fn test_compound_assignment() {
    let source = r#"
        let x = 10;
        x += 5;
        x -= 3;
        x *= 2;
        x /= 4;
        x %= 4;
        x **= 3;
        return x;
    "#;

    assert_eq!(returned(source), num(8.0));
}

#[test]
fn test_string_append() {
    assert_eq!(returned("let t = 'a'; t += 1; t += 'b'; return t;"), s("a1b"));
}

#[test]
fn test_member_and_index_assignment() {
    let source = r#"
        const o = { n: 1 };
        const key = 'm';
        o.n = 2;
        o[key] = 3;
        o.n += 10;
        o[key] *= 2;
        return [o.n, o.m];
    "#;

    assert_eq!(returned(source), list(vec![num(12.0), num(6.0)]));
}

#[test]
fn test_index_assignment_extends_array() {
    let source = r#"
        const a = [1];
        a[3] = 4;
        return a;
    "#;

    assert_eq!(returned(source).inspect(), "[ 1, undefined, undefined, 4 ]");
}

#[test]
fn test_array_length_assignment() {
    assert_eq!(returned("const a = [1, 2, 3]; a.length = 1; return a;"), list(vec![num(1.0)]));

    let (name, message) = thrown("const a = []; a.length = -1;");
    assert_eq!(name, "RangeError");
    assert_eq!(message, "Invalid array length");
}

#[test]
fn test_huge_array_lengths_throw() {
    for source in [
        "const a = []; a.length = 1e19;",
        "const a = []; a.length = 4294967296;",
        "const a = []; a.length = 4e9;",
        "const a = []; a[20000000] = 1;",
    ] {
        let (name, message) = thrown(source);
        assert_eq!(name, "RangeError", "{}", source);
        assert_eq!(message, "Invalid array length", "{}", source);
    }
}

#[test]
fn test_out_of_range_index_is_not_an_element() {
    let (name, _) = thrown("const a = []; a['18446744073709551615'] = 1;");
    assert_eq!(name, "TypeError");

    let (name, _) = thrown("const a = []; a[4294967295] = 1;");
    assert_eq!(name, "TypeError");

    assert_eq!(returned("const a = [1]; return a['18446744073709551615'];"), Val::Undefined);
}

#[test]
fn test_property_on_primitive_throws() {
    let (name, message) = thrown("const t = 'abc'; t.x = 1;");

    assert_eq!(name, "TypeError");
    assert_eq!(message, "Cannot create property 'x' on string 'abc'");
}

#[test]
fn test_objects_are_shared_by_reference() {
    let source = r#"
        const a = { v: 1 };
        const b = a;
        b.v = 2;
        return a.v;
    "#;

    assert_eq!(returned(source), num(2.0));
}
