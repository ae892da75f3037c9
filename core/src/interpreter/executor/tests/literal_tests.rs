//! Tests for literal values

use super::helpers::{field, list, num, returned, s};
use super::super::Val;

#[test]
fn test_primitive_literals() {
    assert_eq!(
        returned("return [1.5, 'x', true, null, 0x10];"),
        list(vec![num(1.5), s("x"), Val::Bool(true), Val::Null, num(16.0)])
    );
}

#[test]
fn test_object_literal_forms() {
    let source = r#"
        const k = 'b';
        const short = 'S';
        const o = { a: 1, [k]: 2, short, 'quoted key': 3, double(x) { return x * 2; } };
        return [o.a, o.b, o.short, o['quoted key'], o.double(4)];
    "#;

    assert_eq!(
        returned(source),
        list(vec![num(1.0), num(2.0), s("S"), num(3.0), num(8.0)])
    );
}

#[test]
fn test_object_keys_keep_insertion_order() {
    let v = returned("const o = { z: 1, a: 2 }; o.m = 3; return o;");

    assert_eq!(v.inspect(), "{ z: 1, a: 2, m: 3 }");
    assert_eq!(field(&v, "m"), num(3.0));
}

#[test]
fn test_nested_literals() {
    let v = returned("return { list: [1, { deep: [true] }] };");

    assert_eq!(v.inspect(), "{ list: [ 1, { deep: [ true ] } ] }");
}

#[test]
fn test_template_literal() {
    let source = r#"
        const n = 3;
        return `n=${n}, twice=${n * 2}, list=${[1, 2]}`;
    "#;

    assert_eq!(returned(source), s("n=3, twice=6, list=1,2"));
}

#[test]
fn test_number_formatting() {
    assert_eq!(
        returned("return [String(0.1 + 0.2), String(1e21), String(-0), String(1 / 0)];"),
        list(vec![
            s("0.30000000000000004"),
            s("1e+21"),
            s("0"),
            s("Infinity")
        ])
    );
}
