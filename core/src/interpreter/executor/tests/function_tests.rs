//! Tests for function declarations, closures and calls

use super::super::*;
use super::helpers::{list, num, returned, s, thrown};

#[test]
fn test_function_declaration_hoisted() {
    let source = r#"
        const r = add(2, 3);
        function add(a, b) {
            return a + b;
        }
        return r;
    "#;

    assert_eq!(returned(source), num(5.0));
}

#[test]
fn test_recursion() {
    let source = r#"
        function fact(n) {
            if (n <= 1) return 1;
            return n * fact(n - 1);
        }
        return fact(10);
    "#;

    assert_eq!(returned(source), num(3628800.0));
}

#[test]
fn test_closure_counter() {
    let source = r#"
        function counter() {
            let count = 0;
            return () => {
                count++;
                return count;
            };
        }
        const a = counter();
        const b = counter();
        a();
        a();
        b();
        return [a(), b()];
    "#;

    assert_eq!(returned(source), list(vec![num(3.0), num(2.0)]));
}

#[test]
fn test_arrow_expression_body() {
    assert_eq!(returned("const sq = x => x * x; return sq(7);"), num(49.0));
    assert_eq!(returned("const f = (a, b) => a - b; return f(9, 4);"), num(5.0));
}

#[test]
fn test_named_function_expression_calls_itself() {
    let source = r#"
        const fib = function f(n) {
            return n < 2 ? n : f(n - 1) + f(n - 2);
        };
        return fib(10);
    "#;

    assert_eq!(returned(source), num(55.0));
}

#[test]
fn test_missing_arguments_are_undefined() {
    let source = r#"
        function pair(a, b) {
            return [a, typeof b];
        }
        return pair(1);
    "#;

    assert_eq!(returned(source), list(vec![num(1.0), s("undefined")]));
}

#[test]
fn test_function_without_return_gives_undefined() {
    assert_eq!(returned("function f() { let x = 1; } return f();"), Val::Undefined);
}

#[test]
fn test_method_call_on_object_property() {
    let source = r#"
        const ops = {
            double: (x) => x * 2,
            inc: function (x) { return x + 1; }
        };
        return ops.inc(ops.double(4));
    "#;

    assert_eq!(returned(source), num(9.0));
}

#[test]
fn test_calling_missing_method_throws() {
    let (name, message) = thrown("const o = {}; o.missing();");

    assert_eq!(name, "TypeError");
    assert_eq!(message, "o.missing is not a function");
}

#[test]
fn test_calling_non_function_value_throws() {
    let (name, message) = thrown("const n = 5; n();");

    assert_eq!(name, "TypeError");
    assert_eq!(message, "n is not a function");
}

#[test]
fn test_new_on_non_constructor_throws() {
    let (name, message) = thrown("const f = () => 1; new f();");

    assert_eq!(name, "TypeError");
    assert_eq!(message, "f is not a constructor");
}

#[test]
fn test_higher_order_functions() {
    let source = r#"
        const compose = (f, g) => (x) => f(g(x));
        const inc = (x) => x + 1;
        const dbl = (x) => x * 2;
        return compose(inc, dbl)(5);
    "#;

    assert_eq!(returned(source), num(11.0));
}

#[test]
fn test_parameters_shadow_outer_bindings() {
    let source = r#"
        const x = 'outer';
        function f(x) {
            return x;
        }
        return [f('inner'), x];
    "#;

    assert_eq!(returned(source), list(vec![s("inner"), s("outer")]));
}

#[test]
fn test_function_inspection() {
    let source = r#"
        function named() {}
        return [named, () => 1];
    "#;

    assert_eq!(returned(source).inspect(), "[ [Function: named], [Function (anonymous)] ]");
}
