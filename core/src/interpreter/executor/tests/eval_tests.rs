//! Tests for `eval`, evaluation capabilities and isolated evaluation

use super::super::*;
use super::helpers::{build_vm, num, returned, s, thrown};
use crate::parser::parse_eval_source;

#[test]
fn test_eval_expression_sees_caller_scope() {
    let source = r#"
        let y = 2;
        function scaled(k) {
            return eval('y * k');
        }
        return scaled(5);
    "#;

    assert_eq!(returned(source), num(10.0));
}

#[test]
fn test_eval_script_returns_undefined_and_mutates() {
    let source = r#"
        let y = 1;
        const r = eval('y = 7; let hidden = 1;');
        return [r, y, typeof hidden];
    "#;

    assert_eq!(returned(source).inspect(), "[ undefined, 7, 'undefined' ]");
}

#[test]
fn test_eval_non_string_is_returned_unchanged() {
    assert_eq!(returned("return eval(5);"), num(5.0));
    assert_eq!(returned("return eval();"), Val::Undefined);
}

#[test]
fn test_eval_syntax_error_is_catchable() {
    let source = r#"
        try {
            eval('1 +');
        } catch (e) {
            return e.name;
        }
    "#;

    assert_eq!(returned(source), s("SyntaxError"));
}

#[test]
fn test_capability_evaluates_in_defining_scope() {
    let source = r#"
        function make() {
            const secret = 41;
            return __evaluate;
        }
        const ev = make();
        return [ev('secret + 1'), typeof ev, ev.name];
    "#;

    assert_eq!(returned(source).inspect(), "[ 42, 'function', 'evaluate' ]");
}

#[test]
fn test_capability_errors_propagate() {
    let (name, message) = thrown("const ev = __evaluate; ev('nope');");

    assert_eq!(name, "ReferenceError");
    assert_eq!(message, "nope is not defined");
}

fn suspended_capability(vm: &mut VM) -> Env {
    assert_eq!(run_until_done(vm), Step::Yield);
    let Control::Suspend(Val::Capability(env)) = &vm.control else {
        unreachable!("Expected a suspended capability, got {:?}", vm.control);
    };
    env.clone()
}

#[test]
fn test_isolated_evaluation_against_suspended_scope() {
    let mut vm = build_vm("let x = 4; yield __evaluate; return x;");
    let env = suspended_capability(&mut vm);

    let expr = parse_eval_source("x * 2").expect("parse");
    let mut isolated = VM::isolated(&expr, &env, ExecutionLimits::default());
    assert_eq!(run_until_done(&mut isolated), Step::Done);
    assert_eq!(isolated.control, Control::Return(num(8.0)));

    // Scripts mutate the live scope; the program sees the change on resume
    let script = parse_eval_source("x = x + 1; yield 99;").expect("parse");
    let mut isolated = VM::isolated(&script, &env, ExecutionLimits::default());
    assert_eq!(run_until_done(&mut isolated), Step::Done);
    assert_eq!(isolated.control, Control::Return(num(5.0)));

    vm.control = Control::None;
    assert_eq!(run_until_done(&mut vm), Step::Done);
    assert_eq!(vm.control, Control::Return(num(5.0)));
}

#[test]
fn test_isolated_evaluation_mutes_checkpoints_in_calls() {
    let source = r#"
        let calls = 0;
        function tick() {
            calls++;
            yield 'inside';
            return calls;
        }
        yield __evaluate;
    "#;
    let mut vm = build_vm(source);
    let env = suspended_capability(&mut vm);

    let expr = parse_eval_source("tick() + tick()").expect("parse");
    let mut isolated = VM::isolated(&expr, &env, ExecutionLimits::default());

    assert_eq!(run_until_done(&mut isolated), Step::Done);
    assert_eq!(isolated.control, Control::Return(num(3.0)));
}

#[test]
fn test_isolated_evaluation_throw() {
    let mut vm = build_vm("const o = null; yield __evaluate;");
    let env = suspended_capability(&mut vm);

    let expr = parse_eval_source("o.field").expect("parse");
    let mut isolated = VM::isolated(&expr, &env, ExecutionLimits::default());
    assert_eq!(run_until_done(&mut isolated), Step::Done);

    let Control::Throw(Val::Error(info)) = &isolated.control else {
        unreachable!("Expected a thrown error, got {:?}", isolated.control);
    };
    assert_eq!(info.message, "Cannot read properties of null (reading 'field')");
}
