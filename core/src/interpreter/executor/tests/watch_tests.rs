//! Tests for `__watch()` snapshots

use super::super::*;
use super::helpers::{build_vm, build_vm_with, field, num, s};

fn first_yield(vm: &mut VM) -> Val {
    assert_eq!(run_until_done(vm), Step::Yield);
    let Control::Suspend(v) = &vm.control else {
        unreachable!("Expected Control::Suspend, got {:?}", vm.control);
    };
    v.clone()
}

fn entries(snapshot: &Val) -> Vec<Val> {
    let Val::List(items) = snapshot else {
        unreachable!("Expected a list, got {:?}", snapshot);
    };
    let items = items.borrow();
    items.clone()
}

#[test]
fn test_watch_snapshot_values_and_failures() {
    let mut vm = build_vm_with(
        "let a = 2; let b = 3; yield __watch();",
        &["a", "b * 10", "missing", "a +"],
        ExecutionLimits::default(),
    );
    let snapshot = entries(&first_yield(&mut vm));

    assert_eq!(snapshot.len(), 4);
    assert_eq!(
        snapshot[0],
        Val::obj([("expression", s("a")), ("value", num(2.0))])
    );
    assert_eq!(field(&snapshot[1], "value"), num(30.0));

    assert_eq!(field(&snapshot[2], "expression"), s("missing"));
    let error = field(&snapshot[2], "error");
    assert_eq!(field(&error, "name"), s("ReferenceError"));
    assert_eq!(field(&error, "message"), s("missing is not defined"));
    assert_eq!(field(&snapshot[2], "value"), Val::Undefined);

    let error = field(&snapshot[3], "error");
    assert_eq!(field(&error, "name"), s("SyntaxError"));
}

#[test]
fn test_watch_follows_current_scope() {
    let source = r#"
        const a = 'outer';
        function g(a) {
            yield __watch();
        }
        g(9);
    "#;
    let mut vm = build_vm_with(source, &["a"], ExecutionLimits::default());
    let snapshot = entries(&first_yield(&mut vm));

    assert_eq!(field(&snapshot[0], "value"), num(9.0));
}

#[test]
fn test_watch_mutes_checkpoints() {
    let source = r#"
        function f() {
            yield 'muted';
            return 1;
        }
        yield __watch();
    "#;
    let mut vm = build_vm_with(source, &["f()"], ExecutionLimits::default());
    let snapshot = entries(&first_yield(&mut vm));

    assert_eq!(field(&snapshot[0], "value"), num(1.0));
    vm.control = Control::None;
    assert_eq!(run_until_done(&mut vm), Step::Done);
}

#[test]
fn test_watch_failure_does_not_leak_operands() {
    let mut vm = build_vm_with(
        "yield [1, __watch(), 2];",
        &["null.x", "'ok'"],
        ExecutionLimits::default(),
    );
    let record = first_yield(&mut vm);

    let Val::List(items) = &record else {
        unreachable!("Expected a list");
    };
    let items = items.borrow();
    assert_eq!(items.len(), 3);
    assert_eq!(items[2], num(2.0));
    let snapshot = entries(&items[1]);
    assert_eq!(field(&snapshot[1], "value"), s("ok"));
}

#[test]
fn test_empty_watch_list() {
    let mut vm = build_vm("yield __watch();");

    assert_eq!(first_yield(&mut vm), Val::list(vec![]));
}
