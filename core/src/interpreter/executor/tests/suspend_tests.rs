//! Tests for suspending at checkpoints and resuming

use super::super::*;
use super::helpers::{build_vm, field, num, s};

/// Drive `vm` to completion, collecting every yielded value
fn collect_yields(vm: &mut VM) -> Vec<Val> {
    let mut yielded = vec![];
    while run_until_done(vm) == Step::Yield {
        let Control::Suspend(v) = std::mem::replace(&mut vm.control, Control::None) else {
            unreachable!("Expected Control::Suspend");
        };
        yielded.push(v);
    }
    yielded
}

#[test]
fn test_yield_sequence_then_return() {
    let mut vm = build_vm("let i = 0; while (i < 3) { yield i; i++; } return 'end';");

    assert_eq!(collect_yields(&mut vm), vec![num(0.0), num(1.0), num(2.0)]);
    assert_eq!(vm.control, Control::Return(s("end")));
}

#[test]
fn test_suspended_vm_stays_suspended() {
    let mut vm = build_vm("yield 1; yield 2;");

    assert_eq!(run_until_done(&mut vm), Step::Yield);
    assert_eq!(step(&mut vm), Step::Yield);
    assert_eq!(run_until_done(&mut vm), Step::Yield);
    assert_eq!(vm.control, Control::Suspend(num(1.0)));
}

#[test]
fn test_yield_inside_callbacks_and_calls() {
    let source = r#"
        function visit(v) {
            yield 'visit ' + v;
            return v * 2;
        }
        const doubled = [10, 20].map((v) => {
            yield v;
            return visit(v);
        });
        return doubled;
    "#;
    let mut vm = build_vm(source);

    assert_eq!(
        collect_yields(&mut vm),
        vec![num(10.0), s("visit 10"), num(20.0), s("visit 20")]
    );
    assert_eq!(
        vm.control,
        Control::Return(Val::list(vec![num(20.0), num(40.0)]))
    );
}

#[test]
fn test_yield_inside_try_finally() {
    let source = r#"
        const log = [];
        try {
            yield 'in try';
            throw new Error('x');
        } catch (e) {
            yield 'in catch';
        } finally {
            yield 'in finally';
        }
        return 'after';
    "#;
    let mut vm = build_vm(source);

    assert_eq!(
        collect_yields(&mut vm),
        vec![s("in try"), s("in catch"), s("in finally")]
    );
    assert_eq!(vm.control, Control::Return(s("after")));
}

#[test]
fn test_yielded_record_carries_live_state() {
    let source = r#"
        let total = 0;
        for (const v of [1, 2]) {
            total += v;
            yield { line: 4, total: total, evaluate: __evaluate };
        }
    "#;
    let mut vm = build_vm(source);
    let records = collect_yields(&mut vm);

    assert_eq!(records.len(), 2);
    assert_eq!(field(&records[0], "total"), num(1.0));
    assert_eq!(field(&records[1], "total"), num(3.0));
    assert!(matches!(field(&records[0], "evaluate"), Val::Capability(_)));
    assert_eq!(vm.control, Control::None);
}

#[test]
fn test_console_output_between_yields() {
    let mut vm = build_vm("console.log('a'); yield 1; console.log('b');");

    assert_eq!(run_until_done(&mut vm), Step::Yield);
    let first: Vec<String> = vm.take_output().into_iter().map(|l| l.text).collect();
    assert_eq!(first, vec!["a"]);

    vm.control = Control::None;
    assert_eq!(run_until_done(&mut vm), Step::Done);
    let second: Vec<String> = vm.take_output().into_iter().map(|l| l.text).collect();
    assert_eq!(second, vec!["b"]);
}
