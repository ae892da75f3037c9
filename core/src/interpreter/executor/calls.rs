//! Function calls
//!
//! User functions run on the frame stack behind a `CallBoundary` frame.
//! Natives complete immediately, except direct `eval`, evaluation
//! capabilities and the array callback methods, which schedule frames.

use super::errors;
use super::expressions::raise;
use super::scope::{Env, Scope, ScopeKind};
use super::stdlib::{arg, call_stdlib_func, StdlibFunc};
use super::types::ast::FunctionBody;
use super::types::{Closure, FrameKind, IterMethod, IteratePhase, Val};
use super::vm::{push_stmt, Step, VM};
use crate::parser::{parse_eval_source, EvalSource};
use std::rc::Rc;

/// Continuation of a `Call` frame: `[this?, callee, args..]` are on the stack
pub fn apply_call(vm: &mut VM, argc: usize, with_this: bool, callee: &str, env: &Env) -> Step {
    let args = vm.pop_values(argc);
    let func = vm.pop_value();
    let this = if with_this {
        vm.pop_value()
    } else {
        Val::Undefined
    };
    call_value(vm, func, this, args, env, callee)
}

/// Continuation of a `New` frame
pub fn apply_new(vm: &mut VM, argc: usize, callee: &str) -> Step {
    let args = vm.pop_values(argc);
    let func = vm.pop_value();
    match func {
        Val::NativeFunc(native) if native.is_constructor() => {
            call_stdlib_func(vm, native, &Val::Undefined, &args).apply(vm)
        }
        _ => {
            let error =
                vm.error_value(errors::TYPE_ERROR, format!("{} is not a constructor", callee));
            raise(vm, error)
        }
    }
}

/// Call `func`; its result ends up on the operand stack
///
/// `env` is the caller's scope, used by direct `eval`. `desc` names the
/// callee in error messages.
pub fn call_value(
    vm: &mut VM,
    func: Val,
    this: Val,
    args: Vec<Val>,
    env: &Env,
    desc: &str,
) -> Step {
    match func {
        Val::Func(closure) => call_closure(vm, &closure, args),
        Val::NativeFunc(StdlibFunc::Eval) => direct_eval(vm, args.first(), env),
        Val::NativeFunc(StdlibFunc::ArrayCallback(method)) => {
            start_iterate(vm, method, this, &args, env)
        }
        Val::NativeFunc(native) => call_stdlib_func(vm, native, &this, &args).apply(vm),
        Val::Capability(scope) => direct_eval(vm, args.first(), &scope),
        _ => {
            let error = vm.error_value(errors::TYPE_ERROR, format!("{} is not a function", desc));
            raise(vm, error)
        }
    }
}

fn call_closure(vm: &mut VM, closure: &Rc<Closure>, args: Vec<Val>) -> Step {
    if vm.frames.len() >= vm.limits.max_frames {
        let error = vm.error_value(errors::RANGE_ERROR, "Maximum call stack size exceeded");
        return raise(vm, error);
    }

    let def = &closure.def;
    let scope = Scope::child(&closure.env, ScopeKind::Function);
    // Named function expressions can call themselves
    if let Some(name) = &def.name {
        if !def.is_arrow && !def.params.contains(name) {
            scope.declare(name.clone(), Val::Func(closure.clone()), true);
        }
    }
    let mut args = args.into_iter();
    for param in &def.params {
        scope.declare(param.clone(), args.next().unwrap_or(Val::Undefined), true);
    }

    let expression_body = matches!(def.body, FunctionBody::Expr { .. });
    vm.push_frame(
        FrameKind::CallBoundary {
            name: closure.name().to_string(),
            expression_body,
        },
        scope.clone(),
    );
    match &def.body {
        FunctionBody::Block { body } => push_stmt(vm, body, &scope),
        FunctionBody::Expr { expr } => vm.push_expr(expr.clone(), &scope),
    }
    Step::Continue
}

/// `eval(text)` against `env`: expressions produce their value, statement
/// lists produce `undefined`. Non-string arguments are returned unchanged.
fn direct_eval(vm: &mut VM, source: Option<&Val>, env: &Env) -> Step {
    let text = match source {
        None => {
            vm.values.push(Val::Undefined);
            return Step::Continue;
        }
        Some(Val::Str(text)) => text,
        Some(other) => {
            vm.values.push(other.clone());
            return Step::Continue;
        }
    };
    match parse_eval_source(text) {
        Ok(EvalSource::Expression(expr)) => vm.push_expr(expr, env),
        Ok(EvalSource::Script(body)) => {
            vm.values.push(Val::Undefined);
            push_stmt(vm, &body, env);
        }
        Err(err) => {
            let error = vm.error_value(errors::SYNTAX_ERROR, err.summary());
            return raise(vm, error);
        }
    }
    Step::Continue
}

/* ===================== Array Callbacks ===================== */

fn start_iterate(vm: &mut VM, method: IterMethod, receiver: Val, args: &[Val], env: &Env) -> Step {
    let items = match &receiver {
        Val::List(list) => list.borrow().clone(),
        _ => {
            let error = vm.error_value(
                errors::TYPE_ERROR,
                format!("Array.prototype.{} called on a non-array", method.name()),
            );
            return raise(vm, error);
        }
    };
    let callback = arg(args, 0);
    if !callback.is_callable() {
        let error = vm.error_value(
            errors::TYPE_ERROR,
            format!("{} is not a function", callback.inspect()),
        );
        return raise(vm, error);
    }

    let (idx, acc) = match method {
        IterMethod::Reduce if args.len() >= 2 => (0, args[1].clone()),
        IterMethod::Reduce => match items.first() {
            Some(first) => (1, first.clone()),
            None => {
                let error = vm.error_value(
                    errors::TYPE_ERROR,
                    "Reduce of empty array with no initial value",
                );
                return raise(vm, error);
            }
        },
        _ => (0, Val::Undefined),
    };

    vm.push_frame(
        FrameKind::Iterate {
            method,
            callback,
            receiver,
            items,
            idx,
            acc,
            results: vec![],
            phase: IteratePhase::Invoke,
        },
        env.clone(),
    );
    Step::Continue
}

/// Advance an array callback iteration
#[allow(clippy::too_many_arguments)]
pub fn execute_iterate(
    vm: &mut VM,
    method: IterMethod,
    callback: Val,
    receiver: Val,
    items: Vec<Val>,
    idx: usize,
    mut acc: Val,
    mut results: Vec<Val>,
    phase: IteratePhase,
    env: Env,
    base_sp: usize,
) -> Step {
    match phase {
        IteratePhase::Invoke => {
            let Some(item) = items.get(idx).cloned() else {
                vm.values.push(finish_iterate(method, acc, results));
                return Step::Continue;
            };
            let mut call_args = vec![item, Val::Num(idx as f64), receiver.clone()];
            if method == IterMethod::Reduce {
                call_args.insert(0, acc.clone());
            }
            vm.restore(
                FrameKind::Iterate {
                    method,
                    callback: callback.clone(),
                    receiver,
                    items,
                    idx,
                    acc,
                    results,
                    phase: IteratePhase::Collect,
                },
                env.clone(),
                base_sp,
            );
            call_value(vm, callback, Val::Undefined, call_args, &env, "callback")
        }
        IteratePhase::Collect => {
            let result = vm.pop_value();
            let item = items.get(idx).cloned().unwrap_or(Val::Undefined);
            let settled = match method {
                IterMethod::Map => {
                    results.push(result);
                    None
                }
                IterMethod::Filter => {
                    if result.is_truthy() {
                        results.push(item);
                    }
                    None
                }
                IterMethod::ForEach => None,
                IterMethod::Reduce => {
                    acc = result;
                    None
                }
                IterMethod::Find => result.is_truthy().then_some(item),
                IterMethod::FindIndex => result.is_truthy().then(|| Val::Num(idx as f64)),
                IterMethod::Some => result.is_truthy().then_some(Val::Bool(true)),
                IterMethod::Every => (!result.is_truthy()).then_some(Val::Bool(false)),
            };
            if let Some(v) = settled {
                vm.values.push(v);
                return Step::Continue;
            }
            vm.restore(
                FrameKind::Iterate {
                    method,
                    callback,
                    receiver,
                    items,
                    idx: idx + 1,
                    acc,
                    results,
                    phase: IteratePhase::Invoke,
                },
                env,
                base_sp,
            );
            Step::Continue
        }
    }
}

fn finish_iterate(method: IterMethod, acc: Val, results: Vec<Val>) -> Val {
    match method {
        IterMethod::Map | IterMethod::Filter => Val::list(results),
        IterMethod::Reduce => acc,
        IterMethod::ForEach | IterMethod::Find => Val::Undefined,
        IterMethod::FindIndex => Val::Num(-1.0),
        IterMethod::Some => Val::Bool(false),
        IterMethod::Every => Val::Bool(true),
    }
}
