//! Core execution loop
//!
//! This module contains the step() function - the heart of the interpreter.
//! It processes one frame at a time, advancing execution phases and managing the frame stack.
//!
//! ## Function Organization
//! Functions are ordered by importance/call hierarchy:
//! 1. run_until_done() - Top-level driver (calls step repeatedly)
//! 2. step() - Main execution loop (dispatches to statement handlers)
//! 3. unwind() - Control flow propagation (break/continue/return/throw)

use super::calls::{apply_call, apply_new, execute_iterate};
use super::errors;
use super::expressions::{self, eval_expr, execute_watch, watch_failure};
use super::scope::{Scope, ScopeKind};
use super::statements::{
    enter_finally, execute_block, execute_declare, execute_do_while, execute_expr, execute_for,
    execute_for_loop, execute_if, execute_isolate, execute_return, execute_throw, execute_try,
    execute_while, execute_yield,
};
use super::types::{Control, Frame, FrameKind, TryPhase, Val, WatchPhase};
use super::vm::{push_stmt, Step, VM};
use tracing::warn;

/* ===================== Public API ===================== */

/// Run the VM until it suspends at a checkpoint or completes
///
/// After `Step::Yield`, `vm.control` holds `Control::Suspend(record)`;
/// clear it and call again to resume. After `Step::Done`, inspect
/// `vm.control` for the final state.
///
/// Each call may take `limits.max_ticks` steps. The first overrun throws a
/// catchable `RangeError` into the program; a second one aborts it.
pub fn run_until_done(vm: &mut VM) -> Step {
    vm.ticks = 0;
    vm.budget_exhausted = false;
    loop {
        match step(vm) {
            Step::Continue => {}
            outcome => return outcome,
        }

        vm.ticks += 1;
        if vm.ticks <= vm.limits.max_ticks {
            continue;
        }
        if vm.budget_exhausted {
            warn!(max_ticks = vm.limits.max_ticks, "step budget exhausted twice, aborting");
            let error = vm.error_value(errors::RANGE_ERROR, "Step budget exhausted");
            vm.frames.clear();
            vm.values.clear();
            vm.control = Control::Throw(error);
            return Step::Done;
        }
        vm.budget_exhausted = true;
        vm.ticks = 0;
        vm.throw(errors::RANGE_ERROR, "Step budget exhausted");
    }
}

/// Execute one step of the VM
///
/// This is the core interpreter loop. It:
/// 1. Checks for active control flow and unwinds if needed
/// 2. Pops the top frame
/// 3. Matches on frame kind and execution phase
/// 4. Lets the handler re-push the frame if it has more work
pub fn step(vm: &mut VM) -> Step {
    match vm.control {
        Control::None => {}
        // A suspended VM stays suspended until its owner clears the control
        Control::Suspend(_) => return Step::Yield,
        _ => return unwind(vm),
    }

    // No frames left - execution complete
    let Some(Frame {
        kind,
        env,
        base_sp,
    }) = vm.frames.pop()
    else {
        return Step::Done;
    };

    match kind {
        /* ----- statements ----- */
        FrameKind::Block { body, idx } => execute_block(vm, body, idx, env, base_sp),
        FrameKind::Declare {
            var_kind,
            declarations,
            idx,
            phase,
        } => execute_declare(vm, var_kind, declarations, idx, phase, env, base_sp),
        FrameKind::Expr { expr, phase } => execute_expr(vm, expr, phase, env, base_sp),
        FrameKind::If {
            test,
            then_s,
            else_s,
            phase,
        } => execute_if(vm, test, then_s, else_s, phase, env, base_sp),
        FrameKind::While { test, body, phase } => {
            execute_while(vm, test, body, phase, env, base_sp)
        }
        FrameKind::DoWhile { test, body, phase } => {
            execute_do_while(vm, test, body, phase, env, base_sp)
        }
        FrameKind::For {
            init,
            test,
            update,
            body,
            phase,
        } => execute_for(vm, init, test, update, body, phase, env, base_sp),
        FrameKind::ForLoop {
            kind,
            var_kind,
            binding,
            iterable,
            body,
            items,
            idx,
            phase,
        } => execute_for_loop(
            vm, kind, var_kind, binding, iterable, body, items, idx, phase, env, base_sp,
        ),
        FrameKind::Return { value, phase } => execute_return(vm, value, phase, env, base_sp),
        FrameKind::Throw { value, phase } => execute_throw(vm, value, phase, env, base_sp),
        FrameKind::Yield { value, phase } => execute_yield(vm, value, phase, env, base_sp),
        FrameKind::Try {
            finally_body,
            phase,
            pending,
            ..
        } => execute_try(vm, finally_body, phase, pending, env, base_sp),

        /* ----- expressions ----- */
        FrameKind::Eval { expr } => eval_expr(vm, &expr, &env),
        FrameKind::Discard => {
            vm.pop_value();
            Step::Continue
        }
        FrameKind::Binary { op } => expressions::apply_binary(vm, op),
        FrameKind::Logical { op, right } => expressions::apply_logical(vm, op, right, &env),
        FrameKind::Conditional {
            consequent,
            alternate,
        } => expressions::apply_conditional(vm, consequent, alternate, &env),
        FrameKind::Unary { op } => expressions::apply_unary(vm, op),
        FrameKind::AssignVar { name, op } => expressions::assign_var(vm, &name, op, &env),
        FrameKind::AssignMember { property, op } => expressions::assign_member(vm, &property, op),
        FrameKind::AssignIndex { op } => expressions::assign_index(vm, op),
        FrameKind::PeekMember { property } => expressions::peek_member(vm, &property),
        FrameKind::PeekIndex { keep_key } => expressions::peek_index(vm, keep_key),
        FrameKind::GetMember { property } => expressions::get_member(vm, &property),
        FrameKind::GetIndex => expressions::get_index(vm),
        FrameKind::UpdateMember {
            property,
            increment,
            prefix,
        } => expressions::update_member(vm, &property, increment, prefix),
        FrameKind::UpdateIndex { increment, prefix } => {
            expressions::update_index(vm, increment, prefix)
        }
        FrameKind::Call {
            argc,
            with_this,
            callee,
        } => apply_call(vm, argc, with_this, &callee, &env),
        FrameKind::New { argc, callee } => apply_new(vm, argc, &callee),
        FrameKind::CallBoundary {
            expression_body, ..
        } => {
            // Fell off the end of a block body
            if !expression_body {
                vm.values.push(Val::Undefined);
            }
            Step::Continue
        }
        FrameKind::BuildList { len } => expressions::build_list(vm, len),
        FrameKind::BuildObject { keys } => expressions::build_object(vm, keys),
        FrameKind::BuildTemplate { quasis } => expressions::build_template(vm, &quasis),
        FrameKind::Watch {
            entries,
            idx,
            results,
            phase,
        } => execute_watch(vm, entries, idx, results, phase, env, base_sp),
        FrameKind::Iterate {
            method,
            callback,
            receiver,
            items,
            idx,
            acc,
            results,
            phase,
        } => execute_iterate(
            vm, method, callback, receiver, items, idx, acc, results, phase, env, base_sp,
        ),
        FrameKind::Isolate => execute_isolate(vm),
    }
}

/* ===================== Control Flow ===================== */

/// Which kind of control flow is being propagated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Break,
    Continue,
    Return,
    Throw,
}

/// Unwind one frame while control flow is active
///
/// Loops catch break/continue, call boundaries catch return, try frames
/// catch throws (and run finally blocks for everything), watch snapshots
/// record throws as the failing entry's result. Every other frame is dropped.
fn unwind(vm: &mut VM) -> Step {
    let signal = match vm.control {
        Control::Break => Signal::Break,
        Control::Continue => Signal::Continue,
        Control::Return(_) => Signal::Return,
        Control::Throw(_) => Signal::Throw,
        Control::None | Control::Suspend(_) => return Step::Continue,
    };

    let Some(Frame {
        kind,
        env,
        base_sp,
    }) = vm.frames.pop()
    else {
        // Nothing left to handle it; the owner inspects `vm.control`
        return Step::Done;
    };
    vm.values.truncate(base_sp);

    match kind {
        kind if kind.is_loop() && signal == Signal::Break => {
            vm.control = Control::None;
        }
        // Loop frames sit at their continue point while the body runs
        kind if kind.is_loop() && signal == Signal::Continue => {
            vm.control = Control::None;
            vm.restore(kind, env, base_sp);
        }

        FrameKind::CallBoundary { .. } if signal == Signal::Return => {
            if let Control::Return(v) = std::mem::replace(&mut vm.control, Control::None) {
                vm.values.push(v);
            }
        }

        FrameKind::Try {
            catch_var,
            catch_body: Some(catch_body),
            finally_body,
            phase: TryPhase::ExecuteTry,
            ..
        } if signal == Signal::Throw => {
            let Control::Throw(error) = std::mem::replace(&mut vm.control, Control::None) else {
                return Step::Continue;
            };
            let scope = Scope::child(&env, ScopeKind::Block);
            if let Some(name) = &catch_var {
                scope.declare(name.clone(), error, true);
            }
            vm.restore(
                FrameKind::Try {
                    catch_var,
                    catch_body: Some(catch_body.clone()),
                    finally_body,
                    phase: TryPhase::ExecuteCatch,
                    pending: None,
                },
                env,
                base_sp,
            );
            push_stmt(vm, &catch_body, &scope);
        }
        FrameKind::Try {
            finally_body: Some(finally_body),
            phase: TryPhase::ExecuteTry | TryPhase::ExecuteCatch,
            ..
        } => {
            let pending = std::mem::replace(&mut vm.control, Control::None);
            enter_finally(vm, finally_body, Some(pending), env, base_sp);
        }

        FrameKind::Watch {
            entries,
            idx,
            mut results,
            ..
        } if signal == Signal::Throw => {
            let Control::Throw(error) = std::mem::replace(&mut vm.control, Control::None) else {
                return Step::Continue;
            };
            if let Some(entry) = entries.get(idx) {
                results.push(watch_failure(&entry.expression, &error));
            }
            vm.restore(
                FrameKind::Watch {
                    entries,
                    idx: idx + 1,
                    results,
                    phase: WatchPhase::Next,
                },
                env,
                base_sp,
            );
        }

        // Dropped
        _ => {}
    }

    if vm.frames.is_empty() && !vm.control.is_none() {
        Step::Done
    } else {
        Step::Continue
    }
}
