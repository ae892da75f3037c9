//! Expression evaluation
//!
//! Expressions are evaluated on the frame stack. An `Eval` frame schedules
//! its operands as further `Eval` frames underneath a continuation frame;
//! the continuation then combines the operands from the value stack.
//! Nothing here recurses on the Rust stack, so a user function called from
//! inside an expression can reach a checkpoint and suspend the whole VM.
//!
//! Operands are pushed in reverse so that they are evaluated left to right.

use super::errors::{self, normalize_error};
use super::operators::{binary_op, unary_op};
use super::properties::{get_property, set_property};
use super::scope::{AssignError, Env};
use super::types::ast::{AssignOp, BinaryOp, LogicalOp, PropKey, UnaryOp};
use super::types::{Control, Expr, FrameKind, Val, WatchEntry, WatchPhase};
use super::vm::{make_closure, Step, VM};
use std::rc::Rc;

/* ===================== Eval Result ===================== */

/// Result of a native operation
///
/// Native functions complete immediately, so they either produce a value
/// or throw one.
#[derive(Debug, Clone)]
pub enum EvalResult {
    /// Evaluation completed with a value
    Value { v: Val },

    /// Evaluation threw an error
    Throw { error: Val },
}

impl EvalResult {
    /// Push the value, or start unwinding with the error
    pub fn apply(self, vm: &mut VM) -> Step {
        match self {
            EvalResult::Value { v } => vm.values.push(v),
            EvalResult::Throw { error } => vm.control = Control::Throw(error),
        }
        Step::Continue
    }
}

impl From<Result<Val, Val>> for EvalResult {
    fn from(result: Result<Val, Val>) -> Self {
        match result {
            Ok(v) => EvalResult::Value { v },
            Err(error) => EvalResult::Throw { error },
        }
    }
}

/// Start unwinding with `error`
pub(crate) fn raise(vm: &mut VM, error: Val) -> Step {
    vm.control = Control::Throw(error);
    Step::Continue
}

/// Error raised when assigning to `name` fails
pub(crate) fn assign_error(vm: &VM, name: &str, err: AssignError) -> Val {
    match err {
        AssignError::Undeclared => {
            vm.error_value(errors::REFERENCE_ERROR, format!("{} is not defined", name))
        }
        AssignError::Constant => {
            vm.error_value(errors::TYPE_ERROR, "Assignment to constant variable.")
        }
    }
}

/* ===================== Eval ===================== */

/// Evaluate `expr`, leaving its value on the operand stack once the frames
/// scheduled here have run
pub fn eval_expr(vm: &mut VM, expr: &Rc<Expr>, env: &Env) -> Step {
    match &**expr {
        Expr::LitNum { v } => vm.values.push(Val::Num(*v)),
        Expr::LitStr { v } => vm.values.push(Val::Str(v.clone())),
        Expr::LitBool { v } => vm.values.push(Val::Bool(*v)),
        Expr::LitNull => vm.values.push(Val::Null),

        Expr::LitList { elements } => {
            vm.push_frame(
                FrameKind::BuildList {
                    len: elements.len(),
                },
                env.clone(),
            );
            for element in elements.iter().rev() {
                vm.push_expr(element.clone(), env);
            }
        }

        Expr::LitObj { properties } => {
            let keys = properties
                .iter()
                .map(|p| match &p.key {
                    PropKey::Static { name } => Some(name.clone()),
                    PropKey::Computed { .. } => None,
                })
                .collect();
            vm.push_frame(FrameKind::BuildObject { keys }, env.clone());
            for prop in properties.iter().rev() {
                vm.push_expr(prop.value.clone(), env);
                if let PropKey::Computed { expr } = &prop.key {
                    vm.push_expr(expr.clone(), env);
                }
            }
        }

        Expr::Template { quasis, exprs } => {
            vm.push_frame(
                FrameKind::BuildTemplate {
                    quasis: quasis.clone(),
                },
                env.clone(),
            );
            for e in exprs.iter().rev() {
                vm.push_expr(e.clone(), env);
            }
        }

        Expr::Ident { name } => match env.lookup(name) {
            Some(v) => vm.values.push(v),
            None => {
                let error =
                    vm.error_value(errors::REFERENCE_ERROR, format!("{} is not defined", name));
                return raise(vm, error);
            }
        },

        Expr::Member { object, property } => {
            vm.push_frame(
                FrameKind::GetMember {
                    property: property.clone(),
                },
                env.clone(),
            );
            vm.push_expr(object.clone(), env);
        }

        Expr::Index { object, index } => {
            vm.push_frame(FrameKind::GetIndex, env.clone());
            vm.push_expr(index.clone(), env);
            vm.push_expr(object.clone(), env);
        }

        Expr::Call { callee, args } => {
            let with_this = matches!(&**callee, Expr::Member { .. } | Expr::Index { .. });
            vm.push_frame(
                FrameKind::Call {
                    argc: args.len(),
                    with_this,
                    callee: callee.describe(),
                },
                env.clone(),
            );
            for arg in args.iter().rev() {
                vm.push_expr(arg.clone(), env);
            }
            // Method calls keep the receiver below the callee
            match &**callee {
                Expr::Member { object, property } => {
                    vm.push_frame(
                        FrameKind::PeekMember {
                            property: property.clone(),
                        },
                        env.clone(),
                    );
                    vm.push_expr(object.clone(), env);
                }
                Expr::Index { object, index } => {
                    vm.push_frame(FrameKind::PeekIndex { keep_key: false }, env.clone());
                    vm.push_expr(index.clone(), env);
                    vm.push_expr(object.clone(), env);
                }
                _ => vm.push_expr(callee.clone(), env),
            }
        }

        Expr::New { callee, args } => {
            vm.push_frame(
                FrameKind::New {
                    argc: args.len(),
                    callee: callee.describe(),
                },
                env.clone(),
            );
            for arg in args.iter().rev() {
                vm.push_expr(arg.clone(), env);
            }
            vm.push_expr(callee.clone(), env);
        }

        Expr::Unary { op, operand } => {
            // typeof tolerates undeclared names
            if let (UnaryOp::TypeOf, Expr::Ident { name }) = (op, &**operand) {
                if !env.has(name) {
                    vm.values.push(Val::str("undefined"));
                    return Step::Continue;
                }
            }
            vm.push_frame(FrameKind::Unary { op: *op }, env.clone());
            vm.push_expr(operand.clone(), env);
        }

        Expr::Update {
            increment,
            prefix,
            target,
        } => match &**target {
            Expr::Ident { name } => return update_var(vm, name, *increment, *prefix, env),
            Expr::Member { object, property } => {
                vm.push_frame(
                    FrameKind::UpdateMember {
                        property: property.clone(),
                        increment: *increment,
                        prefix: *prefix,
                    },
                    env.clone(),
                );
                vm.push_expr(object.clone(), env);
            }
            Expr::Index { object, index } => {
                vm.push_frame(
                    FrameKind::UpdateIndex {
                        increment: *increment,
                        prefix: *prefix,
                    },
                    env.clone(),
                );
                vm.push_expr(index.clone(), env);
                vm.push_expr(object.clone(), env);
            }
            _ => {
                let error = vm.error_value(
                    errors::SYNTAX_ERROR,
                    "Invalid left-hand side expression in update operation",
                );
                return raise(vm, error);
            }
        },

        Expr::Binary { op, left, right } => {
            vm.push_frame(FrameKind::Binary { op: *op }, env.clone());
            vm.push_expr(right.clone(), env);
            vm.push_expr(left.clone(), env);
        }

        Expr::Logical { op, left, right } => {
            vm.push_frame(
                FrameKind::Logical {
                    op: *op,
                    right: right.clone(),
                },
                env.clone(),
            );
            vm.push_expr(left.clone(), env);
        }

        Expr::Ternary {
            condition,
            consequent,
            alternate,
        } => {
            vm.push_frame(
                FrameKind::Conditional {
                    consequent: consequent.clone(),
                    alternate: alternate.clone(),
                },
                env.clone(),
            );
            vm.push_expr(condition.clone(), env);
        }

        Expr::Assign { op, target, value } => return schedule_assign(vm, *op, target, value, env),

        Expr::Sequence { exprs } => {
            let Some((last, rest)) = exprs.split_last() else {
                vm.values.push(Val::Undefined);
                return Step::Continue;
            };
            vm.push_expr(last.clone(), env);
            for e in rest.iter().rev() {
                vm.push_frame(FrameKind::Discard, env.clone());
                vm.push_expr(e.clone(), env);
            }
        }

        Expr::Function { def } => vm.values.push(make_closure(def, env)),

        Expr::Capability => vm.values.push(Val::Capability(env.clone())),

        Expr::WatchSnapshot => {
            if vm.is_muted() || vm.watch.is_empty() {
                vm.values.push(Val::list(vec![]));
            } else {
                vm.push_frame(
                    FrameKind::Watch {
                        entries: vm.watch.clone(),
                        idx: 0,
                        results: vec![],
                        phase: WatchPhase::Next,
                    },
                    env.clone(),
                );
            }
        }
    }
    Step::Continue
}

/// `x++` / `--x` on a plain binding completes immediately
fn update_var(vm: &mut VM, name: &str, increment: bool, prefix: bool, env: &Env) -> Step {
    let Some(old) = env.lookup(name) else {
        let error = vm.error_value(errors::REFERENCE_ERROR, format!("{} is not defined", name));
        return raise(vm, error);
    };
    let (old, new) = stepped(&old, increment);
    if let Err(err) = env.assign(name, Val::Num(new)) {
        let error = assign_error(vm, name, err);
        return raise(vm, error);
    }
    vm.values.push(Val::Num(if prefix { new } else { old }));
    Step::Continue
}

fn stepped(old: &Val, increment: bool) -> (f64, f64) {
    let old = old.to_number();
    (old, if increment { old + 1.0 } else { old - 1.0 })
}

/// Schedule an assignment. Compound assignments read the old value first,
/// leaving `[target parts.., old, rhs]` for the continuation.
fn schedule_assign(
    vm: &mut VM,
    op: AssignOp,
    target: &Rc<Expr>,
    value: &Rc<Expr>,
    env: &Env,
) -> Step {
    let compound = matches!(op, AssignOp::Compound(_));
    match &**target {
        Expr::Ident { name } => {
            vm.push_frame(
                FrameKind::AssignVar {
                    name: name.clone(),
                    op,
                },
                env.clone(),
            );
            vm.push_expr(value.clone(), env);
            if compound {
                vm.push_expr(target.clone(), env);
            }
        }
        Expr::Member { object, property } => {
            vm.push_frame(
                FrameKind::AssignMember {
                    property: property.clone(),
                    op,
                },
                env.clone(),
            );
            vm.push_expr(value.clone(), env);
            if compound {
                vm.push_frame(
                    FrameKind::PeekMember {
                        property: property.clone(),
                    },
                    env.clone(),
                );
            }
            vm.push_expr(object.clone(), env);
        }
        Expr::Index { object, index } => {
            vm.push_frame(FrameKind::AssignIndex { op }, env.clone());
            vm.push_expr(value.clone(), env);
            if compound {
                vm.push_frame(FrameKind::PeekIndex { keep_key: true }, env.clone());
            }
            vm.push_expr(index.clone(), env);
            vm.push_expr(object.clone(), env);
        }
        _ => {
            let error = vm.error_value(
                errors::SYNTAX_ERROR,
                "Invalid left-hand side in assignment",
            );
            return raise(vm, error);
        }
    }
    Step::Continue
}

/* ===================== Continuations ===================== */

/// Pop the right-hand side, combining it with the old value for compound ops
fn assigned_value(vm: &mut VM, op: AssignOp) -> Result<Val, Val> {
    let rhs = vm.pop_value();
    match op {
        AssignOp::Assign => Ok(rhs),
        AssignOp::Compound(bop) => {
            let old = vm.pop_value();
            binary_op(vm, bop, &old, &rhs)
        }
    }
}

pub fn apply_binary(vm: &mut VM, op: BinaryOp) -> Step {
    let right = vm.pop_value();
    let left = vm.pop_value();
    EvalResult::from(binary_op(vm, op, &left, &right)).apply(vm)
}

pub fn apply_unary(vm: &mut VM, op: UnaryOp) -> Step {
    let operand = vm.pop_value();
    vm.values.push(unary_op(op, &operand));
    Step::Continue
}

pub fn apply_logical(vm: &mut VM, op: LogicalOp, right: Rc<Expr>, env: &Env) -> Step {
    let left = vm.pop_value();
    let short_circuit = match op {
        LogicalOp::And => !left.is_truthy(),
        LogicalOp::Or => left.is_truthy(),
        LogicalOp::Nullish => !left.is_nullish(),
    };
    if short_circuit {
        vm.values.push(left);
    } else {
        vm.push_expr(right, env);
    }
    Step::Continue
}

pub fn apply_conditional(
    vm: &mut VM,
    consequent: Rc<Expr>,
    alternate: Rc<Expr>,
    env: &Env,
) -> Step {
    let condition = vm.pop_value();
    let branch = if condition.is_truthy() {
        consequent
    } else {
        alternate
    };
    vm.push_expr(branch, env);
    Step::Continue
}

pub fn assign_var(vm: &mut VM, name: &str, op: AssignOp, env: &Env) -> Step {
    let value = match assigned_value(vm, op) {
        Ok(v) => v,
        Err(error) => return raise(vm, error),
    };
    if let Err(err) = env.assign(name, value.clone()) {
        let error = assign_error(vm, name, err);
        return raise(vm, error);
    }
    vm.values.push(value);
    Step::Continue
}

pub fn assign_member(vm: &mut VM, property: &str, op: AssignOp) -> Step {
    let value = match assigned_value(vm, op) {
        Ok(v) => v,
        Err(error) => return raise(vm, error),
    };
    let object = vm.pop_value();
    if let Err(error) = set_property(vm, &object, property, value.clone()) {
        return raise(vm, error);
    }
    vm.values.push(value);
    Step::Continue
}

pub fn assign_index(vm: &mut VM, op: AssignOp) -> Step {
    let value = match assigned_value(vm, op) {
        Ok(v) => v,
        Err(error) => return raise(vm, error),
    };
    let key = vm.pop_value().to_property_key();
    let object = vm.pop_value();
    if let Err(error) = set_property(vm, &object, &key, value.clone()) {
        return raise(vm, error);
    }
    vm.values.push(value);
    Step::Continue
}

pub fn get_member(vm: &mut VM, property: &str) -> Step {
    let object = vm.pop_value();
    EvalResult::from(get_property(vm, &object, property)).apply(vm)
}

pub fn get_index(vm: &mut VM) -> Step {
    let key = vm.pop_value().to_property_key();
    let object = vm.pop_value();
    EvalResult::from(get_property(vm, &object, &key)).apply(vm)
}

pub fn peek_member(vm: &mut VM, property: &str) -> Step {
    let object = vm.values.last().cloned().unwrap_or(Val::Undefined);
    EvalResult::from(get_property(vm, &object, property)).apply(vm)
}

pub fn peek_index(vm: &mut VM, keep_key: bool) -> Step {
    let key = vm.pop_value();
    let object = vm.values.last().cloned().unwrap_or(Val::Undefined);
    let result = get_property(vm, &object, &key.to_property_key());
    if keep_key {
        vm.values.push(key);
    }
    EvalResult::from(result).apply(vm)
}

pub fn update_member(vm: &mut VM, property: &str, increment: bool, prefix: bool) -> Step {
    let object = vm.pop_value();
    update_property(vm, &object, property, increment, prefix)
}

pub fn update_index(vm: &mut VM, increment: bool, prefix: bool) -> Step {
    let key = vm.pop_value().to_property_key();
    let object = vm.pop_value();
    update_property(vm, &object, &key, increment, prefix)
}

fn update_property(vm: &mut VM, object: &Val, key: &str, increment: bool, prefix: bool) -> Step {
    let old = match get_property(vm, object, key) {
        Ok(v) => v,
        Err(error) => return raise(vm, error),
    };
    let (old, new) = stepped(&old, increment);
    if let Err(error) = set_property(vm, object, key, Val::Num(new)) {
        return raise(vm, error);
    }
    vm.values.push(Val::Num(if prefix { new } else { old }));
    Step::Continue
}

pub fn build_list(vm: &mut VM, len: usize) -> Step {
    let items = vm.pop_values(len);
    vm.values.push(Val::list(items));
    Step::Continue
}

pub fn build_object(vm: &mut VM, keys: Vec<Option<String>>) -> Step {
    let computed = keys.iter().filter(|k| k.is_none()).count();
    let mut operands = vm.pop_values(keys.len() + computed).into_iter();
    let mut entries = Vec::with_capacity(keys.len());
    for key in keys {
        let key = match key {
            Some(name) => name,
            None => operands.next().unwrap_or(Val::Undefined).to_property_key(),
        };
        entries.push((key, operands.next().unwrap_or(Val::Undefined)));
    }
    vm.values.push(Val::obj(entries));
    Step::Continue
}

pub fn build_template(vm: &mut VM, quasis: &[String]) -> Step {
    let parts = vm.pop_values(quasis.len().saturating_sub(1));
    let mut text = String::new();
    for (i, quasi) in quasis.iter().enumerate() {
        text.push_str(quasi);
        if let Some(part) = parts.get(i) {
            text.push_str(&part.to_js_string());
        }
    }
    vm.values.push(Val::Str(text));
    Step::Continue
}

/* ===================== Watch Snapshots ===================== */

/// Advance a watch snapshot: evaluate each entry in turn and collect
/// `{expression, value}` or `{expression, error}` records
pub fn execute_watch(
    vm: &mut VM,
    entries: Rc<[WatchEntry]>,
    idx: usize,
    mut results: Vec<Val>,
    phase: WatchPhase,
    env: Env,
    base_sp: usize,
) -> Step {
    match phase {
        WatchPhase::Next => {
            let Some(entry) = entries.get(idx).cloned() else {
                vm.values.push(Val::list(results));
                return Step::Continue;
            };
            match &entry.parsed {
                Ok(expr) => {
                    let expr = expr.clone();
                    vm.restore(
                        FrameKind::Watch {
                            entries,
                            idx,
                            results,
                            phase: WatchPhase::Record,
                        },
                        env.clone(),
                        base_sp,
                    );
                    vm.push_expr(expr, &env);
                }
                Err(message) => {
                    let error = vm.error_value(errors::SYNTAX_ERROR, message.as_str());
                    results.push(watch_failure(&entry.expression, &error));
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
            }
        }
        WatchPhase::Record => {
            let value = vm.pop_value();
            if let Some(entry) = entries.get(idx) {
                results.push(Val::obj([
                    ("expression", Val::str(entry.expression.as_str())),
                    ("value", value),
                ]));
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
    }
    Step::Continue
}

/// Record for a watch entry whose evaluation threw
pub(crate) fn watch_failure(expression: &str, thrown: &Val) -> Val {
    Val::obj([
        ("expression", Val::str(expression)),
        ("error", normalize_error(thrown)),
    ])
}
