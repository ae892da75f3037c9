//! Statement execution handlers
//!
//! Each statement type has its own handler function that processes
//! the statement based on its current execution phase. The frame has
//! already been popped when a handler runs; handlers that are not done
//! re-push it with `vm.restore` before scheduling child work.

use super::errors;
use super::expressions::{assign_error, raise};
use super::scope::{Env, Scope, ScopeKind};
use super::types::ast::{Declarator, ForLoopKind, VarKind};
use super::types::{
    Control, DeclarePhase, DoWhilePhase, Expr, ExprPhase, ForLoopPhase, ForPhase, FrameKind,
    IfPhase, Stmt, TryPhase, Val, ValuePhase, WhilePhase,
};
use super::vm::{declare_binding, push_stmt, Step, VM};
use std::rc::Rc;

/* ===================== Statement Handlers ===================== */

/// Execute Block statement
pub fn execute_block(
    vm: &mut VM,
    body: Rc<[Rc<Stmt>]>,
    idx: usize,
    env: Env,
    base_sp: usize,
) -> Step {
    // Block complete
    let Some(child) = body.get(idx).cloned() else {
        return Step::Continue;
    };

    vm.restore(
        FrameKind::Block {
            body,
            idx: idx + 1,
        },
        env.clone(),
        base_sp,
    );
    push_stmt(vm, &child, &env);
    Step::Continue
}

/// Execute a declaration, one declarator at a time
pub fn execute_declare(
    vm: &mut VM,
    var_kind: VarKind,
    declarations: Rc<[Declarator]>,
    idx: usize,
    phase: DeclarePhase,
    env: Env,
    base_sp: usize,
) -> Step {
    let Some(decl) = declarations.get(idx).cloned() else {
        return Step::Continue;
    };

    match phase {
        DeclarePhase::Init => match &decl.init {
            Some(init) => {
                vm.restore(
                    FrameKind::Declare {
                        var_kind,
                        declarations,
                        idx,
                        phase: DeclarePhase::Bind,
                    },
                    env.clone(),
                    base_sp,
                );
                vm.push_expr(init.clone(), &env);
            }
            None => {
                // `var x;` keeps an existing value
                let keeps_value = var_kind == VarKind::Var
                    && Scope::function_scope(&env).has_own(&decl.name);
                if !keeps_value {
                    declare_binding(&env, var_kind, &decl.name, Val::Undefined);
                }
                vm.restore(
                    FrameKind::Declare {
                        var_kind,
                        declarations,
                        idx: idx + 1,
                        phase: DeclarePhase::Init,
                    },
                    env,
                    base_sp,
                );
            }
        },
        DeclarePhase::Bind => {
            let value = vm.pop_value();
            declare_binding(&env, var_kind, &decl.name, value);
            vm.restore(
                FrameKind::Declare {
                    var_kind,
                    declarations,
                    idx: idx + 1,
                    phase: DeclarePhase::Init,
                },
                env,
                base_sp,
            );
        }
    }
    Step::Continue
}

/// Execute an expression statement
pub fn execute_expr(vm: &mut VM, expr: Rc<Expr>, phase: ExprPhase, env: Env, base_sp: usize) -> Step {
    match phase {
        ExprPhase::Eval => {
            vm.restore(
                FrameKind::Expr {
                    expr: expr.clone(),
                    phase: ExprPhase::Discard,
                },
                env.clone(),
                base_sp,
            );
            vm.push_expr(expr, &env);
        }
        ExprPhase::Discard => {
            let value = vm.pop_value();
            vm.complete_with(value);
        }
    }
    Step::Continue
}

/// Execute If statement
pub fn execute_if(
    vm: &mut VM,
    test: Rc<Expr>,
    then_s: Rc<Stmt>,
    else_s: Option<Rc<Stmt>>,
    phase: IfPhase,
    env: Env,
    base_sp: usize,
) -> Step {
    match phase {
        IfPhase::Eval => {
            vm.restore(
                FrameKind::If {
                    test: test.clone(),
                    then_s,
                    else_s,
                    phase: IfPhase::Branch,
                },
                env.clone(),
                base_sp,
            );
            vm.push_expr(test, &env);
        }
        IfPhase::Branch => {
            if vm.pop_value().is_truthy() {
                push_stmt(vm, &then_s, &env);
            } else if let Some(else_s) = &else_s {
                push_stmt(vm, else_s, &env);
            }
        }
    }
    Step::Continue
}

/// Execute While statement
pub fn execute_while(
    vm: &mut VM,
    test: Rc<Expr>,
    body: Rc<Stmt>,
    phase: WhilePhase,
    env: Env,
    base_sp: usize,
) -> Step {
    match phase {
        WhilePhase::Test => {
            vm.restore(
                FrameKind::While {
                    test: test.clone(),
                    body,
                    phase: WhilePhase::Check,
                },
                env.clone(),
                base_sp,
            );
            vm.push_expr(test, &env);
        }
        WhilePhase::Check => {
            if vm.pop_value().is_truthy() {
                vm.restore(
                    FrameKind::While {
                        test,
                        body: body.clone(),
                        phase: WhilePhase::Test,
                    },
                    env.clone(),
                    base_sp,
                );
                push_stmt(vm, &body, &env);
            }
        }
    }
    Step::Continue
}

/// Execute do/while statement
pub fn execute_do_while(
    vm: &mut VM,
    test: Rc<Expr>,
    body: Rc<Stmt>,
    phase: DoWhilePhase,
    env: Env,
    base_sp: usize,
) -> Step {
    match phase {
        DoWhilePhase::Body => {
            vm.restore(
                FrameKind::DoWhile {
                    test,
                    body: body.clone(),
                    phase: DoWhilePhase::Test,
                },
                env.clone(),
                base_sp,
            );
            push_stmt(vm, &body, &env);
        }
        DoWhilePhase::Test => {
            vm.restore(
                FrameKind::DoWhile {
                    test: test.clone(),
                    body,
                    phase: DoWhilePhase::Check,
                },
                env.clone(),
                base_sp,
            );
            vm.push_expr(test, &env);
        }
        DoWhilePhase::Check => {
            if vm.pop_value().is_truthy() {
                return execute_do_while(vm, test, body, DoWhilePhase::Body, env, base_sp);
            }
        }
    }
    Step::Continue
}

/// Execute `for(init; test; update)`; `env` is the loop's own scope
#[allow(clippy::too_many_arguments)]
pub fn execute_for(
    vm: &mut VM,
    init: Option<Rc<Stmt>>,
    test: Option<Rc<Expr>>,
    update: Option<Rc<Expr>>,
    body: Rc<Stmt>,
    phase: ForPhase,
    env: Env,
    base_sp: usize,
) -> Step {
    let next = |phase| FrameKind::For {
        init: init.clone(),
        test: test.clone(),
        update: update.clone(),
        body: body.clone(),
        phase,
    };

    match phase {
        ForPhase::Init => {
            vm.restore(next(ForPhase::Test), env.clone(), base_sp);
            if let Some(init) = &init {
                push_stmt(vm, init, &env);
            }
        }
        ForPhase::Test => {
            vm.restore(next(ForPhase::Check), env.clone(), base_sp);
            match &test {
                Some(test) => vm.push_expr(test.clone(), &env),
                None => vm.values.push(Val::Bool(true)),
            }
        }
        ForPhase::Check => {
            if vm.pop_value().is_truthy() {
                vm.restore(next(ForPhase::Update), env.clone(), base_sp);
                push_stmt(vm, &body, &env);
            }
        }
        ForPhase::Update => {
            // Each iteration gets its own copy of the loop bindings
            let env = Scope::copy_of(&env);
            vm.restore(next(ForPhase::Test), env.clone(), base_sp);
            if let Some(update) = &update {
                vm.push_frame(FrameKind::Discard, env.clone());
                vm.push_expr(update.clone(), &env);
            }
        }
    }
    Step::Continue
}

/// Execute for-of / for-in
#[allow(clippy::too_many_arguments)]
pub fn execute_for_loop(
    vm: &mut VM,
    kind: ForLoopKind,
    var_kind: Option<VarKind>,
    binding: String,
    iterable: Rc<Expr>,
    body: Rc<Stmt>,
    items: Vec<Val>,
    idx: usize,
    phase: ForLoopPhase,
    env: Env,
    base_sp: usize,
) -> Step {
    match phase {
        ForLoopPhase::Eval => {
            vm.restore(
                FrameKind::ForLoop {
                    kind,
                    var_kind,
                    binding,
                    iterable: iterable.clone(),
                    body,
                    items,
                    idx,
                    phase: ForLoopPhase::Collect,
                },
                env.clone(),
                base_sp,
            );
            vm.push_expr(iterable, &env);
        }
        ForLoopPhase::Collect => {
            let source = vm.pop_value();
            let items = match iteration_items(kind, &source) {
                Some(items) => items,
                None => {
                    let error = vm.error_value(
                        errors::TYPE_ERROR,
                        format!("{} is not iterable", source.inspect()),
                    );
                    return raise(vm, error);
                }
            };
            vm.restore(
                FrameKind::ForLoop {
                    kind,
                    var_kind,
                    binding,
                    iterable,
                    body,
                    items,
                    idx: 0,
                    phase: ForLoopPhase::Next,
                },
                env,
                base_sp,
            );
        }
        ForLoopPhase::Next => {
            let Some(item) = items.get(idx).cloned() else {
                return Step::Continue;
            };
            let scope = match var_kind {
                Some(var_kind) => {
                    let scope = Scope::child(&env, ScopeKind::Block);
                    declare_binding(&scope, var_kind, &binding, item);
                    scope
                }
                None => {
                    if let Err(err) = env.assign(&binding, item) {
                        let error = assign_error(vm, &binding, err);
                        return raise(vm, error);
                    }
                    env.clone()
                }
            };
            vm.restore(
                FrameKind::ForLoop {
                    kind,
                    var_kind,
                    binding,
                    iterable,
                    body: body.clone(),
                    items,
                    idx: idx + 1,
                    phase: ForLoopPhase::Next,
                },
                env,
                base_sp,
            );
            push_stmt(vm, &body, &scope);
        }
    }
    Step::Continue
}

/// Values visited by for-of, keys visited by for-in; `None` if not iterable
fn iteration_items(kind: ForLoopKind, source: &Val) -> Option<Vec<Val>> {
    match (kind, source) {
        (ForLoopKind::Of, Val::List(items)) => Some(items.borrow().clone()),
        (ForLoopKind::Of, Val::Str(s)) => Some(s.chars().map(|c| Val::Str(c.to_string())).collect()),
        (ForLoopKind::Of, _) => None,
        (ForLoopKind::In, Val::Obj(map)) => Some(map.borrow().keys().map(Val::str).collect()),
        (ForLoopKind::In, Val::List(items)) => Some(indices(items.borrow().len())),
        (ForLoopKind::In, Val::Str(s)) => Some(indices(s.chars().count())),
        (ForLoopKind::In, _) => Some(vec![]),
    }
}

fn indices(len: usize) -> Vec<Val> {
    (0..len).map(|i| Val::Str(i.to_string())).collect()
}

/// Execute Return statement
pub fn execute_return(
    vm: &mut VM,
    value: Option<Rc<Expr>>,
    phase: ValuePhase,
    env: Env,
    base_sp: usize,
) -> Step {
    match (phase, value) {
        (ValuePhase::Eval, Some(expr)) => {
            vm.restore(
                FrameKind::Return {
                    value: Some(expr.clone()),
                    phase: ValuePhase::Apply,
                },
                env.clone(),
                base_sp,
            );
            vm.push_expr(expr, &env);
        }
        (ValuePhase::Eval, None) => vm.control = Control::Return(Val::Undefined),
        (ValuePhase::Apply, _) => {
            let v = vm.pop_value();
            vm.control = Control::Return(v);
        }
    }
    Step::Continue
}

/// Execute Throw statement
pub fn execute_throw(
    vm: &mut VM,
    value: Rc<Expr>,
    phase: ValuePhase,
    env: Env,
    base_sp: usize,
) -> Step {
    match phase {
        ValuePhase::Eval => {
            vm.restore(
                FrameKind::Throw {
                    value: value.clone(),
                    phase: ValuePhase::Apply,
                },
                env.clone(),
                base_sp,
            );
            vm.push_expr(value, &env);
        }
        ValuePhase::Apply => {
            let error = vm.pop_value();
            vm.control = Control::Throw(error);
        }
    }
    Step::Continue
}

/// Execute a checkpoint: evaluate the record, then suspend with it
pub fn execute_yield(
    vm: &mut VM,
    value: Rc<Expr>,
    phase: ValuePhase,
    env: Env,
    base_sp: usize,
) -> Step {
    match phase {
        ValuePhase::Eval => {
            vm.restore(
                FrameKind::Yield {
                    value: value.clone(),
                    phase: ValuePhase::Apply,
                },
                env.clone(),
                base_sp,
            );
            vm.push_expr(value, &env);
            Step::Continue
        }
        ValuePhase::Apply => {
            let record = vm.pop_value();
            vm.control = Control::Suspend(record);
            Step::Yield
        }
    }
}

/// Execute Try statement once its current block completed normally
pub fn execute_try(
    vm: &mut VM,
    finally_body: Option<Rc<Stmt>>,
    phase: TryPhase,
    pending: Option<Control>,
    env: Env,
    base_sp: usize,
) -> Step {
    match phase {
        TryPhase::ExecuteTry | TryPhase::ExecuteCatch => {
            if let Some(finally_body) = finally_body {
                enter_finally(vm, finally_body, None, env, base_sp);
            }
        }
        TryPhase::ExecuteFinally => {
            // Resume whatever the finally block interrupted
            if let Some(control) = pending {
                vm.control = control;
            }
        }
    }
    Step::Continue
}

/// Run `finally_body`, then restore `pending`
pub(crate) fn enter_finally(
    vm: &mut VM,
    finally_body: Rc<Stmt>,
    pending: Option<Control>,
    env: Env,
    base_sp: usize,
) {
    vm.restore(
        FrameKind::Try {
            catch_var: None,
            catch_body: None,
            finally_body: Some(finally_body.clone()),
            phase: TryPhase::ExecuteFinally,
            pending,
        },
        env.clone(),
        base_sp,
    );
    push_stmt(vm, &finally_body, &env);
}

/// Root of an isolated evaluation completed: hand its value to the owner
pub fn execute_isolate(vm: &mut VM) -> Step {
    let v = vm.pop_value();
    let v = vm.completion.take().unwrap_or(v);
    vm.values.clear();
    vm.control = Control::Return(v);
    Step::Done
}
