//! Virtual Machine state
//!
//! The VM holds all execution state:
//! - frames: Stack of active statements and pending expression continuations
//! - values: Operand stack shared by expression frames
//! - control: Current control flow state (return, break, throw, suspend)

use super::errors::{ErrorInfo, STACK_TRACE_LIMIT};
use crate::parser::EvalSource;
use super::scope::{Env, Scope, ScopeKind};
use super::stdlib::ConsoleLine;
use super::types::ast::{FunctionDef, VarKind};
use super::types::{
    Closure, Control, DeclarePhase, DoWhilePhase, Expr, ExprPhase, ForLoopPhase, ForPhase, Frame,
    FrameKind, IfPhase, Stmt, TryPhase, Val, ValuePhase, WatchEntry, WhilePhase,
};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/* ===================== Limits ===================== */

/// Resource limits enforced by a running VM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionLimits {
    /// Maximum frame stack depth
    pub max_frames: usize,
    /// Interpreter steps allowed per resume before a RangeError is raised
    pub max_ticks: u64,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_frames: 10_000,
            max_ticks: 5_000_000,
        }
    }
}

/* ===================== VM ===================== */

/// Virtual Machine state
///
/// This contains everything needed to execute and resume a program.
#[derive(Debug)]
pub struct VM {
    /// Stack of execution frames
    pub frames: Vec<Frame>,

    /// Operand stack
    pub values: Vec<Val>,

    /// Current control flow state
    pub control: Control,

    /// Watch expressions evaluated by `Expr::WatchSnapshot`
    pub watch: Rc<[WatchEntry]>,

    /// Console lines not yet collected by the owner
    pub output: Vec<ConsoleLine>,

    pub limits: ExecutionLimits,

    /// Steps taken since the last resume
    pub(crate) ticks: u64,

    /// Whether the step budget error was already raised during this resume
    pub(crate) budget_exhausted: bool,

    /// Value of the last top-level expression statement of an isolated
    /// statement list
    pub(crate) completion: Option<Val>,
}

impl VM {
    /// Create a new VM with a program
    ///
    /// The program runs in a function scope directly below `globals`.
    pub fn new(
        program: Rc<Stmt>,
        globals: &Env,
        watch: Rc<[WatchEntry]>,
        limits: ExecutionLimits,
    ) -> Self {
        let mut vm = VM::empty(watch, limits);
        let root = Scope::child(globals, ScopeKind::Function);
        push_stmt(&mut vm, &program, &root);
        vm
    }

    /// Create a VM that evaluates `source` against `env` and completes with
    /// `Control::Return(value)` or `Control::Throw(error)`.
    ///
    /// Checkpoints reached while it runs are muted.
    pub fn isolated(source: &EvalSource, env: &Env, limits: ExecutionLimits) -> Self {
        let mut vm = VM::empty(Rc::from(Vec::new()), limits);
        vm.push_frame(FrameKind::Isolate, env.clone());
        match source {
            EvalSource::Expression(expr) => vm.push_expr(expr.clone(), env),
            EvalSource::Script(body) => {
                vm.values.push(Val::Undefined);
                vm.completion = Some(Val::Undefined);
                push_stmt(&mut vm, body, env);
            }
        }
        vm
    }

    fn empty(watch: Rc<[WatchEntry]>, limits: ExecutionLimits) -> Self {
        VM {
            frames: vec![],
            values: vec![],
            control: Control::None,
            watch,
            output: vec![],
            limits,
            ticks: 0,
            budget_exhausted: false,
            completion: None,
        }
    }

    /* ===================== Frame Helpers ===================== */

    pub fn push_frame(&mut self, kind: FrameKind, env: Env) {
        self.frames.push(Frame {
            kind,
            env,
            base_sp: self.values.len(),
        });
    }

    /// Re-push a popped frame, keeping its original operand base
    pub fn restore(&mut self, kind: FrameKind, env: Env, base_sp: usize) {
        self.frames.push(Frame { kind, env, base_sp });
    }

    pub fn push_expr(&mut self, expr: Rc<Expr>, env: &Env) {
        self.push_frame(FrameKind::Eval { expr }, env.clone());
    }

    pub fn pop_value(&mut self) -> Val {
        self.values.pop().unwrap_or(Val::Undefined)
    }

    /// Pop the top `n` operands, preserving their order
    pub fn pop_values(&mut self, n: usize) -> Vec<Val> {
        let at = self.values.len().saturating_sub(n);
        self.values.split_off(at)
    }

    /// True while a watch snapshot or isolated evaluation is on the stack
    pub fn is_muted(&self) -> bool {
        self.frames
            .iter()
            .any(|f| matches!(f.kind, FrameKind::Watch { .. } | FrameKind::Isolate))
    }

    /* ===================== Errors ===================== */

    /// Build an error value whose stack lists the active function calls
    pub fn error_value(&self, name: &str, message: impl Into<String>) -> Val {
        Val::error(ErrorInfo::new(name, message, &self.stack_trace()))
    }

    /// Raise a runtime error
    pub fn throw(&mut self, name: &str, message: impl Into<String>) {
        self.control = Control::Throw(self.error_value(name, message));
    }

    fn stack_trace(&self) -> Vec<String> {
        let mut trace: Vec<String> = self
            .frames
            .iter()
            .rev()
            .filter_map(|f| match &f.kind {
                FrameKind::CallBoundary { name, .. } if name.is_empty() => {
                    Some("<anonymous>".to_string())
                }
                FrameKind::CallBoundary { name, .. } => Some(name.clone()),
                _ => None,
            })
            .take(STACK_TRACE_LIMIT)
            .collect();
        trace.push("<program>".to_string());
        trace
    }

    /// Record the value of a finished expression statement as the
    /// completion value, unless it ran inside a function call
    pub fn complete_with(&mut self, value: Val) {
        if self.completion.is_none() {
            return;
        }
        let in_call = self
            .frames
            .iter()
            .any(|f| matches!(f.kind, FrameKind::CallBoundary { .. }));
        if !in_call {
            self.completion = Some(value);
        }
    }

    /// Collect console output produced since the last call
    pub fn take_output(&mut self) -> Vec<ConsoleLine> {
        std::mem::take(&mut self.output)
    }
}

/* ===================== Frame Management ===================== */

/// Push a new frame for a statement onto the stack
///
/// Statements with nothing to evaluate take effect immediately.
pub fn push_stmt(vm: &mut VM, stmt: &Rc<Stmt>, env: &Env) {
    let kind = match &**stmt {
        Stmt::Block { body, .. } => {
            let scope = Scope::child(env, ScopeKind::Block);
            hoist_functions(body, &scope);
            vm.push_frame(
                FrameKind::Block {
                    body: body.clone(),
                    idx: 0,
                },
                scope,
            );
            return;
        }
        Stmt::Declare {
            var_kind,
            declarations,
            ..
        } => FrameKind::Declare {
            var_kind: *var_kind,
            declarations: declarations.clone(),
            idx: 0,
            phase: DeclarePhase::Init,
        },
        // Hoisted when the enclosing block was entered
        Stmt::Function { .. } | Stmt::Empty { .. } => return,
        Stmt::Expr { expr, .. } => FrameKind::Expr {
            expr: expr.clone(),
            phase: ExprPhase::Eval,
        },
        Stmt::If {
            test,
            then_s,
            else_s,
            ..
        } => FrameKind::If {
            test: test.clone(),
            then_s: then_s.clone(),
            else_s: else_s.clone(),
            phase: IfPhase::Eval,
        },
        Stmt::While { test, body, .. } => FrameKind::While {
            test: test.clone(),
            body: body.clone(),
            phase: WhilePhase::Test,
        },
        Stmt::DoWhile { body, test, .. } => FrameKind::DoWhile {
            test: test.clone(),
            body: body.clone(),
            phase: DoWhilePhase::Body,
        },
        Stmt::For {
            init,
            test,
            update,
            body,
            ..
        } => {
            let scope = Scope::child(env, ScopeKind::Block);
            vm.push_frame(
                FrameKind::For {
                    init: init.clone(),
                    test: test.clone(),
                    update: update.clone(),
                    body: body.clone(),
                    phase: ForPhase::Init,
                },
                scope,
            );
            return;
        }
        Stmt::ForLoop {
            kind,
            var_kind,
            binding,
            iterable,
            body,
            ..
        } => FrameKind::ForLoop {
            kind: *kind,
            var_kind: *var_kind,
            binding: binding.clone(),
            iterable: iterable.clone(),
            body: body.clone(),
            items: vec![],
            idx: 0,
            phase: ForLoopPhase::Eval,
        },
        Stmt::Return { value, .. } => FrameKind::Return {
            value: value.clone(),
            phase: ValuePhase::Eval,
        },
        Stmt::Throw { value, .. } => FrameKind::Throw {
            value: value.clone(),
            phase: ValuePhase::Eval,
        },
        Stmt::Try {
            body,
            catch_var,
            catch_body,
            finally_body,
            ..
        } => {
            vm.push_frame(
                FrameKind::Try {
                    catch_var: catch_var.clone(),
                    catch_body: catch_body.clone(),
                    finally_body: finally_body.clone(),
                    phase: TryPhase::ExecuteTry,
                    pending: None,
                },
                env.clone(),
            );
            push_stmt(vm, body, env);
            return;
        }
        Stmt::Break { .. } => {
            vm.control = Control::Break;
            return;
        }
        Stmt::Continue { .. } => {
            vm.control = Control::Continue;
            return;
        }
        Stmt::Yield { value, .. } => {
            if vm.is_muted() {
                return;
            }
            FrameKind::Yield {
                value: value.clone(),
                phase: ValuePhase::Eval,
            }
        }
    };

    vm.push_frame(kind, env.clone());
}

/// Bind every function declaration of a block before its first statement runs
fn hoist_functions(body: &[Rc<Stmt>], scope: &Env) {
    for stmt in body {
        if let Stmt::Function { def, .. } = &**stmt {
            if let Some(name) = &def.name {
                scope.declare(name.clone(), make_closure(def, scope), true);
            }
        }
    }
}

pub fn make_closure(def: &Rc<FunctionDef>, env: &Env) -> Val {
    Val::Func(Rc::new(Closure {
        def: def.clone(),
        env: env.clone(),
    }))
}

/// Declare a binding according to its declaration kind
pub fn declare_binding(env: &Env, var_kind: VarKind, name: &str, value: Val) {
    match var_kind {
        VarKind::Var => Scope::function_scope(env).declare(name, value, true),
        VarKind::Let => env.declare(name, value, true),
        VarKind::Const => env.declare(name, value, false),
    }
}

/* ===================== Step Result ===================== */

/// Result of executing one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Continue to next step
    Continue,
    /// A checkpoint suspended execution; `vm.control` holds the yielded value
    Yield,
    /// Execution complete; inspect `vm.control` for the outcome
    Done,
}
