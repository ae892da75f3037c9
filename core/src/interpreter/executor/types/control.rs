//! Control flow and execution frame types

use super::super::scope::Env;
use super::ast::{AssignOp, BinaryOp, Declarator, Expr, ForLoopKind, LogicalOp, Stmt, UnaryOp, VarKind};
use super::phase::{
    DeclarePhase, DoWhilePhase, ExprPhase, ForLoopPhase, ForPhase, IfPhase, IteratePhase, TryPhase,
    ValuePhase, WatchPhase, WhilePhase,
};
use super::values::Val;
use crate::parser::parse_expression;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/* ===================== Control Flow ===================== */

/// Control flow state
///
/// This represents active control flow (return, break, continue, throw, suspend).
/// When control is Break/Continue/Return/Throw, the VM unwinds the stack to find
/// the appropriate handler. For Suspend, the VM stops and hands the yielded
/// value to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    None,
    Break,
    Continue,
    Return(Val),
    Throw(Val),
    Suspend(Val),
}

impl Control {
    pub fn is_none(&self) -> bool {
        matches!(self, Control::None)
    }
}

/* ===================== Watch Entries ===================== */

/// A watch expression, parsed once when the VM is built
#[derive(Debug, Clone)]
pub struct WatchEntry {
    pub expression: String,
    /// Parse failures are reported as that entry's error at every snapshot
    pub parsed: Result<Rc<Expr>, String>,
}

impl WatchEntry {
    pub fn new(expression: impl Into<String>) -> Self {
        let expression = expression.into();
        let parsed = parse_expression(&expression).map_err(|e| e.message().to_string());
        Self { expression, parsed }
    }
}

/* ===================== Array Callbacks ===================== */

/// Array methods whose callbacks run on the VM stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IterMethod {
    Map,
    Filter,
    ForEach,
    Reduce,
    Find,
    FindIndex,
    Some,
    Every,
}

/* ===================== Frames ===================== */

/// Frame kind - the type and state of a statement or expression being executed
#[derive(Debug, Clone)]
pub enum FrameKind {
    // ----- statements -----
    Block {
        body: Rc<[Rc<Stmt>]>,
        idx: usize,
    },
    Declare {
        var_kind: VarKind,
        declarations: Rc<[Declarator]>,
        idx: usize,
        phase: DeclarePhase,
    },
    Expr {
        expr: Rc<Expr>,
        phase: ExprPhase,
    },
    If {
        test: Rc<Expr>,
        then_s: Rc<Stmt>,
        else_s: Option<Rc<Stmt>>,
        phase: IfPhase,
    },
    While {
        test: Rc<Expr>,
        body: Rc<Stmt>,
        phase: WhilePhase,
    },
    DoWhile {
        test: Rc<Expr>,
        body: Rc<Stmt>,
        phase: DoWhilePhase,
    },
    For {
        init: Option<Rc<Stmt>>,
        test: Option<Rc<Expr>>,
        update: Option<Rc<Expr>>,
        body: Rc<Stmt>,
        phase: ForPhase,
    },
    ForLoop {
        kind: ForLoopKind,
        var_kind: Option<VarKind>,
        binding: String,
        iterable: Rc<Expr>,
        body: Rc<Stmt>,
        items: Vec<Val>,
        idx: usize,
        phase: ForLoopPhase,
    },
    Return {
        value: Option<Rc<Expr>>,
        phase: ValuePhase,
    },
    Throw {
        value: Rc<Expr>,
        phase: ValuePhase,
    },
    Try {
        catch_var: Option<String>,
        catch_body: Option<Rc<Stmt>>,
        finally_body: Option<Rc<Stmt>>,
        phase: TryPhase,
        /// Control to resume once the finally block completes
        pending: Option<Control>,
    },
    Yield {
        value: Rc<Expr>,
        phase: ValuePhase,
    },

    // ----- expressions -----
    /// Evaluate an expression, leaving its value on the operand stack
    Eval {
        expr: Rc<Expr>,
    },
    /// Pop and drop one operand
    Discard,
    Binary {
        op: BinaryOp,
    },
    Logical {
        op: LogicalOp,
        right: Rc<Expr>,
    },
    Conditional {
        consequent: Rc<Expr>,
        alternate: Rc<Expr>,
    },
    Unary {
        op: UnaryOp,
    },
    AssignVar {
        name: String,
        op: AssignOp,
    },
    AssignMember {
        property: String,
        op: AssignOp,
    },
    AssignIndex {
        op: AssignOp,
    },
    /// Push `obj.property`, keeping `obj` below it
    PeekMember {
        property: String,
    },
    /// `[obj, key]` becomes `[obj, key?, obj[key]]`
    PeekIndex {
        keep_key: bool,
    },
    GetMember {
        property: String,
    },
    GetIndex,
    UpdateMember {
        property: String,
        increment: bool,
        prefix: bool,
    },
    UpdateIndex {
        increment: bool,
        prefix: bool,
    },
    Call {
        argc: usize,
        with_this: bool,
        callee: String,
    },
    New {
        argc: usize,
        callee: String,
    },
    /// Marks a user function activation; `return` unwinds to here
    CallBoundary {
        name: String,
        expression_body: bool,
    },
    BuildList {
        len: usize,
    },
    /// `None` keys are computed and sit on the operand stack before their value
    BuildObject {
        keys: Vec<Option<String>>,
    },
    BuildTemplate {
        quasis: Rc<[String]>,
    },
    Watch {
        entries: Rc<[WatchEntry]>,
        idx: usize,
        results: Vec<Val>,
        phase: WatchPhase,
    },
    Iterate {
        method: IterMethod,
        callback: Val,
        receiver: Val,
        items: Vec<Val>,
        idx: usize,
        acc: Val,
        results: Vec<Val>,
        phase: IteratePhase,
    },
    /// Root of an isolated evaluation; its result completes the VM
    Isolate,
}

impl FrameKind {
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            FrameKind::While { .. }
                | FrameKind::DoWhile { .. }
                | FrameKind::For { .. }
                | FrameKind::ForLoop { .. }
        )
    }
}

/// Execution frame
///
/// The frame stack replaces the system call stack, so a suspended program is
/// just data held by its owner.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The kind and state of this frame
    pub kind: FrameKind,

    /// Scope the frame executes in
    pub env: Env,

    /// Operand stack height when the frame was pushed; unwinding truncates to it
    pub base_sp: usize,
}
