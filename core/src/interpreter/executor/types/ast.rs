//! Abstract Syntax Tree node types
//!
//! Child nodes are reference counted so that frames can hold on to the
//! subtree they are executing without cloning it.

use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Source location span for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    /// Start byte offset
    pub start: usize,
    /// End byte offset
    pub end: usize,
    /// Start line (0-indexed)
    pub start_line: usize,
    /// Start column (0-indexed)
    pub start_col: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, start_line: usize, start_col: usize) -> Self {
        Self {
            start,
            end,
            start_line,
            start_col,
        }
    }
}

pub(crate) fn is_default_span(span: &Span) -> bool {
    *span == Span::default()
}

/// Variable declaration kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    Let,
    Const,
    Var,
}

/// For loop kind (in vs of)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForLoopKind {
    /// for (let k in obj) - iterates over keys
    In,
    /// for (let v of arr) - iterates over values
    Of,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Lte,
    Gt,
    Gte,
    InstanceOf,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
    Void,
}

/// Assignment operator; compound forms carry the binary op they apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", content = "op")]
pub enum AssignOp {
    Assign,
    Compound(BinaryOp),
}

/// One `name = init` pair of a declaration statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Rc<Expr>>,
}

/// Object literal key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum PropKey {
    Static { name: String },
    Computed { expr: Rc<Expr> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub key: PropKey,
    pub value: Rc<Expr>,
}

/// Function body: arrows may have a bare expression body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum FunctionBody {
    Block { body: Rc<Stmt> },
    Expr { expr: Rc<Expr> },
}

/// Shared definition behind function declarations, expressions and arrows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: FunctionBody,
    #[serde(default)]
    pub is_arrow: bool,
}

/// Statement AST node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Stmt {
    Block {
        body: Rc<[Rc<Stmt>]>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Declare {
        var_kind: VarKind,
        declarations: Rc<[Declarator]>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Function {
        def: Rc<FunctionDef>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    If {
        test: Rc<Expr>,
        then_s: Rc<Stmt>,
        else_s: Option<Rc<Stmt>>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    While {
        test: Rc<Expr>,
        body: Rc<Stmt>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    DoWhile {
        body: Rc<Stmt>,
        test: Rc<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    For {
        init: Option<Rc<Stmt>>,
        test: Option<Rc<Expr>>,
        update: Option<Rc<Expr>>,
        body: Rc<Stmt>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    ForLoop {
        kind: ForLoopKind,
        /// `None` assigns to an existing binding
        var_kind: Option<VarKind>,
        binding: String,
        iterable: Rc<Expr>,
        body: Rc<Stmt>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Return {
        value: Option<Rc<Expr>>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Throw {
        value: Rc<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Try {
        body: Rc<Stmt>,
        catch_var: Option<String>,
        catch_body: Option<Rc<Stmt>>,
        finally_body: Option<Rc<Stmt>>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Break {
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Continue {
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    /// Suspend with the evaluated value; skipped while checkpoints are muted
    Yield {
        value: Rc<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Expr {
        expr: Rc<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Empty {
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Block { span, .. }
            | Stmt::Declare { span, .. }
            | Stmt::Function { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::For { span, .. }
            | Stmt::ForLoop { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Throw { span, .. }
            | Stmt::Try { span, .. }
            | Stmt::Break { span }
            | Stmt::Continue { span }
            | Stmt::Yield { span, .. }
            | Stmt::Expr { span, .. }
            | Stmt::Empty { span } => *span,
        }
    }
}

/// Expression AST node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Expr {
    LitNum {
        v: f64,
    },
    LitStr {
        v: String,
    },
    LitBool {
        v: bool,
    },
    LitNull,
    LitList {
        elements: Vec<Rc<Expr>>,
    },
    LitObj {
        properties: Vec<Property>,
    },
    /// Template literal: `quasis.len() == exprs.len() + 1`
    Template {
        quasis: Rc<[String]>,
        exprs: Vec<Rc<Expr>>,
    },
    Ident {
        name: String,
    },
    Member {
        object: Rc<Expr>,
        property: String,
    },
    Index {
        object: Rc<Expr>,
        index: Rc<Expr>,
    },
    Call {
        callee: Rc<Expr>,
        args: Vec<Rc<Expr>>,
    },
    New {
        callee: Rc<Expr>,
        args: Vec<Rc<Expr>>,
    },
    Unary {
        op: UnaryOp,
        operand: Rc<Expr>,
    },
    Update {
        increment: bool,
        prefix: bool,
        target: Rc<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Rc<Expr>,
        right: Rc<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Rc<Expr>,
        right: Rc<Expr>,
    },
    Ternary {
        condition: Rc<Expr>,
        consequent: Rc<Expr>,
        alternate: Rc<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Rc<Expr>,
        value: Rc<Expr>,
    },
    Sequence {
        exprs: Vec<Rc<Expr>>,
    },
    Function {
        def: Rc<FunctionDef>,
    },
    /// The live scope at this point, as a callable evaluation capability
    Capability,
    /// Snapshot of the configured watch expressions, evaluated in the current scope
    WatchSnapshot,
}

impl Expr {
    /// Short source-like description used in "is not a function" messages
    pub fn describe(&self) -> String {
        match self {
            Expr::Ident { name } => name.clone(),
            Expr::Member { object, property } => format!("{}.{}", object.describe(), property),
            Expr::Index { object, .. } => format!("{}[...]", object.describe()),
            Expr::Call { callee, .. } => format!("{}(...)", callee.describe()),
            _ => "expression".to_string(),
        }
    }
}
