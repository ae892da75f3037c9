//! Validation Rules
//!
//! Each file in this module contains one validation rule:
//!
//! - `loop_control.rs` - `break`/`continue` outside of a loop
//! - `const_initializer.rs` - `const` declarations without a value
//! - `duplicate_declaration.rs` - lexical names declared twice in one block
//!
//! The traversal helpers below are shared by the rules.

mod const_initializer;
mod duplicate_declaration;
mod loop_control;

pub use const_initializer::ConstInitializerRule;
pub use duplicate_declaration::DuplicateDeclarationRule;
pub use loop_control::LoopControlRule;

use crate::interpreter::executor::types::ast::{Expr, FunctionBody, FunctionDef, PropKey, Stmt};

/// Statements directly nested in `stmt`
pub(crate) fn child_statements(stmt: &Stmt) -> Vec<&Stmt> {
    match stmt {
        Stmt::Block { body, .. } => body.iter().map(|s| &**s).collect(),
        Stmt::If { then_s, else_s, .. } => {
            let mut children = vec![&**then_s];
            children.extend(else_s.as_deref());
            children
        }
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::ForLoop { body, .. } => {
            vec![&**body]
        }
        Stmt::For { init, body, .. } => {
            let mut children: Vec<&Stmt> = init.as_deref().into_iter().collect();
            children.push(&**body);
            children
        }
        Stmt::Try {
            body,
            catch_body,
            finally_body,
            ..
        } => {
            let mut children = vec![&**body];
            children.extend(catch_body.as_deref());
            children.extend(finally_body.as_deref());
            children
        }
        _ => vec![],
    }
}

/// Expressions evaluated by `stmt` itself (not by its child statements)
pub(crate) fn statement_expressions(stmt: &Stmt) -> Vec<&Expr> {
    match stmt {
        Stmt::Declare { declarations, .. } => {
            declarations.iter().filter_map(|d| d.init.as_deref()).collect()
        }
        Stmt::If { test, .. } | Stmt::While { test, .. } | Stmt::DoWhile { test, .. } => {
            vec![&**test]
        }
        Stmt::For { test, update, .. } => test.as_deref().into_iter().chain(update.as_deref()).collect(),
        Stmt::ForLoop { iterable, .. } => vec![&**iterable],
        Stmt::Return { value, .. } => value.as_deref().into_iter().collect(),
        Stmt::Throw { value, .. } | Stmt::Yield { value, .. } => vec![&**value],
        Stmt::Expr { expr, .. } => vec![&**expr],
        _ => vec![],
    }
}

/// Functions defined inside `expr`, outermost only
pub(crate) fn nested_functions<'a>(expr: &'a Expr, out: &mut Vec<&'a FunctionDef>) {
    match expr {
        Expr::Function { def } => out.push(&**def),
        Expr::LitList { elements } => {
            for element in elements {
                nested_functions(element, out);
            }
        }
        Expr::LitObj { properties } => {
            for prop in properties {
                if let PropKey::Computed { expr } = &prop.key {
                    nested_functions(expr, out);
                }
                nested_functions(&prop.value, out);
            }
        }
        Expr::Template { exprs, .. } | Expr::Sequence { exprs } => {
            for e in exprs {
                nested_functions(e, out);
            }
        }
        Expr::Member { object, .. } => nested_functions(object, out),
        Expr::Index { object, index } => {
            nested_functions(object, out);
            nested_functions(index, out);
        }
        Expr::Call { callee, args } | Expr::New { callee, args } => {
            nested_functions(callee, out);
            for arg in args {
                nested_functions(arg, out);
            }
        }
        Expr::Unary { operand, .. } => nested_functions(operand, out),
        Expr::Update { target, .. } => nested_functions(target, out),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            nested_functions(left, out);
            nested_functions(right, out);
        }
        Expr::Ternary {
            condition,
            consequent,
            alternate,
        } => {
            nested_functions(condition, out);
            nested_functions(consequent, out);
            nested_functions(alternate, out);
        }
        Expr::Assign { target, value, .. } => {
            nested_functions(target, out);
            nested_functions(value, out);
        }
        Expr::LitNum { .. }
        | Expr::LitStr { .. }
        | Expr::LitBool { .. }
        | Expr::LitNull
        | Expr::Ident { .. }
        | Expr::Capability
        | Expr::WatchSnapshot => {}
    }
}

/// Functions defined by `stmt` or inside its own expressions
pub(crate) fn statement_functions(stmt: &Stmt) -> Vec<&FunctionDef> {
    let mut out = Vec::new();
    if let Stmt::Function { def, .. } = stmt {
        out.push(&**def);
    }
    for expr in statement_expressions(stmt) {
        nested_functions(expr, &mut out);
    }
    out
}

/// Statement body of a function, if it has one
pub(crate) fn function_block(def: &FunctionDef) -> Option<&Stmt> {
    match &def.body {
        FunctionBody::Block { body } => Some(&**body),
        FunctionBody::Expr { .. } => None,
    }
}

/// Functions defined inside an arrow's expression body
pub(crate) fn expression_body_functions(def: &FunctionDef) -> Vec<&FunctionDef> {
    let mut out = Vec::new();
    if let FunctionBody::Expr { expr } = &def.body {
        nested_functions(expr, &mut out);
    }
    out
}
