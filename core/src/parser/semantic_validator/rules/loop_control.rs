//! Rule: Loop Control
//!
//! Reports `break` and `continue` statements that have no enclosing loop in
//! the same function.
//!
//! # Invalid
//!
//! ```js
//! break;                                  // top level
//! while (x) { items.forEach(() => { continue; }); }   // callback body
//! ```

use crate::interpreter::executor::types::ast::{FunctionDef, Stmt};
use crate::parser::ScriptDef;

use super::super::{ValidationError, ValidationRule};
use super::{child_statements, expression_body_functions, function_block, statement_functions};

pub struct LoopControlRule;

impl ValidationRule for LoopControlRule {
    fn id(&self) -> &'static str {
        "loop-control"
    }

    fn check(&self, script: &ScriptDef) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        check_stmt(&script.body, false, &mut errors, self.id());
        errors
    }
}

fn check_stmt(stmt: &Stmt, in_loop: bool, errors: &mut Vec<ValidationError>, rule_id: &'static str) {
    match stmt {
        Stmt::Break { span } if !in_loop => {
            errors.push(ValidationError::new(*span, "Illegal break statement", rule_id));
        }
        Stmt::Continue { span } if !in_loop => {
            errors.push(ValidationError::new(
                *span,
                "Illegal continue statement: no surrounding iteration statement",
                rule_id,
            ));
        }
        _ => {}
    }

    let loop_body = in_loop
        || matches!(
            stmt,
            Stmt::While { .. } | Stmt::DoWhile { .. } | Stmt::For { .. } | Stmt::ForLoop { .. }
        );
    for child in child_statements(stmt) {
        check_stmt(child, loop_body, errors, rule_id);
    }
    for def in statement_functions(stmt) {
        check_function(def, errors, rule_id);
    }
}

/// Function bodies start outside of any loop
fn check_function(def: &FunctionDef, errors: &mut Vec<ValidationError>, rule_id: &'static str) {
    if let Some(body) = function_block(def) {
        check_stmt(body, false, errors, rule_id);
    }
    for inner in expression_body_functions(def) {
        check_function(inner, errors, rule_id);
    }
}
