//! Rule: Const Initializer
//!
//! `const` bindings can never be assigned later, so each one needs a value
//! where it is declared: `const x;` is rejected.

use crate::interpreter::executor::types::ast::{FunctionDef, Stmt, VarKind};
use crate::parser::ScriptDef;

use super::super::{ValidationError, ValidationRule};
use super::{child_statements, expression_body_functions, function_block, statement_functions};

pub struct ConstInitializerRule;

impl ValidationRule for ConstInitializerRule {
    fn id(&self) -> &'static str {
        "const-initializer"
    }

    fn check(&self, script: &ScriptDef) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        check_stmt(&script.body, &mut errors, self.id());
        errors
    }
}

fn check_stmt(stmt: &Stmt, errors: &mut Vec<ValidationError>, rule_id: &'static str) {
    if let Stmt::Declare {
        var_kind: VarKind::Const,
        declarations,
        span,
    } = stmt
    {
        for decl in declarations.iter().filter(|d| d.init.is_none()) {
            errors.push(ValidationError::new(
                *span,
                format!("Missing initializer in const declaration '{}'", decl.name),
                rule_id,
            ));
        }
    }

    for child in child_statements(stmt) {
        check_stmt(child, errors, rule_id);
    }
    for def in statement_functions(stmt) {
        check_function(def, errors, rule_id);
    }
}

fn check_function(def: &FunctionDef, errors: &mut Vec<ValidationError>, rule_id: &'static str) {
    if let Some(body) = function_block(def) {
        check_stmt(body, errors, rule_id);
    }
    for inner in expression_body_functions(def) {
        check_function(inner, errors, rule_id);
    }
}
