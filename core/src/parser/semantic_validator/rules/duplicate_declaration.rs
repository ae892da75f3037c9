//! Rule: Duplicate Declaration
//!
//! Reports a `let`, `const` or function declaration whose name is already
//! declared in the same block, including clashes with `var` declarations of
//! that block and with function parameters.
//!
//! # Invalid
//!
//! ```js
//! let x = 1;
//! let x = 2;
//!
//! function f(a) { const a = 1; }
//! ```

use std::collections::HashSet;
use std::rc::Rc;

use crate::interpreter::executor::types::ast::{FunctionDef, Span, Stmt, VarKind};
use crate::parser::ScriptDef;

use super::super::{ValidationError, ValidationRule};
use super::{child_statements, expression_body_functions, function_block, statement_functions};

pub struct DuplicateDeclarationRule;

impl ValidationRule for DuplicateDeclarationRule {
    fn id(&self) -> &'static str {
        "duplicate-declaration"
    }

    fn check(&self, script: &ScriptDef) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        walk(&script.body, &[], &mut errors, self.id());
        errors
    }
}

/// `params` are the parameters of the function whose body `stmt` is
fn walk(stmt: &Stmt, params: &[String], errors: &mut Vec<ValidationError>, rule_id: &'static str) {
    if let Stmt::Block { body, .. } = stmt {
        check_block(body, params, errors, rule_id);
    }
    for child in child_statements(stmt) {
        walk(child, &[], errors, rule_id);
    }
    for def in statement_functions(stmt) {
        check_function(def, errors, rule_id);
    }
}

fn check_function(def: &FunctionDef, errors: &mut Vec<ValidationError>, rule_id: &'static str) {
    if let Some(body) = function_block(def) {
        walk(body, &def.params, errors, rule_id);
    }
    for inner in expression_body_functions(def) {
        check_function(inner, errors, rule_id);
    }
}

fn check_block(
    body: &[Rc<Stmt>],
    params: &[String],
    errors: &mut Vec<ValidationError>,
    rule_id: &'static str,
) {
    let mut lexical: HashSet<&str> = HashSet::new();
    let mut vars: HashSet<&str> = params.iter().map(String::as_str).collect();

    let mut report = |name: &str, span: Span| {
        errors.push(ValidationError::new(
            span,
            format!("Identifier '{}' has already been declared", name),
            rule_id,
        ));
    };

    for stmt in body {
        match &**stmt {
            Stmt::Declare {
                var_kind,
                declarations,
                span,
            } => {
                for decl in declarations.iter() {
                    let name = decl.name.as_str();
                    if *var_kind == VarKind::Var {
                        if lexical.contains(name) {
                            report(name, *span);
                        }
                        vars.insert(name);
                    } else if lexical.contains(name) || vars.contains(name) {
                        report(name, *span);
                    } else {
                        lexical.insert(name);
                    }
                }
            }
            Stmt::Function { def, span } => {
                if let Some(name) = def.name.as_deref() {
                    if !lexical.insert(name) || vars.contains(name) {
                        report(name, *span);
                    }
                }
            }
            _ => {}
        }
    }
}
