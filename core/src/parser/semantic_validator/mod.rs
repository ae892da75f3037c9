//! Early errors the grammar cannot express
//!
//! Every rule walks the parsed script independently. Any error rejects the
//! program; there are no warnings.

pub mod rules;

use super::ScriptDef;
use crate::interpreter::executor::types::ast::Span;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub span: Span,
    pub message: String,
    /// Id of the rule that reported it, e.g. `loop-control`
    pub rule_id: &'static str,
}

impl ValidationError {
    pub fn new(span: Span, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            span,
            message: message.into(),
            rule_id,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}:{} ({})",
            self.message,
            self.span.start_line + 1,
            self.span.start_col + 1,
            self.rule_id
        )
    }
}

impl std::error::Error for ValidationError {}

pub trait ValidationRule {
    fn id(&self) -> &'static str;

    fn check(&self, script: &ScriptDef) -> Vec<ValidationError>;
}

/// The rule set applied to every compiled program
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(rules::LoopControlRule),
                Box::new(rules::ConstInitializerRule),
                Box::new(rules::DuplicateDeclarationRule),
            ],
        }
    }

    /// All errors, ordered by position
    pub fn validate(&self, script: &ScriptDef) -> Vec<ValidationError> {
        let mut errors: Vec<ValidationError> =
            self.rules.iter().flat_map(|rule| rule.check(script)).collect();
        errors.sort_by_key(|e| e.span.start);
        errors
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.id())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_script(script: &ScriptDef) -> Vec<ValidationError> {
    Validator::new().validate(script)
}

#[cfg(test)]
mod tests;
