//! Error names and the error value payload
//!
//! Runtime faults are ordinary values (`Val::Error`) thrown through
//! `Control::Throw`, so programs can catch and inspect them.

use super::types::Val;
use serde::{Deserialize, Serialize};

pub const ERROR: &str = "Error";
pub const TYPE_ERROR: &str = "TypeError";
pub const REFERENCE_ERROR: &str = "ReferenceError";
pub const RANGE_ERROR: &str = "RangeError";
pub const SYNTAX_ERROR: &str = "SyntaxError";

/// Most `at` lines recorded in a stack
pub const STACK_TRACE_LIMIT: usize = 10;

/// Payload of an error value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub name: String,
    pub message: String,
    pub stack: String,
}

impl ErrorInfo {
    /// Build an error whose stack is the header line followed by the first
    /// [`STACK_TRACE_LIMIT`] of `frames`
    pub fn new(name: impl Into<String>, message: impl Into<String>, frames: &[String]) -> Self {
        let name = name.into();
        let message = message.into();
        let mut stack = header(&name, &message);
        for frame in frames.iter().take(STACK_TRACE_LIMIT) {
            stack.push_str("\n    at ");
            stack.push_str(frame);
        }
        Self {
            name,
            message,
            stack,
        }
    }

    /// `Name: message`, as `String(error)` renders it
    pub fn header(&self) -> String {
        header(&self.name, &self.message)
    }
}

fn header(name: &str, message: &str) -> String {
    if message.is_empty() {
        name.to_string()
    } else {
        format!("{}: {}", name, message)
    }
}

/// Plain object describing a thrown value: `{name, message, stack}` for
/// error values, `{value}` for anything else.
pub fn normalize_error(thrown: &Val) -> Val {
    match thrown {
        Val::Error(info) => Val::obj([
            ("name", Val::str(info.name.as_str())),
            ("message", Val::str(info.message.as_str())),
            ("stack", Val::str(info.stack.as_str())),
        ]),
        other => Val::obj([("value", other.clone())]),
    }
}
