//! Program compiler
//!
//! Instruments source text, parses the result and validates it once. The
//! compiled program is a factory: every [`CompiledProgram::instantiate`]
//! call produces an independent [`Execution`] with its own globals.

pub mod execution;


pub use execution::{Execution, Resumption};

use crate::config::RuntimeOptions;
use crate::errors::CompileFault;
use crate::instrument::{end_position, instrument_source, HEADER_LINES};
use crate::interpreter::executor::types::ast::Span;
use crate::interpreter::executor::Stmt;
use crate::parser::{parse_program, semantic_validator::validate_script};
use sha2::{Digest, Sha256};
use std::rc::Rc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct CompiledProgram {
    source: String,
    instrumented: String,
    body: Rc<Stmt>,
    fingerprint: String,
    end: (u32, u32),
}

impl CompiledProgram {
    pub fn compile(source: &str) -> Result<Self, CompileFault> {
        let instrumented = instrument_source(source);

        let script = parse_program(&instrumented)
            .map_err(|e| compile_fault(e.summary(), e.span()))?;
        if let Some(first) = validate_script(&script).into_iter().next() {
            return Err(compile_fault(first.message, Some(first.span)));
        }

        let fingerprint = hash_source(source);
        info!(%fingerprint, bytes = source.len(), "compiled program");
        Ok(Self {
            source: source.to_string(),
            instrumented,
            body: script.body,
            fingerprint,
            end: end_position(source),
        })
    }

    /// Create a fresh execution bound to `options`
    pub fn instantiate(&self, options: &RuntimeOptions) -> Execution {
        let execution = Execution::new(self.body.clone(), options);
        debug!(
            execution_id = %execution.id(),
            fingerprint = %self.fingerprint,
            watch = options.watch.len(),
            "created execution"
        );
        execution
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn instrumented(&self) -> &str {
        &self.instrumented
    }

    /// Position reported by end and error records
    pub fn end_position(&self) -> (u32, u32) {
        self.end
    }

    /// Hex SHA-256 of the source text
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn hash_source(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Map a position in the instrumented text back to the user's source
fn compile_fault(message: impl Into<String>, span: Option<Span>) -> CompileFault {
    let (line, column) = match span {
        Some(span) if span.start_line >= HEADER_LINES => (
            Some(span.start_line - HEADER_LINES + 1),
            Some(span.start_col + 1),
        ),
        _ => (None, None),
    };
    CompileFault {
        message: message.into(),
        line,
        column,
    }
}
