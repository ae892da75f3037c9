//! Step records and evaluation capabilities

use crate::errors::RuntimeFault;
use crate::instrument::{KIND_END, KIND_ERROR, KIND_START, KIND_STATEMENT};
use crate::interpreter::executor::errors::SYNTAX_ERROR;
use crate::interpreter::executor::{
    run_until_done, ConsoleLine, Control, Env, ExecutionLimits, Val, VM,
};
use crate::normalize::{fault_payload, host_fault, payload_json, watch_results, WatchResult};
use crate::parser::parse_eval_source;
use serde::Serialize;
use std::fmt;
use tracing::trace;

/* ===================== Step Record ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Start,
    Statement,
    End,
    Error,
}

impl StepKind {
    fn parse(kind: &str) -> Option<Self> {
        match kind {
            KIND_START => Some(StepKind::Start),
            KIND_STATEMENT => Some(StepKind::Statement),
            KIND_END => Some(StepKind::End),
            KIND_ERROR => Some(StepKind::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::Start => KIND_START,
            StepKind::Statement => KIND_STATEMENT,
            StepKind::End => KIND_END,
            StepKind::Error => KIND_ERROR,
        }
    }

    /// End and Error records finish an execution
    pub fn is_terminal(self) -> bool {
        matches!(self, StepKind::End | StepKind::Error)
    }
}

/// What one checkpoint reports
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub kind: StepKind,
    pub index: u32,
    pub line: u32,
    pub column: u32,
    pub code: String,
    /// Evaluates expressions in the scope live at this checkpoint
    #[serde(skip)]
    pub evaluate: Option<EvaluationCapability>,
    pub watch: Vec<WatchResult>,
    /// Normalized fault of an Error record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Val>,
    /// Console lines written since the previous record
    pub output: Vec<ConsoleLine>,
}

impl StepRecord {
    /// Read a record produced by an instrumented checkpoint
    ///
    /// Returns `None` for values that are not records.
    pub fn from_value(value: &Val, limits: ExecutionLimits) -> Option<StepRecord> {
        let Val::Obj(map) = value else {
            return None;
        };
        let map = map.borrow();
        let kind = match map.get("kind") {
            Some(Val::Str(kind)) => StepKind::parse(kind)?,
            _ => return None,
        };
        let number = |key: &str| match map.get(key) {
            Some(Val::Num(n)) if *n >= 0.0 => *n as u32,
            _ => 0,
        };

        Some(StepRecord {
            kind,
            index: number("index"),
            line: number("line"),
            column: number("column"),
            code: match map.get("code") {
                Some(Val::Str(code)) => code.clone(),
                _ => String::new(),
            },
            evaluate: match map.get("evaluate") {
                Some(Val::Capability(scope)) => {
                    Some(EvaluationCapability::new(scope.clone(), limits))
                }
                _ => None,
            },
            watch: map.get("watch").map(watch_results).unwrap_or_default(),
            error: map.get("error").cloned(),
            output: vec![],
        })
    }

    /// Error record for a fault that never reached the program's own handler
    pub fn synthesized_error(index: u32, line: u32, column: u32, payload: Val) -> StepRecord {
        StepRecord {
            kind: StepKind::Error,
            index,
            line,
            column,
            code: String::new(),
            evaluate: None,
            watch: vec![],
            error: Some(payload),
            output: vec![],
        }
    }

    /// End record for a program that returned before reaching its footer
    pub fn early_end(index: u32, line: u32, column: u32) -> StepRecord {
        StepRecord {
            kind: StepKind::End,
            index,
            line,
            column,
            code: String::new(),
            evaluate: None,
            watch: vec![],
            error: None,
            output: vec![],
        }
    }

    /// Value of the named watch expression, if it evaluated successfully
    pub fn watched(&self, expression: &str) -> Option<&Val> {
        self.watch.iter().find_map(|result| match result {
            WatchResult::Value { expression: e, value } if e == expression => Some(value),
            _ => None,
        })
    }

    /// Render as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl PartialEq for StepRecord {
    /// Capabilities are not compared
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.index == other.index
            && self.line == other.line
            && self.column == other.column
            && self.code == other.code
            && self.watch == other.watch
            && self.error == other.error
            && self.output == other.output
    }
}

/* ===================== Evaluation Capability ===================== */

/// Evaluates expression text against the scope of one checkpoint
///
/// The scope is live: evaluating after the execution advanced sees the
/// bindings as they are now, not as they were at the checkpoint.
/// Checkpoints reached during an evaluation are skipped.
#[derive(Clone)]
pub struct EvaluationCapability {
    scope: Env,
    limits: ExecutionLimits,
}

impl EvaluationCapability {
    pub(crate) fn new(scope: Env, limits: ExecutionLimits) -> Self {
        Self { scope, limits }
    }

    /// Evaluate `expression`, or a statement list giving the value of its
    /// last expression statement
    pub fn evaluate(&self, expression: &str) -> Result<Val, RuntimeFault> {
        let source = parse_eval_source(expression).map_err(|e| RuntimeFault {
            payload: payload_json(&host_fault(SYNTAX_ERROR, e.summary())),
        })?;

        let mut vm = VM::isolated(&source, &self.scope, self.limits);
        run_until_done(&mut vm);
        for line in vm.take_output() {
            trace!(level = ?line.level, text = %line.text, "output during evaluation");
        }

        match vm.control {
            Control::Return(v) => Ok(v),
            Control::Throw(thrown) => Err(RuntimeFault {
                payload: payload_json(&fault_payload(&thrown)),
            }),
            _ => Ok(Val::Undefined),
        }
    }
}

impl fmt::Debug for EvaluationCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationCapability")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}
