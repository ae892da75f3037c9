//! Driver errors

use serde_json::Value as JsonValue;
use thiserror::Error;

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, StepError>;

/// The instrumented program could not be compiled
///
/// `line` and `column` are 1-based and refer to the user's source when the
/// fault lies within it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to compile instrumented source: {message}")]
pub struct CompileFault {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

/// API misuse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageFault {
    #[error("no evaluation context is available; advance the program first")]
    NoEvaluationContext,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// The program threw; `payload` is the normalized fault
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", describe_payload(.payload))]
pub struct RuntimeFault {
    pub payload: JsonValue,
}

/// Any failure reported by the step driver
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Compile(#[from] CompileFault),

    #[error(transparent)]
    Usage(#[from] UsageFault),

    #[error(transparent)]
    Runtime(#[from] RuntimeFault),
}

/// `Name: message` for error payloads, the JSON text of the value otherwise
fn describe_payload(payload: &JsonValue) -> String {
    let name = payload.get("name").and_then(JsonValue::as_str);
    let message = payload.get("message").and_then(JsonValue::as_str);
    match (name, message, payload.get("value")) {
        (Some(name), Some(""), _) => name.to_string(),
        (Some(name), Some(message), _) => format!("{}: {}", name, message),
        (_, _, Some(value)) => format!("uncaught {}", value),
        _ => payload.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_runtime_fault_display() {
        let fault = RuntimeFault {
            payload: json!({"name": "TypeError", "message": "x is not a function", "stack": ""}),
        };
        assert_eq!(fault.to_string(), "TypeError: x is not a function");

        let fault = RuntimeFault {
            payload: json!({"value": 42}),
        };
        assert_eq!(fault.to_string(), "uncaught 42");
    }

    #[test]
    fn test_step_error_conversions() {
        let err: StepError = UsageFault::NoEvaluationContext.into();
        assert!(matches!(err, StepError::Usage(UsageFault::NoEvaluationContext)));
        assert_eq!(
            err.to_string(),
            "no evaluation context is available; advance the program first"
        );
    }
}
