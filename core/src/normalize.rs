//! Watch snapshot and fault payload shapes
//!
//! Checkpoints produce watch snapshots as script values: a list of
//! `{expression, value}` or `{expression, error}` objects. Faults become
//! `{name, message, stack}` for error values and `{value}` for anything else.

use crate::interpreter::executor::errors::{normalize_error, ErrorInfo};
use crate::interpreter::executor::Val;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Result of one watch expression at one checkpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WatchResult {
    Value { expression: String, value: Val },
    /// The expression failed; `error` is the normalized fault
    Error { expression: String, error: Val },
}

impl WatchResult {
    pub fn expression(&self) -> &str {
        match self {
            WatchResult::Value { expression, .. } | WatchResult::Error { expression, .. } => {
                expression
            }
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, WatchResult::Error { .. })
    }
}

/// Convert a snapshot list; entries of any other shape are skipped
pub fn watch_results(snapshot: &Val) -> Vec<WatchResult> {
    let Val::List(items) = snapshot else {
        return vec![];
    };
    let items = items.borrow();
    items.iter().filter_map(watch_result).collect()
}

fn watch_result(entry: &Val) -> Option<WatchResult> {
    let Val::Obj(map) = entry else {
        return None;
    };
    let map = map.borrow();
    let expression = match map.get("expression") {
        Some(Val::Str(s)) => s.clone(),
        _ => return None,
    };
    Some(match map.get("error") {
        Some(error) => WatchResult::Error {
            expression,
            error: error.clone(),
        },
        None => WatchResult::Value {
            expression,
            value: map.get("value").cloned().unwrap_or(Val::Undefined),
        },
    })
}

/// Normalized payload of a thrown value
pub fn fault_payload(thrown: &Val) -> Val {
    normalize_error(thrown)
}

/// Normalized payload for a fault raised by the host rather than the program
pub fn host_fault(name: &str, message: impl Into<String>) -> Val {
    normalize_error(&Val::error(ErrorInfo::new(name, message, &[])))
}

/// JSON form of a payload; values without one become `null`
pub fn payload_json(payload: &Val) -> JsonValue {
    payload.to_json().ok().flatten().unwrap_or(JsonValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_results_keep_failures_separate() {
        let snapshot = Val::list(vec![
            Val::obj([("expression", Val::str("a")), ("value", Val::Num(1.0))]),
            Val::obj([
                ("expression", Val::str("b")),
                ("error", host_fault("ReferenceError", "b is not defined")),
            ]),
            Val::Num(3.0),
        ]);
        let results = watch_results(&snapshot);

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0],
            WatchResult::Value {
                expression: "a".to_string(),
                value: Val::Num(1.0)
            }
        );
        assert!(results[1].is_error());
        assert_eq!(results[1].expression(), "b");
    }

    #[test]
    fn test_fault_payload_shapes() {
        let payload = host_fault("TypeError", "bad");
        assert_eq!(
            payload_json(&payload),
            serde_json::json!({"name": "TypeError", "message": "bad", "stack": "TypeError: bad"})
        );

        let payload = fault_payload(&Val::str("plain"));
        assert_eq!(payload_json(&payload), serde_json::json!({"value": "plain"}));
    }

    #[test]
    fn test_watch_result_serialization() {
        let result = WatchResult::Value {
            expression: "xs".to_string(),
            value: Val::list(vec![Val::Num(1.0), Val::Undefined]),
        };

        assert_eq!(
            serde_json::to_value(&result).expect("serialize"),
            serde_json::json!({"expression": "xs", "value": [1, null]})
        );
    }
}
