//! JSON.stringify / JSON.parse

use super::{arg, throw, value};
use crate::interpreter::executor::errors;
use crate::interpreter::executor::expressions::EvalResult;
use crate::interpreter::executor::types::Val;
use crate::interpreter::executor::vm::VM;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// JSON.stringify(value, replacer, indent)
///
/// Replacers are ignored. `indent` is a number of spaces (at most 10) or a
/// string (its first 10 characters).
pub fn stringify(vm: &VM, args: &[Val]) -> EvalResult {
    let json = match arg(args, 0).to_json() {
        Ok(Some(json)) => json,
        Ok(None) => return value(Val::Undefined),
        Err(circular) => return throw(vm, errors::TYPE_ERROR, circular.to_string()),
    };

    let indent = match arg(args, 2) {
        Val::Num(n) if n >= 1.0 => " ".repeat(n.min(10.0) as usize),
        Val::Str(s) => s.chars().take(10).collect(),
        _ => String::new(),
    };

    let text = if indent.is_empty() {
        serde_json::to_string(&json)
    } else {
        to_string_indented(&json, &indent)
    };
    match text {
        Ok(text) => value(Val::Str(text)),
        Err(e) => throw(vm, errors::TYPE_ERROR, e.to_string()),
    }
}

fn to_string_indented(json: &JsonValue, indent: &str) -> serde_json::Result<String> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    json.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// JSON.parse(text)
pub fn parse(vm: &VM, args: &[Val]) -> EvalResult {
    let text = arg(args, 0).to_js_string();
    match serde_json::from_str::<JsonValue>(&text) {
        Ok(json) => value(Val::from_json(&json)),
        Err(e) => throw(
            vm,
            errors::SYNTAX_ERROR,
            format!("Unexpected token in JSON: {}", e),
        ),
    }
}
