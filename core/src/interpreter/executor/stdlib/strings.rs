//! String.prototype methods
//!
//! Positions count characters.

use super::{arg, throw, value, StdlibFunc};
use crate::interpreter::executor::errors;
use crate::interpreter::executor::expressions::EvalResult;
use crate::interpreter::executor::types::Val;
use crate::interpreter::executor::vm::VM;

/// Longest string, in bytes, the runtime will build
pub const MAX_STRING_LENGTH: usize = 1 << 28;

pub const INVALID_LENGTH: &str = "Invalid string length";

/// Method looked up as `"text".name`
pub fn method(name: &str) -> Option<StdlibFunc> {
    Some(match name {
        "toUpperCase" => StdlibFunc::StrToUpperCase,
        "toLowerCase" => StdlibFunc::StrToLowerCase,
        "trim" => StdlibFunc::StrTrim,
        "split" => StdlibFunc::StrSplit,
        "includes" => StdlibFunc::StrIncludes,
        "indexOf" => StdlibFunc::StrIndexOf,
        "slice" => StdlibFunc::StrSlice,
        "substring" => StdlibFunc::StrSubstring,
        "startsWith" => StdlibFunc::StrStartsWith,
        "endsWith" => StdlibFunc::StrEndsWith,
        "repeat" => StdlibFunc::StrRepeat,
        "charAt" => StdlibFunc::StrCharAt,
        "replace" => StdlibFunc::StrReplace,
        "padStart" => StdlibFunc::StrPadStart,
        "padEnd" => StdlibFunc::StrPadEnd,
        "toString" => StdlibFunc::StrToString,
        _ => return None,
    })
}

pub fn call(vm: &VM, func: StdlibFunc, this: &Val, args: &[Val]) -> EvalResult {
    let Val::Str(s) = this else {
        return throw(
            vm,
            errors::TYPE_ERROR,
            format!("String.prototype.{} called on a non-string", func.name()),
        );
    };
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as f64;

    match func {
        StdlibFunc::StrToUpperCase => value(Val::Str(s.to_uppercase())),
        StdlibFunc::StrToLowerCase => value(Val::Str(s.to_lowercase())),
        StdlibFunc::StrTrim => value(Val::str(s.trim())),
        StdlibFunc::StrToString => value(Val::Str(s.clone())),
        StdlibFunc::StrSplit => split(s, args),
        StdlibFunc::StrIncludes => {
            let needle = arg(args, 0).to_js_string();
            let from = position(args.get(1), 0.0, len);
            let rest: String = chars[from..].iter().collect();
            value(Val::Bool(rest.contains(&needle)))
        }
        StdlibFunc::StrIndexOf => {
            let needle = arg(args, 0).to_js_string();
            let found = s
                .find(&needle)
                .map(|byte| s[..byte].chars().count() as f64)
                .unwrap_or(-1.0);
            value(Val::Num(found))
        }
        StdlibFunc::StrSlice => {
            let start = relative(args.get(0), 0.0, len);
            let end = relative(args.get(1), len, len);
            value(Val::Str(substring(&chars, start, end.max(start))))
        }
        StdlibFunc::StrSubstring => {
            let a = position(args.get(0), 0.0, len);
            let b = position(args.get(1), len, len);
            value(Val::Str(substring(&chars, a.min(b), a.max(b))))
        }
        StdlibFunc::StrStartsWith => {
            let needle = arg(args, 0).to_js_string();
            let from = position(args.get(1), 0.0, len);
            let rest: String = chars[from..].iter().collect();
            value(Val::Bool(rest.starts_with(&needle)))
        }
        StdlibFunc::StrEndsWith => {
            let needle = arg(args, 0).to_js_string();
            let end = position(args.get(1), len, len);
            let head: String = chars[..end].iter().collect();
            value(Val::Bool(head.ends_with(&needle)))
        }
        StdlibFunc::StrRepeat => {
            let count = arg(args, 0).to_number();
            let count = if count.is_nan() { 0.0 } else { count.trunc() };
            if count < 0.0 || count.is_infinite() {
                return throw(
                    vm,
                    errors::RANGE_ERROR,
                    format!("Invalid count value: {}", arg(args, 0).to_js_string()),
                );
            }
            if s.is_empty() || count == 0.0 {
                return value(Val::str(""));
            }
            if count > (MAX_STRING_LENGTH / s.len()) as f64 {
                return throw(vm, errors::RANGE_ERROR, INVALID_LENGTH);
            }
            value(Val::Str(s.repeat(count as usize)))
        }
        StdlibFunc::StrCharAt => {
            let idx = arg(args, 0).to_number();
            let idx = if idx.is_nan() { 0.0 } else { idx.trunc() };
            let c = if idx >= 0.0 && idx < len {
                chars[idx as usize].to_string()
            } else {
                String::new()
            };
            value(Val::Str(c))
        }
        StdlibFunc::StrReplace => {
            let pattern = arg(args, 0).to_js_string();
            let replacement = arg(args, 1).to_js_string();
            value(Val::Str(s.replacen(&pattern, &replacement, 1)))
        }
        StdlibFunc::StrPadStart | StdlibFunc::StrPadEnd => {
            let target = arg(args, 0).to_number();
            let fill = match args.get(1) {
                None | Some(Val::Undefined) => " ".to_string(),
                Some(f) => f.to_js_string(),
            };
            let missing = if target.is_nan() { 0.0 } else { target - len };
            if missing <= 0.0 || fill.is_empty() {
                return value(Val::Str(s.clone()));
            }
            let widest = fill.chars().map(char::len_utf8).max().unwrap_or(1);
            if missing * widest as f64 > MAX_STRING_LENGTH.saturating_sub(s.len()) as f64 {
                return throw(vm, errors::RANGE_ERROR, INVALID_LENGTH);
            }
            let padding: String = fill.chars().cycle().take(missing as usize).collect();
            if func == StdlibFunc::StrPadStart {
                value(Val::Str(format!("{}{}", padding, s)))
            } else {
                value(Val::Str(format!("{}{}", s, padding)))
            }
        }
        other => throw(
            vm,
            errors::TYPE_ERROR,
            format!("{} is not a string method", other.name()),
        ),
    }
}

fn split(s: &str, args: &[Val]) -> EvalResult {
    let limit = match args.get(1) {
        None | Some(Val::Undefined) => usize::MAX,
        Some(l) => l.to_number().max(0.0) as usize,
    };
    let parts: Vec<Val> = match args.first() {
        None | Some(Val::Undefined) => vec![Val::str(s)],
        Some(sep) => {
            let sep = sep.to_js_string();
            if sep.is_empty() {
                s.chars().map(|c| Val::Str(c.to_string())).collect()
            } else {
                s.split(sep.as_str()).map(Val::str).collect()
            }
        }
    };
    value(Val::list(parts.into_iter().take(limit).collect()))
}

/// Argument clamped to `0..=len`
fn position(v: Option<&Val>, default: f64, len: f64) -> usize {
    let n = match v {
        None | Some(Val::Undefined) => default,
        Some(v) => v.to_number(),
    };
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    n.clamp(0.0, len) as usize
}

/// Like `position`, but negative values count from the end
fn relative(v: Option<&Val>, default: f64, len: f64) -> usize {
    let n = match v {
        None | Some(Val::Undefined) => default,
        Some(v) => v.to_number(),
    };
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    let n = if n < 0.0 { len + n } else { n };
    n.clamp(0.0, len) as usize
}

fn substring(chars: &[char], start: usize, end: usize) -> String {
    chars[start..end].iter().collect()
}
