//! Global conversion functions, Object/Array helpers and error constructors

use super::{arg, num_arg, throw, value, ErrorKind};
use crate::interpreter::executor::errors;
use crate::interpreter::executor::expressions::EvalResult;
use crate::interpreter::executor::types::Val;
use crate::interpreter::executor::vm::VM;

pub fn string(args: &[Val]) -> EvalResult {
    match args.first() {
        Some(v) => value(Val::Str(v.to_js_string())),
        None => value(Val::str("")),
    }
}

pub fn number(args: &[Val]) -> EvalResult {
    match args.first() {
        Some(v) => value(Val::Num(v.to_number())),
        None => value(Val::Num(0.0)),
    }
}

pub fn boolean(args: &[Val]) -> EvalResult {
    value(Val::Bool(arg(args, 0).is_truthy()))
}

pub fn is_nan(args: &[Val]) -> EvalResult {
    value(Val::Bool(num_arg(args, 0).is_nan()))
}

pub fn is_finite(args: &[Val]) -> EvalResult {
    value(Val::Bool(num_arg(args, 0).is_finite()))
}

pub fn is_array(args: &[Val]) -> EvalResult {
    value(Val::Bool(matches!(arg(args, 0), Val::List(_))))
}

/// parseInt(text, radix)
pub fn parse_int(args: &[Val]) -> EvalResult {
    let text = arg(args, 0).to_js_string();
    let mut rest = text.trim_start();

    let mut sign = 1.0;
    if let Some(stripped) = rest.strip_prefix('-') {
        sign = -1.0;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }

    let mut radix = match args.get(1) {
        None | Some(Val::Undefined) => 0,
        Some(r) => r.to_number() as u32,
    };
    if radix != 0 && !(2..=36).contains(&radix) {
        return value(Val::Num(f64::NAN));
    }
    if radix == 0 || radix == 16 {
        if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            rest = hex;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }

    let mut result: Option<f64> = None;
    for c in rest.chars() {
        let Some(d) = c.to_digit(radix) else {
            break;
        };
        result = Some(result.unwrap_or(0.0) * radix as f64 + d as f64);
    }
    value(Val::Num(result.map(|n| sign * n).unwrap_or(f64::NAN)))
}

/// parseFloat(text) - longest numeric prefix
pub fn parse_float(args: &[Val]) -> EvalResult {
    let text = arg(args, 0).to_js_string();
    let trimmed = text.trim_start();

    for (prefix, n) in [
        ("Infinity", f64::INFINITY),
        ("+Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        if trimmed.starts_with(prefix) {
            return value(Val::Num(n));
        }
    }

    let end = float_prefix_len(trimmed);
    let n = trimmed[..end].parse::<f64>().unwrap_or(f64::NAN);
    value(Val::Num(n))
}

/// Byte length of the longest `[+-]digits[.digits][e[+-]digits]` prefix
fn float_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut has_digits = i > digits_start;
    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > frac_start || has_digits {
            has_digits = has_digits || j > frac_start;
            i = j;
        }
    }
    if !has_digits {
        return 0;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}

/* ===================== Object ===================== */

/// Own enumerable (key, value) pairs of an object-like value
fn own_entries(vm: &VM, target: &Val) -> Result<Vec<(String, Val)>, EvalResult> {
    match target {
        Val::Undefined | Val::Null => Err(throw(
            vm,
            errors::TYPE_ERROR,
            "Cannot convert undefined or null to object",
        )),
        Val::Obj(map) => Ok(map
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()),
        Val::List(items) => Ok(items
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect()),
        Val::Str(s) => Ok(s
            .chars()
            .enumerate()
            .map(|(i, c)| (i.to_string(), Val::Str(c.to_string())))
            .collect()),
        _ => Ok(vec![]),
    }
}

pub fn object_keys(vm: &VM, args: &[Val]) -> EvalResult {
    match own_entries(vm, &arg(args, 0)) {
        Ok(entries) => value(Val::list(
            entries.into_iter().map(|(k, _)| Val::Str(k)).collect(),
        )),
        Err(thrown) => thrown,
    }
}

pub fn object_values(vm: &VM, args: &[Val]) -> EvalResult {
    match own_entries(vm, &arg(args, 0)) {
        Ok(entries) => value(Val::list(entries.into_iter().map(|(_, v)| v).collect())),
        Err(thrown) => thrown,
    }
}

pub fn object_entries(vm: &VM, args: &[Val]) -> EvalResult {
    match own_entries(vm, &arg(args, 0)) {
        Ok(entries) => value(Val::list(
            entries
                .into_iter()
                .map(|(k, v)| Val::list(vec![Val::Str(k), v]))
                .collect(),
        )),
        Err(thrown) => thrown,
    }
}

/* ===================== Errors ===================== */

/// Error(message) / new Error(message) and the named variants
pub fn construct_error(vm: &VM, kind: ErrorKind, args: &[Val]) -> EvalResult {
    let message = match args.first() {
        None | Some(Val::Undefined) => String::new(),
        Some(m) => m.to_js_string(),
    };
    value(vm.error_value(kind.name(), message))
}
