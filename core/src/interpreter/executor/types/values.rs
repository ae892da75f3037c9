//! Runtime value types
//!
//! Arrays and objects have reference semantics (`Rc<RefCell<..>>`), matching
//! how the scripts being stepped expect aliasing to behave.

use super::super::errors::ErrorInfo;
use super::super::scope::Env;
use super::super::stdlib::StdlibFunc;
use super::ast::FunctionDef;
use indexmap::IndexMap;
use serde::ser::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

pub type PropertyMap = IndexMap<String, Val>;

/// Runtime value type
#[derive(Debug, Clone)]
pub enum Val {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(Rc<RefCell<Vec<Val>>>),
    Obj(Rc<RefCell<PropertyMap>>),
    Func(Rc<Closure>),
    NativeFunc(StdlibFunc),
    /// Error value with name, message and stack
    Error(Rc<ErrorInfo>),
    /// Evaluation capability bound to a live scope
    Capability(Env),
}

/// User function value: definition plus captured scope
pub struct Closure {
    pub def: Rc<FunctionDef>,
    pub env: Env,
}

impl Closure {
    pub fn name(&self) -> &str {
        self.def.name.as_deref().unwrap_or("")
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.def.name)
            .field("params", &self.def.params)
            .finish()
    }
}

/* ===================== Constructors ===================== */

impl Val {
    pub fn str(s: impl Into<String>) -> Val {
        Val::Str(s.into())
    }

    pub fn list(items: Vec<Val>) -> Val {
        Val::List(Rc::new(RefCell::new(items)))
    }

    pub fn obj<K: Into<String>>(entries: impl IntoIterator<Item = (K, Val)>) -> Val {
        Val::Obj(Rc::new(RefCell::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    pub fn error(info: ErrorInfo) -> Val {
        Val::Error(Rc::new(info))
    }
}

/* ===================== Conversions ===================== */

impl Val {
    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Val::Undefined | Val::Null => false,
            Val::Bool(b) => *b,
            Val::Num(n) => *n != 0.0 && !n.is_nan(),
            Val::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Val::Undefined | Val::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Val::Func(_) | Val::NativeFunc(_) | Val::Capability(_))
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Val::Undefined => "undefined",
            Val::Bool(_) => "boolean",
            Val::Num(_) => "number",
            Val::Str(_) => "string",
            Val::Func(_) | Val::NativeFunc(_) | Val::Capability(_) => "function",
            Val::Null | Val::List(_) | Val::Obj(_) | Val::Error(_) => "object",
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Val::Undefined => f64::NAN,
            Val::Null => 0.0,
            Val::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Val::Num(n) => *n,
            Val::Str(s) => string_to_number(s),
            Val::List(items) => {
                let items = items.borrow();
                match items.len() {
                    0 => 0.0,
                    1 => items[0].to_number(),
                    _ => f64::NAN,
                }
            }
            _ => f64::NAN,
        }
    }

    /// ToString
    pub fn to_js_string(&self) -> String {
        let mut seen = HashSet::new();
        self.to_js_string_inner(&mut seen)
    }

    fn to_js_string_inner(&self, seen: &mut HashSet<usize>) -> String {
        match self {
            Val::Undefined => "undefined".to_string(),
            Val::Null => "null".to_string(),
            Val::Bool(b) => b.to_string(),
            Val::Num(n) => number_to_string(*n),
            Val::Str(s) => s.clone(),
            Val::List(items) => {
                let ptr = Rc::as_ptr(items) as usize;
                if !seen.insert(ptr) {
                    return String::new();
                }
                let joined = items
                    .borrow()
                    .iter()
                    .map(|v| {
                        if v.is_nullish() {
                            String::new()
                        } else {
                            v.to_js_string_inner(seen)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                seen.remove(&ptr);
                joined
            }
            Val::Obj(_) => "[object Object]".to_string(),
            Val::Func(closure) => format!("function {}() {{ [code] }}", closure.name()),
            Val::NativeFunc(func) => format!("function {}() {{ [native code] }}", func.name()),
            Val::Error(info) => info.header(),
            Val::Capability(_) => "function evaluate() { [native code] }".to_string(),
        }
    }

    /// Property key for this value
    pub fn to_property_key(&self) -> String {
        self.to_js_string()
    }
}

/// JavaScript Number::toString
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let formatted = format!("{:e}", n);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => formatted,
        };
    }
    if n.fract() == 0.0 {
        return format!("{:.0}", n);
    }
    format!("{}", n)
}

/// JavaScript ToNumber for strings
pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    // Rust accepts "inf"/"nan" spellings that JavaScript does not
    if t
        .chars()
        .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

/* ===================== Equality ===================== */

/// `===`
pub fn strict_equals(a: &Val, b: &Val) -> bool {
    match (a, b) {
        (Val::Undefined, Val::Undefined) | (Val::Null, Val::Null) => true,
        (Val::Bool(x), Val::Bool(y)) => x == y,
        (Val::Num(x), Val::Num(y)) => x == y,
        (Val::Str(x), Val::Str(y)) => x == y,
        (Val::List(x), Val::List(y)) => Rc::ptr_eq(x, y),
        (Val::Obj(x), Val::Obj(y)) => Rc::ptr_eq(x, y),
        (Val::Func(x), Val::Func(y)) => Rc::ptr_eq(x, y),
        (Val::Error(x), Val::Error(y)) => Rc::ptr_eq(x, y),
        (Val::NativeFunc(x), Val::NativeFunc(y)) => x == y,
        (Val::Capability(x), Val::Capability(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// `==`
pub fn loose_equals(a: &Val, b: &Val) -> bool {
    match (a, b) {
        (x, y) if x.is_nullish() && y.is_nullish() => true,
        (x, y) if x.is_nullish() || y.is_nullish() => false,
        (Val::Num(_), Val::Str(_)) | (Val::Str(_), Val::Num(_)) => a.to_number() == b.to_number(),
        (Val::Bool(_), _) => loose_equals(&Val::Num(a.to_number()), b),
        (_, Val::Bool(_)) => loose_equals(a, &Val::Num(b.to_number())),
        (Val::List(_) | Val::Obj(_) | Val::Error(_), Val::Num(_) | Val::Str(_)) => {
            loose_equals(&Val::Str(a.to_js_string()), b)
        }
        (Val::Num(_) | Val::Str(_), Val::List(_) | Val::Obj(_) | Val::Error(_)) => {
            loose_equals(a, &Val::Str(b.to_js_string()))
        }
        _ => strict_equals(a, b),
    }
}

/// Structural equality, used by tests and record comparison.
/// Reference values compare by content; functions and scopes by identity.
impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Val::List(x), Val::List(y)) => Rc::ptr_eq(x, y) || *x.borrow() == *y.borrow(),
            (Val::Obj(x), Val::Obj(y)) => Rc::ptr_eq(x, y) || *x.borrow() == *y.borrow(),
            (Val::Error(x), Val::Error(y)) => x == y,
            _ => strict_equals(self, other),
        }
    }
}

/* ===================== Inspection ===================== */

impl Val {
    /// Console rendering: top-level strings are printed raw
    pub fn to_display(&self) -> String {
        match self {
            Val::Str(s) => s.clone(),
            Val::Error(info) => info.stack.clone(),
            other => other.inspect(),
        }
    }

    /// Developer-facing rendering, e.g. `{ a: 1, b: [ 'x' ] }`
    pub fn inspect(&self) -> String {
        let mut seen = HashSet::new();
        self.inspect_inner(&mut seen)
    }

    fn inspect_inner(&self, seen: &mut HashSet<usize>) -> String {
        match self {
            Val::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Val::List(items) => {
                let ptr = Rc::as_ptr(items) as usize;
                if !seen.insert(ptr) {
                    return "[Circular]".to_string();
                }
                let items = items.borrow();
                let out = if items.is_empty() {
                    "[]".to_string()
                } else {
                    let parts: Vec<String> = items.iter().map(|v| v.inspect_inner(seen)).collect();
                    format!("[ {} ]", parts.join(", "))
                };
                seen.remove(&ptr);
                out
            }
            Val::Obj(map) => {
                let ptr = Rc::as_ptr(map) as usize;
                if !seen.insert(ptr) {
                    return "[Circular]".to_string();
                }
                let map = map.borrow();
                let out = if map.is_empty() {
                    "{}".to_string()
                } else {
                    let parts: Vec<String> = map
                        .iter()
                        .map(|(k, v)| format!("{}: {}", inspect_key(k), v.inspect_inner(seen)))
                        .collect();
                    format!("{{ {} }}", parts.join(", "))
                };
                seen.remove(&ptr);
                out
            }
            Val::Func(closure) => match closure.name() {
                "" => "[Function (anonymous)]".to_string(),
                name => format!("[Function: {}]", name),
            },
            Val::NativeFunc(func) => format!("[Function: {}]", func.name()),
            Val::Capability(_) => "[Function: evaluate]".to_string(),
            Val::Error(info) => format!("[{}]", info.header()),
            other => other.to_js_string(),
        }
    }
}

fn inspect_key(key: &str) -> String {
    let is_ident = key
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if is_ident {
        key.to_string()
    } else {
        format!("'{}'", key)
    }
}

/* ===================== JSON ===================== */

/// Largest integer a double represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Val {
    /// Convert to JSON, following `JSON.stringify` rules for unrepresentable values.
    ///
    /// Returns `Ok(None)` when the value itself has no JSON form (undefined,
    /// functions) and `Err` on circular structures.
    pub fn to_json(&self) -> Result<Option<JsonValue>, CircularStructure> {
        let mut seen = HashSet::new();
        self.to_json_inner(&mut seen)
    }

    fn to_json_inner(
        &self,
        seen: &mut HashSet<usize>,
    ) -> Result<Option<JsonValue>, CircularStructure> {
        Ok(Some(match self {
            Val::Undefined | Val::Func(_) | Val::NativeFunc(_) | Val::Capability(_) => {
                return Ok(None)
            }
            Val::Null => JsonValue::Null,
            Val::Bool(b) => JsonValue::Bool(*b),
            Val::Num(n) => number_to_json(*n),
            Val::Str(s) => JsonValue::String(s.clone()),
            Val::List(items) => {
                let ptr = Rc::as_ptr(items) as usize;
                if !seen.insert(ptr) {
                    return Err(CircularStructure);
                }
                let mut out = Vec::new();
                for item in items.borrow().iter() {
                    out.push(item.to_json_inner(seen)?.unwrap_or(JsonValue::Null));
                }
                seen.remove(&ptr);
                JsonValue::Array(out)
            }
            Val::Obj(map) => {
                let ptr = Rc::as_ptr(map) as usize;
                if !seen.insert(ptr) {
                    return Err(CircularStructure);
                }
                let mut out = serde_json::Map::new();
                for (k, v) in map.borrow().iter() {
                    if let Some(json) = v.to_json_inner(seen)? {
                        out.insert(k.clone(), json);
                    }
                }
                seen.remove(&ptr);
                JsonValue::Object(out)
            }
            Val::Error(info) => serde_json::json!({
                "name": info.name,
                "message": info.message,
                "stack": info.stack,
            }),
        }))
    }

    pub fn from_json(json: &JsonValue) -> Val {
        match json {
            JsonValue::Null => Val::Null,
            JsonValue::Bool(b) => Val::Bool(*b),
            JsonValue::Number(n) => Val::Num(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Val::Str(s.clone()),
            JsonValue::Array(items) => Val::list(items.iter().map(Val::from_json).collect()),
            JsonValue::Object(map) => Val::obj(map.iter().map(|(k, v)| (k.clone(), Val::from_json(v)))),
        }
    }
}

fn number_to_json(n: f64) -> JsonValue {
    if !n.is_finite() {
        JsonValue::Null
    } else if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        JsonValue::from(n as i64)
    } else {
        JsonValue::from(n)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircularStructure;

impl fmt::Display for CircularStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Converting circular structure to JSON")
    }
}

/// Values without a JSON form serialize as their inspected text
impl Serialize for Val {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_json() {
            Ok(Some(json)) => json.serialize(serializer),
            Ok(None) if matches!(self, Val::Undefined) => serializer.serialize_unit(),
            Ok(None) => serializer.serialize_str(&self.inspect()),
            Err(_) => serializer.serialize_str("[Circular]"),
        }
    }
}
