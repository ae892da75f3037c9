//! Standard library function implementations
//!
//! This module contains all stdlib function implementations organized by category.

pub mod arrays;
pub mod console;
pub mod globals;
pub mod json;
pub mod math;
pub mod strings;

use super::errors;
use super::expressions::EvalResult;
use super::scope::{Env, Scope};
use super::types::{IterMethod, Val};
use super::vm::VM;
use crate::intrinsics;
use serde::{Deserialize, Serialize};

/* ===================== Standard Library Function Types ===================== */

/// Standard library function identifiers
///
/// Each variant represents a specific native function. Methods receive their
/// receiver as `this`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StdlibFunc {
    // console / report
    Console(ConsoleLevel),

    // Math
    MathFloor,
    MathCeil,
    MathRound,
    MathAbs,
    MathMin,
    MathMax,
    MathPow,
    MathSqrt,
    MathTrunc,
    MathSign,

    // JSON
    JsonStringify,
    JsonParse,

    // Conversions and global helpers
    String,
    Number,
    Boolean,
    ParseInt,
    ParseFloat,
    IsNaN,
    IsFinite,
    ArrayIsArray,
    ObjectKeys,
    ObjectValues,
    ObjectEntries,

    /// Error constructors, callable with or without `new`
    ErrorCtor(ErrorKind),

    /// Direct `eval(text)`; evaluated on the interpreter stack
    Eval,
    NormalizeError,

    // Array.prototype
    ArrayPush,
    ArrayPop,
    ArrayShift,
    ArrayUnshift,
    ArraySlice,
    ArrayIndexOf,
    ArrayIncludes,
    ArrayJoin,
    ArrayReverse,
    ArrayConcat,
    ArraySort,
    /// Callback methods; their callbacks run on the interpreter stack
    ArrayCallback(IterMethod),

    // String.prototype
    StrToUpperCase,
    StrToLowerCase,
    StrTrim,
    StrSplit,
    StrIncludes,
    StrIndexOf,
    StrSlice,
    StrSubstring,
    StrStartsWith,
    StrEndsWith,
    StrRepeat,
    StrCharAt,
    StrReplace,
    StrPadStart,
    StrPadEnd,
    StrToString,

    // Number.prototype
    NumToFixed,
    NumToString,
}

/// Which error constructor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Error,
    TypeError,
    ReferenceError,
    RangeError,
    SyntaxError,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => errors::ERROR,
            ErrorKind::TypeError => errors::TYPE_ERROR,
            ErrorKind::ReferenceError => errors::REFERENCE_ERROR,
            ErrorKind::RangeError => errors::RANGE_ERROR,
            ErrorKind::SyntaxError => errors::SYNTAX_ERROR,
        }
    }

    /// `err instanceof Ctor`
    pub fn matches(self, error_name: &str) -> bool {
        self == ErrorKind::Error || self.name() == error_name
    }
}

impl StdlibFunc {
    /// Function name as reported by `fn.name` and inspection
    pub fn name(&self) -> &'static str {
        match self {
            StdlibFunc::Console(level) => level.method_name(),
            StdlibFunc::MathFloor => "floor",
            StdlibFunc::MathCeil => "ceil",
            StdlibFunc::MathRound => "round",
            StdlibFunc::MathAbs => "abs",
            StdlibFunc::MathMin => "min",
            StdlibFunc::MathMax => "max",
            StdlibFunc::MathPow => "pow",
            StdlibFunc::MathSqrt => "sqrt",
            StdlibFunc::MathTrunc => "trunc",
            StdlibFunc::MathSign => "sign",
            StdlibFunc::JsonStringify => "stringify",
            StdlibFunc::JsonParse => "parse",
            StdlibFunc::String => "String",
            StdlibFunc::Number => "Number",
            StdlibFunc::Boolean => "Boolean",
            StdlibFunc::ParseInt => "parseInt",
            StdlibFunc::ParseFloat => "parseFloat",
            StdlibFunc::IsNaN => "isNaN",
            StdlibFunc::IsFinite => "isFinite",
            StdlibFunc::ArrayIsArray => "isArray",
            StdlibFunc::ObjectKeys => "keys",
            StdlibFunc::ObjectValues => "values",
            StdlibFunc::ObjectEntries => "entries",
            StdlibFunc::ErrorCtor(kind) => kind.name(),
            StdlibFunc::Eval => "eval",
            StdlibFunc::NormalizeError => intrinsics::NORMALIZE_ERROR,
            StdlibFunc::ArrayPush => "push",
            StdlibFunc::ArrayPop => "pop",
            StdlibFunc::ArrayShift => "shift",
            StdlibFunc::ArrayUnshift => "unshift",
            StdlibFunc::ArraySlice => "slice",
            StdlibFunc::ArrayIndexOf => "indexOf",
            StdlibFunc::ArrayIncludes => "includes",
            StdlibFunc::ArrayJoin => "join",
            StdlibFunc::ArrayReverse => "reverse",
            StdlibFunc::ArrayConcat => "concat",
            StdlibFunc::ArraySort => "sort",
            StdlibFunc::ArrayCallback(method) => method.name(),
            StdlibFunc::StrToUpperCase => "toUpperCase",
            StdlibFunc::StrToLowerCase => "toLowerCase",
            StdlibFunc::StrTrim => "trim",
            StdlibFunc::StrSplit => "split",
            StdlibFunc::StrIncludes => "includes",
            StdlibFunc::StrIndexOf => "indexOf",
            StdlibFunc::StrSlice => "slice",
            StdlibFunc::StrSubstring => "substring",
            StdlibFunc::StrStartsWith => "startsWith",
            StdlibFunc::StrEndsWith => "endsWith",
            StdlibFunc::StrRepeat => "repeat",
            StdlibFunc::StrCharAt => "charAt",
            StdlibFunc::StrReplace => "replace",
            StdlibFunc::StrPadStart => "padStart",
            StdlibFunc::StrPadEnd => "padEnd",
            StdlibFunc::StrToString => "toString",
            StdlibFunc::NumToFixed => "toFixed",
            StdlibFunc::NumToString => "toString",
        }
    }

    /// Whether `new` may be applied to this function
    pub fn is_constructor(&self) -> bool {
        matches!(self, StdlibFunc::ErrorCtor(_))
    }
}

impl IterMethod {
    pub fn name(self) -> &'static str {
        match self {
            IterMethod::Map => "map",
            IterMethod::Filter => "filter",
            IterMethod::ForEach => "forEach",
            IterMethod::Reduce => "reduce",
            IterMethod::Find => "find",
            IterMethod::FindIndex => "findIndex",
            IterMethod::Some => "some",
            IterMethod::Every => "every",
        }
    }
}

/* ===================== Console Output ===================== */

/// Console method (or `report`) that produced a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
    Report,
}

impl ConsoleLevel {
    fn method_name(self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Info => "info",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
            ConsoleLevel::Debug => "debug",
            ConsoleLevel::Report => "report",
        }
    }
}

/// One captured line of console output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleLine {
    pub level: ConsoleLevel,
    pub text: String,
}

/* ===================== Stdlib Dispatcher ===================== */

/// Call a standard library function with arguments
///
/// This dispatcher routes to the appropriate function implementation
/// based on the StdlibFunc variant. `Eval` and the array callback methods
/// need the interpreter stack and are dispatched by the caller instead.
pub fn call_stdlib_func(vm: &mut VM, func: StdlibFunc, this: &Val, args: &[Val]) -> EvalResult {
    match func {
        StdlibFunc::Console(level) => console::write(vm, level, args),

        StdlibFunc::MathFloor => math::floor(args),
        StdlibFunc::MathCeil => math::ceil(args),
        StdlibFunc::MathRound => math::round(args),
        StdlibFunc::MathAbs => math::abs(args),
        StdlibFunc::MathMin => math::min(args),
        StdlibFunc::MathMax => math::max(args),
        StdlibFunc::MathPow => math::pow(args),
        StdlibFunc::MathSqrt => math::sqrt(args),
        StdlibFunc::MathTrunc => math::trunc(args),
        StdlibFunc::MathSign => math::sign(args),

        StdlibFunc::JsonStringify => json::stringify(vm, args),
        StdlibFunc::JsonParse => json::parse(vm, args),

        StdlibFunc::String => globals::string(args),
        StdlibFunc::Number => globals::number(args),
        StdlibFunc::Boolean => globals::boolean(args),
        StdlibFunc::ParseInt => globals::parse_int(args),
        StdlibFunc::ParseFloat => globals::parse_float(args),
        StdlibFunc::IsNaN => globals::is_nan(args),
        StdlibFunc::IsFinite => globals::is_finite(args),
        StdlibFunc::ArrayIsArray => globals::is_array(args),
        StdlibFunc::ObjectKeys => globals::object_keys(vm, args),
        StdlibFunc::ObjectValues => globals::object_values(vm, args),
        StdlibFunc::ObjectEntries => globals::object_entries(vm, args),
        StdlibFunc::ErrorCtor(kind) => globals::construct_error(vm, kind, args),
        StdlibFunc::NormalizeError => EvalResult::Value {
            v: errors::normalize_error(&arg(args, 0)),
        },

        StdlibFunc::ArrayPush
        | StdlibFunc::ArrayPop
        | StdlibFunc::ArrayShift
        | StdlibFunc::ArrayUnshift
        | StdlibFunc::ArraySlice
        | StdlibFunc::ArrayIndexOf
        | StdlibFunc::ArrayIncludes
        | StdlibFunc::ArrayJoin
        | StdlibFunc::ArrayReverse
        | StdlibFunc::ArrayConcat
        | StdlibFunc::ArraySort => arrays::call(vm, func, this, args),

        StdlibFunc::StrToUpperCase
        | StdlibFunc::StrToLowerCase
        | StdlibFunc::StrTrim
        | StdlibFunc::StrSplit
        | StdlibFunc::StrIncludes
        | StdlibFunc::StrIndexOf
        | StdlibFunc::StrSlice
        | StdlibFunc::StrSubstring
        | StdlibFunc::StrStartsWith
        | StdlibFunc::StrEndsWith
        | StdlibFunc::StrRepeat
        | StdlibFunc::StrCharAt
        | StdlibFunc::StrReplace
        | StdlibFunc::StrPadStart
        | StdlibFunc::StrPadEnd
        | StdlibFunc::StrToString => strings::call(vm, func, this, args),

        StdlibFunc::NumToFixed => math::to_fixed(vm, this, args),
        StdlibFunc::NumToString => math::number_to_radix_string(vm, this, args),

        StdlibFunc::Eval | StdlibFunc::ArrayCallback(_) => throw(
            vm,
            errors::TYPE_ERROR,
            format!("{} cannot be called from native code", func.name()),
        ),
    }
}

/* ===================== Helpers ===================== */

/// Argument `i`, or `undefined` when missing
pub(crate) fn arg(args: &[Val], i: usize) -> Val {
    args.get(i).cloned().unwrap_or(Val::Undefined)
}

/// Numeric argument `i` (ToNumber)
pub(crate) fn num_arg(args: &[Val], i: usize) -> f64 {
    args.get(i).map(Val::to_number).unwrap_or(f64::NAN)
}

pub(crate) fn value(v: Val) -> EvalResult {
    EvalResult::Value { v }
}

pub(crate) fn throw(vm: &VM, name: &str, message: impl Into<String>) -> EvalResult {
    EvalResult::Throw {
        error: vm.error_value(name, message),
    }
}

/* ===================== Environment Injection ===================== */

fn native_object(entries: &[(&str, StdlibFunc)]) -> Val {
    Val::obj(
        entries
            .iter()
            .map(|(name, func)| (*name, Val::NativeFunc(*func))),
    )
}

/// Inject standard library globals into a scope
pub fn inject_stdlib(env: &Env) {
    let console = native_object(&[
        ("log", StdlibFunc::Console(ConsoleLevel::Log)),
        ("info", StdlibFunc::Console(ConsoleLevel::Info)),
        ("warn", StdlibFunc::Console(ConsoleLevel::Warn)),
        ("error", StdlibFunc::Console(ConsoleLevel::Error)),
        ("debug", StdlibFunc::Console(ConsoleLevel::Debug)),
    ]);
    env.declare("console", console, true);
    env.declare(
        "report",
        Val::NativeFunc(StdlibFunc::Console(ConsoleLevel::Report)),
        true,
    );

    let math = native_object(&[
        ("floor", StdlibFunc::MathFloor),
        ("ceil", StdlibFunc::MathCeil),
        ("round", StdlibFunc::MathRound),
        ("abs", StdlibFunc::MathAbs),
        ("min", StdlibFunc::MathMin),
        ("max", StdlibFunc::MathMax),
        ("pow", StdlibFunc::MathPow),
        ("sqrt", StdlibFunc::MathSqrt),
        ("trunc", StdlibFunc::MathTrunc),
        ("sign", StdlibFunc::MathSign),
    ]);
    if let Val::Obj(map) = &math {
        let mut map = map.borrow_mut();
        map.insert("PI".to_string(), Val::Num(std::f64::consts::PI));
        map.insert("E".to_string(), Val::Num(std::f64::consts::E));
    }
    env.declare("Math", math, true);

    env.declare(
        "JSON",
        native_object(&[
            ("stringify", StdlibFunc::JsonStringify),
            ("parse", StdlibFunc::JsonParse),
        ]),
        true,
    );
    env.declare(
        "Array",
        native_object(&[("isArray", StdlibFunc::ArrayIsArray)]),
        true,
    );
    env.declare(
        "Object",
        native_object(&[
            ("keys", StdlibFunc::ObjectKeys),
            ("values", StdlibFunc::ObjectValues),
            ("entries", StdlibFunc::ObjectEntries),
        ]),
        true,
    );

    let functions = [
        ("String", StdlibFunc::String),
        ("Number", StdlibFunc::Number),
        ("Boolean", StdlibFunc::Boolean),
        ("parseInt", StdlibFunc::ParseInt),
        ("parseFloat", StdlibFunc::ParseFloat),
        ("isNaN", StdlibFunc::IsNaN),
        ("isFinite", StdlibFunc::IsFinite),
        ("eval", StdlibFunc::Eval),
        (intrinsics::NORMALIZE_ERROR, StdlibFunc::NormalizeError),
        ("Error", StdlibFunc::ErrorCtor(ErrorKind::Error)),
        ("TypeError", StdlibFunc::ErrorCtor(ErrorKind::TypeError)),
        ("ReferenceError", StdlibFunc::ErrorCtor(ErrorKind::ReferenceError)),
        ("RangeError", StdlibFunc::ErrorCtor(ErrorKind::RangeError)),
        ("SyntaxError", StdlibFunc::ErrorCtor(ErrorKind::SyntaxError)),
    ];
    for (name, func) in functions {
        env.declare(name, Val::NativeFunc(func), true);
    }

    env.declare("undefined", Val::Undefined, false);
    env.declare("NaN", Val::Num(f64::NAN), false);
    env.declare("Infinity", Val::Num(f64::INFINITY), false);
}

/// A fresh global scope holding the standard library
pub fn global_scope() -> Env {
    let env = Scope::root();
    inject_stdlib(&env);
    env
}
