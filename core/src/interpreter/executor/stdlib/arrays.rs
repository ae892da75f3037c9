//! Array.prototype methods
//!
//! Callback methods (`map`, `filter`, ...) only resolve here; their
//! iteration runs as an `Iterate` frame so callbacks share the VM stack.

use super::{arg, throw, value, StdlibFunc};
use crate::interpreter::executor::errors;
use crate::interpreter::executor::expressions::EvalResult;
use crate::interpreter::executor::types::values::strict_equals;
use crate::interpreter::executor::types::{IterMethod, Val};
use crate::interpreter::executor::vm::VM;

/// Method looked up as `array.name`
pub fn method(name: &str) -> Option<StdlibFunc> {
    Some(match name {
        "push" => StdlibFunc::ArrayPush,
        "pop" => StdlibFunc::ArrayPop,
        "shift" => StdlibFunc::ArrayShift,
        "unshift" => StdlibFunc::ArrayUnshift,
        "slice" => StdlibFunc::ArraySlice,
        "indexOf" => StdlibFunc::ArrayIndexOf,
        "includes" => StdlibFunc::ArrayIncludes,
        "join" => StdlibFunc::ArrayJoin,
        "reverse" => StdlibFunc::ArrayReverse,
        "concat" => StdlibFunc::ArrayConcat,
        "sort" => StdlibFunc::ArraySort,
        "map" => StdlibFunc::ArrayCallback(IterMethod::Map),
        "filter" => StdlibFunc::ArrayCallback(IterMethod::Filter),
        "forEach" => StdlibFunc::ArrayCallback(IterMethod::ForEach),
        "reduce" => StdlibFunc::ArrayCallback(IterMethod::Reduce),
        "find" => StdlibFunc::ArrayCallback(IterMethod::Find),
        "findIndex" => StdlibFunc::ArrayCallback(IterMethod::FindIndex),
        "some" => StdlibFunc::ArrayCallback(IterMethod::Some),
        "every" => StdlibFunc::ArrayCallback(IterMethod::Every),
        _ => return None,
    })
}

pub fn call(vm: &VM, func: StdlibFunc, this: &Val, args: &[Val]) -> EvalResult {
    let Val::List(list) = this else {
        return throw(
            vm,
            errors::TYPE_ERROR,
            format!("Array.prototype.{} called on a non-array", func.name()),
        );
    };

    match func {
        StdlibFunc::ArrayPush => {
            let mut items = list.borrow_mut();
            items.extend(args.iter().cloned());
            value(Val::Num(items.len() as f64))
        }
        StdlibFunc::ArrayPop => value(list.borrow_mut().pop().unwrap_or(Val::Undefined)),
        StdlibFunc::ArrayShift => {
            let mut items = list.borrow_mut();
            if items.is_empty() {
                value(Val::Undefined)
            } else {
                value(items.remove(0))
            }
        }
        StdlibFunc::ArrayUnshift => {
            let mut items = list.borrow_mut();
            items.splice(0..0, args.iter().cloned());
            value(Val::Num(items.len() as f64))
        }
        StdlibFunc::ArraySlice => {
            let items = list.borrow();
            let len = items.len() as f64;
            let start = relative(args.first(), 0.0, len);
            let end = relative(args.get(1), len, len).max(start);
            value(Val::list(items[start..end].to_vec()))
        }
        StdlibFunc::ArrayIndexOf => {
            let needle = arg(args, 0);
            let found = list
                .borrow()
                .iter()
                .position(|v| strict_equals(v, &needle))
                .map(|i| i as f64)
                .unwrap_or(-1.0);
            value(Val::Num(found))
        }
        StdlibFunc::ArrayIncludes => {
            let needle = arg(args, 0);
            let found = list.borrow().iter().any(|v| same_value_zero(v, &needle));
            value(Val::Bool(found))
        }
        StdlibFunc::ArrayJoin => {
            let sep = match args.first() {
                None | Some(Val::Undefined) => ",".to_string(),
                Some(s) => s.to_js_string(),
            };
            let joined = list
                .borrow()
                .iter()
                .map(|v| {
                    if v.is_nullish() {
                        String::new()
                    } else {
                        v.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(&sep);
            value(Val::Str(joined))
        }
        StdlibFunc::ArrayReverse => {
            list.borrow_mut().reverse();
            value(this.clone())
        }
        StdlibFunc::ArrayConcat => {
            let mut items = list.borrow().clone();
            for a in args {
                match a {
                    Val::List(other) => items.extend(other.borrow().iter().cloned()),
                    other => items.push(other.clone()),
                }
            }
            value(Val::list(items))
        }
        StdlibFunc::ArraySort => {
            if args.first().is_some_and(|c| !matches!(c, Val::Undefined)) {
                return throw(
                    vm,
                    errors::TYPE_ERROR,
                    "Array.prototype.sort comparators are not supported",
                );
            }
            sort_default(&mut list.borrow_mut());
            value(this.clone())
        }
        other => throw(
            vm,
            errors::TYPE_ERROR,
            format!("{} is not an array method", other.name()),
        ),
    }
}

/// Default sort: by string form, `undefined` last; stable
fn sort_default(items: &mut Vec<Val>) {
    let (mut defined, undefined): (Vec<Val>, Vec<Val>) = items
        .drain(..)
        .partition(|v| !matches!(v, Val::Undefined));
    defined.sort_by_cached_key(|v| v.to_js_string());
    items.extend(defined);
    items.extend(undefined);
}

fn same_value_zero(a: &Val, b: &Val) -> bool {
    match (a, b) {
        (Val::Num(x), Val::Num(y)) if x.is_nan() && y.is_nan() => true,
        _ => strict_equals(a, b),
    }
}

/// Index argument; negative values count from the end
fn relative(v: Option<&Val>, default: f64, len: f64) -> usize {
    let n = match v {
        None | Some(Val::Undefined) => default,
        Some(v) => v.to_number(),
    };
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    let n = if n < 0.0 { len + n } else { n };
    n.clamp(0.0, len) as usize
}
