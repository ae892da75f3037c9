//! Property access on runtime values

use super::errors;
use super::stdlib::{arrays, strings, StdlibFunc};
use super::types::Val;
use super::vm::VM;

/// Largest length an array can have
const MAX_ARRAY_LENGTH: f64 = u32::MAX as f64;

/// Arrays are stored densely; growing one past this many slots is refused
pub const MAX_DENSE_LENGTH: usize = 1 << 24;

/// Read `object[key]`
pub fn get_property(vm: &VM, object: &Val, key: &str) -> Result<Val, Val> {
    Ok(match object {
        Val::Undefined | Val::Null => {
            return Err(vm.error_value(
                errors::TYPE_ERROR,
                format!(
                    "Cannot read properties of {} (reading '{}')",
                    object.to_js_string(),
                    key
                ),
            ))
        }
        Val::Obj(map) => map.borrow().get(key).cloned().unwrap_or(Val::Undefined),
        Val::List(items) => {
            let items = items.borrow();
            if key == "length" {
                Val::Num(items.len() as f64)
            } else if let Some(i) = array_index(key) {
                items.get(i).cloned().unwrap_or(Val::Undefined)
            } else {
                arrays::method(key)
                    .map(Val::NativeFunc)
                    .unwrap_or(Val::Undefined)
            }
        }
        Val::Str(s) => {
            if key == "length" {
                Val::Num(s.chars().count() as f64)
            } else if let Some(i) = array_index(key) {
                s.chars()
                    .nth(i)
                    .map(|c| Val::Str(c.to_string()))
                    .unwrap_or(Val::Undefined)
            } else {
                strings::method(key)
                    .map(Val::NativeFunc)
                    .unwrap_or(Val::Undefined)
            }
        }
        Val::Num(_) => match key {
            "toFixed" => Val::NativeFunc(StdlibFunc::NumToFixed),
            "toString" => Val::NativeFunc(StdlibFunc::NumToString),
            _ => Val::Undefined,
        },
        Val::Error(info) => match key {
            "name" => Val::str(info.name.as_str()),
            "message" => Val::str(info.message.as_str()),
            "stack" => Val::str(info.stack.as_str()),
            _ => Val::Undefined,
        },
        Val::Func(closure) => match key {
            "name" => Val::str(closure.name()),
            "length" => Val::Num(closure.def.params.len() as f64),
            _ => Val::Undefined,
        },
        Val::NativeFunc(func) => match key {
            "name" => Val::str(func.name()),
            _ => Val::Undefined,
        },
        Val::Capability(_) => match key {
            "name" => Val::str("evaluate"),
            _ => Val::Undefined,
        },
        Val::Bool(_) => Val::Undefined,
    })
}

/// Write `object[key] = value`
pub fn set_property(vm: &VM, object: &Val, key: &str, value: Val) -> Result<(), Val> {
    match object {
        Val::Obj(map) => {
            map.borrow_mut().insert(key.to_string(), value);
            Ok(())
        }
        Val::List(items) => {
            let mut items = items.borrow_mut();
            if key == "length" {
                let n = value.to_number();
                if n < 0.0 || n.fract() != 0.0 || !n.is_finite() || n > MAX_ARRAY_LENGTH {
                    return Err(vm.error_value(errors::RANGE_ERROR, "Invalid array length"));
                }
                grow(vm, &mut items, n as usize)?;
                items.truncate(n as usize);
                Ok(())
            } else if let Some(i) = array_index(key) {
                if i >= items.len() {
                    grow(vm, &mut items, i + 1)?;
                }
                items[i] = value;
                Ok(())
            } else {
                Err(vm.error_value(
                    errors::TYPE_ERROR,
                    format!("Cannot set non-index property '{}' on an array", key),
                ))
            }
        }
        Val::Undefined | Val::Null => Err(vm.error_value(
            errors::TYPE_ERROR,
            format!(
                "Cannot set properties of {} (setting '{}')",
                object.to_js_string(),
                key
            ),
        )),
        Val::Bool(_) | Val::Num(_) | Val::Str(_) => Err(vm.error_value(
            errors::TYPE_ERROR,
            format!(
                "Cannot create property '{}' on {} '{}'",
                key,
                object.type_of(),
                object.to_js_string()
            ),
        )),
        Val::Error(_) | Val::Func(_) | Val::NativeFunc(_) | Val::Capability(_) => {
            Err(vm.error_value(
                errors::TYPE_ERROR,
                format!("Cannot assign to property '{}' of {}", key, object.inspect()),
            ))
        }
    }
}

/// Pad `items` with `undefined` up to `len` slots
fn grow(vm: &VM, items: &mut Vec<Val>, len: usize) -> Result<(), Val> {
    if len > MAX_DENSE_LENGTH {
        return Err(vm.error_value(errors::RANGE_ERROR, "Invalid array length"));
    }
    if len > items.len() {
        items.resize(len, Val::Undefined);
    }
    Ok(())
}

/// Canonical array index (`"0"`, `"12"`; not `"01"` or `"1.0"`), below
/// the largest array length
pub fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    let index: u32 = key.parse().ok()?;
    (index < u32::MAX).then_some(index as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_index() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("42"), Some(42));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("length"), None);
        assert_eq!(array_index(""), None);
    }

    #[test]
    fn test_array_index_stops_below_max_length() {
        assert_eq!(array_index("4294967294"), Some(4_294_967_294));
        assert_eq!(array_index("4294967295"), None);
        assert_eq!(array_index("18446744073709551615"), None);
        assert_eq!(array_index("99999999999999999999999"), None);
    }
}
