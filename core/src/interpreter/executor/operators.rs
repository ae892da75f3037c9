//! Binary and unary operators
//!
//! Operators never suspend; type errors come back as thrown values.

use super::errors;
use super::stdlib::StdlibFunc;
use super::types::ast::{BinaryOp, UnaryOp};
use super::types::values::{loose_equals, strict_equals};
use super::types::Val;
use super::stdlib::strings::{INVALID_LENGTH, MAX_STRING_LENGTH};
use super::vm::VM;
use std::cmp::Ordering;

/// Apply a binary operator
pub fn binary_op(vm: &VM, op: BinaryOp, left: &Val, right: &Val) -> Result<Val, Val> {
    Ok(match op {
        BinaryOp::Add => match add(left, right) {
            Some(sum) => sum,
            None => return Err(vm.error_value(errors::RANGE_ERROR, INVALID_LENGTH)),
        },
        BinaryOp::Sub => Val::Num(left.to_number() - right.to_number()),
        BinaryOp::Mul => Val::Num(left.to_number() * right.to_number()),
        BinaryOp::Div => Val::Num(left.to_number() / right.to_number()),
        BinaryOp::Rem => Val::Num(left.to_number() % right.to_number()),
        BinaryOp::Pow => Val::Num(pow(left.to_number(), right.to_number())),
        BinaryOp::Eq => Val::Bool(loose_equals(left, right)),
        BinaryOp::Ne => Val::Bool(!loose_equals(left, right)),
        BinaryOp::StrictEq => Val::Bool(strict_equals(left, right)),
        BinaryOp::StrictNe => Val::Bool(!strict_equals(left, right)),
        BinaryOp::Lt => Val::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::Gt => Val::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::Lte => Val::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gte => Val::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::InstanceOf => return instance_of(vm, left, right),
        BinaryOp::In => return has_property(vm, left, right),
    })
}

/// Apply a unary operator (`typeof` of undeclared names is handled by the caller)
pub fn unary_op(op: UnaryOp, operand: &Val) -> Val {
    match op {
        UnaryOp::Not => Val::Bool(!operand.is_truthy()),
        UnaryOp::Neg => Val::Num(-operand.to_number()),
        UnaryOp::Plus => Val::Num(operand.to_number()),
        UnaryOp::TypeOf => Val::str(operand.type_of()),
        UnaryOp::Void => Val::Undefined,
    }
}

/// `a ** b`; unlike `f64::powf`, `1 ** NaN` and `1 ** Infinity` are NaN
pub fn pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exponent)
}

/// `a + b`; `None` when the concatenation would be too long
fn add(left: &Val, right: &Val) -> Option<Val> {
    let l = to_primitive(left);
    let r = to_primitive(right);
    let (a, b) = match (&l, &r) {
        (Val::Str(a), b) => (a.clone(), b.to_js_string()),
        (a, Val::Str(b)) => (a.to_js_string(), b.clone()),
        (a, b) => return Some(Val::Num(a.to_number() + b.to_number())),
    };
    if a.len() + b.len() > MAX_STRING_LENGTH {
        return None;
    }
    Some(Val::Str(a + &b))
}

/// Reference values take part in `+` through their string form
fn to_primitive(v: &Val) -> Val {
    match v {
        Val::List(_)
        | Val::Obj(_)
        | Val::Error(_)
        | Val::Func(_)
        | Val::NativeFunc(_)
        | Val::Capability(_) => Val::Str(v.to_js_string()),
        other => other.clone(),
    }
}

/// Relational comparison; `None` when either side is NaN
fn compare(left: &Val, right: &Val) -> Option<Ordering> {
    let l = to_primitive(left);
    let r = to_primitive(right);
    match (&l, &r) {
        (Val::Str(a), Val::Str(b)) => Some(a.cmp(b)),
        (a, b) => a.to_number().partial_cmp(&b.to_number()),
    }
}

fn instance_of(vm: &VM, left: &Val, right: &Val) -> Result<Val, Val> {
    if !right.is_callable() {
        return Err(vm.error_value(
            errors::TYPE_ERROR,
            "Right-hand side of 'instanceof' is not callable",
        ));
    }
    Ok(Val::Bool(match (left, right) {
        (Val::Error(info), Val::NativeFunc(StdlibFunc::ErrorCtor(kind))) => kind.matches(&info.name),
        _ => false,
    }))
}

fn has_property(vm: &VM, key: &Val, target: &Val) -> Result<Val, Val> {
    let key = key.to_property_key();
    match target {
        Val::Obj(map) => Ok(Val::Bool(map.borrow().contains_key(&key))),
        Val::List(items) => Ok(Val::Bool(
            key == "length"
                || super::properties::array_index(&key).is_some_and(|i| i < items.borrow().len()),
        )),
        other => Err(vm.error_value(
            errors::TYPE_ERROR,
            format!(
                "Cannot use 'in' operator to search for '{}' in {}",
                key,
                other.to_js_string()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_concatenates_strings() {
        assert_eq!(add(&Val::str("a"), &Val::Num(1.0)), Some(Val::str("a1")));
        assert_eq!(add(&Val::Num(1.0), &Val::Num(2.0)), Some(Val::Num(3.0)));
        assert_eq!(
            add(&Val::list(vec![Val::Num(1.0), Val::Num(2.0)]), &Val::str("!")),
            Some(Val::str("1,2!"))
        );
    }

    #[test]
    fn test_pow_edge_cases() {
        assert_eq!(pow(2.0, 10.0), 1024.0);
        assert!(pow(1.0, f64::INFINITY).is_nan());
        assert!(pow(2.0, f64::NAN).is_nan());
        assert_eq!(pow(f64::NAN, 0.0), 1.0);
    }

    #[test]
    fn test_compare_strings_and_nan() {
        assert_eq!(compare(&Val::str("a"), &Val::str("b")), Some(Ordering::Less));
        assert_eq!(compare(&Val::Num(f64::NAN), &Val::Num(1.0)), None);
        assert_eq!(compare(&Val::str("10"), &Val::Num(9.0)), Some(Ordering::Greater));
    }
}
