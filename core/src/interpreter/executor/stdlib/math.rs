//! Math functions and Number.prototype methods

use super::{num_arg, throw, value};
use crate::interpreter::executor::errors;
use crate::interpreter::executor::expressions::EvalResult;
use crate::interpreter::executor::operators;
use crate::interpreter::executor::types::values::number_to_string;
use crate::interpreter::executor::types::Val;
use crate::interpreter::executor::vm::VM;

/// Math.floor(x)
pub fn floor(args: &[Val]) -> EvalResult {
    value(Val::Num(num_arg(args, 0).floor()))
}

/// Math.ceil(x)
pub fn ceil(args: &[Val]) -> EvalResult {
    value(Val::Num(num_arg(args, 0).ceil()))
}

/// Math.round(x) - halves round towards +Infinity
pub fn round(args: &[Val]) -> EvalResult {
    let n = num_arg(args, 0);
    let rounded = if n.is_finite() { (n + 0.5).floor() } else { n };
    value(Val::Num(rounded))
}

/// Math.abs(x)
pub fn abs(args: &[Val]) -> EvalResult {
    value(Val::Num(num_arg(args, 0).abs()))
}

pub fn trunc(args: &[Val]) -> EvalResult {
    value(Val::Num(num_arg(args, 0).trunc()))
}

pub fn sign(args: &[Val]) -> EvalResult {
    let n = num_arg(args, 0);
    let s = if n.is_nan() || n == 0.0 { n } else { n.signum() };
    value(Val::Num(s))
}

pub fn sqrt(args: &[Val]) -> EvalResult {
    value(Val::Num(num_arg(args, 0).sqrt()))
}

pub fn pow(args: &[Val]) -> EvalResult {
    value(Val::Num(operators::pow(num_arg(args, 0), num_arg(args, 1))))
}

/// Math.min(...values) - `Infinity` without arguments, NaN if any is NaN
pub fn min(args: &[Val]) -> EvalResult {
    value(Val::Num(fold(args, f64::INFINITY, f64::min)))
}

/// Math.max(...values) - `-Infinity` without arguments, NaN if any is NaN
pub fn max(args: &[Val]) -> EvalResult {
    value(Val::Num(fold(args, f64::NEG_INFINITY, f64::max)))
}

fn fold(args: &[Val], init: f64, pick: fn(f64, f64) -> f64) -> f64 {
    let mut acc = init;
    for n in args.iter().map(Val::to_number) {
        if n.is_nan() {
            return f64::NAN;
        }
        acc = pick(acc, n);
    }
    acc
}

/* ===================== Number.prototype ===================== */

/// (n).toFixed(digits)
pub fn to_fixed(vm: &VM, this: &Val, args: &[Val]) -> EvalResult {
    let n = this.to_number();
    let digits = match args.first() {
        None | Some(Val::Undefined) => 0.0,
        Some(d) => d.to_number().trunc(),
    };
    if !(0.0..=100.0).contains(&digits) {
        return throw(
            vm,
            errors::RANGE_ERROR,
            "toFixed() digits argument must be between 0 and 100",
        );
    }
    if !n.is_finite() || n.abs() >= 1e21 {
        return value(Val::Str(number_to_string(n)));
    }
    value(Val::Str(format!("{:.*}", digits as usize, n)))
}

/// (n).toString(radix)
pub fn number_to_radix_string(vm: &VM, this: &Val, args: &[Val]) -> EvalResult {
    let n = this.to_number();
    let radix = match args.first() {
        None | Some(Val::Undefined) => 10.0,
        Some(r) => r.to_number().trunc(),
    };
    if !(2.0..=36.0).contains(&radix) {
        return throw(
            vm,
            errors::RANGE_ERROR,
            "toString() radix must be between 2 and 36",
        );
    }
    if radix == 10.0 || !n.is_finite() {
        return value(Val::Str(number_to_string(n)));
    }
    value(Val::Str(to_radix(n, radix as u32)))
}

/// Integer part in `radix`, then up to 20 fractional digits
fn to_radix(n: f64, radix: u32) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let negative = n < 0.0;
    let n = n.abs();

    let mut int_part = n.trunc();
    let mut int_digits = Vec::new();
    loop {
        let d = (int_part % radix as f64) as usize;
        int_digits.push(DIGITS[d]);
        int_part = (int_part / radix as f64).trunc();
        if int_part < 1.0 {
            break;
        }
    }
    int_digits.reverse();

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&String::from_utf8_lossy(&int_digits));

    let mut frac = n.fract();
    if frac > 0.0 {
        out.push('.');
        for _ in 0..20 {
            frac *= radix as f64;
            let d = frac.trunc() as usize;
            out.push(DIGITS[d] as char);
            frac = frac.fract();
            if frac == 0.0 {
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        let EvalResult::Value { v } = round(&[Val::Num(-2.5)]) else {
            unreachable!()
        };
        assert_eq!(v, Val::Num(-2.0));
    }

    #[test]
    fn test_min_max_edges() {
        let EvalResult::Value { v } = min(&[]) else {
            unreachable!()
        };
        assert_eq!(v, Val::Num(f64::INFINITY));

        let EvalResult::Value { v: Val::Num(n) } = max(&[Val::Num(1.0), Val::Str("x".into())])
        else {
            unreachable!()
        };
        assert!(n.is_nan());
    }

    #[test]
    fn test_to_radix() {
        assert_eq!(to_radix(255.0, 16), "ff");
        assert_eq!(to_radix(-5.0, 2), "-101");
        assert_eq!(to_radix(0.5, 2), "0.1");
    }
}
