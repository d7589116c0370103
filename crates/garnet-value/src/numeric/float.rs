//! Float arithmetic and Integer/Float mixing

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};

use super::fixnum::ordering_value;
use super::BinaryOp;
use crate::error::{CoreError, CoreResult};
use crate::value::Value;

/// Integers below this magnitude convert to f64 exactly
const EXACT_F64_INT: i64 = 1 << 53;

/// Arithmetic on two floats (integer operands already widened)
pub fn arith(op: BinaryOp, a: f64, b: f64) -> CoreResult<Value> {
    let r = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => modulo(a, b),
        BinaryOp::Pow => a.powf(b),
        _ => return Err(CoreError::Unsupported("non-arithmetic operator on floats")),
    };
    Ok(Value::float(r))
}

/// Float modulo with the sign of the divisor; NaN when `b` is zero
pub fn modulo(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        return f64::NAN;
    }
    if b.is_infinite() && a.is_finite() {
        if a == 0.0 || (a < 0.0) == (b < 0.0) {
            return a;
        }
        return b;
    }
    let mut m = a % b;
    if m != 0.0 && (b < 0.0) != (m < 0.0) {
        m += b;
    }
    m
}

/// Float `divmod`; the quotient is already floored but still a float
pub fn divmod(a: f64, b: f64) -> CoreResult<(f64, f64)> {
    if b == 0.0 {
        return Err(CoreError::DivideByZero);
    }
    let mut m = a % b;
    let mut d = if a.is_infinite() && !b.is_infinite() {
        a
    } else {
        ((a - m) / b).round()
    };
    if b * m < 0.0 {
        m += b;
        d -= 1.0;
    }
    Ok((d, m))
}

/// Truncate a float to an Integer value
///
/// NaN and the infinities have no Integer counterpart.
pub fn to_integer(f: f64) -> CoreResult<Value> {
    if f.is_nan() {
        return Err(CoreError::FloatDomain("NaN".to_string()));
    }
    if f.is_infinite() {
        let name = if f < 0.0 { "-Infinity" } else { "Infinity" };
        return Err(CoreError::FloatDomain(name.to_string()));
    }
    let t = f.trunc();
    if t >= i64::MIN as f64 && t < i64::MAX as f64 {
        return Ok(Value::int(t as i64));
    }
    BigInt::from_f64(t)
        .map(Value::bignum)
        .ok_or_else(|| CoreError::FloatDomain(t.to_string()))
}

/// Exact comparison of a fixnum with a float
pub fn cmp_fixnum_float(i: i64, f: f64) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    if (-EXACT_F64_INT..=EXACT_F64_INT).contains(&i) {
        return (i as f64).partial_cmp(&f);
    }
    cmp_bignum_float(&BigInt::from(i), f)
}

/// Exact comparison of a bignum with a float
///
/// Goes through the float's integer part instead of rounding the bignum.
pub fn cmp_bignum_float(b: &BigInt, f: f64) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    if f.is_infinite() {
        return Some(if f > 0.0 {
            Ordering::Less
        } else {
            Ordering::Greater
        });
    }
    let whole = BigInt::from_f64(f.trunc())?;
    match b.cmp(&whole) {
        Ordering::Equal => {
            let frac = f.fract();
            Some(if frac > 0.0 {
                Ordering::Less
            } else if frac < 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            })
        }
        ord => Some(ord),
    }
}

/// Comparison operators over an already computed ordering
///
/// A `None` ordering (NaN involved) makes every relational test false and
/// `<=>` nil.
pub fn compare_result(op: BinaryOp, ord: Option<Ordering>) -> CoreResult<Value> {
    let v = match op {
        BinaryOp::Lt => Value::bool(ord == Some(Ordering::Less)),
        BinaryOp::Le => Value::bool(matches!(ord, Some(Ordering::Less | Ordering::Equal))),
        BinaryOp::Gt => Value::bool(ord == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::bool(matches!(ord, Some(Ordering::Greater | Ordering::Equal))),
        BinaryOp::Eq => Value::bool(ord == Some(Ordering::Equal)),
        BinaryOp::Cmp => ord.map(ordering_value).unwrap_or(Value::Nil),
        _ => return Err(CoreError::Unsupported("non-comparison operator")),
    };
    Ok(v)
}

/// Float view of a bignum, saturating to infinity
pub fn bignum_to_f64(b: &BigInt) -> f64 {
    b.to_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_modulo() {
        assert_eq!(modulo(7.5, 2.0), 1.5);
        assert_eq!(modulo(-7.5, 2.0), 0.5);
        assert_eq!(modulo(7.5, -2.0), -0.5);
        assert!(modulo(1.0, 0.0).is_nan());
        assert_eq!(modulo(5.0, f64::INFINITY), 5.0);
        assert_eq!(modulo(-5.0, f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn test_float_divmod() {
        assert_eq!(divmod(7.0, 2.0), Ok((3.0, 1.0)));
        assert_eq!(divmod(-7.0, 2.0), Ok((-4.0, 1.0)));
        assert_eq!(divmod(1.0, 0.0), Err(CoreError::DivideByZero));
    }

    #[test]
    fn test_to_integer() {
        assert_eq!(to_integer(3.9), Ok(Value::int(3)));
        assert_eq!(to_integer(-3.9), Ok(Value::int(-3)));
        assert!(to_integer(1e30).unwrap().as_bignum().is_some());
        assert_eq!(
            to_integer(f64::NAN),
            Err(CoreError::FloatDomain("NaN".to_string()))
        );
        assert!(to_integer(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_mixed_comparison_is_exact() {
        let just_above = (1i64 << 53) + 1;
        assert_eq!(
            cmp_fixnum_float(just_above, (1i64 << 53) as f64),
            Some(Ordering::Greater)
        );
        assert_eq!(cmp_fixnum_float(1, 1.5), Some(Ordering::Less));
        assert_eq!(cmp_fixnum_float(2, 1.5), Some(Ordering::Greater));
        assert_eq!(cmp_fixnum_float(1, f64::NAN), None);
        assert_eq!(
            cmp_bignum_float(&(BigInt::from(1) << 70usize), f64::INFINITY),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_nan_comparisons() {
        assert_eq!(compare_result(BinaryOp::Lt, None), Ok(Value::bool(false)));
        assert_eq!(compare_result(BinaryOp::Ge, None), Ok(Value::bool(false)));
        assert_eq!(compare_result(BinaryOp::Cmp, None), Ok(Value::Nil));
        assert_eq!(
            compare_result(BinaryOp::Cmp, Some(Ordering::Less)),
            Ok(Value::int(-1))
        );
    }
}
