//! Fixed-width integer fast paths
//!
//! Every function here either produces the exact result in `i64` or returns
//! `None` to say the result does not fit, in which case the caller redoes the
//! operation in [`super::bignum`]. Nothing here wraps or panics.

use std::cmp::Ordering;

use num_integer::Integer;

use super::BinaryOp;
use crate::error::{CoreError, CoreResult};
use crate::value::Value;

/// Exact fixnum operation, `None` on overflow
pub fn exact(op: BinaryOp, a: i64, b: i64) -> Option<CoreResult<Value>> {
    match op {
        BinaryOp::Add => a.checked_add(b).map(ok_int),
        BinaryOp::Sub => a.checked_sub(b).map(ok_int),
        BinaryOp::Mul => a.checked_mul(b).map(ok_int),
        BinaryOp::Div => div(a, b).map(|r| r.map(Value::int)),
        BinaryOp::Mod => Some(modulo(a, b).map(Value::int)),
        BinaryOp::Pow => pow(a, b),
        BinaryOp::BitAnd => Some(Ok(Value::int(a & b))),
        BinaryOp::BitOr => Some(Ok(Value::int(a | b))),
        BinaryOp::BitXor => Some(Ok(Value::int(a ^ b))),
        BinaryOp::Shl => shift_left(a, b).map(ok_int),
        BinaryOp::Shr => shift_right(a, b).map(ok_int),
        BinaryOp::Lt => Some(Ok(Value::bool(a < b))),
        BinaryOp::Le => Some(Ok(Value::bool(a <= b))),
        BinaryOp::Gt => Some(Ok(Value::bool(a > b))),
        BinaryOp::Ge => Some(Ok(Value::bool(a >= b))),
        BinaryOp::Eq => Some(Ok(Value::bool(a == b))),
        BinaryOp::Cmp => Some(Ok(ordering_value(a.cmp(&b)))),
    }
}

#[inline]
fn ok_int(i: i64) -> CoreResult<Value> {
    Ok(Value::int(i))
}

/// `-1`, `0` or `1` for an ordering
pub fn ordering_value(ord: Ordering) -> Value {
    Value::int(ord as i64)
}

/// Floor division; `None` only for `i64::MIN / -1`
pub fn div(a: i64, b: i64) -> Option<CoreResult<i64>> {
    if b == 0 {
        return Some(Err(CoreError::DivideByZero));
    }
    if a == i64::MIN && b == -1 {
        return None;
    }
    Some(Ok(a.div_floor(&b)))
}

/// Floor modulo: the result takes the sign of the divisor
pub fn modulo(a: i64, b: i64) -> CoreResult<i64> {
    match b {
        0 => Err(CoreError::DivideByZero),
        // i64::MIN % -1 traps on most targets
        -1 => Ok(0),
        _ => Ok(a.mod_floor(&b)),
    }
}

/// Floor quotient and modulo together; `None` only for `i64::MIN / -1`
pub fn divmod(a: i64, b: i64) -> Option<CoreResult<(i64, i64)>> {
    if b == 0 {
        return Some(Err(CoreError::DivideByZero));
    }
    if a == i64::MIN && b == -1 {
        return None;
    }
    Some(Ok(a.div_mod_floor(&b)))
}

fn pow(a: i64, b: i64) -> Option<CoreResult<Value>> {
    if b < 0 {
        if a == 0 {
            return Some(Err(CoreError::DivideByZero));
        }
        return Some(Ok(Value::float((a as f64).powf(b as f64))));
    }
    let exponent = u32::try_from(b).ok()?;
    a.checked_pow(exponent).map(ok_int)
}

/// `a << count`; a negative count shifts right
pub fn shift_left(a: i64, count: i64) -> Option<i64> {
    if count < 0 {
        return Some(shift_right_unsigned_count(a, count.unsigned_abs()));
    }
    if a == 0 {
        return Some(0);
    }
    if count >= 64 {
        return None;
    }
    let shifted = a << count;
    if shifted >> count == a {
        Some(shifted)
    } else {
        None
    }
}

/// `a >> count`; a negative count shifts left
pub fn shift_right(a: i64, count: i64) -> Option<i64> {
    if count < 0 {
        return match count.checked_neg() {
            Some(left) => shift_left(a, left),
            None => {
                if a == 0 {
                    Some(0)
                } else {
                    None
                }
            }
        };
    }
    Some(shift_right_unsigned_count(a, count as u64))
}

fn shift_right_unsigned_count(a: i64, count: u64) -> i64 {
    if count >= 64 {
        if a < 0 {
            -1
        } else {
            0
        }
    } else {
        a >> count
    }
}

/// Ruby `bit_length`: bits needed excluding the sign bit
pub fn bit_length(a: i64) -> i64 {
    let magnitude = if a < 0 { !a } else { a };
    64 - i64::from(magnitude.leading_zeros())
}
