//! Arbitrary-precision integer operations
//!
//! Integer results come back as raw `Value::BigInt`; [`super::Arithmetic`]
//! decides whether to demote them.

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::fixnum::ordering_value;
use super::BinaryOp;
use crate::error::{CoreError, CoreResult};
use crate::value::Value;

/// Results wider than this many bits are reported as infinite by `**`
pub const POW_BIT_LIMIT: u64 = 32 * 1024 * 1024;

/// Left shifts wider than this are rejected rather than attempted
pub const SHIFT_LIMIT: u64 = 1 << 31;

/// Apply a binary operator to two integers in arbitrary precision
pub fn binary(op: BinaryOp, a: &BigInt, b: &BigInt) -> CoreResult<Value> {
    Ok(match op {
        BinaryOp::Add => Value::bignum(a + b),
        BinaryOp::Sub => Value::bignum(a - b),
        BinaryOp::Mul => Value::bignum(a * b),
        BinaryOp::Div => Value::bignum(div(a, b)?),
        BinaryOp::Mod => Value::bignum(modulo(a, b)?),
        BinaryOp::Pow => return pow(a, b),
        BinaryOp::BitAnd => Value::bignum(a & b),
        BinaryOp::BitOr => Value::bignum(a | b),
        BinaryOp::BitXor => Value::bignum(a ^ b),
        BinaryOp::Shl => Value::bignum(shift_left(a, b)?),
        BinaryOp::Shr => Value::bignum(shift_right(a, b)?),
        BinaryOp::Lt => Value::bool(a < b),
        BinaryOp::Le => Value::bool(a <= b),
        BinaryOp::Gt => Value::bool(a > b),
        BinaryOp::Ge => Value::bool(a >= b),
        BinaryOp::Eq => Value::bool(a == b),
        BinaryOp::Cmp => ordering_value(a.cmp(b)),
    })
}

/// Floor division
pub fn div(a: &BigInt, b: &BigInt) -> CoreResult<BigInt> {
    if b.is_zero() {
        return Err(CoreError::DivideByZero);
    }
    Ok(a.div_floor(b))
}

/// Floor modulo
pub fn modulo(a: &BigInt, b: &BigInt) -> CoreResult<BigInt> {
    if b.is_zero() {
        return Err(CoreError::DivideByZero);
    }
    Ok(a.mod_floor(b))
}

/// Floor quotient and modulo together
pub fn divmod(a: &BigInt, b: &BigInt) -> CoreResult<(BigInt, BigInt)> {
    if b.is_zero() {
        return Err(CoreError::DivideByZero);
    }
    Ok(a.div_mod_floor(b))
}

/// `a ** b`
///
/// Negative exponents produce a Float. A result that would need more than
/// [`POW_BIT_LIMIT`] bits is reported as signed infinity.
pub fn pow(a: &BigInt, b: &BigInt) -> CoreResult<Value> {
    if b.is_negative() {
        if a.is_zero() {
            return Err(CoreError::DivideByZero);
        }
        let base = a.to_f64().unwrap_or(f64::NAN);
        let exponent = b.to_f64().unwrap_or(f64::NEG_INFINITY);
        return Ok(Value::float(base.powf(exponent)));
    }
    if b.is_zero() {
        return Ok(Value::int(1));
    }
    if a.is_zero() || a.is_one() {
        return Ok(Value::bignum(a.clone()));
    }
    let odd_exponent = b.is_odd();
    if *a == -BigInt::one() {
        return Ok(Value::int(if odd_exponent { -1 } else { 1 }));
    }

    let exponent = b.to_u64().filter(|e| *e <= u64::from(u32::MAX));
    let too_big = match exponent {
        Some(e) => a.bits().saturating_mul(e) > POW_BIT_LIMIT,
        None => true,
    };
    match exponent {
        Some(e) if !too_big => Ok(Value::bignum(a.pow(e as u32))),
        _ => {
            tracing::debug!(bits = a.bits(), "integer power too big, returning infinity");
            let negative = a.sign() == Sign::Minus && odd_exponent;
            Ok(Value::float(if negative {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }))
        }
    }
}

/// `a << count`; a negative count shifts right
pub fn shift_left(a: &BigInt, count: &BigInt) -> CoreResult<BigInt> {
    if count.is_negative() {
        return Ok(shift_right_by(a, count.magnitude().to_u64()));
    }
    if a.is_zero() {
        return Ok(BigInt::zero());
    }
    match count.to_u64() {
        Some(n) if n <= SHIFT_LIMIT => Ok(a << (n as usize)),
        _ => Err(CoreError::ShiftWidthTooBig),
    }
}

/// `a >> count`; a negative count shifts left
pub fn shift_right(a: &BigInt, count: &BigInt) -> CoreResult<BigInt> {
    if count.is_negative() {
        let left = -count;
        return shift_left(a, &left);
    }
    Ok(shift_right_by(a, count.to_u64()))
}

/// Arithmetic right shift; `None` means a count too large for u64
fn shift_right_by(a: &BigInt, count: Option<u64>) -> BigInt {
    match count {
        Some(n) if n < a.bits() + 1 => a >> (n as usize),
        _ => {
            if a.is_negative() {
                -BigInt::one()
            } else {
                BigInt::zero()
            }
        }
    }
}

/// `~a`
pub fn bit_not(a: &BigInt) -> BigInt {
    -a - BigInt::one()
}

/// Ruby `bit_length`: bits needed excluding the sign bit
pub fn bit_length(a: &BigInt) -> u64 {
    if a.is_negative() {
        bit_not(a).bits()
    } else {
        a.bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(i: i64) -> BigInt {
        BigInt::from(i)
    }

    #[test]
    fn test_bignum_floor_division() {
        assert_eq!(div(&big(-7), &big(2)), Ok(big(-4)));
        assert_eq!(modulo(&big(-7), &big(2)), Ok(big(1)));
        assert_eq!(modulo(&big(7), &big(-2)), Ok(big(-1)));
        assert_eq!(div(&big(1), &big(0)), Err(CoreError::DivideByZero));
    }

    #[test]
    fn test_bignum_pow() {
        let r = pow(&big(2), &big(100)).unwrap();
        assert_eq!(r.as_bignum(), Some(&(BigInt::one() << 100usize)));
        assert_eq!(pow(&big(-1), &big(1_000_000_001)).unwrap(), Value::int(-1));
        assert_eq!(pow(&big(5), &big(0)).unwrap(), Value::int(1));
        assert_eq!(
            pow(&big(2), &(BigInt::one() << 40usize)).unwrap(),
            Value::float(f64::INFINITY)
        );
        assert_eq!(
            pow(&big(-3), &big(u32::MAX as i64)).unwrap(),
            Value::float(f64::NEG_INFINITY)
        );
        assert_eq!(pow(&big(4), &big(-1)).unwrap(), Value::float(0.25));
    }

    #[test]
    fn test_bignum_shifts() {
        assert_eq!(shift_left(&big(1), &big(70)), Ok(BigInt::one() << 70usize));
        assert_eq!(shift_left(&big(1), &big(-1)), Ok(big(0)));
        assert_eq!(shift_right(&big(-5), &big(1)), Ok(big(-3)));
        assert_eq!(shift_right(&big(-5), &big(1000)), Ok(big(-1)));
        assert_eq!(shift_right(&big(3), &big(-2)), Ok(big(12)));
        assert_eq!(
            shift_left(&big(1), &(BigInt::one() << 40usize)),
            Err(CoreError::ShiftWidthTooBig)
        );
        assert_eq!(shift_left(&big(0), &(BigInt::one() << 40usize)), Ok(big(0)));
    }

    #[test]
    fn test_bignum_bitwise() {
        assert_eq!(bit_not(&big(5)), big(-6));
        assert_eq!(bit_length(&big(-256)), 8);
        let r = binary(BinaryOp::BitAnd, &big(-1), &(BigInt::one() << 80usize)).unwrap();
        assert_eq!(r.as_bignum(), Some(&(BigInt::one() << 80usize)));
    }
}
