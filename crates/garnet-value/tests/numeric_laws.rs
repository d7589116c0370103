//! Numeric promotion properties
//!
//! Tests cover:
//! - Exactness of fixnum arithmetic with bignum promotion on overflow
//! - Demotion of bignum results back to fixnums
//! - Floor division and modulo laws for fixnums and bignums
//! - Negative shift counts

use garnet_value::numeric::{fixnum, fixnum_or_bignum};
use garnet_value::{Arithmetic, BigInt, BinaryOp, DefaultHost, Value};
use proptest::prelude::*;

fn as_big(v: &Value) -> BigInt {
    v.to_bigint().expect("integer result")
}

#[test]
fn max_plus_one_is_bignum() {
    let arith = Arithmetic::new();
    let r = arith
        .binary(&mut DefaultHost, BinaryOp::Add, &Value::int(i64::MAX), &Value::int(1))
        .unwrap();
    assert!(r.as_bignum().is_some());
    assert_eq!(as_big(&r), BigInt::from(i64::MAX) + BigInt::from(1));
}

#[test]
fn min_shift_and_negation_promote() {
    let arith = Arithmetic::new();
    let r = arith
        .binary(&mut DefaultHost, BinaryOp::Shl, &Value::int(i64::MIN), &Value::int(1))
        .unwrap();
    assert_eq!(as_big(&r), BigInt::from(i64::MIN) * 2);
    let r = arith
        .binary(&mut DefaultHost, BinaryOp::Mul, &Value::int(i64::MIN), &Value::int(-1))
        .unwrap();
    assert_eq!(as_big(&r), -BigInt::from(i64::MIN));
}

proptest! {
    #[test]
    fn add_is_exact(a in any::<i64>(), b in any::<i64>()) {
        let arith = Arithmetic::new();
        let r = arith.fixnum_binary(BinaryOp::Add, a, b).unwrap();
        let exact = BigInt::from(a) + BigInt::from(b);
        prop_assert_eq!(as_big(&r), exact.clone());
        let fits = i64::try_from(exact).is_ok();
        prop_assert_eq!(r.as_fixnum().is_some(), fits);
    }
}

proptest! {
    #[test]
    fn mul_and_sub_are_exact(a in any::<i64>(), b in any::<i64>()) {
        let arith = Arithmetic::new();
        let m = arith.fixnum_binary(BinaryOp::Mul, a, b).unwrap();
        prop_assert_eq!(as_big(&m), BigInt::from(a) * BigInt::from(b));
        let s = arith.fixnum_binary(BinaryOp::Sub, a, b).unwrap();
        prop_assert_eq!(as_big(&s), BigInt::from(a) - BigInt::from(b));
    }
}

proptest! {
    #[test]
    fn bignum_add_demotes_to_fixnum_result(a in any::<i32>(), b in any::<i32>()) {
        let arith = Arithmetic::new();
        let via_big = arith
            .bignum_binary(BinaryOp::Add, &BigInt::from(a), &BigInt::from(b))
            .unwrap();
        let direct = arith.fixnum_binary(BinaryOp::Add, a as i64, b as i64).unwrap();
        prop_assert_eq!(via_big, direct);
    }
}

proptest! {
    #[test]
    fn fixnum_floor_laws(a in any::<i64>(), b in any::<i64>().prop_filter("non-zero", |b| *b != 0)) {
        let arith = Arithmetic::new();
        let q = arith.fixnum_binary(BinaryOp::Div, a, b).unwrap();
        let m = fixnum::modulo(a, b).unwrap();
        prop_assert_eq!(BigInt::from(b) * as_big(&q) + BigInt::from(m), BigInt::from(a));
        prop_assert!(m.unsigned_abs() < b.unsigned_abs());
        prop_assert!(m == 0 || (m < 0) == (b < 0));
    }
}

proptest! {
    #[test]
    fn bignum_floor_laws(a in any::<i128>(), b in any::<i128>().prop_filter("non-zero", |b| *b != 0)) {
        let arith = Arithmetic::new();
        let (ba, bb) = (BigInt::from(a), BigInt::from(b));
        let q = as_big(&arith.bignum_binary(BinaryOp::Div, &ba, &bb).unwrap());
        let m = as_big(&arith.bignum_binary(BinaryOp::Mod, &ba, &bb).unwrap());
        prop_assert_eq!(&bb * &q + &m, ba);
        prop_assert!(m.magnitude() < bb.magnitude());
        prop_assert!(m == BigInt::from(0) || m.sign() == bb.sign());
    }
}

proptest! {
    #[test]
    fn negative_shift_reverses(a in any::<i32>(), n in 0i64..40) {
        let arith = Arithmetic::new();
        let left = arith.fixnum_binary(BinaryOp::Shl, a as i64, -n).unwrap();
        let right = arith.fixnum_binary(BinaryOp::Shr, a as i64, n).unwrap();
        prop_assert_eq!(left, right);
    }
}

proptest! {
    #[test]
    fn fixnum_or_bignum_round_trips(a in any::<i64>()) {
        prop_assert_eq!(fixnum_or_bignum(BigInt::from(a)), Value::int(a));
    }
}
