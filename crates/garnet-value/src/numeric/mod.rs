//! Numeric promotion
//!
//! Integer arithmetic first runs in `i64` with overflow checks
//! ([`fixnum::exact`]). When a check trips, the same operation is redone on
//! `BigInt` and the result is demoted back to a fixnum if it fits. Mixed
//! Integer/Float operations widen the integer to a float, except comparisons,
//! which stay exact.
//!
//! [`Arithmetic`] is the helper object passed by reference to every operation
//! that needs promotion; it owns the demotion policy and counters.

pub mod bignum;
pub mod fixnum;
pub mod float;

use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::error::{CoreError, CoreResult};
use crate::host::Host;
use crate::value::Value;

/// Binary numeric operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/` (floor)
    Div,
    /// `%` (floor)
    Mod,
    /// `**`
    Pow,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `<=>`
    Cmp,
}

impl BinaryOp {
    /// Every operator, in declaration order
    pub const ALL: [BinaryOp; 17] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Mod,
        BinaryOp::Pow,
        BinaryOp::BitAnd,
        BinaryOp::BitOr,
        BinaryOp::BitXor,
        BinaryOp::Shl,
        BinaryOp::Shr,
        BinaryOp::Lt,
        BinaryOp::Le,
        BinaryOp::Gt,
        BinaryOp::Ge,
        BinaryOp::Eq,
        BinaryOp::Cmp,
    ];

    /// Ruby method name
    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Cmp => "<=>",
        }
    }

    /// Relational operators, `==` and `<=>`
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::Eq
                | BinaryOp::Cmp
        )
    }

    /// Operators only defined between integers
    pub const fn is_integer_only(self) -> bool {
        matches!(
            self,
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary numeric operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-@`
    Neg,
    /// `abs`
    Abs,
    /// `~`
    BitNot,
    /// `bit_length`
    BitLength,
    /// `to_f`
    ToF,
    /// `zero?`
    IsZero,
}

/// Promotion and demotion counters
#[derive(Debug, Default)]
pub struct PromotionStats {
    promotions: Cell<u64>,
    demotions: Cell<u64>,
}

impl PromotionStats {
    /// Fixnum operations that overflowed into bignum arithmetic
    pub fn promotions(&self) -> u64 {
        self.promotions.get()
    }

    /// Bignum results that were narrowed back to fixnums
    pub fn demotions(&self) -> u64 {
        self.demotions.get()
    }

    /// Zero both counters
    pub fn reset(&self) {
        self.promotions.set(0);
        self.demotions.set(0);
    }

    fn record_promotion(&self) {
        self.promotions.set(self.promotions.get() + 1);
    }

    fn record_demotion(&self) {
        self.demotions.set(self.demotions.get() + 1);
    }
}

/// Narrow a bignum to a fixnum when it fits
pub fn fixnum_or_bignum(b: BigInt) -> Value {
    match b.to_i64() {
        Some(i) => Value::int(i),
        None => Value::bignum(b),
    }
}

/// Numeric `<=>` between two numeric values, `None` if either is not numeric
/// or NaN is involved
pub fn numeric_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::SmallInt(x), Value::SmallInt(y)) => Some(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::SmallInt(x), Value::Float(y)) => float::cmp_fixnum_float(*x, *y),
        (Value::Float(x), Value::SmallInt(y)) => {
            float::cmp_fixnum_float(*y, *x).map(Ordering::reverse)
        }
        (Value::BigInt(x), Value::Float(y)) => float::cmp_bignum_float(x, *y),
        (Value::Float(x), Value::BigInt(y)) => {
            float::cmp_bignum_float(y, *x).map(Ordering::reverse)
        }
        _ => {
            let x = a.to_bigint()?;
            let y = b.to_bigint()?;
            Some(x.cmp(&y))
        }
    }
}

/// Promotion-aware arithmetic
///
/// Holds the demotion policy and per-runtime counters. `Cell` counters keep
/// the hot path free of atomics; the whole core runs under one global lock.
#[derive(Debug)]
pub struct Arithmetic {
    demote: bool,
    stats: PromotionStats,
}

impl Default for Arithmetic {
    fn default() -> Self {
        Self::new()
    }
}

impl Arithmetic {
    /// Arithmetic that demotes bignum results eagerly
    pub fn new() -> Self {
        Self::with_demotion(true)
    }

    /// Arithmetic with an explicit demotion policy
    pub fn with_demotion(demote: bool) -> Self {
        Self {
            demote,
            stats: PromotionStats::default(),
        }
    }

    /// Whether bignum results that fit are narrowed
    pub fn demotes(&self) -> bool {
        self.demote
    }

    /// Promotion counters
    pub fn stats(&self) -> &PromotionStats {
        &self.stats
    }

    /// Wrap a bignum result, demoting it when the policy says so
    pub fn integer(&self, b: BigInt) -> Value {
        if self.demote {
            if let Some(i) = b.to_i64() {
                self.stats.record_demotion();
                return Value::int(i);
            }
        }
        Value::bignum(b)
    }

    /// Apply the demotion policy to an operation result
    pub fn settle(&self, v: Value) -> Value {
        match v {
            Value::BigInt(b) if self.demote => match b.to_i64() {
                Some(i) => {
                    self.stats.record_demotion();
                    Value::int(i)
                }
                None => Value::BigInt(b),
            },
            other => other,
        }
    }

    /// Fixnum operator with transparent promotion on overflow
    pub fn fixnum_binary(&self, op: BinaryOp, a: i64, b: i64) -> CoreResult<Value> {
        match fixnum::exact(op, a, b) {
            Some(result) => result,
            None => {
                self.stats.record_promotion();
                tracing::trace!(op = %op, a, b, "fixnum overflow, promoting");
                self.bignum_binary(op, &BigInt::from(a), &BigInt::from(b))
            }
        }
    }

    /// Integer operator in arbitrary precision
    pub fn bignum_binary(&self, op: BinaryOp, a: &BigInt, b: &BigInt) -> CoreResult<Value> {
        bignum::binary(op, a, b).map(|v| self.settle(v))
    }

    /// Operator with at least one Float operand
    fn float_binary(&self, op: BinaryOp, lhs: &Value, rhs: &Value) -> CoreResult<Value> {
        if op.is_comparison() {
            return float::compare_result(op, numeric_cmp(lhs, rhs));
        }
        if op.is_integer_only() {
            return match (op, lhs, rhs) {
                (BinaryOp::Shl | BinaryOp::Shr, l, Value::Float(count)) if l.is_integer() => {
                    let count = float::to_integer(*count)?;
                    self.integer_binary(op, l, &count)
                }
                _ => Err(CoreError::WrongArgumentType {
                    found: "Float",
                    expected: "Integer",
                }),
            };
        }
        let (Some(a), Some(b)) = (lhs.to_f64(), rhs.to_f64()) else {
            return Err(CoreError::Unsupported("float operand without float value"));
        };
        float::arith(op, a, b)
    }

    fn integer_binary(&self, op: BinaryOp, lhs: &Value, rhs: &Value) -> CoreResult<Value> {
        match (lhs, rhs) {
            (Value::SmallInt(a), Value::SmallInt(b)) => self.fixnum_binary(op, *a, *b),
            _ => match (lhs.to_bigint(), rhs.to_bigint()) {
                (Some(a), Some(b)) => self.bignum_binary(op, &a, &b),
                _ => Err(CoreError::Unsupported("integer operator on non-integers")),
            },
        }
    }

    /// Generic operator dispatch over every operand kind
    ///
    /// This is the representation-agnostic path: it is always correct, and
    /// specialized routines must agree with it.
    pub fn binary(
        &self,
        host: &mut dyn Host,
        op: BinaryOp,
        lhs: &Value,
        rhs: &Value,
    ) -> CoreResult<Value> {
        if lhs.is_integer() && rhs.is_integer() {
            return self.integer_binary(op, lhs, rhs);
        }
        if lhs.is_numeric() && rhs.is_numeric() {
            return self.float_binary(op, lhs, rhs);
        }
        match op {
            BinaryOp::Eq => Ok(Value::bool(host.equal(lhs, rhs)?)),
            BinaryOp::Cmp if lhs.is_numeric() => Ok(Value::Nil),
            _ => host.coerce_binary(op, lhs, rhs),
        }
    }

    /// `divmod`: floor quotient and modulo
    pub fn divmod(&self, lhs: &Value, rhs: &Value) -> CoreResult<(Value, Value)> {
        match (lhs, rhs) {
            (Value::SmallInt(a), Value::SmallInt(b)) => match fixnum::divmod(*a, *b) {
                Some(r) => r.map(|(q, m)| (Value::int(q), Value::int(m))),
                None => {
                    self.stats.record_promotion();
                    self.bignum_divmod(&BigInt::from(*a), &BigInt::from(*b))
                }
            },
            (l, r) if l.is_integer() && r.is_integer() => match (l.to_bigint(), r.to_bigint()) {
                (Some(a), Some(b)) => self.bignum_divmod(&a, &b),
                _ => Err(CoreError::Unsupported("integer divmod on non-integers")),
            },
            (l, r) if l.is_numeric() && r.is_numeric() => {
                let (Some(a), Some(b)) = (l.to_f64(), r.to_f64()) else {
                    return Err(CoreError::Unsupported("float divmod without float value"));
                };
                let (q, m) = float::divmod(a, b)?;
                Ok((self.settle(float::to_integer(q)?), Value::float(m)))
            }
            (l, r) => Err(CoreError::CoercionFailed {
                from: r.type_name(),
                to: l.type_name(),
            }),
        }
    }

    fn bignum_divmod(&self, a: &BigInt, b: &BigInt) -> CoreResult<(Value, Value)> {
        let (q, m) = bignum::divmod(a, b)?;
        Ok((self.integer(q), self.integer(m)))
    }

    /// Unary operations
    pub fn unary(&self, op: UnaryOp, v: &Value) -> CoreResult<Value> {
        match (op, v) {
            (UnaryOp::Neg, Value::SmallInt(i)) => Ok(match i.checked_neg() {
                Some(n) => Value::int(n),
                None => self.promoted(-BigInt::from(*i)),
            }),
            (UnaryOp::Neg, Value::BigInt(b)) => Ok(self.integer(-BigInt::clone(b))),
            (UnaryOp::Neg, Value::Float(f)) => Ok(Value::float(-f)),

            (UnaryOp::Abs, Value::SmallInt(i)) => Ok(match i.checked_abs() {
                Some(n) => Value::int(n),
                None => self.promoted(BigInt::from(*i).magnitude().clone().into()),
            }),
            (UnaryOp::Abs, Value::BigInt(b)) => {
                Ok(self.integer(BigInt::from(b.magnitude().clone())))
            }
            (UnaryOp::Abs, Value::Float(f)) => Ok(Value::float(f.abs())),

            (UnaryOp::BitNot, Value::SmallInt(i)) => Ok(Value::int(!i)),
            (UnaryOp::BitNot, Value::BigInt(b)) => Ok(self.integer(bignum::bit_not(b))),

            (UnaryOp::BitLength, Value::SmallInt(i)) => Ok(Value::int(fixnum::bit_length(*i))),
            (UnaryOp::BitLength, Value::BigInt(b)) => {
                Ok(self.integer(BigInt::from(bignum::bit_length(b))))
            }

            (UnaryOp::ToF, Value::SmallInt(i)) => Ok(Value::float(*i as f64)),
            (UnaryOp::ToF, Value::BigInt(b)) => Ok(Value::float(float::bignum_to_f64(b))),
            (UnaryOp::ToF, Value::Float(f)) => Ok(Value::float(*f)),

            (UnaryOp::IsZero, Value::SmallInt(i)) => Ok(Value::bool(*i == 0)),
            (UnaryOp::IsZero, Value::BigInt(b)) => Ok(Value::bool(b.is_zero())),
            (UnaryOp::IsZero, Value::Float(f)) => Ok(Value::bool(*f == 0.0)),

            (_, other) => Err(CoreError::WrongArgumentType {
                found: other.type_name(),
                expected: "Integer",
            }),
        }
    }

    fn promoted(&self, b: BigInt) -> Value {
        self.stats.record_promotion();
        Value::bignum(b)
    }
}
