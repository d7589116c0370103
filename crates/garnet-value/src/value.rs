//! Tagged dynamic values
//!
//! A `Value` is a closed sum over the representations the core distinguishes:
//!
//! ```text
//! Nil        nil
//! Bool       true / false
//! SmallInt   fixed-width i64 integer (Fixnum)
//! BigInt     arbitrary-precision integer (Bignum), shared and immutable
//! Float      IEEE-754 double
//! ObjectRef  opaque handle to a host-managed heap object
//! ```
//!
//! Ruby code never observes the SmallInt/BigInt split. Every integer result
//! that overflows i64 is a `BigInt`; results that fit back are demoted by the
//! numeric layer (see [`crate::numeric`]).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use rustc_hash::FxHasher;

/// Opaque handle to a heap object owned by the host runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u64);

/// Opaque logical-class token threaded through container constructors
///
/// The result of `Array#+` must be an instance of the receiver's class, so the
/// core carries this token around without ever interpreting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassHandle(pub u32);

impl ClassHandle {
    /// Token used when the host does not distinguish classes
    pub const UNSPECIFIED: ClassHandle = ClassHandle(0);
}

impl Default for ClassHandle {
    fn default() -> Self {
        Self::UNSPECIFIED
    }
}

/// Tagged dynamic value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `nil`
    Nil,
    /// `true` or `false`
    Bool(bool),
    /// Fixed-width integer
    SmallInt(i64),
    /// Arbitrary-precision integer
    BigInt(Arc<BigInt>),
    /// Double-precision float
    Float(f64),
    /// Reference to a host heap object
    ObjectRef(ObjectHandle),
}

/// Shape of a value, as seen by specialization guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ValueKind {
    /// `nil`
    Nil = 0,
    /// Boolean
    Bool = 1,
    /// Fixed-width integer
    SmallInt = 2,
    /// Arbitrary-precision integer
    BigInt = 3,
    /// Float
    Float = 4,
    /// Heap object
    ObjectRef = 5,
}

impl ValueKind {
    /// Short lowercase name used in logs and cache dumps
    pub const fn name(self) -> &'static str {
        match self {
            ValueKind::Nil => "nil",
            ValueKind::Bool => "bool",
            ValueKind::SmallInt => "fixnum",
            ValueKind::BigInt => "bignum",
            ValueKind::Float => "float",
            ValueKind::ObjectRef => "object",
        }
    }

    /// Whether values of this kind take part in the numeric tower
    pub const fn is_numeric(self) -> bool {
        matches!(self, ValueKind::SmallInt | ValueKind::BigInt | ValueKind::Float)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// Create `nil`
    #[inline]
    pub const fn nil() -> Self {
        Value::Nil
    }

    /// Create a boolean value
    #[inline]
    pub const fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    /// Create a fixed-width integer value
    #[inline]
    pub const fn int(i: i64) -> Self {
        Value::SmallInt(i)
    }

    /// Create a float value
    #[inline]
    pub const fn float(f: f64) -> Self {
        Value::Float(f)
    }

    /// Create an object reference
    #[inline]
    pub const fn object(handle: ObjectHandle) -> Self {
        Value::ObjectRef(handle)
    }

    /// Wrap a bignum as-is, without demoting it
    ///
    /// Most callers want [`crate::numeric::fixnum_or_bignum`] instead.
    pub fn bignum(b: BigInt) -> Self {
        Value::BigInt(Arc::new(b))
    }

    /// Get the shape of this value
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Bool(_) => ValueKind::Bool,
            Value::SmallInt(_) => ValueKind::SmallInt,
            Value::BigInt(_) => ValueKind::BigInt,
            Value::Float(_) => ValueKind::Float,
            Value::ObjectRef(_) => ValueKind::ObjectRef,
        }
    }

    /// Check if this value is `nil`
    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Check if this value is an Integer (either representation)
    #[inline]
    pub fn is_integer(&self) -> bool {
        matches!(self, Value::SmallInt(_) | Value::BigInt(_))
    }

    /// Check if this value is an Integer or a Float
    #[inline]
    pub fn is_numeric(&self) -> bool {
        self.kind().is_numeric()
    }

    /// Extract a fixed-width integer
    #[inline]
    pub fn as_fixnum(&self) -> Option<i64> {
        match self {
            Value::SmallInt(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract a float
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Borrow a bignum
    #[inline]
    pub fn as_bignum(&self) -> Option<&BigInt> {
        match self {
            Value::BigInt(b) => Some(&**b),
            _ => None,
        }
    }

    /// Extract a boolean
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract an object handle
    #[inline]
    pub fn as_object(&self) -> Option<ObjectHandle> {
        match self {
            Value::ObjectRef(h) => Some(*h),
            _ => None,
        }
    }

    /// Whether this is a fixnum small enough for a packed 32-bit slot
    #[inline]
    pub fn fits_i32(&self) -> bool {
        match self {
            Value::SmallInt(i) => i32::try_from(*i).is_ok(),
            _ => false,
        }
    }

    /// Any integer, widened to a bignum
    pub fn to_bigint(&self) -> Option<BigInt> {
        match self {
            Value::SmallInt(i) => Some(BigInt::from(*i)),
            Value::BigInt(b) => Some(BigInt::clone(b)),
            _ => None,
        }
    }

    /// Any numeric, converted to a float (bignums may lose precision)
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::SmallInt(i) => Some(*i as f64),
            Value::BigInt(b) => Some(b.to_f64().unwrap_or(f64::NAN)),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Ruby truthiness: only `nil` and `false` are falsy
    #[inline]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Ruby class name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "NilClass",
            Value::Bool(true) => "TrueClass",
            Value::Bool(false) => "FalseClass",
            Value::SmallInt(_) | Value::BigInt(_) => "Integer",
            Value::Float(_) => "Float",
            Value::ObjectRef(_) => "Object",
        }
    }

    /// Default `hash`, consistent with [`Value::default_eql`]
    ///
    /// Integers hash by mathematical value regardless of representation, so a
    /// non-demoted bignum that fits in i64 hashes like the fixnum.
    pub fn default_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        match self {
            Value::Nil => 0u8.hash(&mut hasher),
            Value::Bool(b) => {
                1u8.hash(&mut hasher);
                b.hash(&mut hasher);
            }
            Value::SmallInt(i) => {
                2u8.hash(&mut hasher);
                i.hash(&mut hasher);
            }
            Value::BigInt(b) => match b.to_i64() {
                Some(i) => {
                    2u8.hash(&mut hasher);
                    i.hash(&mut hasher);
                }
                None => {
                    3u8.hash(&mut hasher);
                    b.hash(&mut hasher);
                }
            },
            Value::Float(f) => {
                4u8.hash(&mut hasher);
                // 0.0 and -0.0 are eql?, so they must hash alike
                let normalized = if *f == 0.0 { 0.0f64 } else { *f };
                normalized.to_bits().hash(&mut hasher);
            }
            Value::ObjectRef(h) => {
                5u8.hash(&mut hasher);
                h.hash(&mut hasher);
            }
        }
        hasher.finish()
    }

    /// Default `eql?`: same class and same value, no numeric conversion
    pub fn default_eql(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::SmallInt(a), Value::SmallInt(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::SmallInt(a), Value::BigInt(b)) | (Value::BigInt(b), Value::SmallInt(a)) => {
                b.to_i64() == Some(*a)
            }
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::ObjectRef(a), Value::ObjectRef(b)) => a == b,
            _ => false,
        }
    }

    /// `equal?`: object identity
    ///
    /// Immediates are identical when their bits are; bignums are heap objects
    /// and only identical to themselves.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::BigInt(a), Value::BigInt(b)) => Arc::ptr_eq(a, b),
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }

    /// Hash consistent with [`Value::identical`]
    pub fn identity_hash(&self) -> u64 {
        match self {
            Value::BigInt(b) => {
                let mut hasher = FxHasher::default();
                (Arc::as_ptr(b) as usize).hash(&mut hasher);
                hasher.finish()
            }
            Value::Float(f) => {
                let mut hasher = FxHasher::default();
                f.to_bits().hash(&mut hasher);
                hasher.finish()
            }
            _ => self.default_hash(),
        }
    }

    /// Whether this integer value is zero
    pub fn is_zero_integer(&self) -> bool {
        match self {
            Value::SmallInt(i) => *i == 0,
            Value::BigInt(b) => b.is_zero(),
            _ => false,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Nil
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::SmallInt(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::SmallInt(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<ObjectHandle> for Value {
    fn from(h: ObjectHandle) -> Self {
        Value::ObjectRef(h)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::SmallInt(i) => write!(f, "{}", i),
            Value::BigInt(b) => write!(f, "{}", b),
            Value::Float(x) => {
                if x.is_nan() {
                    write!(f, "NaN")
                } else if x.is_infinite() {
                    write!(f, "{}Infinity", if *x < 0.0 { "-" } else { "" })
                } else if x.fract() == 0.0 && x.abs() < 1e16 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            Value::ObjectRef(h) => write!(f, "#<Object:{:#x}>", h.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kinds() {
        assert_eq!(Value::nil().kind(), ValueKind::Nil);
        assert_eq!(Value::bool(true).kind(), ValueKind::Bool);
        assert_eq!(Value::int(42).kind(), ValueKind::SmallInt);
        assert_eq!(Value::bignum(BigInt::from(7)).kind(), ValueKind::BigInt);
        assert_eq!(Value::float(1.5).kind(), ValueKind::Float);
        assert_eq!(Value::object(ObjectHandle(8)).kind(), ValueKind::ObjectRef);
    }

    #[test]
    fn test_value_truthiness() {
        assert!(!Value::nil().is_truthy());
        assert!(!Value::bool(false).is_truthy());
        assert!(Value::bool(true).is_truthy());
        // Zero is truthy in Ruby
        assert!(Value::int(0).is_truthy());
        assert!(Value::float(0.0).is_truthy());
    }

    #[test]
    fn test_fits_i32() {
        assert!(Value::int(i32::MAX as i64).fits_i32());
        assert!(Value::int(i32::MIN as i64).fits_i32());
        assert!(!Value::int(i32::MAX as i64 + 1).fits_i32());
        assert!(!Value::float(1.0).fits_i32());
    }

    #[test]
    fn test_eql_is_class_sensitive() {
        assert!(Value::int(1).default_eql(&Value::int(1)));
        assert!(!Value::int(1).default_eql(&Value::float(1.0)));
        assert!(Value::float(0.0).default_eql(&Value::float(-0.0)));
        assert!(!Value::float(f64::NAN).default_eql(&Value::float(f64::NAN)));
        assert!(Value::bignum(BigInt::from(5)).default_eql(&Value::int(5)));
    }

    #[test]
    fn test_hash_agrees_with_eql() {
        assert_eq!(Value::float(0.0).default_hash(), Value::float(-0.0).default_hash());
        assert_eq!(
            Value::bignum(BigInt::from(99)).default_hash(),
            Value::int(99).default_hash()
        );
        assert_ne!(Value::int(1).default_hash(), Value::float(1.0).default_hash());
    }

    #[test]
    fn test_identity() {
        let big = Value::bignum(BigInt::from(u64::MAX) * 4);
        let copy = big.clone();
        let other = Value::bignum(BigInt::from(u64::MAX) * 4);
        assert!(big.identical(&copy));
        assert!(!big.identical(&other));
        assert!(big.default_eql(&other));
        assert!(Value::int(3).identical(&Value::int(3)));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", Value::nil()), "nil");
        assert_eq!(format!("{}", Value::bool(true)), "true");
        assert_eq!(format!("{}", Value::int(-10)), "-10");
        assert_eq!(format!("{}", Value::float(4.5)), "4.5");
        assert_eq!(format!("{}", Value::float(3.0)), "3.0");
        assert_eq!(format!("{}", Value::float(f64::NEG_INFINITY)), "-Infinity");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::int(1).type_name(), "Integer");
        assert_eq!(Value::bignum(BigInt::from(1) << 80).type_name(), "Integer");
        assert_eq!(Value::bool(false).type_name(), "FalseClass");
    }
}
