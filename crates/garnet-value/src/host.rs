//! Host protocol
//!
//! The core never decides on its own what `eql?`, `hash`, `==` or `<=>` mean
//! for an object: user code may override any of them. Containers call out
//! through [`Host`] and propagate whatever error comes back.
//!
//! The provided methods implement the builtin semantics for immediates and
//! numerics, so a host only overrides what it actually customizes.

use std::cmp::Ordering;

use crate::error::{CoreError, CoreResult};
use crate::numeric::{self, BinaryOp};
use crate::value::Value;

/// Services the core consumes from the surrounding runtime
pub trait Host {
    /// `key.hash`, consistent with [`Host::eql`]
    fn hash(&mut self, value: &Value) -> CoreResult<u64> {
        Ok(value.default_hash())
    }

    /// `a.eql?(b)`, used for hash keys and `uniq`
    fn eql(&mut self, a: &Value, b: &Value) -> CoreResult<bool> {
        Ok(a.default_eql(b))
    }

    /// `a == b`, used for `include?`, `delete`, `index`
    fn equal(&mut self, a: &Value, b: &Value) -> CoreResult<bool> {
        if a.is_numeric() && b.is_numeric() {
            return Ok(numeric::numeric_cmp(a, b) == Some(Ordering::Equal));
        }
        Ok(a.default_eql(b))
    }

    /// `a <=> b`; `None` stands for a nil result
    fn compare(&mut self, a: &Value, b: &Value) -> CoreResult<Option<Ordering>> {
        match (a, b) {
            _ if a.is_numeric() && b.is_numeric() => Ok(numeric::numeric_cmp(a, b)),
            (Value::Nil, Value::Nil) => Ok(Some(Ordering::Equal)),
            (Value::Bool(x), Value::Bool(y)) if x == y => Ok(Some(Ordering::Equal)),
            (Value::ObjectRef(x), Value::ObjectRef(y)) if x == y => Ok(Some(Ordering::Equal)),
            _ => Ok(None),
        }
    }

    /// Coercion fallback for a numeric operator whose right operand is foreign
    fn coerce_binary(&mut self, op: BinaryOp, lhs: &Value, rhs: &Value) -> CoreResult<Value> {
        let _ = op;
        Err(CoreError::CoercionFailed {
            from: rhs.type_name(),
            to: lhs.type_name(),
        })
    }
}

/// Host with builtin semantics only
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHost;

impl Host for DefaultHost {}

/// Three-way comparison that fails when `<=>` returns nil
pub fn compare_strict(host: &mut dyn Host, a: &Value, b: &Value) -> CoreResult<Ordering> {
    host.compare(a, b)?
        .ok_or_else(|| CoreError::comparison_failed(a, b))
}
