//! Error taxonomy for core operations
//!
//! These are domain errors only. The method-dispatch layer turns each variant
//! into the matching Ruby exception (`IndexError`, `ZeroDivisionError`,
//! `TypeError`, ...). Arithmetic overflow is not an error and never appears
//! here; guard violations are internal to the specialization cache.

use crate::value::Value;
use thiserror::Error;

/// Core operation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Negative index reaches before the start of a container
    #[error("index {index} too small for {container}; minimum: {minimum}")]
    IndexTooSmall {
        /// Container class name
        container: &'static str,
        /// Offending index as given by the caller
        index: i64,
        /// Smallest accepted index
        minimum: i64,
    },

    /// Index cannot be represented as a container offset
    #[error("index {0} too big")]
    IndexTooBig(i64),

    /// Negative length passed to a slicing or fill operation
    #[error("negative length ({0})")]
    NegativeLength(i64),

    /// Negative size passed to a constructor or `pop(n)`-style operation
    #[error("negative array size ({0})")]
    NegativeSize(i64),

    /// Requested size exceeds the largest array the platform can address
    #[error("array size too big ({0})")]
    SizeTooBig(i64),

    /// The allocator refused to grow a buffer
    #[error("failed to allocate memory")]
    NoMemory,

    /// Integer division or modulo by zero
    #[error("divided by 0")]
    DivideByZero,

    /// Left shift that would allocate an absurd number of bits
    #[error("shift width too big")]
    ShiftWidthTooBig,

    /// Float that has no Integer counterpart (NaN, Infinity)
    #[error("{0}")]
    FloatDomain(String),

    /// Operand could not be coerced into a numeric counterpart
    #[error("{from} can't be coerced into {to}")]
    CoercionFailed {
        /// Class of the foreign operand
        from: &'static str,
        /// Class of the receiver
        to: &'static str,
    },

    /// Argument of the wrong class
    #[error("no implicit conversion of {found} into {expected}")]
    WrongArgumentType {
        /// Class that was passed
        found: &'static str,
        /// Class that was expected
        expected: &'static str,
    },

    /// `<=>` returned nil for two values that had to be ordered
    #[error("comparison of {left} with {right} failed")]
    ComparisonFailed {
        /// Left-hand class
        left: &'static str,
        /// Right-hand class
        right: &'static str,
    },

    /// Mutation attempted on a frozen container
    #[error("can't modify frozen {0}")]
    Frozen(&'static str),

    /// Internal invariant violation
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Error signalled by an external callable (block, `eql?`, `<=>`)
    #[error("raised {0}")]
    Raised(Value),
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Build an `IndexTooSmall` for the given container
    pub fn index_too_small(container: &'static str, index: i64, size: usize) -> Self {
        CoreError::IndexTooSmall {
            container,
            index,
            minimum: -(size as i64),
        }
    }

    /// Build a `ComparisonFailed` from the two operands
    pub fn comparison_failed(left: &Value, right: &Value) -> Self {
        CoreError::ComparisonFailed {
            left: left.type_name(),
            right: right.type_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CoreError::index_too_small("Array", -5, 3).to_string(),
            "index -5 too small for Array; minimum: -3"
        );
        assert_eq!(CoreError::DivideByZero.to_string(), "divided by 0");
        assert_eq!(
            CoreError::SizeTooBig(i64::MAX).to_string(),
            "array size too big (9223372036854775807)"
        );
        assert_eq!(
            CoreError::comparison_failed(&Value::int(1), &Value::nil()).to_string(),
            "comparison of Integer with NilClass failed"
        );
    }
}
