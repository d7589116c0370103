//! Garnet value layer
//!
//! This crate provides the leaf types shared by every part of the Garnet core:
//! - Tagged dynamic values (`Value`, `ValueKind`, opaque heap and class handles)
//! - The error taxonomy surfaced to the method-dispatch layer
//! - The host protocol (equality, hashing, ordering, coercion)
//! - Numeric promotion between fixed-width and arbitrary-precision integers

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod host;
pub mod numeric;
pub mod value;

pub use error::{CoreError, CoreResult};
pub use host::{DefaultHost, Host};
pub use numeric::{Arithmetic, BinaryOp, PromotionStats, UnaryOp};
pub use value::{ClassHandle, ObjectHandle, Value, ValueKind};

/// Re-exported so hosts can build bignum values without naming the crate themselves
pub use num_bigint::BigInt;
