//! Operand shapes and the guards that match them

use std::fmt;

use smallvec::SmallVec;

use garnet_value::{Value, ValueKind};

use crate::hash::HashStorageKind;
use crate::storage::StorageKind;

/// Representation of a call's receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverShape {
    /// An array in the given storage
    Array(StorageKind),
    /// A hash in the given storage
    Hash(HashStorageKind),
    /// A plain tagged value
    Value(ValueKind),
}

impl fmt::Display for ReceiverShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiverShape::Array(k) => write!(f, "array<{}>", k.name()),
            ReceiverShape::Hash(k) => write!(f, "hash<{}>", k.name()),
            ReceiverShape::Value(k) => write!(f, "{}", k),
        }
    }
}

/// Receiver and argument shapes of one call
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Receiver representation
    pub receiver: ReceiverShape,
    /// Argument kinds, in order
    pub args: SmallVec<[ValueKind; 2]>,
}

impl Shape {
    /// Shape of a receiver called with `args`
    pub fn of(receiver: ReceiverShape, args: &[Value]) -> Self {
        Self {
            receiver,
            args: args.iter().map(Value::kind).collect(),
        }
    }

    /// Kind of argument `index`, if present
    pub fn arg(&self, index: usize) -> Option<ValueKind> {
        self.args.get(index).copied()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.receiver)?;
        for (i, kind) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", kind)?;
        }
        f.write_str(")")
    }
}

/// Predicate over shapes
///
/// Each position is either pinned to one shape or left open. A guard only
/// accepts calls with exactly as many arguments as it was built for, so an
/// open position still never admits a missing argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    receiver: Option<ReceiverShape>,
    args: SmallVec<[Option<ValueKind>; 2]>,
}

impl Guard {
    /// Guard accepting exactly `shape`
    pub fn exact(shape: &Shape) -> Self {
        Self {
            receiver: Some(shape.receiver),
            args: shape.args.iter().copied().map(Some).collect(),
        }
    }

    /// Leave the receiver open
    pub fn any_receiver(mut self) -> Self {
        self.receiver = None;
        self
    }

    /// Leave argument `index` open
    pub fn any_arg(mut self, index: usize) -> Self {
        if let Some(slot) = self.args.get_mut(index) {
            *slot = None;
        }
        self
    }

    /// Whether a call with `shape` may run the guarded routine
    pub fn accepts(&self, shape: &Shape) -> bool {
        if let Some(receiver) = self.receiver {
            if receiver != shape.receiver {
                return false;
            }
        }
        self.args.len() == shape.args.len()
            && self
                .args
                .iter()
                .zip(&shape.args)
                .all(|(want, have)| want.map_or(true, |k| k == *have))
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.receiver {
            Some(r) => write!(f, "{}(", r)?,
            None => f.write_str("_(")?,
        }
        for (i, kind) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match kind {
                Some(k) => write!(f, "{}", k)?,
                None => f.write_str("_")?,
            }
        }
        f.write_str(")")
    }
}
