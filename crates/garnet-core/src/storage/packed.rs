//! Element types that can live unboxed in array storage

use garnet_value::Value;

use super::{ArrayStorage, StorageKind};

/// An unboxed element type with its own storage variant
pub trait Packed: Copy + Default + PartialEq + 'static {
    /// Storage variant holding this element type
    const KIND: StorageKind;

    /// Unbox a value, `None` if it does not fit this representation
    fn unbox(value: &Value) -> Option<Self>;

    /// Box back into a tagged value
    fn boxed(self) -> Value;

    /// Borrow the backing buffer if the storage has this representation
    fn view(storage: &ArrayStorage) -> Option<&Vec<Self>>;

    /// Mutably borrow the backing buffer
    fn view_mut(storage: &mut ArrayStorage) -> Option<&mut Vec<Self>>;

    /// Wrap a buffer into its storage variant
    fn wrap(buffer: Vec<Self>) -> ArrayStorage;
}

impl Packed for i32 {
    const KIND: StorageKind = StorageKind::Int;

    #[inline]
    fn unbox(value: &Value) -> Option<Self> {
        value.as_fixnum().and_then(|i| i32::try_from(i).ok())
    }

    #[inline]
    fn boxed(self) -> Value {
        Value::int(i64::from(self))
    }

    fn view(storage: &ArrayStorage) -> Option<&Vec<Self>> {
        match storage {
            ArrayStorage::Int(v) => Some(v),
            _ => None,
        }
    }

    fn view_mut(storage: &mut ArrayStorage) -> Option<&mut Vec<Self>> {
        match storage {
            ArrayStorage::Int(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(buffer: Vec<Self>) -> ArrayStorage {
        ArrayStorage::Int(buffer)
    }
}

impl Packed for i64 {
    const KIND: StorageKind = StorageKind::Long;

    #[inline]
    fn unbox(value: &Value) -> Option<Self> {
        value.as_fixnum()
    }

    #[inline]
    fn boxed(self) -> Value {
        Value::int(self)
    }

    fn view(storage: &ArrayStorage) -> Option<&Vec<Self>> {
        match storage {
            ArrayStorage::Long(v) => Some(v),
            _ => None,
        }
    }

    fn view_mut(storage: &mut ArrayStorage) -> Option<&mut Vec<Self>> {
        match storage {
            ArrayStorage::Long(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(buffer: Vec<Self>) -> ArrayStorage {
        ArrayStorage::Long(buffer)
    }
}

impl Packed for f64 {
    const KIND: StorageKind = StorageKind::Float;

    #[inline]
    fn unbox(value: &Value) -> Option<Self> {
        value.as_float()
    }

    #[inline]
    fn boxed(self) -> Value {
        Value::float(self)
    }

    fn view(storage: &ArrayStorage) -> Option<&Vec<Self>> {
        match storage {
            ArrayStorage::Float(v) => Some(v),
            _ => None,
        }
    }

    fn view_mut(storage: &mut ArrayStorage) -> Option<&mut Vec<Self>> {
        match storage {
            ArrayStorage::Float(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(buffer: Vec<Self>) -> ArrayStorage {
        ArrayStorage::Float(buffer)
    }
}
