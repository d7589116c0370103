//! Ruby Array container
//!
//! A `RubyArray` owns one [`ArrayStorage`] and a logical size. Every mutation
//! goes through [`RubyArray::write`] / [`RubyArray::append`] /
//! [`RubyArray::resize`], which promote the storage when the incoming value
//! does not fit the current representation.

mod iter;
mod ops;

use garnet_value::{ClassHandle, CoreError, CoreResult, Value};

use crate::options::CoreOptions;
use crate::storage::{size_too_big, ArrayStorage, Packed, StorageKind, MAX_SIZE};

pub(crate) const CLASS_NAME: &str = "Array";

/// Mutable Ruby array
#[derive(Debug, Clone)]
pub struct RubyArray {
    class: ClassHandle,
    storage: ArrayStorage,
    size: usize,
    min_capacity: usize,
    frozen: bool,
}

impl RubyArray {
    /// Create an empty array with default growth settings
    pub fn new(class: ClassHandle) -> Self {
        Self::with_min_capacity(class, CoreOptions::default().array_min_capacity)
    }

    /// Create an empty array using the given options
    pub fn with_options(class: ClassHandle, options: &CoreOptions) -> Self {
        Self::with_min_capacity(class, options.array_min_capacity)
    }

    fn with_min_capacity(class: ClassHandle, min_capacity: usize) -> Self {
        Self {
            class,
            storage: ArrayStorage::Empty,
            size: 0,
            min_capacity: min_capacity.max(1),
            frozen: false,
        }
    }

    /// Create an array from a literal, choosing the narrowest storage
    pub fn from_values(class: ClassHandle, values: Vec<Value>) -> Self {
        Self::from_values_with_options(class, values, &CoreOptions::default())
    }

    /// Array literal using the given growth settings
    pub fn from_values_with_options(
        class: ClassHandle,
        values: Vec<Value>,
        options: &CoreOptions,
    ) -> Self {
        let mut array = Self::with_options(class, options);
        array.size = values.len();
        array.storage = ArrayStorage::from_values(values);
        array
    }

    /// `Array.new(size, fill)`
    pub fn filled(class: ClassHandle, size: i64, fill: Value) -> CoreResult<Self> {
        let len = usize::try_from(size).map_err(|_| CoreError::NegativeSize(size))?;
        if len > MAX_SIZE {
            return Err(CoreError::SizeTooBig(size));
        }
        let mut array = Self::new(class);
        if len > 0 {
            array.storage = ArrayStorage::with_kind(StorageKind::of_value(&fill), 0);
            array.storage.reserve(len, array.min_capacity)?;
            array.storage.fill_range(0, len, &fill);
            array.size = len;
        }
        Ok(array)
    }

    /// An empty array sharing this array's class and growth settings
    pub(crate) fn sibling(&self) -> Self {
        Self::with_min_capacity(self.class, self.min_capacity)
    }

    /// Sibling array built from storage already holding `size` elements
    pub(crate) fn sibling_with(&self, storage: ArrayStorage, size: usize) -> Self {
        let mut array = self.sibling();
        array.storage = storage;
        array.size = size;
        array
    }

    /// Logical class handle
    pub fn class(&self) -> ClassHandle {
        self.class
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the array has no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Physical capacity of the backing buffer
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Current storage representation
    #[inline]
    pub fn storage_kind(&self) -> StorageKind {
        self.storage.kind()
    }

    /// Backing storage
    pub fn storage(&self) -> &ArrayStorage {
        &self.storage
    }

    /// Elements as an unboxed slice, if stored with that representation
    #[inline]
    pub fn packed<T: Packed>(&self) -> Option<&[T]> {
        T::view(&self.storage).map(|v| &v[..self.size])
    }

    /// Mutable unboxed slice, if stored with that representation
    ///
    /// Fails on a frozen array.
    #[inline]
    pub fn packed_mut<T: Packed>(&mut self) -> CoreResult<Option<&mut [T]>> {
        self.check_frozen()?;
        let size = self.size;
        Ok(T::view_mut(&mut self.storage).map(|v| &mut v[..size]))
    }

    /// Boxed elements, if stored as objects
    pub fn objects(&self) -> Option<&[Value]> {
        match &self.storage {
            ArrayStorage::Object(v) => Some(&v[..self.size]),
            _ => None,
        }
    }

    /// Whether the array is frozen
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// `freeze`
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    #[inline]
    pub(crate) fn check_frozen(&self) -> CoreResult<()> {
        if self.frozen {
            Err(CoreError::Frozen(CLASS_NAME))
        } else {
            Ok(())
        }
    }

    /// Read element `index`, `None` past the end
    #[inline]
    pub fn read(&self, index: usize) -> Option<Value> {
        if index < self.size {
            Some(self.storage.read(index))
        } else {
            None
        }
    }

    /// Overwrite element `index`, growing with nils when past the end
    ///
    /// An index at or past [`MAX_SIZE`] fails with `IndexTooBig` before
    /// anything is allocated.
    pub fn write(&mut self, index: usize, value: Value) -> CoreResult<()> {
        self.check_frozen()?;
        if index >= MAX_SIZE {
            return Err(CoreError::IndexTooBig(i64::try_from(index).unwrap_or(i64::MAX)));
        }
        if index >= self.size {
            if index > self.size {
                self.resize(index)?;
            }
            return self.append(value);
        }
        self.storage.write(self.size, index, value);
        Ok(())
    }

    /// Append one element
    pub fn append(&mut self, value: Value) -> CoreResult<()> {
        self.check_frozen()?;
        let target = self.storage.target_for(&value);
        self.storage.promote(self.size, target);
        self.storage.reserve(self.size + 1, self.min_capacity)?;
        self.storage.write(self.size, self.size, value);
        self.size += 1;
        Ok(())
    }

    /// Set the logical size; growing pads with nil
    pub fn resize(&mut self, new_size: usize) -> CoreResult<()> {
        self.check_frozen()?;
        if new_size <= self.size {
            self.storage.release(new_size, self.size);
            self.size = new_size;
            return Ok(());
        }
        if new_size > MAX_SIZE {
            return Err(size_too_big(new_size));
        }
        let target = self.storage.target_for(&Value::Nil);
        self.storage.promote(self.size, target);
        self.storage.reserve(new_size, self.min_capacity)?;
        self.storage.release(self.size, new_size);
        self.size = new_size;
        Ok(())
    }

    /// Resolve a possibly negative index, `None` when it lands before the start
    #[inline]
    pub fn normalize_index(&self, index: i64) -> Option<usize> {
        if index < 0 {
            let adjusted = index + self.size as i64;
            usize::try_from(adjusted).ok()
        } else {
            usize::try_from(index).ok()
        }
    }

    /// `self[index]`; nil when out of range
    pub fn get(&self, index: i64) -> Value {
        self.normalize_index(index)
            .and_then(|i| self.read(i))
            .unwrap_or(Value::Nil)
    }

    /// `self[index] = value`
    ///
    /// Past the end pads with nil; before `-len` fails with `IndexTooSmall`.
    pub fn set(&mut self, index: i64, value: Value) -> CoreResult<()> {
        let i = self
            .normalize_index(index)
            .ok_or_else(|| CoreError::index_too_small(CLASS_NAME, index, self.size))?;
        self.write(i, value)
    }

    /// All elements, boxed
    pub fn to_vec(&self) -> Vec<Value> {
        self.storage.to_values(self.size)
    }

    /// Iterate boxed elements
    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.size).map(move |i| self.storage.read(i))
    }
}

impl PartialEq for RubyArray {
    /// Structural equality of elements (builtin `eql?` on each pair)
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.iter().zip(other.iter()).all(|(a, b)| a.default_eql(&b))
    }
}
