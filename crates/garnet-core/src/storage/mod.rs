//! Array storage strategies
//!
//! An array's elements live in exactly one backing buffer at a time:
//!
//! ```text
//!            ┌── Int   (Vec<i32>) ──┐
//!   Empty ───┼── Long  (Vec<i64>) ──┼──► Object (Vec<Value>)
//!            └── Float (Vec<f64>) ──┘
//! ```
//!
//! Promotion only moves rightwards and converts the whole buffer in one pass.
//! A buffer's `len()` is its physical capacity; the owning container keeps
//! the logical size, and slots past it are never read.

pub mod packed;

pub use packed::Packed;

use garnet_value::{CoreError, CoreResult, Value};

/// Largest element count any array may hold
///
/// Bounded so a boxed buffer of this length stays addressable.
pub const MAX_SIZE: usize = isize::MAX as usize / std::mem::size_of::<Value>();

/// `SizeTooBig` for a length that already exceeds [`MAX_SIZE`]
pub(crate) fn size_too_big(size: usize) -> CoreError {
    CoreError::SizeTooBig(i64::try_from(size).unwrap_or(i64::MAX))
}

/// Which representation a storage currently uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// No buffer allocated
    Empty,
    /// Fixnums that fit in 32 bits
    Int,
    /// Fixnums
    Long,
    /// Floats
    Float,
    /// Boxed values of any kind
    Object,
}

impl StorageKind {
    /// Height in the promotion lattice
    pub const fn rank(self) -> u8 {
        match self {
            StorageKind::Empty => 0,
            StorageKind::Int | StorageKind::Long | StorageKind::Float => 1,
            StorageKind::Object => 2,
        }
    }

    /// Unboxed numeric storage
    pub const fn is_packed(self) -> bool {
        self.rank() == 1
    }

    /// Short name for logs
    pub const fn name(self) -> &'static str {
        match self {
            StorageKind::Empty => "empty",
            StorageKind::Int => "int",
            StorageKind::Long => "long",
            StorageKind::Float => "float",
            StorageKind::Object => "object",
        }
    }

    /// Narrowest storage able to hold this single value
    pub fn of_value(value: &Value) -> StorageKind {
        match value {
            Value::SmallInt(i) if i32::try_from(*i).is_ok() => StorageKind::Int,
            Value::SmallInt(_) => StorageKind::Long,
            Value::Float(_) => StorageKind::Float,
            _ => StorageKind::Object,
        }
    }

    /// Storage for a literal: fixnums of both widths share `Long`
    pub fn for_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> StorageKind {
        let mut acc = StorageKind::Empty;
        for value in values {
            let kind = StorageKind::of_value(value);
            acc = match (acc, kind) {
                (StorageKind::Empty, k) => k,
                (a, b) if a == b => a,
                (StorageKind::Int, StorageKind::Long) | (StorageKind::Long, StorageKind::Int) => {
                    StorageKind::Long
                }
                _ => return StorageKind::Object,
            };
        }
        acc
    }

    /// Storage able to hold the contents of both, under runtime promotion
    ///
    /// `self` is the receiver's current kind. `Long` already holds any
    /// fixnum, so it absorbs `Int`; the reverse meets at `Object`, since `Int`
    /// never silently becomes `Long`. Other packed pairs meet at `Object`.
    pub fn generalize(self, other: StorageKind) -> StorageKind {
        match (self, other) {
            (StorageKind::Empty, k) | (k, StorageKind::Empty) => k,
            (a, b) if a == b => a,
            (StorageKind::Long, StorageKind::Int) => StorageKind::Long,
            _ => StorageKind::Object,
        }
    }

    /// Whether promotion may move from `self` to `target`
    pub fn can_promote_to(self, target: StorageKind) -> bool {
        match (self, target) {
            (a, b) if a == b => true,
            (StorageKind::Empty, _) => true,
            (StorageKind::Int, StorageKind::Long) => true,
            (a, StorageKind::Object) => a.is_packed(),
            _ => false,
        }
    }
}

/// Apply an expression to whichever backing buffer is present
macro_rules! with_buffer {
    ($storage:expr, $buf:ident => $body:expr, empty => $empty:expr) => {
        match $storage {
            ArrayStorage::Empty => $empty,
            ArrayStorage::Int($buf) => $body,
            ArrayStorage::Long($buf) => $body,
            ArrayStorage::Float($buf) => $body,
            ArrayStorage::Object($buf) => $body,
        }
    };
}

/// Backing buffer of an array
#[derive(Debug, Clone, Default)]
pub enum ArrayStorage {
    /// No buffer
    #[default]
    Empty,
    /// Unboxed 32-bit fixnums
    Int(Vec<i32>),
    /// Unboxed fixnums
    Long(Vec<i64>),
    /// Unboxed floats
    Float(Vec<f64>),
    /// Boxed values
    Object(Vec<Value>),
}

/// Capacity to grow to so that `needed` slots fit
///
/// Small arrays jump straight to `min`; larger ones double, up to
/// [`MAX_SIZE`].
pub fn grown_capacity(current: usize, needed: usize, min: usize) -> usize {
    if needed <= current {
        return current;
    }
    if needed < min {
        return min;
    }
    let mut capacity = current.max(min).max(1);
    while capacity < needed {
        capacity = capacity.saturating_mul(2);
    }
    capacity.min(MAX_SIZE.max(needed))
}

impl ArrayStorage {
    /// Allocate a buffer of the given kind, filled with zeros or nils
    pub fn with_kind(kind: StorageKind, capacity: usize) -> Self {
        match kind {
            StorageKind::Empty => ArrayStorage::Empty,
            StorageKind::Int => ArrayStorage::Int(vec![0; capacity]),
            StorageKind::Long => ArrayStorage::Long(vec![0; capacity]),
            StorageKind::Float => ArrayStorage::Float(vec![0.0; capacity]),
            StorageKind::Object => ArrayStorage::Object(vec![Value::Nil; capacity]),
        }
    }

    /// Build storage holding exactly `values`, using the literal rule
    pub fn from_values(values: Vec<Value>) -> Self {
        match StorageKind::for_values(&values) {
            StorageKind::Empty => ArrayStorage::Empty,
            StorageKind::Int => ArrayStorage::Int(unbox_all(&values)),
            StorageKind::Long => ArrayStorage::Long(unbox_all(&values)),
            StorageKind::Float => ArrayStorage::Float(unbox_all(&values)),
            StorageKind::Object => ArrayStorage::Object(values),
        }
    }

    /// Current representation
    #[inline]
    pub fn kind(&self) -> StorageKind {
        match self {
            ArrayStorage::Empty => StorageKind::Empty,
            ArrayStorage::Int(_) => StorageKind::Int,
            ArrayStorage::Long(_) => StorageKind::Long,
            ArrayStorage::Float(_) => StorageKind::Float,
            ArrayStorage::Object(_) => StorageKind::Object,
        }
    }

    /// Physical capacity
    #[inline]
    pub fn capacity(&self) -> usize {
        with_buffer!(self, buf => buf.len(), empty => 0)
    }

    /// Read a slot; `index` must be below capacity
    #[inline]
    pub fn read(&self, index: usize) -> Value {
        match self {
            ArrayStorage::Empty => Value::Nil,
            ArrayStorage::Int(v) => v[index].boxed(),
            ArrayStorage::Long(v) => v[index].boxed(),
            ArrayStorage::Float(v) => v[index].boxed(),
            ArrayStorage::Object(v) => v[index].clone(),
        }
    }

    /// Whether `value` can be stored without promotion
    #[inline]
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ArrayStorage::Empty => false,
            ArrayStorage::Int(_) => value.fits_i32(),
            ArrayStorage::Long(_) => matches!(value, Value::SmallInt(_)),
            ArrayStorage::Float(_) => matches!(value, Value::Float(_)),
            ArrayStorage::Object(_) => true,
        }
    }

    /// Representation needed after storing `value`
    pub fn target_for(&self, value: &Value) -> StorageKind {
        if self.accepts(value) {
            self.kind()
        } else if matches!(self, ArrayStorage::Empty) {
            StorageKind::of_value(value)
        } else {
            StorageKind::Object
        }
    }

    /// Convert the first `size` elements to the `target` representation
    ///
    /// A target that cannot be reached from the current kind is widened to
    /// `Object`. Capacity is preserved.
    pub fn promote(&mut self, size: usize, target: StorageKind) {
        let current = self.kind();
        if current == target || target == StorageKind::Empty {
            return;
        }
        let target = if current.can_promote_to(target) {
            target
        } else {
            StorageKind::Object
        };
        if current == target {
            return;
        }
        let capacity = self.capacity();
        let next = match (std::mem::take(self), target) {
            (ArrayStorage::Empty, kind) => ArrayStorage::with_kind(kind, 0),
            (ArrayStorage::Int(v), StorageKind::Long) => {
                ArrayStorage::Long(v.into_iter().map(i64::from).collect())
            }
            (old, _) => {
                let mut boxed = Vec::with_capacity(capacity);
                boxed.extend((0..size).map(|i| old.read(i)));
                boxed.resize(capacity, Value::Nil);
                ArrayStorage::Object(boxed)
            }
        };
        tracing::debug!(
            from = current.name(),
            to = next.kind().name(),
            size,
            "array storage promoted"
        );
        *self = next;
    }

    /// Store `value` at `index`, promoting first if needed
    ///
    /// `index` must be below capacity once promoted; `size` is the logical
    /// size used for the promotion copy.
    pub fn write(&mut self, size: usize, index: usize, value: Value) {
        let target = self.target_for(&value);
        if target != self.kind() {
            self.promote(size, target);
        }
        match self {
            ArrayStorage::Empty => {}
            ArrayStorage::Int(v) => store(v, index, &value),
            ArrayStorage::Long(v) => store(v, index, &value),
            ArrayStorage::Float(v) => store(v, index, &value),
            ArrayStorage::Object(v) => v[index] = value,
        }
    }

    /// Grow capacity so `needed` slots fit
    ///
    /// An `Empty` storage has no element type yet and stays empty; callers
    /// promote it before reserving. Fails with `SizeTooBig` past
    /// [`MAX_SIZE`] and `NoMemory` when the allocator refuses; either way the
    /// buffer is left as it was.
    pub fn reserve(&mut self, needed: usize, min_capacity: usize) -> CoreResult<()> {
        let capacity = self.capacity();
        if needed <= capacity {
            return Ok(());
        }
        if needed > MAX_SIZE {
            return Err(size_too_big(needed));
        }
        let grown = grown_capacity(capacity, needed, min_capacity);
        match self {
            ArrayStorage::Empty => Ok(()),
            ArrayStorage::Int(v) => grow(v, grown, 0),
            ArrayStorage::Long(v) => grow(v, grown, 0),
            ArrayStorage::Float(v) => grow(v, grown, 0.0),
            ArrayStorage::Object(v) => grow(v, grown, Value::Nil),
        }
    }

    /// Reset slots `from..to` so boxed garbage does not keep values alive
    pub fn release(&mut self, from: usize, to: usize) {
        if let ArrayStorage::Object(v) = self {
            let to = to.min(v.len());
            if from < to {
                v[from..to].fill(Value::Nil);
            }
        }
    }

    /// Move `at..size` up by `count` slots; capacity must cover `size + count`
    pub fn open_gap(&mut self, size: usize, at: usize, count: usize) {
        with_buffer!(self, buf => buf[at..size + count].rotate_right(count), empty => ())
    }

    /// Remove `count` slots at `at`, moving `at + count..size` down
    pub fn close_gap(&mut self, size: usize, at: usize, count: usize) {
        with_buffer!(self, buf => buf[at..size].rotate_left(count), empty => ());
        self.release(size - count, size);
    }

    /// Set every slot in `from..to` to `value`
    ///
    /// The storage must already accept `value` and have capacity for `to`.
    pub fn fill_range(&mut self, from: usize, to: usize, value: &Value) {
        match self {
            ArrayStorage::Empty => {}
            ArrayStorage::Int(v) => fill_packed(&mut v[from..to], value),
            ArrayStorage::Long(v) => fill_packed(&mut v[from..to], value),
            ArrayStorage::Float(v) => fill_packed(&mut v[from..to], value),
            ArrayStorage::Object(v) => v[from..to].fill(value.clone()),
        }
    }

    /// Reverse the first `size` elements in place
    pub fn reverse(&mut self, size: usize) {
        with_buffer!(self, buf => buf[..size].reverse(), empty => ())
    }

    /// Fresh storage holding a copy of `from..to`, exactly sized
    pub fn copy_range(&self, from: usize, to: usize) -> ArrayStorage {
        match self {
            ArrayStorage::Empty => ArrayStorage::Empty,
            ArrayStorage::Int(v) => ArrayStorage::Int(v[from..to].to_vec()),
            ArrayStorage::Long(v) => ArrayStorage::Long(v[from..to].to_vec()),
            ArrayStorage::Float(v) => ArrayStorage::Float(v[from..to].to_vec()),
            ArrayStorage::Object(v) => ArrayStorage::Object(v[from..to].to_vec()),
        }
    }

    /// Append `other[..other_size]` after our first `size` elements
    pub fn extend_from(
        &mut self,
        size: usize,
        other: &ArrayStorage,
        other_size: usize,
        min_capacity: usize,
    ) -> CoreResult<()> {
        if other_size == 0 {
            return Ok(());
        }
        let target = if size == 0 && self.kind() == StorageKind::Empty {
            other.kind()
        } else {
            self.kind().generalize(other.kind())
        };
        let end = size + other_size;
        if end > MAX_SIZE {
            return Err(size_too_big(end));
        }
        self.promote(size, target);
        self.reserve(end, min_capacity)?;
        match (&mut *self, other) {
            (ArrayStorage::Int(dst), ArrayStorage::Int(src)) => {
                dst[size..end].copy_from_slice(&src[..other_size])
            }
            (ArrayStorage::Long(dst), ArrayStorage::Long(src)) => {
                dst[size..end].copy_from_slice(&src[..other_size])
            }
            (ArrayStorage::Float(dst), ArrayStorage::Float(src)) => {
                dst[size..end].copy_from_slice(&src[..other_size])
            }
            (dst, src) => {
                for i in 0..other_size {
                    dst.write(size + i, size + i, src.read(i));
                }
            }
        }
        Ok(())
    }

    /// Box the first `size` elements
    pub fn to_values(&self, size: usize) -> Vec<Value> {
        (0..size).map(|i| self.read(i)).collect()
    }
}

fn grow<T: Clone>(buffer: &mut Vec<T>, capacity: usize, fill: T) -> CoreResult<()> {
    buffer
        .try_reserve_exact(capacity - buffer.len())
        .map_err(|_| CoreError::NoMemory)?;
    buffer.resize(capacity, fill);
    Ok(())
}

#[inline]
fn store<T: Packed>(buffer: &mut [T], index: usize, value: &Value) {
    if let Some(x) = T::unbox(value) {
        buffer[index] = x;
    }
}

#[inline]
fn fill_packed<T: Packed>(buffer: &mut [T], value: &Value) {
    if let Some(x) = T::unbox(value) {
        buffer.fill(x);
    }
}

fn unbox_all<T: Packed>(values: &[Value]) -> Vec<T> {
    values.iter().map(|v| T::unbox(v).unwrap_or_default()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grown_capacity() {
        assert_eq!(grown_capacity(0, 1, 16), 16);
        assert_eq!(grown_capacity(16, 17, 16), 32);
        assert_eq!(grown_capacity(16, 100, 16), 128);
        assert_eq!(grown_capacity(32, 10, 16), 32);
        assert_eq!(grown_capacity(MAX_SIZE - 1, MAX_SIZE, 16), MAX_SIZE);
    }

    #[test]
    fn test_reserve_past_max_size_fails() {
        let mut storage = ArrayStorage::from_values(vec![Value::int(1)]);
        assert_eq!(
            storage.reserve(MAX_SIZE + 1, 16),
            Err(CoreError::SizeTooBig((MAX_SIZE + 1) as i64))
        );
        assert_eq!(storage.capacity(), 1);
        assert_eq!(storage.to_values(1), vec![Value::int(1)]);
    }

    #[test]
    fn test_literal_kinds() {
        let ints = [Value::int(1), Value::int(2)];
        assert_eq!(StorageKind::for_values(&ints), StorageKind::Int);
        let mixed = [Value::int(1), Value::int(1 << 40)];
        assert_eq!(StorageKind::for_values(&mixed), StorageKind::Long);
        let floats = [Value::float(1.0), Value::int(1)];
        assert_eq!(StorageKind::for_values(&floats), StorageKind::Object);
        assert_eq!(StorageKind::for_values(&[]), StorageKind::Empty);
    }

    #[test]
    fn test_runtime_generalize_skips_long() {
        assert_eq!(StorageKind::Int.generalize(StorageKind::Long), StorageKind::Object);
        assert_eq!(StorageKind::Empty.generalize(StorageKind::Float), StorageKind::Float);
        assert_eq!(StorageKind::Float.generalize(StorageKind::Float), StorageKind::Float);
        assert_eq!(StorageKind::Long.generalize(StorageKind::Int), StorageKind::Long);
    }

    #[test]
    fn test_write_promotes_int_to_object() {
        let mut storage = ArrayStorage::from_values(vec![Value::int(1), Value::int(2)]);
        storage.reserve(3, 16).unwrap();
        storage.write(2, 2, Value::int(1 << 40));
        assert_eq!(storage.kind(), StorageKind::Object);
        assert_eq!(
            storage.to_values(3),
            vec![Value::int(1), Value::int(2), Value::int(1 << 40)]
        );
    }

    #[test]
    fn test_promote_preserves_capacity() {
        let mut storage = ArrayStorage::with_kind(StorageKind::Float, 16);
        storage.write(0, 0, Value::float(0.5));
        storage.promote(1, StorageKind::Object);
        assert_eq!(storage.capacity(), 16);
        assert_eq!(storage.read(0), Value::float(0.5));
    }

    #[test]
    fn test_unreachable_target_widens_to_object() {
        let mut storage = ArrayStorage::from_values(vec![Value::float(1.0)]);
        storage.promote(1, StorageKind::Int);
        assert_eq!(storage.kind(), StorageKind::Object);
    }

    #[test]
    fn test_gaps() {
        let mut storage = ArrayStorage::from_values((1..=4).map(Value::int).collect());
        storage.reserve(6, 4).unwrap();
        storage.open_gap(4, 1, 2);
        storage.write(6, 1, Value::int(8));
        storage.write(6, 2, Value::int(9));
        assert_eq!(
            storage.to_values(6),
            [1, 8, 9, 2, 3, 4].into_iter().map(Value::int).collect::<Vec<_>>()
        );
        storage.close_gap(6, 0, 3);
        assert_eq!(storage.to_values(3), vec![Value::int(2), Value::int(3), Value::int(4)]);
    }

    #[test]
    fn test_extend_mixed_goes_object() {
        let mut a = ArrayStorage::from_values(vec![Value::int(1)]);
        let b = ArrayStorage::from_values(vec![Value::float(2.0)]);
        a.extend_from(1, &b, 1, 16).unwrap();
        assert_eq!(a.kind(), StorageKind::Object);
        assert_eq!(a.to_values(2), vec![Value::int(1), Value::float(2.0)]);
    }

    #[test]
    fn test_extend_long_with_int_stays_long() {
        let mut a = ArrayStorage::from_values(vec![Value::int(1 << 40)]);
        let b = ArrayStorage::from_values(vec![Value::int(2)]);
        a.extend_from(1, &b, 1, 16).unwrap();
        assert_eq!(a.kind(), StorageKind::Long);
        assert_eq!(a.to_values(2), vec![Value::int(1 << 40), Value::int(2)]);
    }
}
