//! Array operations built on the storage primitives
//!
//! Where the receiver is packed and the argument is a plain number, the
//! operation works on the unboxed slice directly instead of calling back into
//! the host for `==` or `<=>`.

use std::cmp::Ordering;

use garnet_value::host::compare_strict;
use garnet_value::{CoreError, CoreResult, Host, Value};
use rustc_hash::FxHashMap;

use super::{RubyArray, CLASS_NAME};
use crate::storage::{size_too_big, ArrayStorage, StorageKind, MAX_SIZE};

impl RubyArray {
    /// Array with this array's class, holding `values`
    pub(crate) fn sibling_from(&self, values: Vec<Value>) -> RubyArray {
        let size = values.len();
        self.sibling_with(ArrayStorage::from_values(values), size)
    }

    /// `push(value)`
    pub fn push(&mut self, value: Value) -> CoreResult<()> {
        self.append(value)
    }

    /// `push(*values)`
    pub fn push_all(&mut self, values: impl IntoIterator<Item = Value>) -> CoreResult<()> {
        self.check_frozen()?;
        for value in values {
            self.append(value)?;
        }
        Ok(())
    }

    /// `pop`
    pub fn pop(&mut self) -> CoreResult<Option<Value>> {
        self.check_frozen()?;
        if self.size == 0 {
            return Ok(None);
        }
        let value = self.storage.read(self.size - 1);
        self.storage.release(self.size - 1, self.size);
        self.size -= 1;
        Ok(Some(value))
    }

    /// `pop(n)`
    pub fn pop_n(&mut self, n: i64) -> CoreResult<RubyArray> {
        self.check_frozen()?;
        let count = self.count_arg(n)?;
        let from = self.size - count;
        let popped = self.sibling_with(self.storage.copy_range(from, self.size), count);
        self.storage.release(from, self.size);
        self.size = from;
        Ok(popped)
    }

    /// `shift`
    pub fn shift(&mut self) -> CoreResult<Option<Value>> {
        self.check_frozen()?;
        if self.size == 0 {
            return Ok(None);
        }
        let value = self.storage.read(0);
        self.storage.close_gap(self.size, 0, 1);
        self.size -= 1;
        Ok(Some(value))
    }

    /// `shift(n)`
    pub fn shift_n(&mut self, n: i64) -> CoreResult<RubyArray> {
        self.check_frozen()?;
        let count = self.count_arg(n)?;
        let shifted = self.sibling_with(self.storage.copy_range(0, count), count);
        if count > 0 {
            self.storage.close_gap(self.size, 0, count);
            self.size -= count;
        }
        Ok(shifted)
    }

    fn count_arg(&self, n: i64) -> CoreResult<usize> {
        let n = usize::try_from(n).map_err(|_| CoreError::NegativeSize(n))?;
        Ok(n.min(self.size))
    }

    /// `unshift(*values)`
    pub fn unshift(&mut self, values: Vec<Value>) -> CoreResult<()> {
        self.check_frozen()?;
        self.insert_values_at(0, values)
    }

    /// `insert(index, *values)`
    ///
    /// A negative index counts from one past the end, so `-1` appends.
    pub fn insert(&mut self, index: i64, values: Vec<Value>) -> CoreResult<()> {
        self.check_frozen()?;
        if values.is_empty() {
            return Ok(());
        }
        let size = self.size as i64;
        let at = if index < 0 { index + size + 1 } else { index };
        if at < 0 {
            return Err(CoreError::IndexTooSmall {
                container: CLASS_NAME,
                index,
                minimum: -(size + 1),
            });
        }
        let at = usize::try_from(at)
            .ok()
            .filter(|at| at.saturating_add(values.len()) <= MAX_SIZE)
            .ok_or(CoreError::IndexTooBig(index))?;
        if at > self.size {
            self.resize(at)?;
        }
        self.insert_values_at(at, values)
    }

    fn insert_values_at(&mut self, at: usize, values: Vec<Value>) -> CoreResult<()> {
        if values.is_empty() {
            return Ok(());
        }
        let count = values.len();
        let needed = self.size + count;
        if needed > MAX_SIZE {
            return Err(size_too_big(needed));
        }
        let target = values.iter().fold(self.storage.kind(), |kind, v| {
            kind.generalize(StorageKind::of_value(v))
        });
        self.storage.promote(self.size, target);
        self.storage.reserve(needed, self.min_capacity)?;
        self.storage.open_gap(self.size, at, count);
        let new_size = self.size + count;
        for (offset, value) in values.into_iter().enumerate() {
            self.storage.write(new_size, at + offset, value);
        }
        self.size = new_size;
        Ok(())
    }

    /// `delete_at(index)`
    pub fn delete_at(&mut self, index: i64) -> CoreResult<Option<Value>> {
        self.check_frozen()?;
        let Some(i) = self.normalize_index(index).filter(|i| *i < self.size) else {
            return Ok(None);
        };
        let value = self.storage.read(i);
        self.storage.close_gap(self.size, i, 1);
        self.size -= 1;
        Ok(Some(value))
    }

    /// `delete(value)`: remove every element `== value`, returning the last one
    ///
    /// All comparisons run before anything is removed, so an error raised by
    /// `==` leaves the array untouched.
    pub fn delete(&mut self, host: &mut dyn Host, value: &Value) -> CoreResult<Option<Value>> {
        self.check_frozen()?;
        let mut doomed = Vec::with_capacity(self.size);
        for element in self.iter() {
            doomed.push(element.identical(value) || host.equal(&element, value)?);
        }
        let mut found = None;
        let mut kept = 0;
        for (i, remove) in doomed.into_iter().enumerate() {
            let element = self.storage.read(i);
            if remove {
                found = Some(element);
            } else {
                if kept != i {
                    self.storage.write(self.size, kept, element);
                }
                kept += 1;
            }
        }
        self.storage.release(kept, self.size);
        self.size = kept;
        Ok(found)
    }

    /// `clear`; the storage representation is kept
    pub fn clear(&mut self) -> CoreResult<()> {
        self.check_frozen()?;
        self.storage.release(0, self.size);
        self.size = 0;
        Ok(())
    }

    /// `self[start, len]`; `None` stands for nil
    pub fn slice(&self, start: i64, len: i64) -> Option<RubyArray> {
        if len < 0 {
            return None;
        }
        let size = self.size as i64;
        let start = if start < 0 { start + size } else { start };
        if start < 0 || start > size {
            return None;
        }
        let end = start.saturating_add(len).min(size);
        let (from, to) = (start as usize, end as usize);
        Some(self.sibling_with(self.storage.copy_range(from, to), to - from))
    }

    /// `first(n)`
    pub fn first_n(&self, n: i64) -> CoreResult<RubyArray> {
        let count = self.count_arg(n)?;
        Ok(self.sibling_with(self.storage.copy_range(0, count), count))
    }

    /// `last(n)`
    pub fn last_n(&self, n: i64) -> CoreResult<RubyArray> {
        let count = self.count_arg(n)?;
        let from = self.size - count;
        Ok(self.sibling_with(self.storage.copy_range(from, self.size), count))
    }

    /// `fill(value)`, `fill(value, start)`, `fill(value, start, len)`
    pub fn fill(&mut self, value: Value, start: Option<i64>, len: Option<i64>) -> CoreResult<()> {
        self.check_frozen()?;
        let size = self.size as i64;
        let begin = match start {
            None => 0,
            Some(s) if s < 0 => (s + size).max(0),
            Some(s) => s,
        };
        let end = match len {
            None => size,
            Some(l) if l < 0 => return Ok(()),
            Some(l) => begin.checked_add(l).ok_or(CoreError::IndexTooBig(begin))?,
        };
        if end <= begin {
            return Ok(());
        }
        let begin = usize::try_from(begin).map_err(|_| CoreError::IndexTooBig(begin))?;
        let end = usize::try_from(end).map_err(|_| CoreError::IndexTooBig(end))?;
        if end > MAX_SIZE {
            return Err(size_too_big(end));
        }
        if begin > self.size {
            self.resize(begin)?;
        }
        let target = self.storage.target_for(&value);
        self.storage.promote(self.size, target);
        self.storage.reserve(end, self.min_capacity)?;
        self.storage.fill_range(begin, end, &value);
        self.size = self.size.max(end);
        Ok(())
    }

    /// `concat(other)`
    pub fn concat(&mut self, other: &RubyArray) -> CoreResult<()> {
        self.check_frozen()?;
        self.extend_storage(other)
    }

    fn extend_storage(&mut self, other: &RubyArray) -> CoreResult<()> {
        self.storage
            .extend_from(self.size, &other.storage, other.size, self.min_capacity)?;
        self.size += other.size;
        Ok(())
    }

    /// `self + other`
    pub fn plus(&self, other: &RubyArray) -> CoreResult<RubyArray> {
        let mut result = self.dup();
        result.extend_storage(other)?;
        Ok(result)
    }

    /// `self * n`
    ///
    /// The result is sized once up front; a product past [`MAX_SIZE`] fails
    /// with `SizeTooBig` without allocating.
    pub fn times(&self, n: i64) -> CoreResult<RubyArray> {
        let count = usize::try_from(n).map_err(|_| CoreError::NegativeLength(n))?;
        let mut result = self.sibling();
        if self.size == 0 || count == 0 {
            return Ok(result);
        }
        let total = self
            .size
            .checked_mul(count)
            .filter(|total| *total <= MAX_SIZE)
            .ok_or(CoreError::SizeTooBig(n))?;
        result.storage = ArrayStorage::with_kind(self.storage_kind(), 0);
        result.storage.reserve(total, result.min_capacity)?;
        for _ in 0..count {
            result.extend_storage(self)?;
        }
        Ok(result)
    }

    /// `self - other`, using `hash`/`eql?`
    pub fn minus(&self, host: &mut dyn Host, other: &RubyArray) -> CoreResult<RubyArray> {
        let exclude = SeenSet::from_values(host, other.iter())?;
        let mut kept = Vec::with_capacity(self.size);
        for element in self.iter() {
            if !exclude.contains(host, &element)? {
                kept.push(element);
            }
        }
        Ok(self.sibling_from(kept))
    }

    /// `self | other`
    pub fn union(&self, host: &mut dyn Host, other: &RubyArray) -> CoreResult<RubyArray> {
        let mut seen = SeenSet::default();
        let mut result = Vec::new();
        for element in self.iter().chain(other.iter()) {
            if seen.insert(host, &element)? {
                result.push(element);
            }
        }
        Ok(self.sibling_from(result))
    }

    /// `self & other`
    pub fn intersection(&self, host: &mut dyn Host, other: &RubyArray) -> CoreResult<RubyArray> {
        let allowed = SeenSet::from_values(host, other.iter())?;
        let mut seen = SeenSet::default();
        let mut result = Vec::new();
        for element in self.iter() {
            if allowed.contains(host, &element)? && seen.insert(host, &element)? {
                result.push(element);
            }
        }
        Ok(self.sibling_from(result))
    }

    /// `uniq`
    pub fn uniq(&self, host: &mut dyn Host) -> CoreResult<RubyArray> {
        let mut seen = SeenSet::default();
        let mut result = Vec::new();
        for element in self.iter() {
            if seen.insert(host, &element)? {
                result.push(element);
            }
        }
        Ok(self.sibling_from(result))
    }

    /// `compact`
    pub fn compact(&self) -> RubyArray {
        if self.storage_kind() != StorageKind::Object {
            return self.dup();
        }
        self.sibling_from(self.iter().filter(|v| !v.is_nil()).collect())
    }

    /// `reverse`
    pub fn reverse(&self) -> RubyArray {
        let mut result = self.dup();
        result.storage.reverse(result.size);
        result
    }

    /// `reverse!`
    pub fn reverse_in_place(&mut self) -> CoreResult<()> {
        self.check_frozen()?;
        self.storage.reverse(self.size);
        Ok(())
    }

    /// `include?(value)`
    pub fn include(&self, host: &mut dyn Host, value: &Value) -> CoreResult<bool> {
        Ok(self.index_of(host, value)?.is_some())
    }

    /// `index(value)`
    pub fn index_of(&self, host: &mut dyn Host, value: &Value) -> CoreResult<Option<usize>> {
        if let Some(found) = self.packed_position(value) {
            return Ok(found);
        }
        for (i, element) in self.iter().enumerate() {
            if element.identical(value) || host.equal(&element, value)? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Search without the host; `None` when no fast path applies
    fn packed_position(&self, value: &Value) -> Option<Option<usize>> {
        match (&self.storage, value) {
            (ArrayStorage::Int(buf), Value::SmallInt(x)) => Some(
                i32::try_from(*x)
                    .ok()
                    .and_then(|x| buf[..self.size].iter().position(|e| *e == x)),
            ),
            (ArrayStorage::Long(buf), Value::SmallInt(x)) => {
                Some(buf[..self.size].iter().position(|e| e == x))
            }
            (ArrayStorage::Float(buf), Value::Float(x)) => Some(
                buf[..self.size]
                    .iter()
                    .position(|e| e.to_bits() == x.to_bits() || e == x),
            ),
            _ => None,
        }
    }

    /// `sort`
    pub fn sort(&self, host: &mut dyn Host) -> CoreResult<RubyArray> {
        let mut result = self.dup();
        result.sort_storage(host)?;
        Ok(result)
    }

    /// `sort!`
    pub fn sort_in_place(&mut self, host: &mut dyn Host) -> CoreResult<()> {
        self.check_frozen()?;
        self.sort_storage(host)
    }

    fn sort_storage(&mut self, host: &mut dyn Host) -> CoreResult<()> {
        let size = self.size;
        match &mut self.storage {
            ArrayStorage::Empty => Ok(()),
            ArrayStorage::Int(buf) => {
                buf[..size].sort_unstable();
                Ok(())
            }
            ArrayStorage::Long(buf) => {
                buf[..size].sort_unstable();
                Ok(())
            }
            ArrayStorage::Float(buf) => {
                reject_nan(&buf[..size])?;
                buf[..size].sort_by(f64::total_cmp);
                Ok(())
            }
            ArrayStorage::Object(buf) => {
                let values = buf[..size].to_vec();
                let sorted = merge_sort(values, &mut |a, b| compare_strict(host, a, b))?;
                for (slot, value) in buf.iter_mut().zip(sorted) {
                    *slot = value;
                }
                Ok(())
            }
        }
    }

    /// `min`; nil when empty
    pub fn min(&self, host: &mut dyn Host) -> CoreResult<Value> {
        self.extreme(host, Ordering::Less)
    }

    /// `max`; nil when empty
    pub fn max(&self, host: &mut dyn Host) -> CoreResult<Value> {
        self.extreme(host, Ordering::Greater)
    }

    fn extreme(&self, host: &mut dyn Host, wanted: Ordering) -> CoreResult<Value> {
        let pick_min = wanted == Ordering::Less;
        match &self.storage {
            ArrayStorage::Int(buf) => {
                let it = buf[..self.size].iter().copied();
                let best = if pick_min { it.min() } else { it.max() };
                Ok(best.map_or(Value::Nil, |x| Value::int(i64::from(x))))
            }
            ArrayStorage::Long(buf) => {
                let it = buf[..self.size].iter().copied();
                let best = if pick_min { it.min() } else { it.max() };
                Ok(best.map_or(Value::Nil, Value::int))
            }
            ArrayStorage::Float(buf) => {
                let slice = &buf[..self.size];
                reject_nan(slice)?;
                let best = slice.iter().copied().reduce(|a, b| {
                    if b.partial_cmp(&a) == Some(wanted) {
                        b
                    } else {
                        a
                    }
                });
                Ok(best.map_or(Value::Nil, Value::float))
            }
            _ => {
                let mut best: Option<Value> = None;
                for element in self.iter() {
                    best = match best {
                        None => Some(element),
                        Some(current) => {
                            if compare_strict(host, &element, &current)? == wanted {
                                Some(element)
                            } else {
                                Some(current)
                            }
                        }
                    };
                }
                Ok(best.unwrap_or(Value::Nil))
            }
        }
    }

    /// `dup`: a fresh, unfrozen copy with its own buffer
    pub fn dup(&self) -> RubyArray {
        self.sibling_with(self.storage.copy_range(0, self.size), self.size)
    }

    /// `replace(other)`
    pub fn replace(&mut self, other: &RubyArray) -> CoreResult<()> {
        self.check_frozen()?;
        self.storage = other.storage.copy_range(0, other.size);
        self.size = other.size;
        Ok(())
    }
}

fn reject_nan(values: &[f64]) -> CoreResult<()> {
    if values.iter().any(|f| f.is_nan()) {
        return Err(CoreError::ComparisonFailed {
            left: "Float",
            right: "Float",
        });
    }
    Ok(())
}

/// Stable merge sort with a fallible comparator
///
/// `slice::sort_by` may panic when `<=>` is not a total order, and user code
/// gives no such guarantee.
fn merge_sort<F>(mut values: Vec<Value>, cmp: &mut F) -> CoreResult<Vec<Value>>
where
    F: FnMut(&Value, &Value) -> CoreResult<Ordering>,
{
    let len = values.len();
    if len <= 8 {
        for i in 1..len {
            let mut j = i;
            while j > 0 && cmp(&values[j - 1], &values[j])? == Ordering::Greater {
                values.swap(j - 1, j);
                j -= 1;
            }
        }
        return Ok(values);
    }
    let right = values.split_off(len / 2);
    let left = merge_sort(values, cmp)?;
    let right = merge_sort(right, cmp)?;

    let mut merged = Vec::with_capacity(len);
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if cmp(&right[j], &left[i])? == Ordering::Less {
            merged.push(right[j].clone());
            j += 1;
        } else {
            merged.push(left[i].clone());
            i += 1;
        }
    }
    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    Ok(merged)
}

/// Set of values under the host's `hash`/`eql?`
#[derive(Default)]
struct SeenSet {
    buckets: FxHashMap<u64, Vec<Value>>,
}

impl SeenSet {
    fn from_values(host: &mut dyn Host, values: impl Iterator<Item = Value>) -> CoreResult<Self> {
        let mut set = SeenSet::default();
        for value in values {
            set.insert(host, &value)?;
        }
        Ok(set)
    }

    fn contains(&self, host: &mut dyn Host, value: &Value) -> CoreResult<bool> {
        let hash = host.hash(value)?;
        if let Some(bucket) = self.buckets.get(&hash) {
            for seen in bucket {
                if host.eql(seen, value)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Add `value`; `false` if an `eql?` value was already present
    fn insert(&mut self, host: &mut dyn Host, value: &Value) -> CoreResult<bool> {
        let hash = host.hash(value)?;
        let bucket = self.buckets.entry(hash).or_default();
        for seen in bucket.iter() {
            if host.eql(seen, value)? {
                return Ok(false);
            }
        }
        bucket.push(value.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_value::{ClassHandle, DefaultHost};

    fn array(values: Vec<Value>) -> RubyArray {
        RubyArray::from_values(ClassHandle::default(), values)
    }

    fn ints(values: &[i64]) -> RubyArray {
        array(values.iter().copied().map(Value::int).collect())
    }

    fn to_ints(array: &RubyArray) -> Vec<i64> {
        array.iter().filter_map(|v| v.as_fixnum()).collect()
    }

    #[test]
    fn test_pop_and_shift() {
        let mut a = ints(&[1, 2, 3, 4, 5]);
        assert_eq!(a.pop().unwrap(), Some(Value::int(5)));
        assert_eq!(a.shift().unwrap(), Some(Value::int(1)));
        assert_eq!(to_ints(&a.pop_n(2).unwrap()), vec![3, 4]);
        assert_eq!(to_ints(&a), vec![2]);
        assert_eq!(to_ints(&a.shift_n(10).unwrap()), vec![2]);
        assert!(a.is_empty());
        assert_eq!(a.pop().unwrap(), None);
        assert_eq!(a.pop_n(-1).unwrap_err(), CoreError::NegativeSize(-1));
    }

    #[test]
    fn test_insert_negative_index() {
        let mut a = ints(&[1, 2, 3]);
        a.insert(-2, vec![Value::int(9)]).unwrap();
        assert_eq!(to_ints(&a), vec![1, 2, 9, 3]);
        a.insert(-1, vec![Value::int(7)]).unwrap();
        assert_eq!(to_ints(&a), vec![1, 2, 9, 3, 7]);
        assert!(matches!(
            a.insert(-7, vec![Value::int(0)]),
            Err(CoreError::IndexTooSmall { minimum: -6, .. })
        ));
    }

    #[test]
    fn test_insert_past_end_pads() {
        let mut a = ints(&[1]);
        a.insert(3, vec![Value::int(4)]).unwrap();
        assert_eq!(
            a.to_vec(),
            vec![Value::int(1), Value::Nil, Value::Nil, Value::int(4)]
        );
    }

    #[test]
    fn test_unshift_keeps_packed() {
        let mut a = ints(&[3, 4]);
        a.unshift(vec![Value::int(1), Value::int(2)]).unwrap();
        assert_eq!(a.storage_kind(), StorageKind::Int);
        assert_eq!(to_ints(&a), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_delete_and_delete_at() {
        let mut host = DefaultHost;
        let mut a = array(vec![Value::int(1), Value::float(1.0), Value::int(2), Value::Nil]);
        let removed = a.delete(&mut host, &Value::int(1)).unwrap();
        assert_eq!(removed, Some(Value::float(1.0)));
        assert_eq!(a.to_vec(), vec![Value::int(2), Value::Nil]);
        assert_eq!(a.delete_at(-1).unwrap(), Some(Value::Nil));
        assert_eq!(a.delete_at(5).unwrap(), None);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_slice_edges() {
        let a = ints(&[1, 2, 3]);
        assert_eq!(to_ints(&a.slice(1, 5).unwrap()), vec![2, 3]);
        assert!(a.slice(3, 1).unwrap().is_empty());
        assert!(a.slice(4, 1).is_none());
        assert!(a.slice(0, -1).is_none());
        assert_eq!(to_ints(&a.slice(-2, 1).unwrap()), vec![2]);
    }

    #[test]
    fn test_fill() {
        let mut a = ints(&[1, 2, 3]);
        a.fill(Value::int(0), Some(1), Some(3)).unwrap();
        assert_eq!(to_ints(&a), vec![1, 0, 0, 0]);
        assert_eq!(a.storage_kind(), StorageKind::Int);
        a.fill(Value::float(0.5), Some(-1), None).unwrap();
        assert_eq!(a.storage_kind(), StorageKind::Object);
        assert_eq!(a.get(3), Value::float(0.5));
    }

    #[test]
    fn test_set_operations() {
        let mut host = DefaultHost;
        let a = ints(&[1, 1, 2, 3]);
        let b = ints(&[2, 4]);
        assert_eq!(to_ints(&a.uniq(&mut host).unwrap()), vec![1, 2, 3]);
        assert_eq!(to_ints(&a.union(&mut host, &b).unwrap()), vec![1, 2, 3, 4]);
        assert_eq!(to_ints(&a.intersection(&mut host, &b).unwrap()), vec![2]);
        assert_eq!(to_ints(&a.minus(&mut host, &b).unwrap()), vec![1, 1, 3]);
        let mixed = array(vec![Value::int(1), Value::float(1.0)]);
        assert_eq!(mixed.uniq(&mut host).unwrap().len(), 2);
    }

    #[test]
    fn test_plus_times_concat() {
        let a = ints(&[1, 2]);
        let b = array(vec![Value::float(3.0)]);
        let sum = a.plus(&b).unwrap();
        assert_eq!(sum.storage_kind(), StorageKind::Object);
        assert_eq!(sum.len(), 3);
        assert_eq!(to_ints(&a.times(3).unwrap()), vec![1, 2, 1, 2, 1, 2]);
        assert_eq!(a.times(-1).unwrap_err(), CoreError::NegativeLength(-1));
        let mut c = ints(&[5]);
        c.concat(&a).unwrap();
        assert_eq!(c.storage_kind(), StorageKind::Int);
        assert_eq!(to_ints(&c), vec![5, 1, 2]);
    }

    #[test]
    fn test_sort_min_max() {
        let mut host = DefaultHost;
        let a = ints(&[3, 1, 2]);
        assert_eq!(to_ints(&a.sort(&mut host).unwrap()), vec![1, 2, 3]);
        assert_eq!(a.min(&mut host).unwrap(), Value::int(1));
        assert_eq!(a.max(&mut host).unwrap(), Value::int(3));

        let mixed: Vec<Value> = (0..20)
            .rev()
            .map(|i| if i % 2 == 0 { Value::int(i) } else { Value::float(i as f64) })
            .collect();
        let sorted = array(mixed).sort(&mut host).unwrap();
        let floats: Vec<f64> = sorted.iter().filter_map(|v| v.to_f64()).collect();
        assert!(floats.windows(2).all(|w| w[0] <= w[1]));

        let bad = array(vec![Value::int(1), Value::Nil]);
        assert!(matches!(
            bad.sort(&mut host),
            Err(CoreError::ComparisonFailed { .. })
        ));
        let nan = array(vec![Value::float(1.0), Value::float(f64::NAN)]);
        assert!(nan.max(&mut host).is_err());
        assert_eq!(ints(&[]).min(&mut host).unwrap(), Value::Nil);
    }

    #[test]
    fn test_include_and_index() {
        let mut host = DefaultHost;
        let a = ints(&[4, 5, 6]);
        assert!(a.include(&mut host, &Value::int(5)).unwrap());
        assert!(a.include(&mut host, &Value::float(6.0)).unwrap());
        assert!(!a.include(&mut host, &Value::int(1 << 40)).unwrap());
        assert_eq!(a.index_of(&mut host, &Value::int(6)).unwrap(), Some(2));
    }

    #[test]
    fn test_compact_reverse_dup_replace() {
        let a = array(vec![Value::Nil, Value::int(1), Value::Nil, Value::int(2)]);
        assert_eq!(to_ints(&a.compact()), vec![1, 2]);
        assert_eq!(a.reverse().get(0), Value::int(2));

        let mut frozen = ints(&[1]);
        frozen.freeze();
        let copy = frozen.dup();
        assert!(!copy.is_frozen());
        assert_eq!(frozen.replace(&a).unwrap_err(), CoreError::Frozen("Array"));

        let mut target = ints(&[9]);
        target.replace(&a).unwrap();
        assert_eq!(target.len(), 4);
    }

    #[test]
    fn test_huge_lengths_fail_without_allocating() {
        let mut a = ints(&[1]);
        assert_eq!(
            a.insert(i64::MAX, vec![Value::int(2)]),
            Err(CoreError::IndexTooBig(i64::MAX))
        );
        assert_eq!(
            a.fill(Value::int(0), Some(0), Some(i64::MAX)),
            Err(CoreError::SizeTooBig(i64::MAX))
        );
        assert_eq!(
            a.fill(Value::int(0), Some(i64::MAX), Some(1)),
            Err(CoreError::IndexTooBig(i64::MAX))
        );
        assert_eq!(to_ints(&a), vec![1]);
        assert_eq!(a.storage_kind(), StorageKind::Int);
        assert_eq!(a.times(i64::MAX).unwrap_err(), CoreError::SizeTooBig(i64::MAX));
        let half = i64::MAX / 2 + 1;
        assert_eq!(ints(&[1, 2]).times(half).unwrap_err(), CoreError::SizeTooBig(half));
    }

    #[test]
    fn test_times_on_empty_returns_at_once() {
        let empty = ints(&[]);
        let repeated = empty.times(i64::MAX).unwrap();
        assert!(repeated.is_empty());
        assert_eq!(ints(&[1]).times(0).unwrap().len(), 0);
        let floats = array(vec![Value::float(0.5)]).times(4).unwrap();
        assert_eq!(floats.storage_kind(), StorageKind::Float);
        assert_eq!(floats.to_vec(), vec![Value::float(0.5); 4]);
    }

    #[test]
    fn test_long_storage_absorbs_small_fixnums() {
        let long = || ints(&[1 << 40]);
        let mut pushed = long();
        pushed.push(Value::int(1)).unwrap();
        let mut unshifted = long();
        unshifted.unshift(vec![Value::int(2)]).unwrap();
        let mut inserted = long();
        inserted.insert(1, vec![Value::int(3)]).unwrap();
        let mut concatenated = long();
        concatenated.concat(&ints(&[4])).unwrap();
        for a in [&pushed, &unshifted, &inserted, &concatenated] {
            assert_eq!(a.storage_kind(), StorageKind::Long);
        }
        assert_eq!(to_ints(&unshifted), vec![2, 1 << 40]);
        assert_eq!(to_ints(&inserted), vec![1 << 40, 3]);

        let mut narrow = ints(&[1]);
        narrow.unshift(vec![Value::int(1 << 40)]).unwrap();
        assert_eq!(narrow.storage_kind(), StorageKind::Object);
    }

    #[test]
    fn test_stored_nan_is_found_by_identity() {
        let mut host = DefaultHost;
        let packed = array(vec![Value::float(1.0), Value::float(f64::NAN)]);
        assert_eq!(packed.storage_kind(), StorageKind::Float);
        assert_eq!(packed.index_of(&mut host, &Value::float(f64::NAN)).unwrap(), Some(1));
        let boxed = array(vec![Value::Nil, Value::float(f64::NAN)]);
        assert!(boxed.include(&mut host, &Value::float(f64::NAN)).unwrap());
        assert!(!packed.include(&mut host, &Value::float(-f64::NAN)).unwrap());
    }
}
