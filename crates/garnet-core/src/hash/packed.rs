//! Packed hash storage
//!
//! Up to a handful of pairs kept in insertion order in one flat buffer. Each
//! entry carries its key's hash, so a lookup only calls `eql?` on entries
//! whose hashes already match.

use garnet_value::{CoreResult, Value};

use super::KeyMatcher;

/// One packed pair
#[derive(Debug, Clone)]
pub struct PackedEntry {
    pub(crate) hash: u64,
    pub(crate) key: Value,
    pub(crate) value: Value,
}

impl PackedEntry {
    /// Key of this pair
    pub fn key(&self) -> &Value {
        &self.key
    }

    /// Value of this pair
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Flat, insertion-ordered pair storage
#[derive(Debug, Clone, Default)]
pub struct PackedPairs {
    entries: Vec<PackedEntry>,
}

impl PackedPairs {
    /// Empty storage sized for `max` pairs
    pub fn with_capacity(max: usize) -> Self {
        Self {
            entries: Vec::with_capacity(max),
        }
    }

    /// Number of pairs
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no pairs
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of `key`, comparing stored hashes before `eql?`
    pub fn find(&self, keys: &mut KeyMatcher<'_>, hash: u64, key: &Value) -> CoreResult<Option<usize>> {
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.hash == hash && keys.eql(&entry.key, key)? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Pair at `index`
    #[inline]
    pub fn entry(&self, index: usize) -> &PackedEntry {
        &self.entries[index]
    }

    /// Replace the value at `index`, keeping its position
    pub fn set_value(&mut self, index: usize, value: Value) -> Value {
        std::mem::replace(&mut self.entries[index].value, value)
    }

    /// Append a new pair; the caller checks the key is absent
    pub fn push(&mut self, hash: u64, key: Value, value: Value) {
        self.entries.push(PackedEntry { hash, key, value });
    }

    /// Remove the pair at `index`, closing the gap to keep order
    pub fn remove(&mut self, index: usize) -> PackedEntry {
        self.entries.remove(index)
    }

    /// Drop every pair
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &PackedEntry> + '_ {
        self.entries.iter()
    }

    /// Take every pair out, in order
    pub fn into_entries(self) -> Vec<PackedEntry> {
        self.entries
    }

    /// Remove the pairs at `indices`, which must be ascending
    pub fn remove_indices(&mut self, indices: &[usize]) {
        for &index in indices.iter().rev() {
            self.entries.remove(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_value::DefaultHost;

    #[test]
    fn test_find_checks_hash_then_eql() {
        let mut host = DefaultHost;
        let mut keys = KeyMatcher::new(&mut host, false);
        let mut pairs = PackedPairs::with_capacity(8);
        let one = Value::int(1);
        let h = keys.hash(&one).unwrap();
        pairs.push(h, one.clone(), Value::int(10));
        assert_eq!(pairs.find(&mut keys, h, &one).unwrap(), Some(0));
        let float = Value::float(1.0);
        let hf = keys.hash(&float).unwrap();
        assert_eq!(pairs.find(&mut keys, hf, &float).unwrap(), None);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut pairs = PackedPairs::default();
        for i in 0..4 {
            pairs.push(i as u64, Value::int(i), Value::Nil);
        }
        pairs.remove(1);
        let order: Vec<_> = pairs.iter().map(|e| e.key().clone()).collect();
        assert_eq!(order, vec![Value::int(0), Value::int(2), Value::int(3)]);
    }
}
