//! Bucketed hash storage
//!
//! Entries live in a slab and are addressed by [`EntryId`]. Each entry sits on
//! two lists at once:
//!
//! ```text
//! buckets[i] ─► e3 ─► e7 ─► ∅          (next_in_lookup, singly linked)
//! first ─► e1 ⇄ e3 ⇄ e4 ⇄ e7 ◄─ last   (sequence, doubly linked)
//! ```
//!
//! The lookup chains partition exactly the entries on the sequence list.
//! Updating an existing key never moves it in the sequence.

use garnet_value::{CoreResult, Value};

use super::KeyMatcher;

/// Bucket counts, each the first prime past a power of two
pub const MRI_PRIMES: [usize; 28] = [
    8 + 3,
    16 + 3,
    32 + 5,
    64 + 3,
    128 + 3,
    256 + 27,
    512 + 9,
    1024 + 9,
    2048 + 5,
    4096 + 3,
    8192 + 27,
    16384 + 43,
    32768 + 3,
    65536 + 45,
    131072 + 29,
    262144 + 3,
    524288 + 21,
    1048576 + 7,
    2097152 + 17,
    4194304 + 15,
    8388608 + 9,
    16777216 + 43,
    33554432 + 35,
    67108864 + 15,
    134217728 + 29,
    268435456 + 3,
    536870912 + 11,
    1073741824 + 85,
];

/// Buckets allocated per prime step
pub const OVERALLOCATE_FACTOR: usize = 2;

/// Bucket count for a table about to hold `n` entries
pub fn capacity_greater_than(n: usize) -> usize {
    for prime in MRI_PRIMES {
        if prime > n {
            return prime * OVERALLOCATE_FACTOR;
        }
    }
    MRI_PRIMES[MRI_PRIMES.len() - 1] * OVERALLOCATE_FACTOR
}

#[inline]
fn bucket_index(hash: u64, buckets: usize) -> usize {
    (hash % buckets as u64) as usize
}

/// Slab index of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(u32);

impl EntryId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One key/value pair with its list links
#[derive(Debug, Clone)]
pub struct Entry {
    hash: u64,
    key: Value,
    value: Value,
    next_in_lookup: Option<EntryId>,
    prev_in_sequence: Option<EntryId>,
    next_in_sequence: Option<EntryId>,
}

impl Entry {
    /// Key of this entry
    pub fn key(&self) -> &Value {
        &self.key
    }

    /// Value of this entry
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Stored hash of the key
    pub fn hash(&self) -> u64 {
        self.hash
    }
}

/// Where a key is, or would go
///
/// `previous` is the chain predecessor of `entry` when found, or the chain
/// tail when not, so both insert and delete avoid a second scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupResult {
    /// Bucket the key hashes to
    pub index: usize,
    /// Entry before `entry` in the bucket chain
    pub previous: Option<EntryId>,
    /// Matching entry, if any
    pub entry: Option<EntryId>,
}

/// Bucket table with insertion-order sequencing
#[derive(Debug, Clone)]
pub struct BucketTable {
    buckets: Vec<Option<EntryId>>,
    slots: Vec<Entry>,
    free: Vec<EntryId>,
    first: Option<EntryId>,
    last: Option<EntryId>,
    len: usize,
}

impl BucketTable {
    /// Table sized to hold `expected` entries
    pub fn with_capacity_for(expected: usize) -> Self {
        Self {
            buckets: vec![None; capacity_greater_than(expected)],
            slots: Vec::with_capacity(expected),
            free: Vec::new(),
            first: None,
            last: None,
            len: 0,
        }
    }

    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the table is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// First entry in insertion order
    pub fn first(&self) -> Option<EntryId> {
        self.first
    }

    /// Last entry in insertion order
    pub fn last(&self) -> Option<EntryId> {
        self.last
    }

    /// Borrow an entry
    #[inline]
    pub fn entry(&self, id: EntryId) -> &Entry {
        &self.slots[id.index()]
    }

    #[inline]
    fn entry_mut(&mut self, id: EntryId) -> &mut Entry {
        &mut self.slots[id.index()]
    }

    /// Walk the bucket chain for `key`
    pub fn lookup(&self, keys: &mut KeyMatcher<'_>, hash: u64, key: &Value) -> CoreResult<LookupResult> {
        let index = bucket_index(hash, self.buckets.len());
        let mut previous = None;
        let mut cursor = self.buckets[index];
        while let Some(id) = cursor {
            let entry = self.entry(id);
            if entry.hash == hash && keys.eql(&entry.key, key)? {
                return Ok(LookupResult {
                    index,
                    previous,
                    entry: Some(id),
                });
            }
            previous = Some(id);
            cursor = entry.next_in_lookup;
        }
        Ok(LookupResult {
            index,
            previous,
            entry: None,
        })
    }

    /// Insert or update; returns the replaced value on update
    ///
    /// The table re-grows once the entry count would pass
    /// `load_factor * bucket_count`.
    pub fn insert(
        &mut self,
        keys: &mut KeyMatcher<'_>,
        hash: u64,
        key: Value,
        value: Value,
        load_factor: f64,
    ) -> CoreResult<Option<Value>> {
        let mut found = self.lookup(keys, hash, &key)?;
        if let Some(id) = found.entry {
            let old = std::mem::replace(&mut self.entry_mut(id).value, value);
            return Ok(Some(old));
        }
        if (self.len + 1) as f64 > self.buckets.len() as f64 * load_factor {
            self.grow(capacity_greater_than(self.len + 1));
            found = self.chain_tail(hash);
        }
        self.link_new(found, hash, key, value);
        Ok(None)
    }

    /// Append an entry whose key is known to be absent
    pub fn append_new(&mut self, hash: u64, key: Value, value: Value) -> EntryId {
        let tail = self.chain_tail(hash);
        self.link_new(tail, hash, key, value)
    }

    fn chain_tail(&self, hash: u64) -> LookupResult {
        let index = bucket_index(hash, self.buckets.len());
        let mut previous = None;
        let mut cursor = self.buckets[index];
        while let Some(id) = cursor {
            previous = Some(id);
            cursor = self.entry(id).next_in_lookup;
        }
        LookupResult {
            index,
            previous,
            entry: None,
        }
    }

    fn link_new(&mut self, at: LookupResult, hash: u64, key: Value, value: Value) -> EntryId {
        let entry = Entry {
            hash,
            key,
            value,
            next_in_lookup: None,
            prev_in_sequence: self.last,
            next_in_sequence: None,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id.index()] = entry;
                id
            }
            None => {
                self.slots.push(entry);
                EntryId((self.slots.len() - 1) as u32)
            }
        };

        match at.previous {
            None => self.buckets[at.index] = Some(id),
            Some(prev) => self.entry_mut(prev).next_in_lookup = Some(id),
        }

        match self.last {
            None => self.first = Some(id),
            Some(last) => self.entry_mut(last).next_in_sequence = Some(id),
        }
        self.last = Some(id);
        self.len += 1;
        id
    }

    /// Unlink a found entry from both lists and free it
    pub fn remove(&mut self, found: LookupResult) -> Option<(Value, Value)> {
        let id = found.entry?;
        let (next_in_lookup, prev_seq, next_seq) = {
            let entry = self.entry(id);
            (entry.next_in_lookup, entry.prev_in_sequence, entry.next_in_sequence)
        };

        match prev_seq {
            None => self.first = next_seq,
            Some(prev) => self.entry_mut(prev).next_in_sequence = next_seq,
        }
        match next_seq {
            None => self.last = prev_seq,
            Some(next) => self.entry_mut(next).prev_in_sequence = prev_seq,
        }

        match found.previous {
            None => self.buckets[found.index] = next_in_lookup,
            Some(prev) => self.entry_mut(prev).next_in_lookup = next_in_lookup,
        }

        self.len -= 1;
        self.free.push(id);
        let slot = self.entry_mut(id);
        slot.next_in_lookup = None;
        slot.prev_in_sequence = None;
        slot.next_in_sequence = None;
        Some((std::mem::take(&mut slot.key), std::mem::take(&mut slot.value)))
    }

    /// Remove `key` if present
    pub fn delete(&mut self, keys: &mut KeyMatcher<'_>, hash: u64, key: &Value) -> CoreResult<Option<(Value, Value)>> {
        let found = self.lookup(keys, hash, key)?;
        Ok(self.remove(found))
    }

    /// Remove an entry by id, finding its chain predecessor by identity
    pub fn remove_entry(&mut self, id: EntryId) -> Option<(Value, Value)> {
        let index = bucket_index(self.entry(id).hash, self.buckets.len());
        let mut previous = None;
        let mut cursor = self.buckets[index];
        while let Some(current) = cursor {
            if current == id {
                return self.remove(LookupResult {
                    index,
                    previous,
                    entry: Some(id),
                });
            }
            previous = Some(current);
            cursor = self.entry(current).next_in_lookup;
        }
        None
    }

    /// Remove the oldest entry
    pub fn shift(&mut self) -> Option<(Value, Value)> {
        let first = self.first?;
        self.remove_entry(first)
    }

    /// Replace the value of an existing entry
    pub fn set_value(&mut self, id: EntryId, value: Value) -> Value {
        std::mem::replace(&mut self.entry_mut(id).value, value)
    }

    /// Drop every entry, keeping the bucket count
    pub fn clear(&mut self) {
        self.buckets.fill(None);
        self.slots.clear();
        self.free.clear();
        self.first = None;
        self.last = None;
        self.len = 0;
    }

    /// Entry ids in insertion order
    pub fn ids(&self) -> SequenceIds<'_> {
        SequenceIds {
            table: self,
            cursor: self.first,
        }
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.ids().map(move |id| self.entry(id))
    }

    /// Rebuild the bucket chains with `buckets` buckets, in sequence order
    fn grow(&mut self, buckets: usize) {
        tracing::trace!(from = self.buckets.len(), to = buckets, len = self.len, "growing hash buckets");
        self.buckets = vec![None; buckets];
        self.relink();
    }

    fn relink(&mut self) {
        self.buckets.fill(None);
        let mut tails: Vec<Option<EntryId>> = vec![None; self.buckets.len()];
        let mut cursor = self.first;
        while let Some(id) = cursor {
            let (hash, next) = {
                let entry = self.entry_mut(id);
                entry.next_in_lookup = None;
                (entry.hash, entry.next_in_sequence)
            };
            let index = bucket_index(hash, self.buckets.len());
            match tails[index] {
                None => self.buckets[index] = Some(id),
                Some(tail) => self.entry_mut(tail).next_in_lookup = Some(id),
            }
            tails[index] = Some(id);
            cursor = next;
        }
    }

    /// Check both lists agree; used by tests
    pub fn verify(&self) -> bool {
        let mut in_sequence = 0;
        let mut previous = None;
        let mut cursor = self.first;
        while let Some(id) = cursor {
            let entry = self.entry(id);
            if entry.prev_in_sequence != previous {
                return false;
            }
            previous = Some(id);
            cursor = entry.next_in_sequence;
            in_sequence += 1;
        }
        if previous != self.last {
            return false;
        }
        let mut in_buckets = 0;
        for (index, head) in self.buckets.iter().enumerate() {
            let mut cursor = *head;
            while let Some(id) = cursor {
                let entry = self.entry(id);
                if bucket_index(entry.hash, self.buckets.len()) != index {
                    return false;
                }
                in_buckets += 1;
                cursor = entry.next_in_lookup;
            }
        }
        in_sequence == self.len && in_buckets == self.len
    }
}

/// Iterator over entry ids in insertion order
pub struct SequenceIds<'a> {
    table: &'a BucketTable,
    cursor: Option<EntryId>,
}

impl Iterator for SequenceIds<'_> {
    type Item = EntryId;

    fn next(&mut self) -> Option<EntryId> {
        let id = self.cursor?;
        self.cursor = self.table.entry(id).next_in_sequence;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_value::DefaultHost;

    fn keys_of(table: &BucketTable) -> Vec<i64> {
        table.iter().filter_map(|e| e.key().as_fixnum()).collect()
    }

    #[test]
    fn test_capacity_greater_than() {
        assert_eq!(capacity_greater_than(0), 22);
        assert_eq!(capacity_greater_than(9), 22);
        assert_eq!(capacity_greater_than(11), 38);
        assert_eq!(capacity_greater_than(100), 262);
    }

    #[test]
    fn test_insert_update_keeps_position() {
        let mut host = DefaultHost;
        let mut keys = KeyMatcher::new(&mut host, false);
        let mut table = BucketTable::with_capacity_for(4);
        for i in 0..5 {
            let h = keys.hash(&Value::int(i)).unwrap();
            table.insert(&mut keys, h, Value::int(i), Value::int(i * 10), 0.75).unwrap();
        }
        let h = keys.hash(&Value::int(0)).unwrap();
        let old = table
            .insert(&mut keys, h, Value::int(0), Value::int(-1), 0.75)
            .unwrap();
        assert_eq!(old, Some(Value::int(0)));
        assert_eq!(keys_of(&table), vec![0, 1, 2, 3, 4]);
        assert!(table.verify());
    }

    #[test]
    fn test_delete_patches_both_lists() {
        let mut host = DefaultHost;
        let mut keys = KeyMatcher::new(&mut host, false);
        let mut table = BucketTable::with_capacity_for(0);
        // every key lands in one bucket
        for i in 0..6u64 {
            table.append_new(i * 22, Value::int(i as i64), Value::Nil);
        }
        let removed = table.delete(&mut keys, 44, &Value::int(2)).unwrap();
        assert_eq!(removed, Some((Value::int(2), Value::Nil)));
        assert_eq!(keys_of(&table), vec![0, 1, 3, 4, 5]);
        assert!(table.verify());
        assert_eq!(table.shift(), Some((Value::int(0), Value::Nil)));
        assert!(table.verify());
        assert_eq!(keys_of(&table), vec![1, 3, 4, 5]);
    }

    #[test]
    fn test_grows_past_load_factor() {
        let mut host = DefaultHost;
        let mut keys = KeyMatcher::new(&mut host, false);
        let mut table = BucketTable::with_capacity_for(0);
        let initial = table.bucket_count();
        for i in 0..100 {
            let h = keys.hash(&Value::int(i)).unwrap();
            table.insert(&mut keys, h, Value::int(i), Value::Nil, 0.75).unwrap();
        }
        assert!(table.bucket_count() > initial);
        assert_eq!(table.len(), 100);
        assert_eq!(keys_of(&table), (0..100).collect::<Vec<_>>());
        assert!(table.verify());
    }

    #[test]
    fn test_slots_are_reused() {
        let mut table = BucketTable::with_capacity_for(0);
        let a = table.append_new(1, Value::int(1), Value::Nil);
        table.remove_entry(a);
        let b = table.append_new(2, Value::int(2), Value::Nil);
        assert_eq!(a, b);
        assert!(table.verify());
    }
}
