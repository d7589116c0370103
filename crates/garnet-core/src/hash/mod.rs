//! Ruby Hash container
//!
//! Storage moves one way through three forms:
//!
//! ```text
//! Empty ──► Packed (≤ hash_packed_max pairs) ──► Buckets
//! ```
//!
//! Both non-empty forms iterate in first-insertion order. Keys are matched
//! with the host's `hash`/`eql?`, or by identity once
//! [`RubyHash::compare_by_identity`] is set.

pub mod buckets;
pub mod packed;

use std::fmt;
use std::sync::Arc;

use garnet_value::{ClassHandle, CoreError, CoreResult, Host, Value};

use crate::flow::{run_block, Completion, Flow, Step};
use crate::options::CoreOptions;
use buckets::{BucketTable, EntryId};
use packed::PackedPairs;

pub(crate) const CLASS_NAME: &str = "Hash";

/// Block run for a missing key: `Hash.new { |hash, key| ... }`
pub type DefaultProc =
    Arc<dyn Fn(&mut RubyHash, &Value, &mut dyn Host) -> CoreResult<Value> + Send + Sync>;

/// Key hashing and equality for one operation
///
/// Either the host's `hash`/`eql?`, or object identity.
pub struct KeyMatcher<'h> {
    host: &'h mut dyn Host,
    identity: bool,
}

impl<'h> KeyMatcher<'h> {
    /// Matcher over `host`; `identity` switches to `equal?` semantics
    pub fn new(host: &'h mut dyn Host, identity: bool) -> Self {
        Self { host, identity }
    }

    /// Hash a key
    pub fn hash(&mut self, key: &Value) -> CoreResult<u64> {
        if self.identity {
            Ok(key.identity_hash())
        } else {
            self.host.hash(key)
        }
    }

    /// Compare a stored key with a lookup key
    pub fn eql(&mut self, stored: &Value, key: &Value) -> CoreResult<bool> {
        if self.identity {
            Ok(stored.identical(key))
        } else {
            self.host.eql(stored, key)
        }
    }
}

/// Which form a hash's storage is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashStorageKind {
    /// No storage
    Empty,
    /// Flat pair buffer
    Packed,
    /// Bucket table
    Buckets,
}

impl HashStorageKind {
    /// Short name for logs
    pub const fn name(self) -> &'static str {
        match self {
            HashStorageKind::Empty => "empty",
            HashStorageKind::Packed => "packed",
            HashStorageKind::Buckets => "buckets",
        }
    }
}

/// Hash backing storage
#[derive(Debug, Clone, Default)]
pub enum HashStorage {
    /// No pairs ever stored
    #[default]
    Empty,
    /// Few pairs, linear scan
    Packed(PackedPairs),
    /// Bucket table with sequence links
    Buckets(BucketTable),
}

impl HashStorage {
    /// Current form
    pub fn kind(&self) -> HashStorageKind {
        match self {
            HashStorage::Empty => HashStorageKind::Empty,
            HashStorage::Packed(_) => HashStorageKind::Packed,
            HashStorage::Buckets(_) => HashStorageKind::Buckets,
        }
    }

    /// Number of pairs
    pub fn len(&self) -> usize {
        match self {
            HashStorage::Empty => 0,
            HashStorage::Packed(p) => p.len(),
            HashStorage::Buckets(t) => t.len(),
        }
    }

    /// Whether there are no pairs
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutable Ruby hash
#[derive(Clone)]
pub struct RubyHash {
    class: ClassHandle,
    storage: HashStorage,
    default_value: Option<Value>,
    default_proc: Option<DefaultProc>,
    identity: bool,
    frozen: bool,
    packed_max: usize,
    load_factor: f64,
}

impl fmt::Debug for RubyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RubyHash")
            .field("class", &self.class)
            .field("storage", &self.storage)
            .field("default_value", &self.default_value)
            .field("default_proc", &self.default_proc.is_some())
            .field("identity", &self.identity)
            .field("frozen", &self.frozen)
            .finish()
    }
}

impl RubyHash {
    /// Empty hash with default limits
    pub fn new(class: ClassHandle) -> Self {
        Self::with_options(class, &CoreOptions::default())
    }

    /// Empty hash using the given limits
    pub fn with_options(class: ClassHandle, options: &CoreOptions) -> Self {
        Self {
            class,
            storage: HashStorage::Empty,
            default_value: None,
            default_proc: None,
            identity: false,
            frozen: false,
            packed_max: options.hash_packed_max.max(1),
            load_factor: options.bucket_load_factor,
        }
    }

    /// `Hash[pairs]`: later duplicates overwrite earlier values in place
    pub fn from_pairs(
        class: ClassHandle,
        host: &mut dyn Host,
        pairs: impl IntoIterator<Item = (Value, Value)>,
    ) -> CoreResult<Self> {
        Self::from_pairs_with_options(class, &CoreOptions::default(), host, pairs)
    }

    /// `Hash[pairs]` using the given limits
    pub fn from_pairs_with_options(
        class: ClassHandle,
        options: &CoreOptions,
        host: &mut dyn Host,
        pairs: impl IntoIterator<Item = (Value, Value)>,
    ) -> CoreResult<Self> {
        let mut hash = Self::with_options(class, options);
        for (key, value) in pairs {
            hash.set(host, key, value)?;
        }
        Ok(hash)
    }

    /// Empty hash sharing class and limits, without defaults
    fn sibling(&self) -> Self {
        Self {
            class: self.class,
            storage: HashStorage::Empty,
            default_value: None,
            default_proc: None,
            identity: self.identity,
            frozen: false,
            packed_max: self.packed_max,
            load_factor: self.load_factor,
        }
    }

    /// Logical class handle
    pub fn class(&self) -> ClassHandle {
        self.class
    }

    /// Number of pairs
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether there are no pairs
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current storage form
    pub fn storage_kind(&self) -> HashStorageKind {
        self.storage.kind()
    }

    /// Backing storage
    pub fn storage(&self) -> &HashStorage {
        &self.storage
    }

    pub(crate) fn storage_mut(&mut self) -> &mut HashStorage {
        &mut self.storage
    }

    /// Pairs the packed form holds before promotion
    pub fn packed_max(&self) -> usize {
        self.packed_max
    }

    pub(crate) fn load_factor(&self) -> f64 {
        self.load_factor
    }

    /// Whether keys are compared by identity
    pub fn is_compare_by_identity(&self) -> bool {
        self.identity
    }

    /// Key matcher for this hash's comparison mode
    pub fn matcher<'h>(&self, host: &'h mut dyn Host) -> KeyMatcher<'h> {
        KeyMatcher::new(host, self.identity)
    }

    /// Whether the hash is frozen
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// `freeze`
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub(crate) fn check_frozen(&self) -> CoreResult<()> {
        if self.frozen {
            Err(CoreError::Frozen(CLASS_NAME))
        } else {
            Ok(())
        }
    }

    /// Value for `key` without consulting defaults
    pub fn get(&self, host: &mut dyn Host, key: &Value) -> CoreResult<Option<Value>> {
        let mut keys = self.matcher(host);
        match &self.storage {
            HashStorage::Empty => Ok(None),
            HashStorage::Packed(p) => {
                let hash = keys.hash(key)?;
                Ok(p.find(&mut keys, hash, key)?
                    .map(|i| p.entry(i).value().clone()))
            }
            HashStorage::Buckets(t) => {
                let hash = keys.hash(key)?;
                let found = t.lookup(&mut keys, hash, key)?;
                Ok(found.entry.map(|id| t.entry(id).value().clone()))
            }
        }
    }

    /// `self[key]`: falls back to the default value, then the default proc
    pub fn index(&mut self, host: &mut dyn Host, key: &Value) -> CoreResult<Value> {
        match self.get(host, key)? {
            Some(value) => Ok(value),
            None => self.default_for(host, key),
        }
    }

    /// What a lookup of the missing `key` evaluates to
    pub fn default_for(&mut self, host: &mut dyn Host, key: &Value) -> CoreResult<Value> {
        if let Some(block) = self.default_proc.clone() {
            return block(self, key, host);
        }
        Ok(self.default_value.clone().unwrap_or(Value::Nil))
    }

    /// `key?(key)`
    pub fn contains_key(&self, host: &mut dyn Host, key: &Value) -> CoreResult<bool> {
        Ok(self.get(host, key)?.is_some())
    }

    /// `self[key] = value`
    ///
    /// An existing key keeps its position; a new key goes last.
    pub fn set(&mut self, host: &mut dyn Host, key: Value, value: Value) -> CoreResult<()> {
        self.check_frozen()?;
        let mut keys = KeyMatcher::new(host, self.identity);
        let hash = keys.hash(&key)?;
        match &mut self.storage {
            HashStorage::Empty => {
                let mut pairs = PackedPairs::with_capacity(self.packed_max);
                pairs.push(hash, key, value);
                self.storage = HashStorage::Packed(pairs);
            }
            HashStorage::Packed(pairs) => {
                if let Some(i) = pairs.find(&mut keys, hash, &key)? {
                    pairs.set_value(i, value);
                } else if pairs.len() < self.packed_max {
                    pairs.push(hash, key, value);
                } else {
                    self.promote_to_buckets(hash, key, value);
                }
            }
            HashStorage::Buckets(table) => {
                table.insert(&mut keys, hash, key, value, self.load_factor)?;
            }
        }
        Ok(())
    }

    /// Move a full packed buffer into a fresh bucket table, then add one pair
    pub(crate) fn promote_to_buckets(&mut self, hash: u64, key: Value, value: Value) {
        let pairs = match std::mem::take(&mut self.storage) {
            HashStorage::Packed(pairs) => pairs,
            other => {
                self.storage = other;
                return;
            }
        };
        let mut table = BucketTable::with_capacity_for(pairs.len() + 1);
        for entry in pairs.into_entries() {
            table.append_new(entry.hash, entry.key, entry.value);
        }
        table.append_new(hash, key, value);
        tracing::debug!(
            len = table.len(),
            buckets = table.bucket_count(),
            "hash promoted to buckets"
        );
        self.storage = HashStorage::Buckets(table);
    }

    /// `delete(key)`; the removed value, if the key was present
    pub fn delete(&mut self, host: &mut dyn Host, key: &Value) -> CoreResult<Option<Value>> {
        self.check_frozen()?;
        let mut keys = KeyMatcher::new(host, self.identity);
        match &mut self.storage {
            HashStorage::Empty => Ok(None),
            HashStorage::Packed(pairs) => {
                let hash = keys.hash(key)?;
                Ok(pairs
                    .find(&mut keys, hash, key)?
                    .map(|i| pairs.remove(i).value))
            }
            HashStorage::Buckets(table) => {
                let hash = keys.hash(key)?;
                Ok(table.delete(&mut keys, hash, key)?.map(|(_, v)| v))
            }
        }
    }

    /// `shift`: remove and return the oldest pair
    ///
    /// An empty hash yields `None`; the caller evaluates
    /// [`RubyHash::default_for`] with a nil key if it wants Ruby's result.
    pub fn shift(&mut self) -> CoreResult<Option<(Value, Value)>> {
        self.check_frozen()?;
        Ok(match &mut self.storage {
            HashStorage::Empty => None,
            HashStorage::Packed(pairs) => {
                if pairs.is_empty() {
                    None
                } else {
                    let entry = pairs.remove(0);
                    Some((entry.key, entry.value))
                }
            }
            HashStorage::Buckets(table) => table.shift(),
        })
    }

    /// `clear`; the storage form is kept
    pub fn clear(&mut self) -> CoreResult<()> {
        self.check_frozen()?;
        match &mut self.storage {
            HashStorage::Empty => {}
            HashStorage::Packed(pairs) => pairs.clear(),
            HashStorage::Buckets(table) => table.clear(),
        }
        Ok(())
    }

    /// Pairs in insertion order
    pub fn pairs(&self) -> Vec<(Value, Value)> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each_pair(|k, v| out.push((k.clone(), v.clone())));
        out
    }

    /// `keys`
    pub fn keys(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each_pair(|k, _| out.push(k.clone()));
        out
    }

    /// `values`
    pub fn values(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each_pair(|_, v| out.push(v.clone()));
        out
    }

    fn for_each_pair(&self, mut f: impl FnMut(&Value, &Value)) {
        match &self.storage {
            HashStorage::Empty => {}
            HashStorage::Packed(pairs) => pairs.iter().for_each(|e| f(e.key(), e.value())),
            HashStorage::Buckets(table) => table.iter().for_each(|e| f(e.key(), e.value())),
        }
    }

    /// `each { |key, value| }`
    pub fn each<F>(&self, mut block: F) -> CoreResult<Completion<()>>
    where
        F: FnMut(&Value, &Value) -> CoreResult<Flow>,
    {
        for (key, value) in self.pairs() {
            if let Step::Stop(v) = run_block(|| block(&key, &value))? {
                return Ok(Completion::Broken(v));
            }
        }
        Ok(Completion::Done(()))
    }

    /// `map { |key, value| }`
    pub fn map<F>(&self, mut block: F) -> CoreResult<Completion<Vec<Value>>>
    where
        F: FnMut(&Value, &Value) -> CoreResult<Flow>,
    {
        let mut out = Vec::with_capacity(self.len());
        for (key, value) in self.pairs() {
            match run_block(|| block(&key, &value))? {
                Step::Continue(v) => out.push(v),
                Step::Stop(v) => return Ok(Completion::Broken(v)),
            }
        }
        Ok(Completion::Done(out))
    }

    /// `delete_if { |key, value| }`
    ///
    /// Deletions decided before a `break` or an error still happen.
    pub fn delete_if<F>(&mut self, mut block: F) -> CoreResult<Completion<()>>
    where
        F: FnMut(&Value, &Value) -> CoreResult<Flow>,
    {
        self.check_frozen()?;
        let mut doomed: Vec<usize> = Vec::new();
        let mut outcome = Ok(Completion::Done(()));
        for (position, (key, value)) in self.pairs().into_iter().enumerate() {
            match run_block(|| block(&key, &value)) {
                Ok(Step::Continue(v)) => {
                    if v.is_truthy() {
                        doomed.push(position);
                    }
                }
                Ok(Step::Stop(v)) => {
                    outcome = Ok(Completion::Broken(v));
                    break;
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        self.remove_positions(&doomed);
        outcome
    }

    /// Remove pairs by their ascending positions in insertion order
    fn remove_positions(&mut self, positions: &[usize]) {
        if positions.is_empty() {
            return;
        }
        match &mut self.storage {
            HashStorage::Empty => {}
            HashStorage::Packed(pairs) => pairs.remove_indices(positions),
            HashStorage::Buckets(table) => {
                let ids: Vec<EntryId> = table.ids().collect();
                for &position in positions {
                    if let Some(&id) = ids.get(position) {
                        table.remove_entry(id);
                    }
                }
            }
        }
    }

    /// `update(other)` / `merge!(other)`
    ///
    /// With a block, a key present on both sides gets
    /// `block(key, old, new)` as its value.
    pub fn update(
        &mut self,
        host: &mut dyn Host,
        other: &RubyHash,
        mut block: Option<&mut dyn FnMut(&Value, &Value, &Value) -> CoreResult<Value>>,
    ) -> CoreResult<()> {
        self.check_frozen()?;
        for (key, value) in other.pairs() {
            let value = match block.as_mut() {
                Some(resolve) => match self.get(host, &key)? {
                    Some(old) => resolve(&key, &old, &value)?,
                    None => value,
                },
                None => value,
            };
            self.set(host, key, value)?;
        }
        Ok(())
    }

    /// `merge(other)`: a new hash; defaults come from `self`
    pub fn merge(
        &self,
        host: &mut dyn Host,
        other: &RubyHash,
        block: Option<&mut dyn FnMut(&Value, &Value, &Value) -> CoreResult<Value>>,
    ) -> CoreResult<RubyHash> {
        let mut merged = self.dup();
        merged.update(host, other, block)?;
        Ok(merged)
    }

    /// `rehash`: recompute hashes after keys were mutated
    ///
    /// Keys that have become `eql?` to an earlier key collapse into it: the
    /// earlier key keeps its position and takes the later value. A bucketed
    /// hash stays bucketed. If `hash` or `eql?` raises, nothing changes.
    pub fn rehash(&mut self, host: &mut dyn Host) -> CoreResult<()> {
        self.check_frozen()?;
        let mut keys = KeyMatcher::new(host, self.identity);
        let rebuilt = match &self.storage {
            HashStorage::Empty => return Ok(()),
            HashStorage::Packed(pairs) => {
                let mut rebuilt = PackedPairs::with_capacity(self.packed_max);
                for entry in pairs.iter() {
                    let hash = keys.hash(entry.key())?;
                    match rebuilt.find(&mut keys, hash, entry.key())? {
                        Some(i) => {
                            rebuilt.set_value(i, entry.value().clone());
                        }
                        None => rebuilt.push(hash, entry.key().clone(), entry.value().clone()),
                    }
                }
                HashStorage::Packed(rebuilt)
            }
            HashStorage::Buckets(table) => {
                let mut rebuilt = BucketTable::with_capacity_for(table.len());
                for entry in table.iter() {
                    let hash = keys.hash(entry.key())?;
                    rebuilt.insert(
                        &mut keys,
                        hash,
                        entry.key().clone(),
                        entry.value().clone(),
                        self.load_factor,
                    )?;
                }
                HashStorage::Buckets(rebuilt)
            }
        };
        let merged = self.len() - rebuilt.len();
        if merged > 0 {
            tracing::debug!(merged, "rehash merged keys");
        }
        self.storage = rebuilt;
        Ok(())
    }

    /// `compare_by_identity`
    pub fn compare_by_identity(&mut self, host: &mut dyn Host) -> CoreResult<()> {
        self.check_frozen()?;
        if self.identity {
            return Ok(());
        }
        self.identity = true;
        self.rehash(host)
    }

    /// `default`
    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    /// `default = value`; clears any default proc
    pub fn set_default(&mut self, value: Value) -> CoreResult<()> {
        self.check_frozen()?;
        self.default_value = Some(value);
        self.default_proc = None;
        Ok(())
    }

    /// `default_proc`
    pub fn default_proc(&self) -> Option<&DefaultProc> {
        self.default_proc.as_ref()
    }

    /// `default_proc = block`; clears any default value
    pub fn set_default_proc(&mut self, block: Option<DefaultProc>) -> CoreResult<()> {
        self.check_frozen()?;
        self.default_proc = block;
        self.default_value = None;
        Ok(())
    }

    /// `dup`: an unfrozen copy with its own storage and the same defaults
    pub fn dup(&self) -> RubyHash {
        let mut copy = self.sibling();
        copy.storage = self.storage.clone();
        copy.default_value = self.default_value.clone();
        copy.default_proc = self.default_proc.clone();
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_value::DefaultHost;

    fn hash_of(host: &mut DefaultHost, n: i64) -> RubyHash {
        RubyHash::from_pairs(
            ClassHandle::default(),
            host,
            (0..n).map(|i| (Value::int(i), Value::int(i * 100))),
        )
        .unwrap()
    }

    #[test]
    fn test_ninth_key_promotes() {
        let mut host = DefaultHost;
        let mut hash = hash_of(&mut host, 3);
        assert_eq!(hash.storage_kind(), HashStorageKind::Packed);
        for i in 3..8 {
            hash.set(&mut host, Value::int(i), Value::Nil).unwrap();
        }
        let before = hash.keys();
        assert_eq!(hash.storage_kind(), HashStorageKind::Packed);
        hash.set(&mut host, Value::int(8), Value::Nil).unwrap();
        assert_eq!(hash.storage_kind(), HashStorageKind::Buckets);
        let after = hash.keys();
        assert_eq!(&after[..8], &before[..]);
        assert_eq!(after.len(), 9);
    }

    #[test]
    fn test_update_keeps_position() {
        let mut host = DefaultHost;
        let mut hash = hash_of(&mut host, 3);
        hash.set(&mut host, Value::int(0), Value::int(-1)).unwrap();
        assert_eq!(hash.keys(), vec![Value::int(0), Value::int(1), Value::int(2)]);
        assert_eq!(hash.get(&mut host, &Value::int(0)).unwrap(), Some(Value::int(-1)));
    }

    #[test]
    fn test_eql_not_equal() {
        let mut host = DefaultHost;
        let mut hash = RubyHash::new(ClassHandle::default());
        hash.set(&mut host, Value::int(1), Value::bool(true)).unwrap();
        assert_eq!(hash.get(&mut host, &Value::float(1.0)).unwrap(), None);
        assert!(hash.contains_key(&mut host, &Value::int(1)).unwrap());
    }

    #[test]
    fn test_defaults() {
        let mut host = DefaultHost;
        let mut hash = RubyHash::new(ClassHandle::default());
        assert_eq!(hash.index(&mut host, &Value::int(1)).unwrap(), Value::Nil);
        hash.set_default(Value::int(0)).unwrap();
        assert_eq!(hash.index(&mut host, &Value::int(1)).unwrap(), Value::int(0));
        let memo: DefaultProc = Arc::new(
            |h: &mut RubyHash, key: &Value, host: &mut dyn Host| -> CoreResult<Value> {
                let v = Value::int(key.as_fixnum().unwrap_or(0) * 2);
                h.set(host, key.clone(), v.clone())?;
                Ok(v)
            },
        );
        hash.set_default_proc(Some(memo)).unwrap();
        assert_eq!(hash.default_value(), None);
        assert_eq!(hash.index(&mut host, &Value::int(21)).unwrap(), Value::int(42));
        assert_eq!(hash.len(), 1);
    }

    #[test]
    fn test_delete_and_shift_both_forms() {
        let mut host = DefaultHost;
        for n in [4, 20] {
            let mut hash = hash_of(&mut host, n);
            assert_eq!(
                hash.delete(&mut host, &Value::int(1)).unwrap(),
                Some(Value::int(100))
            );
            assert_eq!(hash.delete(&mut host, &Value::int(1)).unwrap(), None);
            assert_eq!(hash.shift().unwrap(), Some((Value::int(0), Value::int(0))));
            assert_eq!(hash.keys().first(), Some(&Value::int(2)));
            assert_eq!(hash.len(), n as usize - 2);
        }
        let mut empty = RubyHash::new(ClassHandle::default());
        assert_eq!(empty.shift().unwrap(), None);
    }

    #[test]
    fn test_delete_if_and_clear_keep_form() {
        let mut host = DefaultHost;
        let mut hash = hash_of(&mut host, 12);
        hash.delete_if(|k, _| Ok(Flow::Next(Value::bool(k.as_fixnum().unwrap_or(0) % 3 == 0))))
            .unwrap();
        assert_eq!(hash.len(), 8);
        assert!(!hash.contains_key(&mut host, &Value::int(3)).unwrap());
        hash.clear().unwrap();
        assert!(hash.is_empty());
        assert_eq!(hash.storage_kind(), HashStorageKind::Buckets);
    }

    #[test]
    fn test_merge_with_block() {
        let mut host = DefaultHost;
        let a = hash_of(&mut host, 2);
        let b = RubyHash::from_pairs(
            ClassHandle::default(),
            &mut host,
            vec![(Value::int(1), Value::int(5)), (Value::int(9), Value::int(9))],
        )
        .unwrap();
        let mut sum = |_: &Value, old: &Value, new: &Value| -> CoreResult<Value> {
            Ok(Value::int(old.as_fixnum().unwrap_or(0) + new.as_fixnum().unwrap_or(0)))
        };
        let merged = a.merge(&mut host, &b, Some(&mut sum)).unwrap();
        assert_eq!(
            merged.pairs(),
            vec![
                (Value::int(0), Value::int(0)),
                (Value::int(1), Value::int(105)),
                (Value::int(9), Value::int(9)),
            ]
        );
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_compare_by_identity() {
        let mut host = DefaultHost;
        let mut hash = RubyHash::new(ClassHandle::default());
        let big = Value::bignum(garnet_value::BigInt::from(1u8) << 100usize);
        let twin = Value::bignum(garnet_value::BigInt::from(1u8) << 100usize);
        hash.set(&mut host, big.clone(), Value::int(1)).unwrap();
        assert!(hash.contains_key(&mut host, &twin).unwrap());
        hash.compare_by_identity(&mut host).unwrap();
        assert!(!hash.contains_key(&mut host, &twin).unwrap());
        assert!(hash.contains_key(&mut host, &big).unwrap());
    }

    #[test]
    fn test_frozen_hash() {
        let mut host = DefaultHost;
        let mut hash = hash_of(&mut host, 1);
        hash.freeze();
        assert_eq!(
            hash.set(&mut host, Value::int(5), Value::Nil),
            Err(CoreError::Frozen("Hash"))
        );
        assert!(!hash.dup().is_frozen());
    }

    #[test]
    fn test_each_break() {
        let mut host = DefaultHost;
        let hash = hash_of(&mut host, 5);
        let mut visited = 0;
        let outcome = hash
            .each(|k, _| {
                visited += 1;
                if *k == Value::int(2) {
                    Ok(Flow::Break(k.clone()))
                } else {
                    Ok(Flow::nil())
                }
            })
            .unwrap();
        assert_eq!(outcome, Completion::Broken(Value::int(2)));
        assert_eq!(visited, 3);
    }
}
