//! Global core lock and per-runtime context
//!
//! Containers and call-site caches assume exclusive access for the duration
//! of each operation. A host that runs Ruby code on several threads wraps its
//! state in one [`GlobalLock`] and holds it around every core call.

use parking_lot::Mutex;

use garnet_value::{Arithmetic, ClassHandle, CoreResult, Host, Value};

use crate::array::RubyArray;
use crate::hash::RubyHash;
use crate::options::{CoreOptions, OptionsError};
use crate::specialize::{Env, SiteArena, Specializer};

/// Single coarse-grained lock over core state
#[derive(Debug)]
pub struct GlobalLock<T> {
    inner: Mutex<T>,
}

impl<T> GlobalLock<T> {
    /// Wrap `value`
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Run `f` while holding the lock
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Run `f` only if the lock is free right now
    pub fn try_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.inner.try_lock()?;
        Some(f(&mut guard))
    }

    /// Take the protected value back
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Default> Default for GlobalLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Options, arithmetic policy and class tokens for one runtime
#[derive(Debug)]
pub struct CoreContext {
    options: CoreOptions,
    arithmetic: Arithmetic,
    array_class: ClassHandle,
    hash_class: ClassHandle,
}

impl CoreContext {
    /// Context with validated options
    pub fn new(options: CoreOptions) -> Result<Self, OptionsError> {
        options.validate()?;
        let arithmetic = Arithmetic::with_demotion(options.demote_bignums);
        Ok(Self {
            options,
            arithmetic,
            array_class: ClassHandle::UNSPECIFIED,
            hash_class: ClassHandle::UNSPECIFIED,
        })
    }

    /// Class tokens stamped on new containers
    pub fn with_classes(mut self, array_class: ClassHandle, hash_class: ClassHandle) -> Self {
        self.array_class = array_class;
        self.hash_class = hash_class;
        self
    }

    /// Active options
    pub fn options(&self) -> &CoreOptions {
        &self.options
    }

    /// Integer promotion policy
    pub fn arithmetic(&self) -> &Arithmetic {
        &self.arithmetic
    }

    /// Empty array
    pub fn new_array(&self) -> RubyArray {
        RubyArray::with_options(self.array_class, &self.options)
    }

    /// Array literal
    pub fn array_from(&self, values: Vec<Value>) -> RubyArray {
        RubyArray::from_values_with_options(self.array_class, values, &self.options)
    }

    /// Empty hash
    pub fn new_hash(&self) -> RubyHash {
        RubyHash::with_options(self.hash_class, &self.options)
    }

    /// Hash literal
    pub fn hash_from(
        &self,
        host: &mut dyn Host,
        pairs: impl IntoIterator<Item = (Value, Value)>,
    ) -> CoreResult<RubyHash> {
        RubyHash::from_pairs_with_options(self.hash_class, &self.options, host, pairs)
    }

    /// Routine environment over `host`
    pub fn env<'a>(&'a self, host: &'a mut dyn Host) -> Env<'a> {
        Env::new(host, &self.arithmetic)
    }

    /// Empty call-site arena bounded by `inline_cache_limit`
    pub fn site_arena<S: Specializer>(&self) -> SiteArena<S> {
        SiteArena::with_options(&self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lock_serializes_pushes() {
        let context = CoreContext::new(CoreOptions::default()).unwrap();
        let shared = Arc::new(GlobalLock::new(context.new_array()));
        let workers: Vec<_> = (0..4)
            .map(|t| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for i in 0..100 {
                        shared.with(|a| a.push(Value::int(t * 100 + i))).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        let array = Arc::try_unwrap(shared).unwrap().into_inner();
        assert_eq!(array.len(), 400);
    }

    #[test]
    fn test_try_with_when_held() {
        let lock = GlobalLock::new(0u32);
        lock.with(|outer| {
            *outer += 1;
            assert_eq!(lock.try_with(|_| ()), None);
        });
        assert_eq!(lock.try_with(|v| *v), Some(1));
    }

    #[test]
    fn test_context_rejects_bad_options() {
        let options = CoreOptions::default().with_inline_cache_limit(0);
        assert!(matches!(
            CoreContext::new(options),
            Err(OptionsError::Zero("inline_cache_limit"))
        ));
    }

    #[test]
    fn test_context_stamps_classes() {
        let context = CoreContext::new(CoreOptions::default())
            .unwrap()
            .with_classes(ClassHandle(7), ClassHandle(8));
        assert_eq!(context.new_array().class(), ClassHandle(7));
        assert_eq!(context.new_hash().class(), ClassHandle(8));
        assert_eq!(context.array_from(vec![Value::int(1)]).len(), 1);
    }

    #[test]
    fn test_literals_follow_context_options() {
        let options = CoreOptions::default()
            .with_array_min_capacity(4)
            .with_hash_packed_max(2);
        let context = CoreContext::new(options).unwrap().with_classes(ClassHandle(3), ClassHandle(4));
        let mut array = context.array_from(vec![Value::int(1)]);
        array.push(Value::int(2)).unwrap();
        assert_eq!(array.capacity(), 4);
        assert_eq!(array.class(), ClassHandle(3));

        let mut host = garnet_value::DefaultHost;
        let hash = context
            .hash_from(&mut host, (0..3).map(|i| (Value::int(i), Value::Nil)))
            .unwrap();
        assert_eq!(hash.storage_kind(), crate::HashStorageKind::Buckets);
        assert_eq!(hash.class(), ClassHandle(4));
        assert_eq!(hash.packed_max(), 2);
    }
}
