//! Hash lookup and store sites

use garnet_value::{CoreResult, Value};

use super::cache::{Bailout, Env, RoutineResult, Specialization, Specializer};
use super::guard::{Guard, ReceiverShape, Shape};
use crate::hash::{HashStorage, HashStorageKind, RubyHash};

fn hash_shape(hash: &RubyHash, args: &[Value]) -> Shape {
    Shape::of(ReceiverShape::Hash(hash.storage_kind()), args)
}

/// `hash[key]`, falling back to the default value or proc
#[derive(Debug, Clone, Copy, Default)]
pub struct HashGet;

fn get_empty(_: &HashGet, env: &mut Env<'_>, hash: &mut RubyHash, args: &[Value]) -> RoutineResult<Value> {
    let [key] = args else {
        return Err(Bailout::Deoptimize);
    };
    Ok(hash.default_for(env.host, key)?)
}

fn get_packed(_: &HashGet, env: &mut Env<'_>, hash: &mut RubyHash, args: &[Value]) -> RoutineResult<Value> {
    let [key] = args else {
        return Err(Bailout::Deoptimize);
    };
    let found = {
        let mut keys = hash.matcher(env.host);
        let HashStorage::Packed(pairs) = hash.storage() else {
            return Err(Bailout::Deoptimize);
        };
        let code = keys.hash(key)?;
        pairs
            .find(&mut keys, code, key)?
            .map(|i| pairs.entry(i).value().clone())
    };
    match found {
        Some(value) => Ok(value),
        None => Ok(hash.default_for(env.host, key)?),
    }
}

fn get_buckets(_: &HashGet, env: &mut Env<'_>, hash: &mut RubyHash, args: &[Value]) -> RoutineResult<Value> {
    let [key] = args else {
        return Err(Bailout::Deoptimize);
    };
    let found = {
        let mut keys = hash.matcher(env.host);
        let HashStorage::Buckets(table) = hash.storage() else {
            return Err(Bailout::Deoptimize);
        };
        let code = keys.hash(key)?;
        table
            .lookup(&mut keys, code, key)?
            .entry
            .map(|id| table.entry(id).value().clone())
    };
    match found {
        Some(value) => Ok(value),
        None => Ok(hash.default_for(env.host, key)?),
    }
}

fn get_generic(site: &HashGet, env: &mut Env<'_>, hash: &mut RubyHash, args: &[Value]) -> RoutineResult<Value> {
    Ok(site.generic(env, hash, args)?)
}

impl Specializer for HashGet {
    type Receiver = RubyHash;
    type Output = Value;

    fn name(&self) -> &'static str {
        "hash_get"
    }

    fn shape(&self, hash: &RubyHash, args: &[Value]) -> Shape {
        hash_shape(hash, args)
    }

    fn specialize(&self, shape: &Shape, _rewritten: &[&'static str]) -> Specialization<Self> {
        let guard = Guard::exact(shape);
        match (shape.receiver, shape.args.len()) {
            (ReceiverShape::Hash(HashStorageKind::Empty), 1) => {
                Specialization::new("get_empty", guard.any_arg(0), get_empty)
            }
            (ReceiverShape::Hash(HashStorageKind::Packed), 1) => {
                Specialization::new("get_packed", guard.any_arg(0), get_packed)
            }
            (ReceiverShape::Hash(HashStorageKind::Buckets), 1) => {
                Specialization::new("get_buckets", guard.any_arg(0), get_buckets)
            }
            _ => Specialization::new("get_generic", guard, get_generic),
        }
    }

    fn generic(&self, env: &mut Env<'_>, hash: &mut RubyHash, args: &[Value]) -> CoreResult<Value> {
        let key = args.first().cloned().unwrap_or(Value::Nil);
        hash.index(env.host, &key)
    }
}

/// `hash[key] = value`, evaluating to `value`
#[derive(Debug, Clone, Copy, Default)]
pub struct HashSet;

/// Store into packed pairs; bails out when a new key would not fit
fn set_packed(_: &HashSet, env: &mut Env<'_>, hash: &mut RubyHash, args: &[Value]) -> RoutineResult<Value> {
    let [key, value] = args else {
        return Err(Bailout::Deoptimize);
    };
    hash.check_frozen()?;
    let max = hash.packed_max();
    let mut keys = hash.matcher(env.host);
    let code = keys.hash(key)?;
    let HashStorage::Packed(pairs) = hash.storage_mut() else {
        return Err(Bailout::Deoptimize);
    };
    match pairs.find(&mut keys, code, key)? {
        Some(i) => {
            pairs.set_value(i, value.clone());
        }
        None if pairs.len() < max => pairs.push(code, key.clone(), value.clone()),
        None => return Err(Bailout::Deoptimize),
    }
    Ok(value.clone())
}

fn set_buckets(_: &HashSet, env: &mut Env<'_>, hash: &mut RubyHash, args: &[Value]) -> RoutineResult<Value> {
    let [key, value] = args else {
        return Err(Bailout::Deoptimize);
    };
    hash.check_frozen()?;
    let load_factor = hash.load_factor();
    let mut keys = hash.matcher(env.host);
    let code = keys.hash(key)?;
    let HashStorage::Buckets(table) = hash.storage_mut() else {
        return Err(Bailout::Deoptimize);
    };
    table.insert(&mut keys, code, key.clone(), value.clone(), load_factor)?;
    Ok(value.clone())
}

fn set_generic(site: &HashSet, env: &mut Env<'_>, hash: &mut RubyHash, args: &[Value]) -> RoutineResult<Value> {
    Ok(site.generic(env, hash, args)?)
}

impl Specializer for HashSet {
    type Receiver = RubyHash;
    type Output = Value;

    fn name(&self) -> &'static str {
        "hash_set"
    }

    fn shape(&self, hash: &RubyHash, args: &[Value]) -> Shape {
        hash_shape(hash, args)
    }

    fn specialize(&self, shape: &Shape, rewritten: &[&'static str]) -> Specialization<Self> {
        let guard = Guard::exact(shape);
        if shape.args.len() != 2 {
            return Specialization::new("set_generic", guard, set_generic);
        }
        let guard = guard.any_arg(0).any_arg(1);
        match shape.receiver {
            ReceiverShape::Hash(HashStorageKind::Packed) if !rewritten.contains(&"set_packed") => {
                Specialization::new("set_packed", guard, set_packed)
            }
            ReceiverShape::Hash(HashStorageKind::Buckets) => {
                Specialization::new("set_buckets", guard, set_buckets)
            }
            _ => Specialization::new("set_generic", guard, set_generic),
        }
    }

    fn generic(&self, env: &mut Env<'_>, hash: &mut RubyHash, args: &[Value]) -> CoreResult<Value> {
        let key = args.first().cloned().unwrap_or(Value::Nil);
        let value = args.get(1).cloned().unwrap_or(Value::Nil);
        hash.set(env.host, key, value.clone())?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specialize::cache::CallSiteCache;
    use garnet_value::{Arithmetic, ClassHandle, CoreError, DefaultHost};

    #[test]
    fn test_set_promotes_after_packed_bails() {
        let mut host = DefaultHost;
        let arithmetic = Arithmetic::new();
        let mut env = Env::new(&mut host, &arithmetic);
        let mut set = CallSiteCache::new(HashSet, 4);
        let mut hash = RubyHash::new(ClassHandle::default());
        for i in 0..9 {
            set.dispatch(&mut env, &mut hash, &[Value::int(i), Value::int(i)])
                .unwrap();
        }
        assert_eq!(hash.storage_kind(), HashStorageKind::Buckets);
        assert_eq!(set.rewritten(), &["set_packed"]);
        assert_eq!(hash.keys(), (0..9).map(Value::int).collect::<Vec<_>>());

        set.dispatch(&mut env, &mut hash, &[Value::int(9), Value::Nil])
            .unwrap();
        assert!(set.routines().any(|r| r == "set_buckets"));
        assert_eq!(hash.len(), 10);
    }

    #[test]
    fn test_get_honours_defaults() {
        let mut host = DefaultHost;
        let arithmetic = Arithmetic::new();
        let mut env = Env::new(&mut host, &arithmetic);
        let mut get = CallSiteCache::new(HashGet, 4);
        let mut hash = RubyHash::new(ClassHandle::default());
        hash.set_default(Value::int(-1)).unwrap();
        assert_eq!(get.dispatch(&mut env, &mut hash, &[Value::int(1)]).unwrap(), Value::int(-1));
        hash.set(env.host, Value::int(1), Value::int(10)).unwrap();
        assert_eq!(get.dispatch(&mut env, &mut hash, &[Value::int(1)]).unwrap(), Value::int(10));
        assert_eq!(get.dispatch(&mut env, &mut hash, &[Value::int(2)]).unwrap(), Value::int(-1));
        assert_eq!(
            get.routines().collect::<Vec<_>>(),
            vec!["get_empty", "get_packed"]
        );
    }

    #[test]
    fn test_frozen_set() {
        let mut host = DefaultHost;
        let arithmetic = Arithmetic::new();
        let mut env = Env::new(&mut host, &arithmetic);
        let mut set = CallSiteCache::new(HashSet, 4);
        let mut hash = RubyHash::new(ClassHandle::default());
        set.dispatch(&mut env, &mut hash, &[Value::int(1), Value::int(1)])
            .unwrap();
        hash.freeze();
        assert_eq!(
            set.dispatch(&mut env, &mut hash, &[Value::int(2), Value::int(2)]),
            Err(CoreError::Frozen("Hash"))
        );
    }
}
