//! Array element access sites
//!
//! Packed routines index the unboxed buffer directly. Anything that needs
//! the storage to change (growth, promotion) goes through the generic path,
//! which is the plain container API.

use garnet_value::numeric::float;
use garnet_value::{BigInt, CoreError, CoreResult, Value, ValueKind};

use super::cache::{Bailout, Env, RoutineResult, Specialization, Specializer};
use super::guard::{Guard, ReceiverShape, Shape};
use crate::array::RubyArray;
use crate::storage::{Packed, StorageKind};

/// Integer index argument, truncating floats like `Array#[]` does
pub(crate) fn index_arg(arg: Option<&Value>) -> CoreResult<i64> {
    match arg {
        Some(Value::SmallInt(i)) => Ok(*i),
        Some(Value::BigInt(b)) => Err(CoreError::IndexTooBig(if **b < BigInt::from(0) {
            i64::MIN
        } else {
            i64::MAX
        })),
        Some(Value::Float(f)) => index_arg(Some(&float::to_integer(*f)?)),
        Some(other) => Err(CoreError::WrongArgumentType {
            found: other.type_name(),
            expected: "Integer",
        }),
        None => Err(CoreError::WrongArgumentType {
            found: "nothing",
            expected: "Integer",
        }),
    }
}

/// In-bounds offset for a possibly negative index
#[inline]
fn resolve(len: usize, index: i64) -> Option<usize> {
    let i = if index < 0 { index + len as i64 } else { index };
    usize::try_from(i).ok().filter(|&i| i < len)
}

fn array_shape(array: &RubyArray, args: &[Value]) -> Shape {
    Shape::of(ReceiverShape::Array(array.storage_kind()), args)
}

/// `array[index]`
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayRead;

fn read_empty(_: &ArrayRead, _: &mut Env<'_>, _: &mut RubyArray, _: &[Value]) -> RoutineResult<Value> {
    Ok(Value::Nil)
}

fn read_packed<T: Packed>(
    _: &ArrayRead,
    _: &mut Env<'_>,
    array: &mut RubyArray,
    args: &[Value],
) -> RoutineResult<Value> {
    let (Some(elements), Some(index)) = (array.packed::<T>(), args.first().and_then(Value::as_fixnum))
    else {
        return Err(Bailout::Deoptimize);
    };
    Ok(resolve(elements.len(), index).map_or(Value::Nil, |i| elements[i].boxed()))
}

fn read_objects(
    _: &ArrayRead,
    _: &mut Env<'_>,
    array: &mut RubyArray,
    args: &[Value],
) -> RoutineResult<Value> {
    let (Some(elements), Some(index)) = (array.objects(), args.first().and_then(Value::as_fixnum)) else {
        return Err(Bailout::Deoptimize);
    };
    Ok(resolve(elements.len(), index).map_or(Value::Nil, |i| elements[i].clone()))
}

fn read_generic(
    site: &ArrayRead,
    env: &mut Env<'_>,
    array: &mut RubyArray,
    args: &[Value],
) -> RoutineResult<Value> {
    Ok(site.generic(env, array, args)?)
}

impl Specializer for ArrayRead {
    type Receiver = RubyArray;
    type Output = Value;

    fn name(&self) -> &'static str {
        "array_read"
    }

    fn shape(&self, array: &RubyArray, args: &[Value]) -> Shape {
        array_shape(array, args)
    }

    fn specialize(&self, shape: &Shape, _rewritten: &[&'static str]) -> Specialization<Self> {
        let guard = Guard::exact(shape);
        let ReceiverShape::Array(kind) = shape.receiver else {
            return Specialization::new("read_generic", guard, read_generic);
        };
        if shape.args.as_slice() != [ValueKind::SmallInt] {
            return Specialization::new("read_generic", guard, read_generic);
        }
        match kind {
            StorageKind::Empty => Specialization::new("read_empty", guard, read_empty),
            StorageKind::Int => Specialization::new("read_int", guard, read_packed::<i32>),
            StorageKind::Long => Specialization::new("read_long", guard, read_packed::<i64>),
            StorageKind::Float => Specialization::new("read_float", guard, read_packed::<f64>),
            StorageKind::Object => Specialization::new("read_object", guard, read_objects),
        }
    }

    fn generic(&self, _: &mut Env<'_>, array: &mut RubyArray, args: &[Value]) -> CoreResult<Value> {
        Ok(array.get(index_arg(args.first())?))
    }
}

/// `array[index] = value`, evaluating to `value`
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayWrite;

fn write_packed<T: Packed>(
    site: &ArrayWrite,
    env: &mut Env<'_>,
    array: &mut RubyArray,
    args: &[Value],
) -> RoutineResult<Value> {
    let (Some(index), Some(value)) = (args.first().and_then(Value::as_fixnum), args.get(1)) else {
        return Err(Bailout::Deoptimize);
    };
    let Some(unboxed) = T::unbox(value) else {
        return Err(Bailout::Deoptimize);
    };
    let Some(i) = resolve(array.len(), index) else {
        return Ok(site.generic(env, array, args)?);
    };
    let Some(elements) = array.packed_mut::<T>()? else {
        return Err(Bailout::Deoptimize);
    };
    elements[i] = unboxed;
    Ok(value.clone())
}

fn write_object(
    site: &ArrayWrite,
    env: &mut Env<'_>,
    array: &mut RubyArray,
    args: &[Value],
) -> RoutineResult<Value> {
    let (Some(index), Some(value)) = (args.first().and_then(Value::as_fixnum), args.get(1)) else {
        return Err(Bailout::Deoptimize);
    };
    match resolve(array.len(), index) {
        Some(i) => {
            array.write(i, value.clone())?;
            Ok(value.clone())
        }
        None => Ok(site.generic(env, array, args)?),
    }
}

fn write_generic(
    site: &ArrayWrite,
    env: &mut Env<'_>,
    array: &mut RubyArray,
    args: &[Value],
) -> RoutineResult<Value> {
    Ok(site.generic(env, array, args)?)
}

impl Specializer for ArrayWrite {
    type Receiver = RubyArray;
    type Output = Value;

    fn name(&self) -> &'static str {
        "array_write"
    }

    fn shape(&self, array: &RubyArray, args: &[Value]) -> Shape {
        array_shape(array, args)
    }

    fn specialize(&self, shape: &Shape, rewritten: &[&'static str]) -> Specialization<Self> {
        use ValueKind::{Float, SmallInt};

        let guard = Guard::exact(shape);
        let (ReceiverShape::Array(kind), [SmallInt, value]) = (shape.receiver, shape.args.as_slice())
        else {
            return Specialization::new("write_generic", guard, write_generic);
        };
        match (kind, value) {
            (StorageKind::Int, SmallInt) if !rewritten.contains(&"write_int") => {
                Specialization::new("write_int", guard, write_packed::<i32>)
            }
            (StorageKind::Long, SmallInt) => {
                Specialization::new("write_long", guard, write_packed::<i64>)
            }
            (StorageKind::Float, Float) => {
                Specialization::new("write_float", guard, write_packed::<f64>)
            }
            (StorageKind::Object, _) => {
                Specialization::new("write_object", guard.any_arg(1), write_object)
            }
            _ => Specialization::new("write_generic", guard, write_generic),
        }
    }

    fn generic(&self, _: &mut Env<'_>, array: &mut RubyArray, args: &[Value]) -> CoreResult<Value> {
        let index = index_arg(args.first())?;
        let value = args.get(1).cloned().unwrap_or(Value::Nil);
        array.set(index, value.clone())?;
        Ok(value)
    }
}

/// `array.push(value)`, evaluating to the new length
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayPush;

fn push_packed<T: Packed>(
    _: &ArrayPush,
    _: &mut Env<'_>,
    array: &mut RubyArray,
    args: &[Value],
) -> RoutineResult<usize> {
    let Some(value) = args.first() else {
        return Err(Bailout::Deoptimize);
    };
    if array.storage_kind() != T::KIND || T::unbox(value).is_none() {
        return Err(Bailout::Deoptimize);
    }
    array.append(value.clone())?;
    Ok(array.len())
}

fn push_object(
    _: &ArrayPush,
    _: &mut Env<'_>,
    array: &mut RubyArray,
    args: &[Value],
) -> RoutineResult<usize> {
    let Some(value) = args.first() else {
        return Err(Bailout::Deoptimize);
    };
    array.append(value.clone())?;
    Ok(array.len())
}

fn push_generic(
    site: &ArrayPush,
    env: &mut Env<'_>,
    array: &mut RubyArray,
    args: &[Value],
) -> RoutineResult<usize> {
    Ok(site.generic(env, array, args)?)
}

impl Specializer for ArrayPush {
    type Receiver = RubyArray;
    type Output = usize;

    fn name(&self) -> &'static str {
        "array_push"
    }

    fn shape(&self, array: &RubyArray, args: &[Value]) -> Shape {
        array_shape(array, args)
    }

    fn specialize(&self, shape: &Shape, rewritten: &[&'static str]) -> Specialization<Self> {
        let guard = Guard::exact(shape);
        let (ReceiverShape::Array(kind), [value]) = (shape.receiver, shape.args.as_slice()) else {
            return Specialization::new("push_generic", guard, push_generic);
        };
        match (kind, value) {
            (StorageKind::Int, ValueKind::SmallInt) if !rewritten.contains(&"push_int") => {
                Specialization::new("push_int", guard, push_packed::<i32>)
            }
            (StorageKind::Long, ValueKind::SmallInt) => {
                Specialization::new("push_long", guard, push_packed::<i64>)
            }
            (StorageKind::Float, ValueKind::Float) => {
                Specialization::new("push_float", guard, push_packed::<f64>)
            }
            (StorageKind::Object, _) => {
                Specialization::new("push_object", guard.any_arg(0), push_object)
            }
            _ => Specialization::new("push_generic", guard, push_generic),
        }
    }

    fn generic(&self, _: &mut Env<'_>, array: &mut RubyArray, args: &[Value]) -> CoreResult<usize> {
        let value = args.first().cloned().unwrap_or(Value::Nil);
        array.push(value)?;
        Ok(array.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specialize::cache::{CacheState, CallSiteCache};
    use garnet_value::{Arithmetic, ClassHandle, DefaultHost};

    fn ints(values: &[i64]) -> RubyArray {
        RubyArray::from_values(
            ClassHandle::default(),
            values.iter().copied().map(Value::int).collect(),
        )
    }

    #[test]
    fn test_read_routines() {
        let mut host = DefaultHost;
        let arithmetic = Arithmetic::new();
        let mut env = Env::new(&mut host, &arithmetic);
        let mut site = CallSiteCache::new(ArrayRead, 4);
        let mut a = ints(&[10, 20, 30]);
        assert_eq!(site.dispatch(&mut env, &mut a, &[Value::int(-1)]).unwrap(), Value::int(30));
        assert_eq!(site.dispatch(&mut env, &mut a, &[Value::int(3)]).unwrap(), Value::Nil);
        assert_eq!(site.routines().collect::<Vec<_>>(), vec!["read_int"]);
        assert_eq!(
            site.dispatch(&mut env, &mut a, &[Value::float(1.7)]).unwrap(),
            Value::int(20)
        );
        assert_eq!(
            site.dispatch(&mut env, &mut a, &[Value::Nil]),
            Err(CoreError::WrongArgumentType {
                found: "NilClass",
                expected: "Integer"
            })
        );
    }

    #[test]
    fn test_push_float_promotes() {
        let mut host = DefaultHost;
        let arithmetic = Arithmetic::new();
        let mut env = Env::new(&mut host, &arithmetic);
        let mut site = CallSiteCache::new(ArrayPush, 4);
        let mut a = ints(&[1, 2, 3]);
        assert_eq!(a.storage_kind(), StorageKind::Int);
        assert_eq!(site.dispatch(&mut env, &mut a, &[Value::float(4.5)]).unwrap(), 4);
        assert_eq!(a.storage_kind(), StorageKind::Object);
        assert_eq!(
            a.to_vec(),
            vec![Value::int(1), Value::int(2), Value::int(3), Value::float(4.5)]
        );
    }

    #[test]
    fn test_write_wide_fixnum_deoptimizes() {
        let mut host = DefaultHost;
        let arithmetic = Arithmetic::new();
        let mut env = Env::new(&mut host, &arithmetic);
        let mut site = CallSiteCache::new(ArrayWrite, 4);
        let mut a = ints(&[1, 2, 3]);
        site.dispatch(&mut env, &mut a, &[Value::int(0), Value::int(7)]).unwrap();
        assert_eq!(site.routines().collect::<Vec<_>>(), vec!["write_int"]);

        let wide = Value::int(1 << 40);
        site.dispatch(&mut env, &mut a, &[Value::int(1), wide.clone()]).unwrap();
        assert_eq!(site.rewritten(), &["write_int"]);
        assert_eq!(site.stats().deoptimizations, 1);
        assert_eq!(a.to_vec(), vec![Value::int(7), wide, Value::int(3)]);
        assert_eq!(a.storage_kind(), StorageKind::Object);
        assert_eq!(site.routines().collect::<Vec<_>>(), vec!["write_generic"]);
        assert_eq!(site.state(), CacheState::Monomorphic);
    }

    #[test]
    fn test_write_past_end_grows() {
        let mut host = DefaultHost;
        let arithmetic = Arithmetic::new();
        let mut env = Env::new(&mut host, &arithmetic);
        let mut site = CallSiteCache::new(ArrayWrite, 4);
        let mut a = ints(&[1]);
        site.dispatch(&mut env, &mut a, &[Value::int(1), Value::int(2)]).unwrap();
        assert_eq!(a.to_vec(), vec![Value::int(1), Value::int(2)]);
        assert_eq!(a.storage_kind(), StorageKind::Int);
        let err = site
            .dispatch(&mut env, &mut a, &[Value::int(-5), Value::int(0)])
            .unwrap_err();
        assert!(matches!(err, CoreError::IndexTooSmall { index: -5, .. }));
    }

    #[test]
    fn test_frozen_write_is_an_error() {
        let mut host = DefaultHost;
        let arithmetic = Arithmetic::new();
        let mut env = Env::new(&mut host, &arithmetic);
        let mut site = CallSiteCache::new(ArrayWrite, 4);
        let mut a = ints(&[1]);
        a.freeze();
        assert_eq!(
            site.dispatch(&mut env, &mut a, &[Value::int(0), Value::int(2)]),
            Err(CoreError::Frozen("Array"))
        );
        assert_eq!(site.stats().deoptimizations, 0);
    }
}
