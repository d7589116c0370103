//! Binary operator sites
//!
//! Fixnum pairs first get a routine that computes in i64 and bails out on
//! overflow. Once that has happened at a site, the site switches to a routine
//! that promotes in place, so a loop that keeps overflowing does not keep
//! deoptimizing.

use garnet_value::numeric::fixnum;
use garnet_value::{BinaryOp, CoreResult, Value, ValueKind};

use super::cache::{Bailout, Env, RoutineResult, Specialization, Specializer};
use super::guard::{Guard, ReceiverShape, Shape};

/// `lhs op rhs`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericBinary {
    op: BinaryOp,
}

impl NumericBinary {
    /// Site performing `op`
    pub fn new(op: BinaryOp) -> Self {
        Self { op }
    }

    /// Operator of this site
    pub fn op(&self) -> BinaryOp {
        self.op
    }
}

fn fixnum_pair(lhs: &Value, args: &[Value]) -> Option<(i64, i64)> {
    match (lhs, args) {
        (Value::SmallInt(a), [Value::SmallInt(b)]) => Some((*a, *b)),
        _ => None,
    }
}

fn fixnum_exact(site: &NumericBinary, _: &mut Env<'_>, lhs: &mut Value, args: &[Value]) -> RoutineResult<Value> {
    let Some((a, b)) = fixnum_pair(lhs, args) else {
        return Err(Bailout::Deoptimize);
    };
    match fixnum::exact(site.op, a, b) {
        Some(result) => Ok(result?),
        None => Err(Bailout::Deoptimize),
    }
}

fn fixnum_promoting(
    site: &NumericBinary,
    env: &mut Env<'_>,
    lhs: &mut Value,
    args: &[Value],
) -> RoutineResult<Value> {
    let Some((a, b)) = fixnum_pair(lhs, args) else {
        return Err(Bailout::Deoptimize);
    };
    Ok(env.arithmetic.fixnum_binary(site.op, a, b)?)
}

fn float_pair(site: &NumericBinary, _: &mut Env<'_>, lhs: &mut Value, args: &[Value]) -> RoutineResult<Value> {
    let (Value::Float(a), [Value::Float(b)]) = (&*lhs, args) else {
        return Err(Bailout::Deoptimize);
    };
    if site.op.is_integer_only() {
        return Err(Bailout::Deoptimize);
    }
    if site.op.is_comparison() {
        let ord = a.partial_cmp(b);
        return Ok(garnet_value::numeric::float::compare_result(site.op, ord)?);
    }
    Ok(garnet_value::numeric::float::arith(site.op, *a, *b)?)
}

fn numeric_generic(
    site: &NumericBinary,
    env: &mut Env<'_>,
    lhs: &mut Value,
    args: &[Value],
) -> RoutineResult<Value> {
    Ok(site.generic(env, lhs, args)?)
}

impl Specializer for NumericBinary {
    type Receiver = Value;
    type Output = Value;

    fn name(&self) -> &'static str {
        self.op.symbol()
    }

    fn shape(&self, lhs: &Value, args: &[Value]) -> Shape {
        Shape::of(ReceiverShape::Value(lhs.kind()), args)
    }

    fn specialize(&self, shape: &Shape, rewritten: &[&'static str]) -> Specialization<Self> {
        use ValueKind::{Float, SmallInt};

        let guard = Guard::exact(shape);
        match (shape.receiver, shape.args.as_slice()) {
            (ReceiverShape::Value(SmallInt), [SmallInt]) => {
                if rewritten.contains(&"fixnum_exact") {
                    Specialization::new("fixnum_promoting", guard, fixnum_promoting)
                } else {
                    Specialization::new("fixnum_exact", guard, fixnum_exact)
                }
            }
            (ReceiverShape::Value(Float), [Float]) if !self.op.is_integer_only() => {
                Specialization::new("float", guard, float_pair)
            }
            (ReceiverShape::Value(l), [r]) if l.is_numeric() && r.is_numeric() => {
                Specialization::new("mixed_numeric", guard, numeric_generic)
            }
            _ => Specialization::new("coerce", guard, numeric_generic),
        }
    }

    fn generic(&self, env: &mut Env<'_>, lhs: &mut Value, args: &[Value]) -> CoreResult<Value> {
        let rhs = args.first().cloned().unwrap_or(Value::Nil);
        env.arithmetic.binary(env.host, self.op, lhs, &rhs)
    }
}
