//! Iteration flow control
//!
//! Blocks report `next`, `break` and `redo` as ordinary return values. Errors
//! raised inside a block travel separately through `CoreResult` and are never
//! confused with loop control.

use garnet_value::{CoreResult, Value};

/// What a block asks the iterating container to do
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Block finished normally (or via `next`) with this value
    Next(Value),
    /// Leave the loop; the whole iteration evaluates to this value
    Break(Value),
    /// Run the block again for the same element
    Redo,
}

impl Flow {
    /// Normal completion with `nil`
    pub fn nil() -> Self {
        Flow::Next(Value::Nil)
    }
}

impl From<Value> for Flow {
    fn from(v: Value) -> Self {
        Flow::Next(v)
    }
}

/// Outcome of an iteration helper
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<T> {
    /// The loop ran to the end
    Done(T),
    /// A block broke out with this value
    Broken(Value),
}

impl<T> Completion<T> {
    /// Map the result of a loop that ran to the end
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Completion<U> {
        match self {
            Completion::Done(t) => Completion::Done(f(t)),
            Completion::Broken(v) => Completion::Broken(v),
        }
    }

    /// Whether a block broke out
    pub fn is_broken(&self) -> bool {
        matches!(self, Completion::Broken(_))
    }

    /// The finished value, if the loop was not broken
    pub fn done(self) -> Option<T> {
        match self {
            Completion::Done(t) => Some(t),
            Completion::Broken(_) => None,
        }
    }
}

/// A block invocation with `redo` already resolved
pub(crate) enum Step {
    Continue(Value),
    Stop(Value),
}

/// Invoke a block, repeating it for as long as it asks for `redo`
pub(crate) fn run_block(mut attempt: impl FnMut() -> CoreResult<Flow>) -> CoreResult<Step> {
    loop {
        match attempt()? {
            Flow::Next(v) => return Ok(Step::Continue(v)),
            Flow::Break(v) => return Ok(Step::Stop(v)),
            Flow::Redo => {}
        }
    }
}

impl Completion<Value> {
    /// Collapse to the value the iteration expression evaluates to
    pub fn into_value(self) -> Value {
        match self {
            Completion::Done(v) | Completion::Broken(v) => v,
        }
    }
}
