//! Block iteration over arrays
//!
//! Each helper walks the backing storage, hands every element to the block
//! and reacts to the returned [`Flow`]. A `break` ends the walk and becomes a
//! [`Completion::Broken`]; errors from the block propagate as-is.

use garnet_value::{CoreResult, Value};

use super::RubyArray;
use crate::flow::{run_block, Completion, Flow, Step};

impl RubyArray {
    /// `each`
    pub fn each<F>(&self, mut block: F) -> CoreResult<Completion<()>>
    where
        F: FnMut(&Value) -> CoreResult<Flow>,
    {
        let mut i = 0;
        while i < self.size {
            let element = self.storage.read(i);
            if let Step::Stop(v) = run_block(|| block(&element))? {
                return Ok(Completion::Broken(v));
            }
            i += 1;
        }
        Ok(Completion::Done(()))
    }

    /// `each_with_index`
    pub fn each_with_index<F>(&self, mut block: F) -> CoreResult<Completion<()>>
    where
        F: FnMut(&Value, usize) -> CoreResult<Flow>,
    {
        for i in 0..self.size {
            let element = self.storage.read(i);
            if let Step::Stop(v) = run_block(|| block(&element, i))? {
                return Ok(Completion::Broken(v));
            }
        }
        Ok(Completion::Done(()))
    }

    /// `map`
    pub fn map<F>(&self, mut block: F) -> CoreResult<Completion<RubyArray>>
    where
        F: FnMut(&Value) -> CoreResult<Flow>,
    {
        let mut result = self.sibling();
        for element in self.iter() {
            match run_block(|| block(&element))? {
                Step::Continue(v) => result.append(v)?,
                Step::Stop(v) => return Ok(Completion::Broken(v)),
            }
        }
        Ok(Completion::Done(result))
    }

    /// `map!`; elements already replaced stay replaced after a `break`
    pub fn map_in_place<F>(&mut self, mut block: F) -> CoreResult<Completion<()>>
    where
        F: FnMut(&Value) -> CoreResult<Flow>,
    {
        self.check_frozen()?;
        for i in 0..self.size {
            let element = self.storage.read(i);
            match run_block(|| block(&element))? {
                Step::Continue(v) => self.storage.write(self.size, i, v),
                Step::Stop(v) => return Ok(Completion::Broken(v)),
            }
        }
        Ok(Completion::Done(()))
    }

    /// `select`
    pub fn select<F>(&self, block: F) -> CoreResult<Completion<RubyArray>>
    where
        F: FnMut(&Value) -> CoreResult<Flow>,
    {
        self.filter_by(block, true)
    }

    /// `reject`
    pub fn reject<F>(&self, block: F) -> CoreResult<Completion<RubyArray>>
    where
        F: FnMut(&Value) -> CoreResult<Flow>,
    {
        self.filter_by(block, false)
    }

    fn filter_by<F>(&self, mut block: F, keep_truthy: bool) -> CoreResult<Completion<RubyArray>>
    where
        F: FnMut(&Value) -> CoreResult<Flow>,
    {
        let mut kept = Vec::new();
        for element in self.iter() {
            match run_block(|| block(&element))? {
                Step::Continue(v) => {
                    if v.is_truthy() == keep_truthy {
                        kept.push(element);
                    }
                }
                Step::Stop(v) => return Ok(Completion::Broken(v)),
            }
        }
        Ok(Completion::Done(self.sibling_from(kept)))
    }

    /// `delete_if`
    ///
    /// On `break`, deletions decided so far still happen and the remaining
    /// elements are kept.
    pub fn delete_if<F>(&mut self, mut block: F) -> CoreResult<Completion<()>>
    where
        F: FnMut(&Value) -> CoreResult<Flow>,
    {
        self.check_frozen()?;
        let size = self.size;
        let mut kept = 0;
        let mut outcome = Completion::Done(());
        let mut i = 0;
        while i < size {
            let element = self.storage.read(i);
            let remove = match run_block(|| block(&element)) {
                Ok(Step::Continue(v)) => v.is_truthy(),
                Ok(Step::Stop(v)) => {
                    outcome = Completion::Broken(v);
                    break;
                }
                Err(e) => {
                    self.compact_tail(kept, i, size);
                    return Err(e);
                }
            };
            if !remove {
                if kept != i {
                    self.storage.write(size, kept, element);
                }
                kept += 1;
            }
            i += 1;
        }
        self.compact_tail(kept, i, size);
        Ok(outcome)
    }

    /// Keep `..kept`, then move the unvisited `from..size` down behind it
    fn compact_tail(&mut self, kept: usize, from: usize, size: usize) {
        let removed = from - kept;
        if removed > 0 {
            self.storage.close_gap(size, kept, removed);
        }
        self.size = size - removed;
    }

    /// `inject`; without an initial value the first element seeds the fold
    pub fn inject<F>(&self, initial: Option<Value>, mut block: F) -> CoreResult<Completion<Value>>
    where
        F: FnMut(&Value, &Value) -> CoreResult<Flow>,
    {
        let mut elements = self.iter();
        let mut acc = match initial {
            Some(v) => v,
            None => match elements.next() {
                Some(first) => first,
                None => return Ok(Completion::Done(Value::Nil)),
            },
        };
        for element in elements {
            match run_block(|| block(&acc, &element))? {
                Step::Continue(v) => acc = v,
                Step::Stop(v) => return Ok(Completion::Broken(v)),
            }
        }
        Ok(Completion::Done(acc))
    }
}
