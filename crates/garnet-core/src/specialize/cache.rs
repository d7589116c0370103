//! Polymorphic inline cache for one call site

use std::fmt;

use smallvec::SmallVec;

use garnet_value::{Arithmetic, CoreError, CoreResult, Host, Value};

use super::guard::{Guard, Shape};

/// Services available to routines during a call
pub struct Env<'a> {
    /// Equality, hashing, comparison and coercion
    pub host: &'a mut dyn Host,
    /// Integer promotion policy
    pub arithmetic: &'a Arithmetic,
}

impl<'a> Env<'a> {
    /// Bundle a host with an arithmetic policy
    pub fn new(host: &'a mut dyn Host, arithmetic: &'a Arithmetic) -> Self {
        Self { host, arithmetic }
    }
}

/// Why a specialized routine did not produce a result
#[derive(Debug, Clone, PartialEq)]
pub enum Bailout {
    /// An assumption beyond the guard failed; nothing was mutated
    Deoptimize,
    /// A domain error to report to the caller
    Error(CoreError),
}

impl From<CoreError> for Bailout {
    fn from(e: CoreError) -> Self {
        Bailout::Error(e)
    }
}

/// Result type of specialized routines
pub type RoutineResult<T> = Result<T, Bailout>;

/// Specialized routine body
pub type Routine<S> = fn(
    &S,
    &mut Env<'_>,
    &mut <S as Specializer>::Receiver,
    &[Value],
) -> RoutineResult<<S as Specializer>::Output>;

/// A routine together with the guard under which it is valid
pub struct Specialization<S: Specializer> {
    /// Routine name, used for logging and rewrite tracking
    pub name: &'static str,
    /// Shapes the routine accepts
    pub guard: Guard,
    /// Routine body
    pub routine: Routine<S>,
}

impl<S: Specializer> Specialization<S> {
    /// Specialization valid under `guard`
    pub fn new(name: &'static str, guard: Guard, routine: Routine<S>) -> Self {
        Self {
            name,
            guard,
            routine,
        }
    }
}

impl<S: Specializer> Clone for Specialization<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            guard: self.guard.clone(),
            routine: self.routine,
        }
    }
}

impl<S: Specializer> fmt::Debug for Specialization<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specialization")
            .field("name", &self.name)
            .field("guard", &self.guard)
            .finish()
    }
}

/// One operation that can be specialized per operand shape
pub trait Specializer: Sized {
    /// Receiver type
    type Receiver: ?Sized;
    /// Result type
    type Output;

    /// Operation name for logs
    fn name(&self) -> &'static str;

    /// Shape of a concrete call
    fn shape(&self, receiver: &Self::Receiver, args: &[Value]) -> Shape;

    /// Choose a routine for `shape`
    ///
    /// Routines named in `rewritten` bailed out at this site before and must
    /// not be chosen again.
    fn specialize(&self, shape: &Shape, rewritten: &[&'static str]) -> Specialization<Self>;

    /// Uncached path; every specialized routine must agree with it
    fn generic(
        &self,
        env: &mut Env<'_>,
        receiver: &mut Self::Receiver,
        args: &[Value],
    ) -> CoreResult<Self::Output>;
}

/// Lifecycle of a call-site cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Never called
    Uninitialized,
    /// One cached routine
    Monomorphic,
    /// Several cached routines
    Polymorphic,
    /// Too many shapes; every call takes the generic path
    Megamorphic,
}

/// Call counters for one site
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls served by a cached routine
    pub hits: u64,
    /// Calls that had to install a routine
    pub misses: u64,
    /// Routines dropped after bailing out
    pub deoptimizations: u64,
    /// Calls served by the generic path after going megamorphic
    pub megamorphic_calls: u64,
}

/// Bounded set of specializations observed at one call site
pub struct CallSiteCache<S: Specializer> {
    specializer: S,
    entries: SmallVec<[Specialization<S>; 4]>,
    limit: usize,
    megamorphic: bool,
    rewritten: SmallVec<[&'static str; 2]>,
    stats: CacheStats,
}

impl<S: Specializer> CallSiteCache<S> {
    /// Empty cache holding at most `limit` specializations
    pub fn new(specializer: S, limit: usize) -> Self {
        Self {
            specializer,
            entries: SmallVec::new(),
            limit: limit.max(1),
            megamorphic: false,
            rewritten: SmallVec::new(),
            stats: CacheStats::default(),
        }
    }

    /// The operation this site performs
    pub fn specializer(&self) -> &S {
        &self.specializer
    }

    /// Current state
    pub fn state(&self) -> CacheState {
        if self.megamorphic {
            return CacheState::Megamorphic;
        }
        match self.entries.len() {
            0 => CacheState::Uninitialized,
            1 => CacheState::Monomorphic,
            _ => CacheState::Polymorphic,
        }
    }

    /// Counters
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Names of the cached routines, oldest first
    pub fn routines(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    /// Cached specializations, oldest first
    pub fn entries(&self) -> &[Specialization<S>] {
        &self.entries
    }

    /// Routines that bailed out at this site
    pub fn rewritten(&self) -> &[&'static str] {
        &self.rewritten
    }

    /// Run the operation, using or installing a specialized routine
    pub fn dispatch(
        &mut self,
        env: &mut Env<'_>,
        receiver: &mut S::Receiver,
        args: &[Value],
    ) -> CoreResult<S::Output> {
        loop {
            if self.megamorphic {
                self.stats.megamorphic_calls += 1;
                return self.specializer.generic(env, receiver, args);
            }
            let shape = self.specializer.shape(receiver, args);
            let index = match self.entries.iter().position(|e| e.guard.accepts(&shape)) {
                Some(index) => {
                    self.stats.hits += 1;
                    index
                }
                None => {
                    self.stats.misses += 1;
                    match self.install(&shape) {
                        Some(index) => index,
                        None => continue,
                    }
                }
            };
            let routine = self.entries[index].routine;
            match routine(&self.specializer, env, receiver, args) {
                Ok(output) => return Ok(output),
                Err(Bailout::Error(e)) => return Err(e),
                Err(Bailout::Deoptimize) => self.deoptimize(index),
            }
        }
    }

    /// Add a routine for `shape`; `None` once the site went megamorphic
    fn install(&mut self, shape: &Shape) -> Option<usize> {
        if self.entries.len() >= self.limit {
            tracing::debug!(
                site = self.specializer.name(),
                shape = %shape,
                limit = self.limit,
                "call site megamorphic"
            );
            self.entries.clear();
            self.megamorphic = true;
            return None;
        }
        let specialization = self.specializer.specialize(shape, &self.rewritten);
        if self.rewritten.contains(&specialization.name) {
            tracing::debug!(
                site = self.specializer.name(),
                routine = specialization.name,
                "no replacement for rewritten routine, going megamorphic"
            );
            self.entries.clear();
            self.megamorphic = true;
            return None;
        }
        tracing::debug!(
            site = self.specializer.name(),
            routine = specialization.name,
            guard = %specialization.guard,
            "specialized"
        );
        self.entries.push(specialization);
        Some(self.entries.len() - 1)
    }

    fn deoptimize(&mut self, index: usize) {
        let removed = self.entries.remove(index);
        tracing::debug!(
            site = self.specializer.name(),
            routine = removed.name,
            "deoptimized"
        );
        self.stats.deoptimizations += 1;
        if !self.rewritten.contains(&removed.name) {
            self.rewritten.push(removed.name);
        }
    }

    /// Drop every cached routine and start over
    pub fn reset(&mut self) {
        self.entries.clear();
        self.rewritten.clear();
        self.megamorphic = false;
        self.stats = CacheStats::default();
    }
}

impl<S: Specializer> fmt::Debug for CallSiteCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSiteCache")
            .field("site", &self.specializer.name())
            .field("state", &self.state())
            .field("entries", &self.entries)
            .field("rewritten", &self.rewritten)
            .field("stats", &self.stats)
            .finish()
    }
}
