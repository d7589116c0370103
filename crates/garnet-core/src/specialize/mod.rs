//! Call-site specialization
//!
//! A call site owns a [`CallSiteCache`]. On each call the cache computes the
//! operand [`Shape`] and runs the first cached routine whose [`Guard`]
//! accepts it. On a miss it asks the site's [`Specializer`] for a routine,
//! installs it and runs it. Past `inline_cache_limit` routines the site goes
//! megamorphic and every call takes the generic path.
//!
//! Routines may bail out with [`Bailout::Deoptimize`] when an assumption the
//! guard cannot see fails (a fixnum add overflowing, a packed hash being
//! full). The routine is then dropped and remembered as rewritten, and the
//! specializer picks something more general for the same shape.

mod arena;
pub mod array_sites;
mod cache;
mod guard;
pub mod hash_sites;
pub mod numeric_sites;

pub use arena::{SiteArena, SiteId};
pub use array_sites::{ArrayPush, ArrayRead, ArrayWrite};
pub use cache::{
    Bailout, CacheState, CacheStats, CallSiteCache, Env, Routine, RoutineResult, Specialization,
    Specializer,
};
pub use guard::{Guard, ReceiverShape, Shape};
pub use hash_sites::{HashGet, HashSet};
pub use numeric_sites::NumericBinary;
