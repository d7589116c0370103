//! Garnet core containers
//!
//! This crate provides the representation-polymorphic layer under the Ruby
//! core classes:
//! - Array storage strategies and their promotion lattice
//! - The Array and Hash containers, including the bucket hash engine
//! - Per-call-site specialization with polymorphic inline caches
//! - Block flow control (`next`/`break`/`redo`) for iteration helpers
//! - Tuning options and the coarse global lock

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod array;
pub mod flow;
pub mod hash;
pub mod lock;
pub mod options;
pub mod specialize;
pub mod storage;

pub use array::RubyArray;
pub use flow::{Completion, Flow};
pub use hash::{DefaultProc, HashStorageKind, KeyMatcher, RubyHash};
pub use lock::{CoreContext, GlobalLock};
pub use options::{CoreOptions, OptionsError};
pub use specialize::{
    ArrayPush, ArrayRead, ArrayWrite, CacheState, CacheStats, CallSiteCache, Env, HashGet,
    HashSet, NumericBinary, SiteArena, SiteId, Specializer,
};
pub use storage::{ArrayStorage, Packed, StorageKind};

pub use garnet_value::{
    Arithmetic, BinaryOp, ClassHandle, CoreError, CoreResult, DefaultHost, Host, ObjectHandle,
    UnaryOp, Value, ValueKind,
};
