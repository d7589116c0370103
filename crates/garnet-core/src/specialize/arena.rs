//! Call-site slots
//!
//! The interpreter owns one arena per operation kind and stores a [`SiteId`]
//! in each instruction that performs it.

use garnet_value::{CoreError, CoreResult, Value};

use super::cache::{CallSiteCache, Env, Specializer};
use crate::options::CoreOptions;

/// Index of a call site within its arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteId(u32);

impl SiteId {
    /// Position in the arena
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Arena of call-site caches for one operation kind
pub struct SiteArena<S: Specializer> {
    sites: Vec<CallSiteCache<S>>,
    limit: usize,
}

impl<S: Specializer> SiteArena<S> {
    /// Empty arena whose caches hold at most `limit` entries
    pub fn new(limit: usize) -> Self {
        Self {
            sites: Vec::new(),
            limit,
        }
    }

    /// Empty arena using the configured cache bound
    pub fn with_options(options: &CoreOptions) -> Self {
        Self::new(options.inline_cache_limit)
    }

    /// Allocate a fresh site
    pub fn add(&mut self, specializer: S) -> SiteId {
        let id = SiteId(self.sites.len() as u32);
        self.sites.push(CallSiteCache::new(specializer, self.limit));
        id
    }

    /// Site cache by id
    pub fn get(&self, id: SiteId) -> Option<&CallSiteCache<S>> {
        self.sites.get(id.index())
    }

    /// Mutable site cache by id
    pub fn get_mut(&mut self, id: SiteId) -> Option<&mut CallSiteCache<S>> {
        self.sites.get_mut(id.index())
    }

    /// Run the operation at site `id`
    pub fn dispatch(
        &mut self,
        id: SiteId,
        env: &mut Env<'_>,
        receiver: &mut S::Receiver,
        args: &[Value],
    ) -> CoreResult<S::Output> {
        self.sites
            .get_mut(id.index())
            .ok_or(CoreError::Unsupported("unknown call site"))?
            .dispatch(env, receiver, args)
    }

    /// Number of sites
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Whether no site was allocated
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// All sites with their ids
    pub fn iter(&self) -> impl Iterator<Item = (SiteId, &CallSiteCache<S>)> + '_ {
        self.sites
            .iter()
            .enumerate()
            .map(|(i, site)| (SiteId(i as u32), site))
    }
}
