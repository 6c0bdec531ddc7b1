//! Type-pair cache of compiled copiers.
//!
//! ## Cache Key Structure
//!
//! Entries are keyed by [`TypePair`], the `TypeId`s of the source and
//! destination struct types. Sample values only select the types; their
//! contents never influence the key.
//!
//! ## Thread Safety
//!
//! Lookups and insertions go through the shared [`TtlCache`]. Compilation runs
//! outside the lock, so two threads missing on the same pair may both compile;
//! the later insert wins and both plans are equivalent.
//!
//! ## Expiry
//!
//! Entries live for the configured TTL (default 30 minutes) and the cache holds
//! at most the configured capacity (default 128). An evicted or expired entry is
//! simply recompiled on its next use.

use super::{copy_each, Copier, CopyError};
use crate::reflect::Reflect;
use crate::runtime_config::RuntimeConfig;
use crate::ttl::TtlCache;
use std::any::{type_name, TypeId};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Default lifetime of a cached copier.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Default number of cached copiers.
pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(128) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

/// Cache key: the (source, destination) type combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypePair {
    pub source: TypeId,
    pub dest: TypeId,
}

impl TypePair {
    pub fn of<S: Reflect, D: Reflect>() -> Self {
        Self {
            source: TypeId::of::<S>(),
            dest: TypeId::of::<D>(),
        }
    }
}

/// Thread-safe cache of [`Copier`]s keyed by [`TypePair`].
///
/// Cloning yields another handle to the same cache.
#[derive(Clone)]
pub struct CopierCache {
    copiers: TtlCache<TypePair, Arc<Copier>>,
}

impl Default for CopierCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

impl CopierCache {
    pub fn new(ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            copiers: TtlCache::new("copier", ttl, capacity),
        }
    }

    /// Build a cache using the TTL and capacity from runtime configuration.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let capacity =
            NonZeroUsize::new(config.copier_cache_capacity).unwrap_or(DEFAULT_CAPACITY);
        Self::new(config.copier_cache_ttl, capacity)
    }

    /// Get the cached copier for `S -> D`, compiling and caching it on a miss.
    ///
    /// # Performance
    ///
    /// - Cache hit: one lock acquisition and an `Arc` clone
    /// - Cache miss: descriptor generation and plan compilation, outside the lock
    pub fn get<S: Reflect, D: Reflect>(&self) -> Arc<Copier> {
        let key = TypePair::of::<S, D>();

        if let Some(copier) = self.copiers.get(&key) {
            trace!(
                source = type_name::<S>(),
                dest = type_name::<D>(),
                "Copier cache hit"
            );
            return copier;
        }

        let copier = Arc::new(Copier::new::<S, D>());
        self.copiers.insert(key, Arc::clone(&copier));
        debug!(
            source = type_name::<S>(),
            dest = type_name::<D>(),
            actions = copier.plan().len(),
            cache_size = self.copiers.len(),
            "Copier compiled and cached"
        );
        copier
    }

    /// Like [`CopierCache::get`], with the types taken from sample values.
    pub fn get_for<S: Reflect, D: Reflect>(&self, _source: &S, _dest: &D) -> Arc<Copier> {
        self.get::<S, D>()
    }

    /// Copy `src` into `dest` with the cached copier for their types.
    pub fn copy<D: Reflect, S: Reflect>(&self, dest: &mut D, src: &S) -> Result<(), CopyError> {
        self.get::<S, D>().copy(dest, src)
    }

    /// Copy a slice of `S` into a new vector of `D`.
    ///
    /// An empty input yields an empty output without touching the cache.
    pub fn copy_slice<S: Reflect, D: Reflect + Default>(
        &self,
        src: &[S],
    ) -> Result<Vec<D>, CopyError> {
        if src.is_empty() {
            debug!(
                source = type_name::<S>(),
                dest = type_name::<D>(),
                "Copy of empty slice skipped"
            );
            return Ok(Vec::new());
        }
        copy_each(&self.get::<S, D>(), src)
    }

    /// Whether a live copier for `S -> D` is cached.
    pub fn contains<S: Reflect, D: Reflect>(&self) -> bool {
        self.copiers.contains_key(&TypePair::of::<S, D>())
    }

    /// Number of cached copiers (including expired entries not yet purged).
    pub fn size(&self) -> usize {
        self.copiers.len()
    }

    /// Drop expired copiers, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.copiers.purge_expired()
    }

    pub fn clear(&self) {
        self.copiers.clear();
    }
}
