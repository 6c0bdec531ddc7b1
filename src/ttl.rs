//! # TTL Cache Module
//!
//! A capacity-bounded, time-expiring key/value cache shared by the copier's
//! type-pair cache and the [`dict`](crate::dict) module.
//!
//! ## Behavior
//!
//! - **Capacity**: bounded by an [`LruCache`]; inserting past capacity evicts
//!   the least-recently-used entry.
//! - **Expiry**: every entry carries a deadline of `insert time + ttl`. Expired
//!   entries are dropped lazily on access or in bulk via
//!   [`TtlCache::purge_expired`]. A TTL too large to represent as an
//!   [`Instant`] never expires.
//! - **Notifications**: insertions, updates and evictions are logged through
//!   `tracing` with the cache name attached.
//!
//! ## Thread Safety
//!
//! The LRU is wrapped in `Arc<Mutex<..>>` (LRU reads reorder entries, so even a
//! `get` needs exclusive access). Cloning a `TtlCache` yields another handle to
//! the same storage. Values are cloned out, so store `Arc<_>` for anything
//! expensive.

use lru::LruCache;
use std::borrow::Borrow;
use std::fmt::Debug;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

struct Entry<V> {
    value: V,
    /// `None` when `insert time + ttl` overflows `Instant`.
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Thread-safe LRU cache with per-entry time-to-live.
pub struct TtlCache<K: Hash + Eq, V> {
    name: Arc<str>,
    ttl: Duration,
    entries: Arc<Mutex<LruCache<K, Entry<V>>>>,
}

impl<K: Hash + Eq, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            ttl: self.ttl,
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Debug,
    V: Clone,
{
    /// Create an empty cache.
    ///
    /// # Arguments
    ///
    /// * `name` - Label attached to every log line emitted by this cache
    /// * `ttl` - Lifetime of an entry from its last insertion
    /// * `capacity` - Maximum number of live entries
    pub fn new(name: impl Into<String>, ttl: Duration, capacity: NonZeroUsize) -> Self {
        let name: String = name.into();
        debug!(
            cache = %name,
            ttl_secs = ttl.as_secs_f64(),
            capacity = capacity.get(),
            "TTL cache created"
        );
        Self {
            name: Arc::from(name),
            ttl,
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    // A panic while holding the lock cannot leave the LRU half-updated in a
    // way that matters to callers, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, LruCache<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    /// Get a live entry, marking it most-recently-used.
    ///
    /// An expired entry is removed and reported as absent.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Debug + ?Sized,
    {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }
        entries.pop(key);
        debug!(cache = %self.name, key = ?key, "TTL cache entry expired");
        None
    }

    /// Whether a live entry exists, without touching recency.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        self.lock()
            .peek(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Insert or replace an entry, restarting its TTL.
    ///
    /// Returns the previous live value for the key, if any.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let now = Instant::now();
        let entry = Entry {
            value,
            expires_at: now.checked_add(self.ttl),
        };
        let mut entries = self.lock();
        if let Some(previous) = entries.peek_mut(&key) {
            let previous = std::mem::replace(previous, entry);
            entries.promote(&key);
            debug!(cache = %self.name, key = ?key, "TTL cache entry updated");
            return (!previous.is_expired(now)).then_some(previous.value);
        }
        debug!(
            cache = %self.name,
            key = ?key,
            size = entries.len() + 1,
            "TTL cache entry inserted"
        );
        if let Some((evicted, _)) = entries.push(key, entry) {
            debug!(cache = %self.name, key = ?evicted, "TTL cache entry evicted");
        }
        None
    }

    /// Remove an entry, returning its value if it was still live.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Debug + ?Sized,
    {
        let now = Instant::now();
        let removed = self.lock().pop(key)?;
        debug!(cache = %self.name, key = ?key, "TTL cache entry removed");
        (!removed.is_expired(now)).then_some(removed.value)
    }

    /// Drop every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize
    where
        K: Clone,
    {
        let now = Instant::now();
        let mut entries = self.lock();
        let stale: Vec<K> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        if !stale.is_empty() {
            debug!(cache = %self.name, purged = stale.len(), "TTL cache purged expired entries");
        }
        stale.len()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        let mut entries = self.lock();
        let size = entries.len();
        entries.clear();
        debug!(cache = %self.name, cleared = size, "TTL cache cleared");
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_insert_get_and_update() {
        let cache = TtlCache::new("test", Duration::from_secs(60), capacity(4));
        assert_eq!(cache.insert("a".to_string(), 1), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.insert("a".to_string(), 2), Some(1));
        assert_eq!(cache.get("a"), Some(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.name(), "test");
        assert_eq!(cache.capacity(), 4);
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let cache = TtlCache::new("lru", Duration::from_secs(60), capacity(2));
        cache.insert(1u32, "one");
        cache.insert(2u32, "two");
        // touch 1 so 2 becomes the eviction candidate
        assert_eq!(cache.get(&1), Some("one"));
        cache.insert(3u32, "three");
        assert_eq!(cache.len(), 2);
        assert!(cache.contains_key(&1));
        assert!(!cache.contains_key(&2));
        assert!(cache.contains_key(&3));
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let cache = TtlCache::new("ttl", Duration::from_millis(20), capacity(8));
        cache.insert("k", 10);
        assert_eq!(cache.get(&"k"), Some(10));
        thread::sleep(Duration::from_millis(40));
        assert!(!cache.contains_key(&"k"));
        assert_eq!(cache.get(&"k"), None);
        // lazily removed on access
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_unrepresentable_ttl_never_expires() {
        let cache = TtlCache::new("forever", Duration::MAX, capacity(4));
        assert_eq!(cache.insert("k", 1), None);
        assert_eq!(cache.get(&"k"), Some(1));
        assert!(cache.contains_key(&"k"));
        assert_eq!(cache.purge_expired(), 0);
        assert_eq!(cache.insert("k", 2), Some(1));
        assert_eq!(cache.remove(&"k"), Some(2));
    }

    #[test]
    fn test_purge_expired_keeps_live_entries() {
        let cache = TtlCache::new("purge", Duration::from_millis(20), capacity(8));
        cache.insert("old-1", 1);
        cache.insert("old-2", 2);
        thread::sleep(Duration::from_millis(40));
        cache.insert("fresh", 3);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"fresh"), Some(3));
        assert_eq!(cache.purge_expired(), 0);
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = TtlCache::new("rm", Duration::from_secs(60), capacity(8));
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.remove(&"a"), Some(1));
        assert_eq!(cache.remove(&"a"), None);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = TtlCache::new("shared", Duration::from_secs(60), capacity(8));
        let handle = cache.clone();
        handle.insert(7u8, "seven");
        assert_eq!(cache.get(&7), Some("seven"));
    }
}
