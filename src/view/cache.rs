//! Bounded LRU identity caches for vertex and edge state.

use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::trace;

/// Hit and miss counters of an [`IdentityCache`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that built a new value.
    pub misses: u64,
    /// Entries pushed out to make room.
    pub evictions: u64,
}

/// Bounded LRU map from an id to a previously built value.
///
/// Purely an allocation-avoidance layer: values must be reconstructible from
/// the key alone, so a miss, an eviction or a different capacity can never
/// change what a caller observes. Not synchronised; use one per thread.
pub struct IdentityCache<K: Hash + Eq, V> {
    name: &'static str,
    entries: LruCache<K, V>,
    stats: CacheStats,
}

impl<K: Hash + Eq + Copy + std::fmt::Debug, V: Clone> IdentityCache<K, V> {
    /// Empty cache; `name` tags its trace events.
    pub fn new(name: &'static str, capacity: NonZeroUsize) -> Self {
        Self {
            name,
            entries: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    /// Returns the cached value for `key`, or builds one with `create`,
    /// inserts it (evicting the least recently used entry when full) and
    /// returns it.
    pub fn get_or_create<F>(&mut self, key: K, create: F) -> V
    where
        F: FnOnce(K) -> V,
    {
        if let Some(value) = self.entries.get(&key) {
            self.stats.hits += 1;
            return value.clone();
        }
        self.stats.misses += 1;
        let value = create(key);
        if let Some((evicted, _)) = self.entries.push(key, value.clone()) {
            self.stats.evictions += 1;
            trace!(cache = self.name, key = ?evicted, "view.cache.evicted");
        }
        value
    }

    /// Whether `key` is cached, without touching its recency.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> NonZeroUsize {
        self.entries.cap()
    }

    /// Counters since creation; [`clear`](Self::clear) keeps them.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
