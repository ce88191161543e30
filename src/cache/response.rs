//! Bounded LRU + TTL response cache.
//!
//! [`ResponseCache`] holds parsed responses keyed on a [`CacheKey`](super::CacheKey)
//! string. Every entry carries its own TTL; an entry is visible only while
//! `now < stored_at + ttl`.
//!
//! # Architecture
//!
//! Entries live in an `IndexMap` ordered from least to most recently
//! touched. A read moves the entry to the back; an insert appends. When the
//! store is full, the front entry is evicted. Because the order is a
//! sequence rather than a timestamp, two entries can never tie: entries
//! warmed in bulk are evicted in the order they were inserted.
//!
//! Expired entries are dropped lazily when a lookup finds them, and swept
//! opportunistically on every `set`.
//!
//! The cache is advisory. It has no error paths, and callers must behave
//! correctly if every lookup misses.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::time::Instant;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::sync::lock;

/// Configuration for the response cache.
///
/// ```rust
/// # use europarl_gateway::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(1_000)
///     .ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 500.
    pub max_entries: usize,
    /// Default time-to-live for cached entries. Default: 15 minutes.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 500,
            ttl: Duration::from_secs(15 * 60),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the default time-to-live.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// One stored response.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Whether the entry is no longer visible at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) >= self.ttl
    }
}

/// In-memory response cache. See module docs for eviction semantics.
pub struct ResponseCache<V = serde_json::Value> {
    entries: std::sync::Mutex<IndexMap<String, CacheEntry<V>>>,
    max_entries: usize,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> ResponseCache<V> {
    /// Create a cache driven by the system clock.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache driven by the given clock.
    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: std::sync::Mutex::new(IndexMap::new()),
            max_entries: config.max_entries.max(1),
            default_ttl: config.ttl,
            clock,
        }
    }

    /// Look up a live entry, marking it most recently used.
    ///
    /// Returns `None` for a missing key; an expired entry is removed and
    /// reported as missing.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = lock(&self.entries);
        let index = entries.get_index_of(key)?;
        let expired = entries
            .get_index(index)
            .is_some_and(|(_, entry)| entry.is_expired(now));
        if expired {
            entries.shift_remove_index(index);
            debug!(key, "dropped expired cache entry");
            return None;
        }
        let last = entries.len() - 1;
        entries.move_index(index, last);
        entries.get_index(last).map(|(_, entry)| entry.value.clone())
    }

    /// Insert or overwrite an entry with an explicit TTL.
    ///
    /// Expired entries are swept first; if the store is still full, the
    /// least recently used entry is evicted.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let now = self.clock.now();
        let mut entries = lock(&self.entries);
        entries.retain(|_, entry| !entry.is_expired(now));
        entries.shift_remove(&key);
        while entries.len() >= self.max_entries {
            match entries.shift_remove_index(0) {
                Some((evicted, _)) => debug!(key = %evicted, "evicted least recently used entry"),
                None => break,
            }
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
                ttl,
            },
        );
    }

    /// Insert or overwrite an entry with the configured default TTL.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Whether a live entry exists, without affecting LRU order.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = self.clock.now();
        lock(&self.entries)
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Remove one entry. Returns whether it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        lock(&self.entries).shift_remove(key).is_some()
    }

    /// Evict all entries.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        lock(&self.entries)
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

impl<V> fmt::Debug for ResponseCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &lock(&self.entries).len())
            .field("max_entries", &self.max_entries)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache(max: usize, clock: Arc<ManualClock>) -> ResponseCache<u32> {
        ResponseCache::with_clock(&CacheConfig::new().max_entries(max), clock)
    }

    #[test]
    fn overwrite_refreshes_position_and_ttl() {
        let clock = ManualClock::shared();
        let cache = cache(2, clock.clone());
        cache.set("a", 1, Duration::from_millis(10));
        cache.set("b", 2, Duration::from_secs(60));
        clock.advance(Duration::from_millis(5));
        cache.set("a", 3, Duration::from_millis(10));
        cache.set("c", 4, Duration::from_secs(60));
        // "b" was least recently touched once "a" was rewritten
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(3));
        clock.advance(Duration::from_millis(9));
        assert_eq!(cache.get("a"), Some(3));
    }

    #[test]
    fn set_sweeps_expired_before_evicting() {
        let clock = ManualClock::shared();
        let cache = cache(2, clock.clone());
        cache.set("short", 1, Duration::from_millis(10));
        cache.set("long", 2, Duration::from_secs(60));
        clock.advance(Duration::from_millis(20));
        cache.set("new", 3, Duration::from_secs(60));
        // the expired entry made room, so nothing live was evicted
        assert_eq!(cache.get("long"), Some(2));
        assert_eq!(cache.get("new"), Some(3));
    }

    #[test]
    fn zero_max_entries_still_holds_one() {
        let cache = ResponseCache::<u32>::with_clock(
            &CacheConfig::new().max_entries(0),
            ManualClock::shared(),
        );
        cache.insert("a", 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.max_entries(), 1);
    }
}
