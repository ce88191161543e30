//! ResponseCache expiry and LRU eviction, driven by a manual clock.

use std::sync::Arc;
use std::time::Duration;

use europarl_gateway::clock::ManualClock;
use europarl_gateway::{CacheConfig, ResponseCache};

fn cache(max_entries: usize) -> (ResponseCache<&'static str>, Arc<ManualClock>) {
    let clock = ManualClock::shared();
    let config = CacheConfig::new()
        .max_entries(max_entries)
        .ttl(Duration::from_secs(60));
    (ResponseCache::with_clock(&config, clock.clone()), clock)
}

#[test]
fn entry_visible_until_ttl_elapses() {
    let (cache, clock) = cache(10);
    cache.set("a", "X", Duration::from_millis(1000));

    clock.advance(Duration::from_millis(999));
    assert_eq!(cache.get("a"), Some("X"));

    clock.advance(Duration::from_millis(2));
    assert_eq!(cache.get("a"), None);
}

#[test]
fn entry_expires_exactly_at_ttl() {
    let (cache, clock) = cache(10);
    cache.set("a", "X", Duration::from_millis(1000));
    clock.advance(Duration::from_millis(1000));
    assert!(!cache.contains_key("a"));
}

#[test]
fn expired_entries_are_purged_on_lookup() {
    let (cache, clock) = cache(10);
    cache.set("a", "X", Duration::from_millis(10));
    cache.set("b", "Y", Duration::from_secs(10));
    clock.advance(Duration::from_millis(20));

    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.len(), 1);
}

#[test]
fn lru_evicts_least_recently_read_not_oldest_insert() {
    let (cache, _clock) = cache(2);
    cache.insert("a", "A");
    cache.insert("b", "B");
    cache.insert("c", "C");
    assert_eq!(cache.get("a"), None, "a is evicted when c arrives");

    assert_eq!(cache.get("b"), Some("B"));
    cache.insert("d", "D");

    assert_eq!(cache.get("b"), Some("B"));
    assert_eq!(cache.get("d"), Some("D"));
    assert_eq!(cache.get("c"), None);
    assert_eq!(cache.len(), 2);
}

#[test]
fn reading_refreshes_recency() {
    let (cache, _clock) = cache(3);
    cache.insert("a", "A");
    cache.insert("b", "B");
    cache.insert("c", "C");

    assert!(cache.get("a").is_some());
    cache.insert("d", "D");

    assert!(cache.contains_key("a"));
    assert!(!cache.contains_key("b"));
    assert!(cache.contains_key("c"));
    assert!(cache.contains_key("d"));
}

#[test]
fn expired_entries_are_swept_before_evicting_live_ones() {
    let (cache, clock) = cache(2);
    cache.set("short", "S", Duration::from_millis(10));
    cache.set("long", "L", Duration::from_secs(10));
    clock.advance(Duration::from_millis(50));

    cache.insert("new", "N");
    assert!(cache.contains_key("long"));
    assert!(cache.contains_key("new"));
}

#[test]
fn overwrite_replaces_value_and_ttl() {
    let (cache, clock) = cache(2);
    cache.set("a", "old", Duration::from_millis(10));
    cache.set("a", "new", Duration::from_secs(10));
    clock.advance(Duration::from_millis(50));

    assert_eq!(cache.get("a"), Some("new"));
    assert_eq!(cache.len(), 1);
}

#[test]
fn invalidate_and_clear() {
    let (cache, _clock) = cache(4);
    cache.insert("a", "A");
    cache.insert("b", "B");

    assert!(cache.invalidate("a"));
    assert!(!cache.invalidate("a"));
    assert_eq!(cache.len(), 1);

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn zero_capacity_is_clamped_to_one() {
    let (cache, _clock) = cache(0);
    cache.insert("a", "A");
    cache.insert("b", "B");
    assert_eq!(cache.max_entries(), 1);
    assert_eq!(cache.get("b"), Some("B"));
    assert_eq!(cache.len(), 1);
}
