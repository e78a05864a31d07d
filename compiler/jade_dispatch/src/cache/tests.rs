use jade_resolve::ImplId;
use pretty_assertions::assert_eq;

use crate::{InlineCache, InlineCacheConfig};

fn imp(raw: u32) -> ImplId {
    ImplId::from_raw(raw)
}

#[test]
fn starts_at_one_slot() {
    let cache = InlineCache::default();
    assert_eq!(cache.capacity(), 1);
    assert!(cache.is_empty());
}

#[test]
fn hit_after_insert() {
    let mut cache = InlineCache::default();
    cache.insert(100, imp(1));
    assert_eq!(cache.lookup(100), Some(imp(1)));
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().misses, 0);
}

#[test]
fn single_slot_evicts_on_second_insert() {
    let mut cache = InlineCache::default();
    cache.insert(100, imp(1));
    cache.insert(200, imp(2));
    assert_eq!(cache.lookup(100), None);
    assert_eq!(cache.lookup(200), Some(imp(2)));
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn reinserting_same_key_is_not_an_eviction() {
    let mut cache = InlineCache::default();
    cache.insert(100, imp(1));
    cache.insert(100, imp(2));
    assert_eq!(cache.stats().evictions, 0);
    assert_eq!(cache.lookup(100), Some(imp(2)));
}

#[test]
fn lru_entry_is_the_victim() {
    let config = InlineCacheConfig {
        initial_capacity: 2,
        ..InlineCacheConfig::default()
    };
    let mut cache = InlineCache::new(config);
    cache.insert(1, imp(1));
    cache.insert(2, imp(2));
    // Touch 1 so 2 becomes least recently used.
    assert_eq!(cache.lookup(1), Some(imp(1)));
    cache.insert(3, imp(3));

    assert_eq!(cache.lookup(2), None);
    assert_eq!(cache.lookup(1), Some(imp(1)));
    assert_eq!(cache.lookup(3), Some(imp(3)));
}

#[test]
fn miss_pressure_doubles_capacity_up_to_max() {
    let mut cache = InlineCache::default();
    // Every access in the window is a miss on a fresh key.
    for i in 0..100u64 {
        let _ = cache.lookup(i);
    }
    assert_eq!(cache.capacity(), 2);
    assert_eq!(cache.stats().resizes, 1);

    for window in 1..5u64 {
        for i in 0..100u64 {
            let _ = cache.lookup(window * 1000 + i);
        }
    }
    // 1 → 2 → 4 → 8, then pinned at the max.
    assert_eq!(cache.capacity(), 8);
    assert_eq!(cache.stats().resizes, 3);
}

#[test]
fn low_miss_rate_does_not_resize() {
    let mut cache = InlineCache::default();
    cache.insert(42, imp(1));
    for _ in 0..300 {
        let _ = cache.lookup(42);
    }
    assert_eq!(cache.capacity(), 1);
    assert_eq!(cache.stats().resizes, 0);
}

#[test]
fn clear_keeps_counters_and_capacity() {
    let config = InlineCacheConfig {
        initial_capacity: 4,
        ..InlineCacheConfig::default()
    };
    let mut cache = InlineCache::new(config);
    cache.insert(1, imp(1));
    cache.insert(2, imp(2));
    cache.clear();

    assert!(cache.is_empty());
    assert_eq!(cache.capacity(), 4);
    assert_eq!(cache.stats().clears, 1);
}
