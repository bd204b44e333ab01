//! In-memory cache for storing key-value pairs.
//!
//! Uses moka's concurrent cache implementation.

use std::time::Duration;

use moka::{
    ops::compute::{CompResult, Op},
    sync::Cache,
};

/// Thread-safe in-memory cache with a capacity bound and optional idle expiry.
///
/// Used for conversation sessions (`MemCache<String, Session>`), where the
/// capacity caps the number of live sessions and entries not read or written
/// within the idle timeout are evicted.
#[derive(Clone)]
pub struct MemCache<K, V> {
    entries: Cache<K, V>,
}

impl<K, V> MemCache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Allocate a new [`MemCache`] bounded by `capacity` entries.
    pub fn new(capacity: u64) -> Self {
        Self {
            entries: Cache::new(capacity),
        }
    }

    /// Allocate a new [`MemCache`] whose entries expire after `idle` without access.
    pub fn with_idle_timeout(
        capacity: u64,
        idle: Duration,
    ) -> Self {
        Self {
            entries: Cache::builder().max_capacity(capacity).time_to_idle(idle).build(),
        }
    }

    /// Insert or replace the value stored under `key`.
    pub fn set(
        &self,
        key: K,
        value: V,
    ) {
        self.entries.insert(key, value);
    }

    /// Get a clone of the value stored under `key`.
    pub fn get(
        &self,
        key: &K,
    ) -> Option<V> {
        self.entries.get(key)
    }

    /// Replace the value under `key` with `f(current)` in one step, `current`
    /// being `None` when the key is absent. Returns the stored value.
    pub fn upsert(
        &self,
        key: K,
        f: impl FnOnce(Option<V>) -> V,
    ) -> V {
        self.entries.entry(key).and_upsert_with(|entry| f(entry.map(|e| e.into_value()))).into_value()
    }

    /// Like [`MemCache::upsert`], but leaves an absent key absent.
    pub fn update(
        &self,
        key: K,
        f: impl FnOnce(V) -> V,
    ) -> Option<V> {
        let result = self.entries.entry(key).and_compute_with(|entry| match entry {
            Some(e) => Op::Put(f(e.into_value())),
            None => Op::Nop,
        });
        match result {
            CompResult::ReplacedWith(e) => Some(e.into_value()),
            _ => None,
        }
    }

    /// Remove `key`, returning the value it held.
    pub fn remove(
        &self,
        key: &K,
    ) -> Option<V> {
        self.entries.remove(key)
    }

    /// Apply pending evictions so that `len` and `iter` reflect them.
    pub fn sync(&self) {
        self.entries.run_pending_tasks();
    }

    /// Approximate number of live entries.
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Return an iterator over the entries of the cache.
    pub fn iter(&self) -> moka::sync::Iter<'_, K, V> {
        self.entries.iter()
    }
}
