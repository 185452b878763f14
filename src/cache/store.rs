//! Cache Store Module
//!
//! Keyed storage with per-entry expiry, lazy eviction on read and a
//! probabilistic sweep on write. An LRU capacity bound can be switched on
//! explicitly; by default the store is unbounded.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::cache::entry::now_ms;
use crate::cache::{CacheEntry, CacheStats, LruTracker};

/// Chance that a single `set` triggers a full sweep of expired entries.
pub const DEFAULT_SWEEP_PROBABILITY: f64 = 0.1;

// == Cache Store ==
/// Main cache storage, generic over the cached payload.
#[derive(Debug)]
pub struct CacheStore<T> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<T>>,
    /// Access order, only kept when a capacity bound is set
    lru: Option<LruTracker>,
    /// Maximum number of entries, `None` for unbounded
    max_entries: Option<usize>,
    /// Probability in `[0, 1]` that a write sweeps expired entries
    sweep_probability: f64,
}

impl<T> Default for CacheStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CacheStore<T> {
    // == Constructor ==
    /// Creates an unbounded store using the default sweep probability.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            lru: None,
            max_entries: None,
            sweep_probability: DEFAULT_SWEEP_PROBABILITY,
        }
    }

    /// Bounds the store to `max_entries`, evicting the least recently used
    /// entry when a new key would exceed it. Zero means unbounded.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        if max_entries == 0 {
            self.max_entries = None;
            self.lru = None;
        } else {
            let mut lru = LruTracker::new();
            for key in self.entries.keys() {
                lru.touch(key);
            }
            self.max_entries = Some(max_entries);
            self.lru = Some(lru);
        }
        self
    }

    /// Sets the per-write sweep probability, clamped to `[0, 1]`.
    pub fn with_sweep_probability(mut self, probability: f64) -> Self {
        self.sweep_probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        self
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    pub fn sweep_probability(&self) -> f64 {
        self.sweep_probability
    }

    // == Set ==
    /// Inserts or overwrites the entry for `key`, fresh for `ttl` from now.
    ///
    /// Always succeeds. May sweep expired entries as a side effect.
    pub fn set(&mut self, key: impl Into<String>, value: T, ttl: Duration) {
        self.set_at(key.into(), value, ttl, now_ms());
    }

    pub(crate) fn set_at(&mut self, key: String, value: T, ttl: Duration, now: u64) {
        if let Some(max) = self.max_entries {
            if !self.entries.contains_key(&key) && self.entries.len() >= max {
                self.make_room(max, now);
            }
        }

        if let Some(lru) = self.lru.as_mut() {
            lru.touch(&key);
        }
        self.entries.insert(key, CacheEntry::new_at(value, ttl, now));

        if self.sweep_probability > 0.0 && rand::thread_rng().gen_bool(self.sweep_probability) {
            let removed = self.purge_expired_at(now);
            debug!(removed, "Write-triggered sweep");
        }
    }

    /// Frees one slot for a new key: stale entries go first, then the least
    /// recently used one.
    fn make_room(&mut self, max: usize, now: u64) {
        self.purge_expired_at(now);
        while self.entries.len() >= max {
            let Some(evicted) = self.lru.as_mut().and_then(LruTracker::evict_oldest) else {
                break;
            };
            self.entries.remove(&evicted);
            debug!(key = %evicted, "Evicted least recently used entry");
        }
    }

    // == Delete ==
    /// Removes the entry for `key`, returning whether one existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.forget(key).is_some()
    }

    fn forget(&mut self, key: &str) -> Option<CacheEntry<T>> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            if let Some(lru) = self.lru.as_mut() {
                lru.remove(key);
            }
        }
        removed
    }

    // == Clear ==
    /// Removes every entry unconditionally, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        if let Some(lru) = self.lru.as_mut() {
            lru.clear();
        }
        removed
    }

    /// Removes every entry whose key starts with `prefix`, returning how many
    /// were removed.
    pub fn clear_by_prefix(&mut self, prefix: &str) -> usize {
        let doomed: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        for key in &doomed {
            self.forget(key);
        }
        doomed.len()
    }

    // == Has ==
    /// Reports whether any entry, fresh or stale, exists for `key`.
    ///
    /// Diagnostic only: it never evicts and does not check freshness.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Stats ==
    /// Counts entries without removing the stale ones it finds.
    pub fn stats(&self) -> CacheStats {
        self.stats_at(now_ms())
    }

    pub(crate) fn stats_at(&self, now: u64) -> CacheStats {
        let expired = self
            .entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .count();

        CacheStats {
            size: self.entries.len(),
            expired,
            fresh: self.entries.len() - expired,
        }
    }

    // == Purge Expired ==
    /// Removes all expired entries, returning how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(now_ms())
    }

    pub(crate) fn purge_expired_at(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        let lru = &mut self.lru;

        self.entries.retain(|key, entry| {
            let keep = !entry.is_expired_at(now);
            if !keep {
                if let Some(lru) = lru.as_mut() {
                    lru.remove(key);
                }
            }
            keep
        });

        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone> CacheStore<T> {
    // == Get ==
    /// Returns a copy of the value stored under `key` if it is still fresh.
    ///
    /// A stale entry is removed by the read and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<T> {
        self.get_at(key, now_ms())
    }

    pub(crate) fn get_at(&mut self, key: &str, now: u64) -> Option<T> {
        let expired = self.entries.get(key)?.is_expired_at(now);

        if expired {
            self.forget(key);
            debug!(key, "Evicted stale entry on read");
            return None;
        }

        if let Some(lru) = self.lru.as_mut() {
            lru.touch(key);
        }
        self.entries.get(key).map(|entry| entry.value.clone())
    }
}
