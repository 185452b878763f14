//! Cache Statistics Module
//!
//! Point-in-time census of the store, plus the hit/miss counters maintained
//! by the read-through helper.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Census of the store at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Total number of entries, fresh or stale
    pub size: usize,
    /// Entries whose expiry has passed but have not been removed yet
    pub expired: usize,
    /// Entries that a read would still return
    pub fresh: usize,
}

// == Hit Counters ==
/// Process-wide hit and miss counters, shared between clones of a cache handle.
#[derive(Debug, Default)]
pub struct HitCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl HitCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Zeroes both counters.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HitStats {
        HitStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

// == Hit Stats ==
/// A copy of the counters taken at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HitStats {
    /// Reads served from the cache
    pub hits: u64,
    /// Reads that had to call the producer
    pub misses: u64,
}

impl HitStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_new() {
        let counters = HitCounters::new();
        assert_eq!(counters.snapshot(), HitStats { hits: 0, misses: 0 });
    }

    #[test]
    fn test_hit_rate_no_reads() {
        assert_eq!(HitCounters::new().snapshot().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let counters = HitCounters::new();
        counters.record_hit();
        counters.record_hit();
        assert_eq!(counters.snapshot().hit_rate(), 1.0);
    }

    #[test]
    fn test_hit_rate_all_misses() {
        let counters = HitCounters::new();
        counters.record_miss();
        counters.record_miss();
        assert_eq!(counters.snapshot().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let counters = HitCounters::new();
        counters.record_miss();
        counters.record_hit();
        assert_eq!(counters.snapshot().hit_rate(), 0.5);
    }

    #[test]
    fn test_reset() {
        let counters = HitCounters::new();
        counters.record_hit();
        counters.record_miss();
        counters.reset();

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.hits, 0);
        assert_eq!(snapshot.misses, 0);
        assert_eq!(snapshot.hit_rate(), 0.0);
    }

    #[test]
    fn test_census_serialize() {
        let stats = CacheStats {
            size: 3,
            expired: 1,
            fresh: 2,
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, r#"{"size":3,"expired":1,"fresh":2}"#);
    }
}
