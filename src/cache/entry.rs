//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

// == Cache Entry ==
/// Represents a single cache entry with its payload and expiry metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The stored payload
    pub value: T,
    /// Creation time (monotonic milliseconds, see [`now_ms`])
    pub created_at: u64,
    /// `created_at + ttl`; the entry is stale strictly after this instant
    pub expires_at: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates an entry stamped with the current time.
    pub fn new(value: T, ttl: Duration) -> Self {
        Self::new_at(value, ttl, now_ms())
    }

    /// Creates an entry as if stored at `now`.
    pub fn new_at(value: T, ttl: Duration, now: u64) -> Self {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        Self {
            value,
            created_at: now,
            expires_at: now.saturating_add(ttl_ms),
        }
    }

    // == Is Expired ==
    /// Checks if the entry is stale at `now`.
    ///
    /// Boundary condition: an entry is still fresh at exactly `expires_at`
    /// and becomes stale one millisecond later.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now > self.expires_at
    }
}

// == Utility Functions ==
/// Milliseconds elapsed since a process-wide monotonic origin.
///
/// Wall-clock adjustments never move this value backwards.
pub fn now_ms() -> u64 {
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    let origin = ORIGIN.get_or_init(Instant::now);
    u64::try_from(origin.elapsed().as_millis()).unwrap_or(u64::MAX)
}
