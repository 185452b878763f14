//! Cache Module
//!
//! Ephemeral keyed cache: canonical keys, TTL entries, lazy and swept
//! expiry, and a read-through helper shared between request handlers.

mod entry;
mod key;
mod lru;
mod namespace;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use entry::{now_ms, CacheEntry};
pub use key::canonical_key;
pub use lru::LruTracker;
pub use namespace::{Namespace, TtlPolicy};
pub use shared::SharedCache;
pub use stats::{CacheStats, HitCounters, HitStats};
pub use store::{CacheStore, DEFAULT_SWEEP_PROBABILITY};
