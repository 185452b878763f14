//! Shared Cache Module
//!
//! A cloneable handle around one [`CacheStore`] that request handlers share,
//! together with the read-through helper and its hit/miss accounting.
//!
//! The store sits behind a `tokio::sync::RwLock`; reads that may evict take
//! the write guard. The guard is never held while a producer is running.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::cache::{canonical_key, CacheStats, CacheStore, HitCounters, HitStats, Namespace, TtlPolicy};
use crate::error::CacheError;

type Gate = Arc<Mutex<()>>;
/// Only locked for map bookkeeping, never across an await.
type InFlight = std::sync::Mutex<HashMap<String, Gate>>;

// == Shared Cache ==
/// Handle to a cache shared between tasks. Clones point at the same store
/// and the same counters.
pub struct SharedCache<T> {
    store: Arc<RwLock<CacheStore<T>>>,
    counters: Arc<HitCounters>,
    /// Per-key gates used by the single-flight read-through
    in_flight: Arc<InFlight>,
    default_ttl: Duration,
    ttl_policy: TtlPolicy,
}

impl<T> Clone for SharedCache<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            counters: Arc::clone(&self.counters),
            in_flight: Arc::clone(&self.in_flight),
            default_ttl: self.default_ttl,
            ttl_policy: self.ttl_policy,
        }
    }
}

impl<T> SharedCache<T> {
    /// Wraps `store`; `default_ttl` applies when a write names no TTL.
    pub fn new(store: CacheStore<T>, default_ttl: Duration) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            counters: Arc::new(HitCounters::new()),
            in_flight: Arc::new(std::sync::Mutex::new(HashMap::new())),
            default_ttl,
            ttl_policy: TtlPolicy::default(),
        }
    }

    pub fn with_ttl_policy(mut self, ttl_policy: TtlPolicy) -> Self {
        self.ttl_policy = ttl_policy;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl_policy
    }

    // == Store Operations ==
    /// Stores `value` under `key`; `None` uses the default TTL.
    pub async fn set(&self, key: impl Into<String>, value: T, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        self.store.write().await.set(key, value, ttl);
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    /// Removes every entry, returning how many were removed.
    pub async fn clear(&self) -> usize {
        self.store.write().await.clear()
    }

    pub async fn clear_by_prefix(&self, prefix: &str) -> usize {
        let removed = self.store.write().await.clear_by_prefix(prefix);
        debug!(prefix, removed, "Cleared entries by prefix");
        removed
    }

    /// Clears every entry of `namespace`.
    pub async fn clear_namespace(&self, namespace: Namespace) -> usize {
        self.clear_by_prefix(&namespace.key_prefix()).await
    }

    pub async fn has(&self, key: &str) -> bool {
        self.store.read().await.has(key)
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    pub async fn purge_expired(&self) -> usize {
        self.store.write().await.purge_expired()
    }

    // == Hit Accounting ==
    pub fn counters(&self) -> HitStats {
        self.counters.snapshot()
    }

    pub fn hit_rate(&self) -> f64 {
        self.counters.snapshot().hit_rate()
    }

    pub fn reset_counters(&self) {
        self.counters.reset();
    }
}

impl<T: Clone> SharedCache<T> {
    /// Fresh value for `key`, if any. Does not touch the hit/miss counters.
    pub async fn get(&self, key: &str) -> Option<T> {
        self.store.write().await.get(key)
    }

    // == Read-Through ==
    /// Returns the cached value for `params` under `prefix`, or runs
    /// `producer`, caches its result for `ttl` (default TTL when `None`) and
    /// returns it.
    ///
    /// A failed producer is returned unchanged and nothing is written.
    /// Concurrent misses for the same key each run their own producer and the
    /// last write wins; see [`SharedCache::get_or_fetch_single_flight`] for the
    /// coalescing variant.
    pub async fn get_or_fetch<P, F, Fut, E>(
        &self,
        prefix: &str,
        params: &P,
        ttl: Option<Duration>,
        producer: F,
    ) -> Result<T, E>
    where
        P: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CacheError>,
    {
        let key = canonical_key(prefix, params)?;

        if let Some(value) = self.cached(&key).await {
            return Ok(value);
        }
        self.produce(&key, ttl, producer).await
    }

    /// Read-through using the prefix and policy TTL of `namespace`.
    pub async fn fetch_in<P, F, Fut, E>(
        &self,
        namespace: Namespace,
        params: &P,
        producer: F,
    ) -> Result<T, E>
    where
        P: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CacheError>,
    {
        let ttl = self.ttl_policy.ttl_for(namespace);
        self.get_or_fetch(namespace.as_str(), params, Some(ttl), producer)
            .await
    }

    /// Like [`SharedCache::get_or_fetch`], but concurrent misses for one key
    /// run a single producer. Later callers wait for the first one and then
    /// read what it stored. If it fails, the next waiter runs its own producer.
    pub async fn get_or_fetch_single_flight<P, F, Fut, E>(
        &self,
        prefix: &str,
        params: &P,
        ttl: Option<Duration>,
        producer: F,
    ) -> Result<T, E>
    where
        P: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CacheError>,
    {
        let key = canonical_key(prefix, params)?;

        if let Some(value) = self.cached(&key).await {
            return Ok(value);
        }

        let lease = GateLease::acquire(&self.in_flight, &key);

        let result = {
            let _turn = lease.gate().lock().await;
            match self.cached(&key).await {
                Some(value) => Ok(value),
                None => self.produce(&key, ttl, producer).await,
            }
        };

        drop(lease);
        result
    }

    /// Fresh lookup that records a hit when it finds something.
    async fn cached(&self, key: &str) -> Option<T> {
        let value = self.store.write().await.get(key)?;
        self.counters.record_hit();
        debug!(key, "Cache hit");
        Some(value)
    }

    async fn produce<F, Fut, E>(&self, key: &str, ttl: Option<Duration>, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.counters.record_miss();
        debug!(key, "Cache miss, calling producer");

        let value = match producer().await {
            Ok(value) => value,
            Err(err) => {
                warn!(key, "Producer failed, nothing cached");
                return Err(err);
            }
        };

        let ttl = ttl.unwrap_or(self.default_ttl);
        self.store
            .write()
            .await
            .set(key.to_string(), value.clone(), ttl);
        Ok(value)
    }
}

// == Single-Flight Gates ==
/// A caller's hold on the gate for one key. Dropping it, on completion or
/// when the calling future is cancelled, removes the gate from the table
/// once no other caller holds it.
struct GateLease<'a> {
    in_flight: &'a InFlight,
    key: String,
    gate: Gate,
}

impl<'a> GateLease<'a> {
    fn acquire(in_flight: &'a InFlight, key: &str) -> Self {
        let mut table = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let gate = Arc::clone(table.entry(key.to_string()).or_default());

        Self {
            in_flight,
            key: key.to_string(),
            gate,
        }
    }

    fn gate(&self) -> &Mutex<()> {
        &self.gate
    }
}

impl Drop for GateLease<'_> {
    fn drop(&mut self) {
        let gate = std::mem::take(&mut self.gate);
        let mut table = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let ours = table
            .get(&self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &gate));
        // Only the table and this lease still hold the gate
        if ours && Arc::strong_count(&gate) <= 2 {
            table.remove(&self.key);
        }
        // Released under the table lock so the next lease's count is exact
        drop(gate);
    }
}
