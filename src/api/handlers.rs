//! API Handlers
//!
//! HTTP request handlers for each cache service endpoint.

use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::cache::{canonical_key, CacheStore, Namespace, SharedCache};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, EntryResponse, HealthResponse, KeyRequest, KeyResponse,
    SetEntryRequest, SetResponse, StatsResponse,
};
use crate::upstream::{lookup_params, UpstreamClient};

/// Application state shared across all handlers.
///
/// Holds the shared JSON payload cache and, when configured, the upstream
/// provider that `/lookup` misses are forwarded to.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache handle
    pub cache: SharedCache<Value>,
    /// Upstream provider for read-through lookups
    pub upstream: Option<UpstreamClient>,
    /// Coalesce concurrent lookups for the same key
    pub single_flight: bool,
}

impl AppState {
    /// Creates a new AppState without an upstream provider.
    pub fn new(cache: SharedCache<Value>) -> Self {
        Self {
            cache,
            upstream: None,
            single_flight: false,
        }
    }

    pub fn with_upstream(mut self, upstream: UpstreamClient) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn with_single_flight(mut self, single_flight: bool) -> Self {
        self.single_flight = single_flight;
        self
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = CacheStore::new()
            .with_max_entries(config.max_entries)
            .with_sweep_probability(config.sweep_probability);
        let cache = SharedCache::new(store, config.default_ttl).with_ttl_policy(config.ttl_policy);

        Ok(Self {
            cache,
            upstream: UpstreamClient::from_config(config)?,
            single_flight: config.single_flight,
        })
    }

    /// TTL for a write under `prefix` that named none.
    fn ttl_for_prefix(&self, prefix: &str) -> Duration {
        prefix
            .parse::<Namespace>()
            .map(|ns| self.cache.ttl_policy().ttl_for(ns))
            .unwrap_or_else(|_| self.cache.default_ttl())
    }
}

/// Handler for PUT /entries
///
/// Stores a payload under the canonical key of its namespace and parameters.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetEntryRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let key = canonical_key(&req.namespace, &req.params)?;
    let ttl = req
        .ttl_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| state.ttl_for_prefix(&req.namespace));

    state.cache.set(key.clone(), req.value, Some(ttl)).await;

    let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    Ok(Json(SetResponse::new(key, ttl_ms)))
}

/// Handler for GET /entries/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<EntryResponse>> {
    // Write lock inside: a stale entry is evicted by this read
    let value = state
        .cache
        .get(&key)
        .await
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(EntryResponse::new(key, value)))
}

/// Handler for DELETE /entries/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache.delete(&key).await {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /entries
///
/// Removes every entry.
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.cache.clear().await;

    Json(ClearResponse {
        prefix: None,
        removed,
    })
}

/// Handler for DELETE /namespaces/:prefix
///
/// Removes every entry whose key starts with `{prefix}:`.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
) -> Result<Json<ClearResponse>> {
    if prefix.is_empty() || prefix.contains(':') {
        return Err(CacheError::InvalidRequest(format!(
            "Invalid namespace prefix: '{}'",
            prefix
        )));
    }

    let prefix = format!("{}:", prefix);
    let removed = state.cache.clear_by_prefix(&prefix).await;

    Ok(Json(ClearResponse {
        prefix: Some(prefix),
        removed,
    }))
}

/// Handler for POST /keys
///
/// Returns the canonical key for a namespace and parameter set.
pub async fn key_handler(Json(req): Json<KeyRequest>) -> Result<Json<KeyResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let key = canonical_key(&req.namespace, &req.params)?;
    Ok(Json(KeyResponse { key }))
}

/// Handler for GET /lookup/:namespace
///
/// Read-through lookup: serves the cached payload for the query parameters,
/// or fetches it from the upstream provider and caches it for the
/// namespace's TTL. Upstream failures are returned and nothing is cached.
pub async fn lookup_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<EntryResponse>> {
    let namespace: Namespace = namespace.parse()?;
    let upstream = state
        .upstream
        .as_ref()
        .ok_or(CacheError::UpstreamUnavailable)?;

    let params = lookup_params(&pairs);
    let key = namespace.key(&params)?;
    let producer = || upstream.fetch(namespace, &pairs);

    let value = if state.single_flight {
        let ttl = state.cache.ttl_policy().ttl_for(namespace);
        state
            .cache
            .get_or_fetch_single_flight(namespace.as_str(), &params, Some(ttl), producer)
            .await?
    } else {
        state.cache.fetch_in(namespace, &params, producer).await?
    };

    Ok(Json(EntryResponse::new(key, value)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let census = state.cache.stats().await;
    Json(StatsResponse::new(census, state.cache.counters()))
}

/// Handler for POST /stats/reset
///
/// Zeroes the hit/miss counters; entries are untouched.
pub async fn reset_stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    state.cache.reset_counters();
    stats_handler(State(state)).await
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
