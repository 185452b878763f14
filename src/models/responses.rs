//! Response DTOs for the cache service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheStats, HitStats};

/// Response body for reading an entry (GET /entries/:key, GET /lookup/:namespace)
#[derive(Debug, Clone, Serialize)]
pub struct EntryResponse {
    pub key: String,
    pub value: Value,
}

impl EntryResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for the canonical key diagnostic (POST /keys)
#[derive(Debug, Clone, Serialize)]
pub struct KeyResponse {
    pub key: String,
}

/// Response body for storing an entry (PUT /entries)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The canonical key the payload was stored under
    pub key: String,
    /// TTL that was applied, in milliseconds
    pub ttl_ms: u64,
}

impl SetResponse {
    pub fn new(key: impl Into<String>, ttl_ms: u64) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
            ttl_ms,
        }
    }
}

/// Response body for deleting an entry (DELETE /entries/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for bulk removal (DELETE /entries, DELETE /namespaces/:prefix)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Prefix that was invalidated, absent when everything was cleared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Number of entries removed
    pub removed: usize,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Total entries, fresh or stale
    pub size: usize,
    /// Entries past their expiry that have not been removed yet
    pub expired: usize,
    /// Entries a read would still return
    pub fresh: usize,
    /// Read-through hits
    pub hits: u64,
    /// Read-through misses
    pub misses: u64,
    /// hits / (hits + misses), 0 when there were no reads
    pub hit_rate: f64,
}

impl StatsResponse {
    pub fn new(census: CacheStats, counters: HitStats) -> Self {
        Self {
            size: census.size,
            expired: census.expired,
            fresh: census.fresh,
            hits: counters.hits,
            misses: counters.misses,
            hit_rate: counters.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
