//! Request DTOs for the cache service API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

/// Maximum accepted length of a namespace prefix
pub const MAX_PREFIX_LENGTH: usize = 64;

fn validate_prefix(namespace: &str) -> Option<String> {
    if namespace.is_empty() {
        return Some("Namespace cannot be empty".to_string());
    }
    if namespace.len() > MAX_PREFIX_LENGTH {
        return Some(format!(
            "Namespace exceeds maximum length of {} characters",
            MAX_PREFIX_LENGTH
        ));
    }
    if namespace.contains(':') {
        return Some("Namespace cannot contain ':'".to_string());
    }
    None
}

/// Request body for storing a payload (PUT /entries)
#[derive(Debug, Clone, Deserialize)]
pub struct SetEntryRequest {
    /// Namespace prefix, e.g. `place` or `directions`
    pub namespace: String,
    /// Parameters the key is derived from
    #[serde(default = "empty_params")]
    pub params: Value,
    /// The payload to cache
    pub value: Value,
    /// Optional TTL in milliseconds (namespace default if not specified)
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

impl SetEntryRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.ttl_ms == Some(0) {
            return Some("TTL must be greater than zero".to_string());
        }
        validate_prefix(&self.namespace)
    }
}

/// Request body for computing a canonical key (POST /keys)
#[derive(Debug, Clone, Deserialize)]
pub struct KeyRequest {
    pub namespace: String,
    #[serde(default = "empty_params")]
    pub params: Value,
}

impl KeyRequest {
    pub fn validate(&self) -> Option<String> {
        validate_prefix(&self.namespace)
    }
}

fn empty_params() -> Value {
    Value::Object(serde_json::Map::new())
}
