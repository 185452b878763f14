//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{TtlPolicy, DEFAULT_SWEEP_PROBABILITY};

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// TTL for writes that name neither a TTL nor a known namespace
    pub default_ttl: Duration,
    /// Per-namespace TTLs
    pub ttl_policy: TtlPolicy,
    /// LRU bound on the number of entries, 0 for unbounded
    pub max_entries: usize,
    /// Chance that a single write sweeps expired entries
    pub sweep_probability: f64,
    /// Background sweep interval in seconds, 0 disables the task
    pub sweep_interval: u64,
    /// Coalesce concurrent upstream lookups for the same key
    pub single_flight: bool,
    /// Base URL of the upstream provider used by `/lookup`
    pub upstream_url: Option<String>,
    /// Bearer credential sent to the upstream provider
    pub upstream_token: Option<String>,
    /// Upstream request timeout in seconds
    pub upstream_timeout: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DEFAULT_TTL_MS` - Fallback TTL in milliseconds (default: 300000)
    /// - `REVIEWS_TTL_MS`, `PLACE_TTL_MS`, `DIRECTIONS_TTL_MS`,
    ///   `GEOCODE_TTL_MS`, `LISTINGS_TTL_MS` - Namespace TTLs
    /// - `MAX_ENTRIES` - LRU bound, 0 for unbounded (default: 0)
    /// - `SWEEP_PROBABILITY` - Per-write sweep chance (default: 0.1)
    /// - `SWEEP_INTERVAL` - Background sweep seconds, 0 disables (default: 60)
    /// - `SINGLE_FLIGHT` - Coalesce concurrent lookups, `true`/`1` (default: false)
    /// - `UPSTREAM_URL` - Upstream base URL (default: unset)
    /// - `UPSTREAM_TOKEN` - Upstream bearer credential (default: unset)
    /// - `UPSTREAM_TIMEOUT` - Upstream timeout in seconds (default: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let policy = defaults.ttl_policy;

        Self {
            server_port: env_parse("SERVER_PORT").unwrap_or(defaults.server_port),
            default_ttl: env_millis("DEFAULT_TTL_MS").unwrap_or(defaults.default_ttl),
            ttl_policy: TtlPolicy {
                reviews: env_millis("REVIEWS_TTL_MS").unwrap_or(policy.reviews),
                place: env_millis("PLACE_TTL_MS").unwrap_or(policy.place),
                directions: env_millis("DIRECTIONS_TTL_MS").unwrap_or(policy.directions),
                geocode: env_millis("GEOCODE_TTL_MS").unwrap_or(policy.geocode),
                listings: env_millis("LISTINGS_TTL_MS").unwrap_or(policy.listings),
            },
            max_entries: env_parse("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            sweep_probability: env_parse("SWEEP_PROBABILITY")
                .unwrap_or(defaults.sweep_probability),
            sweep_interval: env_parse("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            single_flight: env_flag("SINGLE_FLIGHT").unwrap_or(defaults.single_flight),
            upstream_url: env_string("UPSTREAM_URL"),
            upstream_token: env_string("UPSTREAM_TOKEN"),
            upstream_timeout: env_parse("UPSTREAM_TIMEOUT").unwrap_or(defaults.upstream_timeout),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            default_ttl: Duration::from_secs(300),
            ttl_policy: TtlPolicy::default(),
            max_entries: 0,
            sweep_probability: DEFAULT_SWEEP_PROBABILITY,
            sweep_interval: 60,
            single_flight: false,
            upstream_url: None,
            upstream_token: None,
            upstream_timeout: 10,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_millis(name: &str) -> Option<Duration> {
    env_parse(name).map(Duration::from_millis)
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
