//! Travel Cache - ephemeral keyed cache for travel and mapping lookups
//!
//! Caches the results of expensive provider calls (reviews, place details,
//! directions, geocoding, listings) under canonical parameter keys with
//! per-entry TTLs, and serves them through a read-through helper.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;
pub mod upstream;

pub use api::AppState;
pub use cache::{canonical_key, CacheStore, Namespace, SharedCache};
pub use config::Config;
pub use error::CacheError;
pub use tasks::spawn_sweep_task;
