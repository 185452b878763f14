//! API Module
//!
//! HTTP handlers and routing for the cache service.
//!
//! # Endpoints
//! - `PUT /entries`, `DELETE /entries` - Store a payload, clear everything
//! - `GET /entries/:key`, `DELETE /entries/:key` - Read or delete one entry
//! - `DELETE /namespaces/:prefix` - Invalidate a namespace
//! - `POST /keys` - Canonical key diagnostics
//! - `GET /lookup/:namespace` - Read-through lookup
//! - `GET /stats`, `POST /stats/reset` - Statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
