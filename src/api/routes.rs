//! API Routes
//!
//! Configures the Axum router with all cache service endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, get_handler, health_handler, invalidate_handler, key_handler,
    lookup_handler, reset_stats_handler, set_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /entries` - Store a payload under its canonical key
/// - `DELETE /entries` - Remove every entry
/// - `GET /entries/:key` - Read a fresh entry
/// - `DELETE /entries/:key` - Delete one entry
/// - `DELETE /namespaces/:prefix` - Invalidate a whole namespace
/// - `POST /keys` - Compute a canonical key
/// - `GET /lookup/:namespace` - Read-through lookup via the upstream provider
/// - `GET /stats` - Census and hit/miss counters
/// - `POST /stats/reset` - Zero the hit/miss counters
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/entries", put(set_handler).delete(clear_handler))
        .route("/entries/:key", get(get_handler).delete(delete_handler))
        .route("/namespaces/:prefix", delete(invalidate_handler))
        .route("/keys", post(key_handler))
        .route("/lookup/:namespace", get(lookup_handler))
        .route("/stats", get(stats_handler))
        .route("/stats/reset", post(reset_stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
