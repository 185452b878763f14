//! Integration Tests for the Read-Through Lookup
//!
//! Runs `/lookup` against a local fake provider and checks that the provider
//! is only called on misses.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use travel_cache::{
    api::create_router, upstream::UpstreamClient, AppState, CacheStore, SharedCache,
};

// == Fake Provider ==

#[derive(Clone, Default)]
struct Provider {
    calls: Arc<AtomicUsize>,
}

async fn echo(
    State(provider): State<Provider>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Json<Value> {
    provider.calls.fetch_add(1, Ordering::SeqCst);
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    Json(json!({"query": query, "auth": auth}))
}

async fn slow_echo(
    State(provider): State<Provider>,
    headers: HeaderMap,
    query: RawQuery,
) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(100)).await;
    echo(State(provider), headers, query).await
}

async fn broken(State(provider): State<Provider>) -> StatusCode {
    provider.calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Serves the fake provider on an ephemeral port and returns its base URL.
async fn spawn_provider(provider: Provider) -> String {
    let app = Router::new()
        .route("/directions", get(echo))
        .route("/geocode", get(echo))
        .route("/listings", get(slow_echo))
        .route("/place", get(broken))
        .with_state(provider);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

// == Helper Functions ==

async fn create_test_app(single_flight: bool) -> (Router, Provider) {
    let provider = Provider::default();
    let base_url = spawn_provider(provider.clone()).await;

    let upstream =
        UpstreamClient::new(base_url, Some("secret".to_string()), Duration::from_secs(5)).unwrap();
    let cache = SharedCache::new(
        CacheStore::new().with_sweep_probability(0.0),
        Duration::from_secs(300),
    );
    let state = AppState::new(cache)
        .with_upstream(upstream)
        .with_single_flight(single_flight);

    (create_router(state), provider)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// == Lookup Tests ==

#[tokio::test]
async fn test_lookup_fetches_once_then_serves_from_cache() {
    let (app, provider) = create_test_app(false).await;

    let (status, first) = get_json(&app, "/lookup/directions?origin=Paris&destination=Lyon").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["key"], r#"directions:destination="Lyon"&origin="Paris""#);
    assert_eq!(first["value"]["query"], "origin=Paris&destination=Lyon");

    // Same parameters in a different order
    let (status, second) = get_json(&app, "/lookup/directions?destination=Lyon&origin=Paris").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second, first);

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    let (_, stats) = get_json(&app, "/stats").await;
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 1);
    assert_eq!(stats["hit_rate"], 0.5);
}

#[tokio::test]
async fn test_lookup_repeated_params_are_kept() {
    let (app, provider) = create_test_app(false).await;

    let (status, both) =
        get_json(&app, "/lookup/directions?origin=Paris&waypoints=Dijon&waypoints=Lyon").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        both["key"],
        r#"directions:origin="Paris"&waypoints=["Dijon","Lyon"]"#
    );
    assert_eq!(
        both["value"]["query"],
        "origin=Paris&waypoints=Dijon&waypoints=Lyon"
    );

    let (status, last_only) = get_json(&app, "/lookup/directions?origin=Paris&waypoints=Lyon").await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(both["key"], last_only["key"]);
    assert_eq!(last_only["value"]["query"], "origin=Paris&waypoints=Lyon");

    // Waypoint order matters
    let (_, reversed) =
        get_json(&app, "/lookup/directions?origin=Paris&waypoints=Lyon&waypoints=Dijon").await;
    assert_ne!(both["key"], reversed["key"]);

    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_lookup_forwards_bearer_token() {
    let (app, _) = create_test_app(false).await;

    let (status, json) = get_json(&app, "/lookup/geocode?q=Rome").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"]["auth"], "Bearer secret");
}

#[tokio::test]
async fn test_lookup_distinct_params_fetch_separately() {
    let (app, provider) = create_test_app(false).await;

    get_json(&app, "/lookup/geocode?q=Rome").await;
    get_json(&app, "/lookup/geocode?q=Milan").await;

    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

    let (_, stats) = get_json(&app, "/stats").await;
    assert_eq!(stats["size"], 2);
}

#[tokio::test]
async fn test_lookup_upstream_failure_is_not_cached() {
    let (app, provider) = create_test_app(false).await;

    let (status, json) = get_json(&app, "/lookup/place?placeId=123").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().is_some());

    let (status, _) = get_json(&app, "/lookup/place?placeId=123").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    // Both requests reached the provider
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

    let (_, stats) = get_json(&app, "/stats").await;
    assert_eq!(stats["size"], 0);
}

#[tokio::test]
async fn test_lookup_unknown_namespace() {
    let (app, provider) = create_test_app(false).await;

    let (status, _) = get_json(&app, "/lookup/weather?city=Oslo").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_lookup_single_flight_coalesces_concurrent_misses() {
    let (app, provider) = create_test_app(true).await;

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { get_json(&app, "/lookup/listings?city=Lisbon").await })
        })
        .collect();

    for handle in handles {
        let (status, json) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["value"]["query"], "city=Lisbon");
    }

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_lookup_entry_visible_through_entries_endpoint() {
    let (app, _) = create_test_app(false).await;

    let (_, looked_up) = get_json(&app, "/lookup/geocode?q=Rome").await;

    let (status, json) = get_json(&app, "/entries/geocode%3Aq%3D%22Rome%22").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"], looked_up["value"]);
}
