//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycles against the admin router, including
//! flows that span several endpoints.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::time::Duration;
use tagcache::{api::create_router, cache::SetOptions, AppState, Config};
use tower::ServiceExt;

// == Helper Functions ==

fn test_config() -> Config {
    Config {
        max_entries: 100,
        max_bytes: 100_000,
        default_ttl_ms: 300_000,
        ..Config::default()
    }
}

fn create_test_app() -> (Router, AppState) {
    let state = AppState::from_config(&test_config()).unwrap();
    (create_router(state.clone()), state)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn put_entry(app: &Router, cache: &str, key: &str, body: Value) -> StatusCode {
    let uri = format!("/caches/{}/entries/{}", cache, key);
    send(app, "PUT", &uri, Some(body)).await.0
}

// == Entry Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let (app, _) = create_test_app();

    let (status, json) = send(
        &app,
        "PUT",
        "/caches/users/entries/u1",
        Some(json!({"value": {"name": "alice"}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].as_str().unwrap().contains("u1"));
    assert_eq!(json["cache"], "users");
}

#[tokio::test]
async fn test_set_then_get_returns_json_value() {
    let (app, _) = create_test_app();
    put_entry(&app, "users", "u1", json!({"value": {"roles": ["admin"]}})).await;

    let (status, json) = send(&app, "GET", "/caches/users/entries/u1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"], json!({"roles": ["admin"]}));
}

#[tokio::test]
async fn test_set_invalid_json() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/caches/users/entries/u1")
                .header("content-type", "application/json")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_set_key_too_long() {
    let (app, _) = create_test_app();
    let key = "k".repeat(300);

    let status = put_entry(&app, "users", &key, json!({"value": 1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_missing_key_in_existing_cache() {
    let (app, _) = create_test_app();
    put_entry(&app, "users", "u1", json!({"value": 1})).await;

    let (status, json) = send(&app, "GET", "/caches/users/entries/u2", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("u2"));
}

#[tokio::test]
async fn test_delete_then_get_not_found() {
    let (app, _) = create_test_app();
    put_entry(&app, "users", "u1", json!({"value": 1})).await;

    let (status, _) = send(&app, "DELETE", "/caches/users/entries/u1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", "/caches/users/entries/u1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/caches/users/entries/u1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_entry_ttl_expires() {
    let (app, _) = create_test_app();
    put_entry(&app, "sessions", "s1", json!({"value": "token", "ttl_ms": 30})).await;

    let (status, _) = send(&app, "GET", "/caches/sessions/entries/s1", None).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(60)).await;

    let (status, _) = send(&app, "GET", "/caches/sessions/entries/s1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == Cache Endpoint Tests ==

#[tokio::test]
async fn test_create_cache_then_budget_is_enforced() {
    let (app, _) = create_test_app();

    let (status, json) = send(
        &app,
        "POST",
        "/caches",
        Some(json!({"name": "tiny", "max_entries": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["max_entries"], 2);

    for key in ["a", "b", "c"] {
        put_entry(&app, "tiny", key, json!({"value": key})).await;
    }

    let (_, stats) = send(&app, "GET", "/caches/tiny/stats", None).await;
    assert_eq!(stats["entries"], 2);
    assert_eq!(stats["evictions"], 1);

    // The least recently used cold entry went first
    let (status, _) = send(&app, "GET", "/caches/tiny/entries/a", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_cache_rejects_zero_budget() {
    let (app, _) = create_test_app();

    let (status, json) = send(
        &app,
        "POST",
        "/caches",
        Some(json!({"name": "broken", "max_bytes": 0})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Configuration"));
}

#[tokio::test]
async fn test_stats_tracks_hits_and_misses() {
    let (app, _) = create_test_app();
    put_entry(&app, "users", "u1", json!({"value": 1})).await;

    send(&app, "GET", "/caches/users/entries/u1", None).await;
    send(&app, "GET", "/caches/users/entries/u1", None).await;
    send(&app, "GET", "/caches/users/entries/u9", None).await;

    let (status, stats) = send(&app, "GET", "/caches/users/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["hits"], 2);
    assert_eq!(stats["misses"], 1);
    assert_eq!(stats["entries"], 1);
    // JSON encoding of 1
    assert_eq!(stats["bytes"], 1);
}

#[tokio::test]
async fn test_stats_unknown_cache() {
    let (app, _) = create_test_app();

    let (status, _) = send(&app, "GET", "/caches/nope/stats", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_hot_paths_ordered_by_access_count() {
    let (app, _) = create_test_app();
    // Keys carry slashes, so they travel percent-encoded
    put_entry(&app, "routes", "GET:%2Fa", json!({"value": 1})).await;
    put_entry(&app, "routes", "GET:%2Fb", json!({"value": 2})).await;

    for _ in 0..3 {
        send(&app, "GET", "/caches/routes/entries/GET:%2Fb", None).await;
    }
    send(&app, "GET", "/caches/routes/entries/GET:%2Fa", None).await;

    let (status, json) = send(&app, "GET", "/caches/routes/hot?limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    let hot = json["hot_paths"].as_array().unwrap();
    assert_eq!(hot.len(), 1);
    assert_eq!(hot[0]["key"], "GET:/b");
}

#[tokio::test]
async fn test_list_caches() {
    let (app, _) = create_test_app();
    put_entry(&app, "users", "u1", json!({"value": 1})).await;
    put_entry(&app, "roles", "r1", json!({"value": 1})).await;

    let (status, json) = send(&app, "GET", "/caches", None).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&String> = json["caches"].as_object().unwrap().keys().collect();
    assert_eq!(names, vec!["roles", "users"]);
}

// == Invalidation Tests ==

#[tokio::test]
async fn test_prefix_invalidation() {
    let (app, _) = create_test_app();
    put_entry(&app, "users", "user:1", json!({"value": 1})).await;
    put_entry(&app, "users", "user:2", json!({"value": 2})).await;
    put_entry(&app, "users", "admin:1", json!({"value": 3})).await;

    let (status, json) = send(
        &app,
        "POST",
        "/caches/users/invalidate",
        Some(json!({"prefix": "user:"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 2);
    let (status, _) = send(&app, "GET", "/caches/users/entries/admin:1", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_tag_invalidation_spans_caches() {
    let (app, state) = create_test_app();
    put_entry(&app, "users", "u1", json!({"value": 1, "tags": ["user:1"]})).await;
    put_entry(&app, "profiles", "p1", json!({"value": 2, "tags": ["user:1"]})).await;
    put_entry(&app, "profiles", "p2", json!({"value": 3, "tags": ["user:2"]})).await;
    state.typed.set_request_headers(
        "GET:/users/1",
        Default::default(),
        SetOptions::default().tags(["user:1"]),
    );

    let (status, json) = send(&app, "POST", "/tags/user:1/invalidate", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 2);
    assert_eq!(json["typed_removed"], 1);

    let (status, _) = send(&app, "GET", "/caches/profiles/entries/p2", None).await;
    assert_eq!(status, StatusCode::OK);
}

// == Maintenance Tests ==

#[tokio::test]
async fn test_clear_by_pattern_and_all() {
    let (app, _) = create_test_app();
    put_entry(&app, "user-profiles", "a", json!({"value": 1})).await;
    put_entry(&app, "user-sessions", "b", json!({"value": 1})).await;
    put_entry(&app, "reports", "c", json!({"value": 1})).await;

    let (status, json) = send(
        &app,
        "POST",
        "/maintenance/clear",
        Some(json!({"pattern": "user"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cleared_caches"], 2);

    let (_, json) = send(&app, "POST", "/maintenance/clear", Some(json!({}))).await;
    assert_eq!(json["removed"], 1);
}

#[tokio::test]
async fn test_clear_single_cache() {
    let (app, _) = create_test_app();
    put_entry(&app, "users", "a", json!({"value": 1})).await;
    put_entry(&app, "users", "b", json!({"value": 1})).await;

    let (status, json) = send(&app, "DELETE", "/caches/users", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 2);
}

#[tokio::test]
async fn test_clean_expired_endpoint() {
    let (app, _) = create_test_app();
    put_entry(&app, "sessions", "s1", json!({"value": 1, "ttl_ms": 10})).await;
    put_entry(&app, "sessions", "s2", json!({"value": 1})).await;

    tokio::time::sleep(Duration::from_millis(30)).await;

    let (status, json) = send(&app, "POST", "/maintenance/clean", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 1);
}

// == Typed Cache Tests ==

#[tokio::test]
async fn test_typed_stats_with_reset() {
    let (app, state) = create_test_app();
    state
        .typed
        .set_csrf_required("POST:/login", true, SetOptions::default());
    state.typed.get_csrf_required("POST:/login");
    state.typed.get_csrf_required("POST:/logout");

    let (status, json) = send(&app, "GET", "/typed/csrf/stats?reset=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["hit_ratio"], 0.5);

    let (_, json) = send(&app, "GET", "/typed/csrf/stats", None).await;
    assert_eq!(json["hits"], 0);
    assert_eq!(json["size"], 1);
}

#[tokio::test]
async fn test_typed_stats_unknown_kind() {
    let (app, _) = create_test_app();

    let (status, _) = send(&app, "GET", "/typed/cookies/stats", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = create_test_app();
    put_entry(&app, "users", "u1", json!({"value": 1})).await;

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["caches"], 1);
    assert!(json.get("timestamp").is_some());
}
