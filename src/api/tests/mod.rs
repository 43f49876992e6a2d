use super::*;
use crate::config::Config;
use crate::relay::test_helpers::{FakeFetcher, FakeStorage, Script, urls};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;


/// Helper to create a test Relay (over fake stages) wrapped in Arc
async fn create_test_relay(
    fetcher: FakeFetcher,
    storage: FakeStorage,
) -> (Arc<Relay>, tempfile::TempDir) {
    let (relay, temp_dir) = crate::relay::test_helpers::create_test_relay(fetcher, storage).await;
    (Arc::new(relay), temp_dir)
}

/// Router over a relay with default fake stages
async fn create_test_app() -> (Router, Arc<Relay>, tempfile::TempDir) {
    create_test_app_with(|_| {}).await
}

/// Router over a relay with default fake stages and an adjusted config
async fn create_test_app_with(
    configure: impl FnOnce(&mut Config),
) -> (Router, Arc<Relay>, tempfile::TempDir) {
    let (relay, temp_dir) = crate::relay::test_helpers::create_test_relay_with(
        FakeFetcher::new(),
        FakeStorage::new(),
        configure,
    )
    .await;
    let relay = Arc::new(relay);
    (create_router(relay.clone()), relay, temp_dir)
}

fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (relay, _temp_dir) = crate::relay::test_helpers::create_test_relay_with(
        FakeFetcher::new(),
        FakeStorage::new(),
        |config| config.api.bind_address = "127.0.0.1:0".parse().unwrap(), // Port 0 = OS assigns a free port
    )
    .await;

    let api_handle = tokio::spawn(start_api_server(Arc::new(relay)));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be running");

    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let (app, _relay, _temp_dir) = create_test_app_with(|config| {
        config.api.cors_enabled = true;
        config.api.cors_origins = vec!["*".to_string()];
    })
    .await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_restricted_origins() {
    let (app, _relay, _temp_dir) = create_test_app_with(|config| {
        config.api.cors_origins = vec!["http://allowed.example".to_string()];
    })
    .await;

    let allowed = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Origin", "http://allowed.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        allowed.headers()["access-control-allow-origin"],
        "http://allowed.example"
    );

    let other = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Origin", "http://other.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(
        !other
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (app, _relay, _temp_dir) =
        create_test_app_with(|config| config.api.cors_enabled = false).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Origin", "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _relay, _temp_dir) = create_test_app().await;

    let response = app.oneshot(get("/downloads")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
