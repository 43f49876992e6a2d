//! End-to-end tests: HTTP API -> yt-dlp child process -> HTTP storage upload
//!
//! yt-dlp is replaced by a shell script and the storage service by a wiremock
//! server; everything in between is the real relay.

#![cfg(unix)]

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{EPISODE_CONTENT, mount_login, test_config, upload_path};
use episode_relay::naming::EpisodeNaming;
use episode_relay::{EpisodeId, Relay, api};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn post_download(app: axum::Router, urls: &[&str]) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/download")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({ "urls": urls }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn wait_until_empty(dir: &Path) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let remaining: Vec<_> = std::fs::read_dir(dir).unwrap().collect();
        if remaining.is_empty() {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "{} still contains {:?}",
            dir.display(),
            remaining
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_batch_downloads_and_uploads_each_episode() {
    let temp_dir = tempfile::tempdir().unwrap();
    let storage = MockServer::start().await;
    mount_login(&storage, "tok-e2e").await;

    let naming = EpisodeNaming::default();
    for episode in [1, 3] {
        Mock::given(method("PUT"))
            .and(path(upload_path(&naming.file_name(EpisodeId(episode)))))
            .and(header("authorization", "Bearer tok-e2e"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&storage)
            .await;
    }

    let config = test_config(&temp_dir, &storage);
    let relay = Arc::new(Relay::new(config.clone()).await.unwrap());
    let app = api::create_router(relay.clone());

    let (status, json) = post_download(
        app.clone(),
        &[
            "https://example.com/watch/1",
            "https://example.com/watch/broken",
            "https://example.com/watch/3",
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Processing completed");
    let results = json["results"].as_array().unwrap();
    assert_eq!(
        results.iter().map(|r| r["success"].clone()).collect::<Vec<_>>(),
        vec![Value::Bool(true), Value::Bool(false), Value::Bool(true)]
    );
    assert_eq!(results[0]["message"], "Successfully processed episode 1");
    let failure = results[1]["message"].as_str().unwrap();
    assert!(
        failure.starts_with("Failed to process episode 2: yt-dlp exited"),
        "got {failure}"
    );
    assert!(failure.contains("Unsupported URL"), "got {failure}");

    // Uploaded bodies are the downloaded files
    let uploads: Vec<_> = storage
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "PUT")
        .collect();
    assert_eq!(uploads.len(), 2);
    assert!(uploads.iter().all(|r| r.body == EPISODE_CONTENT));

    // Local copies are removed after upload (and the failed one during cleanup)
    wait_until_empty(&config.download.download_dir).await;
    assert!(relay.registry().is_empty());

    // One log per episode, readable through /status
    let response = app
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let status: Value = serde_json::from_slice(&body).unwrap();
    let logs = status["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 3);
    assert!(
        logs.iter()
            .any(|log| log["content"].as_str().unwrap().contains("Upload completed"))
    );
    assert_eq!(status["totalActiveProcesses"], 0);
}

#[tokio::test]
async fn test_rejected_storage_login_fails_the_whole_batch() {
    let temp_dir = tempfile::tempdir().unwrap();
    let storage = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&storage)
        .await;

    let config = test_config(&temp_dir, &storage);
    let relay = Arc::new(Relay::new(config.clone()).await.unwrap());
    let app = api::create_router(relay);

    let (status, json) = post_download(app, &["https://example.com/watch/1"]).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Failed to process downloads");
    assert!(json["details"].as_str().unwrap().contains("401"));

    // Nothing was downloaded or logged
    assert_eq!(
        std::fs::read_dir(&config.download.download_dir)
            .unwrap()
            .count(),
        0
    );
    assert_eq!(std::fs::read_dir(&config.download.logs_dir).unwrap().count(), 0);
}
