//! Job handlers: batch submission, cancellation and status.

use super::{CancelAllResponse, DownloadResponse, ErrorBody, MessageResponse};
use crate::api::AppState;
use crate::error::Error;
use crate::relay::{CancelAllReport, CancelOutcome};
use crate::types::EpisodeId;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

const INVALID_URLS: &str = "URLs must be provided as an array";

/// Pull `urls` out of a request body, accepting only an array of strings
fn parse_urls(body: &[u8]) -> Option<Vec<String>> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("urls")?
        .as_array()?
        .iter()
        .map(|url| url.as_str().map(str::to_string))
        .collect()
}

fn error_response(status: StatusCode, body: ErrorBody) -> Response {
    (status, Json(body)).into_response()
}

/// POST /download - Process a batch of episode URLs
///
/// Responds once every episode has been downloaded and uploaded, failed, or
/// been cancelled. Per-episode failures are reported in `results`.
#[utoipa::path(
    post,
    path = "/download",
    tag = "jobs",
    request_body = super::DownloadRequest,
    responses(
        (status = 200, description = "Batch finished", body = DownloadResponse),
        (status = 400, description = "URLs missing or not an array of strings", body = ErrorBody),
        (status = 500, description = "Storage login failed", body = ErrorBody)
    )
)]
pub async fn start_downloads(State(state): State<AppState>, body: Bytes) -> Response {
    let Some(urls) = parse_urls(&body) else {
        return error_response(StatusCode::BAD_REQUEST, ErrorBody::new(INVALID_URLS));
    };

    tracing::info!(count = urls.len(), "Received download batch");

    // The batch runs on its own task so a dropped connection does not
    // abandon jobs halfway through their stages.
    let relay = state.relay.clone();
    let batch = tokio::spawn(async move { relay.process_batch(&urls).await });

    match batch.await {
        Ok(Ok(results)) => (
            StatusCode::OK,
            Json(DownloadResponse {
                message: "Processing completed".to_string(),
                results,
            }),
        )
            .into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Failed to process downloads");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::with_details("Failed to process downloads", e.to_string()),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Download batch task failed");
            Error::Other(format!("download batch task failed: {}", e)).into_response()
        }
    }
}

/// POST /cancel/:episodeNumber - Cancel one active episode
#[utoipa::path(
    post,
    path = "/cancel/{episodeNumber}",
    tag = "jobs",
    params(
        ("episodeNumber" = i64, Path, description = "Episode number (1-based position in its batch)")
    ),
    responses(
        (status = 200, description = "Episode cancelled", body = MessageResponse),
        (status = 400, description = "Episode number is not an integer", body = ErrorBody),
        (status = 404, description = "No active process for this episode", body = ErrorBody)
    )
)]
pub async fn cancel_episode(
    State(state): State<AppState>,
    Path(episode_number): Path<String>,
) -> Response {
    let Ok(id) = episode_number.parse::<EpisodeId>() else {
        return error_response(
            StatusCode::BAD_REQUEST,
            ErrorBody::new(format!("Invalid episode number: {}", episode_number)),
        );
    };

    match state.relay.cancel_one(id).await {
        CancelOutcome::Cancelled => (
            StatusCode::OK,
            Json(MessageResponse::new(format!(
                "Process for episode {} cancelled successfully",
                id
            ))),
        )
            .into_response(),
        CancelOutcome::NotFound => error_response(
            StatusCode::NOT_FOUND,
            ErrorBody::new(format!("No active process found for episode {}", id)),
        ),
    }
}

/// POST /cancelall - Cancel every active episode
#[utoipa::path(
    post,
    path = "/cancelall",
    tag = "jobs",
    responses(
        (status = 200, description = "All active episodes were attempted", body = CancelAllResponse),
        (status = 404, description = "No active processes", body = ErrorBody)
    )
)]
pub async fn cancel_all_episodes(State(state): State<AppState>) -> Response {
    match state.relay.cancel_all().await {
        CancelAllReport::NoActiveJobs => error_response(
            StatusCode::NOT_FOUND,
            ErrorBody::new("No active processes found"),
        ),
        CancelAllReport::Completed { successful, failed } => (
            StatusCode::OK,
            Json(CancelAllResponse {
                message: format!("Cancelled {} active process(es)", successful.len()),
                total_cancelled: successful.len(),
                total_failed: failed.len(),
                successful_cancellations: successful,
                failed_cancellations: failed,
            }),
        )
            .into_response(),
    }
}

/// GET /status - Downloaded files, job logs and active episodes
#[utoipa::path(
    get,
    path = "/status",
    tag = "jobs",
    responses(
        (status = 200, description = "Current relay status", body = crate::relay::StatusReport),
        (status = 500, description = "Download or logs directory unreadable", body = ErrorBody)
    )
)]
pub async fn get_status(State(state): State<AppState>) -> Response {
    match state.relay.status().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to get status");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::with_details("Failed to get status", e.to_string()),
            )
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::parse_urls;

    #[test]
    fn test_parse_urls_accepts_array_of_strings() {
        assert_eq!(
            parse_urls(br#"{"urls":["a","b"]}"#),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(parse_urls(br#"{"urls":[]}"#), Some(vec![]));
    }

    #[test]
    fn test_parse_urls_rejects_everything_else() {
        for body in [
            &b"not json"[..],
            br#"{}"#,
            br#"{"urls":"https://example.com"}"#,
            br#"{"urls":["a",2]}"#,
            br#"["a"]"#,
            b"",
        ] {
            assert_eq!(parse_urls(body), None, "{:?}", String::from_utf8_lossy(body));
        }
    }
}
