//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the episode-relay REST
//! API using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the episode-relay REST API
///
/// Served as JSON from `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "episode-relay REST API",
        version = "0.1.0",
        description = "Download episodes with yt-dlp and relay them to a storage account, with per-episode cancellation and status",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::start_downloads,
        crate::api::routes::cancel_episode,
        crate::api::routes::cancel_all_episodes,
        crate::api::routes::get_status,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::EpisodeId,
        crate::types::JobStatus,
        crate::types::Stage,
        crate::types::JobResult,
        crate::types::Event,

        // Relay state
        crate::registry::JobSnapshot,
        crate::relay::StatusReport,
        crate::relay::LogEntry,

        // API request/response types from routes
        crate::api::routes::DownloadRequest,
        crate::api::routes::DownloadResponse,
        crate::api::routes::MessageResponse,
        crate::api::routes::ErrorBody,
        crate::api::routes::CancelAllResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Episode jobs - Submit batches, cancel episodes, inspect status"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
