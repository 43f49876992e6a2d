//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] - Batch submission, cancellation and status
//! - [`system`] - Health, events, OpenAPI

use crate::types::{EpisodeId, JobResult};
use serde::{Deserialize, Serialize};

mod jobs;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use jobs::*;
pub use system::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadRequest {
    /// Episode URLs; episode numbers follow their order (first URL is episode 1)
    pub urls: Vec<String>,
}

/// Response for POST /download once the whole batch has finished
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadResponse {
    /// Always "Processing completed"
    pub message: String,
    /// One result per submitted URL, in submission order
    pub results: Vec<JobResult>,
}

/// Plain confirmation body
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    /// Human-readable message
    pub message: String,
}

impl MessageResponse {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error body for the job endpoints
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Human-readable error
    pub error: String,
    /// Underlying cause, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub(crate) fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub(crate) fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Response for POST /cancelall
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelAllResponse {
    /// Summary of the operation
    pub message: String,
    /// Number of episodes cancelled
    pub total_cancelled: usize,
    /// Number of episodes that could not be cancelled
    pub total_failed: usize,
    /// Episodes that were cancelled
    #[schema(value_type = Vec<i64>)]
    pub successful_cancellations: Vec<EpisodeId>,
    /// Episodes that had already finished when their turn came
    #[schema(value_type = Vec<i64>)]
    pub failed_cancellations: Vec<EpisodeId>,
}
