//! Error types for episode-relay
//!
//! This module provides:
//! - The crate-wide [`Error`] enum and [`Result`] alias
//! - [`TransferError`], the failure side of a transfer stage's completion
//! - HTTP status code mapping for API integration ([`ToHttpStatus`])
//! - Structured error responses with machine-readable error codes ([`ApiError`])

use crate::types::EpisodeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for episode-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for episode-relay
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "PORT")
        key: Option<String>,
    },

    /// Storage account login failed; fatal to the whole batch
    #[error("storage initialization failed: {0}")]
    StorageInit(String),

    /// A job with this id is already registered
    #[error("episode {id} is already being processed")]
    JobAlreadyActive {
        /// The colliding episode id
        id: EpisodeId,
    },

    /// No active job or resource with this identifier
    #[error("not found: {0}")]
    NotFound(String),

    /// A transfer stage failed or was aborted
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// External tool missing or unusable (yt-dlp)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Failure reported by a transfer stage in place of completion
#[derive(Debug, Error)]
pub enum TransferError {
    /// The transfer was aborted through its handle
    #[error("cancelled by user")]
    Aborted,

    /// The external transfer reported a failure
    #[error("{0}")]
    Failed(String),

    /// Local file access failed during the transfer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stage task ended without reporting an outcome
    #[error("transfer ended without reporting an outcome")]
    Dropped,
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "not found: episode 3"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "storage_init_failed")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::NotFound(_) => 404,
            Error::JobAlreadyActive { .. } => 409,

            Error::StorageInit(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // External services
            Error::Network(_) => 502,
            Error::Transfer(_) => 502,

            Error::ExternalTool(_) => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::StorageInit(_) => "storage_init_failed",
            Error::JobAlreadyActive { .. } => "job_already_active",
            Error::NotFound(_) => "not_found",
            Error::Transfer(e) => match e {
                TransferError::Aborted => "cancelled",
                TransferError::Failed(_) => "transfer_failed",
                TransferError::Io(_) => "io_error",
                TransferError::Dropped => "transfer_dropped",
            },
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::JobAlreadyActive { id } => Some(serde_json::json!({ "episode": id })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

/// Render an error and its `source()` chain, one cause per line
///
/// Used as the `details` text of failed job results.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
