//! # episode-relay
//!
//! HTTP-triggered relay that downloads episodes with `yt-dlp` and uploads
//! them to a storage account, one episode at a time.
//!
//! ## Design
//!
//! - **Sequential batches** - Each submitted URL becomes an episode job; a
//!   batch runs its jobs one after another and returns one result per URL
//! - **Cancellable** - Any active episode can be cancelled by number while
//!   its download or upload is running; the batch moves on to the next one
//! - **Observable** - Per-job log files, `tracing` output and a broadcast
//!   event stream (served over SSE by the API)
//! - **Pluggable stages** - Download and upload sit behind the
//!   [`transfer::MediaFetcher`] and [`transfer::StorageClient`] traits
//!
//! ## Quick Start
//!
//! ```no_run
//! use episode_relay::{Config, Relay};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let relay = Relay::new(Config::from_env()?).await?;
//!
//!     // Subscribe to events
//!     let mut events = relay.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let urls = vec!["https://example.com/watch/episode-1".to_string()];
//!     for result in relay.process_batch(&urls).await? {
//!         println!("{}", result.message);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Per-job log files and progress throttling
pub mod job_log;
/// Episode file naming
pub mod naming;
/// Registry of active jobs
pub mod registry;
/// Batch pipeline, cancellation and status
pub mod relay;
/// Download and upload stages
pub mod transfer;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use relay::Relay;
pub use types::{EpisodeId, Event, JobResult, JobStatus, Stage};

/// Resolve once a termination signal arrives.
///
/// Used as the API server's graceful-shutdown trigger.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn shutdown_signal() {
    wait_for_signal().await;
    tracing::info!("Shutting down");
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration can fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(term), Err(int)) => {
            tracing::error!(
                sigterm = %term,
                sigint = %int,
                "Could not register any signal handlers, using ctrl_c fallback"
            );
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
