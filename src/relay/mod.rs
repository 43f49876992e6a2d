//! The relay service: pipeline, cancellation and status, split by concern
//!
//! The `Relay` struct and its methods are organized by domain:
//! - [`pipeline`] - Sequential batch processing (download, upload, cleanup)
//! - [`cancel`] - Cancelling one or all active jobs
//! - [`status`] - Snapshot of files, job logs and active jobs

mod cancel;
mod pipeline;
mod status;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use cancel::{CancelAllReport, CancelOutcome};
pub use status::{LogEntry, StatusReport};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::JobRegistry;
use crate::transfer::{HttpStorageClient, MediaFetcher, StorageClient, YtDlpFetcher};
use crate::types::{EpisodeId, Event};
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::sync::{OnceCell, broadcast};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main relay instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Relay {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Active jobs, shared between batch processing and cancel requests
    pub(crate) registry: Arc<JobRegistry>,
    /// Download stage
    pub(crate) fetcher: Arc<dyn MediaFetcher>,
    /// Upload stage
    pub(crate) storage: Arc<dyn StorageClient>,
    /// Set once the storage account has been logged into
    storage_ready: Arc<OnceCell<()>>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
}

impl Relay {
    /// Create a relay using yt-dlp for downloads and the configured HTTP
    /// storage account for uploads
    ///
    /// Creates the download and logs directories if they do not exist.
    ///
    /// # Errors
    ///
    /// Fails if a directory cannot be created, yt-dlp cannot be found, or the
    /// HTTP client cannot be built.
    pub async fn new(config: Config) -> Result<Self> {
        let fetcher = YtDlpFetcher::from_config(&config.download)?;
        let storage = HttpStorageClient::new(&config.storage)?;
        tracing::info!(
            fetcher = fetcher.name(),
            binary = %fetcher.binary_path().display(),
            storage = storage.name(),
            endpoint = %config.storage.endpoint,
            "Transfer stages initialized"
        );
        Self::with_stages(config, Arc::new(fetcher), Arc::new(storage)).await
    }

    /// Create a relay with explicit download and upload stages
    pub async fn with_stages(
        config: Config,
        fetcher: Arc<dyn MediaFetcher>,
        storage: Arc<dyn StorageClient>,
    ) -> Result<Self> {
        for (label, dir) in [
            ("download", &config.download.download_dir),
            ("logs", &config.download.logs_dir),
        ] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create {} directory '{}': {}",
                        label,
                        dir.display(),
                        e
                    ),
                ))
            })?;
        }

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(JobRegistry::new()),
            fetcher,
            storage,
            storage_ready: Arc::new(OnceCell::new()),
            event_tx,
        })
    }

    /// Subscribe to job lifecycle events
    ///
    /// Each subscriber receives every event independently. A subscriber that
    /// falls more than 1000 events behind gets `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Registry of active jobs
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Log into the storage account unless that already succeeded
    ///
    /// Concurrent callers share one login attempt. A failed attempt is not
    /// remembered, so the next batch tries again.
    ///
    /// # Errors
    ///
    /// [`Error::StorageInit`] when the login fails.
    pub async fn ensure_storage(&self) -> Result<()> {
        self.storage_ready
            .get_or_try_init(|| async {
                self.storage.login().await.map_err(|e| match e {
                    Error::StorageInit(_) => e,
                    other => Error::StorageInit(other.to_string()),
                })?;
                tracing::info!(storage = self.storage.name(), "Storage account ready");
                Ok::<(), Error>(())
            })
            .await
            .map(|_| ())
    }

    /// Emit an event to all subscribers; dropped silently if there are none
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Delete an episode's file and any yt-dlp intermediates left beside it
    ///
    /// Returns `Ok(true)` if at least one file was removed. Files that vanish
    /// mid-sweep, or a missing download directory, are not an error.
    pub(crate) async fn remove_artifacts(&self, id: EpisodeId) -> std::io::Result<bool> {
        let naming = &self.config.download.naming;
        let mut entries = match tokio::fs::read_dir(&self.config.download.download_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };

        let mut removed = false;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !naming.is_artifact_of(name, id) {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => {
                    tracing::debug!(episode = id.0, file = name, "Removed episode file");
                    removed = true;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }
}

