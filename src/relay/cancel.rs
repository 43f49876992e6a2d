//! Cancelling active jobs by episode number

use super::Relay;
use crate::types::{EpisodeId, Event};

/// Result of cancelling one job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job was active and has been cancelled
    Cancelled,
    /// No active job with that episode number
    NotFound,
}

/// Result of cancelling every active job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelAllReport {
    /// Nothing was active when the request arrived
    NoActiveJobs,
    /// Every job in the snapshot was attempted
    Completed {
        /// Episodes that were cancelled
        successful: Vec<EpisodeId>,
        /// Episodes that could not be cancelled (e.g. finished in the meantime)
        failed: Vec<EpisodeId>,
    },
}

impl Relay {
    /// Cancel one active job
    ///
    /// Sets the job's cancel flag, aborts whichever transfer is running,
    /// deletes its local files and removes it from the registry. A failed
    /// delete is logged and does not stop the cancellation. The batch that
    /// owns the job records it as failed with "cancelled by user" and moves on.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use episode_relay::{Relay, EpisodeId, relay::CancelOutcome};
    /// # async fn example(relay: Relay) {
    /// match relay.cancel_one(EpisodeId(2)).await {
    ///     CancelOutcome::Cancelled => println!("episode 2 cancelled"),
    ///     CancelOutcome::NotFound => println!("episode 2 is not running"),
    /// }
    /// # }
    /// ```
    pub async fn cancel_one(&self, id: EpisodeId) -> CancelOutcome {
        let Some(target) = self.registry.request_cancel(id) else {
            tracing::debug!(episode = id.0, "Cancel requested for inactive episode");
            return CancelOutcome::NotFound;
        };

        tracing::info!(episode = id.0, "Cancelling episode");
        if let Some(download) = &target.download {
            download.abort();
        }
        if let Some(upload) = &target.upload {
            upload.abort();
        }

        match self.remove_artifacts(id).await {
            Ok(true) => {
                tracing::info!(
                    episode = id.0,
                    path = %target.artifact.display(),
                    "Deleted file of cancelled episode"
                );
                self.emit_event(Event::ArtifactDeleted { episode: id });
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(
                episode = id.0,
                path = %target.artifact.display(),
                error = %e,
                "Failed to delete file of cancelled episode"
            ),
        }

        self.registry.remove(id);
        self.emit_event(Event::Cancelled { episode: id });
        CancelOutcome::Cancelled
    }

    /// Cancel every active job
    ///
    /// Works on a snapshot of the active ids taken when the call starts and
    /// attempts each one even if an earlier one fails.
    pub async fn cancel_all(&self) -> CancelAllReport {
        let ids = self.registry.ids();
        if ids.is_empty() {
            return CancelAllReport::NoActiveJobs;
        }

        let mut successful = Vec::new();
        let mut failed = Vec::new();
        for id in ids {
            match self.cancel_one(id).await {
                CancelOutcome::Cancelled => successful.push(id),
                CancelOutcome::NotFound => failed.push(id),
            }
        }

        tracing::info!(
            cancelled = successful.len(),
            failed = failed.len(),
            "Cancel-all finished"
        );
        CancelAllReport::Completed { successful, failed }
    }
}
