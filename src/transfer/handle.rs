//! Channel-based handle for one in-flight transfer
//!
//! A stage implementation calls [`channel`] to get a [`TransferHandle`] for
//! the orchestrator and a [`TransferReporter`] for its own spawned task. The
//! reporter publishes progress, watches for abort, and reports exactly one
//! outcome; the handle drives progress into a callback until that outcome
//! arrives.

use crate::error::TransferError;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Single progress notification from a transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    /// Percentage complete (0.0 to 100.0)
    pub percent: f64,
    /// Bytes transferred so far (0 if unknown)
    pub transferred_bytes: u64,
    /// Total size in bytes, when known
    pub total_bytes: Option<u64>,
    /// Transfer speed as reported by the tool
    pub speed: Option<String>,
    /// Estimated time remaining as reported by the tool
    pub eta: Option<String>,
}

impl TransferProgress {
    /// Progress computed from a byte count: `transferred / total * 100`
    pub fn from_bytes(transferred: u64, total: u64) -> Self {
        let percent = if total > 0 {
            (transferred as f64 / total as f64) * 100.0
        } else {
            100.0
        };
        Self {
            percent,
            transferred_bytes: transferred,
            total_bytes: Some(total),
            speed: None,
            eta: None,
        }
    }

    /// Progress from a bare percentage
    #[cfg(test)]
    pub(crate) fn from_percent(percent: f64) -> Self {
        Self {
            percent,
            transferred_bytes: 0,
            total_bytes: None,
            speed: None,
            eta: None,
        }
    }
}

/// Cloneable abort trigger for a transfer
///
/// Aborting is idempotent and best-effort: a transfer that already finished
/// keeps its outcome.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    token: CancellationToken,
}

impl AbortHandle {
    /// Request the transfer to stop
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// Whether abort has been requested
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Consumer side of a running transfer
#[derive(Debug)]
pub struct TransferHandle {
    abort: AbortHandle,
    progress: mpsc::UnboundedReceiver<TransferProgress>,
    outcome: oneshot::Receiver<Result<(), TransferError>>,
}

/// Producer side of a running transfer, owned by the stage task
#[derive(Debug)]
pub struct TransferReporter {
    abort: AbortHandle,
    progress: ProgressPublisher,
    outcome: oneshot::Sender<Result<(), TransferError>>,
}

/// Cloneable progress sender, for code that cannot borrow the reporter
/// (e.g. a request body stream)
#[derive(Debug, Clone)]
pub struct ProgressPublisher {
    tx: mpsc::UnboundedSender<TransferProgress>,
}

impl ProgressPublisher {
    /// Publish a progress notification (dropped if nobody is listening)
    pub fn publish(&self, progress: TransferProgress) {
        self.tx.send(progress).ok();
    }
}

/// Create a connected handle/reporter pair
pub fn channel() -> (TransferHandle, TransferReporter) {
    let abort = AbortHandle::default();
    let (progress_tx, progress_rx) = mpsc::unbounded_channel();
    let (outcome_tx, outcome_rx) = oneshot::channel();
    (
        TransferHandle {
            abort: abort.clone(),
            progress: progress_rx,
            outcome: outcome_rx,
        },
        TransferReporter {
            abort,
            progress: ProgressPublisher { tx: progress_tx },
            outcome: outcome_tx,
        },
    )
}

impl TransferHandle {
    /// Abort trigger for this transfer, to be attached to the owning job
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Drive progress notifications into `on_progress` until the transfer
    /// reports its outcome
    ///
    /// Progress published before the outcome is always delivered first.
    pub async fn finish<F>(mut self, mut on_progress: F) -> Result<(), TransferError>
    where
        F: FnMut(TransferProgress),
    {
        let outcome = loop {
            tokio::select! {
                biased;
                Some(progress) = self.progress.recv() => on_progress(progress),
                outcome = &mut self.outcome => break outcome,
            }
        };
        while let Ok(progress) = self.progress.try_recv() {
            on_progress(progress);
        }
        outcome.unwrap_or(Err(TransferError::Dropped))
    }
}

impl TransferReporter {
    /// Publish a progress notification (dropped if nobody is listening)
    pub fn progress(&self, progress: TransferProgress) {
        self.progress.publish(progress);
    }

    /// Detached publisher sharing this reporter's progress channel
    pub fn publisher(&self) -> ProgressPublisher {
        self.progress.clone()
    }

    /// Resolves once abort has been requested
    pub async fn aborted(&self) {
        self.abort.token.cancelled().await
    }

    /// Whether abort has been requested
    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Report the outcome, consuming the reporter
    pub fn complete(self, outcome: Result<(), TransferError>) {
        self.outcome.send(outcome).ok();
    }
}
