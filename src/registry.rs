//! In-memory registry of active jobs
//!
//! A job is present exactly while it is downloading or uploading; every
//! terminal outcome (success, failure, cancellation) removes it. All
//! operations are a single critical section of one `std::sync::Mutex`, which
//! is never held across an `.await`.

use crate::error::{Error, Result};
use crate::transfer::AbortHandle;
use crate::types::{EpisodeId, JobStatus};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

/// Mutable record of one active episode job
#[derive(Debug)]
pub struct Job {
    /// Episode the job processes
    pub id: EpisodeId,
    /// Current stage
    pub status: JobStatus,
    /// Set once by a cancel request; observed at pipeline checkpoints
    pub cancel: CancellationToken,
    /// Abort trigger of the running download, if any
    pub download_handle: Option<AbortHandle>,
    /// Abort trigger of the running upload, if any
    pub upload_handle: Option<AbortHandle>,
    /// Local file the job produces
    pub artifact: PathBuf,
}

/// Read-only view of an active job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    /// Episode number
    pub episode: EpisodeId,
    /// Current stage
    pub status: JobStatus,
    /// Whether a cancel has been requested
    pub is_cancelling: bool,
}

impl From<&Job> for JobSnapshot {
    fn from(job: &Job) -> Self {
        Self {
            episode: job.id,
            status: job.status,
            is_cancelling: job.cancel.is_cancelled(),
        }
    }
}

/// What a cancel request has to act on, captured atomically with setting the flag
#[derive(Debug, Clone)]
pub struct CancelTarget {
    /// Download abort trigger, if a download was running
    pub download: Option<AbortHandle>,
    /// Upload abort trigger, if an upload was running
    pub upload: Option<AbortHandle>,
    /// Local file to clean up
    pub artifact: PathBuf,
}

/// Owned table of active jobs, shared behind an `Arc`
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<EpisodeId, Job>>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EpisodeId, Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new job in the `Downloading` state
    ///
    /// Returns the job's cancellation token.
    ///
    /// # Errors
    ///
    /// [`Error::JobAlreadyActive`] if a job with this id is present.
    pub fn register(&self, id: EpisodeId, artifact: PathBuf) -> Result<CancellationToken> {
        let mut jobs = self.lock();
        if jobs.contains_key(&id) {
            return Err(Error::JobAlreadyActive { id });
        }
        let cancel = CancellationToken::new();
        jobs.insert(
            id,
            Job {
                id,
                status: JobStatus::Downloading,
                cancel: cancel.clone(),
                download_handle: None,
                upload_handle: None,
                artifact,
            },
        );
        Ok(cancel)
    }

    /// Snapshot of a job, if active
    pub fn get(&self, id: EpisodeId) -> Option<JobSnapshot> {
        self.lock().get(&id).map(JobSnapshot::from)
    }

    /// Update a job's status; false if the job is not active
    pub fn set_status(&self, id: EpisodeId, status: JobStatus) -> bool {
        match self.lock().get_mut(&id) {
            Some(job) => {
                job.status = status;
                true
            }
            None => false,
        }
    }

    /// Attach the running download's abort trigger (clears any upload handle)
    pub fn attach_download(&self, id: EpisodeId, handle: AbortHandle) -> bool {
        match self.lock().get_mut(&id) {
            Some(job) => {
                job.download_handle = Some(handle);
                job.upload_handle = None;
                true
            }
            None => false,
        }
    }

    /// Attach the running upload's abort trigger (clears any download handle)
    pub fn attach_upload(&self, id: EpisodeId, handle: AbortHandle) -> bool {
        match self.lock().get_mut(&id) {
            Some(job) => {
                job.upload_handle = Some(handle);
                job.download_handle = None;
                true
            }
            None => false,
        }
    }

    /// Drop both abort triggers
    pub fn detach_handles(&self, id: EpisodeId) {
        if let Some(job) = self.lock().get_mut(&id) {
            job.download_handle = None;
            job.upload_handle = None;
        }
    }

    /// Remove a job; a second call for the same id returns `None`
    pub fn remove(&self, id: EpisodeId) -> Option<Job> {
        self.lock().remove(&id)
    }

    /// Set the cancel flag and capture the job's handles and artifact
    ///
    /// Returns `None` if the job is not active.
    pub fn request_cancel(&self, id: EpisodeId) -> Option<CancelTarget> {
        let jobs = self.lock();
        let job = jobs.get(&id)?;
        job.cancel.cancel();
        Some(CancelTarget {
            download: job.download_handle.clone(),
            upload: job.upload_handle.clone(),
            artifact: job.artifact.clone(),
        })
    }

    /// Snapshots of all active jobs, ordered by episode
    pub fn list_active(&self) -> Vec<JobSnapshot> {
        let mut active: Vec<JobSnapshot> = self.lock().values().map(JobSnapshot::from).collect();
        active.sort_by_key(|s| s.episode);
        active
    }

    /// Ids of all active jobs, ordered
    pub fn ids(&self) -> Vec<EpisodeId> {
        let mut ids: Vec<EpisodeId> = self.lock().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Number of active jobs
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no job is active
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
