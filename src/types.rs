//! Core types for episode-relay

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identifier of an episode job: its 1-based position in the submitted batch
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct EpisodeId(pub i64);

impl EpisodeId {
    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }

    /// Episode id for the zero-based index of a URL within a batch
    pub fn from_batch_index(index: usize) -> Self {
        Self(index as i64 + 1)
    }
}

impl From<i64> for EpisodeId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<EpisodeId> for i64 {
    fn from(id: EpisodeId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for EpisodeId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EpisodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Transient status of an active job
///
/// Has no terminal value. A job that completes, fails or is cancelled leaves
/// the registry instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// The download stage is running
    Downloading,
    /// The upload stage is running
    Uploading,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Downloading => f.write_str("downloading"),
            JobStatus::Uploading => f.write_str("uploading"),
        }
    }
}

/// Transfer stage within a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Fetching the episode into the download directory
    Download,
    /// Streaming the local file to the storage account
    Upload,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Download => f.write_str("Download"),
            Stage::Upload => f.write_str("Upload"),
        }
    }
}

/// Outcome of one episode within a batch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobResult {
    /// Whether download and upload both succeeded
    pub success: bool,
    /// Human-readable summary
    pub message: String,
    /// Error chain for failed jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl JobResult {
    /// Successful result for an episode
    pub fn succeeded(episode: EpisodeId) -> Self {
        Self {
            success: true,
            message: format!("Successfully processed episode {}", episode),
            details: None,
        }
    }

    /// Failed result for an episode
    pub fn failed(episode: EpisodeId, cause: impl std::fmt::Display, details: String) -> Self {
        Self {
            success: false,
            message: format!("Failed to process episode {}: {}", episode, cause),
            details: Some(details),
        }
    }
}

/// Event emitted during a job's lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A job was registered and its download is starting
    JobStarted {
        /// Episode ID
        episode: EpisodeId,
        /// Source URL
        url: String,
    },

    /// Recorded download progress
    Downloading {
        /// Episode ID
        episode: EpisodeId,
        /// Progress percentage (0.0 to 100.0)
        percent: f64,
    },

    /// Download stage finished
    DownloadComplete {
        /// Episode ID
        episode: EpisodeId,
    },

    /// Recorded upload progress
    Uploading {
        /// Episode ID
        episode: EpisodeId,
        /// Progress percentage (0.0 to 100.0)
        percent: f64,
    },

    /// Upload stage finished
    UploadComplete {
        /// Episode ID
        episode: EpisodeId,
        /// Remote file name
        file_name: String,
    },

    /// Local artifact removed after upload or during cleanup
    ArtifactDeleted {
        /// Episode ID
        episode: EpisodeId,
    },

    /// Job finished successfully
    Completed {
        /// Episode ID
        episode: EpisodeId,
    },

    /// Job failed (including user cancellation)
    Failed {
        /// Episode ID
        episode: EpisodeId,
        /// Stage that failed, if the failure happened inside one
        #[serde(skip_serializing_if = "Option::is_none")]
        stage: Option<Stage>,
        /// Error message
        error: String,
    },

    /// Cancellation was requested for an active job
    Cancelled {
        /// Episode ID
        episode: EpisodeId,
    },
}

impl Event {
    /// Short name used as the SSE event type
    pub fn kind(&self) -> &'static str {
        match self {
            Event::JobStarted { .. } => "job_started",
            Event::Downloading { .. } => "downloading",
            Event::DownloadComplete { .. } => "download_complete",
            Event::Uploading { .. } => "uploading",
            Event::UploadComplete { .. } => "upload_complete",
            Event::ArtifactDeleted { .. } => "artifact_deleted",
            Event::Completed { .. } => "completed",
            Event::Failed { .. } => "failed",
            Event::Cancelled { .. } => "cancelled",
        }
    }
}
