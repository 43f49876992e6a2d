//! Per-job progress and status recording
//!
//! Each job gets its own log file in the logs directory
//! (`episode_{n}_{unix_millis}.log`, append mode). Every recorded line is
//! timestamped and mirrored to `tracing` with the episode attached, so the
//! same history is visible both in the service log and through `GET /status`.

use crate::error::Result;
use crate::transfer::TransferProgress;
use crate::types::{EpisodeId, Stage};
use chrono::{SecondsFormat, Utc};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Minimum advance, in percentage points, between two recorded progress lines
pub const PROGRESS_STEP_PERCENT: f64 = 5.0;

/// Timestamped log for a single job
///
/// The file handle is closed when the last reference is dropped, which
/// happens once the job reaches a terminal outcome.
#[derive(Debug)]
pub struct JobLog {
    episode: EpisodeId,
    path: PathBuf,
    file: Mutex<File>,
}

impl JobLog {
    /// Create (or append to) the log file for `episode` under `logs_dir`
    pub fn create(logs_dir: &Path, episode: EpisodeId) -> Result<Self> {
        let file_name = format!(
            "episode_{}_{}.log",
            episode,
            Utc::now().timestamp_millis()
        );
        let path = logs_dir.join(file_name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            episode,
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the underlying log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an informational line
    pub fn record(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::info!(episode = self.episode.0, "{}", message);
        self.write_line(message);
    }

    /// Record an error line
    pub fn record_error(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::error!(episode = self.episode.0, "{}", message);
        self.write_line(message);
    }

    // Blocking write under a std Mutex; the lock is never held across an
    // await and the line is on disk when `record` returns.
    fn write_line(&self, message: &str) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let line = format!("[{}] {}\n", timestamp, message);
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = file.write_all(line.as_bytes()) {
            tracing::warn!(
                episode = self.episode.0,
                path = %self.path.display(),
                error = %e,
                "Failed to write job log line"
            );
        }
    }
}

/// Decides which progress notifications of one stage run get recorded
///
/// A value is recorded when it is at least [`PROGRESS_STEP_PERCENT`] points
/// above the last recorded value (the first comparison is against 0), or when
/// it reaches 100 for the first time. Lower values are ignored, so recorded
/// values never decrease. A throttle is never reset within a stage run.
#[derive(Debug, Clone, Default)]
pub struct ProgressThrottle {
    last_recorded: f64,
    completed: bool,
}

impl ProgressThrottle {
    /// Feed a new percentage; returns true if it should be recorded
    pub fn observe(&mut self, percent: f64) -> bool {
        if !percent.is_finite() || self.completed {
            return false;
        }
        let percent = percent.clamp(0.0, 100.0);
        let record = if percent >= 100.0 {
            true
        } else {
            percent - self.last_recorded >= PROGRESS_STEP_PERCENT
        };
        if record {
            self.last_recorded = percent;
            self.completed = percent >= 100.0;
        }
        record
    }

    /// Last value that was recorded (0 before any)
    pub fn last_recorded(&self) -> f64 {
        self.last_recorded
    }
}

/// Percentage with two decimals, for log text only
pub fn format_percent(percent: f64) -> String {
    format!("{:.2}", percent)
}

/// Byte count as megabytes with two decimals
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2}MB", bytes as f64 / 1024.0 / 1024.0)
}

/// Log line for a recorded progress notification
pub fn describe_progress(stage: Stage, progress: &TransferProgress) -> String {
    let mut line = format!(
        "{} Progress: {}%",
        stage,
        format_percent(progress.percent)
    );
    match stage {
        Stage::Download => {
            if let Some(speed) = &progress.speed {
                line.push_str(&format!(" at {}", speed));
            }
            if let Some(eta) = &progress.eta {
                line.push_str(&format!(" - ETA: {}", eta));
            }
        }
        Stage::Upload => {
            if let Some(total) = progress.total_bytes {
                line.push_str(&format!(
                    " ({} / {})",
                    format_megabytes(progress.transferred_bytes),
                    format_megabytes(total)
                ));
            }
        }
    }
    line
}
