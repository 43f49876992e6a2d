//! Status snapshot: downloaded files, job logs and active jobs

use super::Relay;
use crate::error::{Error, Result};
use crate::registry::JobSnapshot;
use serde::Serialize;
use std::path::Path;
use utoipa::ToSchema;

/// One job log file and its full content
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LogEntry {
    /// Log file name
    pub filename: String,
    /// Full file content
    pub content: String,
}

/// Everything `GET /status` reports
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// File names currently in the download directory
    pub downloading_files: Vec<String>,
    /// Download directory path
    pub download_folder: String,
    /// Every job log, ordered by file name
    pub logs: Vec<LogEntry>,
    /// Active jobs, ordered by episode
    pub active_processes: Vec<JobSnapshot>,
    /// Number of active jobs
    pub total_active_processes: usize,
}

impl Relay {
    /// Collect the current status
    ///
    /// # Errors
    ///
    /// Fails if the download or logs directory cannot be read.
    pub async fn status(&self) -> Result<StatusReport> {
        let download_dir = &self.config.download.download_dir;
        let downloading_files = list_file_names(download_dir).await?;

        let mut logs = Vec::new();
        for filename in list_file_names(&self.config.download.logs_dir).await? {
            if !filename.ends_with(".log") {
                continue;
            }
            let bytes = tokio::fs::read(self.config.download.logs_dir.join(&filename)).await?;
            logs.push(LogEntry {
                filename,
                content: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let active_processes = self.registry.list_active();
        let download_folder = std::path::absolute(download_dir)
            .unwrap_or_else(|_| download_dir.clone())
            .display()
            .to_string();

        Ok(StatusReport {
            downloading_files,
            download_folder,
            logs,
            total_active_processes: active_processes.len(),
            active_processes,
        })
    }
}

/// Sorted names of the regular files directly inside `dir`
async fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read directory '{}': {}", dir.display(), e),
        ))
    })?;

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
