//! Sequential batch processing: download, upload, cleanup per episode

use super::Relay;
use crate::error::{Error, Result, TransferError, error_chain};
use crate::job_log::{JobLog, ProgressThrottle, describe_progress};
use crate::transfer::{TransferHandle, TransferProgress};
use crate::types::{EpisodeId, Event, JobResult, JobStatus, Stage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Failure of one job, with the stage it happened in (if any)
struct JobFailure {
    stage: Option<Stage>,
    error: Error,
}

impl JobFailure {
    fn in_stage(stage: Stage, error: impl Into<Error>) -> Self {
        Self {
            stage: Some(stage),
            error: error.into(),
        }
    }
}

impl Relay {
    /// Process a batch of source URLs strictly in order
    ///
    /// Episode numbers are the 1-based positions in `urls`. One episode's
    /// failure never stops the batch; the result has one entry per URL, in
    /// input order.
    ///
    /// # Errors
    ///
    /// [`Error::StorageInit`] if the storage account cannot be logged into. In
    /// that case no job is registered.
    pub async fn process_batch(&self, urls: &[String]) -> Result<Vec<JobResult>> {
        self.ensure_storage().await?;

        tracing::info!(count = urls.len(), "Processing batch");
        let mut results = Vec::with_capacity(urls.len());
        for (index, url) in urls.iter().enumerate() {
            let id = EpisodeId::from_batch_index(index);
            results.push(self.process_episode(id, url).await);
        }
        Ok(results)
    }

    /// Download, upload and clean up a single episode
    ///
    /// Always yields a result; the job is no longer registered once this
    /// returns.
    pub async fn process_episode(&self, id: EpisodeId, url: &str) -> JobResult {
        let naming = &self.config.download.naming;
        let file_name = naming.file_name(id);
        let artifact = naming.local_path(&self.config.download.download_dir, id);

        let log = match JobLog::create(&self.config.download.logs_dir, id) {
            Ok(log) => {
                tracing::debug!(episode = id.0, path = %log.path().display(), "Opened job log");
                Arc::new(log)
            }
            Err(e) => {
                tracing::error!(episode = id.0, error = %e, "Failed to open job log");
                return self.job_failed(id, None, e);
            }
        };

        let cancel = match self.registry.register(id, artifact.clone()) {
            Ok(token) => token,
            Err(e) => {
                // The id belongs to another batch's job; leave its state and files alone.
                log.record_error(format!("Error processing episode {}: {}", id, e));
                return self.job_failed(id, None, e);
            }
        };

        log.record(format!("Starting process for episode {}", id));
        log.record(format!("URL: {}", url));
        self.emit_event(Event::JobStarted {
            episode: id,
            url: url.to_string(),
        });

        match self
            .run_stages(id, url, &file_name, &artifact, &cancel, &log)
            .await
        {
            Ok(()) => {
                self.spawn_artifact_removal(id, artifact, Arc::clone(&log));
                log.record(format!("Successfully processed episode {}", id));
                self.registry.remove(id);
                self.emit_event(Event::Completed { episode: id });
                JobResult::succeeded(id)
            }
            Err(failure) => {
                let cause = failure.error.to_string();
                log.record_error(format!("Error processing episode {}: {}", id, cause));
                log.record_error(format!("Error details: {}", error_chain(&failure.error)));

                match self.remove_artifacts(id).await {
                    Ok(true) => {
                        log.record(format!("Cleaned up incomplete file: {}", artifact.display()));
                        self.emit_event(Event::ArtifactDeleted { episode: id });
                    }
                    Ok(false) => {}
                    Err(e) => log.record_error(format!(
                        "Failed to clean up file {}: {}",
                        artifact.display(),
                        e
                    )),
                }

                self.registry.remove(id);
                self.job_failed(id, failure.stage, failure.error)
            }
        }
    }

    async fn run_stages(
        &self,
        id: EpisodeId,
        url: &str,
        file_name: &str,
        artifact: &Path,
        cancel: &CancellationToken,
        log: &JobLog,
    ) -> std::result::Result<(), JobFailure> {
        let download = self.fetcher.start(url, artifact);
        self.registry.attach_download(id, download.abort_handle());
        self.await_stage(
            download,
            cancel,
            self.progress_recorder(id, Stage::Download, log),
        )
        .await
        .map_err(|e| JobFailure::in_stage(Stage::Download, e))?;

        log.record(format!("Download completed for episode {}", id));
        self.emit_event(Event::DownloadComplete { episode: id });
        self.registry.detach_handles(id);
        self.registry.set_status(id, JobStatus::Uploading);

        if cancel.is_cancelled() {
            return Err(JobFailure::in_stage(Stage::Upload, TransferError::Aborted));
        }

        log.record(format!("Starting upload for episode {}", id));
        let upload = self.storage.upload(artifact, file_name);
        self.registry.attach_upload(id, upload.abort_handle());
        self.await_stage(upload, cancel, self.progress_recorder(id, Stage::Upload, log))
            .await
            .map_err(|e| JobFailure::in_stage(Stage::Upload, e))?;

        log.record(format!("Upload completed for episode {}", id));
        self.emit_event(Event::UploadComplete {
            episode: id,
            file_name: file_name.to_string(),
        });
        Ok(())
    }

    /// Await a transfer, racing the job's cancel token
    ///
    /// When cancellation wins the transfer is aborted and awaited, so the
    /// stage has stopped touching its files before cleanup runs.
    async fn await_stage<F>(
        &self,
        handle: TransferHandle,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> std::result::Result<(), TransferError>
    where
        F: FnMut(TransferProgress),
    {
        let abort = handle.abort_handle();
        let finish = handle.finish(on_progress);
        tokio::pin!(finish);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            outcome = &mut finish => return outcome,
        }

        abort.abort();
        if let Err(e) = finish.await
            && !matches!(e, TransferError::Aborted)
        {
            tracing::debug!(error = %e, "Transfer ended with an error after abort");
        }
        Err(TransferError::Aborted)
    }

    /// Progress callback for one stage run: throttles, logs and emits events
    fn progress_recorder<'a>(
        &'a self,
        id: EpisodeId,
        stage: Stage,
        log: &'a JobLog,
    ) -> impl FnMut(TransferProgress) + 'a {
        let mut throttle = ProgressThrottle::default();
        move |progress| {
            if !throttle.observe(progress.percent) {
                return;
            }
            log.record(describe_progress(stage, &progress));
            let percent = throttle.last_recorded();
            self.emit_event(match stage {
                Stage::Download => Event::Downloading {
                    episode: id,
                    percent,
                },
                Stage::Upload => Event::Uploading {
                    episode: id,
                    percent,
                },
            });
        }
    }

    /// Delete the uploaded artifact in the background; failures are only logged
    fn spawn_artifact_removal(&self, id: EpisodeId, artifact: PathBuf, log: Arc<JobLog>) {
        let relay = self.clone();
        tokio::spawn(async move {
            match relay.remove_artifacts(id).await {
                Ok(true) => {
                    log.record(format!("Deleted local file: {}", artifact.display()));
                    relay.emit_event(Event::ArtifactDeleted { episode: id });
                }
                Ok(false) => {}
                Err(e) => log.record_error(format!(
                    "Error deleting file {}: {}",
                    artifact.display(),
                    e
                )),
            }
        });
    }

    fn job_failed(&self, id: EpisodeId, stage: Option<Stage>, error: impl Into<Error>) -> JobResult {
        let error = error.into();
        let cause = error.to_string();
        self.emit_event(Event::Failed {
            episode: id,
            stage,
            error: cause.clone(),
        });
        JobResult::failed(id, cause, error_chain(&error))
    }
}
