//! Scripted fake transfer stages and a relay built on them

use crate::config::Config;
use crate::error::{Error, Result, TransferError};
use crate::relay::Relay;
use crate::transfer::{
    MediaFetcher, StorageClient, TransferHandle, TransferProgress, TransferReporter, channel,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

/// Behavior of one scripted transfer
#[derive(Clone, Debug)]
pub(crate) enum Script {
    /// Publish these percentages, then succeed
    Succeed(Vec<f64>),
    /// Leave partial files behind and fail with this message
    Fail(String),
    /// Leave partial files behind, signal `started`, then wait for abort
    Hang,
}

impl Default for Script {
    fn default() -> Self {
        Script::Succeed(vec![25.0, 50.0, 75.0, 100.0])
    }
}

/// Download stage driven by per-URL scripts
#[derive(Default)]
pub(crate) struct FakeFetcher {
    scripts: HashMap<String, Script>,
    /// Notified when a hanging download has started
    pub started: Arc<Notify>,
    /// URLs whose downloads observed an abort
    pub aborted: Arc<Mutex<Vec<String>>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, script: Script) -> Self {
        self.scripts.insert(url.to_string(), script);
        self
    }
}

impl MediaFetcher for FakeFetcher {
    fn start(&self, url: &str, output: &Path) -> TransferHandle {
        let (handle, reporter) = channel();
        let script = self.scripts.get(url).cloned().unwrap_or_default();
        let output = output.to_path_buf();
        let url = url.to_string();
        let started = self.started.clone();
        let aborted = self.aborted.clone();

        tokio::spawn(async move {
            let outcome = match script {
                Script::Succeed(steps) => {
                    publish(&reporter, &steps);
                    tokio::fs::write(&output, b"episode data")
                        .await
                        .map_err(TransferError::from)
                }
                Script::Fail(message) => {
                    write_partial(&output).await;
                    Err(TransferError::Failed(message))
                }
                Script::Hang => {
                    write_partial(&output).await;
                    started.notify_one();
                    reporter.aborted().await;
                    aborted.lock().unwrap().push(url);
                    Err(TransferError::Aborted)
                }
            };
            reporter.complete(outcome);
        });

        handle
    }

    fn name(&self) -> &'static str {
        "fake-fetcher"
    }
}

/// Upload stage driven by per-remote-name scripts
#[derive(Default)]
pub(crate) struct FakeStorage {
    scripts: HashMap<String, Script>,
    login_error: Option<String>,
    /// Number of login attempts
    pub logins: Arc<AtomicUsize>,
    /// Remote names that were uploaded successfully, in order
    pub uploaded: Arc<Mutex<Vec<String>>>,
    /// Remote names whose uploads observed an abort
    pub aborted: Arc<Mutex<Vec<String>>>,
    /// Notified when a hanging upload has started
    pub started: Arc<Notify>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, remote_name: &str, script: Script) -> Self {
        self.scripts.insert(remote_name.to_string(), script);
        self
    }

    pub fn failing_login(mut self, message: &str) -> Self {
        self.login_error = Some(message.to_string());
        self
    }
}

#[async_trait]
impl StorageClient for FakeStorage {
    async fn login(&self) -> Result<()> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        match &self.login_error {
            Some(message) => Err(Error::StorageInit(message.clone())),
            None => Ok(()),
        }
    }

    fn upload(&self, file: &Path, remote_name: &str) -> TransferHandle {
        let (handle, reporter) = channel();
        let script = self.scripts.get(remote_name).cloned().unwrap_or_default();
        let file = file.to_path_buf();
        let remote_name = remote_name.to_string();
        let uploaded = self.uploaded.clone();
        let aborted = self.aborted.clone();
        let started = self.started.clone();

        tokio::spawn(async move {
            let outcome = match tokio::fs::metadata(&file).await {
                Err(e) => Err(TransferError::Io(e)),
                Ok(_) => match script {
                    Script::Succeed(steps) => {
                        publish(&reporter, &steps);
                        uploaded.lock().unwrap().push(remote_name);
                        Ok(())
                    }
                    Script::Fail(message) => Err(TransferError::Failed(message)),
                    Script::Hang => {
                        started.notify_one();
                        reporter.aborted().await;
                        aborted.lock().unwrap().push(remote_name);
                        Err(TransferError::Aborted)
                    }
                },
            };
            reporter.complete(outcome);
        });

        handle
    }

    fn name(&self) -> &'static str {
        "fake-storage"
    }
}

fn publish(reporter: &TransferReporter, steps: &[f64]) {
    for percent in steps {
        reporter.progress(TransferProgress::from_percent(*percent));
    }
}

/// Files a yt-dlp download into `output` leaves while it runs
pub(crate) fn partial_paths(output: &Path) -> Vec<PathBuf> {
    let with_suffix = |suffix: &str| {
        let mut path = output.as_os_str().to_owned();
        path.push(suffix);
        PathBuf::from(path)
    };
    vec![
        with_suffix(".part"),
        with_suffix(".ytdl"),
        output.with_extension("f137.mp4.part"),
    ]
}

async fn write_partial(output: &Path) {
    for partial in partial_paths(output) {
        tokio::fs::write(partial, b"partial").await.unwrap();
    }
}

/// Relay over fake stages in a fresh temp dir
///
/// Returns the relay and the tempdir (which must be kept alive).
pub(crate) async fn create_test_relay(
    fetcher: FakeFetcher,
    storage: FakeStorage,
) -> (Relay, TempDir) {
    create_test_relay_with(fetcher, storage, |_| {}).await
}

/// Like [`create_test_relay`], with a hook to adjust the config first
pub(crate) async fn create_test_relay_with(
    fetcher: FakeFetcher,
    storage: FakeStorage,
    configure: impl FnOnce(&mut Config),
) -> (Relay, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.download.logs_dir = temp_dir.path().join("logs");
    configure(&mut config);

    let relay = Relay::with_stages(config, Arc::new(fetcher), Arc::new(storage))
        .await
        .unwrap();
    (relay, temp_dir)
}

/// Local path of an episode's artifact for a relay
pub(crate) fn artifact_path(relay: &Relay, episode: i64) -> PathBuf {
    let config = relay.get_config();
    config
        .download
        .naming
        .local_path(&config.download.download_dir, episode.into())
}

/// Remote name an episode is uploaded under
pub(crate) fn remote_name(relay: &Relay, episode: i64) -> String {
    relay.get_config().download.naming.file_name(episode.into())
}

/// Wait until `path` no longer exists (background deletion), panicking after 5s
pub(crate) async fn wait_until_removed(path: &Path) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while path.exists() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "{} was not removed",
            path.display()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// URLs `https://example.com/ep/1` .. `n`
pub(crate) fn urls(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("https://example.com/ep/{i}")).collect()
}
