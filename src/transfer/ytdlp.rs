//! Download stage backed by the external yt-dlp binary

use super::handle::{self, TransferReporter};
use super::parser::parse_progress_line;
use super::traits::MediaFetcher;
use super::TransferHandle;
use crate::config::DownloadConfig;
use crate::error::TransferError;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};

/// Number of trailing stderr lines kept for failure messages
const STDERR_TAIL_LINES: usize = 5;

/// Fetches episodes by running `yt-dlp` as a child process
///
/// Progress is read from `--newline` output; aborting kills the child.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    binary_path: PathBuf,
    no_check_certificates: bool,
    extra_args: Vec<String>,
}

impl YtDlpFetcher {
    /// Create a fetcher with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            no_check_certificates: true,
            extra_args: Vec::new(),
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Build a fetcher from download settings
    ///
    /// Uses `ytdlp_path` when set, otherwise searches PATH.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalTool`](crate::Error::ExternalTool) when no
    /// path is configured and yt-dlp is not on PATH.
    pub fn from_config(config: &DownloadConfig) -> crate::Result<Self> {
        let fetcher = match &config.ytdlp_path {
            Some(path) => Self::new(path.clone()),
            None => Self::from_path().ok_or_else(|| {
                crate::Error::ExternalTool(
                    "yt-dlp not found in PATH (set YTDLP_PATH to override)".to_string(),
                )
            })?,
        };
        Ok(fetcher
            .with_certificate_checks(!config.no_check_certificates)
            .with_extra_args(config.extra_args.clone()))
    }

    /// Toggle TLS certificate verification inside yt-dlp
    pub fn with_certificate_checks(mut self, check: bool) -> Self {
        self.no_check_certificates = !check;
        self
    }

    /// Arguments appended before the URL on every invocation
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Path of the binary this fetcher runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn build_args(&self, url: &str, output: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> =
            vec!["--newline".into(), "--progress".into(), "-o".into(), output.into()];
        if self.no_check_certificates {
            args.push("--no-check-certificates".into());
        }
        args.extend(self.extra_args.iter().map(Into::into));
        args.push(url.into());
        args
    }
}

impl MediaFetcher for YtDlpFetcher {
    fn start(&self, url: &str, output: &Path) -> TransferHandle {
        let (handle, reporter) = handle::channel();

        let mut command = Command::new(&self.binary_path);
        command
            .args(self.build_args(url, output))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            binary = %self.binary_path.display(),
            output = %output.display(),
            url,
            "spawning yt-dlp"
        );

        tokio::spawn(async move {
            let outcome = run_download(command, &reporter).await;
            reporter.complete(outcome);
        });

        handle
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

async fn run_download(
    mut command: Command,
    reporter: &TransferReporter,
) -> Result<(), TransferError> {
    let mut child = command
        .spawn()
        .map_err(|e| TransferError::Failed(format!("failed to execute yt-dlp: {}", e)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| TransferError::Failed("yt-dlp stdout was not captured".to_string()))?;
    let stderr_tail = child.stderr.take().map(|stderr| tokio::spawn(collect_tail(stderr)));

    let mut stdout = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        tokio::select! {
            biased;
            _ = reporter.aborted() => {
                return Err(kill_child(&mut child).await);
            }
            line = read_lossy_line(&mut stdout, &mut buf) => match line? {
                Some(line) => match parse_progress_line(&line) {
                    Some(progress) => reporter.progress(progress),
                    None => tracing::trace!(line = %line, "yt-dlp output"),
                },
                None => break,
            },
        }
    }

    let status = tokio::select! {
        biased;
        _ = reporter.aborted() => None,
        status = child.wait() => Some(status?),
    };
    let Some(status) = status else {
        return Err(kill_child(&mut child).await);
    };

    if status.success() {
        return Ok(());
    }

    let tail = match stderr_tail {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };
    Err(TransferError::Failed(format!(
        "yt-dlp exited with {}: {}",
        status,
        tail.trim()
    )))
}

async fn kill_child(child: &mut Child) -> TransferError {
    if let Err(e) = child.start_kill() {
        tracing::debug!(error = %e, "yt-dlp already exited before kill");
    }
    child.wait().await.ok();
    TransferError::Aborted
}

/// Read one line, replacing invalid UTF-8; `None` at end of stream
async fn read_lossy_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

async fn collect_tail(stderr: ChildStderr) -> String {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut stderr = BufReader::new(stderr);
    let mut buf = Vec::new();
    while let Ok(Some(line)) = read_lossy_line(&mut stderr, &mut buf).await {
        tracing::debug!(line = %line, "yt-dlp stderr");
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Vec::from(tail).join("\n")
}
