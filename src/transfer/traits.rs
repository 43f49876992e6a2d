//! Traits for the two external transfer stages

use super::handle::TransferHandle;
use async_trait::async_trait;
use std::path::Path;

/// Download stage: fetches a source URL into a local file
///
/// Implementations spawn the transfer and return immediately; the returned
/// handle carries progress, the single outcome, and the abort trigger.
///
/// # Examples
///
/// ```no_run
/// use episode_relay::transfer::{MediaFetcher, YtDlpFetcher};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = YtDlpFetcher::from_path().expect("yt-dlp not found in PATH");
/// let handle = fetcher.start("https://example.com/watch?v=1", Path::new("ep01.mp4"));
/// handle.finish(|p| println!("{:.2}%", p.percent)).await?;
/// # Ok(())
/// # }
/// ```
pub trait MediaFetcher: Send + Sync {
    /// Begin downloading `url` into `output`
    fn start(&self, url: &str, output: &Path) -> TransferHandle;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Upload stage: the storage account episodes are relayed to
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Log into the storage account
    ///
    /// Called once per service lifetime before the first batch is processed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageInit`](crate::Error::StorageInit) if the
    /// account cannot be logged into.
    async fn login(&self) -> crate::Result<()>;

    /// Begin streaming `file` to the account under `remote_name`
    fn upload(&self, file: &Path, remote_name: &str) -> TransferHandle;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
