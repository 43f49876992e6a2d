//! Transfer stages: downloading an episode and uploading it to storage
//!
//! Both stages share one contract. Starting a transfer spawns it and returns a
//! [`TransferHandle`] immediately; the handle exposes an [`AbortHandle`] and
//! resolves with exactly one outcome after delivering progress.
//!
//! ## Implementations
//!
//! - [`YtDlpFetcher`]: runs the `yt-dlp` binary, parses `--newline` progress
//! - [`HttpStorageClient`]: logs into an HTTP storage account and streams the
//!   file as a request body

mod handle;
mod http_storage;
mod parser;
mod traits;
mod ytdlp;

pub use handle::{
    AbortHandle, ProgressPublisher, TransferHandle, TransferProgress, TransferReporter, channel,
};
pub use http_storage::HttpStorageClient;
pub use parser::{parse_progress_line, parse_size};
pub use traits::{MediaFetcher, StorageClient};
pub use ytdlp::YtDlpFetcher;
