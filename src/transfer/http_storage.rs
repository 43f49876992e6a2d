//! Upload stage backed by an HTTP storage account

use super::handle::{self, TransferProgress, TransferReporter};
use super::traits::StorageClient;
use super::TransferHandle;
use crate::config::StorageConfig;
use crate::error::{Error, Result, TransferError};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio_util::io::ReaderStream;

/// Timeout for establishing connections to the storage service
const CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

/// Storage account reached over HTTP
///
/// `login` exchanges the account credentials for a bearer token; uploads
/// stream the local file as the request body and report byte progress per
/// chunk.
pub struct HttpStorageClient {
    client: reqwest::Client,
    endpoint: String,
    email: Option<String>,
    password: Option<String>,
    token: RwLock<Option<String>>,
}

impl HttpStorageClient {
    /// Create a client for the configured storage account
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &StorageConfig) -> Result<Self> {
        // Uploads of whole episodes can take a long time; only connecting is bounded.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(concat!("episode-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            email: config.email.clone(),
            password: config.password.clone(),
            token: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path)
    }

    fn file_url(&self, remote_name: &str) -> String {
        self.url(&format!("files/{}", urlencoding::encode(remote_name)))
    }
}

#[async_trait]
impl StorageClient for HttpStorageClient {
    async fn login(&self) -> Result<()> {
        let (Some(email), Some(password)) = (self.email.as_deref(), self.password.as_deref())
        else {
            return Err(Error::StorageInit(
                "STORAGE_EMAIL and STORAGE_PASSWORD must be set".to_string(),
            ));
        };

        let response = self
            .client
            .post(self.url("login"))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|e| Error::StorageInit(format!("login request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::StorageInit(format!(
                "storage login rejected with {}",
                status
            )));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| Error::StorageInit(format!("invalid login response: {}", e)))?;

        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(body.token);
        tracing::info!(endpoint = %self.endpoint, email, "logged into storage account");
        Ok(())
    }

    fn upload(&self, file: &Path, remote_name: &str) -> TransferHandle {
        let (handle, reporter) = handle::channel();
        let request = UploadRequest {
            client: self.client.clone(),
            url: self.file_url(remote_name),
            token: self
                .token
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            file: file.to_path_buf(),
        };

        tokio::spawn(async move {
            let outcome = request.run(&reporter).await;
            reporter.complete(outcome);
        });

        handle
    }

    fn name(&self) -> &'static str {
        "http-storage"
    }
}

struct UploadRequest {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    file: PathBuf,
}

impl UploadRequest {
    async fn run(self, reporter: &TransferReporter) -> std::result::Result<(), TransferError> {
        let token = self
            .token
            .ok_or_else(|| TransferError::Failed("storage account is not logged in".to_string()))?;

        let file = tokio::fs::File::open(&self.file).await?;
        let total = file.metadata().await?.len();
        let publisher = reporter.publisher();
        let mut sent = 0u64;
        let stream = ReaderStream::new(file).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                sent += bytes.len() as u64;
                publisher.publish(TransferProgress::from_bytes(sent, total));
            }
            chunk
        });
        let body = reqwest::Body::wrap_stream(stream);

        tracing::debug!(url = %self.url, bytes = total, "starting upload");

        let send = self
            .client
            .put(&self.url)
            .bearer_auth(token)
            .header(CONTENT_LENGTH, total)
            .body(body)
            .send();

        let response = tokio::select! {
            biased;
            _ = reporter.aborted() => return Err(TransferError::Aborted),
            response = send => response
                .map_err(|e| TransferError::Failed(format!("upload request failed: {}", e)))?,
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TransferError::Failed(format!(
                "storage rejected upload with {}: {}",
                status,
                text.trim()
            )));
        }
        Ok(())
    }
}
