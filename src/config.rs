//! Configuration types for episode-relay
//!
//! Every field has a serde default, so an empty document (or an empty
//! environment) yields a usable configuration. [`Config::from_env`] is what
//! the binary uses; [`Config::from_lookup`] takes any key lookup so tests do
//! not have to touch the process environment.

use crate::error::{Error, Result};
use crate::naming::EpisodeNaming;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf};

/// Port used when `PORT` is not set
pub const DEFAULT_PORT: u16 = 3000;

/// Download behavior configuration (directories, yt-dlp invocation, naming)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Per-job log directory (default: "./logs")
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,

    /// Output file naming template
    #[serde(default)]
    pub naming: EpisodeNaming,

    /// Path to the yt-dlp executable (searched on PATH if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Pass `--no-check-certificates` to yt-dlp (default: true)
    #[serde(default = "default_true")]
    pub no_check_certificates: bool,

    /// Extra arguments appended to every yt-dlp invocation
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            logs_dir: default_logs_dir(),
            naming: EpisodeNaming::default(),
            ytdlp_path: None,
            no_check_certificates: true,
            extra_args: Vec::new(),
        }
    }
}

/// Storage account the episodes are relayed to
#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the storage service
    #[serde(default = "default_storage_url")]
    pub endpoint: String,

    /// Account e-mail
    #[serde(default)]
    pub email: Option<String>,

    /// Account password
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_storage_url(),
            email: None,
            password: None,
        }
    }
}

// Keep credentials out of logs.
impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// REST API server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind the API server (default: 0.0.0.0:3000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins ("*" allows any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Main configuration for the relay service
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Storage account settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// API server settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Build a configuration from the process environment
    ///
    /// Recognised variables: `PORT`, `BIND_HOST`, `DOWNLOAD_DIR`, `LOGS_DIR`,
    /// `YTDLP_PATH`, `YTDLP_CHECK_CERTIFICATES`, `STORAGE_URL`,
    /// `STORAGE_EMAIL`, `STORAGE_PASSWORD`, `CORS_ORIGINS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| Error::Config {
                message: format!("invalid PORT '{}': {}", raw, e),
                key: Some("PORT".to_string()),
            })?,
            None => DEFAULT_PORT,
        };
        let host = get("BIND_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        config.api.bind_address = format!("{}:{}", host.trim(), port)
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config {
                message: format!("invalid BIND_HOST '{}': {}", host, e),
                key: Some("BIND_HOST".to_string()),
            })?;

        if let Some(dir) = get("DOWNLOAD_DIR") {
            config.download.download_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("LOGS_DIR") {
            config.download.logs_dir = PathBuf::from(dir);
        }
        config.download.ytdlp_path = get("YTDLP_PATH").map(PathBuf::from);
        if let Some(raw) = get("YTDLP_CHECK_CERTIFICATES") {
            let check = parse_bool(&raw).ok_or_else(|| Error::Config {
                message: format!("invalid YTDLP_CHECK_CERTIFICATES '{}'", raw),
                key: Some("YTDLP_CHECK_CERTIFICATES".to_string()),
            })?;
            config.download.no_check_certificates = !check;
        }

        if let Some(endpoint) = get("STORAGE_URL") {
            url::Url::parse(&endpoint).map_err(|e| Error::Config {
                message: format!("invalid STORAGE_URL '{}': {}", endpoint, e),
                key: Some("STORAGE_URL".to_string()),
            })?;
            config.storage.endpoint = endpoint;
        }
        config.storage.email = get("STORAGE_EMAIL");
        config.storage.password = get("STORAGE_PASSWORD");

        if let Some(origins) = get("CORS_ORIGINS") {
            config.api.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_storage_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
