//! episode-relay server
//!
//! Run with: STORAGE_EMAIL=xxx STORAGE_PASSWORD=xxx episode-relay
//! (variables may also come from a `.env` file)

use episode_relay::{Config, Relay, api};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("episode_relay=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        download_dir = %config.download.download_dir.display(),
        logs_dir = %config.download.logs_dir.display(),
        storage = %config.storage.endpoint,
        "Loaded configuration"
    );

    let relay = Arc::new(Relay::new(config).await?);

    api::start_api_server(relay).await?;
    Ok(())
}
