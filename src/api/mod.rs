//! REST API server module
//!
//! Exposes batch submission, cancellation and status over HTTP, plus a
//! health check, a server-sent events stream and the OpenAPI document.

use crate::{Relay, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Jobs
/// - `POST /download` - Process a batch of URLs (responds when the batch is done)
/// - `POST /cancel/:episodeNumber` - Cancel one active episode
/// - `POST /cancelall` - Cancel every active episode
/// - `GET /status` - Downloaded files, job logs and active episodes
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /events` - Server-sent events stream
/// - `GET /openapi.json` - OpenAPI specification
pub fn create_router(relay: Arc<Relay>) -> Router {
    let config = relay.get_config();
    let state = AppState::new(relay);

    let router = Router::new()
        // Jobs
        .route("/download", post(routes::start_downloads))
        .route("/cancel/:episodeNumber", post(routes::cancel_episode))
        .route("/cancelall", post(routes::cancel_all_episodes))
        .route("/status", get(routes::get_status))
        // System
        .route("/health", get(routes::health_check))
        .route("/events", get(routes::event_stream))
        .route("/openapi.json", get(routes::openapi_spec))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins ("*" allows any)
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the relay's configured bind address
///
/// Runs until SIGTERM/SIGINT (Ctrl+C elsewhere), then stops accepting
/// connections and lets in-flight requests finish.
///
/// # Example
///
/// ```no_run
/// use episode_relay::{Config, Relay};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let relay = Arc::new(Relay::new(Config::from_env()?).await?);
///
/// episode_relay::api::start_api_server(relay).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(relay: Arc<Relay>) -> Result<()> {
    let bind_address = relay.get_config().api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(relay);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
