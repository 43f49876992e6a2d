//! Application state for the API server

use crate::Relay;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone). Configuration is read through
/// [`Relay::get_config`].
#[derive(Clone)]
pub struct AppState {
    /// The relay service that owns the job registry
    pub relay: Arc<Relay>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(relay: Arc<Relay>) -> Self {
        Self { relay }
    }
}
