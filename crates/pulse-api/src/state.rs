//! Application state shared across all handlers.

use std::sync::Arc;

use pulse_auth::TokenVerifier;
use pulse_core::config::AppConfig;
use pulse_realtime::RealtimeHub;

/// Shared dependencies, passed to every handler via `State<AppState>`.
///
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The realtime hub.
    pub hub: Arc<RealtimeHub>,
    /// JWT verifier for connection identity.
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    /// Assemble the state from its parts.
    pub fn new(config: Arc<AppConfig>, hub: Arc<RealtimeHub>) -> Self {
        let verifier = Arc::new(TokenVerifier::new(&config.auth));
        Self {
            config,
            hub,
            verifier,
        }
    }
}
