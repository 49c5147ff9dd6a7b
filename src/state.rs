//! Shared application state for Axum handlers.
//!
//! Everything here is read-only once the server starts: the configuration,
//! the credential store and the orchestrator (which holds the upstream
//! client) are shared behind `Arc`s and never locked on the request path.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::services::DeploymentOrchestrator;

/// Shared application state for Axum handlers.
///
/// Cloned for each request handler; all internal data is behind `Arc`.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Executes edge deployment requests
    pub orchestrator: DeploymentOrchestrator,
    /// Credentials accepted by the gate
    pub credentials: Arc<dyn CredentialStore>,
    /// Timestamp when the application started
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: Config,
        orchestrator: DeploymentOrchestrator,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator,
            credentials,
            started_at: Instant::now(),
        }
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
