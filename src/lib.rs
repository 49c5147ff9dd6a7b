//! # Edge Deployment Gateway
//!
//! A small HTTP gateway that enables NGWAF edge deployment for a site. Every
//! route sits behind HTTP Basic authentication; an authenticated
//! `POST /edgeDeployment` is turned into two `PUT` calls against the
//! management API and both results are returned together.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Powered-By → Request ID → Trace → Basic Auth)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (form page, submit echo, edgeDeployment, health)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  DeploymentOrchestrator (validation, concurrent calls)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  UpstreamClient (named backends, reqwest)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Management API                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use edge_deployment_gateway::{
//!     AppState, Config, DeploymentOrchestrator, HttpUpstreamClient, MemoryCredentialStore,
//!     build_router,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let credentials = Arc::new(MemoryCredentialStore::from_config(&config)?);
//!     let upstream = HttpUpstreamClient::new()
//!         .with_backend(config.upstream_backend.clone(), config.upstream_connect_timeout)?;
//!     let orchestrator = DeploymentOrchestrator::from_config(&config, Arc::new(upstream))?;
//!
//!     let state = AppState::new(config, orchestrator, credentials);
//!     let app = build_router(state)?;
//!
//!     // Start the server...
//!     Ok(())
//! }
//! ```
//!
//! ## Credentials
//!
//! ```bash
//! AUTH_CREDENTIALS=alice:secret,bob:hunter2 cargo run
//! curl -u alice:secret http://localhost:3000/health
//! ```

pub mod config;
pub mod credentials;
pub mod environment;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod upstream;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use config::Config;
pub use credentials::{CredentialStore, MemoryCredentialStore};
pub use error::{AppError, AppResult};
pub use routes::build_router;
pub use services::DeploymentOrchestrator;
pub use state::AppState;
pub use upstream::{HttpUpstreamClient, UpstreamClient};
