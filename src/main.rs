use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use edge_deployment_gateway::config::LogFormat;
use edge_deployment_gateway::environment::{self, ProcessEnvironment};
use edge_deployment_gateway::{
    AppState, Config, DeploymentOrchestrator, HttpUpstreamClient, MemoryCredentialStore,
    build_router, metrics, utils,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info", LogFormat::Text);
            error!("Configuration error: {e}");
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };

    init_tracing(&config.log_level, config.log_format);

    info!(
        "Starting Edge Deployment Gateway v{}",
        env!("CARGO_PKG_VERSION")
    );

    match run(config).await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Run the application, returning an exit code on error.
async fn run(config: Config) -> Result<(), exitcode::ExitCode> {
    info!(
        host = %config.host,
        port = %config.port,
        api_base = %config.api_base_url,
        backend = %config.upstream_backend,
        timeout_secs = config.upstream_timeout.as_secs(),
        undecodable_policy = ?config.undecodable_policy,
        "Configuration loaded"
    );
    environment::log_metadata(&ProcessEnvironment);

    // Credential store
    let credentials = MemoryCredentialStore::from_config(&config).map_err(|e| {
        error!("Failed to load credentials: {e}");
        exitcode::CONFIG
    })?;
    if credentials.is_empty() {
        warn!("No credentials configured, every request will be answered 401");
    } else {
        info!(entries = credentials.len(), "Credential store loaded");
    }

    // Metrics
    if let Some(metrics_addr) = config.metrics_addr() {
        metrics::try_init_metrics(metrics_addr);
    } else {
        info!("Metrics disabled (METRICS_PORT=0)");
    }

    // Upstream backend and orchestrator
    let upstream = HttpUpstreamClient::new()
        .with_backend(config.upstream_backend.clone(), config.upstream_connect_timeout)
        .map_err(|e| {
            error!("Failed to register upstream backend: {e}");
            exitcode::SOFTWARE
        })?;
    let orchestrator = DeploymentOrchestrator::from_config(&config, Arc::new(upstream))
        .map_err(|e| {
            error!("Failed to build deployment orchestrator: {e}");
            exitcode::CONFIG
        })?;

    // Build application state and router
    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let state = AppState::new(config, orchestrator, Arc::new(credentials));
    let app = build_router(state).map_err(|e| {
        error!("Failed to build router: {e}");
        exitcode::CONFIG
    })?;

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET  /                - Deployment form");
    info!("  POST /submit          - Echo request body");
    info!("  POST /edgeDeployment  - Enable edge deployment");
    info!("  GET  /health          - Health check");

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(utils::shutdown_signal())
        .await
        .map_err(|e| {
            error!("Server error: {e}");
            exitcode::SOFTWARE
        })?;

    info!("Server shutdown complete");
    Ok(())
}
