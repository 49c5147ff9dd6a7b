//! Prometheus metrics for application observability.
//!
//! Metrics are exposed via a dedicated HTTP listener (default port 9090).
//!
//! # Available Metrics
//!
//! ## Counters
//! - `edge_gateway_auth_total` - Credential gate decisions (label: outcome)
//! - `edge_gateway_upstream_requests_total` - Upstream calls (labels: call, status)
//! - `edge_gateway_deployments_total` - Deployment requests (label: outcome)
//!
//! ## Histograms
//! - `edge_gateway_upstream_duration_seconds` - Upstream call duration (label: call)

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const AUTH_TOTAL: &str = "edge_gateway_auth_total";
    pub const UPSTREAM_REQUESTS_TOTAL: &str = "edge_gateway_upstream_requests_total";
    pub const UPSTREAM_DURATION_SECONDS: &str = "edge_gateway_upstream_duration_seconds";
    pub const DEPLOYMENTS_TOTAL: &str = "edge_gateway_deployments_total";
}

/// Initialize the Prometheus metrics exporter.
///
/// This sets up metric descriptions and starts the Prometheus HTTP listener
/// on the specified address.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::AUTH_TOTAL,
        "Credential gate decisions by outcome"
    );
    describe_counter!(
        names::UPSTREAM_REQUESTS_TOTAL,
        "Management API calls by call and response status"
    );
    describe_counter!(
        names::DEPLOYMENTS_TOTAL,
        "Edge deployment requests by outcome"
    );
    describe_histogram!(
        names::UPSTREAM_DURATION_SECONDS,
        "Management API call duration in seconds"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

/// Record a credential gate decision.
pub fn record_auth(outcome: &'static str) {
    counter!(names::AUTH_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a finished upstream call.
///
/// `status` is the HTTP status code, or a failure kind such as `timeout`.
pub fn record_upstream_request(call: &'static str, status: String, duration_secs: f64) {
    counter!(names::UPSTREAM_REQUESTS_TOTAL, "call" => call, "status" => status).increment(1);
    histogram!(names::UPSTREAM_DURATION_SECONDS, "call" => call).record(duration_secs);
}

/// Record a deployment request outcome.
pub fn record_deployment(outcome: &'static str) {
    counter!(names::DEPLOYMENTS_TOTAL, "outcome" => outcome).increment(1);
}
