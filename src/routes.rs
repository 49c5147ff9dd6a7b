//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   X-Powered-By   │ ← Set on every response
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← Adds X-Request-Id header
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ Credential Gate  │ ← 401 unless the Basic credential is known
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │   Body Limit     │ ← 413 above MAX_REQUEST_BODY_SIZE
//! └────────┬─────────┘
//!          │
//!          ▼
//!   Handler / 404 / 405
//! ```
//!
//! The gate wraps the fallback too, so an unknown path answers 401 before
//! it answers 404.

use axum::Router;
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::routing::{get, post};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::handlers;
use crate::middleware::request_id::request_id;
use crate::middleware::{CredentialGate, RequestIdLayer};
use crate::state::AppState;

/// Header identifying the gateway on every response.
pub const POWERED_BY_HEADER: HeaderName = HeaderName::from_static("x-powered-by");

/// Build the application router with all routes and middleware configured.
///
/// # Errors
///
/// Returns `AppError::ConfigError` if `POWERED_BY` is not a valid header
/// value.
pub fn build_router(state: AppState) -> AppResult<Router> {
    let config = state.config.clone();

    let powered_by = HeaderValue::from_str(&config.powered_by)
        .map_err(|e| AppError::ConfigError(format!("POWERED_BY is not a valid header value: {e}")))?;

    let router = Router::new()
        .route("/", get(handlers::index))
        .route("/submit", post(handlers::submit))
        .route("/edgeDeployment", post(handlers::edge_deployment))
        .route("/health", get(handlers::health_check))
        .fallback(handlers::not_found);

    // =========================================================================
    // Apply Middleware Stack (order matters - applied bottom to top)
    // =========================================================================

    // 1. Request body size limit
    info!(
        max_size_bytes = config.max_request_body_size,
        "Request body size limit configured"
    );
    let router = router.layer(DefaultBodyLimit::max(config.max_request_body_size));

    // 2. Authentication (always on)
    if config.auth_bypass_paths.is_empty() {
        info!("Basic authentication enabled on every route");
    } else {
        info!(
            bypass_paths = ?config.auth_bypass_paths,
            "Basic authentication enabled with bypass paths"
        );
    }
    let gate = CredentialGate::new(state.credentials.clone(), config.undecodable_policy)
        .with_bypass_paths(config.auth_bypass_paths.clone());
    let router = router.layer(gate);

    // 3. Tracing, with the request ID in every span
    let router = router.layer(TraceLayer::new_for_http().make_span_with(
        |request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = %request_id(request),
            )
        },
    ));

    // 4. Request ID
    let router = router.layer(RequestIdLayer::new());

    // 5. X-Powered-By
    let router = router.layer(SetResponseHeaderLayer::overriding(POWERED_BY_HEADER, powered_by));

    Ok(router.with_state(state))
}
