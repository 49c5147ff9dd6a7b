//! Edge deployment endpoint.
//!
//! # Request
//!
//! ```json
//! {
//!   "SIGSCI_EMAIL": "ops@example.com",
//!   "SIGSCI_TOKEN": "…",
//!   "corpName": "acme",
//!   "siteName": "www",
//!   "fastlySID": "7mTu4pSh0xBxUqcJ1Ai9kz",
//!   "fastlyKey": "…"
//! }
//! ```
//!
//! # Response
//!
//! `200` with both management API bodies, unmodified:
//!
//! ```json
//! { "resultA": { … }, "resultB": { … } }
//! ```
//!
//! The upstream status codes are reported in `x-upstream-status-a` and
//! `x-upstream-status-b`; a `200` here does not mean the management API
//! accepted the change.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::instrument;

use crate::error::AppResult;
use crate::middleware::AUTHORIZED_USER_HEADER;
use crate::models::CallResult;
use crate::state::AppState;

/// Status of the site-level enable call.
pub const UPSTREAM_STATUS_A_HEADER: &str = "x-upstream-status-a";

/// Status of the service binding call.
pub const UPSTREAM_STATUS_B_HEADER: &str = "x-upstream-status-b";

/// `POST /edgeDeployment`
///
/// The body is taken as raw bytes so that every parse failure maps to the
/// same 400 response.
#[instrument(
    skip(state, headers, body),
    fields(user = headers.get(AUTHORIZED_USER_HEADER).and_then(|v| v.to_str().ok()).unwrap_or("-"))
)]
pub async fn edge_deployment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<(HeaderMap, Json<Value>)> {
    let result = state.orchestrator.run(&body).await?;

    let mut response_headers = HeaderMap::new();
    insert_status(&mut response_headers, UPSTREAM_STATUS_A_HEADER, &result.result_a);
    insert_status(&mut response_headers, UPSTREAM_STATUS_B_HEADER, &result.result_b);

    Ok((response_headers, Json(result.to_json())))
}

fn insert_status(headers: &mut HeaderMap, name: &'static str, result: &CallResult) {
    if let Some(status) = result.status() {
        headers.insert(name, HeaderValue::from(status.as_u16()));
    }
}
