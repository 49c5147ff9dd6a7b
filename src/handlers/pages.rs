//! Form page, echo endpoint and the catch-all fallback.

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, Uri};
use axum::response::{Html, IntoResponse};
use tracing::{debug, instrument};

use crate::error::AppError;

/// Form that collects the six deployment fields and posts them as JSON to
/// `/edgeDeployment`.
pub const INDEX_HTML: &str = include_str!("../../static/index.html");

/// `GET /`
#[instrument]
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// `POST /submit`
///
/// Echoes the request body byte for byte. The request's content type is
/// reflected when present.
#[instrument(skip(headers, body), fields(body_len = body.len()))]
pub async fn submit(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let content_type = headers
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("text/plain; charset=utf-8"));

    debug!("Echoing submitted body");
    ([(CONTENT_TYPE, content_type)], body)
}

/// Any path without a route.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
