//! Outbound calls to the management API.
//!
//! Every outbound request names the *backend* it must travel through. A
//! backend is a named, pre-configured destination (connection pool, connect
//! timeout, TLS settings) registered at start up; requests for a backend
//! that was never registered are refused instead of falling back to an
//! ad-hoc connection.
//!
//! The [`UpstreamClient`] trait is the seam between the orchestration logic
//! and the network, so tests can substitute a recording fake.

mod http;

pub use self::http::HttpUpstreamClient;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use reqwest::Url;
use thiserror::Error;

/// Network-level failure while talking to a backend.
///
/// An HTTP error *status* is not an `UpstreamError`: any response that
/// arrives is returned as an [`UpstreamResponse`] for the caller to judge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("backend '{0}' is not registered")]
    UnknownBackend(String),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl UpstreamError {
    /// Whether this failure was a timeout rather than a hard error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Timeout)
    }
}

/// A single outbound request.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Name of the backend binding the request must use.
    pub backend: String,
}

impl UpstreamRequest {
    /// Create a bodiless request.
    pub fn new(method: Method, url: Url, backend: impl Into<String>) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            backend: backend.into(),
        }
    }
}

/// The raw response of an outbound request, status uninterpreted.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Issues exactly one HTTP request through a named backend.
///
/// Implementations must not retry, must not rewrite the payload and must
/// return whatever response arrives regardless of its status code.
#[async_trait]
pub trait UpstreamClient: Send + Sync + std::fmt::Debug {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError>;
}
