//! reqwest-backed [`UpstreamClient`] with a registry of named backends.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use tracing::{debug, warn};

use super::{UpstreamClient, UpstreamError, UpstreamRequest, UpstreamResponse};

/// User agent sent on every outbound request.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// HTTP client that routes each request through its named backend.
///
/// Each backend owns a separate connection pool so that settings such as
/// the connect timeout are scoped to one destination.
#[derive(Debug, Clone, Default)]
pub struct HttpUpstreamClient {
    backends: HashMap<String, reqwest::Client>,
}

impl HttpUpstreamClient {
    /// Create a client with no backends registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under `name`.
    ///
    /// Redirects are never followed: the caller receives the redirect
    /// response itself.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError::Transport` if the TLS stack cannot be
    /// initialised.
    pub fn with_backend(
        mut self,
        name: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let name = name.into();
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .redirect(Policy::none())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                UpstreamError::Transport(format!("failed to build backend '{name}': {e}"))
            })?;

        debug!(backend = %name, ?connect_timeout, "Registered upstream backend");
        self.backends.insert(name, client);
        Ok(self)
    }

    /// Check whether a backend with this name is registered.
    pub fn has_backend(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let client = self
            .backends
            .get(&request.backend)
            .ok_or_else(|| UpstreamError::UnknownBackend(request.backend.clone()))?;

        debug!(
            backend = %request.backend,
            method = %request.method,
            url = %request.url,
            "Sending upstream request"
        );

        let response = client
            .request(request.method, request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(classify_error)?;

        debug!(
            backend = %request.backend,
            status = status.as_u16(),
            body_len = body.len(),
            "Upstream response received"
        );

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

/// Map a reqwest failure onto the network error taxonomy.
fn classify_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout
    } else if e.is_connect() {
        warn!(error = %e, "Upstream connection failed");
        UpstreamError::Connect(e.to_string())
    } else {
        warn!(error = %e, "Upstream transport error");
        UpstreamError::Transport(e.to_string())
    }
}
