use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, Method};
use reqwest::Url;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{AggregatedResult, CallResult, DeploymentRequest};
use crate::upstream::{UpstreamClient, UpstreamError, UpstreamRequest, UpstreamResponse};
use crate::validation::validate_deployment_request;

/// Management API user header.
pub const API_USER_HEADER: &str = "x-api-user";

/// Management API token header.
pub const API_TOKEN_HEADER: &str = "x-api-token";

/// Delivery platform key header sent with the service binding call.
pub const PLATFORM_KEY_HEADER: &str = "fastly-key";

/// Enables edge deployment for a site through the management API.
///
/// Two calls are made for each deployment:
///
/// 1. `PUT {base}/corps/{corp}/sites/{site}/edgeDeployment` enables edge
///    deployment for the site
/// 2. `PUT {base}/corps/{corp}/sites/{site}/edgeDeployment/{sid}` binds a
///    delivery service to it, authorised by the service's platform key
///
/// Neither call depends on the other's response, so both are issued
/// concurrently and joined before their results are aggregated. Each call
/// is bounded by the configured timeout. Upstream status codes are not
/// interpreted; the bodies are passed back as they arrive.
#[derive(Clone, Debug)]
pub struct DeploymentOrchestrator {
    upstream: Arc<dyn UpstreamClient>,
    api_base: Url,
    backend: String,
    call_timeout: Duration,
}

impl DeploymentOrchestrator {
    /// Create an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if `api_base` is not an absolute
    /// http(s) URL.
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        api_base: &str,
        backend: impl Into<String>,
        call_timeout: Duration,
    ) -> AppResult<Self> {
        let api_base = Url::parse(api_base)
            .map_err(|e| AppError::ConfigError(format!("invalid API base URL: {e}")))?;
        if api_base.cannot_be_a_base() {
            return Err(AppError::ConfigError(format!(
                "API base URL '{api_base}' cannot carry a path"
            )));
        }

        Ok(Self {
            upstream,
            api_base,
            backend: backend.into(),
            call_timeout,
        })
    }

    /// Create an orchestrator from application configuration.
    pub fn from_config(config: &Config, upstream: Arc<dyn UpstreamClient>) -> AppResult<Self> {
        Self::new(
            upstream,
            &config.api_base_url,
            config.upstream_backend.clone(),
            config.upstream_timeout,
        )
    }

    /// Parse, validate and execute a deployment request body.
    ///
    /// A body that does not carry all six fields fails before any upstream
    /// request is built.
    pub async fn run(&self, body: &[u8]) -> AppResult<AggregatedResult> {
        let request: DeploymentRequest = serde_json::from_slice(body).inspect_err(|_| {
            metrics::record_deployment("malformed");
        })?;
        validate_deployment_request(&request).inspect_err(|_| {
            metrics::record_deployment("malformed");
        })?;

        self.deploy(&request).await
    }

    /// Execute both calls for an already validated request.
    #[instrument(
        skip(self, request),
        fields(corp = %request.corp_name, site = %request.site_name, service = %request.fastly_sid)
    )]
    pub async fn deploy(&self, request: &DeploymentRequest) -> AppResult<AggregatedResult> {
        let enable = self.enable_request(request)?;
        let bind_service = self.bind_service_request(request)?;

        let (result_a, result_b) = tokio::join!(
            self.execute("enable", enable),
            self.execute("bind_service", bind_service),
        );

        let result = AggregatedResult { result_a, result_b };

        if result.is_complete() {
            info!(
                status_a = ?result.result_a.status().map(|s| s.as_u16()),
                status_b = ?result.result_b.status().map(|s| s.as_u16()),
                "Edge deployment calls completed"
            );
            metrics::record_deployment("completed");
            Ok(result)
        } else {
            warn!(failures = %result.failure_summary(), "Edge deployment incomplete");
            metrics::record_deployment("unreachable");
            Err(AppError::UpstreamUnreachable(Box::new(result)))
        }
    }

    /// Build the call that enables edge deployment for the site.
    pub fn enable_request(&self, request: &DeploymentRequest) -> AppResult<UpstreamRequest> {
        let url = self.deployment_url(request, None)?;
        let mut upstream = UpstreamRequest::new(Method::PUT, url, self.backend.clone());
        upstream.headers = api_headers(request)?;
        Ok(upstream)
    }

    /// Build the call that binds the delivery service to the deployment.
    pub fn bind_service_request(&self, request: &DeploymentRequest) -> AppResult<UpstreamRequest> {
        let url = self.deployment_url(request, Some(&request.fastly_sid))?;
        let mut upstream = UpstreamRequest::new(Method::PUT, url, self.backend.clone());
        upstream.headers = api_headers(request)?;
        upstream.headers.insert(
            PLATFORM_KEY_HEADER,
            header_value(&request.fastly_key, "fastlyKey", true)?,
        );
        Ok(upstream)
    }

    /// `{base}/corps/{corp}/sites/{site}/edgeDeployment[/{service}]`, each
    /// parameter percent-encoded as a single path segment.
    fn deployment_url(&self, request: &DeploymentRequest, service: Option<&str>) -> AppResult<Url> {
        let mut url = self.api_base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                AppError::ConfigError("API base URL cannot carry a path".to_string())
            })?;
            segments.pop_if_empty().extend([
                "corps",
                request.corp_name.as_str(),
                "sites",
                request.site_name.as_str(),
                "edgeDeployment",
            ]);
            if let Some(service) = service {
                segments.push(service);
            }
        }
        Ok(url)
    }

    /// Send one call under the per-call timeout and classify the outcome.
    async fn execute(&self, call: &'static str, request: UpstreamRequest) -> CallResult {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.call_timeout, self.upstream.send(request))
            .await
            .unwrap_or(Err(UpstreamError::Timeout));
        let elapsed = started.elapsed().as_secs_f64();

        match outcome {
            Ok(response) => {
                metrics::record_upstream_request(
                    call,
                    response.status.as_u16().to_string(),
                    elapsed,
                );
                parse_response(call, response)
            }
            Err(e) => {
                warn!(call, error = %e, elapsed_secs = elapsed, "Upstream call failed");
                let kind = if e.is_timeout() { "timeout" } else { "error" };
                metrics::record_upstream_request(call, kind.to_string(), elapsed);
                CallResult::Unreachable(e)
            }
        }
    }
}

/// Headers shared by both calls.
fn api_headers(request: &DeploymentRequest) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(API_USER_HEADER, header_value(&request.email, "email", false)?);
    headers.insert(API_TOKEN_HEADER, header_value(&request.token, "token", true)?);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

fn header_value(value: &str, field: &str, sensitive: bool) -> AppResult<HeaderValue> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|_| AppError::BadRequest(format!("{field} is not a valid header value")))?;
    header.set_sensitive(sensitive);
    Ok(header)
}

/// Parse a response body as JSON.
///
/// An empty body (e.g. `204 No Content`) becomes `null`.
fn parse_response(call: &'static str, response: UpstreamResponse) -> CallResult {
    let status = response.status;
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return CallResult::Response {
            status,
            body: Value::Null,
        };
    }

    match serde_json::from_slice::<Value>(&response.body) {
        Ok(body) => CallResult::Response { status, body },
        Err(e) => {
            warn!(call, status = status.as_u16(), error = %e, "Upstream returned a non-JSON body");
            CallResult::Invalid {
                status,
                text: String::from_utf8_lossy(&response.body).into_owned(),
            }
        }
    }
}
