//! Shared fixtures for router and end-to-end tests.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};

use edge_deployment_gateway::config::UndecodableCredentialPolicy;
use edge_deployment_gateway::credentials::encode_basic_token;
use edge_deployment_gateway::upstream::{
    UpstreamClient, UpstreamError, UpstreamRequest, UpstreamResponse,
};
use edge_deployment_gateway::{
    AppState, Config, DeploymentOrchestrator, MemoryCredentialStore, build_router,
};

pub const API_BASE: &str = "https://api.example.test/api/v0";
pub const BACKEND: &str = "ngwaf_api_origin";

/// `Authorization` value for a user/password pair.
pub fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", encode_basic_token(username, password))
}

/// A deployment body carrying all six fields.
pub fn deployment_body() -> Value {
    json!({
        "SIGSCI_EMAIL": "ops@example.com",
        "SIGSCI_TOKEN": "sigsci-token",
        "corpName": "acme",
        "siteName": "www",
        "fastlySID": "SID123",
        "fastlyKey": "platform-key",
    })
}

/// How the fake answers one of the two calls.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(StatusCode, Value),
    Fail(UpstreamError),
}

/// Upstream fake that records every request it is asked to send.
#[derive(Debug)]
pub struct RecordingUpstream {
    requests: Mutex<Vec<UpstreamRequest>>,
    enable: Reply,
    bind_service: Reply,
}

impl RecordingUpstream {
    pub fn new() -> Self {
        Self::with_replies(
            Reply::Json(StatusCode::OK, json!({"call": "enable", "ok": true})),
            Reply::Json(StatusCode::OK, json!({"call": "bind_service", "ok": true})),
        )
    }

    pub fn with_replies(enable: Reply, bind_service: Reply) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            enable,
            bind_service,
        }
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamClient for RecordingUpstream {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let reply = if request.url.path().ends_with("/edgeDeployment") {
            self.enable.clone()
        } else {
            self.bind_service.clone()
        };
        self.requests.lock().unwrap().push(request);

        match reply {
            Reply::Json(status, body) => Ok(UpstreamResponse {
                status,
                headers: HeaderMap::new(),
                body: Bytes::from(serde_json::to_vec(&body).unwrap()),
            }),
            Reply::Fail(e) => Err(e),
        }
    }
}

/// Configuration used by the in-process router tests.
pub fn test_config() -> Config {
    Config {
        api_base_url: API_BASE.to_string(),
        upstream_backend: BACKEND.to_string(),
        upstream_timeout: Duration::from_secs(5),
        metrics_port: 0,
        log_level: "warn".to_string(),
        ..Config::default()
    }
}

/// Credentials known to every test router.
pub fn test_credentials() -> MemoryCredentialStore {
    MemoryCredentialStore::new()
        .with_user("alice", "secret")
        .with_user("bob", "pa:ss:word")
        // "not-a-credential": known, but has no colon
        .with_token("bm90LWEtY3JlZGVudGlhbA==", true)
}

/// Router wired to `upstream` with the standard test configuration.
pub fn router_with(upstream: Arc<RecordingUpstream>) -> Router {
    router_with_config(upstream, test_config())
}

pub fn router_with_config(upstream: Arc<RecordingUpstream>, config: Config) -> Router {
    let orchestrator = DeploymentOrchestrator::from_config(&config, upstream).unwrap();
    let state = AppState::new(config, orchestrator, Arc::new(test_credentials()));
    build_router(state).unwrap()
}

/// Router whose undecodable-credential policy is `allow`.
pub fn permissive_router(upstream: Arc<RecordingUpstream>) -> Router {
    let config = Config {
        undecodable_policy: UndecodableCredentialPolicy::Allow,
        ..test_config()
    };
    router_with_config(upstream, config)
}
