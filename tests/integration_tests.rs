//! End-to-end tests of the gateway over real sockets.
//!
//! Each fixture starts a stub management API and the gateway itself on
//! ephemeral ports, wired through the reqwest-backed upstream client. No
//! external services are needed.
//!
//! Run with: `cargo test --test integration_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::put;
use reqwest::Client;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use common::{basic, deployment_body};
use edge_deployment_gateway::{
    AppState, Config, DeploymentOrchestrator, HttpUpstreamClient, MemoryCredentialStore,
    build_router,
};

/// How the stub answers the service binding call.
#[derive(Debug, Clone, Copy)]
enum BindBehaviour {
    Json,
    PlainText,
    Slow(Duration),
}

/// A request as seen by the stub management API.
#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    headers: HeaderMap,
}

#[derive(Debug)]
struct StubApi {
    requests: Mutex<Vec<Recorded>>,
    bind: BindBehaviour,
}

impl StubApi {
    fn record(&self, method: Method, path: String, headers: HeaderMap) {
        self.requests.lock().unwrap().push(Recorded {
            method,
            path,
            headers,
        });
    }
}

async fn enable(
    State(stub): State<Arc<StubApi>>,
    method: Method,
    Path((corp, site)): Path<(String, String)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    stub.record(
        method,
        format!("/api/v0/corps/{corp}/sites/{site}/edgeDeployment"),
        headers,
    );
    (StatusCode::OK, axum::Json(json!({"enabled": true, "site": site})))
}

async fn bind_service(
    State(stub): State<Arc<StubApi>>,
    method: Method,
    Path((corp, site, service)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> axum::response::Response {
    stub.record(
        method,
        format!("/api/v0/corps/{corp}/sites/{site}/edgeDeployment/{service}"),
        headers,
    );
    match stub.bind {
        BindBehaviour::Json => {
            (StatusCode::OK, axum::Json(json!({"service": service}))).into_response()
        }
        BindBehaviour::PlainText => (StatusCode::BAD_GATEWAY, "upstream exploded").into_response(),
        BindBehaviour::Slow(delay) => {
            tokio::time::sleep(delay).await;
            (StatusCode::OK, axum::Json(json!({"service": service}))).into_response()
        }
    }
}

/// Bind a listener on an ephemeral port and serve `app` in the background.
async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to ephemeral port");
    let addr = listener.local_addr().expect("Failed to get local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });
    format!("http://{addr}")
}

/// Test fixture that runs the stub API and the gateway.
struct TestFixture {
    base_url: String,
    client: Client,
    stub: Arc<StubApi>,
}

impl TestFixture {
    async fn new(bind: BindBehaviour) -> Self {
        let stub = Arc::new(StubApi {
            requests: Mutex::new(Vec::new()),
            bind,
        });
        let stub_app = Router::new()
            .route("/api/v0/corps/{corp}/sites/{site}/edgeDeployment", put(enable))
            .route(
                "/api/v0/corps/{corp}/sites/{site}/edgeDeployment/{service}",
                put(bind_service),
            )
            .with_state(stub.clone());
        let stub_url = serve(stub_app).await;

        Self::with_api_base(&format!("{stub_url}/api/v0"), stub).await
    }

    /// Gateway pointed at an API base nothing listens on.
    async fn unreachable() -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let stub = Arc::new(StubApi {
            requests: Mutex::new(Vec::new()),
            bind: BindBehaviour::Json,
        });
        Self::with_api_base(&format!("http://127.0.0.1:{port}/api/v0"), stub).await
    }

    async fn with_api_base(api_base: &str, stub: Arc<StubApi>) -> Self {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            api_base_url: api_base.to_string(),
            upstream_backend: "ngwaf_api_origin".to_string(),
            upstream_timeout: Duration::from_secs(1),
            upstream_connect_timeout: Duration::from_secs(1),
            metrics_port: 0,
            log_level: "warn".to_string(),
            ..Config::default()
        };

        let upstream = HttpUpstreamClient::new()
            .with_backend(config.upstream_backend.clone(), config.upstream_connect_timeout)
            .expect("Failed to register backend");
        let orchestrator = DeploymentOrchestrator::from_config(&config, Arc::new(upstream))
            .expect("Failed to build orchestrator");
        let credentials = MemoryCredentialStore::new().with_user("alice", "secret");

        let state = AppState::new(config, orchestrator, Arc::new(credentials));
        let app = build_router(state).expect("Failed to build router");
        let base_url = serve(app).await;

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            client,
            stub,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn deploy(&self) -> reqwest::Response {
        self.client
            .post(self.url("/edgeDeployment"))
            .header("authorization", basic("alice", "secret"))
            .json(&deployment_body())
            .send()
            .await
            .expect("Request failed")
    }

    fn recorded(&self) -> Vec<Recorded> {
        let mut requests = self.stub.requests.lock().unwrap().clone();
        requests.sort_by_key(|r| r.path.len());
        requests
    }
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_unauthenticated_request_gets_challenge() {
    let fixture = TestFixture::new(BindBehaviour::Json).await;

    let response = fixture
        .client
        .post(fixture.url("/edgeDeployment"))
        .json(&deployment_body())
        .send()
        .await
        .expect("Request failed");

    assert_eq!(response.status().as_u16(), 401);
    assert_eq!(
        response.headers()["www-authenticate"],
        r#"Basic realm="Login""#
    );
    assert!(fixture.recorded().is_empty());
}

#[tokio::test]
async fn test_health_with_credentials() {
    let fixture = TestFixture::new(BindBehaviour::Json).await;

    let response = fixture
        .client
        .get(fixture.url("/health"))
        .basic_auth("alice", Some("secret"))
        .send()
        .await
        .expect("Request failed");

    assert!(response.status().is_success());
    assert_eq!(response.headers()["x-powered-by"], "edge-deployment-gateway");

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

// ============================================================================
// Edge Deployment
// ============================================================================

#[tokio::test]
async fn test_deployment_end_to_end() {
    let fixture = TestFixture::new(BindBehaviour::Json).await;

    let response = fixture.deploy().await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.headers()["x-upstream-status-a"], "200");
    assert_eq!(response.headers()["x-upstream-status-b"], "200");

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(
        body,
        json!({
            "resultA": {"enabled": true, "site": "www"},
            "resultB": {"service": "SID123"},
        })
    );

    let recorded = fixture.recorded();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].method, Method::PUT);
    assert_eq!(recorded[0].path, "/api/v0/corps/acme/sites/www/edgeDeployment");
    assert_eq!(recorded[1].method, Method::PUT);
    assert_eq!(
        recorded[1].path,
        "/api/v0/corps/acme/sites/www/edgeDeployment/SID123"
    );

    for request in &recorded {
        assert_eq!(request.headers["x-api-user"], "ops@example.com");
        assert_eq!(request.headers["x-api-token"], "sigsci-token");
        assert_eq!(request.headers["content-type"], "application/json");
        assert!(!request.headers.contains_key("authorization"));
        assert!(!request.headers.contains_key("x-authorized-user"));
    }
    assert!(!recorded[0].headers.contains_key("fastly-key"));
    assert_eq!(recorded[1].headers["fastly-key"], "platform-key");
}

#[tokio::test]
async fn test_non_json_upstream_body_is_reported_inline() {
    let fixture = TestFixture::new(BindBehaviour::PlainText).await;

    let response = fixture.deploy().await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.headers()["x-upstream-status-b"], "502");

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["resultA"]["enabled"], true);
    assert_eq!(
        body["resultB"],
        json!({
            "error": "upstream_response_invalid",
            "status": 502,
            "body": "upstream exploded",
        })
    );
}

#[tokio::test]
async fn test_slow_upstream_call_times_out() {
    let fixture = TestFixture::new(BindBehaviour::Slow(Duration::from_secs(3))).await;

    let response = fixture.deploy().await;
    assert_eq!(response.status().as_u16(), 504);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "upstream_unreachable");
    assert_eq!(body["resultA"]["enabled"], true);
    assert_eq!(body["resultB"]["error"], "upstream_timeout");
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let fixture = TestFixture::unreachable().await;

    let response = fixture.deploy().await;
    assert_eq!(response.status().as_u16(), 502);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "upstream_unreachable");
    assert_eq!(body["resultA"]["error"], "upstream_unreachable");
    assert_eq!(body["resultB"]["error"], "upstream_unreachable");
}
