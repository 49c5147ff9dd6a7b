//! HTTP Basic authentication gate.
//!
//! # Flow
//!
//! 1. Take the token after the literal `Basic ` prefix of the `Authorization`
//!    header (empty when the header is missing or uses another scheme)
//! 2. Look the raw token up in the [`CredentialStore`]; a store error counts
//!    as "not found"
//! 3. Unknown token: answer `401` with `WWW-Authenticate: Basic realm="Login"`,
//!    the wrapped service is never called
//! 4. Known token: decode it, take the username before the first colon,
//!    remove `Authorization` and attach the username as `x-authorized-user`
//!    plus an [`AuthenticatedIdentity`] request extension
//!
//! A stored token that does not decode to `username:password` is handled
//! according to [`UndecodableCredentialPolicy`].
//!
//! Any `x-authorized-user` header sent by the client is dropped before the
//! decision, so downstream code only ever sees the gate's own marker.
//!
//! # Usage
//!
//! ```bash
//! curl -u alice:secret http://localhost:3000/
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderValue, Request, Response, StatusCode};
use axum::response::IntoResponse;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::config::UndecodableCredentialPolicy;
use crate::credentials::CredentialStore;
use crate::metrics;

/// Header carrying the authenticated username to handlers.
pub const AUTHORIZED_USER_HEADER: &str = "x-authorized-user";

/// Scheme prefix of a Basic `Authorization` header value.
pub const BASIC_PREFIX: &str = "Basic ";

/// Challenge sent with every 401.
pub const BASIC_CHALLENGE: &str = r#"Basic realm="Login""#;

/// Body of every 401.
const UNAUTHORIZED_BODY: &str = "401 Unauthorized\n";

/// Username of a request that passed the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity(pub String);

/// Why the gate refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Missing credential, or a token the store does not know.
    UnknownCredential,
    /// A known token that does not decode to `username:password`.
    UndecodableCredential,
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::UNAUTHORIZED,
            [
                (WWW_AUTHENTICATE, BASIC_CHALLENGE),
                (CONTENT_TYPE, "text/plain; charset=utf-8"),
            ],
            UNAUTHORIZED_BODY,
        )
            .into_response()
    }
}

/// Basic authentication layer.
///
/// Unlike an optional API key, the gate is always on: with an empty store
/// every request is refused.
#[derive(Clone)]
pub struct CredentialGate {
    store: Arc<dyn CredentialStore>,
    policy: UndecodableCredentialPolicy,
    /// Paths that bypass authentication (exact match)
    bypass_paths: Arc<Vec<String>>,
}

impl CredentialGate {
    /// Create a gate backed by `store`, with no bypass paths.
    pub fn new(store: Arc<dyn CredentialStore>, policy: UndecodableCredentialPolicy) -> Self {
        Self {
            store,
            policy,
            bypass_paths: Arc::new(Vec::new()),
        }
    }

    /// Let requests for these exact paths through without credentials.
    pub fn with_bypass_paths(mut self, bypass_paths: Vec<String>) -> Self {
        self.bypass_paths = Arc::new(bypass_paths);
        self
    }

    fn bypasses(&self, path: &str) -> bool {
        self.bypass_paths.iter().any(|p| p == path)
    }

    /// Decide whether `req` may proceed.
    ///
    /// On success the request is returned with `Authorization` removed and,
    /// when a username could be extracted, the identity attached.
    pub async fn authenticate<B>(&self, mut req: Request<B>) -> Result<Request<B>, AuthFailure> {
        req.headers_mut().remove(AUTHORIZED_USER_HEADER);
        let token = extract_basic_token(req.headers()).to_string();

        let known = match self.store.lookup(&token).await {
            Ok(known) => known,
            Err(e) => {
                warn!(error = %e, "Credential store lookup failed, treating credential as unknown");
                false
            }
        };

        if !known {
            metrics::record_auth("rejected");
            warn!(
                path = %req.uri().path(),
                credential_present = !token.is_empty(),
                "Rejected request without a known credential"
            );
            return Err(AuthFailure::UnknownCredential);
        }

        let identity = parse_basic_credential(&token)
            .and_then(|user| HeaderValue::from_str(&user).ok().map(|value| (user, value)));

        match identity {
            Some((user, value)) => {
                let headers = req.headers_mut();
                headers.remove(AUTHORIZATION);
                headers.insert(AUTHORIZED_USER_HEADER, value);
                debug!(user = %user, "Basic authentication successful");
                req.extensions_mut().insert(AuthenticatedIdentity(user));
                metrics::record_auth("accepted");
                Ok(req)
            }
            None => match self.policy {
                UndecodableCredentialPolicy::Reject => {
                    metrics::record_auth("undecodable");
                    warn!(
                        path = %req.uri().path(),
                        "Rejected stored credential that is not user:password"
                    );
                    Err(AuthFailure::UndecodableCredential)
                }
                UndecodableCredentialPolicy::Allow => {
                    req.headers_mut().remove(AUTHORIZATION);
                    metrics::record_auth("accepted_without_identity");
                    warn!(
                        path = %req.uri().path(),
                        "Forwarding stored credential without a username"
                    );
                    Ok(req)
                }
            },
        }
    }
}

impl<S> Layer<S> for CredentialGate {
    type Service = CredentialGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CredentialGateService {
            inner,
            gate: self.clone(),
        }
    }
}

/// Basic authentication service wrapper.
#[derive(Clone)]
pub struct CredentialGateService<S> {
    inner: S,
    gate: CredentialGate,
}

impl<S> Service<Request<Body>> for CredentialGateService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let gate = self.gate.clone();
        // Take the service that was driven to readiness, leave a clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            if gate.bypasses(req.uri().path()) {
                debug!(path = %req.uri().path(), "Bypassing credential gate");
                req.headers_mut().remove(AUTHORIZED_USER_HEADER);
                metrics::record_auth("bypassed");
                return inner.call(req).await;
            }

            match gate.authenticate(req).await {
                Ok(req) => inner.call(req).await,
                Err(failure) => Ok(failure.into_response()),
            }
        })
    }
}

/// Token following the `Basic ` prefix, or `""` when there is none.
pub fn extract_basic_token(headers: &HeaderMap) -> &str {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BASIC_PREFIX))
        .unwrap_or("")
}

/// Username of a Basic token.
///
/// The token must be valid base64 of UTF-8 `username:password`; the first
/// colon separates the two, so the password may itself contain colons.
/// Returns `None` for undecodable tokens, a missing colon, an empty username
/// or a username containing control characters.
pub fn parse_basic_credential(token: &str) -> Option<String> {
    let decoded = BASE64.decode(token).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, _password) = decoded.split_once(':')?;

    if username.is_empty() || username.chars().any(char::is_control) {
        return None;
    }

    Some(username.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::convert::Infallible;
    use tower::ServiceExt;

    use crate::credentials::{CredentialStoreError, MemoryCredentialStore, encode_basic_token};

    /// Store whose backend is always down.
    #[derive(Debug)]
    struct FailingStore;

    #[async_trait]
    impl CredentialStore for FailingStore {
        async fn lookup(&self, _token: &str) -> Result<bool, CredentialStoreError> {
            Err(CredentialStoreError::Unavailable("dictionary offline".into()))
        }
    }

    /// Inner service echoing what the gate forwarded.
    async fn echo(req: Request<Body>) -> Result<Response<Body>, Infallible> {
        let user = req
            .headers()
            .get(AUTHORIZED_USER_HEADER)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let identity = req
            .extensions()
            .get::<AuthenticatedIdentity>()
            .map(|id| id.0.clone())
            .unwrap_or_default();
        let saw_authorization = req.headers().contains_key(AUTHORIZATION);

        Ok(Response::builder()
            .header("x-saw-authorization", saw_authorization.to_string())
            .header("x-identity", identity)
            .body(Body::from(user))
            .unwrap())
    }

    fn gate(policy: UndecodableCredentialPolicy) -> CredentialGate {
        let store = MemoryCredentialStore::new()
            .with_user("alice", "secret")
            .with_token("bm90LWEtY3JlZGVudGlhbA==", true) // "not-a-credential"
            .with_token("%%%", true);
        CredentialGate::new(Arc::new(store), policy)
    }

    fn request(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/edgeDeployment");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_parse_simple_credential() {
        assert_eq!(
            parse_basic_credential(&encode_basic_token("alice", "secret")),
            Some("alice".to_string())
        );
    }

    #[test]
    fn test_parse_splits_on_first_colon() {
        assert_eq!(
            parse_basic_credential(&encode_basic_token("bob", "pa:ss:word")),
            Some("bob".to_string())
        );
    }

    #[test]
    fn test_parse_empty_password() {
        assert_eq!(
            parse_basic_credential(&BASE64.encode("carol:")),
            Some("carol".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(parse_basic_credential(""), None);
        assert_eq!(parse_basic_credential("%%%"), None);
        assert_eq!(parse_basic_credential(&BASE64.encode("no-colon")), None);
        assert_eq!(parse_basic_credential(&BASE64.encode(":password")), None);
        assert_eq!(parse_basic_credential(&BASE64.encode("ev\nil:pw")), None);
        assert_eq!(parse_basic_credential(&BASE64.encode([0xff, b':', b'x'])), None);
    }

    #[test]
    fn test_extract_basic_token() {
        let req = request(Some("Basic YWxpY2U6c2VjcmV0"));
        assert_eq!(extract_basic_token(req.headers()), "YWxpY2U6c2VjcmV0");

        let req = request(Some("Bearer abc"));
        assert_eq!(extract_basic_token(req.headers()), "");

        let req = request(None);
        assert_eq!(extract_basic_token(req.headers()), "");
    }

    #[tokio::test]
    async fn test_missing_credential_is_rejected() {
        let service = gate(UndecodableCredentialPolicy::Reject).layer(tower::service_fn(echo));
        let response = service.oneshot(request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], BASIC_CHALLENGE);
        assert_eq!(body_text(response).await, UNAUTHORIZED_BODY);
    }

    #[tokio::test]
    async fn test_unknown_credential_is_rejected() {
        let service = gate(UndecodableCredentialPolicy::Reject).layer(tower::service_fn(echo));
        let token = encode_basic_token("alice", "wrong");
        let response = service
            .oneshot(request(Some(&format!("Basic {token}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_known_credential_rewrites_identity() {
        let service = gate(UndecodableCredentialPolicy::Reject).layer(tower::service_fn(echo));
        let response = service
            .oneshot(request(Some("Basic YWxpY2U6c2VjcmV0")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-saw-authorization"], "false");
        assert_eq!(response.headers()["x-identity"], "alice");
        assert_eq!(body_text(response).await, "alice");
    }

    #[tokio::test]
    async fn test_spoofed_identity_header_is_replaced() {
        let service = gate(UndecodableCredentialPolicy::Reject).layer(tower::service_fn(echo));
        let mut req = request(Some("Basic YWxpY2U6c2VjcmV0"));
        req.headers_mut()
            .insert(AUTHORIZED_USER_HEADER, HeaderValue::from_static("mallory"));

        let response = service.oneshot(req).await.unwrap();
        assert_eq!(body_text(response).await, "alice");
    }

    #[tokio::test]
    async fn test_store_failure_is_treated_as_unknown() {
        let gate = CredentialGate::new(Arc::new(FailingStore), UndecodableCredentialPolicy::Allow);
        let service = gate.layer(tower::service_fn(echo));
        let response = service
            .oneshot(request(Some("Basic YWxpY2U6c2VjcmV0")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_undecodable_credential_rejected_by_default() {
        let service = gate(UndecodableCredentialPolicy::Reject).layer(tower::service_fn(echo));
        let response = service
            .oneshot(request(Some("Basic bm90LWEtY3JlZGVudGlhbA==")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_undecodable_credential_allowed_by_policy() {
        let service = gate(UndecodableCredentialPolicy::Allow).layer(tower::service_fn(echo));
        let response = service
            .oneshot(request(Some("Basic %%%")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-saw-authorization"], "false");
        assert_eq!(response.headers()["x-identity"], "");
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn test_bypass_path_skips_gate() {
        let service = gate(UndecodableCredentialPolicy::Reject)
            .with_bypass_paths(vec!["/health".to_string()])
            .layer(tower::service_fn(echo));
        let req = Request::builder()
            .uri("/health")
            .header(AUTHORIZED_USER_HEADER, "mallory")
            .body(Body::empty())
            .unwrap();

        let response = service.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn test_bypass_is_exact_match() {
        let service = gate(UndecodableCredentialPolicy::Reject)
            .with_bypass_paths(vec!["/health".to_string()])
            .layer(tower::service_fn(echo));
        let req = Request::builder()
            .uri("/health/")
            .body(Body::empty())
            .unwrap();

        let response = service.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
