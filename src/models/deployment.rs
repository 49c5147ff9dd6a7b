use std::fmt;

use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::upstream::UpstreamError;

/// Payload of `POST /edgeDeployment`.
///
/// Every field is required; a missing field is rejected during
/// deserialization so nothing is ever forwarded upstream in its place.
/// `email` and `token` also accept the `SIGSCI_EMAIL` / `SIGSCI_TOKEN` keys
/// submitted by the bundled form page.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct DeploymentRequest {
    /// Management API user (sent as `x-api-user`)
    #[serde(alias = "SIGSCI_EMAIL")]
    pub email: String,
    /// Management API access token (sent as `x-api-token`)
    #[serde(alias = "SIGSCI_TOKEN")]
    pub token: String,
    /// Corporation identifier
    #[serde(rename = "corpName")]
    pub corp_name: String,
    /// Site identifier within the corporation
    #[serde(rename = "siteName")]
    pub site_name: String,
    /// Delivery service to bind to the edge deployment
    #[serde(rename = "fastlySID")]
    pub fastly_sid: String,
    /// Delivery platform API key (sent as `fastly-key`)
    #[serde(rename = "fastlyKey")]
    pub fastly_key: String,
}

// Credentials stay out of logs.
impl fmt::Debug for DeploymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentRequest")
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .field("corp_name", &self.corp_name)
            .field("site_name", &self.site_name)
            .field("fastly_sid", &self.fastly_sid)
            .field("fastly_key", &"<redacted>")
            .finish()
    }
}

/// Outcome of one upstream call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    /// A response arrived and its body is JSON.
    Response { status: StatusCode, body: Value },
    /// A response arrived but its body is not JSON.
    Invalid { status: StatusCode, text: String },
    /// No response could be obtained.
    Unreachable(UpstreamError),
}

impl CallResult {
    /// Upstream HTTP status, if a response arrived.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CallResult::Response { status, .. } | CallResult::Invalid { status, .. } => {
                Some(*status)
            }
            CallResult::Unreachable(_) => None,
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, CallResult::Unreachable(_))
    }

    /// JSON rendering used in the aggregated response.
    ///
    /// A parsed body is returned verbatim; the other outcomes become an
    /// explicit error object.
    pub fn to_json(&self) -> Value {
        match self {
            CallResult::Response { body, .. } => body.clone(),
            CallResult::Invalid { status, text } => json!({
                "error": "upstream_response_invalid",
                "status": status.as_u16(),
                "body": text,
            }),
            CallResult::Unreachable(e) => json!({
                "error": if e.is_timeout() { "upstream_timeout" } else { "upstream_unreachable" },
                "message": e.to_string(),
            }),
        }
    }
}

/// Results of the two edge deployment calls.
///
/// `result_a` is the site-level enable call, `result_b` the service
/// binding call.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResult {
    pub result_a: CallResult,
    pub result_b: CallResult,
}

impl AggregatedResult {
    /// True when both calls produced a response (of any status).
    pub fn is_complete(&self) -> bool {
        !self.result_a.is_unreachable() && !self.result_b.is_unreachable()
    }

    /// True when every call that failed did so by timing out.
    pub fn all_failures_timed_out(&self) -> bool {
        [&self.result_a, &self.result_b]
            .into_iter()
            .filter_map(|r| match r {
                CallResult::Unreachable(e) => Some(e.is_timeout()),
                _ => None,
            })
            .fold(!self.is_complete(), |acc, timed_out| acc && timed_out)
    }

    /// Short description of which calls failed, for logs and error bodies.
    pub fn failure_summary(&self) -> String {
        let failures: Vec<String> = [("resultA", &self.result_a), ("resultB", &self.result_b)]
            .into_iter()
            .filter_map(|(name, r)| match r {
                CallResult::Unreachable(e) => Some(format!("{name}: {e}")),
                _ => None,
            })
            .collect();

        if failures.is_empty() {
            "none".to_string()
        } else {
            failures.join("; ")
        }
    }

    /// `{"resultA": ..., "resultB": ...}`
    pub fn to_json(&self) -> Value {
        json!({
            "resultA": self.result_a.to_json(),
            "resultB": self.result_b.to_json(),
        })
    }
}
