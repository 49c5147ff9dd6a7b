//! HTTP middleware for authentication and observability.
//!
//! - **Credential gate**: HTTP Basic authentication against the credential
//!   store, in front of every route
//! - **Request ID**: generation and propagation of `x-request-id`
//!
//! # Architecture
//!
//! ```text
//! Request → Request ID → Trace → Credential Gate → Handler → Response
//!               ↓                      ↓
//!        X-Request-Id header      401 + WWW-Authenticate
//! ```
//!
//! # Security Considerations
//!
//! - Tokens are compared in constant time by the store
//! - `Authorization` never reaches a handler
//! - `x-authorized-user` is only ever set by the gate

pub mod basic_auth;
pub mod request_id;

pub use basic_auth::{
    AUTHORIZED_USER_HEADER, AuthFailure, AuthenticatedIdentity, BASIC_CHALLENGE, CredentialGate,
    extract_basic_token, parse_basic_credential,
};
pub use request_id::{REQUEST_ID_HEADER, RequestIdLayer};
