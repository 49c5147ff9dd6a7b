//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. In production, configure via environment variables or a `.env` file.
//!
//! # Security Configuration
//!
//! - `AUTH_CREDENTIALS`: Comma-separated `user:password` pairs accepted by the gate
//! - `AUTH_CREDENTIALS_FILE`: JSON file mapping raw Basic tokens to a validity flag
//! - `AUTH_UNDECODABLE_POLICY`: `reject` (default) or `allow` for stored tokens
//!   that do not decode to `user:password`
//!
//! # Upstream
//!
//! - `UPSTREAM_API_BASE`: Management API base URL
//! - `UPSTREAM_BACKEND`: Backend binding name for management API calls
//! - `UPSTREAM_TIMEOUT_SECS`: Bound on each upstream call (default: 30)

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;

use crate::error::{AppError, AppResult};

/// Default management API base URL.
pub const DEFAULT_API_BASE: &str = "https://dashboard.signalsciences.net/api/v0";

/// Default backend binding name for management API calls.
pub const DEFAULT_BACKEND: &str = "ngwaf_api_origin";

/// Default `x-powered-by` response header value.
pub const DEFAULT_POWERED_BY: &str = "edge-deployment-gateway";

/// What the gate does with a stored token that does not decode to
/// `username:password`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndecodableCredentialPolicy {
    /// Answer 401, as for an unknown token.
    #[default]
    Reject,
    /// Forward the request without an authenticated identity.
    Allow,
}

impl FromStr for UndecodableCredentialPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "allow" => Ok(Self::Allow),
            other => Err(format!("expected 'reject' or 'allow', got '{other}'")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'text' or 'json', got '{other}'")),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    /// Maximum request body size in bytes (default: 1MB)
    pub max_request_body_size: usize,

    /// Value of the `x-powered-by` header set on every response
    pub powered_by: String,

    // =========================================================================
    // Upstream Configuration
    // =========================================================================
    /// Management API base URL, without trailing slash
    pub api_base_url: String,

    /// Backend binding name used for management API calls
    pub upstream_backend: String,

    /// Timeout for each upstream call (default: 30 seconds)
    pub upstream_timeout: Duration,

    /// Connect timeout for the upstream backend (default: 5 seconds)
    pub upstream_connect_timeout: Duration,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Inline `user:password` pairs (comma-separated)
    pub auth_credentials: Option<String>,

    /// Path to a JSON credential file
    pub auth_credentials_file: Option<PathBuf>,

    /// Paths that bypass the credential gate (default: none)
    pub auth_bypass_paths: Vec<String>,

    /// Handling of stored tokens that do not decode to `user:password`
    pub undecodable_policy: UndecodableCredentialPolicy,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Log output format (default: text)
    pub log_format: LogFormat,

    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any configuration is invalid
    /// (e.g., non-numeric PORT value, unparseable API base URL).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,
            max_request_body_size: Self::parse_env("MAX_REQUEST_BODY_SIZE", 1024 * 1024)?,
            powered_by: env::var("POWERED_BY").unwrap_or_else(|_| DEFAULT_POWERED_BY.to_string()),

            // Upstream
            api_base_url: env::var("UPSTREAM_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            upstream_backend: env::var("UPSTREAM_BACKEND")
                .unwrap_or_else(|_| DEFAULT_BACKEND.to_string()),
            upstream_timeout: Duration::from_secs(Self::parse_env("UPSTREAM_TIMEOUT_SECS", 30)?),
            upstream_connect_timeout: Duration::from_secs(Self::parse_env(
                "UPSTREAM_CONNECT_TIMEOUT_SECS",
                5,
            )?),

            // Security
            auth_credentials: env::var("AUTH_CREDENTIALS").ok().filter(|s| !s.is_empty()),
            auth_credentials_file: env::var("AUTH_CREDENTIALS_FILE")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            auth_bypass_paths: Self::parse_auth_bypass_paths(),
            undecodable_policy: Self::parse_env(
                "AUTH_UNDECODABLE_POLICY",
                UndecodableCredentialPolicy::Reject,
            )?,

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: Self::parse_env("LOG_FORMAT", LogFormat::Text)?,
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    fn validate(&self) -> AppResult<()> {
        let url = Url::parse(&self.api_base_url).map_err(|e| {
            AppError::ConfigError(format!(
                "UPSTREAM_API_BASE '{}' is not a valid URL: {e}",
                self.api_base_url
            ))
        })?;

        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::ConfigError(format!(
                "UPSTREAM_API_BASE '{}' must be an http(s) URL",
                self.api_base_url
            )));
        }

        if self.upstream_backend.trim().is_empty() {
            return Err(AppError::ConfigError(
                "UPSTREAM_BACKEND cannot be empty".to_string(),
            ));
        }

        if self.upstream_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "UPSTREAM_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.upstream_connect_timeout > self.upstream_timeout {
            return Err(AppError::ConfigError(format!(
                "UPSTREAM_CONNECT_TIMEOUT_SECS ({:?}) must be <= UPSTREAM_TIMEOUT_SECS ({:?})",
                self.upstream_connect_timeout, self.upstream_timeout
            )));
        }

        if self.max_request_body_size == 0 {
            return Err(AppError::ConfigError(
                "MAX_REQUEST_BODY_SIZE must be greater than 0".to_string(),
            ));
        }

        if axum::http::HeaderValue::from_str(&self.powered_by).is_err() {
            return Err(AppError::ConfigError(
                "POWERED_BY must be a valid header value".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check whether any credential source is configured.
    ///
    /// Without one, the store is empty and every request is answered 401.
    pub fn credentials_configured(&self) -> bool {
        self.auth_credentials.is_some() || self.auth_credentials_file.is_some()
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse auth bypass paths from environment variable.
    ///
    /// Default: none, every route is gated.
    fn parse_auth_bypass_paths() -> Vec<String> {
        env::var("AUTH_BYPASS_PATHS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && s.starts_with('/'))
            .collect()
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_request_body_size: 1024 * 1024, // 1MB
            powered_by: DEFAULT_POWERED_BY.to_string(),
            // Upstream
            api_base_url: DEFAULT_API_BASE.to_string(),
            upstream_backend: DEFAULT_BACKEND.to_string(),
            upstream_timeout: Duration::from_secs(30),
            upstream_connect_timeout: Duration::from_secs(5),
            // Security
            auth_credentials: None,
            auth_credentials_file: None,
            auth_bypass_paths: vec![],
            undecodable_policy: UndecodableCredentialPolicy::Reject,
            // Observability
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_port: 9090,
        }
    }
}
