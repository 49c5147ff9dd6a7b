//! Credential store consulted by the Basic authentication gate.
//!
//! The store maps the *raw* token of an `Authorization: Basic <token>`
//! header (still base64-encoded) to a validity flag. It is read-only from
//! the gateway's point of view: entries are loaded once at start up from
//! configuration and never modified while serving.
//!
//! # Sources
//!
//! - `AUTH_CREDENTIALS`: comma-separated `user:password` pairs, encoded on
//!   load
//! - `AUTH_CREDENTIALS_FILE`: JSON object of `token -> flag`, in the shape
//!   of an edge dictionary export
//!
//! ```json
//! { "YWxpY2U6c2VjcmV0": true, "Ym9iOnB3": "1", "ZXZlOm9sZA==": false }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use subtle::{Choice, ConstantTimeEq};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

/// Failures of the credential store itself.
#[derive(Error, Debug)]
pub enum CredentialStoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read credential file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid credential file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("credential entry {0} is not of the form user:password")]
    InvalidEntry(usize),
}

/// Read-only lookup of Basic credential tokens.
#[async_trait]
pub trait CredentialStore: Send + Sync + fmt::Debug {
    /// Whether `token` is a known, valid credential.
    ///
    /// `token` is the base64 text exactly as received; it is not decoded.
    async fn lookup(&self, token: &str) -> Result<bool, CredentialStoreError>;
}

/// In-memory credential store.
///
/// Lookups compare the presented token against every entry in constant
/// time per entry, so response timing does not reveal how much of a token
/// matched.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    entries: Vec<(String, bool)>,
}

impl MemoryCredentialStore {
    /// Create an empty store. An empty store rejects every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw token with its validity flag.
    pub fn with_token(mut self, token: impl Into<String>, valid: bool) -> Self {
        let token = token.into();
        self.entries.retain(|(existing, _)| *existing != token);
        self.entries.push((token, valid));
        self
    }

    /// Add a valid credential for `username:password`.
    pub fn with_user(self, username: &str, password: &str) -> Self {
        self.with_token(encode_basic_token(username, password), true)
    }

    /// Build a store from comma-separated `user:password` pairs.
    ///
    /// # Errors
    ///
    /// Returns `CredentialStoreError::InvalidEntry` with the zero-based
    /// position of the first pair without a username or colon. The entry
    /// itself is not echoed because it contains a password.
    pub fn from_pairs(pairs: &str) -> Result<Self, CredentialStoreError> {
        pairs
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .enumerate()
            .try_fold(Self::new(), |store, (index, pair)| {
                match pair.split_once(':') {
                    Some((user, password)) if !user.is_empty() => {
                        Ok(store.with_user(user, password))
                    }
                    _ => Err(CredentialStoreError::InvalidEntry(index)),
                }
            })
    }

    /// Build a store from a JSON object mapping raw tokens to flags.
    ///
    /// A flag is valid when it is `true`, or a string other than `""`,
    /// `"0"` or `"false"` (dictionary exports store every value as text).
    /// Any other value marks the token invalid.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let map: HashMap<String, Value> = serde_json::from_str(json)?;
        Ok(map.into_iter().fold(Self::new(), |store, (token, flag)| {
            let valid = match flag {
                Value::Bool(b) => b,
                Value::String(s) => !matches!(s.trim(), "" | "0" | "false"),
                _ => false,
            };
            store.with_token(token, valid)
        }))
    }

    /// Load a JSON credential file (see [`MemoryCredentialStore::from_json`]).
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, CredentialStoreError> {
        let path = path.as_ref();
        let path_display = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| CredentialStoreError::Io {
            path: path_display.clone(),
            source,
        })?;
        let store = Self::from_json(&contents).map_err(|source| CredentialStoreError::Parse {
            path: path_display.clone(),
            source,
        })?;
        debug!(path = %path_display, entries = store.len(), "Loaded credential file");
        Ok(store)
    }

    /// Build the store configured by `AUTH_CREDENTIALS` and
    /// `AUTH_CREDENTIALS_FILE`. File entries win over inline pairs.
    pub fn from_config(config: &Config) -> Result<Self, CredentialStoreError> {
        let inline = match &config.auth_credentials {
            Some(pairs) => Self::from_pairs(pairs)?,
            None => Self::new(),
        };
        match &config.auth_credentials_file {
            Some(path) => Ok(inline.merge(Self::load_file(path)?)),
            None => Ok(inline),
        }
    }

    /// Merge another store's entries into this one; `other` wins on conflict.
    pub fn merge(self, other: MemoryCredentialStore) -> Self {
        other
            .entries
            .into_iter()
            .fold(self, |store, (token, valid)| store.with_token(token, valid))
    }

    /// Number of entries, valid or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Tokens are secrets; only the entry count is printed.
impl fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCredentialStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn lookup(&self, token: &str) -> Result<bool, CredentialStoreError> {
        let mut found = Choice::from(0u8);
        for (stored, valid) in &self.entries {
            found |= stored.as_bytes().ct_eq(token.as_bytes()) & Choice::from(u8::from(*valid));
        }
        Ok(found.into())
    }
}

/// Encode `username:password` the way a client puts it in a Basic header.
pub fn encode_basic_token(username: &str, password: &str) -> String {
    BASE64.encode(format!("{username}:{password}"))
}
