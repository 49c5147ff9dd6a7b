//! Read-only platform environment metadata.
//!
//! Identifiers describing where the gateway runs (host, region, service
//! version) are read once at start up and logged. They play no part in
//! request handling.

use std::collections::HashMap;
use std::env;

use tracing::info;

/// Keys reported at start up.
pub const METADATA_KEYS: [&str; 4] = [
    "HOSTNAME",
    "DEPLOY_REGION",
    "DEPLOY_SERVICE_ID",
    "DEPLOY_SERVICE_VERSION",
];

/// One-shot key/value lookup of environment metadata.
pub trait EnvironmentProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// Metadata from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl EnvironmentProvider for ProcessEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl EnvironmentProvider for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Collect the known metadata keys that are set.
pub fn collect_metadata(provider: &impl EnvironmentProvider) -> Vec<(&'static str, String)> {
    METADATA_KEYS
        .iter()
        .filter_map(|key| provider.get(key).map(|value| (*key, value)))
        .collect()
}

/// Log the known metadata keys at start up.
pub fn log_metadata(provider: &impl EnvironmentProvider) {
    let metadata = collect_metadata(provider);
    if metadata.is_empty() {
        info!("No platform environment metadata available");
        return;
    }
    for (key, value) in metadata {
        info!(key, value = %value, "Platform environment");
    }
}
