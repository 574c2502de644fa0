//! Synchronizer configuration.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::types::ROOT_KEY;

/// Synchronizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Origin the intercepted client talks to (scheme, host and port).
    #[serde(default = "default_origin", deserialize_with = "deserialize_origin")]
    pub origin: String,

    /// Name of the durable content cache.
    #[serde(default = "default_content_cache")]
    pub content_cache: String,

    /// Name of the transient staging cache.
    #[serde(default = "default_staging_cache")]
    pub staging_cache: String,

    /// Name of the cache holding the persisted manifest.
    #[serde(default = "default_manifest_cache")]
    pub manifest_cache: String,

    /// Network timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Query marker after which a request path is cut.
    #[serde(default = "default_cache_bust_marker")]
    pub cache_bust_marker: String,

    /// Key the bare origin maps to.
    #[serde(default = "default_root_key")]
    pub root_key: String,
}

fn default_origin() -> String {
    "http://localhost:8080".to_string()
}

fn deserialize_origin<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let origin = String::deserialize(deserializer)?;
    Ok(trim_origin(&origin))
}

fn trim_origin(origin: &str) -> String {
    origin.trim_end_matches('/').to_string()
}

fn default_content_cache() -> String {
    "offsync-app-cache".to_string()
}

fn default_staging_cache() -> String {
    "offsync-temp-cache".to_string()
}

fn default_manifest_cache() -> String {
    "offsync-app-manifest".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_cache_bust_marker() -> String {
    "?v=".to_string()
}

fn default_root_key() -> String {
    ROOT_KEY.to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            content_cache: default_content_cache(),
            staging_cache: default_staging_cache(),
            manifest_cache: default_manifest_cache(),
            timeout_secs: default_timeout(),
            cache_bust_marker: default_cache_bust_marker(),
            root_key: default_root_key(),
        }
    }
}

impl SyncConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `OFFSYNC_ORIGIN` | Origin URL |
    /// | `OFFSYNC_CONTENT_CACHE` | Content cache name |
    /// | `OFFSYNC_STAGING_CACHE` | Staging cache name |
    /// | `OFFSYNC_MANIFEST_CACHE` | Manifest cache name |
    /// | `OFFSYNC_TIMEOUT` | Network timeout in seconds |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            origin: std::env::var("OFFSYNC_ORIGIN")
                .map(|v| trim_origin(&v))
                .unwrap_or(defaults.origin),
            content_cache: std::env::var("OFFSYNC_CONTENT_CACHE")
                .unwrap_or(defaults.content_cache),
            staging_cache: std::env::var("OFFSYNC_STAGING_CACHE")
                .unwrap_or(defaults.staging_cache),
            manifest_cache: std::env::var("OFFSYNC_MANIFEST_CACHE")
                .unwrap_or(defaults.manifest_cache),
            timeout_secs: std::env::var("OFFSYNC_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            ..defaults
        }
    }

    /// Set the origin. A trailing slash is dropped.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = trim_origin(&origin.into());
        self
    }

    /// Set the network timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Check the origin is an absolute http(s) URL without a path or trailing
    /// slash and the three cache names are distinct.
    pub fn validate(&self) -> SyncResult<()> {
        // Request keys are cut after `origin + "/"`; a trailing slash here
        // would make every request look cross-origin.
        if self.origin.ends_with('/') {
            return Err(SyncError::Config {
                message: format!("origin must not end with '/': {}", self.origin),
            });
        }

        let parsed = url::Url::parse(&self.origin).map_err(|e| SyncError::Config {
            message: format!("invalid origin {}: {}", self.origin, e),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SyncError::Config {
                message: format!("origin must be http or https: {}", self.origin),
            });
        }
        if parsed.path() != "/" || parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(SyncError::Config {
                message: format!("origin must not carry a path or query: {}", self.origin),
            });
        }

        let names = [
            &self.content_cache,
            &self.staging_cache,
            &self.manifest_cache,
        ];
        if names.iter().any(|n| n.is_empty()) {
            return Err(SyncError::Config {
                message: "cache names must not be empty".to_string(),
            });
        }
        if names[0] == names[1] || names[0] == names[2] || names[1] == names[2] {
            return Err(SyncError::Config {
                message: "content, staging and manifest caches must be distinct".to_string(),
            });
        }

        Ok(())
    }
}
