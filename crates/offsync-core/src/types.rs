//! Data model: manifests, shell sets, cached resources and requests.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{SyncError, SyncResult};

/// Resource key of the entry document (the bare origin).
pub const ROOT_KEY: &str = "/";

/// Mapping of resource key to content fingerprint.
///
/// Serializes as a flat JSON object, which is also the persisted layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    resources: BTreeMap<String, String>,
}

impl Manifest {
    pub fn new<K, V>(resources: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            resources: resources
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Fingerprint recorded for a key.
    pub fn fingerprint(&self, key: &str) -> Option<&str> {
        self.resources.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.resources.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Serialize to the persisted JSON body.
    pub fn to_json(&self) -> SyncResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| SyncError::Manifest {
            message: format!("failed to serialize manifest: {}", e),
        })
    }

    /// Parse a persisted JSON body.
    pub fn from_json(bytes: &[u8]) -> SyncResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| SyncError::Manifest {
            message: format!("failed to parse manifest: {}", e),
        })
    }
}

/// Ordered resource keys required for a minimal offline start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShellSet(Vec<String>);

impl ShellSet {
    pub fn new<K: Into<String>>(keys: impl IntoIterator<Item = K>) -> Self {
        Self(keys.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Build output consumed by the worker: the manifest plus its shell subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    #[serde(rename = "resources")]
    pub manifest: Manifest,

    #[serde(default)]
    pub shell: ShellSet,
}

impl Deployment {
    /// Create a deployment, checking the shell is drawn from the manifest.
    pub fn new(manifest: Manifest, shell: ShellSet) -> SyncResult<Self> {
        let deployment = Self { manifest, shell };
        deployment.validate()?;
        Ok(deployment)
    }

    pub fn from_json(bytes: &[u8]) -> SyncResult<Self> {
        let deployment: Self = serde_json::from_slice(bytes).map_err(|e| SyncError::Manifest {
            message: format!("failed to parse deployment: {}", e),
        })?;
        deployment.validate()?;
        Ok(deployment)
    }

    /// Load a deployment file.
    pub async fn load(path: &Path) -> SyncResult<Self> {
        let bytes = fs::read(path).await.map_err(|e| SyncError::Manifest {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_json(&bytes)
    }

    pub fn validate(&self) -> SyncResult<()> {
        if let Some(missing) = self.shell.iter().find(|k| !self.manifest.contains(k)) {
            return Err(SyncError::Manifest {
                message: format!("shell resource not in manifest: {}", missing),
            });
        }
        Ok(())
    }
}

/// A cached or fetched response: status, headers and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Resource {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// A 200 response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Cache behavior requested from the network layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMode {
    /// Normal fetch; intermediaries may answer.
    #[default]
    Default,

    /// Bypass intermediary caches and revalidate with the origin.
    Reload,
}

/// A request as seen by the interceptor and the network layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub mode: FetchMode,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: reqwest::Method::GET,
            url: url.into(),
            mode: FetchMode::Default,
        }
    }

    pub fn with_method(mut self, method: reqwest::Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_mode(mut self, mode: FetchMode) -> Self {
        self.mode = mode;
        self
    }
}
