//! Network access.
//!
//! [`Fetcher`] is the only way the synchronizer reaches the origin. `Err`
//! means the origin could not be reached; every HTTP status, including
//! 4xx/5xx, comes back as `Ok` and callers decide what a failure status means.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA, USER_AGENT};
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::types::{FetchMode, FetchRequest, Resource};

pub const SYNC_USER_AGENT: &str = concat!("offsync/", env!("CARGO_PKG_VERSION"));

/// Fetches resources from the network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> SyncResult<Resource>;
}

/// `reqwest`-backed fetcher. Single attempt per request, no retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(SYNC_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| SyncError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> SyncResult<Resource> {
        debug!(url = %request.url, method = %request.method, mode = ?request.mode, "fetching");

        let url = reqwest::Url::parse(&request.url).map_err(|e| SyncError::InvalidRequest {
            message: format!("{}: {}", request.url, e),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SyncError::InvalidRequest {
                message: format!("unsupported scheme in {}", request.url),
            });
        }

        let mut builder = self.client.request(request.method.clone(), url);
        if request.mode == FetchMode::Reload {
            builder = builder
                .header(CACHE_CONTROL, "no-cache")
                .header(PRAGMA, "no-cache");
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response.bytes().await.map_err(|e| SyncError::Network {
            message: format!("failed to read response body: {}", e),
        })?;

        Ok(Resource {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
