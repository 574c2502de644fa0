//! Per-request policy dispatch.
//!
//! Evaluated in order:
//! 1. non-GET requests pass through
//! 2. URLs outside the origin pass through
//! 3. keys absent from the manifest pass through
//! 4. the root key is served online-first
//! 5. everything else is served cache-first with lazy fill

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::ContentCache;
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::network::Fetcher;
use crate::routing::normalize_key;
use crate::types::{FetchRequest, Manifest, Resource};

/// Result of intercepting a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Not handled; the host applies its default network behavior.
    PassThrough,

    /// Handled; answer with this response.
    Respond(Resource),
}

/// Policy chosen for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    PassThrough,
    OnlineFirst { key: String },
    CacheFirst { key: String },
}

/// Serves manifest resources from the content cache or the network.
#[derive(Clone)]
pub struct Interceptor {
    config: Arc<SyncConfig>,
    manifest: Arc<Manifest>,
    content: ContentCache,
    fetcher: Arc<dyn Fetcher>,
}

impl Interceptor {
    pub fn new(
        config: Arc<SyncConfig>,
        manifest: Arc<Manifest>,
        content: ContentCache,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            config,
            manifest,
            content,
            fetcher,
        }
    }

    /// Choose a policy without touching cache or network.
    pub fn route(&self, request: &FetchRequest) -> Route {
        if request.method != reqwest::Method::GET {
            return Route::PassThrough;
        }

        let Some(key) = normalize_key(&request.url, &self.config) else {
            return Route::PassThrough;
        };

        if !self.manifest.contains(&key) {
            Route::PassThrough
        } else if key == self.config.root_key {
            Route::OnlineFirst { key }
        } else {
            Route::CacheFirst { key }
        }
    }

    pub async fn intercept(&self, request: &FetchRequest) -> SyncResult<Interception> {
        let resource = match self.route(request) {
            Route::PassThrough => {
                debug!(url = %request.url, "not intercepted");
                return Ok(Interception::PassThrough);
            }
            Route::OnlineFirst { key } => self.online_first(&key, request).await?,
            Route::CacheFirst { key } => self.cache_first(&key, request).await?,
        };
        Ok(Interception::Respond(resource))
    }

    /// Network first; the fresh response replaces the cached copy. Falls
    /// back to the cache only when the network is unreachable.
    async fn online_first(&self, key: &str, request: &FetchRequest) -> SyncResult<Resource> {
        match self.fetcher.fetch(request).await {
            Ok(resource) => {
                if let Err(err) = self.content.put(key, &resource).await {
                    warn!(key, error = %err, "failed to store fresh response");
                }
                Ok(resource)
            }
            Err(err) if err.is_network() => match self.cached(key).await {
                Some(resource) => {
                    debug!(key, error = %err, "offline, serving cached copy");
                    Ok(resource)
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    /// Cache first; a miss is fetched and stored only on a success status.
    async fn cache_first(&self, key: &str, request: &FetchRequest) -> SyncResult<Resource> {
        if let Some(resource) = self.cached(key).await {
            debug!(key, "cache hit");
            return Ok(resource);
        }

        let resource = self.fetcher.fetch(request).await?;
        if resource.is_success() {
            if let Err(err) = self.content.put(key, &resource).await {
                warn!(key, error = %err, "failed to store fetched response");
            }
        } else {
            debug!(key, status = resource.status, "not caching failed response");
        }
        Ok(resource)
    }

    /// Cache lookup where a read failure counts as a miss.
    async fn cached(&self, key: &str) -> Option<Resource> {
        match self.content.get(key).await {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key, error = %err, "cache read failed, treating as miss");
                None
            }
        }
    }
}
