//! Content cache: durable responses keyed by resource key.

use std::sync::Arc;

use tracing::debug;

use crate::error::SyncResult;
use crate::storage::CacheStorage;
use crate::types::Resource;

/// Durable, key-addressed store of cached responses.
#[derive(Clone)]
pub struct ContentCache {
    storage: Arc<dyn CacheStorage>,
    name: String,
}

impl ContentCache {
    pub fn new(storage: Arc<dyn CacheStorage>, name: impl Into<String>) -> Self {
        Self {
            storage,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self, key: &str) -> SyncResult<Option<Resource>> {
        self.storage.get(&self.name, key).await
    }

    /// Store a response, overwriting any entry for the key wholesale.
    pub async fn put(&self, key: &str, resource: &Resource) -> SyncResult<()> {
        self.storage.put(&self.name, key, resource).await
    }

    /// Remove one entry. Returns whether it existed.
    pub async fn evict(&self, key: &str) -> SyncResult<bool> {
        let existed = self.storage.delete(&self.name, key).await?;
        if existed {
            debug!(cache = %self.name, key, "evicted");
        }
        Ok(existed)
    }

    pub async fn keys(&self) -> SyncResult<Vec<String>> {
        self.storage.keys(&self.name).await
    }

    /// Drop the cache and recreate it empty.
    pub async fn reset(&self) -> SyncResult<()> {
        self.storage.delete_cache(&self.name).await?;
        self.storage.open(&self.name).await
    }

    /// Drop the cache entirely.
    pub async fn delete(&self) -> SyncResult<bool> {
        self.storage.delete_cache(&self.name).await
    }
}

impl std::fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCache")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
