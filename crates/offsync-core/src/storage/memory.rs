use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::SyncResult;
use crate::types::Resource;

use super::CacheStorage;

/// In-process storage, lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    caches: RwLock<HashMap<String, BTreeMap<String, Resource>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the caches that currently exist.
    pub async fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, cache: &str) -> SyncResult<()> {
        self.caches
            .write()
            .await
            .entry(cache.to_string())
            .or_default();
        Ok(())
    }

    async fn has_cache(&self, cache: &str) -> SyncResult<bool> {
        Ok(self.caches.read().await.contains_key(cache))
    }

    async fn get(&self, cache: &str, key: &str) -> SyncResult<Option<Resource>> {
        Ok(self
            .caches
            .read()
            .await
            .get(cache)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn put(&self, cache: &str, key: &str, resource: &Resource) -> SyncResult<()> {
        self.caches
            .write()
            .await
            .entry(cache.to_string())
            .or_default()
            .insert(key.to_string(), resource.clone());
        Ok(())
    }

    async fn delete(&self, cache: &str, key: &str) -> SyncResult<bool> {
        Ok(self
            .caches
            .write()
            .await
            .get_mut(cache)
            .map(|entries| entries.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn keys(&self, cache: &str) -> SyncResult<Vec<String>> {
        Ok(self
            .caches
            .read()
            .await
            .get(cache)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_cache(&self, cache: &str) -> SyncResult<bool> {
        Ok(self.caches.write().await.remove(cache).is_some())
    }
}
