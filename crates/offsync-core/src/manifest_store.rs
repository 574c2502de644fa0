//! Single-slot persistence of the last activated manifest.

use std::sync::Arc;

use tracing::debug;

use crate::error::SyncResult;
use crate::storage::CacheStorage;
use crate::types::{Manifest, Resource};

/// Fixed entry key holding the serialized manifest.
pub const MANIFEST_KEY: &str = "manifest";

/// Persists exactly one manifest; every save overwrites the slot.
#[derive(Clone)]
pub struct ManifestStore {
    storage: Arc<dyn CacheStorage>,
    name: String,
}

impl ManifestStore {
    pub fn new(storage: Arc<dyn CacheStorage>, name: impl Into<String>) -> Self {
        Self {
            storage,
            name: name.into(),
        }
    }

    /// The manifest saved by the previous activation, if any.
    pub async fn load_persisted(&self) -> SyncResult<Option<Manifest>> {
        match self.storage.get(&self.name, MANIFEST_KEY).await? {
            Some(entry) => Manifest::from_json(&entry.body).map(Some),
            None => Ok(None),
        }
    }

    pub async fn save(&self, manifest: &Manifest) -> SyncResult<()> {
        let entry = Resource::ok(manifest.to_json()?).with_header("content-type", "application/json");
        self.storage.put(&self.name, MANIFEST_KEY, &entry).await?;
        debug!(cache = %self.name, resources = manifest.len(), "saved manifest");
        Ok(())
    }

    /// Remove the slot and its cache.
    pub async fn delete(&self) -> SyncResult<bool> {
        self.storage.delete_cache(&self.name).await
    }
}

impl std::fmt::Debug for ManifestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestStore")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
