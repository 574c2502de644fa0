//! Staging area for shell resources between install and activation.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::network::Fetcher;
use crate::routing::resource_url;
use crate::storage::CacheStorage;
use crate::types::{FetchMode, FetchRequest, Resource, ShellSet};

/// Transient cache populated at install and consumed at activation.
#[derive(Clone)]
pub struct StagingCache {
    storage: Arc<dyn CacheStorage>,
    name: String,
}

impl StagingCache {
    pub fn new(storage: Arc<dyn CacheStorage>, name: impl Into<String>) -> Self {
        Self {
            storage,
            name: name.into(),
        }
    }

    /// Fetch every shell resource, revalidating with the origin, into a
    /// fresh staging area.
    ///
    /// All-or-nothing: on the first unreachable resource or non-success
    /// status the staging area is deleted and the error returned. Returns
    /// the number of staged entries.
    pub async fn stage_all(
        &self,
        fetcher: &dyn Fetcher,
        config: &SyncConfig,
        shell: &ShellSet,
    ) -> SyncResult<usize> {
        self.storage.delete_cache(&self.name).await?;
        self.storage.open(&self.name).await?;

        match self.fetch_all(fetcher, config, shell).await {
            Ok(count) => {
                info!(cache = %self.name, staged = count, "staged shell resources");
                Ok(count)
            }
            Err(err) => {
                warn!(cache = %self.name, error = %err, "staging failed, discarding staging area");
                if let Err(discard_err) = self.discard().await {
                    warn!(error = %discard_err, "failed to discard staging area");
                }
                Err(err)
            }
        }
    }

    async fn fetch_all(
        &self,
        fetcher: &dyn Fetcher,
        config: &SyncConfig,
        shell: &ShellSet,
    ) -> SyncResult<usize> {
        let mut count = 0;
        for key in shell.iter() {
            let request =
                FetchRequest::get(resource_url(key, config)).with_mode(FetchMode::Reload);

            let resource = fetcher.fetch(&request).await.map_err(|e| SyncError::Staging {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
            if !resource.is_success() {
                return Err(SyncError::Http {
                    key: key.to_string(),
                    status: resource.status,
                });
            }

            self.storage.put(&self.name, key, &resource).await?;
            debug!(key, "staged");
            count += 1;
        }
        Ok(count)
    }

    pub async fn keys(&self) -> SyncResult<Vec<String>> {
        self.storage.keys(&self.name).await
    }

    pub async fn get(&self, key: &str) -> SyncResult<Option<Resource>> {
        self.storage.get(&self.name, key).await
    }

    /// Whether an installed version is waiting for activation. Activation and
    /// failed installs both remove the staging area.
    pub async fn is_pending(&self) -> SyncResult<bool> {
        self.storage.has_cache(&self.name).await
    }

    /// Tear the staging area down.
    pub async fn discard(&self) -> SyncResult<bool> {
        self.storage.delete_cache(&self.name).await
    }
}

impl std::fmt::Debug for StagingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingCache")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::storage::MemoryStorage;

    /// Answers from a fixed table; unknown URLs are unreachable.
    struct TableFetcher(HashMap<String, Resource>);

    #[async_trait]
    impl Fetcher for TableFetcher {
        async fn fetch(&self, request: &FetchRequest) -> SyncResult<Resource> {
            assert_eq!(request.mode, FetchMode::Reload);
            self.0
                .get(&request.url)
                .cloned()
                .ok_or_else(|| SyncError::Network {
                    message: format!("unreachable: {}", request.url),
                })
        }
    }

    fn config() -> SyncConfig {
        SyncConfig::default().with_origin("https://app.example.com")
    }

    fn fetcher(entries: &[(&str, Resource)]) -> TableFetcher {
        TableFetcher(
            entries
                .iter()
                .map(|(k, r)| (format!("https://app.example.com/{}", k), r.clone()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_stage_all_success() {
        let storage = Arc::new(MemoryStorage::new());
        let staging = StagingCache::new(storage, "temp");
        let fetcher = fetcher(&[
            ("main.js", Resource::ok("js")),
            ("index.html", Resource::ok("<html>")),
        ]);

        let count = staging
            .stage_all(&fetcher, &config(), &ShellSet::new(["main.js", "index.html"]))
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            staging.keys().await.unwrap(),
            vec!["index.html".to_string(), "main.js".to_string()]
        );
    }

    #[tokio::test]
    async fn test_stage_all_unreachable_discards() {
        let storage = Arc::new(MemoryStorage::new());
        let staging = StagingCache::new(storage.clone(), "temp");
        let fetcher = fetcher(&[("main.js", Resource::ok("js"))]);

        let err = staging
            .stage_all(&fetcher, &config(), &ShellSet::new(["main.js", "index.html"]))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Staging { ref key, .. } if key == "index.html"));
        assert!(!storage.has_cache("temp").await.unwrap());
    }

    #[tokio::test]
    async fn test_stage_all_error_status_discards() {
        let storage = Arc::new(MemoryStorage::new());
        let staging = StagingCache::new(storage.clone(), "temp");
        let fetcher = fetcher(&[
            ("main.js", Resource::ok("js")),
            ("index.html", Resource::new(503, "busy")),
        ]);

        let err = staging
            .stage_all(&fetcher, &config(), &ShellSet::new(["main.js", "index.html"]))
            .await
            .unwrap_err();

        assert!(
            matches!(err, SyncError::Http { ref key, status: 503 } if key == "index.html"),
            "{:?}",
            err
        );
        assert!(staging.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stage_all_clears_previous_staging() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .put("temp", "stale.js", &Resource::ok("old"))
            .await
            .unwrap();
        let staging = StagingCache::new(storage, "temp");
        let fetcher = fetcher(&[("main.js", Resource::ok("js"))]);

        staging
            .stage_all(&fetcher, &config(), &ShellSet::new(["main.js"]))
            .await
            .unwrap();

        assert_eq!(staging.keys().await.unwrap(), vec!["main.js".to_string()]);
    }
}
