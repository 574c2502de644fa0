//! The synchronizer wired to its collaborators.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::cache::ContentCache;
use crate::config::SyncConfig;
use crate::control::{fill_remaining, ControlCommand, FillReport, MessageOutcome};
use crate::error::SyncResult;
use crate::host::{HostRuntime, Lifecycle};
use crate::interceptor::{Interception, Interceptor};
use crate::manifest_store::ManifestStore;
use crate::network::Fetcher;
use crate::reconcile::{ActivationOutcome, ReconciliationEngine};
use crate::staging::StagingCache;
use crate::storage::CacheStorage;
use crate::types::{Deployment, FetchRequest, Resource};

/// Snapshot of cache state relative to the current deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    /// Resources in the current manifest.
    pub manifest_resources: usize,

    /// Entries in the content cache.
    pub cached: usize,

    /// Manifest keys not in the content cache.
    pub missing: Vec<String>,

    /// Whether a manifest was persisted by a previous activation.
    pub has_persisted_manifest: bool,

    /// Whether the persisted manifest equals the current one.
    pub persisted_is_current: bool,

    /// Whether a staged shell is waiting for activation.
    pub install_pending: bool,
}

/// One deployed version of the synchronizer.
pub struct SyncWorker {
    config: Arc<SyncConfig>,
    deployment: Arc<Deployment>,
    fetcher: Arc<dyn Fetcher>,
    host: Arc<dyn HostRuntime>,
    content: ContentCache,
    staging: StagingCache,
    manifests: ManifestStore,
    interceptor: Interceptor,
}

impl SyncWorker {
    pub fn new(
        config: SyncConfig,
        deployment: Deployment,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        host: Arc<dyn HostRuntime>,
    ) -> SyncResult<Self> {
        config.validate()?;
        deployment.validate()?;

        let config = Arc::new(config);
        let deployment = Arc::new(deployment);
        let content = ContentCache::new(storage.clone(), config.content_cache.clone());
        let staging = StagingCache::new(storage.clone(), config.staging_cache.clone());
        let manifests = ManifestStore::new(storage, config.manifest_cache.clone());
        let interceptor = Interceptor::new(
            config.clone(),
            Arc::new(deployment.manifest.clone()),
            content.clone(),
            fetcher.clone(),
        );

        Ok(Self {
            config,
            deployment,
            fetcher,
            host,
            content,
            staging,
            manifests,
            interceptor,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn content(&self) -> &ContentCache {
        &self.content
    }

    pub fn staging(&self) -> &StagingCache {
        &self.staging
    }

    pub fn manifests(&self) -> &ManifestStore {
        &self.manifests
    }

    fn engine(&self) -> ReconciliationEngine {
        ReconciliationEngine::new(
            self.content.clone(),
            self.staging.clone(),
            self.manifests.clone(),
            self.host.clone(),
        )
    }

    /// Answer a request the way the host would: intercepted requests from
    /// cache or network, everything else straight from the network.
    pub async fn respond(&self, request: &FetchRequest) -> SyncResult<Resource> {
        match self.on_fetch(request).await? {
            Interception::Respond(resource) => Ok(resource),
            Interception::PassThrough => self.fetcher.fetch(request).await,
        }
    }

    /// Download every manifest resource not yet cached.
    pub async fn fill_remaining(&self) -> SyncResult<FillReport> {
        fill_remaining(
            &self.content,
            &self.deployment.manifest,
            self.fetcher.as_ref(),
            &self.config,
        )
        .await
    }

    pub async fn status(&self) -> SyncResult<SyncStatus> {
        let cached: HashSet<String> = self.content.keys().await?.into_iter().collect();
        let missing = self
            .deployment
            .manifest
            .keys()
            .filter(|k| !cached.contains(*k))
            .map(String::from)
            .collect();
        let persisted = self.manifests.load_persisted().await?;

        Ok(SyncStatus {
            manifest_resources: self.deployment.manifest.len(),
            cached: cached.len(),
            missing,
            has_persisted_manifest: persisted.is_some(),
            persisted_is_current: persisted.as_ref() == Some(&self.deployment.manifest),
            install_pending: self.staging.is_pending().await?,
        })
    }
}

#[async_trait]
impl Lifecycle for SyncWorker {
    async fn on_install(&self) -> SyncResult<usize> {
        // Only a hint to the host; staging goes ahead either way.
        if let Err(err) = self.host.skip_waiting().await {
            warn!(error = %err, "failed to request skip waiting");
        }
        self.staging
            .stage_all(self.fetcher.as_ref(), &self.config, &self.deployment.shell)
            .await
    }

    async fn on_activate(&self) -> ActivationOutcome {
        self.engine().run(&self.deployment.manifest).await
    }

    async fn on_fetch(&self, request: &FetchRequest) -> SyncResult<Interception> {
        self.interceptor.intercept(request).await
    }

    async fn on_message(&self, message: &str) -> SyncResult<MessageOutcome> {
        match ControlCommand::parse(message) {
            Some(ControlCommand::SkipWaiting) => {
                info!("skip waiting requested");
                self.host.skip_waiting().await?;
                Ok(MessageOutcome::SkippedWaiting)
            }
            Some(ControlCommand::DownloadOffline) => {
                info!("offline download requested");
                self.fill_remaining().await.map(MessageOutcome::Filled)
            }
            None => {
                debug!(message, "ignoring unknown control message");
                Ok(MessageOutcome::Ignored)
            }
        }
    }
}
