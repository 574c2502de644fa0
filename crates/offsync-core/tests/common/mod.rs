//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use offsync_core::{
    CacheStorage, Deployment, FetchRequest, Fetcher, HostRuntime, Manifest, MemoryStorage,
    Resource, ShellSet, SyncConfig, SyncError, SyncResult, SyncWorker,
};

pub const ORIGIN: &str = "https://app.example.com";

pub fn url(key: &str) -> String {
    if key == "/" {
        format!("{}/", ORIGIN)
    } else {
        format!("{}/{}", ORIGIN, key)
    }
}

pub fn config() -> SyncConfig {
    SyncConfig::default().with_origin(ORIGIN)
}

/// Origin simulator: serves a mutable table, can go offline, records calls.
#[derive(Default)]
pub struct ScriptedFetcher {
    table: Mutex<HashMap<String, Resource>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, key: &str, body: &str) {
        self.serve_resource(key, Resource::ok(body));
    }

    pub fn serve_resource(&self, key: &str, resource: Resource) {
        self.table.lock().unwrap().insert(url(key), resource);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> SyncResult<Resource> {
        self.calls.lock().unwrap().push(request.url.clone());
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Network {
                message: "offline".to_string(),
            });
        }
        Ok(self
            .table
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| Resource::new(404, "not found")))
    }
}

/// Host that counts what it was asked to do.
#[derive(Default)]
pub struct RecordingHost {
    pub claims: AtomicUsize,
    pub skips: AtomicUsize,
    refuse_skip: AtomicBool,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }

    pub fn skips(&self) -> usize {
        self.skips.load(Ordering::SeqCst)
    }

    /// Make `skip_waiting` fail (after counting the call).
    pub fn refuse_skip_waiting(&self) {
        self.refuse_skip.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl HostRuntime for RecordingHost {
    async fn claim_clients(&self) -> SyncResult<()> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn skip_waiting(&self) -> SyncResult<()> {
        self.skips.fetch_add(1, Ordering::SeqCst);
        if self.refuse_skip.load(Ordering::SeqCst) {
            return Err(SyncError::InvalidRequest {
                message: "host has no waiting version".to_string(),
            });
        }
        Ok(())
    }
}

/// In-memory storage that counts reads and can be told to fail writes.
#[derive(Default)]
pub struct ProbeStorage {
    pub inner: MemoryStorage,
    gets: AtomicUsize,
    fail_puts_to: Mutex<Option<String>>,
}

impl ProbeStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Make every subsequent put into `cache` fail.
    pub fn fail_puts_to(&self, cache: &str) {
        *self.fail_puts_to.lock().unwrap() = Some(cache.to_string());
    }

    pub fn allow_puts(&self) {
        *self.fail_puts_to.lock().unwrap() = None;
    }
}

#[async_trait]
impl CacheStorage for ProbeStorage {
    async fn open(&self, cache: &str) -> SyncResult<()> {
        self.inner.open(cache).await
    }

    async fn has_cache(&self, cache: &str) -> SyncResult<bool> {
        self.inner.has_cache(cache).await
    }

    async fn get(&self, cache: &str, key: &str) -> SyncResult<Option<Resource>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(cache, key).await
    }

    async fn put(&self, cache: &str, key: &str, resource: &Resource) -> SyncResult<()> {
        let failing = self.fail_puts_to.lock().unwrap().clone();
        if failing.as_deref() == Some(cache) {
            return Err(SyncError::Storage {
                message: format!("quota exceeded writing {}", key),
            });
        }
        self.inner.put(cache, key, resource).await
    }

    async fn delete(&self, cache: &str, key: &str) -> SyncResult<bool> {
        self.inner.delete(cache, key).await
    }

    async fn keys(&self, cache: &str) -> SyncResult<Vec<String>> {
        self.inner.keys(cache).await
    }

    async fn delete_cache(&self, cache: &str) -> SyncResult<bool> {
        self.inner.delete_cache(cache).await
    }
}

pub fn deployment(resources: &[(&str, &str)], shell: &[&str]) -> Deployment {
    Deployment::new(
        Manifest::new(resources.iter().copied()),
        ShellSet::new(shell.iter().copied()),
    )
    .unwrap()
}

pub fn worker(
    deployment: Deployment,
    storage: Arc<ProbeStorage>,
    fetcher: Arc<ScriptedFetcher>,
    host: Arc<RecordingHost>,
) -> SyncWorker {
    SyncWorker::new(config(), deployment, storage, fetcher, host).unwrap()
}
