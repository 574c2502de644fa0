//! Named cache storage.
//!
//! Every piece of durable state (content cache, staging area, persisted
//! manifest) lives in a named cache behind [`CacheStorage`]. Each operation
//! is atomic per key; callers sequence multi-step work themselves.

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::types::Resource;

mod disk;
mod io;
mod keys;
mod memory;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;

/// Key-addressed store of named caches.
///
/// Reads against a cache that does not exist behave as an empty cache;
/// writes create the cache on demand.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the cache if it does not exist.
    async fn open(&self, cache: &str) -> SyncResult<()>;

    /// Whether the cache exists. An opened cache with no entries still exists.
    async fn has_cache(&self, cache: &str) -> SyncResult<bool>;

    async fn get(&self, cache: &str, key: &str) -> SyncResult<Option<Resource>>;

    /// Store an entry, replacing any previous entry for the key.
    async fn put(&self, cache: &str, key: &str, resource: &Resource) -> SyncResult<()>;

    /// Remove an entry. Returns whether it existed.
    async fn delete(&self, cache: &str, key: &str) -> SyncResult<bool>;

    /// Keys currently stored in the cache.
    async fn keys(&self, cache: &str) -> SyncResult<Vec<String>>;

    /// Remove the whole cache. Returns whether it existed.
    async fn delete_cache(&self, cache: &str) -> SyncResult<bool>;
}
