//! Directory-backed storage.
//!
//! # Layout
//!
//! ```text
//! {root}/{cache}/
//!   {sha256(key)}.entry   # One line of JSON metadata, a newline, then the body
//! ```
//!
//! An entry is one file replaced by a single rename, so a reader sees either
//! the previous version or the new one, never a body paired with another
//! write's status and headers. Concurrent puts to one key resolve to the last
//! rename.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::types::Resource;

use super::{io, keys, CacheStorage};

const ENTRY_EXTENSION: &str = "entry";

/// Metadata line at the head of each entry file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    /// Resource key (file names are hashed).
    key: String,

    status: u16,

    #[serde(default)]
    headers: BTreeMap<String, String>,

    /// When the entry was written.
    stored_at: DateTime<Utc>,
}

impl EntryMeta {
    fn parse(line: &[u8]) -> SyncResult<Self> {
        serde_json::from_slice(line)
            .map_err(|e| SyncError::storage("failed to parse entry metadata", e))
    }
}

/// Serialize an entry: compact JSON metadata (never contains a raw newline),
/// `\n`, body bytes.
fn encode_entry(meta: &EntryMeta, body: &[u8]) -> SyncResult<Vec<u8>> {
    let mut bytes = serde_json::to_vec(meta)
        .map_err(|e| SyncError::storage("failed to serialize entry metadata", e))?;
    bytes.reserve(body.len() + 1);
    bytes.push(b'\n');
    bytes.extend_from_slice(body);
    Ok(bytes)
}

fn decode_entry(bytes: Vec<u8>) -> SyncResult<(EntryMeta, Vec<u8>)> {
    let split = bytes
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| SyncError::Storage {
            message: "entry file has no metadata terminator".to_string(),
        })?;
    let meta = EntryMeta::parse(&bytes[..split])?;
    let body = bytes[split + 1..].to_vec();
    Ok((meta, body))
}

/// Storage rooted at a directory, one subdirectory per named cache.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn with_dir(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, cache: &str, key: &str) -> SyncResult<PathBuf> {
        let dir = keys::cache_dir(&self.root, cache)?;
        Ok(dir.join(format!("{}.{}", keys::entry_stem(key), ENTRY_EXTENSION)))
    }

    /// Read only the metadata line of an entry file.
    async fn read_meta(path: &Path) -> SyncResult<Option<EntryMeta>> {
        let file = match fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SyncError::storage("failed to open entry", e)),
        };
        let mut line = Vec::new();
        BufReader::new(file)
            .read_until(b'\n', &mut line)
            .await
            .map_err(|e| SyncError::storage("failed to read entry metadata", e))?;
        if line.pop() != Some(b'\n') {
            return Err(SyncError::Storage {
                message: format!("entry {} has no metadata terminator", path.display()),
            });
        }
        EntryMeta::parse(&line).map(Some)
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, cache: &str) -> SyncResult<()> {
        let dir = keys::cache_dir(&self.root, cache)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| SyncError::storage("failed to create cache directory", e))
    }

    async fn has_cache(&self, cache: &str) -> SyncResult<bool> {
        let dir = keys::cache_dir(&self.root, cache)?;
        Ok(fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false))
    }

    async fn get(&self, cache: &str, key: &str) -> SyncResult<Option<Resource>> {
        let path = self.entry_path(cache, key)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SyncError::storage("failed to read entry", e)),
        };

        let (meta, body) = decode_entry(bytes)?;
        Ok(Some(Resource {
            status: meta.status,
            headers: meta.headers,
            body,
        }))
    }

    async fn put(&self, cache: &str, key: &str, resource: &Resource) -> SyncResult<()> {
        self.open(cache).await?;
        let path = self.entry_path(cache, key)?;

        let meta = EntryMeta {
            key: key.to_string(),
            status: resource.status,
            headers: resource.headers.clone(),
            stored_at: Utc::now(),
        };
        io::write_atomic(&path, encode_entry(&meta, &resource.body)?).await?;

        debug!(cache, key, "stored entry");
        Ok(())
    }

    async fn delete(&self, cache: &str, key: &str) -> SyncResult<bool> {
        let path = self.entry_path(cache, key)?;
        io::remove_if_exists(&path).await
    }

    async fn keys(&self, cache: &str) -> SyncResult<Vec<String>> {
        let dir = keys::cache_dir(&self.root, cache)?;
        let mut result = Vec::new();

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(result),
            Err(e) => return Err(SyncError::storage("failed to read cache directory", e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SyncError::storage("failed to read directory entry", e))?
        {
            let path = entry.path();
            // Skips in-flight temp files.
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            if let Some(meta) = Self::read_meta(&path).await? {
                result.push(meta.key);
            }
        }

        result.sort();
        Ok(result)
    }

    async fn delete_cache(&self, cache: &str) -> SyncResult<bool> {
        let dir = keys::cache_dir(&self.root, cache)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(cache, "deleted cache");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SyncError::storage("failed to delete cache", e)),
        }
    }
}
