//! Filesystem helpers for disk storage.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::fs;

use crate::error::{SyncError, SyncResult};

/// Write `content` to a fresh temp file in the target's directory, then
/// rename it over `path`.
///
/// Every call gets its own temp file, so concurrent writers to the same path
/// never share one: readers see one complete version or the other.
pub(crate) async fn write_atomic(path: &Path, content: Vec<u8>) -> SyncResult<()> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &content))
        .await
        .map_err(|e| SyncError::storage("atomic write task failed", e))?
}

fn write_atomic_blocking(path: &Path, content: &[u8]) -> SyncResult<()> {
    let dir = path.parent().ok_or_else(|| SyncError::Storage {
        message: format!("no parent directory for {}", path.display()),
    })?;

    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| SyncError::storage("failed to create temp file", e))?;
    temp.write_all(content)
        .map_err(|e| SyncError::storage("failed to write temp file", e))?;
    temp.as_file()
        .sync_data()
        .map_err(|e| SyncError::storage("failed to flush temp file", e))?;
    temp.persist(path)
        .map_err(|e| SyncError::storage("failed to rename temp file", e.error))?;

    Ok(())
}

/// Remove a file, treating "not found" as success. Returns whether it existed.
pub(crate) async fn remove_if_exists(path: &Path) -> SyncResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(SyncError::storage("failed to remove file", e)),
    }
}
