//! Cache and entry path derivation for disk storage.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{SyncError, SyncResult};

/// Directory of a named cache. Names are single path components.
pub(crate) fn cache_dir(root: &Path, cache: &str) -> SyncResult<PathBuf> {
    let valid = !cache.is_empty()
        && cache != "."
        && cache != ".."
        && !cache.contains(['/', '\\'])
        && !cache.starts_with('.');
    if !valid {
        return Err(SyncError::Storage {
            message: format!("invalid cache name: {:?}", cache),
        });
    }
    Ok(root.join(cache))
}

/// File stem of an entry: hex SHA-256 of the key, so any key is a safe file name.
pub(crate) fn entry_stem(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}
