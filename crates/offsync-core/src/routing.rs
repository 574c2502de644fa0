//! Mapping between request URLs and resource keys.

use crate::config::SyncConfig;

/// Normalize a request URL to a resource key.
///
/// Returns `None` for URLs outside the configured origin. The bare origin,
/// fragment-only paths (`origin/#...`) and an empty path map to the root
/// key. Everything from the cache-busting marker onward is dropped.
pub fn normalize_key(url: &str, config: &SyncConfig) -> Option<String> {
    let origin = config.origin.as_str();

    if url == origin || url.starts_with(&format!("{}/#", origin)) {
        return Some(config.root_key.clone());
    }

    let key = url.strip_prefix(origin)?.strip_prefix('/')?;
    let key = match key.find(config.cache_bust_marker.as_str()) {
        Some(idx) if !config.cache_bust_marker.is_empty() => &key[..idx],
        _ => key,
    };

    if key.is_empty() {
        Some(config.root_key.clone())
    } else {
        Some(key.to_string())
    }
}

/// Absolute URL for a resource key.
pub fn resource_url(key: &str, config: &SyncConfig) -> String {
    if key == config.root_key {
        format!("{}/", config.origin)
    } else {
        format!("{}/{}", config.origin, key)
    }
}
