//! Error types for the cache synchronizer.

/// Synchronizer errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Origin unreachable or the transfer failed mid-flight.
    #[error("network error: {message}")]
    Network { message: String },

    /// Origin answered with a non-success status where success was required.
    #[error("HTTP {status} for {key}")]
    Http { key: String, status: u16 },

    /// Shell resource could not be staged.
    #[error("staging failed for {key}: {reason}")]
    Staging { key: String, reason: String },

    /// Cache storage read/write failure.
    #[error("storage error: {message}")]
    Storage { message: String },

    /// Manifest could not be parsed, serialized or validated.
    #[error("manifest error: {message}")]
    Manifest { message: String },

    /// Activation could not bring the content cache in line with the manifest.
    #[error("reconciliation failed: {message}")]
    Reconciliation { message: String },

    /// Request cannot be intercepted.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl SyncError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 1,
            Self::Manifest { .. } => 1,
            Self::InvalidRequest { .. } => 1,

            // Network/transient
            Self::Network { .. } => 3,
            Self::Http { .. } => 3,
            Self::Staging { .. } => 3,

            // Local state
            Self::Storage { .. } => 4,
            Self::Reconciliation { .. } => 4,
        }
    }

    /// Whether the error means the origin could not be reached.
    ///
    /// Only these errors let the online-first policy fall back to the cache.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Storage {
            message: format!("{}: {}", context, err),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for synchronizer operations.
pub type SyncResult<T> = Result<T, SyncError>;
