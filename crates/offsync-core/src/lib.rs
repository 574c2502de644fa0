//! Offline resource cache synchronizer.
//!
//! Keeps a named content cache of static assets in sync with a versioned
//! manifest of resource fingerprints, sitting between a web client and its
//! origin:
//!
//! - Install stages the shell resources into a transient staging cache
//! - Activation diffs the persisted manifest against the new one, keeps
//!   unchanged entries, evicts the rest and promotes the staged shell
//! - Requests for manifest resources are served cache-first with lazy fill,
//!   except the root document, which is served online-first
//! - Control messages force activation or download everything for offline use
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use offsync_core::{
//!     Deployment, FetchRequest, HttpFetcher, Lifecycle, MemoryStorage, NoopHost, SyncConfig,
//!     SyncWorker,
//! };
//!
//! # async fn example(deployment: Deployment) -> offsync_core::SyncResult<()> {
//! let config = SyncConfig::from_env();
//! let fetcher = Arc::new(HttpFetcher::new(&config)?);
//! let worker = SyncWorker::new(
//!     config,
//!     deployment,
//!     Arc::new(MemoryStorage::new()),
//!     fetcher,
//!     Arc::new(NoopHost),
//! )?;
//!
//! worker.on_install().await?;
//! worker.on_activate().await;
//!
//! let index = worker
//!     .respond(&FetchRequest::get("http://localhost:8080/"))
//!     .await?;
//! println!("{} bytes", index.body.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `OFFSYNC_ORIGIN` | Origin URL (default: `http://localhost:8080`) |
//! | `OFFSYNC_CONTENT_CACHE` | Content cache name (default: `offsync-app-cache`) |
//! | `OFFSYNC_STAGING_CACHE` | Staging cache name (default: `offsync-temp-cache`) |
//! | `OFFSYNC_MANIFEST_CACHE` | Manifest cache name (default: `offsync-app-manifest`) |
//! | `OFFSYNC_TIMEOUT` | Network timeout in seconds (default: 30) |

pub mod cache;
pub mod config;
pub mod control;
pub mod error;
pub mod host;
pub mod interceptor;
pub mod manifest_store;
pub mod network;
pub mod reconcile;
pub mod routing;
pub mod staging;
pub mod storage;
pub mod types;
pub mod worker;

// Re-export main types
pub use cache::ContentCache;
pub use config::SyncConfig;
pub use control::{fill_remaining, ControlCommand, FillReport, MessageOutcome};
pub use error::{SyncError, SyncResult};
pub use host::{HostRuntime, Lifecycle, NoopHost};
pub use interceptor::{Interception, Interceptor, Route};
pub use manifest_store::{ManifestStore, MANIFEST_KEY};
pub use network::{Fetcher, HttpFetcher, SYNC_USER_AGENT};
pub use reconcile::{ActivationOutcome, ActivationState, ReconciliationEngine};
pub use routing::{normalize_key, resource_url};
pub use staging::StagingCache;
pub use storage::{CacheStorage, DiskStorage, MemoryStorage};
pub use types::{
    Deployment, FetchMode, FetchRequest, Manifest, Resource, ShellSet, ROOT_KEY,
};
pub use worker::{SyncStatus, SyncWorker};
