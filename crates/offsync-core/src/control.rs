//! Out-of-band control commands.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::cache::ContentCache;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::network::Fetcher;
use crate::routing::resource_url;
use crate::types::{FetchRequest, Manifest};

/// Commands accepted on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Activate a waiting version now; affected pages reload themselves.
    SkipWaiting,

    /// Fetch every manifest resource not yet cached.
    DownloadOffline,
}

impl ControlCommand {
    pub const SKIP_WAITING: &'static str = "skipWaiting";
    pub const DOWNLOAD_OFFLINE: &'static str = "downloadOffline";

    /// Parse a message token. Unknown tokens yield `None`.
    pub fn parse(message: &str) -> Option<Self> {
        match message {
            Self::SKIP_WAITING => Some(Self::SkipWaiting),
            Self::DOWNLOAD_OFFLINE => Some(Self::DownloadOffline),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SkipWaiting => Self::SKIP_WAITING,
            Self::DownloadOffline => Self::DOWNLOAD_OFFLINE,
        }
    }
}

impl std::fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What handling a control message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Message not recognized.
    Ignored,

    /// Host asked to activate immediately.
    SkippedWaiting,

    /// Offline download ran.
    Filled(FillReport),
}

/// Summary of a fill-remaining run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Resources fetched and stored.
    pub fetched: Vec<String>,

    /// Resources already cached, left untouched.
    pub skipped: usize,

    /// Resources that could not be fetched, with the reason.
    pub failed: Vec<(String, String)>,
}

impl FillReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fetch and store every manifest key missing from the content cache.
///
/// Best-effort: successes are kept even when other keys fail, and nothing
/// is rolled back. Running it again only retries what is still missing.
pub async fn fill_remaining(
    content: &ContentCache,
    manifest: &Manifest,
    fetcher: &dyn Fetcher,
    config: &SyncConfig,
) -> SyncResult<FillReport> {
    let present: HashSet<String> = content.keys().await?.into_iter().collect();
    let mut report = FillReport::default();

    for key in manifest.keys() {
        if present.contains(key) {
            report.skipped += 1;
            continue;
        }

        let request = FetchRequest::get(resource_url(key, config));
        match fetcher.fetch(&request).await {
            Ok(resource) if resource.is_success() => match content.put(key, &resource).await {
                Ok(()) => {
                    debug!(key, "downloaded for offline use");
                    report.fetched.push(key.to_string());
                }
                Err(err) => {
                    warn!(key, error = %err, "failed to store offline copy");
                    report.failed.push((key.to_string(), err.to_string()));
                }
            },
            Ok(resource) => {
                let err = SyncError::Http {
                    key: key.to_string(),
                    status: resource.status,
                };
                report.failed.push((key.to_string(), err.to_string()));
            }
            Err(err) => {
                report.failed.push((key.to_string(), err.to_string()));
            }
        }
    }

    if report.is_complete() {
        info!(
            fetched = report.fetched.len(),
            skipped = report.skipped,
            "offline download complete"
        );
    } else {
        warn!(
            fetched = report.fetched.len(),
            skipped = report.skipped,
            failed = report.failed.len(),
            "offline download incomplete"
        );
    }

    Ok(report)
}
