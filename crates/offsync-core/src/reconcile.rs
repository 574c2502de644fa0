//! Activation-time reconciliation of the content cache with a new manifest.
//!
//! One run per activation:
//!
//! ```text
//! START -> NO_PRIOR_MANIFEST | HAS_PRIOR_MANIFEST -> MERGE -> PUBLISH -> DONE
//!   any step -> ERROR (content cache, staging area and manifest store wiped)
//! ```
//!
//! Retention trusts the prior manifest: an entry survives when its key is in
//! both manifests with the same fingerprint. Stored bytes are never rehashed.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::cache::ContentCache;
use crate::error::{SyncError, SyncResult};
use crate::host::HostRuntime;
use crate::manifest_store::ManifestStore;
use crate::staging::StagingCache;
use crate::types::Manifest;

/// Reconciliation states, reported in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Start,
    NoPriorManifest,
    HasPriorManifest,
    Merge,
    Publish,
    Done,
    Error,
}

/// How an activation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// No prior manifest: content cache rebuilt from the staged shell.
    Rebuilt { promoted: usize },

    /// Prior manifest found: unchanged entries kept, the rest evicted.
    Upgraded {
        retained: usize,
        evicted: usize,
        promoted: usize,
    },

    /// Reconciliation failed and all state was wiped.
    Wiped { error: String },
}

impl ActivationOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Wiped { .. })
    }

    /// `Wiped` becomes a [`SyncError::Reconciliation`]; other outcomes pass.
    pub fn into_result(self) -> SyncResult<Self> {
        match self {
            Self::Wiped { error } => Err(SyncError::Reconciliation { message: error }),
            outcome => Ok(outcome),
        }
    }
}

impl std::fmt::Display for ActivationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rebuilt { promoted } => {
                write!(f, "rebuilt content cache: promoted {}", promoted)
            }
            Self::Upgraded {
                retained,
                evicted,
                promoted,
            } => write!(
                f,
                "upgraded content cache: retained {}, evicted {}, promoted {}",
                retained, evicted, promoted
            ),
            Self::Wiped { error } => write!(f, "caches wiped: {}", error),
        }
    }
}

/// Diff-and-merge engine run once per activation.
pub struct ReconciliationEngine {
    content: ContentCache,
    staging: StagingCache,
    manifests: ManifestStore,
    host: Arc<dyn HostRuntime>,
}

impl ReconciliationEngine {
    pub fn new(
        content: ContentCache,
        staging: StagingCache,
        manifests: ManifestStore,
        host: Arc<dyn HostRuntime>,
    ) -> Self {
        Self {
            content,
            staging,
            manifests,
            host,
        }
    }

    /// Run one activation against `manifest`.
    ///
    /// On failure nothing is repaired: [`Self::recover`] wipes everything so
    /// the next activation starts from scratch.
    pub async fn run(&self, manifest: &Manifest) -> ActivationOutcome {
        trace_state(ActivationState::Start);
        match self.reconcile(manifest).await {
            Ok(outcome) => {
                trace_state(ActivationState::Done);
                self.claim_clients().await;
                outcome
            }
            Err(err) => {
                trace_state(ActivationState::Error);
                error!(error = %err, "reconciliation failed, wiping caches");
                self.recover().await;
                ActivationOutcome::Wiped {
                    error: err.to_string(),
                }
            }
        }
    }

    async fn reconcile(&self, manifest: &Manifest) -> SyncResult<ActivationOutcome> {
        match self.manifests.load_persisted().await? {
            None => {
                trace_state(ActivationState::NoPriorManifest);
                // Prior content state is unknown; start from an empty cache.
                self.content.reset().await?;
                let promoted = self.merge_and_publish(manifest).await?;
                info!(promoted, "activated without prior manifest");
                Ok(ActivationOutcome::Rebuilt { promoted })
            }
            Some(prior) => {
                trace_state(ActivationState::HasPriorManifest);
                let (retained, evicted) = self.evict_changed(&prior, manifest).await?;
                let promoted = self.merge_and_publish(manifest).await?;
                info!(retained, evicted, promoted, "activated upgrade");
                Ok(ActivationOutcome::Upgraded {
                    retained,
                    evicted,
                    promoted,
                })
            }
        }
    }

    /// Evict entries whose key left the manifest or whose fingerprint changed
    /// since the prior manifest. Returns `(retained, evicted)`.
    async fn evict_changed(&self, prior: &Manifest, next: &Manifest) -> SyncResult<(usize, usize)> {
        let mut retained = 0;
        let mut evicted = 0;

        for key in self.content.keys().await? {
            let keep = match next.fingerprint(&key) {
                Some(fingerprint) => prior.fingerprint(&key) == Some(fingerprint),
                None => false,
            };

            if keep {
                retained += 1;
            } else {
                debug!(key = %key, "fingerprint changed or resource removed");
                self.content.evict(&key).await?;
                evicted += 1;
            }
        }

        Ok((retained, evicted))
    }

    /// Promote staged entries over the content cache, drop the staging area
    /// and persist the manifest. Returns the number of promoted entries.
    async fn merge_and_publish(&self, manifest: &Manifest) -> SyncResult<usize> {
        trace_state(ActivationState::Merge);
        let mut promoted = 0;
        for key in self.staging.keys().await? {
            if let Some(resource) = self.staging.get(&key).await? {
                self.content.put(&key, &resource).await?;
                promoted += 1;
            }
        }
        self.staging.discard().await?;

        trace_state(ActivationState::Publish);
        self.manifests.save(manifest).await?;
        Ok(promoted)
    }

    async fn claim_clients(&self) {
        // The caches are already consistent here; failing to claim only means
        // open pages start using them on their next navigation.
        if let Err(err) = self.host.claim_clients().await {
            warn!(error = %err, "failed to claim clients");
        }
    }

    /// Delete the content cache, the staging area and the persisted manifest.
    ///
    /// Best-effort: every deletion is attempted even if an earlier one fails.
    pub async fn recover(&self) {
        if let Err(err) = self.content.delete().await {
            error!(error = %err, cache = %self.content.name(), "failed to delete content cache");
        }
        if let Err(err) = self.staging.discard().await {
            error!(error = %err, "failed to delete staging area");
        }
        if let Err(err) = self.manifests.delete().await {
            error!(error = %err, "failed to delete manifest store");
        }
    }
}

fn trace_state(state: ActivationState) {
    debug!(state = ?state, "reconciliation");
}
