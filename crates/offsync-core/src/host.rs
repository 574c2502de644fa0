//! Hosting runtime seam and lifecycle contract.

use async_trait::async_trait;
use tracing::debug;

use crate::control::MessageOutcome;
use crate::error::SyncResult;
use crate::interceptor::Interception;
use crate::reconcile::ActivationOutcome;
use crate::types::FetchRequest;

/// Operations the synchronizer asks of the runtime hosting it.
#[async_trait]
pub trait HostRuntime: Send + Sync {
    /// Take control of already-open clients so they route through this instance.
    async fn claim_clients(&self) -> SyncResult<()>;

    /// Activate this instance without waiting for old clients to close.
    async fn skip_waiting(&self) -> SyncResult<()>;
}

/// Host with nothing to claim or skip, for standalone use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHost;

#[async_trait]
impl HostRuntime for NoopHost {
    async fn claim_clients(&self) -> SyncResult<()> {
        debug!("claim_clients: no clients attached");
        Ok(())
    }

    async fn skip_waiting(&self) -> SyncResult<()> {
        debug!("skip_waiting: nothing waiting");
        Ok(())
    }
}

/// Lifecycle callbacks the host invokes. Each call completes before the host
/// treats the event as settled.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Stage the shell. An error aborts the install.
    async fn on_install(&self) -> SyncResult<usize>;

    /// Reconcile the content cache with the current manifest. Never fails;
    /// failures are reported in the outcome after a full wipe.
    async fn on_activate(&self) -> ActivationOutcome;

    /// Decide how a request is answered.
    async fn on_fetch(&self, request: &FetchRequest) -> SyncResult<Interception>;

    /// Handle an out-of-band control message.
    async fn on_message(&self, message: &str) -> SyncResult<MessageOutcome>;
}
