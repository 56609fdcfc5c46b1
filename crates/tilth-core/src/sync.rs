//! Outbox replay against a remote backend
//!
//! The store never talks to the network. A `SyncTarget` does, and
//! `replay_pending` drives it over the outbox in insertion order, marking
//! each change synced only after the target confirms it.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::PendingChange;
use crate::storage::ChangeId;
use crate::store::LocalStore;

/// Remote system that accepts replayed changes
#[async_trait]
pub trait SyncTarget: Send + Sync {
    /// Apply one change remotely. `Ok` means the backend has accepted it
    async fn apply(&self, change: &PendingChange) -> anyhow::Result<()>;
}

/// A change the target rejected
#[derive(Debug)]
pub struct SyncFailure {
    pub change_id: ChangeId,
    pub error: anyhow::Error,
}

/// Outcome of one replay pass
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Changes acknowledged during this pass, in order
    pub applied: Vec<ChangeId>,
    /// Changes left unsynced, including the failed one
    pub remaining: usize,
    pub failure: Option<SyncFailure>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.remaining == 0 && self.failure.is_none()
    }
}

/// Replay unsynced changes oldest first, stopping at the first rejection
///
/// Stopping keeps later changes to the same entity from overtaking an earlier
/// one. Rejected and unattempted changes stay unsynced for the next pass.
/// Storage errors abort the pass and are returned as `Err`.
pub async fn replay_pending<S>(store: &LocalStore, target: &S) -> Result<SyncReport>
where
    S: SyncTarget + ?Sized,
{
    let pending: Vec<PendingChange> = store.get_unsynced_changes().await?;
    let total = pending.len();
    let mut report = SyncReport::default();

    for change in &pending {
        match target.apply(change).await {
            Ok(()) => {
                store.mark_change_as_synced(change.id).await?;
                debug!(id = change.id, table = %change.table, kind = %change.kind, "Change synced");
                report.applied.push(change.id);
            }
            Err(error) => {
                warn!(
                    id = change.id,
                    table = %change.table,
                    "Sync stopped, change rejected: {:#}",
                    error
                );
                report.failure = Some(SyncFailure {
                    change_id: change.id,
                    error,
                });
                break;
            }
        }
    }

    report.remaining = total - report.applied.len();
    Ok(report)
}
