//! Sync coordinator.
//!
//! Moves locally captured records to the remote service. A full drain stages
//! every pending record into the in-flight queue in one transaction, submits
//! them as a single batch, then settles or restores the queue depending on the
//! outcome and the configured [`FailurePolicy`].

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::record::{Collection, Fields};
use crate::remote::{BatchReply, RemoteService, SyncBatch};
use crate::storage::LocalStore;

/// What happens to a staged batch the remote service did not accept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Put the records back into their collections for the next attempt.
    #[default]
    Requeue,
    /// Drop the records locally.
    Discard,
}

impl From<&SyncConfig> for FailurePolicy {
    fn from(config: &SyncConfig) -> Self {
        if config.requeue_on_failure {
            Self::Requeue
        } else {
            Self::Discard
        }
    }
}

/// Result of a full drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Every collection was empty; no request was made.
    NothingToSync,
    /// The remote service accepted the batch.
    Synced {
        /// Records submitted.
        sent: usize,
        /// Records the service reports as saved; `sent` when it gave no count.
        saved: u64,
    },
    /// The batch was not accepted.
    Failed {
        /// Records submitted.
        sent: usize,
        /// Records put back into their collections.
        requeued: usize,
        /// Why the batch failed.
        reason: String,
    },
}

impl SyncOutcome {
    /// Check if the drain ended without an error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// A one-line notification for the user.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::NothingToSync => "Nothing to sync".to_string(),
            Self::Synced { sent, saved } => {
                format!("Synced {sent} record(s); remote saved {saved}")
            }
            Self::Failed {
                sent,
                requeued,
                reason,
            } => {
                if *requeued > 0 {
                    format!(
                        "Sync failed: {reason} ({requeued} of {sent} record(s) kept for retry)"
                    )
                } else {
                    format!("Sync failed: {reason} ({sent} record(s) discarded)")
                }
            }
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Coordinates full and immediate syncs against the remote service.
pub struct SyncCoordinator {
    store: LocalStore,
    remote: Arc<dyn RemoteService>,
    policy: FailurePolicy,
    drain_lock: Mutex<()>,
}

impl fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl SyncCoordinator {
    /// Create a coordinator over a store and a remote service.
    #[must_use]
    pub fn new(store: LocalStore, remote: Arc<dyn RemoteService>, policy: FailurePolicy) -> Self {
        Self {
            store,
            remote,
            policy,
            drain_lock: Mutex::new(()),
        }
    }

    /// Drain every collection and submit the records as one batch.
    ///
    /// Remote failures are reported through [`SyncOutcome::Failed`], not as
    /// errors. Concurrent calls run one after another.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local store fails.
    pub async fn sync_all(&self) -> Result<SyncOutcome> {
        let _guard = self.drain_lock.lock().await;

        let staged = self.store.stage_all().await?;
        if staged.is_empty() {
            debug!("Nothing pending; skipping sync");
            return Ok(SyncOutcome::NothingToSync);
        }

        let sent = staged.len();
        let mut batch = SyncBatch::default();
        let mut queue_ids = Vec::with_capacity(sent);
        for entry in staged {
            queue_ids.push(entry.queue_id);
            batch.push(entry.collection, entry.record);
        }

        info!("Submitting {} record(s)", sent);
        let reason = match self.remote.submit_batch(&batch).await {
            Ok(reply) if reply.is_delivered() => {
                self.store.settle(queue_ids).await?;
                let saved = reply.saved().unwrap_or(sent as u64);
                info!("Sync complete: {} sent, {} saved", sent, saved);
                return Ok(SyncOutcome::Synced { sent, saved });
            }
            Ok(_) => "remote service rejected the batch".to_string(),
            Err(err) => err.to_string(),
        };

        warn!("Sync of {} record(s) failed: {}", sent, reason);
        let requeued = match self.policy {
            FailurePolicy::Requeue => self.store.restore(queue_ids).await?,
            FailurePolicy::Discard => {
                self.store.settle(queue_ids).await?;
                0
            }
        };

        Ok(SyncOutcome::Failed {
            sent,
            requeued,
            reason,
        })
    }

    /// Submit the values of one just-captured record without touching the store.
    ///
    /// The record already sits in its collection, so a failure here leaves it
    /// for the next full drain. With a `return_key` the service answers with
    /// the search results for that key.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or gets a non-success status.
    pub async fn sync_one(
        &self,
        collection: Collection,
        fields: Fields,
        return_key: Option<String>,
    ) -> Result<BatchReply> {
        let batch = SyncBatch::single(collection, fields, return_key);
        self.remote.submit_batch(&batch).await
    }
}
