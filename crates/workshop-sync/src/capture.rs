//! Capture layer.
//!
//! Turns a submitted form into a stored record. The record is written to the
//! local store first; the immediate sync and search refresh that follow are
//! best effort, so a user offline still keeps what they entered.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::record::{Collection, Fields, Record};
use crate::remote::{BatchReply, RemoteService, SearchResults};
use crate::storage::LocalStore;
use crate::sync::SyncCoordinator;

/// What happened to a submitted form.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureReceipt {
    /// The record as stored locally.
    pub record: Record,
    /// Collection the record went into.
    pub collection: Collection,
    /// The remote answer, if the immediate sync got through.
    pub synced: Option<BatchReply>,
    /// Fresh search results for the record's key, if the lookup succeeded.
    pub search: Option<SearchResults>,
}

impl CaptureReceipt {
    /// The key (serial or code) the record was filed under.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.record.primary_key(self.collection)
    }

    /// Check if the remote service accepted the immediate sync.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.synced.as_ref().is_some_and(BatchReply::is_delivered)
    }
}

/// Entry point for submitted forms.
pub struct CaptureService {
    store: LocalStore,
    coordinator: Arc<SyncCoordinator>,
    remote: Arc<dyn RemoteService>,
}

impl fmt::Debug for CaptureService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureService")
            .field("store", &self.store)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl CaptureService {
    /// Create a capture service.
    #[must_use]
    pub fn new(
        store: LocalStore,
        coordinator: Arc<SyncCoordinator>,
        remote: Arc<dyn RemoteService>,
    ) -> Self {
        Self {
            store,
            coordinator,
            remote,
        }
    }

    /// Store a submitted form, then try to sync it and refresh its search.
    ///
    /// Values are trimmed before storing. The primary key (`serial` for
    /// engine collections, `code` for generator collections) must be present.
    /// The immediate sync asks for the key's search results in its reply; a
    /// separate lookup is made only when the reply does not carry them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPrimaryKey`] before anything is stored if the
    /// key is blank, or a storage error if the record could not be saved.
    /// Sync and search failures are logged and reported as `None` in the
    /// receipt.
    pub async fn submit(&self, collection: Collection, fields: Fields) -> Result<CaptureReceipt> {
        let fields = normalize(fields);
        let key_field = collection.key_field();
        let key = match fields.get(key_field) {
            Some(key) if !key.is_empty() => key.clone(),
            _ => {
                return Err(Error::MissingPrimaryKey {
                    collection,
                    field: key_field,
                })
            }
        };

        let record = self.store.add(collection, fields).await?;
        info!("Captured {} record for {}", collection, key);

        let synced = match self
            .coordinator
            .sync_one(collection, record.fields.clone(), Some(key.clone()))
            .await
        {
            Ok(reply) => {
                debug!("Immediate sync answered delivered={}", reply.is_delivered());
                Some(reply)
            }
            Err(err) => {
                warn!("Immediate sync failed, record stays queued: {}", err);
                None
            }
        };

        let search = match synced.as_ref().and_then(BatchReply::search) {
            Some(results) => Some(results.clone()),
            None => match self.remote.search(&key).await {
                Ok(results) => Some(results),
                Err(err) => {
                    warn!("Search refresh for {} failed: {}", key, err);
                    None
                }
            },
        };

        Ok(CaptureReceipt {
            record,
            collection,
            synced,
            search,
        })
    }
}

/// Trim every value.
fn normalize(fields: Fields) -> Fields {
    fields
        .into_iter()
        .map(|(name, value)| (name, value.trim().to_string()))
        .collect()
}
