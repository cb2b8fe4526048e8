//! # API Facade
//!
//! [`CardsApi`] is the single entry point the UI talks to. It hides whether
//! the remote store is reachable: every operation either reaches the remote
//! store and mirrors the result into the local store, or falls back to the
//! local store and says so.
//!
//! ## Routing
//!
//! | Operation | Connected | Offline / remote failed |
//! |-----------|-----------|-------------------------|
//! | `save` | remote create, cache confirmed | queue + cache placeholder |
//! | `list` | remote listing merged with local-only records, re-cached | cached records |
//! | `update` | remote update, re-cache | re-cache, `NotSynced` |
//! | `delete` | remote delete, uncache | uncache, `NotSynced` |
//!
//! ## Local-Pending Ids
//!
//! A record whose id carries the local-pending prefix does not exist remotely
//! yet. Operations on it never reach the remote store, whatever the
//! connectivity:
//!
//! - `delete` drops the cached placeholder and the queued write.
//! - `update` rewrites the queued payload and the cached placeholder, then
//!   reports `NotSynced` with [`NotSyncedReason::PendingCreate`]. A
//!   placeholder whose write already synced is not cached again.
//!
//! ## Failure Mapping
//!
//! A save never fails because of the remote store: a remote error turns into
//! a queued save. Updates and deletes only fall back locally on a transport
//! failure; a rejection by the remote store is returned untouched and leaves
//! the local store as it was.
//!
//! ## Generic Over Stores
//!
//! `CardsApi<L, R>` is generic over both stores:
//! - Production: `CardsApi<FileCardStore, DirRemote>`
//! - Testing: `CardsApi<InMemoryCardStore, MemRemote>`

use crate::connectivity::Connectivity;
use crate::duplicates::find_duplicates;
use crate::error::{CardError, NotSyncedReason, Result};
use crate::model::{is_pending_id, ContactFields, ContactRecord, NewContact, PendingWrite};
use crate::remote::RemoteStore;
use crate::store::LocalStore;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueReason {
    /// The device reported no connectivity.
    Offline,
    /// Connected, but the remote create failed.
    RemoteFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Synced,
    Queued { reason: QueueReason },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    /// The confirmed record, or the cached placeholder when queued.
    pub record: ContactRecord,
    pub status: SaveStatus,
}

impl SaveOutcome {
    pub fn is_synced(&self) -> bool {
        self.status == SaveStatus::Synced
    }
}

fn require_owner(owner_id: &str) -> Result<()> {
    if owner_id.trim().is_empty() {
        return Err(CardError::InvalidArgument("owner id is empty".to_string()));
    }
    Ok(())
}

fn require_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(CardError::InvalidArgument("record id is empty".to_string()));
    }
    Ok(())
}

pub struct CardsApi<L: LocalStore, R: RemoteStore> {
    local: Arc<L>,
    remote: Arc<R>,
    connectivity: Arc<dyn Connectivity>,
}

impl<L: LocalStore, R: RemoteStore> CardsApi<L, R> {
    pub fn new(local: Arc<L>, remote: Arc<R>, connectivity: Arc<dyn Connectivity>) -> Self {
        Self {
            local,
            remote,
            connectivity,
        }
    }

    pub fn local(&self) -> &Arc<L> {
        &self.local
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    pub fn is_connected(&self) -> bool {
        self.connectivity.is_connected()
    }

    pub fn save(&self, owner_id: &str, contact: NewContact) -> Result<SaveOutcome> {
        require_owner(owner_id)?;
        let contact = contact.stamped();

        if !self.is_connected() {
            return self.queue_save(owner_id, &contact, QueueReason::Offline);
        }

        match self.remote.create(owner_id, &contact) {
            Ok(mut record) => {
                if record.preview.is_none() {
                    record.preview = contact.preview.clone();
                }
                self.local.cache_one(&record)?;
                tracing::debug!(id = %record.id, "contact saved remotely");
                Ok(SaveOutcome {
                    record,
                    status: SaveStatus::Synced,
                })
            }
            Err(err) => {
                tracing::warn!(error = %err, "remote save failed; queueing");
                self.queue_save(owner_id, &contact, QueueReason::RemoteFailed)
            }
        }
    }

    fn queue_save(
        &self,
        owner_id: &str,
        contact: &NewContact,
        reason: QueueReason,
    ) -> Result<SaveOutcome> {
        let write = self.local.enqueue_pending(owner_id, contact)?;
        let record = write.placeholder();
        self.local.cache_one(&record)?;
        tracing::info!(id = %record.id, ?reason, "contact queued for sync");
        Ok(SaveOutcome {
            record,
            status: SaveStatus::Queued { reason },
        })
    }

    /// All contacts of `owner_id`.
    ///
    /// Connected: the remote listing plus every cached local-pending record
    /// still awaiting sync or kept local-only, written back to the cache in
    /// one store transaction. Offline, or when the remote listing fails: the
    /// cached records.
    pub fn list(&self, owner_id: &str) -> Result<Vec<ContactRecord>> {
        require_owner(owner_id)?;
        if !self.is_connected() {
            return self.local.get_cached(owner_id);
        }

        let remote_records = match self.remote.list(owner_id) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(error = %err, "remote listing failed; using cache");
                return self.local.get_cached(owner_id);
            }
        };

        self.local.merge_remote(owner_id, remote_records)
    }

    pub fn delete(&self, owner_id: &str, id: &str) -> Result<()> {
        require_owner(owner_id)?;
        require_id(id)?;

        if is_pending_id(id) {
            self.local.dequeue_pending(id)?;
            self.local.delete_cached(id)?;
            tracing::debug!(id, "local-pending contact discarded");
            return Ok(());
        }

        if self.is_connected() {
            match self.remote.delete(owner_id, id) {
                Ok(()) => return self.local.delete_cached(id),
                Err(CardError::RemoteUnavailable(msg)) => {
                    tracing::warn!(id, error = %msg, "remote delete failed; deleting locally");
                }
                Err(err) => return Err(err),
            }
        }

        self.local.delete_cached(id)?;
        Err(CardError::NotSynced {
            id: id.to_string(),
            reason: NotSyncedReason::Offline,
        })
    }

    pub fn update(&self, owner_id: &str, record: &ContactRecord) -> Result<ContactRecord> {
        require_owner(owner_id)?;
        require_id(&record.id)?;
        if record.owner_id != owner_id {
            return Err(CardError::InvalidArgument(format!(
                "record {} belongs to another owner",
                record.id
            )));
        }

        if record.is_pending() {
            let queued = self.local.amend_pending(&record.id, &record.to_new_contact())?;
            if queued || record.local_only {
                self.local.cache_one(record)?;
            } else {
                tracing::warn!(id = %record.id, "edited a local-pending record that has already synced");
            }
            return Err(CardError::NotSynced {
                id: record.id.clone(),
                reason: NotSyncedReason::PendingCreate,
            });
        }

        if self.is_connected() {
            match self.remote.update(owner_id, record) {
                Ok(()) => {
                    self.local.cache_one(record)?;
                    return Ok(record.clone());
                }
                Err(CardError::RemoteUnavailable(msg)) => {
                    tracing::warn!(id = %record.id, error = %msg, "remote update failed; updating locally");
                }
                Err(err) => return Err(err),
            }
        }

        self.local.cache_one(record)?;
        Err(CardError::NotSynced {
            id: record.id.clone(),
            reason: NotSyncedReason::Offline,
        })
    }

    /// Existing contacts of `owner_id` that likely match `candidate`.
    ///
    /// The corpus is whatever [`CardsApi::list`] returns, so the check works
    /// the same offline.
    pub fn check_for_duplicates(
        &self,
        owner_id: &str,
        candidate: &ContactFields,
    ) -> Result<Vec<ContactRecord>> {
        let corpus = self.list(owner_id)?;
        Ok(find_duplicates(candidate, &corpus))
    }

    /// Queued writes of `owner_id`, oldest first.
    pub fn pending(&self, owner_id: &str) -> Result<Vec<PendingWrite>> {
        self.local.list_pending(Some(owner_id))
    }

    pub fn pending_count(&self, owner_id: &str) -> Result<usize> {
        Ok(self.pending(owner_id)?.len())
    }
}
