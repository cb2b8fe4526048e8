//! # Remote Store Adapter
//!
//! The only component allowed to talk to the authoritative collection.
//! Every call is scoped to an owner and is attempted exactly once: retry
//! policy belongs to the sync engine and fallback policy to the facade.
//!
//! ## Identifier Guard
//!
//! Local-pending ids never cross this boundary. `update` and `delete` reject
//! them with [`CardError::InvalidArgument`] before touching the collection,
//! and `create` takes a [`NewContact`], which has no id at all.
//!
//! ## Payload Hygiene
//!
//! Implementations store [`NewContact::for_remote`] /
//! [`ContactRecord::for_remote`] forms: absent values stripped, explicit
//! nulls kept, previews dropped.
//!
//! ## Implementations
//!
//! - [`memory::MemRemote`]: in-process collection with failure injection.
//! - [`dir::DirRemote`]: a collection kept in a shared directory; an
//!   unreachable directory reads as [`CardError::RemoteUnavailable`].

use crate::error::{CardError, Result};
use crate::model::{is_pending_id, ContactRecord, NewContact};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod dir;
pub mod memory;

pub trait RemoteStore: Send + Sync {
    /// Create a record. The server assigns the id; the timestamp is the
    /// client's if present, otherwise the server's clock.
    fn create(&self, owner_id: &str, contact: &NewContact) -> Result<ContactRecord>;

    /// All of the owner's records, most recently updated first.
    fn list(&self, owner_id: &str) -> Result<Vec<ContactRecord>>;

    /// Overwrite a confirmed record.
    fn update(&self, owner_id: &str, record: &ContactRecord) -> Result<()>;

    /// Delete a confirmed record. Deleting a missing record succeeds.
    fn delete(&self, owner_id: &str, id: &str) -> Result<()>;
}

/// A stored document plus the bookkeeping the collection sorts by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RemoteEntry {
    pub record: ContactRecord,
    pub updated_at: DateTime<Utc>,
    /// Write sequence; breaks ties between writes within one clock tick.
    #[serde(default)]
    pub revision: u64,
}

pub(crate) fn ensure_confirmed(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(CardError::InvalidArgument("record id is empty".to_string()));
    }
    if is_pending_id(id) {
        return Err(CardError::InvalidArgument(format!(
            "{} has not been confirmed by the remote store",
            id
        )));
    }
    Ok(())
}

pub(crate) fn new_server_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Most recently updated first.
pub(crate) fn sorted_records(mut entries: Vec<RemoteEntry>) -> Vec<ContactRecord> {
    entries.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| b.revision.cmp(&a.revision))
    });
    entries.into_iter().map(|e| e.record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::new_pending_id;

    #[test]
    fn test_server_ids_never_look_pending() {
        for _ in 0..50 {
            assert!(!is_pending_id(&new_server_id()));
        }
    }

    #[test]
    fn test_pending_ids_are_refused() {
        assert!(matches!(
            ensure_confirmed(&new_pending_id()),
            Err(CardError::InvalidArgument(_))
        ));
        assert!(ensure_confirmed("").is_err());
        assert!(ensure_confirmed("8f14e45f").is_ok());
    }
}
