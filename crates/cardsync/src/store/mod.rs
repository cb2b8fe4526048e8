//! # Local Durable Store
//!
//! This module defines the on-device persistence layer. The [`LocalStore`]
//! trait is what the facade and the sync engine program against.
//!
//! ## Two Tables
//!
//! 1. **Cache**: contact records for offline viewing, keyed by record id and
//!    scoped by owner.
//! 2. **Pending queue**: creations the remote store has not confirmed yet,
//!    kept in enqueue order.
//!
//! The tables are independent: a queued creation also has a cached
//! placeholder under the same local-pending id, but removing one never
//! implicitly removes the other.
//!
//! ## Transactions
//!
//! Every operation is one load-modify-save, serialized by the store against
//! every other operation. Backends write whole tables atomically, so a
//! concurrent reader never observes a half-replaced owner set. The facade and
//! the sync engine share one store: anything that reads a table and writes
//! back a decision based on it goes through a single operation
//! ([`LocalStore::merge_remote`], [`LocalStore::confirm_pending`],
//! [`LocalStore::abandon_pending`]) so a concurrent drain cannot be undone.
//!
//! ## Failure Semantics
//!
//! Backend failures surface as [`CardError::LocalStorageUnavailable`]. They are
//! never swallowed: there is no fallback below local storage.
//!
//! ## Implementations
//!
//! - [`fs::FileCardStore`]: JSON tables in a data directory.
//! - [`memory::InMemoryCardStore`]: for testing logic without filesystem I/O.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//! ├── cache.json      # id -> ContactRecord
//! └── pending.json    # [PendingWrite] in enqueue order
//! ```
//!
//! [`CardError::LocalStorageUnavailable`]: crate::error::CardError::LocalStorageUnavailable

use crate::error::Result;
use crate::model::{ContactRecord, NewContact, PendingWrite};

pub mod backend;
pub mod card_store;
pub mod fs;
pub mod fs_backend;
pub mod mem_backend;
pub mod memory;

/// Per-device, per-owner record cache plus the pending-write queue.
pub trait LocalStore: Send + Sync {
    /// Replace the owner's cached set. Other owners are untouched.
    fn cache_all(&self, owner_id: &str, records: &[ContactRecord]) -> Result<()>;

    /// Insert or replace a single record by id.
    fn cache_one(&self, record: &ContactRecord) -> Result<()>;

    /// The owner's cached records, newest first.
    fn get_cached(&self, owner_id: &str) -> Result<Vec<ContactRecord>>;

    /// Remove a cached record. Removing a missing id is not an error.
    fn delete_cached(&self, id: &str) -> Result<()>;

    /// Append a creation to the queue under a fresh local-pending id.
    fn enqueue_pending(&self, owner_id: &str, payload: &NewContact) -> Result<PendingWrite>;

    /// Queued writes in enqueue order, optionally for a single owner.
    fn list_pending(&self, owner_id: Option<&str>) -> Result<Vec<PendingWrite>>;

    /// Remove a queued write. Returns whether it was present.
    fn dequeue_pending(&self, pending_id: &str) -> Result<bool>;

    /// Record a failed attempt. Returns the new count, or `None` if the
    /// write is no longer queued.
    fn bump_attempt(&self, pending_id: &str) -> Result<Option<u32>>;

    /// Replace the payload of a queued write. Returns whether it was present.
    fn amend_pending(&self, pending_id: &str, payload: &NewContact) -> Result<bool>;

    /// Replace the owner's cached set with a fresh remote listing, in one
    /// transaction.
    ///
    /// Cached local-pending records the listing does not contain survive when
    /// their write is still queued or they are marked local-only; any other
    /// local-pending record is stale and dropped. Cached previews carry over
    /// to remote records that lack one. Returns the remote records followed
    /// by the surviving local-pending ones, newest first.
    fn merge_remote(&self, owner_id: &str, remote: Vec<ContactRecord>)
        -> Result<Vec<ContactRecord>>;

    /// Record that a queued write reached the remote store as `confirmed`.
    ///
    /// The write is dequeued before the cache is touched, so a failing cache
    /// write can never cause a second upload. Returns whether it was queued.
    fn confirm_pending(&self, pending_id: &str, confirmed: &ContactRecord) -> Result<bool>;

    /// Give up on a queued write: mark its cached placeholder local-only,
    /// then dequeue it. Returns whether it was queued.
    fn abandon_pending(&self, pending_id: &str) -> Result<bool>;
}
