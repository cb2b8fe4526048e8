use crate::error::Result;
use crate::model::{ContactRecord, PendingWrite};
use std::collections::HashMap;

/// Abstract interface for raw table I/O.
/// This trait handles the "how" of storage (filesystem vs memory),
/// while CardStore handles the "what" (owner scoping, ordering, queue rules).
pub trait StorageBackend: Send + Sync {
    // --- Cache Table ---

    /// Load every cached record, keyed by record id.
    fn load_cache(&self) -> Result<HashMap<String, ContactRecord>>;

    /// Replace the cache table.
    /// MUST be atomic: readers see either the old or the new table, never a mix.
    fn save_cache(&self, cache: &HashMap<String, ContactRecord>) -> Result<()>;

    // --- Pending Queue Table ---

    /// Load the pending queue in enqueue order.
    fn load_pending(&self) -> Result<Vec<PendingWrite>>;

    /// Replace the pending queue. Same atomicity rule as `save_cache`.
    fn save_pending(&self, pending: &[PendingWrite]) -> Result<()>;
}
