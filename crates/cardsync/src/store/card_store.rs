use super::backend::StorageBackend;
use super::LocalStore;
use crate::error::{CardError, Result};
use crate::model::{sort_newest_first, ContactRecord, NewContact, PendingWrite};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

pub struct CardStore<B: StorageBackend> {
    /// The underlying storage backend.
    /// Exposed as pub(crate) for testing and internal access only.
    pub(crate) backend: B,
    txn: Mutex<()>,
}

impl<B: StorageBackend> CardStore<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            txn: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Serializes load-modify-save sequences against each other.
    fn transaction(&self) -> Result<MutexGuard<'_, ()>> {
        self.txn.lock().map_err(|_| {
            CardError::LocalStorageUnavailable("store transaction lock poisoned".to_string())
        })
    }

    /// Drop a write from the queue table. Caller holds the transaction.
    fn remove_queued(&self, pending_id: &str) -> Result<bool> {
        let mut pending = self.backend.load_pending()?;
        let before = pending.len();
        pending.retain(|w| w.id != pending_id);
        if pending.len() == before {
            return Ok(false);
        }
        self.backend.save_pending(&pending)?;
        Ok(true)
    }
}

fn ensure_owned(owner_id: &str, records: &[ContactRecord]) -> Result<()> {
    if let Some(foreign) = records.iter().find(|r| r.owner_id != owner_id) {
        return Err(CardError::InvalidArgument(format!(
            "record {} belongs to another owner",
            foreign.id
        )));
    }
    Ok(())
}

impl<B: StorageBackend> LocalStore for CardStore<B> {
    fn cache_all(&self, owner_id: &str, records: &[ContactRecord]) -> Result<()> {
        ensure_owned(owner_id, records)?;

        let _txn = self.transaction()?;
        let mut cache = self.backend.load_cache()?;
        cache.retain(|_, r| r.owner_id != owner_id);
        for record in records {
            cache.insert(record.id.clone(), record.clone());
        }
        self.backend.save_cache(&cache)
    }

    fn cache_one(&self, record: &ContactRecord) -> Result<()> {
        let _txn = self.transaction()?;
        let mut cache = self.backend.load_cache()?;
        cache.insert(record.id.clone(), record.clone());
        self.backend.save_cache(&cache)
    }

    fn get_cached(&self, owner_id: &str) -> Result<Vec<ContactRecord>> {
        let _txn = self.transaction()?;
        let cache = self.backend.load_cache()?;
        let mut records: Vec<ContactRecord> = cache
            .into_values()
            .filter(|r| r.owner_id == owner_id)
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    fn delete_cached(&self, id: &str) -> Result<()> {
        let _txn = self.transaction()?;
        let mut cache = self.backend.load_cache()?;
        if cache.remove(id).is_some() {
            self.backend.save_cache(&cache)?;
        }
        Ok(())
    }

    fn enqueue_pending(&self, owner_id: &str, payload: &NewContact) -> Result<PendingWrite> {
        let write = PendingWrite::new(owner_id, payload.clone());

        let _txn = self.transaction()?;
        let mut pending = self.backend.load_pending()?;
        pending.push(write.clone());
        self.backend.save_pending(&pending)?;
        Ok(write)
    }

    fn list_pending(&self, owner_id: Option<&str>) -> Result<Vec<PendingWrite>> {
        let _txn = self.transaction()?;
        let pending = self.backend.load_pending()?;
        Ok(pending
            .into_iter()
            .filter(|w| owner_id.map_or(true, |owner| w.owner_id == owner))
            .collect())
    }

    fn dequeue_pending(&self, pending_id: &str) -> Result<bool> {
        let _txn = self.transaction()?;
        self.remove_queued(pending_id)
    }

    fn bump_attempt(&self, pending_id: &str) -> Result<Option<u32>> {
        let _txn = self.transaction()?;
        let mut pending = self.backend.load_pending()?;
        let Some(write) = pending.iter_mut().find(|w| w.id == pending_id) else {
            return Ok(None);
        };
        write.attempt_count += 1;
        let count = write.attempt_count;
        self.backend.save_pending(&pending)?;
        Ok(Some(count))
    }

    fn amend_pending(&self, pending_id: &str, payload: &NewContact) -> Result<bool> {
        let _txn = self.transaction()?;
        let mut pending = self.backend.load_pending()?;
        let Some(write) = pending.iter_mut().find(|w| w.id == pending_id) else {
            return Ok(false);
        };
        write.payload = payload.clone();
        self.backend.save_pending(&pending)?;
        Ok(true)
    }

    fn merge_remote(
        &self,
        owner_id: &str,
        remote: Vec<ContactRecord>,
    ) -> Result<Vec<ContactRecord>> {
        ensure_owned(owner_id, &remote)?;
        let remote_ids: HashSet<String> = remote.iter().map(|r| r.id.clone()).collect();

        let _txn = self.transaction()?;
        let queued: HashSet<String> = self
            .backend
            .load_pending()?
            .into_iter()
            .map(|w| w.id)
            .collect();
        let (owned, mut cache): (HashMap<_, _>, HashMap<_, _>) = self
            .backend
            .load_cache()?
            .into_iter()
            .partition(|(_, r)| r.owner_id == owner_id);

        let mut previews: HashMap<String, String> = HashMap::new();
        let mut local_only = Vec::new();
        for (id, record) in owned {
            if record.is_pending() {
                if remote_ids.contains(&id) {
                    continue;
                }
                if queued.contains(&id) || record.local_only {
                    local_only.push(record);
                } else {
                    tracing::debug!(%id, "dropping stale local-pending record");
                }
            } else if let Some(preview) = record.preview {
                previews.insert(id, preview);
            }
        }
        sort_newest_first(&mut local_only);

        let mut merged: Vec<ContactRecord> = remote
            .into_iter()
            .map(|mut record| {
                if record.preview.is_none() {
                    record.preview = previews.remove(&record.id);
                }
                record
            })
            .collect();
        merged.extend(local_only);

        for record in &merged {
            cache.insert(record.id.clone(), record.clone());
        }
        self.backend.save_cache(&cache)?;
        Ok(merged)
    }

    fn confirm_pending(&self, pending_id: &str, confirmed: &ContactRecord) -> Result<bool> {
        let _txn = self.transaction()?;
        let was_queued = self.remove_queued(pending_id)?;

        let mut cache = self.backend.load_cache()?;
        cache.remove(pending_id);
        cache.insert(confirmed.id.clone(), confirmed.clone());
        self.backend.save_cache(&cache)?;
        Ok(was_queued)
    }

    fn abandon_pending(&self, pending_id: &str) -> Result<bool> {
        let _txn = self.transaction()?;
        let mut cache = self.backend.load_cache()?;
        if let Some(placeholder) = cache.get_mut(pending_id) {
            placeholder.local_only = true;
            self.backend.save_cache(&cache)?;
        }
        self.remove_queued(pending_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{is_pending_id, ContactFields, FieldValue};
    use crate::store::mem_backend::MemBackend;
    use chrono::{Duration, Utc};

    fn make_store() -> CardStore<MemBackend> {
        CardStore::with_backend(MemBackend::new())
    }

    fn record(id: &str, owner: &str, name: &str) -> ContactRecord {
        let fields = ContactFields {
            name: name.into(),
            ..Default::default()
        };
        ContactRecord::from_new(id, owner, &NewContact::new(fields))
    }

    fn contact(name: &str) -> NewContact {
        NewContact::new(ContactFields {
            name: name.into(),
            ..Default::default()
        })
    }

    // --- Cache Table ---

    #[test]
    fn test_cache_all_replaces_only_that_owner() {
        let store = make_store();
        store
            .cache_all("alice", &[record("a1", "alice", "A1"), record("a2", "alice", "A2")])
            .unwrap();
        store.cache_all("bob", &[record("b1", "bob", "B1")]).unwrap();

        store.cache_all("alice", &[record("a3", "alice", "A3")]).unwrap();

        let alice = store.get_cached("alice").unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].id, "a3");
        assert_eq!(store.get_cached("bob").unwrap().len(), 1);
    }

    #[test]
    fn test_cache_all_rejects_foreign_owner() {
        let store = make_store();
        let result = store.cache_all("alice", &[record("b1", "bob", "B1")]);
        assert!(matches!(result, Err(CardError::InvalidArgument(_))));
    }

    #[test]
    fn test_cache_one_upserts() {
        let store = make_store();
        store.cache_one(&record("a1", "alice", "Old")).unwrap();
        store.cache_one(&record("a1", "alice", "New")).unwrap();

        let cached = store.get_cached("alice").unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].fields.name.as_str(), Some("New"));
    }

    #[test]
    fn test_get_cached_newest_first() {
        let store = make_store();
        let mut older = record("older", "alice", "Older");
        older.timestamp = Utc::now() - Duration::days(2);
        let newer = record("newer", "alice", "Newer");
        store.cache_one(&older).unwrap();
        store.cache_one(&newer).unwrap();

        let cached = store.get_cached("alice").unwrap();
        assert_eq!(cached[0].id, "newer");
        assert_eq!(cached[1].id, "older");
    }

    #[test]
    fn test_delete_cached_is_idempotent() {
        let store = make_store();
        store.cache_one(&record("a1", "alice", "A")).unwrap();
        store.delete_cached("a1").unwrap();
        store.delete_cached("a1").unwrap();
        store.delete_cached("never-existed").unwrap();
        assert!(store.get_cached("alice").unwrap().is_empty());
    }

    #[test]
    fn test_tolerates_fully_empty_record() {
        let store = make_store();
        let empty = ContactRecord::from_new("e1", "alice", &NewContact::default());
        store.cache_one(&empty).unwrap();
        assert!(store.get_cached("alice").unwrap()[0].fields.is_empty());
    }

    // --- Pending Queue ---

    #[test]
    fn test_enqueue_generates_pending_ids_in_order() {
        let store = make_store();
        let a = store.enqueue_pending("alice", &contact("A")).unwrap();
        let b = store.enqueue_pending("alice", &contact("B")).unwrap();

        assert!(is_pending_id(&a.id));
        assert_ne!(a.id, b.id);
        assert_eq!(a.attempt_count, 0);

        let ids: Vec<String> = store
            .list_pending(None)
            .unwrap()
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[test]
    fn test_enqueue_keeps_payload_unchanged() {
        let store = make_store();
        let mut payload = contact("A");
        payload.fields.email = FieldValue::Null;
        let write = store.enqueue_pending("alice", &payload).unwrap();
        assert_eq!(write.payload, payload);
        assert_eq!(store.list_pending(None).unwrap()[0].payload, payload);
    }

    #[test]
    fn test_list_pending_filters_by_owner() {
        let store = make_store();
        store.enqueue_pending("alice", &contact("A")).unwrap();
        store.enqueue_pending("bob", &contact("B")).unwrap();

        assert_eq!(store.list_pending(Some("alice")).unwrap().len(), 1);
        assert_eq!(store.list_pending(Some("carol")).unwrap().len(), 0);
        assert_eq!(store.list_pending(None).unwrap().len(), 2);
    }

    #[test]
    fn test_bump_and_dequeue() {
        let store = make_store();
        let write = store.enqueue_pending("alice", &contact("A")).unwrap();

        assert_eq!(store.bump_attempt(&write.id).unwrap(), Some(1));
        assert_eq!(store.bump_attempt(&write.id).unwrap(), Some(2));
        assert_eq!(store.list_pending(None).unwrap()[0].attempt_count, 2);

        assert!(store.dequeue_pending(&write.id).unwrap());
        assert!(!store.dequeue_pending(&write.id).unwrap());
        assert_eq!(store.bump_attempt(&write.id).unwrap(), None);
    }

    #[test]
    fn test_amend_pending_replaces_payload() {
        let store = make_store();
        let write = store.enqueue_pending("alice", &contact("Draft")).unwrap();
        assert!(store.amend_pending(&write.id, &contact("Final")).unwrap());

        let queued = store.list_pending(None).unwrap();
        assert_eq!(queued[0].payload.fields.name.as_str(), Some("Final"));
        assert!(!store.amend_pending("offline_missing", &contact("X")).unwrap());
    }

    // --- Merge and Confirmation ---

    #[test]
    fn test_merge_remote_keeps_queued_and_local_only_placeholders() {
        let store = make_store();
        let queued = store.enqueue_pending("alice", &contact("Queued")).unwrap();
        store.cache_one(&queued.placeholder()).unwrap();
        let mut kept = record("offline_kept", "alice", "Kept");
        kept.local_only = true;
        store.cache_one(&kept).unwrap();
        store.cache_one(&record("offline_stale", "alice", "Stale")).unwrap();
        store.cache_one(&record("gone", "alice", "Gone")).unwrap();

        let merged = store
            .merge_remote("alice", vec![record("r1", "alice", "Remote")])
            .unwrap();
        let ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids[0], "r1");
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&queued.id.as_str()));
        assert!(ids.contains(&"offline_kept"));

        let cached = store.get_cached("alice").unwrap();
        assert_eq!(cached.len(), 3);
        assert!(cached.iter().all(|r| r.id != "offline_stale" && r.id != "gone"));
    }

    #[test]
    fn test_merge_remote_carries_previews_and_spares_other_owners() {
        let store = make_store();
        let mut cached = record("r1", "alice", "Jane");
        cached.preview = Some("thumb".to_string());
        store.cache_one(&cached).unwrap();
        store.cache_one(&record("b1", "bob", "Bob")).unwrap();

        let merged = store
            .merge_remote("alice", vec![record("r1", "alice", "Jane")])
            .unwrap();
        assert_eq!(merged[0].preview.as_deref(), Some("thumb"));
        assert_eq!(store.get_cached("bob").unwrap().len(), 1);
    }

    #[test]
    fn test_merge_remote_rejects_foreign_owner() {
        let store = make_store();
        let result = store.merge_remote("alice", vec![record("b1", "bob", "B1")]);
        assert!(matches!(result, Err(CardError::InvalidArgument(_))));
    }

    #[test]
    fn test_confirm_pending_swaps_placeholder() {
        let store = make_store();
        let write = store.enqueue_pending("alice", &contact("A")).unwrap();
        store.cache_one(&write.placeholder()).unwrap();

        let confirmed = record("c1", "alice", "A");
        assert!(store.confirm_pending(&write.id, &confirmed).unwrap());
        assert!(store.list_pending(None).unwrap().is_empty());
        assert_eq!(store.get_cached("alice").unwrap(), vec![confirmed]);
    }

    #[test]
    fn test_confirm_pending_dequeues_even_if_cache_write_fails() {
        let store = make_store();
        let write = store.enqueue_pending("alice", &contact("A")).unwrap();
        store.backend().set_simulate_cache_write_error(true);

        let result = store.confirm_pending(&write.id, &record("c1", "alice", "A"));
        assert!(matches!(result, Err(CardError::LocalStorageUnavailable(_))));
        assert!(store.list_pending(None).unwrap().is_empty());
    }

    #[test]
    fn test_abandon_pending_marks_placeholder() {
        let store = make_store();
        let write = store.enqueue_pending("alice", &contact("A")).unwrap();
        store.cache_one(&write.placeholder()).unwrap();

        assert!(store.abandon_pending(&write.id).unwrap());
        assert!(!store.abandon_pending(&write.id).unwrap());
        assert!(store.list_pending(None).unwrap().is_empty());
        let cached = store.get_cached("alice").unwrap();
        assert_eq!(cached[0].id, write.id);
        assert!(cached[0].local_only);
    }

    // --- Error Handling ---

    #[test]
    fn test_write_errors_surface() {
        let store = make_store();
        store.backend().set_simulate_write_error(true);

        let result = store.cache_one(&record("a1", "alice", "A"));
        assert!(matches!(result, Err(CardError::LocalStorageUnavailable(_))));

        let result = store.enqueue_pending("alice", &contact("A"));
        assert!(matches!(result, Err(CardError::LocalStorageUnavailable(_))));
    }

    #[test]
    fn test_read_errors_surface() {
        let store = make_store();
        store.backend().set_simulate_read_error(true);
        assert!(store.get_cached("alice").is_err());
        assert!(store.list_pending(None).is_err());
    }
}
