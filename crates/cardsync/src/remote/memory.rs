use super::{ensure_confirmed, new_server_id, sorted_records, RemoteEntry, RemoteStore};
use crate::error::{CardError, Result};
use crate::model::{ContactRecord, NewContact};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// In-memory authoritative store for testing.
///
/// Failure injection covers the two remote failure kinds: transport
/// (`set_reachable(false)`, `fail_next_creates`, `fail_creates_for`) and
/// rejection (`set_rejecting`).
pub struct MemRemote {
    collections: Mutex<HashMap<String, HashMap<String, RemoteEntry>>>,
    reachable: AtomicBool,
    rejecting: Mutex<Option<String>>,
    failing_creates: AtomicU32,
    failing_names: Mutex<HashMap<String, u32>>,
    create_attempts: Mutex<Vec<NewContact>>,
    received_ids: Mutex<Vec<String>>,
    revision: AtomicU64,
}

impl Default for MemRemote {
    fn default() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            reachable: AtomicBool::new(true),
            rejecting: Mutex::new(None),
            failing_creates: AtomicU32::new(0),
            failing_names: Mutex::new(HashMap::new()),
            create_attempts: Mutex::new(Vec::new()),
            received_ids: Mutex::new(Vec::new()),
            revision: AtomicU64::new(0),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| CardError::RemoteUnavailable("remote state lock poisoned".to_string()))
}

impl MemRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Reject every request with the given reason until cleared with `None`.
    pub fn set_rejecting(&self, reason: Option<&str>) {
        if let Ok(mut rejecting) = self.rejecting.lock() {
            *rejecting = reason.map(str::to_string);
        }
    }

    /// Fail the next `count` creates with a transport error.
    pub fn fail_next_creates(&self, count: u32) {
        self.failing_creates.store(count, Ordering::SeqCst);
    }

    /// Fail the next `times` creates whose `name` equals `name`.
    pub fn fail_creates_for(&self, name: &str, times: u32) {
        if let Ok(mut failing) = self.failing_names.lock() {
            failing.insert(name.to_string(), times);
        }
    }

    /// Every payload `create` was called with, including failed attempts.
    pub fn create_attempts(&self) -> Vec<NewContact> {
        self.create_attempts
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    /// Every id `update` or `delete` was called with.
    pub fn received_ids(&self) -> Vec<String> {
        self.received_ids
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    /// Seed a confirmed record directly, bypassing failure injection.
    pub fn insert(&self, record: ContactRecord) {
        let entry = self.entry(record);
        if let Ok(mut collections) = self.collections.lock() {
            collections
                .entry(entry.record.owner_id.clone())
                .or_default()
                .insert(entry.record.id.clone(), entry);
        }
    }

    pub fn len(&self, owner_id: &str) -> usize {
        self.collections
            .lock()
            .map(|c| c.get(owner_id).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, owner_id: &str) -> bool {
        self.len(owner_id) == 0
    }

    fn entry(&self, record: ContactRecord) -> RemoteEntry {
        RemoteEntry {
            record: record.for_remote(),
            updated_at: Utc::now(),
            revision: self.revision.fetch_add(1, Ordering::SeqCst),
        }
    }

    fn check_available(&self) -> Result<()> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(CardError::RemoteUnavailable(
                "remote store unreachable".to_string(),
            ));
        }
        if let Some(reason) = lock(&self.rejecting)?.as_ref() {
            return Err(CardError::RemoteRejected(reason.clone()));
        }
        Ok(())
    }

    fn take_injected_create_failure(&self, contact: &NewContact) -> Result<()> {
        let remaining = self.failing_creates.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_creates.store(remaining - 1, Ordering::SeqCst);
            return Err(CardError::RemoteUnavailable(
                "injected create failure".to_string(),
            ));
        }

        if let Some(name) = contact.fields.name.as_str() {
            let mut failing = lock(&self.failing_names)?;
            if let Some(times) = failing.get_mut(name) {
                if *times > 0 {
                    *times -= 1;
                    return Err(CardError::RemoteUnavailable(format!(
                        "injected create failure for {}",
                        name
                    )));
                }
            }
        }
        Ok(())
    }
}

impl RemoteStore for MemRemote {
    fn create(&self, owner_id: &str, contact: &NewContact) -> Result<ContactRecord> {
        lock(&self.create_attempts)?.push(contact.clone());
        self.check_available()?;
        self.take_injected_create_failure(contact)?;

        let record = ContactRecord::from_new(new_server_id(), owner_id, &contact.for_remote());
        let entry = self.entry(record.clone());
        lock(&self.collections)?
            .entry(owner_id.to_string())
            .or_default()
            .insert(record.id.clone(), entry);
        Ok(record)
    }

    fn list(&self, owner_id: &str) -> Result<Vec<ContactRecord>> {
        self.check_available()?;
        let collections = lock(&self.collections)?;
        let entries = collections
            .get(owner_id)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default();
        Ok(sorted_records(entries))
    }

    fn update(&self, owner_id: &str, record: &ContactRecord) -> Result<()> {
        lock(&self.received_ids)?.push(record.id.clone());
        ensure_confirmed(&record.id)?;
        if record.owner_id != owner_id {
            return Err(CardError::RemoteRejected(format!(
                "record {} is not owned by {}",
                record.id, owner_id
            )));
        }
        self.check_available()?;

        let entry = self.entry(record.clone());
        let mut collections = lock(&self.collections)?;
        match collections
            .get_mut(owner_id)
            .and_then(|c| c.get_mut(&record.id))
        {
            Some(slot) => {
                *slot = entry;
                Ok(())
            }
            None => Err(CardError::RemoteRejected(format!(
                "no record {} for owner {}",
                record.id, owner_id
            ))),
        }
    }

    fn delete(&self, owner_id: &str, id: &str) -> Result<()> {
        lock(&self.received_ids)?.push(id.to_string());
        ensure_confirmed(id)?;
        self.check_available()?;

        if let Some(collection) = lock(&self.collections)?.get_mut(owner_id) {
            collection.remove(id);
        }
        Ok(())
    }
}
