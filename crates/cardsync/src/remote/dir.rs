use super::{ensure_confirmed, new_server_id, sorted_records, RemoteEntry, RemoteStore};
use crate::error::{CardError, Result};
use crate::model::{ContactRecord, NewContact};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// Authoritative collection kept in a shared directory (network mount,
/// synced folder). One JSON document per owner.
///
/// The directory is never created by this adapter: if it is missing the
/// share is considered unreachable. [`DirRemote::unconfigured`] has no
/// directory at all and is always unreachable.
pub struct DirRemote {
    root: Option<PathBuf>,
    write_lock: Mutex<()>,
}

fn unavailable(context: &str, err: impl std::fmt::Display) -> CardError {
    CardError::RemoteUnavailable(format!("{}: {}", context, err))
}

/// Owner ids are opaque; hex keeps any of them a safe, unique file name.
fn owner_file_name(owner_id: &str) -> String {
    let hex: String = owner_id.bytes().map(|b| format!("{:02x}", b)).collect();
    format!("owner-{}.json", hex)
}

impl DirRemote {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            write_lock: Mutex::new(()),
        }
    }

    /// An adapter with no shared directory configured.
    pub fn unconfigured() -> Self {
        Self {
            root: None,
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Cheap reachability probe for connectivity providers.
    pub fn is_reachable(&self) -> bool {
        self.root().is_some_and(Path::is_dir)
    }

    fn reachable_root(&self) -> Result<&Path> {
        match self.root() {
            Some(root) if root.is_dir() => Ok(root),
            Some(root) => Err(CardError::RemoteUnavailable(format!(
                "remote directory {} is not reachable",
                root.display()
            ))),
            None => Err(CardError::RemoteUnavailable(
                "no remote directory configured".to_string(),
            )),
        }
    }

    fn owner_path(&self, owner_id: &str) -> Result<PathBuf> {
        if owner_id.is_empty() {
            return Err(CardError::RemoteRejected("owner id is empty".to_string()));
        }
        Ok(self.reachable_root()?.join(owner_file_name(owner_id)))
    }

    fn load(&self, owner_id: &str) -> Result<Vec<RemoteEntry>> {
        let path = self.owner_path(owner_id)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| unavailable("read failed", e))?;
        serde_json::from_str(&content).map_err(|e| {
            CardError::RemoteRejected(format!("collection {} unreadable: {}", path.display(), e))
        })
    }

    fn save(&self, owner_id: &str, entries: &[RemoteEntry]) -> Result<()> {
        let path = self.owner_path(owner_id)?;
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| CardError::RemoteRejected(format!("unencodable record: {}", e)))?;

        // Atomic write
        let tmp = path.with_file_name(format!(".owner-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, content).map_err(|e| unavailable("write failed", e))?;
        fs::rename(&tmp, &path).map_err(|e| unavailable("write failed", e))?;
        Ok(())
    }

    fn next_revision(entries: &[RemoteEntry]) -> u64 {
        entries.iter().map(|e| e.revision).max().map_or(0, |r| r + 1)
    }

    fn modify<T>(
        &self,
        owner_id: &str,
        f: impl FnOnce(&mut Vec<RemoteEntry>, u64) -> Result<T>,
    ) -> Result<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CardError::RemoteUnavailable("remote write lock poisoned".to_string()))?;
        let mut entries = self.load(owner_id)?;
        let revision = Self::next_revision(&entries);
        let out = f(&mut entries, revision)?;
        self.save(owner_id, &entries)?;
        Ok(out)
    }
}

impl RemoteStore for DirRemote {
    fn create(&self, owner_id: &str, contact: &NewContact) -> Result<ContactRecord> {
        let record = ContactRecord::from_new(new_server_id(), owner_id, &contact.for_remote());
        self.modify(owner_id, |entries, revision| {
            entries.push(RemoteEntry {
                record: record.clone(),
                updated_at: Utc::now(),
                revision,
            });
            Ok(record.clone())
        })
    }

    fn list(&self, owner_id: &str) -> Result<Vec<ContactRecord>> {
        Ok(sorted_records(self.load(owner_id)?))
    }

    fn update(&self, owner_id: &str, record: &ContactRecord) -> Result<()> {
        ensure_confirmed(&record.id)?;
        if record.owner_id != owner_id {
            return Err(CardError::RemoteRejected(format!(
                "record {} is not owned by {}",
                record.id, owner_id
            )));
        }
        self.modify(owner_id, |entries, revision| {
            let slot = entries
                .iter_mut()
                .find(|e| e.record.id == record.id)
                .ok_or_else(|| CardError::RemoteRejected(format!("no record {}", record.id)))?;
            slot.record = record.for_remote();
            slot.updated_at = Utc::now();
            slot.revision = revision;
            Ok(())
        })
    }

    fn delete(&self, owner_id: &str, id: &str) -> Result<()> {
        ensure_confirmed(id)?;
        self.modify(owner_id, |entries, _| {
            entries.retain(|e| e.record.id != id);
            Ok(())
        })
    }
}
