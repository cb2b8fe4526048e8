use super::backend::StorageBackend;
use crate::error::{CardError, Result};
use crate::model::{ContactRecord, PendingWrite};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const CACHE_FILE: &str = "cache.json";
pub const PENDING_FILE: &str = "pending.json";

/// Filesystem backend: one JSON document per table under `root`.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)?;
        }
        Ok(())
    }

    fn read_table<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T> {
        let path = self.root.join(file);
        if !path.exists() {
            return Ok(T::default());
        }
        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&content).map_err(|e| {
            CardError::LocalStorageUnavailable(format!("{} is corrupted: {}", path.display(), e))
        })
    }

    fn write_table<T: Serialize + ?Sized>(&self, file: &str, table: &T) -> Result<()> {
        self.ensure_dir()?;
        let content = serde_json::to_string_pretty(table)?;

        // Atomic write
        let tmp_file = self.root.join(format!(".{}-{}.tmp", file, Uuid::new_v4()));
        fs::write(&tmp_file, content)?;
        fs::rename(&tmp_file, self.root.join(file))?;
        Ok(())
    }
}

impl StorageBackend for FsBackend {
    fn load_cache(&self) -> Result<HashMap<String, ContactRecord>> {
        self.read_table(CACHE_FILE)
    }

    fn save_cache(&self, cache: &HashMap<String, ContactRecord>) -> Result<()> {
        self.write_table(CACHE_FILE, cache)
    }

    fn load_pending(&self) -> Result<Vec<PendingWrite>> {
        self.read_table(PENDING_FILE)
    }

    fn save_pending(&self, pending: &[PendingWrite]) -> Result<()> {
        self.write_table(PENDING_FILE, pending)
    }
}
