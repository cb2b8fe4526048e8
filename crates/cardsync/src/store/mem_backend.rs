use super::backend::StorageBackend;
use crate::error::{CardError, Result};
use crate::model::{ContactRecord, PendingWrite};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-memory storage backend for testing, with read/write failure injection.
#[derive(Default)]
pub struct MemBackend {
    cache: Mutex<HashMap<String, ContactRecord>>,
    pending: Mutex<Vec<PendingWrite>>,
    simulate_write_error: AtomicBool,
    simulate_cache_write_error: AtomicBool,
    simulate_read_error: AtomicBool,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation (e.g. quota exceeded).
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Fail writes of the cache table only; the pending queue stays writable.
    pub fn set_simulate_cache_write_error(&self, simulate: bool) {
        self.simulate_cache_write_error
            .store(simulate, Ordering::SeqCst);
    }

    /// Enable read error simulation (e.g. corrupted database).
    pub fn set_simulate_read_error(&self, simulate: bool) {
        self.simulate_read_error.store(simulate, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<()> {
        if self.simulate_read_error.load(Ordering::SeqCst) {
            return Err(CardError::LocalStorageUnavailable(
                "Simulated read error".to_string(),
            ));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(CardError::LocalStorageUnavailable(
                "Simulated write error".to_string(),
            ));
        }
        Ok(())
    }
}

fn poisoned<T>(_: T) -> CardError {
    CardError::LocalStorageUnavailable("memory table lock poisoned".to_string())
}

impl StorageBackend for MemBackend {
    fn load_cache(&self) -> Result<HashMap<String, ContactRecord>> {
        self.check_read()?;
        Ok(self.cache.lock().map_err(poisoned)?.clone())
    }

    fn save_cache(&self, cache: &HashMap<String, ContactRecord>) -> Result<()> {
        self.check_write()?;
        if self.simulate_cache_write_error.load(Ordering::SeqCst) {
            return Err(CardError::LocalStorageUnavailable(
                "Simulated cache write error".to_string(),
            ));
        }
        *self.cache.lock().map_err(poisoned)? = cache.clone();
        Ok(())
    }

    fn load_pending(&self) -> Result<Vec<PendingWrite>> {
        self.check_read()?;
        Ok(self.pending.lock().map_err(poisoned)?.clone())
    }

    fn save_pending(&self, pending: &[PendingWrite]) -> Result<()> {
        self.check_write()?;
        *self.pending.lock().map_err(poisoned)? = pending.to_vec();
        Ok(())
    }
}
