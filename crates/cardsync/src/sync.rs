//! # Sync Engine
//!
//! Drains the pending-write queue into the remote store.
//!
//! ## Drain Algorithm
//!
//! For each queued write, in enqueue order:
//!
//! 1. `create` it remotely.
//! 2. On success: dequeue the write, then swap the cached placeholder for the
//!    confirmed record ([`LocalStore::confirm_pending`]).
//! 3. On failure: bump the attempt counter. Once it reaches
//!    [`MAX_SYNC_ATTEMPTS`] the write is dequeued for good; its placeholder
//!    stays in the cache marked local-only and is listed in
//!    [`DrainReport::abandoned`].
//! 4. Keep going: one failing write never blocks the ones behind it. A local
//!    storage error on one write is logged and listed in
//!    [`DrainReport::failed`].
//!
//! A failed write keeps its queue position, so on the next drain it is
//! attempted before anything enqueued after it.
//!
//! ## Triggers
//!
//! The engine has no timers. It drains when [`SyncEngine::trigger_drain`] is
//! called ("sync now") or, after [`SyncEngine::watch`], when the connectivity
//! provider reports a transition to connected.
//!
//! ## Single Flight
//!
//! At most one drain runs at a time. A trigger that arrives while a drain is
//! in flight returns [`DrainOutcome::AlreadyRunning`] without reading the
//! queue.

use crate::connectivity::{Connectivity, SubscriptionId};
use crate::error::Result;
use crate::model::{ContactRecord, PendingWrite};
use crate::remote::RemoteStore;
use crate::store::LocalStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Failed attempts after which a queued write is abandoned.
pub const MAX_SYNC_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct SyncedWrite {
    pub pending_id: String,
    pub record: ContactRecord,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    pub synced: Vec<SyncedWrite>,
    /// Writes that failed and stay queued.
    pub retried: Vec<String>,
    /// Writes dropped after the last allowed attempt.
    pub abandoned: Vec<String>,
    /// Writes whose local bookkeeping failed. A write that reached the remote
    /// store is never uploaded again, even when it lands here.
    pub failed: Vec<String>,
    /// Queue length after the drain.
    pub remaining: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrainOutcome {
    Completed(DrainReport),
    AlreadyRunning,
    Offline,
}

/// Resets the running flag however the drain exits.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SyncEngine<L: LocalStore, R: RemoteStore> {
    local: Arc<L>,
    remote: Arc<R>,
    connectivity: Arc<dyn Connectivity>,
    running: AtomicBool,
}

impl<L: LocalStore, R: RemoteStore> SyncEngine<L, R> {
    pub fn new(local: Arc<L>, remote: Arc<R>, connectivity: Arc<dyn Connectivity>) -> Self {
        Self {
            local,
            remote,
            connectivity,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Queued writes across all owners.
    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.local.list_pending(None)?.len())
    }

    /// Run one drain now, unless one is already in flight or the device is
    /// offline.
    pub fn trigger_drain(&self) -> Result<DrainOutcome> {
        if !self.connectivity.is_connected() {
            tracing::debug!("drain skipped: offline");
            return Ok(DrainOutcome::Offline);
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("drain skipped: already running");
            return Ok(DrainOutcome::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);
        self.drain_queue().map(DrainOutcome::Completed)
    }

    /// The current version of a queued write; it may have been amended or
    /// removed since the drain took its snapshot.
    fn current(&self, pending_id: &str) -> Result<Option<PendingWrite>> {
        Ok(self
            .local
            .list_pending(None)?
            .into_iter()
            .find(|w| w.id == pending_id))
    }

    fn drain_queue(&self) -> Result<DrainReport> {
        let snapshot: Vec<String> = self
            .local
            .list_pending(None)?
            .into_iter()
            .map(|w| w.id)
            .collect();
        let mut report = DrainReport::default();

        for pending_id in snapshot {
            if let Err(err) = self.drain_one(&pending_id, &mut report) {
                tracing::error!(%pending_id, error = %err, "local bookkeeping failed for pending write");
                report.failed.push(pending_id);
            }
        }

        report.remaining = self.local.list_pending(None)?.len();
        Ok(report)
    }

    fn drain_one(&self, pending_id: &str, report: &mut DrainReport) -> Result<()> {
        let Some(write) = self.current(pending_id)? else {
            return Ok(());
        };

        match self.remote.create(&write.owner_id, &write.payload) {
            Ok(mut confirmed) => {
                if confirmed.preview.is_none() {
                    confirmed.preview = write.payload.preview.clone();
                }
                self.local.confirm_pending(&write.id, &confirmed)?;
                tracing::info!(pending_id = %write.id, id = %confirmed.id, "pending write synced");
                report.synced.push(SyncedWrite {
                    pending_id: write.id,
                    record: confirmed,
                });
            }
            Err(err) => match self.local.bump_attempt(&write.id)? {
                Some(attempts) if attempts >= MAX_SYNC_ATTEMPTS => {
                    self.local.abandon_pending(&write.id)?;
                    tracing::warn!(
                        pending_id = %write.id,
                        attempts,
                        error = %err,
                        "pending write abandoned; record stays local-only"
                    );
                    report.abandoned.push(write.id);
                }
                Some(attempts) => {
                    tracing::debug!(pending_id = %write.id, attempts, error = %err, "pending write failed");
                    report.retried.push(write.id);
                }
                None => {}
            },
        }
        Ok(())
    }
}

impl<L, R> SyncEngine<L, R>
where
    L: LocalStore + 'static,
    R: RemoteStore + 'static,
{
    /// Drain whenever `connectivity` reports a transition to connected.
    ///
    /// The subscription holds a weak reference: dropping the engine turns it
    /// into a no-op.
    pub fn watch(self: &Arc<Self>, connectivity: &dyn Connectivity) -> SubscriptionId {
        let engine: Weak<Self> = Arc::downgrade(self);
        connectivity.subscribe(Box::new(move |connected| {
            if !connected {
                return;
            }
            let Some(engine) = engine.upgrade() else {
                return;
            };
            match engine.trigger_drain() {
                Ok(DrainOutcome::Completed(report)) => tracing::info!(
                    synced = report.synced.len(),
                    abandoned = report.abandoned.len(),
                    remaining = report.remaining,
                    "drain after reconnect finished"
                ),
                Ok(_) => {}
                Err(err) => tracing::error!(error = %err, "drain after reconnect failed"),
            }
        }))
    }
}
