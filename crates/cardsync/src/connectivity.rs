//! # Connectivity
//!
//! The core never probes the network itself. It consumes a [`Connectivity`]
//! provider: a boolean probe plus edge notifications. Listeners fire only on
//! transitions, never on repeated reports of the same state.
//!
//! - [`ManualConnectivity`]: state set by the embedding platform (or tests).
//! - [`ProbeConnectivity`]: state computed by a probe closure; `refresh()`
//!   re-runs it and fires listeners on a change.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub type Listener = Box<dyn Fn(bool) + Send + Sync>;

type SharedListener = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub trait Connectivity: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Register a listener called with the new state on every transition.
    fn subscribe(&self, listener: Listener) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}

#[derive(Default)]
struct Listeners {
    entries: Mutex<Vec<(SubscriptionId, SharedListener)>>,
    next_id: AtomicU64,
}

impl Listeners {
    fn add(&self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((id, Arc::from(listener)));
        }
        id
    }

    fn remove(&self, id: SubscriptionId) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|(entry_id, _)| *entry_id != id);
        }
    }

    fn notify(&self, connected: bool) {
        // Listeners run outside the lock so they may subscribe or query state.
        let snapshot: Vec<SharedListener> = match self.entries.lock() {
            Ok(entries) => entries.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(_) => return,
        };
        for listener in snapshot {
            listener(connected);
        }
    }
}

/// Connectivity state pushed in from outside.
pub struct ManualConnectivity {
    connected: AtomicBool,
    listeners: Listeners,
}

impl ManualConnectivity {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
            listeners: Listeners::default(),
        }
    }

    /// Update the state, notifying listeners if it changed.
    pub fn set_connected(&self, connected: bool) {
        let previous = self.connected.swap(connected, Ordering::SeqCst);
        if previous != connected {
            tracing::debug!(connected, "connectivity changed");
            self.listeners.notify(connected);
        }
    }
}

impl Connectivity for ManualConnectivity {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn subscribe(&self, listener: Listener) -> SubscriptionId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.remove(id)
    }
}

/// Connectivity computed by a probe, e.g. "is the remote share mounted".
pub struct ProbeConnectivity {
    probe: Box<dyn Fn() -> bool + Send + Sync>,
    state: ManualConnectivity,
}

impl ProbeConnectivity {
    pub fn new(probe: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        let initial = probe();
        Self {
            probe: Box::new(probe),
            state: ManualConnectivity::new(initial),
        }
    }

    /// Re-run the probe; fires listeners if the result changed.
    pub fn refresh(&self) -> bool {
        let connected = (self.probe)();
        self.state.set_connected(connected);
        connected
    }
}

impl Connectivity for ProbeConnectivity {
    fn is_connected(&self) -> bool {
        (self.probe)()
    }

    fn subscribe(&self, listener: Listener) -> SubscriptionId {
        self.state.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.state.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_listeners_fire_on_edges_only() {
        let conn = ManualConnectivity::new(false);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        conn.subscribe(Box::new(move |state| sink.lock().unwrap().push(state)));

        conn.set_connected(false);
        conn.set_connected(true);
        conn.set_connected(true);
        conn.set_connected(false);

        assert_eq!(*events.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_unsubscribed_listeners_stay_quiet() {
        let conn = ManualConnectivity::new(true);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = conn.subscribe(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        conn.set_connected(false);
        conn.unsubscribe(id);
        conn.set_connected(true);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_probe_refresh_detects_restoration() {
        let up = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&up);
        let conn = ProbeConnectivity::new(move || flag.load(Ordering::SeqCst));

        let restored = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&restored);
        conn.subscribe(Box::new(move |connected| {
            if connected {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));

        assert!(!conn.is_connected());
        up.store(true, Ordering::SeqCst);
        assert!(conn.refresh());
        assert!(conn.refresh());
        assert_eq!(restored.load(Ordering::SeqCst), 1);
    }
}
