//! Cross-subsystem state tracking.
//!
//! Tracks per-subsystem status, derives system health, and publishes progress
//! events to a listener registry with dispose semantics. Listeners are invoked
//! synchronously, in registration order, after every state mutation; a
//! panicking listener is swallowed so it can never take down the state
//! manager.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use codeindex_domain::value_objects::{
    StatusSnapshot, SubsystemStatus, SystemHealth, SystemStatus,
};

type Listener = Arc<dyn Fn(&StatusSnapshot) + Send + Sync>;

struct Registry {
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

/// A handle returned by [`StateManager::on_progress_update`]. Dropping it does
/// NOT remove the listener — only calling [`Disposable::dispose`] does.
#[must_use = "the listener stays registered until dispose() is called"]
pub struct Disposable {
    id: u64,
    registry: Weak<Registry>,
}

impl Disposable {
    /// Remove the associated listener from the registry. Idempotent.
    pub fn dispose(&self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut listeners = registry.listeners.lock().unwrap_or_else(|e| e.into_inner());
            listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Holds the latest status snapshot and the progress listener registry.
pub struct StateManager {
    snapshot: Mutex<StatusSnapshot>,
    registry: Arc<Registry>,
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StateManager {
    /// Construct a fresh state manager in the standby state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshot: Mutex::new(StatusSnapshot {
                vector_status: SubsystemStatus::Idle,
                graph_status: SubsystemStatus::Idle,
                system_status: SystemStatus::Standby,
                system_health: SystemHealth::Healthy,
                processed: 0,
                total: None,
                message: None,
                graph_consecutive_failures: 0,
            }),
            registry: Arc::new(Registry {
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register a progress listener; returns a disposable that removes it.
    pub fn on_progress_update<F>(&self, listener: F) -> Disposable
    where
        F: Fn(&StatusSnapshot) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::SeqCst);
        self.registry
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(listener)));
        Disposable {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    fn publish(&self, snapshot: &StatusSnapshot) {
        let listeners: Vec<Listener> = self
            .registry
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            // Swallow listener panics: a misbehaving subscriber must not corrupt
            // the state manager's own invariants or abort the publishing loop.
            let _ = std::panic::catch_unwind(AssertUnwindSafe(|| listener(snapshot)));
        }
    }

    fn mutate(&self, f: impl FnOnce(&mut StatusSnapshot)) {
        let snapshot = {
            let mut guard = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut guard);
            guard.clone()
        };
        self.publish(&snapshot);
    }

    /// Set the vector subsystem's status.
    pub fn set_vector_status(&self, status: SubsystemStatus) {
        self.mutate(|s| {
            s.vector_status = status;
            recompute_system(s);
        });
    }

    /// Set the graph subsystem's status. Resets the consecutive-failure counter
    /// on any non-error transition.
    pub fn set_graph_status(&self, status: SubsystemStatus) {
        self.mutate(|s| {
            if status.is_error() {
                s.graph_consecutive_failures += 1;
            } else {
                s.graph_consecutive_failures = 0;
            }
            s.graph_status = status;
            recompute_system(s);
        });
    }

    /// Transition the whole system to standby: both sides idle.
    pub fn set_standby(&self) {
        self.mutate(|s| {
            s.vector_status = SubsystemStatus::Idle;
            s.graph_status = SubsystemStatus::Idle;
            s.graph_consecutive_failures = 0;
            s.system_status = SystemStatus::Standby;
            s.system_health = SystemHealth::Healthy;
        });
    }

    /// Transition the whole system to error: vector side moves to error, graph
    /// side's own state is preserved.
    pub fn set_system_error(&self, message: impl Into<String>) {
        self.mutate(|s| {
            s.vector_status = SubsystemStatus::Error;
            s.message = Some(message.into());
            recompute_system(s);
        });
    }

    /// Report processed/total progress and an optional status message.
    pub fn report_progress(&self, processed: u64, total: Option<u64>, message: Option<String>) {
        self.mutate(|s| {
            s.processed = processed;
            s.total = total;
            if message.is_some() {
                s.message = message;
            }
        });
    }

    /// The current full snapshot.
    #[must_use]
    pub fn get_current_status(&self) -> StatusSnapshot {
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Status for a single component ("vector" or "graph").
    #[must_use]
    pub fn get_component_status(&self, component: &str) -> Option<SubsystemStatus> {
        let snapshot = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        match component {
            "vector" => Some(snapshot.vector_status),
            "graph" => Some(snapshot.graph_status),
            _ => None,
        }
    }

    /// Whether the system is currently degraded.
    #[must_use]
    pub fn is_system_degraded(&self) -> bool {
        self.get_current_status().system_health == SystemHealth::Degraded
    }

    /// Whether the system is currently failed.
    #[must_use]
    pub fn is_system_failed(&self) -> bool {
        self.get_current_status().system_health == SystemHealth::Failed
    }
}

fn recompute_system(snapshot: &mut StatusSnapshot) {
    snapshot.system_health =
        SystemHealth::from_statuses(snapshot.vector_status, snapshot.graph_status);
    snapshot.system_status = match (snapshot.vector_status, snapshot.graph_status) {
        (SubsystemStatus::Idle, SubsystemStatus::Idle) => SystemStatus::Standby,
        _ if snapshot.system_health == SystemHealth::Failed => SystemStatus::Error,
        (SubsystemStatus::Indexing, _) | (_, SubsystemStatus::Indexing) => SystemStatus::Indexing,
        (SubsystemStatus::Indexed, SubsystemStatus::Indexed) => SystemStatus::Indexed,
        _ if snapshot.vector_status.is_error() => SystemStatus::Error,
        _ => snapshot.system_status,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn system_health_degrades_then_fails_as_subsystems_error() {
        let manager = StateManager::new();
        manager.set_vector_status(SubsystemStatus::Indexed);
        manager.set_graph_status(SubsystemStatus::Indexed);
        assert_eq!(manager.get_current_status().system_health, SystemHealth::Healthy);

        manager.set_graph_status(SubsystemStatus::Error);
        assert_eq!(manager.get_current_status().system_health, SystemHealth::Degraded);
        assert!(manager.is_system_degraded());

        manager.set_vector_status(SubsystemStatus::Error);
        assert_eq!(manager.get_current_status().system_health, SystemHealth::Failed);
        assert!(manager.is_system_failed());
    }

    #[test]
    fn graph_consecutive_failures_reset_on_recovery() {
        let manager = StateManager::new();
        manager.set_graph_status(SubsystemStatus::Error);
        manager.set_graph_status(SubsystemStatus::Error);
        assert_eq!(manager.get_current_status().graph_consecutive_failures, 2);
        manager.set_graph_status(SubsystemStatus::Indexed);
        assert_eq!(manager.get_current_status().graph_consecutive_failures, 0);
    }

    #[test]
    fn listener_receives_events_in_registration_order() {
        let manager = StateManager::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let o1 = Arc::clone(&order);
        let o2 = Arc::clone(&order);
        let _d1 = manager.on_progress_update(move |_| o1.lock().unwrap().push(1));
        let _d2 = manager.on_progress_update(move |_| o2.lock().unwrap().push(2));
        manager.set_vector_status(SubsystemStatus::Indexing);
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn dispose_stops_further_events() {
        let manager = StateManager::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let disposable = manager.on_progress_update(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        manager.set_vector_status(SubsystemStatus::Indexing);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        disposable.dispose();
        manager.set_vector_status(SubsystemStatus::Indexed);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn standby_sets_both_sides_idle() {
        let manager = StateManager::new();
        manager.set_vector_status(SubsystemStatus::Error);
        manager.set_graph_status(SubsystemStatus::Error);
        manager.set_standby();
        let snapshot = manager.get_current_status();
        assert_eq!(snapshot.vector_status, SubsystemStatus::Idle);
        assert_eq!(snapshot.graph_status, SubsystemStatus::Idle);
        assert_eq!(snapshot.system_status, SystemStatus::Standby);
    }

    #[test]
    fn system_error_preserves_graph_side_state() {
        let manager = StateManager::new();
        manager.set_graph_status(SubsystemStatus::Indexed);
        manager.set_system_error("boom");
        let snapshot = manager.get_current_status();
        assert_eq!(snapshot.vector_status, SubsystemStatus::Error);
        assert_eq!(snapshot.graph_status, SubsystemStatus::Indexed);
    }

    #[test]
    fn a_panicking_listener_does_not_block_the_others() {
        let manager = StateManager::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let _bad = manager.on_progress_update(|_| panic!("listener exploded"));
        let _good = manager.on_progress_update(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        manager.set_vector_status(SubsystemStatus::Indexing);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
