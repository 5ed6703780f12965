//! Live interface-object registry.
//!
//! Every heap object created behind the boundary registers its address here
//! and unregisters on destruction, so a verifier can assert that a scenario
//! released everything it acquired and that identities are stable.

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::RwLock;

/// Metadata for a tracked object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Object address (its identity).
    pub addr: usize,
    /// Concrete implementation name.
    pub type_name: &'static str,
    /// Monotonic creation sequence number.
    pub serial: u64,
}

#[derive(Debug, Default)]
struct TrackerState {
    live: HashMap<usize, ObjectMeta>,
    next_serial: u64,
    created: u64,
    destroyed: u64,
}

/// Totals since process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackerTotals {
    pub live: usize,
    pub created: u64,
    pub destroyed: u64,
}

/// Concurrent object registry.
#[derive(Debug, Default)]
pub struct ObjectTracker {
    state: RwLock<TrackerState>,
}

impl ObjectTracker {
    /// Create a new empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly created object and return its serial number.
    pub fn register(&self, addr: usize, type_name: &'static str) -> u64 {
        let mut state = self.state.write();
        state.next_serial += 1;
        let serial = state.next_serial;
        state.created += 1;
        state.live.insert(
            addr,
            ObjectMeta {
                addr,
                type_name,
                serial,
            },
        );
        serial
    }

    /// Remove a destroyed object. Returns false if the address was not live.
    pub fn unregister(&self, addr: usize) -> bool {
        let mut state = self.state.write();
        let removed = state.live.remove(&addr).is_some();
        if removed {
            state.destroyed += 1;
        }
        removed
    }

    /// Look up a live object by address.
    #[must_use]
    pub fn lookup(&self, addr: usize) -> Option<ObjectMeta> {
        self.state.read().live.get(&addr).copied()
    }

    /// Returns true if `addr` is a live object.
    #[must_use]
    pub fn is_live(&self, addr: usize) -> bool {
        self.state.read().live.contains_key(&addr)
    }

    /// Number of live objects.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.state.read().live.len()
    }

    /// Live objects of one implementation type.
    #[must_use]
    pub fn live_of_type(&self, type_name: &str) -> usize {
        self.state
            .read()
            .live
            .values()
            .filter(|meta| meta.type_name == type_name)
            .count()
    }

    #[must_use]
    pub fn totals(&self) -> TrackerTotals {
        let state = self.state.read();
        TrackerTotals {
            live: state.live.len(),
            created: state.created,
            destroyed: state.destroyed,
        }
    }

    /// Snapshot of live objects ordered by creation.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ObjectMeta> {
        let mut out: Vec<ObjectMeta> = self.state.read().live.values().copied().collect();
        out.sort_by_key(|meta| meta.serial);
        out
    }
}

static GLOBAL_TRACKER: OnceLock<ObjectTracker> = OnceLock::new();

/// Process-wide object tracker.
#[must_use]
pub fn global_tracker() -> &'static ObjectTracker {
    GLOBAL_TRACKER.get_or_init(ObjectTracker::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_unregister() {
        let tracker = ObjectTracker::new();
        let serial = tracker.register(0x1000, "Implementation");
        assert_eq!(serial, 1);
        assert!(tracker.is_live(0x1000));
        assert_eq!(tracker.live_of_type("Implementation"), 1);
        assert!(tracker.unregister(0x1000));
        assert!(!tracker.unregister(0x1000));
        assert_eq!(
            tracker.totals(),
            TrackerTotals {
                live: 0,
                created: 1,
                destroyed: 1
            }
        );
    }

    #[test]
    fn snapshot_is_ordered_by_creation() {
        let tracker = ObjectTracker::new();
        tracker.register(0x3000, "B");
        tracker.register(0x1000, "A");
        let snap = tracker.snapshot();
        assert_eq!(snap[0].addr, 0x3000);
        assert_eq!(snap[1].addr, 0x1000);
        assert_eq!(tracker.lookup(0x1000).map(|m| m.type_name), Some("A"));
    }
}
