//! Runtime policy bridge for entry points.
//!
//! Centralizes contract-violation handling and call accounting so entry
//! points only validate and delegate. Per-entry call counters are atomics
//! behind a read-mostly map; the ring of recent violations is bounded and
//! only touched on the violation path.

use std::collections::{HashMap, VecDeque};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use abiprobe_membrane::config::{ContractMode, contract_mode};
use abiprobe_membrane::{ContractViolation, ViolationKind};
use parking_lot::{Mutex, RwLock};

/// Recent violations kept for inspection.
pub const VIOLATION_RING_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct EntryCounters {
    calls: AtomicU64,
    violations: AtomicU64,
}

#[derive(Debug, Default)]
struct PolicyState {
    entries: RwLock<HashMap<&'static str, &'static EntryCounters>>,
    recent: Mutex<VecDeque<ViolationRecord>>,
    total_calls: AtomicU64,
    total_violations: AtomicU64,
}

/// One recorded violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationRecord {
    pub entry: &'static str,
    pub parameter: &'static str,
    pub kind: ViolationKind,
    pub mode: ContractMode,
}

/// Per-entry counters at the time of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStats {
    pub entry: &'static str,
    pub calls: u64,
    pub violations: u64,
}

/// Point-in-time view of the policy counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySnapshot {
    pub mode: ContractMode,
    pub total_calls: u64,
    pub total_violations: u64,
    /// Sorted by entry name.
    pub entries: Vec<EntryStats>,
    /// Oldest first.
    pub recent: Vec<ViolationRecord>,
}

fn state() -> &'static PolicyState {
    static STATE: OnceLock<PolicyState> = OnceLock::new();
    STATE.get_or_init(PolicyState::default)
}

fn counters(entry: &'static str) -> &'static EntryCounters {
    let st = state();
    if let Some(c) = st.entries.read().get(entry) {
        return *c;
    }
    let mut entries = st.entries.write();
    // Counters live for the rest of the process; one leak per distinct entry.
    *entries
        .entry(entry)
        .or_insert_with(|| Box::leak(Box::new(EntryCounters::default())))
}

/// Count one call into `entry`.
pub(crate) fn enter(entry: &'static str) {
    if !contract_mode().telemetry_enabled() {
        return;
    }
    state().total_calls.fetch_add(1, Ordering::Relaxed);
    counters(entry).calls.fetch_add(1, Ordering::Relaxed);
}

/// Handle a boundary violation under `mode`.
///
/// Strict mode panics with the violation message. Otherwise the violation is
/// recorded (unless telemetry is off) and the caller returns its safe default.
pub(crate) fn handle_violation(mode: ContractMode, violation: ContractViolation) {
    if mode.telemetry_enabled() {
        let st = state();
        st.total_violations.fetch_add(1, Ordering::Relaxed);
        counters(violation.entry)
            .violations
            .fetch_add(1, Ordering::Relaxed);
        let mut recent = st.recent.lock();
        if recent.len() == VIOLATION_RING_CAPACITY {
            recent.pop_front();
        }
        recent.push_back(ViolationRecord {
            entry: violation.entry,
            parameter: violation.parameter,
            kind: violation.kind,
            mode,
        });
    }
    if mode.is_fatal() {
        panic!("{violation}");
    }
}

/// Unwrap a boundary check, routing a violation through the configured mode.
///
/// `None` means the caller must return its documented safe default.
pub(crate) fn check<T>(result: Result<T, ContractViolation>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(violation) => {
            handle_violation(contract_mode(), violation);
            None
        }
    }
}

/// Current counters and recent violations.
#[must_use]
pub fn snapshot() -> PolicySnapshot {
    let st = state();
    let mut entries: Vec<EntryStats> = st
        .entries
        .read()
        .iter()
        .map(|(entry, c)| EntryStats {
            entry: *entry,
            calls: c.calls.load(Ordering::Relaxed),
            violations: c.violations.load(Ordering::Relaxed),
        })
        .collect();
    entries.sort_by(|a, b| a.entry.cmp(b.entry));
    PolicySnapshot {
        mode: contract_mode(),
        total_calls: st.total_calls.load(Ordering::Relaxed),
        total_violations: st.total_violations.load(Ordering::Relaxed),
        entries,
        recent: st.recent.lock().iter().cloned().collect(),
    }
}

/// Calls and violations recorded for one entry.
#[must_use]
pub fn entry_stats(entry: &str) -> Option<EntryStats> {
    let entries = state().entries.read();
    let (name, c) = entries.get_key_value(entry)?;
    Some(EntryStats {
        entry: *name,
        calls: c.calls.load(Ordering::Relaxed),
        violations: c.violations.load(Ordering::Relaxed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(entry: &'static str) -> ContractViolation {
        ContractViolation::new(entry, "elements", ViolationKind::NullPointer)
    }

    #[test]
    #[should_panic(expected = "contract violation in PolicyStrictProbe")]
    fn strict_violation_panics() {
        handle_violation(ContractMode::Strict, violation("PolicyStrictProbe"));
    }

    #[test]
    fn hardened_violation_is_recorded() {
        handle_violation(ContractMode::Hardened, violation("PolicyHardenedProbe"));
        let stats = entry_stats("PolicyHardenedProbe").unwrap();
        assert_eq!(stats.violations, 1);
        let snap = snapshot();
        assert!(snap.total_violations >= 1);
        assert!(
            snap.recent
                .iter()
                .any(|r| r.entry == "PolicyHardenedProbe" && r.mode == ContractMode::Hardened)
        );
    }

    #[test]
    fn off_mode_records_nothing() {
        handle_violation(ContractMode::Off, violation("PolicyOffProbe"));
        assert!(entry_stats("PolicyOffProbe").is_none());
    }

    #[test]
    fn ring_is_bounded() {
        for _ in 0..(VIOLATION_RING_CAPACITY + 10) {
            handle_violation(ContractMode::Hardened, violation("PolicyRingProbe"));
        }
        assert!(snapshot().recent.len() <= VIOLATION_RING_CAPACITY);
        assert_eq!(
            entry_stats("PolicyRingProbe").unwrap().violations,
            (VIOLATION_RING_CAPACITY + 10) as u64
        );
    }

    #[test]
    fn snapshot_entries_are_sorted() {
        counters("PolicyZeta");
        counters("PolicyAlpha");
        let snap = snapshot();
        let names: Vec<_> = snap.entries.iter().map(|e| e.entry).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }
}
