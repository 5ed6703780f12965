//! Atomic reference counter for interface objects.
//!
//! The count is the only shared mutable state an object exposes. Increments
//! are `Relaxed` (a new reference can only be made from an existing one);
//! decrements are `Release`, and the thread that observes the drop to zero
//! issues an `Acquire` fence before destroying the object.

use std::sync::atomic::{AtomicU32, Ordering, fence};

/// Outcome of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// References remain; carries the remaining count.
    Alive(u32),
    /// The last reference was dropped; the caller must destroy the object.
    Destroy,
}

/// A reference count starting at one.
#[derive(Debug)]
pub struct RefCount {
    count: AtomicU32,
}

impl Default for RefCount {
    fn default() -> Self {
        Self::new()
    }
}

impl RefCount {
    /// A fresh count owned by the creator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(1),
        }
    }

    /// Increment and return the new count.
    ///
    /// # Panics
    ///
    /// Panics if the count would wrap, which can only happen through leaked acquires.
    pub fn acquire(&self) -> u32 {
        let prev = self.count.fetch_add(1, Ordering::Relaxed);
        assert!(prev != 0, "acquire on a destroyed object");
        assert!(prev < u32::MAX, "reference count overflow");
        prev + 1
    }

    /// Decrement and report whether the object must be destroyed.
    ///
    /// # Panics
    ///
    /// Panics on release of an object whose count is already zero.
    pub fn release(&self) -> ReleaseOutcome {
        let prev = self.count.fetch_sub(1, Ordering::Release);
        assert!(prev != 0, "release on a destroyed object");
        if prev == 1 {
            fence(Ordering::Acquire);
            ReleaseOutcome::Destroy
        } else {
            ReleaseOutcome::Alive(prev - 1)
        }
    }

    /// Current count. Only meaningful while the caller holds a reference.
    #[must_use]
    pub fn get(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }
}
