//! # abiprobe-membrane
//!
//! Boundary guard between foreign callers and the abiprobe entry points.
//!
//! - [`config`]: process-wide contract mode (`ABIPROBE_MODE`).
//! - [`view`]: one-shot validation of raw pointer and array+length arguments.
//! - [`refcount`]: the atomic acquire/release counter carried by every object.
//! - [`tracker`]: registry of live interface objects for leak and identity checks.
//! - [`violation`]: the contract violation vocabulary.

pub mod config;
pub mod refcount;
pub mod tracker;
pub mod view;
pub mod violation;

pub use config::{ContractMode, contract_mode};
pub use refcount::{RefCount, ReleaseOutcome};
pub use tracker::{ObjectMeta, ObjectTracker, global_tracker};
pub use view::Site;
pub use violation::{ContractViolation, ViolationKind};
