//! Conformance verification tooling for abiprobe.
//!
//! This crate provides:
//! - Fixture verify: run captured JSON fixture cases against the exported
//!   entry points and the reference model, in every contract mode
//! - Layout report: descriptor table of every canonical shape with SHA-256
//!   digests and packing checks
//! - Catalog export: the entry point and interface registry as JSON
//! - Object audit: lifecycle scenarios plus live-object accounting
//! - Report generation: human-readable + machine-readable conformance reports
//! - Structured JSONL logs for every run

#![forbid(unsafe_code)]

pub mod catalog_export;
pub mod diff;
pub mod error;
pub mod fixtures;
pub mod layout_report;
pub mod object_audit;
pub mod report;
pub mod runner;
pub mod structured_log;
pub mod verify;

pub use error::HarnessError;
pub use fixtures::{FixtureCase, FixtureSet};
pub use report::ConformanceReport;
pub use runner::TestRunner;
pub use verify::VerificationResult;
