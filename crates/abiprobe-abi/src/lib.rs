// Every export accepts raw pointers from native callers; the membrane views
// validate at runtime, so per-function safety docs would be boilerplate.
#![allow(clippy::missing_safety_doc)]
//! # abiprobe-abi
//!
//! The native boundary of abiprobe. Builds as a `cdylib` exporting every
//! entry point of the catalog under a fixed `extern "system"` symbol, and as
//! an `rlib` so the harness and fixture executor can call the same functions
//! in-process.
//!
//! # Architecture
//!
//! ```text
//! native caller -> entry shim (this crate) -> membrane view -> core reference -> return
//! ```
//!
//! In **strict** mode a contract violation (null required pointer, negative
//! length, misaligned data) panics; across the `extern` boundary that aborts
//! the process. In **hardened** mode the violation is recorded and the entry
//! point returns its documented safe default.
//!
//! Interface objects live in [`object`]: a table pointer, an atomic count and
//! the implementation state, registered with the membrane tracker while
//! alive. [`callback_abi`] carries the callback protocol in both directions
//! and [`catalog`] lists every symbol and table.

#[macro_use]
mod macros;

pub mod runtime_policy;
pub mod util;

pub mod object;

pub mod callback_abi;
pub mod catalog;
pub mod functions_abi;
pub mod interface_abi;
pub mod properties_abi;
pub mod struct_abi;

pub use catalog::{Component, EntryPoint, InterfaceEntry, MarshalRule, Registry, registry};
pub use object::{ComPtr, IObject, Interface, live_objects};
