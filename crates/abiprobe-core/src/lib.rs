//! # abiprobe-core
//!
//! Safe model of the native ABI under test: canonical layout-exact shapes,
//! raw-integer enums, capability identifiers, the status channel, the error
//! taxonomy and the pure reference semantics of every entry point and of the
//! callback protocol.
//!
//! Nothing here dereferences a raw pointer. The `abiprobe-abi` crate owns the
//! boundary and calls into this crate once arguments are validated.

#![deny(unsafe_code)]

pub mod callback;
pub mod capability;
pub mod enums;
pub mod error;
pub mod functions;
pub mod shape;
pub mod status;

pub use capability::Guid;
pub use enums::{MethodOperation, MyEnum};
pub use error::AbiError;
pub use shape::{FieldMismatch, Shape, ShapeLayout};
pub use status::Status;
