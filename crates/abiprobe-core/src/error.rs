//! Error taxonomy for cross-boundary operations.

use thiserror::Error;

use crate::capability::Guid;
use crate::status::Status;

/// Errors surfaced to Rust callers of the boundary.
///
/// Contract violations are fatal in strict mode and never reach this type
/// from an exported symbol; they appear here when a safe wrapper detects one
/// before crossing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AbiError {
    #[error("contract violation in {entry}: {detail}")]
    ContractViolation { entry: String, detail: String },
    #[error("capability {iid} not supported")]
    CapabilityNotSupported { iid: Guid },
    #[error("operation failed with {status}")]
    StatusFailure { status: Status },
    #[error("layout mismatch for {shape}: {detail}")]
    Layout { shape: &'static str, detail: String },
}

impl AbiError {
    /// Map a non-success status into an error. Success maps to `Ok`.
    pub fn check(status: Status) -> Result<(), Self> {
        if status.is_ok() {
            Ok(())
        } else {
            Err(Self::StatusFailure { status })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_maps_status() {
        assert!(AbiError::check(Status::OK).is_ok());
        assert_eq!(
            AbiError::check(Status::FAILED),
            Err(AbiError::StatusFailure {
                status: Status::FAILED
            })
        );
    }
}
