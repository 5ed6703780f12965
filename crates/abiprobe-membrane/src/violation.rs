//! Contract violation vocabulary shared by the boundary layer.

use thiserror::Error;

/// Class of boundary contract violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// Null pointer where the contract does not mark the parameter optional.
    NullPointer,
    /// Negative element count in an array+length pair.
    NegativeLength,
    /// Element count whose byte extent overflows the address space.
    LengthOverflow,
    /// Pointer not aligned for the element type.
    Misaligned,
}

impl ViolationKind {
    /// Stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NullPointer => "null_pointer",
            Self::NegativeLength => "negative_length",
            Self::LengthOverflow => "length_overflow",
            Self::Misaligned => "misaligned",
        }
    }
}

/// A detected boundary contract violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("contract violation in {entry}: {parameter} ({})", kind.as_str())]
pub struct ContractViolation {
    /// Exported symbol that detected the violation.
    pub entry: &'static str,
    /// Offending parameter name.
    pub parameter: &'static str,
    pub kind: ViolationKind,
}

impl ContractViolation {
    #[must_use]
    pub const fn new(entry: &'static str, parameter: &'static str, kind: ViolationKind) -> Self {
        Self {
            entry,
            parameter,
            kind,
        }
    }
}
