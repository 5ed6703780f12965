//! Machine-word status channel.
//!
//! Zero is success. Failure classes reuse the COM 32-bit codes, sign-extended
//! to the machine word so the value is identical on every pointer width.

use std::fmt;

/// Status returned by status-returning operations.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Status(pub isize);

const fn sign_extend(code: u32) -> isize {
    code as i32 as isize
}

impl Status {
    pub const OK: Self = Self(0);
    pub const NOT_IMPLEMENTED: Self = Self(sign_extend(0x8000_4001));
    pub const NOT_SUPPORTED: Self = Self(sign_extend(0x8000_4002));
    pub const INVALID_POINTER: Self = Self(sign_extend(0x8000_4003));
    pub const FAILED: Self = Self(sign_extend(0x8000_4005));
    pub const INVALID_ARGUMENT: Self = Self(sign_extend(0x8007_0057));

    #[must_use]
    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_err(self) -> bool {
        self.0 != 0
    }

    /// Documented failure class name, or `None` for success and unknown codes.
    #[must_use]
    pub const fn class(self) -> Option<&'static str> {
        match self {
            Self::NOT_IMPLEMENTED => Some("not_implemented"),
            Self::NOT_SUPPORTED => Some("not_supported"),
            Self::INVALID_POINTER => Some("invalid_pointer"),
            Self::FAILED => Some("failed"),
            Self::INVALID_ARGUMENT => Some("invalid_argument"),
            _ => None,
        }
    }

    /// The low 32 bits, as a COM-style code.
    #[must_use]
    pub const fn code(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return f.write_str("ok");
        }
        match self.class() {
            Some(class) => write!(f, "{class} (0x{:08X})", self.code()),
            None => write!(f, "status 0x{:08X}", self.code()),
        }
    }
}
