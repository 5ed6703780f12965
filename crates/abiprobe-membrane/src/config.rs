//! Runtime contract mode configuration.
//!
//! The mode is set via the `ABIPROBE_MODE` environment variable:
//! - `strict` (default): a contract violation at the boundary (null pointer
//!   where none is documented optional, negative or overflowing length) is
//!   fatal. The entry point panics with a defined message; across an
//!   `extern` boundary that aborts the process.
//! - `hardened`: the violation is recorded and the entry point returns its
//!   documented safe default (no-op, zero, null, `INVALID_POINTER`).
//! - `off`: telemetry disabled. Violations are still handled as in
//!   `hardened`; the boundary never dereferences an invalid pointer.

use std::sync::atomic::{AtomicU8, Ordering};

/// Contract enforcement mode for boundary checks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractMode {
    /// Violations are fatal.
    #[default]
    Strict,
    /// Violations are recorded and answered with the documented safe default.
    Hardened,
    /// Like hardened, without telemetry. Benchmark baseline.
    Off,
}

impl ContractMode {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" | "default" | "fatal" => Self::Strict,
            "hardened" | "recover" | "safe-default" => Self::Hardened,
            "off" | "none" | "disabled" => Self::Off,
            _ => Self::Strict,
        }
    }

    /// Returns true if a violation must abort the call.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Strict)
    }

    /// Returns true if counters and violation records are kept.
    #[must_use]
    pub const fn telemetry_enabled(self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Stable label used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Hardened => "hardened",
            Self::Off => "off",
        }
    }
}

// 0=unresolved, 1=Strict, 2=Hardened, 3=Off, 255=resolving.
static CACHED_MODE: AtomicU8 = AtomicU8::new(0);

const MODE_UNRESOLVED: u8 = 0;
const MODE_STRICT: u8 = 1;
const MODE_HARDENED: u8 = 2;
const MODE_OFF: u8 = 3;
const MODE_RESOLVING: u8 = 255;

fn mode_to_u8(mode: ContractMode) -> u8 {
    match mode {
        ContractMode::Strict => MODE_STRICT,
        ContractMode::Hardened => MODE_HARDENED,
        ContractMode::Off => MODE_OFF,
    }
}

fn u8_to_mode(v: u8) -> ContractMode {
    match v {
        MODE_HARDENED => ContractMode::Hardened,
        MODE_OFF => ContractMode::Off,
        _ => ContractMode::Strict,
    }
}

/// Get the configured contract mode (reads the env var on first call, caches thereafter).
///
/// A call that races the first resolution observes `Strict` until the
/// resolving caller publishes the parsed value.
#[must_use]
pub fn contract_mode() -> ContractMode {
    let cached = CACHED_MODE.load(Ordering::Acquire);

    if cached != MODE_UNRESOLVED && cached != MODE_RESOLVING {
        return u8_to_mode(cached);
    }

    if cached == MODE_RESOLVING {
        return ContractMode::Strict;
    }

    if CACHED_MODE
        .compare_exchange(
            MODE_UNRESOLVED,
            MODE_RESOLVING,
            Ordering::SeqCst,
            Ordering::Relaxed,
        )
        .is_err()
    {
        let v = CACHED_MODE.load(Ordering::Acquire);
        return if v != MODE_UNRESOLVED && v != MODE_RESOLVING {
            u8_to_mode(v)
        } else {
            ContractMode::Strict
        };
    }

    let mode = std::env::var("ABIPROBE_MODE")
        .map(|v| ContractMode::from_str_loose(&v))
        .unwrap_or_default();
    CACHED_MODE.store(mode_to_u8(mode), Ordering::Release);
    mode
}

/// Override the cached mode for the rest of the process.
///
/// Intended for test binaries and benches that need a specific mode without
/// touching the environment.
pub fn set_contract_mode(mode: ContractMode) {
    CACHED_MODE.store(mode_to_u8(mode), Ordering::Release);
}
