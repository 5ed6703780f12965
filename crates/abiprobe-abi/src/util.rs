//! Shared internal utilities for ABI adapters.

use std::ffi::{CStr, c_char};

use abiprobe_membrane::{ContractViolation, Site, ViolationKind};

/// Count code units before the first zero.
///
/// # Safety
///
/// `ptr` must be valid to read up to and including the terminator.
pub unsafe fn terminated_len<T: Copy + PartialEq + Default>(ptr: *const T) -> usize {
    let zero = T::default();
    let mut i = 0usize;
    while unsafe { *ptr.add(i) } != zero {
        i += 1;
    }
    i
}

/// View a required NUL-terminated byte string.
///
/// # Safety
///
/// When non-null, `ptr` must point to a NUL-terminated string valid for `'a`.
pub unsafe fn c_str<'a>(site: Site, ptr: *const c_char) -> Result<&'a CStr, ContractViolation> {
    if ptr.is_null() {
        return Err(site.violation(ViolationKind::NullPointer));
    }
    // SAFETY: non-null; termination is the caller's contract.
    Ok(unsafe { CStr::from_ptr(ptr) })
}

/// View a required NUL-terminated UTF-16 string, terminator excluded.
///
/// # Safety
///
/// When non-null, `ptr` must be aligned and point to a zero-terminated
/// sequence valid for `'a`.
pub unsafe fn utf16_str<'a>(site: Site, ptr: *const u16) -> Result<&'a [u16], ContractViolation> {
    if ptr.is_null() {
        return Err(site.violation(ViolationKind::NullPointer));
    }
    if (ptr as usize) % std::mem::align_of::<u16>() != 0 {
        return Err(site.violation(ViolationKind::Misaligned));
    }
    let len = unsafe { terminated_len(ptr) };
    // SAFETY: the scan above read exactly `len` units before the terminator.
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
}
