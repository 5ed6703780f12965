//! Bounded views over raw pointer arguments.
//!
//! Every array+length pair and every pointer parameter that crosses the
//! boundary is checked exactly once here and turned into a Rust reference or
//! slice. Code behind the boundary never sees the raw pointer again.
//!
//! Rules enforced:
//! - a negative length is always a violation;
//! - `len == 0` never dereferences, a null pointer with a zero length is fine;
//! - a null pointer with `len > 0` is a violation unless the parameter is
//!   documented optional, in which case the view is `None` (the callee no-ops);
//! - the pointer must be aligned for `T` and the byte extent must fit `isize`.

use std::ffi::c_int;

use crate::violation::{ContractViolation, ViolationKind};

/// Where a check happens: exported symbol plus parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site {
    pub entry: &'static str,
    pub parameter: &'static str,
}

impl Site {
    #[must_use]
    pub const fn new(entry: &'static str, parameter: &'static str) -> Self {
        Self { entry, parameter }
    }

    #[must_use]
    pub const fn violation(self, kind: ViolationKind) -> ContractViolation {
        ContractViolation::new(self.entry, self.parameter, kind)
    }
}

fn checked_len<T>(site: Site, len: c_int) -> Result<usize, ContractViolation> {
    let Ok(count) = usize::try_from(len) else {
        return Err(site.violation(ViolationKind::NegativeLength));
    };
    let bytes = count
        .checked_mul(std::mem::size_of::<T>())
        .ok_or(site.violation(ViolationKind::LengthOverflow))?;
    if bytes > isize::MAX as usize {
        return Err(site.violation(ViolationKind::LengthOverflow));
    }
    Ok(count)
}

fn check_alignment<T>(site: Site, ptr: *const T) -> Result<(), ContractViolation> {
    if (ptr as usize) % std::mem::align_of::<T>() != 0 {
        return Err(site.violation(ViolationKind::Misaligned));
    }
    Ok(())
}

/// Validate a required array+length pair.
///
/// # Safety
///
/// When the checks pass, `ptr` must be valid for reads of `len` elements for
/// the lifetime `'a` chosen by the caller.
pub unsafe fn array<'a, T>(site: Site, ptr: *const T, len: c_int) -> Result<&'a [T], ContractViolation> {
    let count = checked_len::<T>(site, len)?;
    if count == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(site.violation(ViolationKind::NullPointer));
    }
    check_alignment(site, ptr)?;
    // SAFETY: non-null, aligned, extent fits isize; validity is the caller's contract.
    Ok(unsafe { std::slice::from_raw_parts(ptr, count) })
}

/// Validate an optional array+length pair. `Ok(None)` means "null, no-op".
///
/// # Safety
///
/// Same as [`array`].
pub unsafe fn optional_array<'a, T>(
    site: Site,
    ptr: *const T,
    len: c_int,
) -> Result<Option<&'a [T]>, ContractViolation> {
    let count = checked_len::<T>(site, len)?;
    if ptr.is_null() {
        return Ok(None);
    }
    if count == 0 {
        return Ok(Some(&[]));
    }
    check_alignment(site, ptr)?;
    // SAFETY: see `array`.
    Ok(Some(unsafe { std::slice::from_raw_parts(ptr, count) }))
}

/// Validate a required writable array+length pair.
///
/// # Safety
///
/// When the checks pass, `ptr` must be valid for reads and writes of `len`
/// elements for `'a` and not aliased elsewhere during that time.
pub unsafe fn array_mut<'a, T>(
    site: Site,
    ptr: *mut T,
    len: c_int,
) -> Result<&'a mut [T], ContractViolation> {
    let count = checked_len::<T>(site, len)?;
    if count == 0 {
        return Ok(&mut []);
    }
    if ptr.is_null() {
        return Err(site.violation(ViolationKind::NullPointer));
    }
    check_alignment(site, ptr.cast_const())?;
    // SAFETY: see `array`; exclusivity is the caller's contract.
    Ok(unsafe { std::slice::from_raw_parts_mut(ptr, count) })
}

/// Validate an optional writable array+length pair.
///
/// # Safety
///
/// Same as [`array_mut`].
pub unsafe fn optional_array_mut<'a, T>(
    site: Site,
    ptr: *mut T,
    len: c_int,
) -> Result<Option<&'a mut [T]>, ContractViolation> {
    if ptr.is_null() {
        checked_len::<T>(site, len)?;
        return Ok(None);
    }
    // SAFETY: forwarded contract.
    unsafe { array_mut(site, ptr, len) }.map(Some)
}

/// Validate a required pointer to a single value.
///
/// # Safety
///
/// When non-null and aligned, `ptr` must be valid for reads for `'a`.
pub unsafe fn value<'a, T>(site: Site, ptr: *const T) -> Result<&'a T, ContractViolation> {
    if ptr.is_null() {
        return Err(site.violation(ViolationKind::NullPointer));
    }
    check_alignment(site, ptr)?;
    // SAFETY: non-null and aligned; validity is the caller's contract.
    Ok(unsafe { &*ptr })
}

/// Validate an optional pointer to a single value.
///
/// # Safety
///
/// Same as [`value`].
pub unsafe fn optional_value<'a, T>(site: Site, ptr: *const T) -> Result<Option<&'a T>, ContractViolation> {
    if ptr.is_null() {
        return Ok(None);
    }
    // SAFETY: forwarded contract.
    unsafe { value(site, ptr) }.map(Some)
}

/// Validate a required pointer to a single writable value.
///
/// # Safety
///
/// When non-null and aligned, `ptr` must be valid for reads and writes for
/// `'a` and not aliased elsewhere during that time.
pub unsafe fn value_mut<'a, T>(site: Site, ptr: *mut T) -> Result<&'a mut T, ContractViolation> {
    if ptr.is_null() {
        return Err(site.violation(ViolationKind::NullPointer));
    }
    check_alignment(site, ptr.cast_const())?;
    // SAFETY: non-null and aligned; validity is the caller's contract.
    Ok(unsafe { &mut *ptr })
}

/// Validate an optional pointer to a single writable value.
///
/// # Safety
///
/// Same as [`value_mut`].
pub unsafe fn optional_value_mut<'a, T>(
    site: Site,
    ptr: *mut T,
) -> Result<Option<&'a mut T>, ContractViolation> {
    if ptr.is_null() {
        return Ok(None);
    }
    // SAFETY: forwarded contract.
    unsafe { value_mut(site, ptr) }.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: Site = Site::new("Sum", "elements");

    #[test]
    fn zero_length_null_is_empty() {
        let view = unsafe { array::<i32>(SITE, std::ptr::null(), 0) }.unwrap();
        assert!(view.is_empty());
    }

    #[test]
    fn null_with_length_is_violation() {
        let err = unsafe { array::<i32>(SITE, std::ptr::null(), 3) }.unwrap_err();
        assert_eq!(err.kind, ViolationKind::NullPointer);
        assert_eq!(err.entry, "Sum");
    }

    #[test]
    fn negative_length_is_violation_even_when_optional() {
        let err = unsafe { optional_array::<i32>(SITE, std::ptr::null(), -1) }.unwrap_err();
        assert_eq!(err.kind, ViolationKind::NegativeLength);
    }

    #[test]
    fn optional_null_is_none() {
        let view = unsafe { optional_array::<i32>(SITE, std::ptr::null(), 4) }.unwrap();
        assert!(view.is_none());
    }

    #[test]
    fn array_reads_exactly_len() {
        let data = [1, 2, 3, 4];
        let view = unsafe { array(SITE, data.as_ptr(), 3) }.unwrap();
        assert_eq!(view, &[1, 2, 3]);
    }

    #[test]
    fn misaligned_pointer_is_violation() {
        let data = [0u64; 2];
        let skewed = unsafe { data.as_ptr().cast::<u8>().add(1) }.cast::<u64>();
        let err = unsafe { array(SITE, skewed, 1) }.unwrap_err();
        assert_eq!(err.kind, ViolationKind::Misaligned);
    }

    #[test]
    fn writable_views_write_through() {
        let mut data = [0i32; 3];
        let view = unsafe { array_mut(SITE, data.as_mut_ptr(), 3) }.unwrap();
        view[2] = 9;
        assert_eq!(data, [0, 0, 9]);

        let mut cell = 5;
        *unsafe { value_mut(SITE, &mut cell) }.unwrap() += 1;
        assert_eq!(cell, 6);
        assert!(unsafe { optional_value_mut::<i32>(SITE, std::ptr::null_mut()) }
            .unwrap()
            .is_none());
    }
}
