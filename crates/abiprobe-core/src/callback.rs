//! Reference behavior of a host-supplied callback object and the fixed inputs
//! the native-side probe drives it with.
//!
//! A conforming handler answers every probe exactly as [`CallbackProbeReport::expected`]
//! predicts.

use std::ffi::CStr;

use crate::enums::MethodOperation;
use crate::shape::plain::{CallbackLargeStruct, LargeStructWithMarshalling};

/// Name reported by the reference handler.
pub const HANDLER_NAME: &CStr = c"CallbackHandler";

#[must_use]
pub const fn add(i: i32, j: i32) -> i32 {
    i.wrapping_add(j)
}

#[must_use]
pub const fn get_large_struct(a: i64, b: i64) -> CallbackLargeStruct {
    CallbackLargeStruct { a, b }
}

#[must_use]
pub const fn get_large_marshalled_struct(a: i64, b: i64, c: i64) -> LargeStructWithMarshalling {
    LargeStructWithMarshalling { i: [a, b, c] }
}

/// Reinterprets the unsigned argument as signed.
#[must_use]
pub const fn mapped_type_test(value: u32) -> i32 {
    value as i32
}

#[must_use]
pub const fn modify_pointer(ptr: isize, op: MethodOperation) -> isize {
    op.apply(ptr)
}

/// Logical AND over booleans carried as bytes; true for an empty array.
#[must_use]
pub fn array_relation_and(values: &[u8]) -> bool {
    values.iter().all(|v| *v != 0)
}

#[must_use]
pub fn array_relation_sum(values: &[i32]) -> i32 {
    values.iter().fold(0i32, |acc, v| acc.wrapping_add(*v))
}

/// Sum of every element of every struct.
#[must_use]
pub fn array_relation_sum_struct(values: &[LargeStructWithMarshalling]) -> i64 {
    values
        .iter()
        .flat_map(|v| v.i)
        .fold(0i64, i64::wrapping_add)
}

/// Fixed inputs of the native-side probe.
pub mod probe_inputs {
    use crate::enums::MethodOperation;

    pub const ADD: (i32, i32) = (1, 2);
    pub const INCREMENT_FROM: i32 = 4;
    pub const ANSI_TEXT: &core::ffi::CStr = c"ABC";
    pub const UTF16_TEXT: [u16; 4] = [b'A' as u16, b'B' as u16, b'C' as u16, 0];
    pub const LARGE_STRUCT: (i64, i64) = (4, 10);
    pub const LARGE_MARSHALLED: (i64, i64, i64) = (3, 2, 1);
    pub const MAPPED: u32 = 20;
    pub const POINTER: isize = 5;
    pub const POINTER_OPS: [MethodOperation; 2] =
        [MethodOperation::PASS_THROUGH, MethodOperation::INCREMENT];
    pub const AND_ARRAY: [u8; 3] = [1, 1, 1];
    pub const SUM_ARRAY: [i32; 3] = [1, 2, 3];
    pub const CLONE_ADD: (i32, i32) = (0, 1);
}

/// What the native-side probe observed, written across the boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallbackProbeReport {
    pub add: i32,
    pub zero: i32,
    pub incremented: i32,
    pub first_ansi: u8,
    pub are_equal_self: u8,
    pub array_and: u8,
    pub clone_succeeded: u8,
    pub first_utf16: u16,
    pub clone_add: i32,
    pub large_struct: CallbackLargeStruct,
    pub large_marshalled: LargeStructWithMarshalling,
    pub mapped: i32,
    pub array_sum: i32,
    pub pointer_pass_through: isize,
    pub pointer_increment: isize,
    pub array_sum_struct: i64,
    pub name_len: usize,
}

impl CallbackProbeReport {
    /// Report produced by a conforming handler named `name`.
    #[must_use]
    pub fn expected(name: &CStr) -> Self {
        use probe_inputs as p;
        let large_marshalled = get_large_marshalled_struct(
            p::LARGE_MARSHALLED.0,
            p::LARGE_MARSHALLED.1,
            p::LARGE_MARSHALLED.2,
        );
        Self {
            add: add(p::ADD.0, p::ADD.1),
            zero: 0,
            incremented: p::INCREMENT_FROM.wrapping_add(1),
            first_ansi: p::ANSI_TEXT.to_bytes().first().copied().unwrap_or(0),
            are_equal_self: 1,
            array_and: u8::from(array_relation_and(&p::AND_ARRAY)),
            clone_succeeded: 1,
            first_utf16: p::UTF16_TEXT[0],
            clone_add: add(p::CLONE_ADD.0, p::CLONE_ADD.1),
            large_struct: get_large_struct(p::LARGE_STRUCT.0, p::LARGE_STRUCT.1),
            large_marshalled,
            mapped: mapped_type_test(p::MAPPED),
            array_sum: array_relation_sum(&p::SUM_ARRAY),
            pointer_pass_through: modify_pointer(p::POINTER, p::POINTER_OPS[0]),
            pointer_increment: modify_pointer(p::POINTER, p::POINTER_OPS[1]),
            array_sum_struct: array_relation_sum_struct(&[large_marshalled]),
            name_len: name.to_bytes().len(),
        }
    }

    /// Field names that differ from `expected`.
    #[must_use]
    pub fn mismatches(&self, expected: &Self) -> Vec<&'static str> {
        let mut out = Vec::new();
        macro_rules! check {
            ($($field:ident),* $(,)?) => {
                $(if self.$field != expected.$field {
                    out.push(stringify!($field));
                })*
            };
        }
        check!(
            add,
            zero,
            incremented,
            first_ansi,
            are_equal_self,
            array_and,
            clone_succeeded,
            first_utf16,
            clone_add,
            large_struct,
            large_marshalled,
            mapped,
            array_sum,
            pointer_pass_through,
            pointer_increment,
            array_sum_struct,
            name_len,
        );
        out
    }
}
