//! Reference semantics of the entry point catalog.
//!
//! Every exported entry point is a thin boundary shim over one of these
//! functions: the shim validates pointers and lengths once, then calls in with
//! slices, references and values. The fixture executor runs the same
//! functions directly as the reference side of a differential check.
//!
//! Arithmetic wraps, matching two's-complement native behavior.

use std::ffi::CStr;

use crate::enums::MyEnum;
use crate::shape::plain::{
    IntToBoolArray, LargeStruct, PointerSize, PointerSizeMember, ReservedRelation, SimplePair,
    SimpleStruct, StructAsClass, StructAsClassWrapper, StructSizeRelation, StructWithMarshal,
    StructWithStaticMarshal,
};
use crate::shape::bitfield::BitField2;
use crate::status::Status;

/// Sentinel accepted by `VerifyReservedParam`.
pub const RESERVED_PARAM: i32 = 42;

/// Value written by `SetAllElements`.
pub const SET_ALL_VALUE: i32 = 10;

/// Name returned by `GetName`.
pub const NAME: &CStr = c"Functions";

/// `GetIntArray`: `out[i] = i`.
pub fn get_int_array(out: &mut [i32]) {
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = i as i32;
    }
}

/// First code unit of a NUL-terminated string; zero for the empty string.
#[must_use]
pub fn first_unit<T: Copy + Default>(text: &[T]) -> T {
    text.first().copied().unwrap_or_default()
}

/// `BoolToIntTest`: the int is forwarded unchanged.
#[must_use]
pub const fn bool_to_int(value: i32) -> i32 {
    value
}

/// `BoolArrayTest`: copies `min(len)` booleans, normalized to 0/1.
pub fn bool_array(input: &[u8], out: &mut [u8]) {
    for (dst, src) in out.iter_mut().zip(input) {
        *dst = u8::from(*src != 0);
    }
}

/// `StructMarshalling`: both structs are copied to their out slots.
#[must_use]
pub const fn struct_marshalling(
    input: StructWithMarshal,
    input_static: StructWithStaticMarshal,
) -> (StructWithMarshal, StructWithStaticMarshal) {
    (input, input_static)
}

#[must_use]
pub const fn sum_of_last_elements(
    input: &StructWithMarshal,
    input_static: &StructWithStaticMarshal,
) -> i32 {
    input.i[2].wrapping_add(input_static.i[2])
}

pub fn set_all_elements(target: &mut StructWithMarshal) {
    target.i = [SET_ALL_VALUE; 3];
}

#[must_use]
pub fn first_element_or_zero(value: Option<&StructWithMarshal>) -> i32 {
    value.map_or(0, |v| v.i[0])
}

#[must_use]
pub const fn pass_through_enum(value: MyEnum) -> MyEnum {
    value
}

pub fn increment(cell: &mut i32) {
    *cell = cell.wrapping_add(1);
}

/// `Add`: `lhs + rhs` when `rhs` is present, else `lhs`. Neither is written.
#[must_use]
pub fn add(lhs: i32, rhs: Option<i32>) -> i32 {
    rhs.map_or(lhs, |r| lhs.wrapping_add(r))
}

#[must_use]
pub fn sum(elements: &[SimpleStruct]) -> i32 {
    elements.iter().fold(0i32, |acc, e| acc.wrapping_add(e.i))
}

/// Empty product is 1.
#[must_use]
pub fn product(elements: &[SimpleStruct]) -> i32 {
    elements.iter().fold(1i32, |acc, e| acc.wrapping_mul(e.i))
}

#[must_use]
pub fn sum_values(value: &LargeStruct) -> i64 {
    value.sum()
}

#[must_use]
pub const fn pass_through_pointer_size(value: PointerSize) -> PointerSize {
    value
}

/// `StructArrayOut`: the out array has an implicit length of one.
pub fn struct_array_out(input: StructWithMarshal, out: &mut [StructWithMarshal]) {
    if let Some(first) = out.first_mut() {
        *first = input;
    }
}

#[must_use]
pub fn sum_inner(elements: &[StructAsClass]) -> i32 {
    elements.iter().fold(0i32, |acc, e| acc.wrapping_add(e.i))
}

pub fn add_one(value: Option<&mut SimpleStruct>) {
    if let Some(v) = value {
        v.i = v.i.wrapping_add(1);
    }
}

#[must_use]
pub const fn enum_out() -> MyEnum {
    MyEnum::TEST_VALUE
}

/// `FirstEnumElement`: caller guarantees at least one element.
#[must_use]
pub fn first_enum_element(elements: &[MyEnum]) -> MyEnum {
    first_unit(elements)
}

#[must_use]
pub fn array_relation_sum(elements: &[SimpleStruct]) -> i32 {
    sum(elements)
}

/// `ArrayRelationOutInitBoolArray`: every element becomes true.
pub fn init_bool_array(out: &mut [u8]) {
    out.fill(1);
}

/// `ArrayRelationInInterfaceArray`: sum of each element's `One()`.
#[must_use]
pub fn sum_of_ones<I: IntoIterator<Item = i32>>(ones: I) -> i32 {
    ones.into_iter().fold(0i32, i32::wrapping_add)
}

#[must_use]
pub fn sum_struct_with_marshal(elements: &[StructWithMarshal]) -> i32 {
    elements
        .iter()
        .flat_map(|e| e.i)
        .fold(0i32, i32::wrapping_add)
}

#[must_use]
pub const fn verify_reserved_param(value: i32) -> bool {
    value == RESERVED_PARAM
}

#[must_use]
pub const fn get_wrapper() -> StructAsClassWrapper {
    StructAsClassWrapper {
        wrapped: StructAsClass { i: 1 },
    }
}

#[must_use]
pub const fn get_simple_struct() -> SimplePair {
    SimplePair { i: 1, j: 2 }
}

#[must_use]
pub const fn get_int_to_bool_array() -> IntToBoolArray {
    IntToBoolArray { i: [1, 0, 1] }
}

/// `And`: true when every element is non-zero.
#[must_use]
pub fn and(value: &IntToBoolArray) -> bool {
    value.i.iter().all(|v| *v != 0)
}

#[must_use]
pub const fn verify_reserved_bits(value: BitField2) -> bool {
    value.is_reserved_intact()
}

#[must_use]
pub const fn pass_through_pointer_size_member(value: PointerSizeMember) -> PointerSizeMember {
    value
}

/// `InitStructSizeRelation`: rejects a struct whose size field is wrong and
/// leaves it untouched; otherwise fills the payload.
pub fn init_struct_size_relation(target: &mut StructSizeRelation) -> Status {
    if !target.is_size_valid() {
        return Status::INVALID_ARGUMENT;
    }
    target.flags = 1;
    target.value = 1.0;
    Status::OK
}

/// `InitReservedRelation`: writes the reserved sentinel and a payload.
pub fn init_reserved_relation(target: &mut ReservedRelation) -> Status {
    *target = ReservedRelation::new(1);
    Status::OK
}

#[must_use]
pub const fn verify_reserved_relation(value: &ReservedRelation) -> bool {
    value.reserved == ReservedRelation::RESERVED
}
