//! Free-function entry points.
//!
//! Each shim validates its pointer and length arguments once through the
//! membrane views, then delegates to `abiprobe_core::functions`. On a
//! contract violation in hardened mode the documented safe default is
//! returned: nothing is written, numeric results are zero (one for an empty
//! product), booleans are false and pointers are null.

use std::ffi::{c_char, c_int, c_void};

use abiprobe_core::functions as reference;
use abiprobe_core::shape::plain::{
    IntToBoolArray, LargeStruct, PointerSize, SimplePair, SimpleStruct, StructAsClass,
    StructAsClassWrapper, StructWithMarshal, StructWithStaticMarshal,
};
use abiprobe_core::MyEnum;
use abiprobe_membrane::view::{self, Site};
use abiprobe_membrane::ViolationKind;

use crate::interface_abi::{IElement, new_element};
use crate::macros::abi_fn;
use crate::object::ComPtr;
use crate::runtime_policy::check;
use crate::util;

fn fill_with_elements(slots: &mut [*mut c_void]) {
    for slot in slots {
        *slot = new_element();
    }
}

abi_fn! {
    /// Write `count` new `IElement` objects, one reference each.
    fn get_interfaces as "GetInterfaces"(count: c_int, results: *mut *mut c_void) {
        if let Some(slots) = check(view::array_mut(Site::new("GetInterfaces", "results"), results, count)) {
            fill_with_elements(slots);
        }
    }
}

abi_fn! {
    /// As `GetInterfaces`; a null `results` is a no-op.
    fn get_interfaces_optional as "GetInterfacesOptional"(count: c_int, results: *mut *mut c_void) {
        let site = Site::new("GetInterfacesOptional", "results");
        if let Some(Some(slots)) = check(view::optional_array_mut(site, results, count)) {
            fill_with_elements(slots);
        }
    }
}

abi_fn! {
    fn get_int_array as "GetIntArray"(count: c_int, results: *mut c_int) {
        if let Some(out) = check(view::array_mut(Site::new("GetIntArray", "results"), results, count)) {
            reference::get_int_array(out);
        }
    }
}

abi_fn! {
    fn get_first_character as "GetFirstCharacter"(text: *const u16) -> u16 {
        check(util::utf16_str(Site::new("GetFirstCharacter", "text"), text))
            .map_or(0, reference::first_unit)
    }
}

abi_fn! {
    fn get_first_ansi_character as "GetFirstAnsiCharacter"(text: *const c_char) -> c_char {
        check(util::c_str(Site::new("GetFirstAnsiCharacter", "text"), text))
            .map_or(0, |s| reference::first_unit(s.to_bytes()) as c_char)
    }
}

abi_fn! {
    fn bool_to_int_test as "BoolToIntTest"(value: c_int, out: *mut c_int) {
        if let Some(out) = check(view::value_mut(Site::new("BoolToIntTest", "out"), out)) {
            *out = reference::bool_to_int(value);
        }
    }
}

abi_fn! {
    /// Copy `count` booleans from `input` to `out`, normalized to 0/1.
    fn bool_array_test as "BoolArrayTest"(input: *const u8, out: *mut u8, count: c_int) {
        let Some(input) = check(view::array(Site::new("BoolArrayTest", "input"), input, count)) else {
            return;
        };
        if let Some(out) = check(view::array_mut(Site::new("BoolArrayTest", "out"), out, count)) {
            reference::bool_array(input, out);
        }
    }
}

abi_fn! {
    /// Both out slots are validated before either is written.
    fn struct_marshalling as "StructMarshalling"(
        input: StructWithMarshal,
        input_static: StructWithStaticMarshal,
        out: *mut StructWithMarshal,
        out_static: *mut StructWithStaticMarshal,
    ) {
        let Some(out) = check(view::value_mut(Site::new("StructMarshalling", "out"), out)) else {
            return;
        };
        let Some(out_static) = check(view::value_mut(Site::new("StructMarshalling", "out_static"), out_static)) else {
            return;
        };
        (*out, *out_static) = reference::struct_marshalling(input, input_static);
    }
}

abi_fn! {
    /// Single-element arrays on both sides.
    fn struct_array_marshalling as "StructArrayMarshalling"(
        input: *const StructWithMarshal,
        input_static: *const StructWithStaticMarshal,
        out: *mut StructWithMarshal,
        out_static: *mut StructWithStaticMarshal,
    ) {
        const ENTRY: &str = "StructArrayMarshalling";
        let Some(input) = check(view::value(Site::new(ENTRY, "input"), input)) else {
            return;
        };
        let Some(input_static) = check(view::value(Site::new(ENTRY, "input_static"), input_static)) else {
            return;
        };
        let Some(out) = check(view::value_mut(Site::new(ENTRY, "out"), out)) else {
            return;
        };
        let Some(out_static) = check(view::value_mut(Site::new(ENTRY, "out_static"), out_static)) else {
            return;
        };
        (*out, *out_static) = reference::struct_marshalling(*input, *input_static);
    }
}

abi_fn! {
    fn sum_of_last_elements as "SumOfLastElements"(
        input: *const StructWithMarshal,
        input_static: *const StructWithStaticMarshal,
    ) -> c_int {
        let Some(input) = check(view::value(Site::new("SumOfLastElements", "input"), input)) else {
            return 0;
        };
        let Some(input_static) = check(view::value(Site::new("SumOfLastElements", "input_static"), input_static)) else {
            return 0;
        };
        reference::sum_of_last_elements(input, input_static)
    }
}

abi_fn! {
    fn set_all_elements as "SetAllElements"(target: *mut StructWithMarshal) {
        if let Some(target) = check(view::value_mut(Site::new("SetAllElements", "target"), target)) {
            reference::set_all_elements(target);
        }
    }
}

abi_fn! {
    fn first_element_or_zero as "FirstElementOrZero"(value: *const StructWithMarshal) -> c_int {
        check(view::optional_value(Site::new("FirstElementOrZero", "value"), value))
            .map_or(0, reference::first_element_or_zero)
    }
}

abi_fn! {
    fn fast_out_test as "FastOutTest"(out: *mut *mut c_void) {
        if let Some(slot) = check(view::value_mut(Site::new("FastOutTest", "out"), out)) {
            *slot = new_element();
        }
    }
}

abi_fn! {
    /// Any bit pattern, declared or not, comes back unchanged.
    fn pass_through_enum as "PassThroughEnum"(value: MyEnum) -> MyEnum {
        reference::pass_through_enum(value)
    }
}

abi_fn! {
    fn increment as "Increment"(cell: *mut c_int) {
        if let Some(cell) = check(view::value_mut(Site::new("Increment", "cell"), cell)) {
            reference::increment(cell);
        }
    }
}

abi_fn! {
    /// `*lhs + *rhs`, or `*lhs` when `rhs` is null. Neither is written.
    fn add as "Add"(lhs: *const c_int, rhs: *const c_int) -> c_int {
        let Some(lhs) = check(view::value(Site::new("Add", "lhs"), lhs)) else {
            return 0;
        };
        let Some(rhs) = check(view::optional_value(Site::new("Add", "rhs"), rhs)) else {
            return 0;
        };
        reference::add(*lhs, rhs.copied())
    }
}

abi_fn! {
    /// Static string, valid for the life of the library.
    fn get_name as "GetName"() -> *const c_char {
        reference::NAME.as_ptr()
    }
}

abi_fn! {
    /// Null `elements` sums nothing.
    fn sum as "Sum"(count: c_int, elements: *const SimpleStruct) -> c_int {
        check(view::optional_array(Site::new("Sum", "elements"), elements, count))
            .map_or(0, |elements| reference::sum(elements.unwrap_or_default()))
    }
}

abi_fn! {
    /// Null `elements` is the empty product, 1.
    fn product as "Product"(count: c_int, elements: *const SimpleStruct) -> c_int {
        check(view::optional_array(Site::new("Product", "elements"), elements, count))
            .map_or(1, |elements| reference::product(elements.unwrap_or_default()))
    }
}

abi_fn! {
    fn sum_values as "SumValues"(value: LargeStruct) -> i64 {
        reference::sum_values(&value)
    }
}

abi_fn! {
    fn pass_through_pointer_size as "PassThroughPointerSize"(value: PointerSize) -> PointerSize {
        reference::pass_through_pointer_size(value)
    }
}

abi_fn! {
    /// `out` is an optional array of implicit length one.
    fn struct_array_out as "StructArrayOut"(input: StructWithMarshal, out: *mut StructWithMarshal) {
        if let Some(Some(out)) = check(view::optional_value_mut(Site::new("StructArrayOut", "out"), out)) {
            reference::struct_array_out(input, std::slice::from_mut(out));
        }
    }
}

abi_fn! {
    fn sum_inner as "SumInner"(elements: *const StructAsClass, count: c_int) -> c_int {
        check(view::array(Site::new("SumInner", "elements"), elements, count)).map_or(0, reference::sum_inner)
    }
}

abi_fn! {
    fn add_one as "AddOne"(value: *mut SimpleStruct) {
        if let Some(value) = check(view::optional_value_mut(Site::new("AddOne", "value"), value)) {
            reference::add_one(value);
        }
    }
}

abi_fn! {
    fn enum_out as "EnumOut"(out: *mut MyEnum) {
        if let Some(out) = check(view::value_mut(Site::new("EnumOut", "out"), out)) {
            *out = reference::enum_out();
        }
    }
}

abi_fn! {
    /// Reads the first element of an array the caller guarantees is non-empty.
    fn first_enum_element as "FirstEnumElement"(elements: *const MyEnum) -> MyEnum {
        check(view::value(Site::new("FirstEnumElement", "elements"), elements))
            .map_or(MyEnum::default(), |first| reference::first_enum_element(std::slice::from_ref(first)))
    }
}

abi_fn! {
    fn array_relation_sum as "ArrayRelationSum"(count: c_int, elements: *const SimpleStruct) -> c_int {
        check(view::array(Site::new("ArrayRelationSum", "elements"), elements, count))
            .map_or(0, reference::array_relation_sum)
    }
}

abi_fn! {
    fn array_relation_out_init_bool_array as "ArrayRelationOutInitBoolArray"(out: *mut u8, count: c_int) {
        let site = Site::new("ArrayRelationOutInitBoolArray", "out");
        if let Some(out) = check(view::array_mut(site, out, count)) {
            reference::init_bool_array(out);
        }
    }
}

abi_fn! {
    fn array_relation_out_get_interfaces_with_relation as "ArrayRelationOutGetInterfacesWithRelation"(
        count: c_int,
        results: *mut *mut c_void,
    ) {
        let site = Site::new("ArrayRelationOutGetInterfacesWithRelation", "results");
        if let Some(slots) = check(view::array_mut(site, results, count)) {
            fill_with_elements(slots);
        }
    }
}

abi_fn! {
    /// Sum of `One()` over the elements, each called through its table.
    fn array_relation_in_interface_array as "ArrayRelationInInterfaceArray"(
        count: c_int,
        elements: *const *mut c_void,
    ) -> c_int {
        const SITE: Site = Site::new("ArrayRelationInInterfaceArray", "elements");
        let Some(elements) = check(view::array(SITE, elements, count)) else {
            return 0;
        };
        let mut handles = Vec::with_capacity(elements.len());
        for &raw in elements {
            let element = ComPtr::<IElement>::from_borrowed(raw);
            let Some(element) = check(element.ok_or(SITE.violation(ViolationKind::NullPointer))) else {
                return 0;
            };
            handles.push(element);
        }
        reference::sum_of_ones(handles.iter().map(ComPtr::<IElement>::one))
    }
}

abi_fn! {
    fn array_relation_sum_struct_with_marshal as "ArrayRelationSumStructWithMarshal"(
        count: c_int,
        elements: *const StructWithMarshal,
    ) -> c_int {
        let site = Site::new("ArrayRelationSumStructWithMarshal", "elements");
        check(view::array(site, elements, count)).map_or(0, reference::sum_struct_with_marshal)
    }
}

abi_fn! {
    fn verify_reserved_param as "VerifyReservedParam"(value: c_int) -> bool {
        reference::verify_reserved_param(value)
    }
}

abi_fn! {
    fn get_wrapper as "GetWrapper"() -> StructAsClassWrapper {
        reference::get_wrapper()
    }
}

abi_fn! {
    fn get_simple_struct as "GetSimpleStruct"() -> SimplePair {
        reference::get_simple_struct()
    }
}

abi_fn! {
    fn get_int_to_bool_array as "GetIntToBoolArray"() -> IntToBoolArray {
        reference::get_int_to_bool_array()
    }
}

abi_fn! {
    fn and as "And"(value: IntToBoolArray) -> bool {
        reference::and(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abiprobe_core::shape::Shape;
    use abiprobe_membrane::global_tracker;

    #[test]
    fn get_int_array_writes_indices() {
        let mut out = [-1; 5];
        unsafe { get_int_array(5, out.as_mut_ptr()) };
        assert_eq!(out, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn zero_length_arrays_accept_null() {
        unsafe {
            get_int_array(0, std::ptr::null_mut());
            assert_eq!(sum_inner(std::ptr::null(), 0), 0);
            assert_eq!(array_relation_sum(0, std::ptr::null()), 0);
        }
    }

    #[test]
    fn optional_pointers_fall_back() {
        unsafe {
            assert_eq!(sum(3, std::ptr::null()), 0);
            assert_eq!(product(3, std::ptr::null()), 1);
            assert_eq!(first_element_or_zero(std::ptr::null()), 0);
            let lhs = 40;
            assert_eq!(add(&lhs, std::ptr::null()), 40);
            let rhs = 2;
            assert_eq!(add(&lhs, &rhs), 42);
            add_one(std::ptr::null_mut());
            struct_array_out(StructWithMarshal::canonical(), std::ptr::null_mut());
            get_interfaces_optional(2, std::ptr::null_mut());
        }
    }

    #[test]
    fn sum_and_product_over_arrays() {
        let elements = [SimpleStruct { i: 2 }, SimpleStruct { i: 3 }, SimpleStruct { i: 4 }];
        unsafe {
            assert_eq!(sum(3, elements.as_ptr()), 9);
            assert_eq!(product(3, elements.as_ptr()), 24);
            assert_eq!(product(0, elements.as_ptr()), 1);
        }
    }

    #[test]
    fn strings_read_first_unit() {
        let wide = [0x00E9u16, 0x41, 0];
        unsafe {
            assert_eq!(get_first_character(wide.as_ptr()), 0x00E9);
            assert_eq!(get_first_ansi_character(c"xyz".as_ptr()), b'x' as c_char);
            assert_eq!(get_first_ansi_character(c"".as_ptr()), 0);
        }
    }

    #[test]
    fn bool_array_normalizes() {
        let input = [0u8, 2, 255];
        let mut out = [9u8; 3];
        unsafe { bool_array_test(input.as_ptr(), out.as_mut_ptr(), 3) };
        assert_eq!(out, [0, 1, 1]);
    }

    #[test]
    fn struct_marshalling_copies_both() {
        let mut out = StructWithMarshal::default();
        let mut out_static = StructWithStaticMarshal::default();
        unsafe {
            struct_marshalling(
                StructWithMarshal::canonical(),
                StructWithStaticMarshal::canonical(),
                &mut out,
                &mut out_static,
            );
        }
        assert!(out.round_trip_eq(&StructWithMarshal::canonical()));
        assert_eq!(out_static, StructWithStaticMarshal::canonical());

        let input = StructWithMarshal { i: [7, 8, 9] };
        let input_static = StructWithStaticMarshal { i: [1, 1, 1] };
        unsafe {
            struct_array_marshalling(&input, &input_static, &mut out, &mut out_static);
            assert_eq!(sum_of_last_elements(&input, &input_static), 10);
        }
        assert_eq!(out, input);
        assert_eq!(out_static, input_static);
    }

    #[test]
    fn set_all_and_struct_array_out() {
        let mut target = StructWithMarshal::canonical();
        unsafe { set_all_elements(&mut target) };
        assert_eq!(target.i, [10; 3]);
        let mut slot = StructWithMarshal::default();
        unsafe { struct_array_out(StructWithMarshal { i: [3, 2, 1] }, &mut slot) };
        assert_eq!(slot.i, [3, 2, 1]);
    }

    #[test]
    fn enums_pass_through_raw_values() {
        unsafe {
            assert_eq!(pass_through_enum(MyEnum(77)), MyEnum(77));
            let mut out = MyEnum(0);
            enum_out(&mut out);
            assert_eq!(out, MyEnum::TEST_VALUE);
            let elements = [MyEnum(5), MyEnum(6)];
            assert_eq!(first_enum_element(elements.as_ptr()), MyEnum(5));
        }
    }

    #[test]
    fn interface_arrays_carry_one_reference_each() {
        let mut slots = [std::ptr::null_mut(); 3];
        unsafe { get_interfaces(3, slots.as_mut_ptr()) };
        assert!(slots.iter().all(|p| global_tracker().is_live(*p as usize)));
        assert_eq!(unsafe { array_relation_in_interface_array(3, slots.as_ptr()) }, 3);
        let handles: Vec<ComPtr<IElement>> = slots
            .iter()
            .map(|p| unsafe { ComPtr::from_raw(*p) }.unwrap())
            .collect();
        assert!(handles.iter().all(|h| h.ref_count() == 1));
        drop(handles);
        assert!(slots.iter().all(|p| !global_tracker().is_live(*p as usize)));
    }

    #[test]
    fn fast_out_and_relation_outputs() {
        let mut out = std::ptr::null_mut();
        unsafe { fast_out_test(&mut out) };
        let element = unsafe { ComPtr::<IElement>::from_raw(out) }.unwrap();
        assert_eq!(element.one(), 1);

        let mut flags = [0u8; 4];
        unsafe { array_relation_out_init_bool_array(flags.as_mut_ptr(), 4) };
        assert_eq!(flags, [1; 4]);

        let mut slots = [std::ptr::null_mut(); 2];
        unsafe { array_relation_out_get_interfaces_with_relation(2, slots.as_mut_ptr()) };
        for p in slots {
            drop(unsafe { ComPtr::<IElement>::from_raw(p) }.unwrap());
        }
    }

    #[test]
    fn struct_returns_match_reference() {
        unsafe {
            assert_eq!(get_wrapper().wrapped.i, 1);
            assert_eq!(get_simple_struct(), SimplePair { i: 1, j: 2 });
            assert_eq!(get_int_to_bool_array().i, [1, 0, 1]);
            assert!(!and(get_int_to_bool_array()));
            assert!(and(IntToBoolArray { i: [1, -1, 5] }));
            assert!(verify_reserved_param(42));
            assert!(!verify_reserved_param(41));
            assert_eq!(sum_values(LargeStruct::canonical()), LargeStruct::canonical().sum());
        }
    }

    #[test]
    fn name_is_static() {
        let name = unsafe { std::ffi::CStr::from_ptr(get_name()) };
        assert_eq!(name, c"Functions");
    }
}
