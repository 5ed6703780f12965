//! Contract violations in hardened mode: every entry point answers with its
//! documented safe default and the violation is recorded.
//!
//! The mode is process-wide, so every test in this binary runs hardened.

use std::ffi::c_void;
use std::ptr;

use abiprobe_abi::callback_abi::run_callback_probe;
use abiprobe_abi::functions_abi::{
    add, array_relation_in_interface_array, array_relation_sum, bool_to_int_test, get_first_character,
    get_int_array, get_interfaces, increment, set_all_elements, sum, sum_inner,
};
use abiprobe_abi::interface_abi::{
    DEFAULT_VALUE, IElement, IInterface2, clone_instance, create_instance, create_instance2,
};
use abiprobe_abi::object::ComPtr;
use abiprobe_abi::runtime_policy;
use abiprobe_abi::struct_abi::{init_reserved_relation, init_struct_size_relation};
use abiprobe_core::shape::plain::{SimpleStruct, StructAsClass};
use abiprobe_core::Status;
use abiprobe_membrane::config::{ContractMode, set_contract_mode};
use abiprobe_membrane::ViolationKind;

fn hardened() {
    set_contract_mode(ContractMode::Hardened);
}

fn violations(entry: &str) -> u64 {
    runtime_policy::entry_stats(entry).map_or(0, |s| s.violations)
}

#[test]
fn null_required_pointers_are_no_ops() {
    hardened();
    let before = violations("Increment");
    unsafe {
        increment(ptr::null_mut());
        set_all_elements(ptr::null_mut());
        bool_to_int_test(1, ptr::null_mut());
    }
    assert_eq!(violations("Increment"), before + 1);
    assert!(violations("SetAllElements") >= 1);
    assert!(violations("BoolToIntTest") >= 1);
}

#[test]
fn null_required_inputs_return_zero() {
    hardened();
    unsafe {
        assert_eq!(add(ptr::null(), ptr::null()), 0);
        assert_eq!(get_first_character(ptr::null()), 0);
        assert_eq!(array_relation_sum(2, ptr::null()), 0);
    }
    let recent = runtime_policy::snapshot().recent;
    assert!(
        recent
            .iter()
            .any(|r| r.entry == "GetFirstCharacter" && r.kind == ViolationKind::NullPointer)
    );
}

#[test]
fn negative_lengths_are_rejected_before_any_read() {
    hardened();
    let elements = [SimpleStruct { i: 1 }];
    let inner = [StructAsClass { i: 1 }];
    let mut out = [7; 2];
    unsafe {
        assert_eq!(sum(-1, elements.as_ptr()), 0);
        assert_eq!(sum_inner(inner.as_ptr(), -3), 0);
        get_int_array(-2, out.as_mut_ptr());
    }
    assert_eq!(out, [7, 7]);
    let recent = runtime_policy::snapshot().recent;
    assert!(
        recent
            .iter()
            .any(|r| r.entry == "SumInner" && r.kind == ViolationKind::NegativeLength)
    );
}

#[test]
fn misaligned_arrays_are_rejected() {
    hardened();
    let storage = [0u32; 4];
    let misaligned = unsafe { storage.as_ptr().cast::<u8>().add(1) }.cast::<SimpleStruct>();
    assert_eq!(unsafe { array_relation_sum(1, misaligned) }, 0);
    assert!(
        runtime_policy::snapshot()
            .recent
            .iter()
            .any(|r| r.entry == "ArrayRelationSum" && r.kind == ViolationKind::Misaligned)
    );
}

#[test]
fn interface_arrays_with_null_members_return_zero() {
    hardened();
    let mut slots = [ptr::null_mut::<c_void>(); 2];
    unsafe { get_interfaces(2, slots.as_mut_ptr()) };
    let mixed = [slots[0], ptr::null_mut()];
    assert_eq!(unsafe { array_relation_in_interface_array(2, mixed.as_ptr()) }, 0);
    for raw in slots {
        let handle = unsafe { ComPtr::<IElement>::from_raw(raw) }.unwrap();
        assert_eq!(handle.ref_count(), 1);
    }
}

#[test]
fn add_to_this_with_a_null_element_leaves_the_target_unchanged() {
    hardened();
    let target = unsafe { ComPtr::<IInterface2>::from_raw(create_instance()) }.unwrap();
    let valid = unsafe { ComPtr::<IInterface2>::from_raw(create_instance2(5, 0.5)) }.unwrap();
    let elements = [valid.as_raw(), ptr::null_mut()];
    unsafe { (target.vtbl().add_to_this)(target.as_raw(), elements.as_ptr(), 2) };
    assert_eq!(target.get_value2(), DEFAULT_VALUE);
    assert!(
        runtime_policy::snapshot()
            .recent
            .iter()
            .any(|r| r.entry == "IInterface2::AddToThis" && r.kind == ViolationKind::NullPointer)
    );
    assert_eq!(valid.ref_count(), 1);

    let elements = [ptr::null_mut(), valid.as_raw()];
    unsafe { (target.vtbl().add_to_this)(target.as_raw(), elements.as_ptr(), 2) };
    assert_eq!(target.get_value2(), DEFAULT_VALUE);
}

#[test]
fn status_returning_entries_report_invalid_pointer() {
    hardened();
    unsafe {
        assert_eq!(init_struct_size_relation(ptr::null_mut()), Status::INVALID_POINTER);
        assert_eq!(init_reserved_relation(ptr::null_mut()), Status::INVALID_POINTER);
        assert_eq!(run_callback_probe(ptr::null_mut(), ptr::null_mut()), Status::INVALID_POINTER);
    }
}

#[test]
fn clone_instance_with_null_arguments_fails_cleanly() {
    hardened();
    let source = unsafe { create_instance() };
    let mut out = ptr::null_mut();
    unsafe {
        assert!(!clone_instance(ptr::null_mut(), &mut out));
        assert!(out.is_null());
        assert!(!clone_instance(source, ptr::null_mut()));
    }
    let source = unsafe { ComPtr::<IInterface2>::from_raw(source) }.unwrap();
    assert_eq!(source.ref_count(), 1);
}

#[test]
fn calls_are_counted_per_entry() {
    hardened();
    let before = runtime_policy::entry_stats("Increment").map_or(0, |s| s.calls);
    let mut cell = 1;
    unsafe {
        increment(&mut cell);
        increment(&mut cell);
    }
    assert_eq!(cell, 3);
    let after = runtime_policy::entry_stats("Increment").unwrap().calls;
    assert!(after >= before + 2);
    assert_eq!(runtime_policy::snapshot().mode, ContractMode::Hardened);
}
