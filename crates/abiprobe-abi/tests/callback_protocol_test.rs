//! The callback protocol end to end: a host handler wrapped into an
//! `ICallback`, handed across the boundary as a raw pointer and probed by
//! `RunCallbackProbe`.

use std::ffi::{CStr, c_void};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use abiprobe_abi::callback_abi::{
    CallbackHandler, CallbackShadow, CallbackView, ICallback, ReferenceHandler, create_reference_callback,
    run_callback_probe,
};
use abiprobe_abi::object::{ComPtr, IObject};
use abiprobe_core::callback::{CallbackProbeReport, HANDLER_NAME};
use abiprobe_core::enums::MethodOperation;
use abiprobe_core::{AbiError, Status};

fn probe(view: &CallbackView) -> (Status, CallbackProbeReport) {
    let mut report = CallbackProbeReport::default();
    let status = unsafe { run_callback_probe(view.as_ptr().as_raw(), &mut report) };
    (status, report)
}

fn mismatches(report: &CallbackProbeReport) -> Vec<&'static str> {
    report.mismatches(&CallbackProbeReport::expected(HANDLER_NAME))
}

#[test]
fn reference_handler_passes_through_the_export() {
    let view = CallbackShadow::wrap(Box::new(ReferenceHandler));
    let (status, report) = probe(&view);
    assert_eq!(status, Status::OK);
    assert!(mismatches(&report).is_empty(), "{:?}", mismatches(&report));
    assert_eq!(view.as_ptr().ref_count(), 1);
}

/// Ignores the requested operation and always increments.
struct EagerPointer;

impl CallbackHandler for EagerPointer {
    fn clone_handler(&self) -> Result<Box<dyn CallbackHandler>, AbiError> {
        Ok(Box::new(EagerPointer))
    }

    fn modify_pointer(&self, ptr: isize, _op: MethodOperation) -> isize {
        ptr + 1
    }
}

#[test]
fn ignored_operation_shows_only_in_pass_through_field() {
    let (status, report) = probe(&CallbackShadow::wrap(Box::new(EagerPointer)));
    assert_eq!(status, Status::OK);
    assert_eq!(mismatches(&report), vec!["pointer_pass_through"]);
}

/// Gets the array slots wrong and reports a nonzero zero.
struct SloppyArrays;

impl CallbackHandler for SloppyArrays {
    fn clone_handler(&self) -> Result<Box<dyn CallbackHandler>, AbiError> {
        Ok(Box::new(SloppyArrays))
    }

    fn zero(&self) -> i32 {
        7
    }

    fn array_relation_and(&self, values: &[u8]) -> bool {
        values.is_empty()
    }

    fn array_relation_sum(&self, values: &[i32]) -> i32 {
        values.iter().skip(1).sum()
    }

    fn array_relation_sum_struct(&self, values: &[abiprobe_core::shape::plain::LargeStructWithMarshalling]) -> i64 {
        values.iter().map(|v| v.i[0]).sum()
    }
}

#[test]
fn array_and_scalar_deviations_are_named() {
    let (_, report) = probe(&CallbackShadow::wrap(Box::new(SloppyArrays)));
    assert_eq!(
        mismatches(&report),
        vec!["zero", "array_and", "array_sum", "array_sum_struct"]
    );
    assert_eq!(report.zero, 7);
}

/// Counts clones and destructions across every generation.
struct Generations {
    clones: Arc<AtomicU32>,
    drops: Arc<AtomicU32>,
}

impl CallbackHandler for Generations {
    fn clone_handler(&self) -> Result<Box<dyn CallbackHandler>, AbiError> {
        self.clones.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Generations {
            clones: Arc::clone(&self.clones),
            drops: Arc::clone(&self.drops),
        }))
    }

    fn name(&self) -> &CStr {
        c"Generations"
    }
}

impl Drop for Generations {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn probe_releases_the_clone_it_made() {
    let clones = Arc::new(AtomicU32::new(0));
    let drops = Arc::new(AtomicU32::new(0));
    let view = CallbackShadow::wrap(Box::new(Generations {
        clones: Arc::clone(&clones),
        drops: Arc::clone(&drops),
    }));
    let (status, report) = probe(&view);
    assert_eq!(status, Status::OK);
    assert_eq!(report.name_len, "Generations".len());
    assert_eq!(clones.load(Ordering::SeqCst), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    let clone = view.clone_instance().unwrap();
    let grandchild = clone.clone_instance().unwrap();
    assert!(!clone.as_ptr().same_object(view.as_ptr()));
    assert_eq!(grandchild.name().unwrap().as_c_str(), c"Generations");
    drop((view, clone, grandchild));
    assert_eq!(clones.load(Ordering::SeqCst), 3);
    assert_eq!(drops.load(Ordering::SeqCst), 4);
}

#[test]
fn native_callback_is_reachable_from_raw_pointer() {
    let raw = unsafe { create_reference_callback() };
    let view = unsafe { CallbackView::from_borrowed(raw) }.unwrap();
    assert_eq!(view.add(40, 2), 42);
    assert_eq!(view.mapped_type_test(u32::MAX), -1);
    assert_eq!(view.modify_pointer(9, MethodOperation::INCREMENT), 10);
    assert_eq!(view.modify_pointer(9, MethodOperation::PASS_THROUGH), 9);

    let base: ComPtr<IObject> = view.as_ptr().query().unwrap();
    assert_eq!(base.as_raw(), raw);
    drop((view, base));
    drop(unsafe { ComPtr::<ICallback>::from_raw(raw) });
}

#[test]
fn report_is_untouched_when_probe_is_refused() {
    abiprobe_membrane::config::set_contract_mode(abiprobe_membrane::ContractMode::Hardened);
    let mut report = CallbackProbeReport {
        add: -99,
        ..CallbackProbeReport::default()
    };
    let status = unsafe { run_callback_probe(std::ptr::null_mut::<c_void>(), &mut report) };
    assert_eq!(status, Status::INVALID_POINTER);
    assert_eq!(report.add, -99);
}
