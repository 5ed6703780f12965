//! Object lifecycle scenarios.
//!
//! Each scenario creates objects through the exported factories, exercises
//! capability lookup and reference counting, releases everything it
//! acquired and then checks the tracker: every object it created must be
//! gone. Scenarios are serialized with fixture execution because they read
//! the process-wide tracker.

use std::ffi::c_void;
use std::ptr;

use abiprobe_abi::callback_abi::{
    CallbackShadow, ReferenceHandler, create_reference_callback, run_callback_probe,
};
use abiprobe_abi::interface_abi::{
    DEFAULT_VALUE, IInterface, IInterface2, IInterfaceWithGuid, ILargeInterface, clone_instance,
    create_com_instance, create_instance, create_instance2, create_interface_with_guid,
    create_large_interface,
};
use abiprobe_abi::object::{ComPtr, IObject};
use abiprobe_abi::properties_abi::{
    IInterfaceWithProperties, create_property_test, fast_out_interface_test, get_pass_through_method_test,
};
use abiprobe_abi::{functions_abi, struct_abi};
use abiprobe_core::Status;
use abiprobe_core::callback::{CallbackProbeReport, HANDLER_NAME};
use abiprobe_core::capability::IID_IINTERFACE2;
use abiprobe_core::shape::plain::MyValue;
use abiprobe_membrane::global_tracker;
use abiprobe_membrane::config::{ContractMode, set_contract_mode};

use crate::EXEC_LOCK;

/// Result of one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleCheck {
    pub name: &'static str,
    pub passed: bool,
    /// Failed expectations, in order.
    pub failures: Vec<String>,
}

/// All scenario results plus the object traffic they caused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleRun {
    pub checks: Vec<LifecycleCheck>,
    /// Objects created while the scenarios ran.
    pub created: u64,
    /// Objects destroyed while the scenarios ran.
    pub destroyed: u64,
}

impl LifecycleRun {
    /// Every scenario passed and nothing created was left alive.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed) && self.created == self.destroyed
    }
}

/// Every scenario, in a fixed order.
pub const SCENARIOS: &[&str] = &[
    "factories-return-one-reference",
    "query-shares-identity",
    "query-unsupported-leaves-out",
    "com-lookup-not-implemented",
    "persistent-self-identity",
    "clone-instance-is-distinct",
    "add-to-this-aliasing",
    "callback-round-trip",
];

/// Run every scenario under hardened mode.
///
/// Object totals are sampled under the execution lock, so the counts only
/// include objects the scenarios themselves made.
#[must_use]
pub fn run_lifecycle_scenarios() -> LifecycleRun {
    let _guard = EXEC_LOCK.lock();
    set_contract_mode(ContractMode::Hardened);
    let before = global_tracker().totals();
    let checks = SCENARIOS
        .iter()
        .map(|&name| {
            let mut scenario = Scenario::default();
            match name {
                "factories-return-one-reference" => factories_return_one_reference(&mut scenario),
                "query-shares-identity" => query_shares_identity(&mut scenario),
                "query-unsupported-leaves-out" => query_unsupported_leaves_out(&mut scenario),
                "com-lookup-not-implemented" => com_lookup_not_implemented(&mut scenario),
                "persistent-self-identity" => persistent_self_identity(&mut scenario),
                "clone-instance-is-distinct" => clone_instance_is_distinct(&mut scenario),
                "add-to-this-aliasing" => add_to_this_aliasing(&mut scenario),
                "callback-round-trip" => callback_round_trip(&mut scenario),
                _ => scenario.expect(false, format!("no scenario named {name}")),
            }
            scenario.finish(name)
        })
        .collect();
    let after = global_tracker().totals();
    LifecycleRun {
        checks,
        created: after.created.saturating_sub(before.created),
        destroyed: after.destroyed.saturating_sub(before.destroyed),
    }
}

/// Failure collector plus the objects a scenario must see destroyed.
#[derive(Default)]
struct Scenario {
    failures: Vec<String>,
    created: Vec<(usize, u64)>,
}

impl Scenario {
    fn expect(&mut self, condition: bool, message: impl Into<String>) {
        if !condition {
            self.failures.push(message.into());
        }
    }

    /// Remember `raw` for the end-of-scenario destruction check.
    fn track(&mut self, what: &str, raw: *mut c_void) {
        match global_tracker().lookup(raw as usize) {
            Some(meta) => self.created.push((meta.addr, meta.serial)),
            None => self.failures.push(format!("{what}: object not registered")),
        }
    }

    fn finish(mut self, name: &'static str) -> LifecycleCheck {
        for (addr, serial) in std::mem::take(&mut self.created) {
            let survived = global_tracker()
                .lookup(addr)
                .is_some_and(|meta| meta.serial == serial);
            self.expect(!survived, format!("object at {addr:#x} outlived the scenario"));
        }
        LifecycleCheck {
            name,
            passed: self.failures.is_empty(),
            failures: self.failures,
        }
    }
}

/// Take ownership of a factory result as an `IObject` handle.
fn adopt(scenario: &mut Scenario, what: &str, raw: *mut c_void) -> Option<ComPtr<IObject>> {
    if raw.is_null() {
        scenario.expect(false, format!("{what}: factory returned null"));
        return None;
    }
    scenario.track(what, raw);
    unsafe { ComPtr::from_raw(raw) }
}

fn factories_return_one_reference(s: &mut Scenario) {
    let mut fast_out = ptr::null_mut();
    let mut element = ptr::null_mut();
    let factories: [(&str, *mut c_void); 11] = unsafe {
        fast_out_interface_test(&mut fast_out);
        functions_abi::fast_out_test(&mut element);
        [
            ("CreateInstance", create_instance()),
            ("CreateInstance2", create_instance2(2, 2.0)),
            ("CreateComInstance", create_com_instance()),
            ("CreateInterfaceWithGuid", create_interface_with_guid()),
            ("CreateLargeInterface", create_large_interface()),
            ("CreatePropertyTest", create_property_test(1, 2, 3)),
            ("GetPassThroughMethodTest", get_pass_through_method_test()),
            ("FastOutInterfaceTest", fast_out),
            ("FastOutTest", element),
            ("GetStructWithInterface", struct_abi::get_struct_with_interface().test),
            ("CreateReferenceCallback", create_reference_callback()),
        ]
    };
    for (what, raw) in factories {
        if let Some(handle) = adopt(s, what, raw) {
            let count = handle.ref_count();
            s.expect(count == 1, format!("{what}: count {count} after creation"));
        }
    }
}

fn query_shares_identity(s: &mut Scenario) {
    let Some(base) = adopt(s, "CreateInstance2", unsafe { create_instance2(7, 0.5) }) else {
        return;
    };
    let Ok(base) = base.query::<IInterface>() else {
        s.expect(false, "IInterface lookup failed");
        return;
    };
    match base.query::<IInterface2>() {
        Ok(derived) => {
            s.expect(derived.same_object(&base), "lookup changed the address");
            s.expect(derived.ref_count() == 3, "lookup did not acquire");
            s.expect(derived.get_value2() == MyValue { i: 7, j: 0.5 }, "derived view reads another value");
            let up: ComPtr<IInterface> = derived.upcast();
            s.expect(up.ref_count() == 3, "upcast changed the count");
        }
        Err(e) => s.expect(false, format!("IInterface2 lookup failed: {e}")),
    }
    s.expect(base.ref_count() == 2, "references leaked by lookup");
}

fn query_unsupported_leaves_out(s: &mut Scenario) {
    let Some(large) = adopt(s, "CreateLargeInterface", unsafe { create_large_interface() }) else {
        return;
    };
    let sentinel = 0x5a5a_usize as *mut c_void;
    let mut out = sentinel;
    let status = unsafe { query_raw(&large, &mut out) };
    s.expect(status == Status::NOT_SUPPORTED, format!("expected not_supported, got {status}"));
    s.expect(out == sentinel, "failed lookup wrote its out parameter");
    s.expect(large.ref_count() == 1, "failed lookup acquired");
    let status = unsafe { (large.vtbl().query_capability)(large.as_raw(), &IID_IINTERFACE2, ptr::null_mut()) };
    s.expect(status == Status::INVALID_POINTER, "null out accepted");
    if let Ok(large) = large.query::<ILargeInterface>() {
        s.expect(large.methods() == [1, 2, 3], "ILargeInterface methods");
    }
}

/// Ask `obj` for `IInterface2` through its table, bypassing `ComPtr::query`.
unsafe fn query_raw(obj: &ComPtr<IObject>, out: &mut *mut c_void) -> Status {
    unsafe { (obj.vtbl().query_capability)(obj.as_raw(), &IID_IINTERFACE2, out) }
}

fn com_lookup_not_implemented(s: &mut Scenario) {
    let Some(com) = adopt(s, "CreateComInstance", unsafe { create_com_instance() }) else {
        return;
    };
    let mut out = ptr::null_mut();
    let status = unsafe { query_raw(&com, &mut out) };
    s.expect(status == Status::NOT_IMPLEMENTED, format!("expected not_implemented, got {status}"));
    s.expect(out.is_null(), "unimplemented lookup wrote its out parameter");

    let Some(guid) = adopt(s, "CreateInterfaceWithGuid", unsafe { create_interface_with_guid() }) else {
        return;
    };
    match guid.query::<IInterfaceWithGuid>() {
        Ok(obj) => obj.method(),
        Err(e) => s.expect(false, format!("IInterfaceWithGuid lookup failed: {e}")),
    }
}

fn persistent_self_identity(s: &mut Scenario) {
    let Some(obj) = adopt(s, "CreatePropertyTest", unsafe { create_property_test(0, 5, 6) }) else {
        return;
    };
    let Ok(props) = obj.query::<IInterfaceWithProperties>() else {
        s.expect(false, "IInterfaceWithProperties lookup failed");
        return;
    };
    let first = props.self_persistent();
    let second = props.self_persistent();
    let out = props.self_out_persistent();
    match (first, second, out) {
        (Ok(a), Ok(b), Ok(c)) => {
            s.expect(a.same_object(&b) && b.same_object(&c), "persistent self changed identity");
            s.expect(a.same_object(&props), "persistent self is another object");
            s.expect(props.ref_count() == 5, "persistent self did not carry one reference each");
        }
        _ => s.expect(false, "persistent self failed"),
    }
    s.expect(props.value_persistent() == props.value(), "persistent value differs");
    props.set_value(9);
    match props.self_persistent() {
        Ok(again) => {
            s.expect(again.same_object(&props), "identity changed after mutation");
            s.expect(again.value_persistent() == 9, "mutation not visible through persistent self");
        }
        Err(e) => s.expect(false, format!("persistent self after mutation failed: {e}")),
    }
    s.expect(props.ref_count() == 2, "persistent self leaked");
}

fn clone_instance_is_distinct(s: &mut Scenario) {
    let Some(source) = adopt(s, "CreateInstance", unsafe { create_instance() }) else {
        return;
    };
    let mut out = ptr::null_mut();
    let cloned = unsafe { clone_instance(source.as_raw(), &mut out) };
    s.expect(cloned, "CloneInstance failed");
    let Some(clone) = adopt(s, "CloneInstance", out) else {
        return;
    };
    s.expect(!clone.same_object(&source), "clone shares the source's identity");
    match clone.query::<IInterface>() {
        Ok(clone) => s.expect(clone.get_value() == DEFAULT_VALUE, "clone value differs"),
        Err(e) => s.expect(false, format!("clone lookup failed: {e}")),
    }
    s.expect(source.ref_count() == 1, "CloneInstance leaked a source reference");
}

fn add_to_this_aliasing(s: &mut Scenario) {
    let Some(obj) = adopt(s, "CreateInstance2", unsafe { create_instance2(1, 1.0) }) else {
        return;
    };
    let Ok(target) = obj.query::<IInterface2>() else {
        s.expect(false, "IInterface2 lookup failed");
        return;
    };
    target.add_to_this(&[target.clone(), target.clone()]);
    s.expect(
        target.get_value2() == MyValue { i: 4, j: 4.0 },
        "self-aliased AddToThis did not see the running total",
    );
    s.expect(target.ref_count() == 2, "AddToThis leaked element references");
}

fn callback_round_trip(s: &mut Scenario) {
    let view = CallbackShadow::wrap(Box::new(ReferenceHandler));
    s.track("CallbackShadow", view.as_ptr().as_raw());
    let mut report = CallbackProbeReport::default();
    let status = unsafe { run_callback_probe(view.as_ptr().as_raw(), &mut report) };
    s.expect(status.is_ok(), format!("RunCallbackProbe returned {status}"));
    let mismatches = report.mismatches(&CallbackProbeReport::expected(HANDLER_NAME));
    s.expect(mismatches.is_empty(), format!("probe mismatches: {mismatches:?}"));
    s.expect(view.as_ptr().ref_count() == 1, "probe leaked callback references");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_scenario_passes() {
        let run = run_lifecycle_scenarios();
        assert_eq!(run.checks.len(), SCENARIOS.len());
        for check in &run.checks {
            assert!(check.passed, "{}: {:?}", check.name, check.failures);
        }
        assert!(run.created > 0);
        assert_eq!(run.created, run.destroyed);
        assert!(run.passed());
    }

    #[test]
    fn scenario_names_are_unique() {
        let mut names = SCENARIOS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SCENARIOS.len());
    }
}
