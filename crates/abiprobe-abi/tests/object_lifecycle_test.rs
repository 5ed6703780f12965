//! Interface objects across the boundary: creation, capability lookup,
//! reference counting and calls into objects the library did not create.

use std::cell::Cell;
use std::ffi::{c_int, c_void};
use std::ptr;

use abiprobe_abi::interface_abi::{
    IInterface, IInterface2, IInterface2Vtbl, IInterfaceVtbl, ILargeInterface, clone_instance,
    create_com_instance, create_instance, create_instance2, create_large_interface, live_objects,
};
use abiprobe_abi::object::{ComPtr, IObject, IObjectVtbl};
use abiprobe_abi::properties_abi::{IInterfaceWithProperties, create_property_test};
use abiprobe_core::capability::IID_IINTERFACE2;
use abiprobe_core::shape::plain::MyValue;
use abiprobe_core::{AbiError, Guid, Status};
use abiprobe_membrane::global_tracker;

/// An `IInterface2` implemented by the test, with its own count.
#[repr(C)]
struct Foreign {
    vtbl: &'static IInterface2Vtbl,
    refs: Cell<u32>,
    value: MyValue,
}

unsafe extern "system" fn foreign_query(this: *mut c_void, iid: *const Guid, out: *mut *mut c_void) -> Status {
    if out.is_null() || iid.is_null() {
        return Status::INVALID_POINTER;
    }
    if unsafe { *iid } != IID_IINTERFACE2 {
        return Status::NOT_SUPPORTED;
    }
    unsafe {
        foreign_acquire(this);
        *out = this;
    }
    Status::OK
}

unsafe extern "system" fn foreign_acquire(this: *mut c_void) -> u32 {
    let obj = unsafe { &*this.cast::<Foreign>() };
    obj.refs.set(obj.refs.get() + 1);
    obj.refs.get()
}

unsafe extern "system" fn foreign_release(this: *mut c_void) -> u32 {
    let obj = unsafe { &*this.cast::<Foreign>() };
    obj.refs.set(obj.refs.get() - 1);
    obj.refs.get()
}

unsafe extern "system" fn foreign_get_value(this: *mut c_void, ret: *mut MyValue) -> *mut MyValue {
    unsafe { *ret = (*this.cast::<Foreign>()).value };
    ret
}

unsafe extern "system" fn foreign_add_to_this(_this: *mut c_void, _others: *const *mut c_void, _n: c_int) {}

static FOREIGN_VTBL: IInterface2Vtbl = IInterface2Vtbl {
    base: IInterfaceVtbl {
        base: IObjectVtbl {
            query_capability: foreign_query,
            acquire: foreign_acquire,
            release: foreign_release,
        },
        get_value: foreign_get_value,
    },
    get_value2: foreign_get_value,
    add_to_this: foreign_add_to_this,
};

fn foreign(value: MyValue) -> Box<Foreign> {
    Box::new(Foreign {
        vtbl: &FOREIGN_VTBL,
        refs: Cell::new(1),
        value,
    })
}

fn as_raw(obj: &Foreign) -> *mut c_void {
    ptr::from_ref(obj).cast_mut().cast()
}

fn serial_of(raw: *mut c_void) -> u64 {
    global_tracker().lookup(raw as usize).unwrap().serial
}

/// The object registered under `serial` is gone. Another test may have
/// reused the address since, so the serial is compared rather than the
/// address alone.
fn destroyed(raw: usize, serial: u64) -> bool {
    global_tracker().lookup(raw).is_none_or(|meta| meta.serial != serial)
}

#[test]
fn clone_instance_reads_foreign_objects_through_their_table() {
    let source = foreign(MyValue { i: 21, j: 0.25 });
    let mut out = ptr::null_mut();
    assert!(unsafe { clone_instance(as_raw(&source), &mut out) });
    let clone = unsafe { ComPtr::<IInterface>::from_raw(out) }.unwrap();
    assert_eq!(clone.get_value(), MyValue { i: 21, j: 0.25 });
    // Acquired for the call, released afterwards.
    assert_eq!(source.refs.get(), 1);
}

#[test]
fn add_to_this_accepts_foreign_elements() {
    let target = unsafe { ComPtr::<IInterface2>::from_raw(create_instance()) }.unwrap();
    let a = foreign(MyValue { i: 2, j: 1.0 });
    let b = foreign(MyValue { i: -3, j: 0.5 });
    let elements = [as_raw(&a), as_raw(&b)];
    unsafe { (target.vtbl().add_to_this)(target.as_raw(), elements.as_ptr(), 2) };
    assert_eq!(target.get_value2(), MyValue { i: 0, j: 4.5 });
    assert_eq!((a.refs.get(), b.refs.get()), (1, 1));
}

#[test]
fn add_to_this_with_self_sees_running_total() {
    let target = unsafe { ComPtr::<IInterface2>::from_raw(create_instance2(1, 1.0)) }.unwrap();
    let target2: ComPtr<IInterface2> = target.clone();
    target.add_to_this(&[target2.clone(), target2]);
    assert_eq!(target.get_value(), MyValue { i: 4, j: 4.0 });
}

#[test]
fn lookup_between_related_interfaces() {
    let base = unsafe { ComPtr::<IInterface>::from_raw(create_instance2(8, 8.0)) }.unwrap();
    let derived: ComPtr<IInterface2> = base.query().unwrap();
    assert!(derived.same_object(&base));
    assert_eq!(derived.get_value2(), MyValue { i: 8, j: 8.0 });
    let unknown: ComPtr<IObject> = derived.query().unwrap();
    assert_eq!(unknown.ref_count(), 3);
    assert_eq!(
        base.query::<ILargeInterface>().unwrap_err(),
        AbiError::CapabilityNotSupported {
            iid: abiprobe_core::capability::IID_ILARGE_INTERFACE
        }
    );
}

#[test]
fn com_sample_never_answers_lookup() {
    let obj = unsafe { ComPtr::<IInterface>::from_raw(create_com_instance()) }.unwrap();
    let sentinel = 0x10usize as *mut c_void;
    let mut out = sentinel;
    let status = unsafe { (obj.vtbl().base.query_capability)(obj.as_raw(), &IID_IINTERFACE2, &mut out) };
    assert_eq!(status, Status::NOT_IMPLEMENTED);
    assert_eq!(out, sentinel);
}

#[test]
fn every_created_object_is_destroyed_on_last_release() {
    let raws = unsafe {
        [
            create_instance(),
            create_large_interface(),
            create_com_instance(),
            create_property_test(1, 2, 3),
        ]
    };
    let serials = raws.map(serial_of);
    assert!(unsafe { live_objects() } >= raws.len());
    unsafe {
        for raw in raws {
            let base: &IObjectVtbl = &**raw.cast::<*const IObjectVtbl>();
            assert_eq!((base.acquire)(raw), 2);
            assert_eq!((base.release)(raw), 1);
            assert_eq!((base.release)(raw), 0);
        }
    }
    for (raw, serial) in raws.into_iter().zip(serials) {
        assert!(destroyed(raw as usize, serial));
    }
}

#[test]
fn persistent_self_keeps_object_alive() {
    let obj = unsafe { ComPtr::<IInterfaceWithProperties>::from_raw(create_property_test(0, 4, 5)) }.unwrap();
    let addr = obj.as_raw() as usize;
    let serial = serial_of(obj.as_raw());
    let me = obj.self_persistent().unwrap();
    drop(obj);
    assert!(!destroyed(addr, serial));
    assert_eq!(me.value(), 4);
    drop(me);
    assert!(destroyed(addr, serial));
}

#[test]
fn handles_move_across_threads_one_at_a_time() {
    let raw = unsafe { create_instance2(5, 5.0) };
    let serial = serial_of(raw);
    let raw = raw as usize;
    let value = std::thread::spawn(move || {
        let obj = unsafe { ComPtr::<IInterface2>::from_raw(raw as *mut c_void) }.unwrap();
        obj.get_value()
    })
    .join()
    .unwrap();
    assert_eq!(value, MyValue { i: 5, j: 5.0 });
    assert!(destroyed(raw, serial));
}
