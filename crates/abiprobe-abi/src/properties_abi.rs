//! Property-style interfaces: `IInterfaceWithProperties`, `IFastOutInterface`
//! and `IPassThroughMethodTest`.
//!
//! Status-returning slots report a null out-parameter as `INVALID_POINTER`
//! and write nothing; that status is part of the documented contract, so it
//! is not routed through the violation policy.

use std::cell::Cell;
use std::ffi::{c_int, c_long, c_void};

use abiprobe_core::capability::{
    IID_IFAST_OUT_INTERFACE, IID_IINTERFACE_WITH_PROPERTIES, IID_IPASS_THROUGH_METHOD_TEST,
};
use abiprobe_core::{AbiError, Guid, Status};
use abiprobe_membrane::view::{self, Site};

use crate::macros::abi_fn;
use crate::object::{ComPtr, IObject, IObjectVtbl, Inherits, Interface, Lookup, NativeObject, ObjectImpl};
use crate::runtime_policy;

#[repr(C)]
pub struct IInterfaceWithPropertiesVtbl {
    pub base: IObjectVtbl,
    pub is_true: unsafe extern "system" fn(this: *mut c_void) -> bool,
    pub is_true_out_prop: unsafe extern "system" fn(this: *mut c_void, out: *mut bool) -> Status,
    pub get_value: unsafe extern "system" fn(this: *mut c_void) -> c_int,
    pub set_value: unsafe extern "system" fn(this: *mut c_void, value: c_int),
    pub get_value2: unsafe extern "system" fn(this: *mut c_void, out: *mut c_int) -> Status,
    pub set_value2: unsafe extern "system" fn(this: *mut c_void, value: c_int),
    pub get_value_persistent: unsafe extern "system" fn(this: *mut c_void) -> c_int,
    pub get_value2_persistent: unsafe extern "system" fn(this: *mut c_void, out: *mut c_int) -> Status,
    pub get_self_persistent: unsafe extern "system" fn(this: *mut c_void) -> *mut c_void,
    pub get_self_out_persistent:
        unsafe extern "system" fn(this: *mut c_void, out: *mut *mut c_void) -> Status,
}

#[repr(C)]
pub struct IFastOutInterfaceVtbl {
    pub base: IObjectVtbl,
    pub do_nothing: unsafe extern "system" fn(this: *mut c_void),
}

#[repr(C)]
pub struct IPassThroughMethodTestVtbl {
    pub base: IObjectVtbl,
    pub pass_through: unsafe extern "system" fn(this: *mut c_void, value: usize) -> usize,
    pub pass_through_long: unsafe extern "system" fn(this: *mut c_void, value: c_long) -> c_long,
}

pub enum IInterfaceWithProperties {}
pub enum IFastOutInterface {}
pub enum IPassThroughMethodTest {}

unsafe impl Interface for IInterfaceWithProperties {
    const NAME: &'static str = "IInterfaceWithProperties";
    const IID: Guid = IID_IINTERFACE_WITH_PROPERTIES;
    type Vtbl = IInterfaceWithPropertiesVtbl;
}

unsafe impl Interface for IFastOutInterface {
    const NAME: &'static str = "IFastOutInterface";
    const IID: Guid = IID_IFAST_OUT_INTERFACE;
    type Vtbl = IFastOutInterfaceVtbl;
}

unsafe impl Interface for IPassThroughMethodTest {
    const NAME: &'static str = "IPassThroughMethodTest";
    const IID: Guid = IID_IPASS_THROUGH_METHOD_TEST;
    type Vtbl = IPassThroughMethodTestVtbl;
}

unsafe impl Inherits<IObject> for IInterfaceWithProperties {}
unsafe impl Inherits<IObject> for IFastOutInterface {}
unsafe impl Inherits<IObject> for IPassThroughMethodTest {}

fn write_out<T>(out: *mut T, value: T) -> Status {
    if out.is_null() || (out as usize) % std::mem::align_of::<T>() != 0 {
        return Status::INVALID_POINTER;
    }
    // SAFETY: non-null and aligned; the caller owns the slot.
    unsafe { out.write(value) };
    Status::OK
}

// ---------------------------------------------------------------------------
// IInterfaceWithProperties
// ---------------------------------------------------------------------------

struct PropertyObject {
    is_true: bool,
    value: Cell<c_int>,
    value2: Cell<c_int>,
}

impl ObjectImpl for PropertyObject {
    const TYPE_NAME: &'static str = "PropertyObject";
    const LOOKUP: Lookup = Lookup::Supported(&[IID_IINTERFACE_WITH_PROPERTIES]);
    type Vtbl = IInterfaceWithPropertiesVtbl;

    fn vtable() -> &'static IInterfaceWithPropertiesVtbl {
        &PROPERTY_VTBL
    }
}

static PROPERTY_VTBL: IInterfaceWithPropertiesVtbl = IInterfaceWithPropertiesVtbl {
    base: NativeObject::<PropertyObject>::base_vtbl(),
    is_true: prop_is_true,
    is_true_out_prop: prop_is_true_out,
    get_value: prop_get_value,
    set_value: prop_set_value,
    get_value2: prop_get_value2,
    set_value2: prop_set_value2,
    get_value_persistent: prop_get_value,
    get_value2_persistent: prop_get_value2,
    get_self_persistent: prop_get_self,
    get_self_out_persistent: prop_get_self_out,
};

unsafe fn prop<'a>(this: *mut c_void) -> &'a PropertyObject {
    unsafe { NativeObject::<PropertyObject>::state(this) }
}

unsafe extern "system" fn prop_is_true(this: *mut c_void) -> bool {
    unsafe { prop(this) }.is_true
}

unsafe extern "system" fn prop_is_true_out(this: *mut c_void, out: *mut bool) -> Status {
    write_out(out, unsafe { prop(this) }.is_true)
}

unsafe extern "system" fn prop_get_value(this: *mut c_void) -> c_int {
    unsafe { prop(this) }.value.get()
}

unsafe extern "system" fn prop_set_value(this: *mut c_void, value: c_int) {
    unsafe { prop(this) }.value.set(value);
}

unsafe extern "system" fn prop_get_value2(this: *mut c_void, out: *mut c_int) -> Status {
    write_out(out, unsafe { prop(this) }.value2.get())
}

unsafe extern "system" fn prop_set_value2(this: *mut c_void, value: c_int) {
    unsafe { prop(this) }.value2.set(value);
}

unsafe extern "system" fn prop_get_self(this: *mut c_void) -> *mut c_void {
    unsafe { (PROPERTY_VTBL.base.acquire)(this) };
    this
}

unsafe extern "system" fn prop_get_self_out(this: *mut c_void, out: *mut *mut c_void) -> Status {
    let status = write_out(out, this);
    if status.is_ok() {
        unsafe { (PROPERTY_VTBL.base.acquire)(this) };
    }
    status
}

impl ComPtr<IInterfaceWithProperties> {
    #[must_use]
    pub fn is_true(&self) -> bool {
        unsafe { (self.vtbl().is_true)(self.as_raw()) }
    }

    pub fn is_true_out(&self) -> Result<bool, AbiError> {
        let mut out = false;
        AbiError::check(unsafe { (self.vtbl().is_true_out_prop)(self.as_raw(), &mut out) })?;
        Ok(out)
    }

    #[must_use]
    pub fn value(&self) -> i32 {
        unsafe { (self.vtbl().get_value)(self.as_raw()) }
    }

    pub fn set_value(&self, value: i32) {
        unsafe { (self.vtbl().set_value)(self.as_raw(), value) }
    }

    pub fn value2(&self) -> Result<i32, AbiError> {
        let mut out = 0;
        AbiError::check(unsafe { (self.vtbl().get_value2)(self.as_raw(), &mut out) })?;
        Ok(out)
    }

    pub fn set_value2(&self, value: i32) {
        unsafe { (self.vtbl().set_value2)(self.as_raw(), value) }
    }

    #[must_use]
    pub fn value_persistent(&self) -> i32 {
        unsafe { (self.vtbl().get_value_persistent)(self.as_raw()) }
    }

    pub fn value2_persistent(&self) -> Result<i32, AbiError> {
        let mut out = 0;
        AbiError::check(unsafe { (self.vtbl().get_value2_persistent)(self.as_raw(), &mut out) })?;
        Ok(out)
    }

    /// Owning handle to the same object, from `GetSelfPersistent`.
    pub fn self_persistent(&self) -> Result<Self, AbiError> {
        let raw = unsafe { (self.vtbl().get_self_persistent)(self.as_raw()) };
        unsafe { Self::from_raw(raw) }.ok_or(AbiError::StatusFailure {
            status: Status::INVALID_POINTER,
        })
    }

    /// Owning handle to the same object, from `GetSelfOutPersistent`.
    pub fn self_out_persistent(&self) -> Result<Self, AbiError> {
        let mut out = std::ptr::null_mut();
        AbiError::check(unsafe { (self.vtbl().get_self_out_persistent)(self.as_raw(), &mut out) })?;
        unsafe { Self::from_raw(out) }.ok_or(AbiError::StatusFailure {
            status: Status::INVALID_POINTER,
        })
    }
}

// ---------------------------------------------------------------------------
// IFastOutInterface, IPassThroughMethodTest
// ---------------------------------------------------------------------------

struct FastOutObject;

impl ObjectImpl for FastOutObject {
    const TYPE_NAME: &'static str = "FastOutObject";
    const LOOKUP: Lookup = Lookup::Supported(&[IID_IFAST_OUT_INTERFACE]);
    type Vtbl = IFastOutInterfaceVtbl;

    fn vtable() -> &'static IFastOutInterfaceVtbl {
        &FAST_OUT_VTBL
    }
}

static FAST_OUT_VTBL: IFastOutInterfaceVtbl = IFastOutInterfaceVtbl {
    base: NativeObject::<FastOutObject>::base_vtbl(),
    do_nothing: fast_out_do_nothing,
};

unsafe extern "system" fn fast_out_do_nothing(_this: *mut c_void) {}

struct PassThroughObject;

impl ObjectImpl for PassThroughObject {
    const TYPE_NAME: &'static str = "PassThroughObject";
    const LOOKUP: Lookup = Lookup::Supported(&[IID_IPASS_THROUGH_METHOD_TEST]);
    type Vtbl = IPassThroughMethodTestVtbl;

    fn vtable() -> &'static IPassThroughMethodTestVtbl {
        &PASS_THROUGH_VTBL
    }
}

static PASS_THROUGH_VTBL: IPassThroughMethodTestVtbl = IPassThroughMethodTestVtbl {
    base: NativeObject::<PassThroughObject>::base_vtbl(),
    pass_through: pass_through_size,
    pass_through_long,
};

unsafe extern "system" fn pass_through_size(_this: *mut c_void, value: usize) -> usize {
    value
}

unsafe extern "system" fn pass_through_long(_this: *mut c_void, value: c_long) -> c_long {
    value
}

impl ComPtr<IFastOutInterface> {
    pub fn do_nothing(&self) {
        unsafe { (self.vtbl().do_nothing)(self.as_raw()) }
    }
}

impl ComPtr<IPassThroughMethodTest> {
    #[must_use]
    pub fn pass_through(&self, value: usize) -> usize {
        unsafe { (self.vtbl().pass_through)(self.as_raw(), value) }
    }

    #[must_use]
    pub fn pass_through_long(&self, value: c_long) -> c_long {
        unsafe { (self.vtbl().pass_through_long)(self.as_raw(), value) }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

abi_fn! {
    /// New property object; any non-zero `is_true` byte reads back as true.
    fn create_property_test as "CreatePropertyTest"(is_true: u8, value: c_int, value2: c_int) -> *mut c_void {
        NativeObject::create(PropertyObject {
            is_true: is_true != 0,
            value: Cell::new(value),
            value2: Cell::new(value2),
        })
    }
}

abi_fn! {
    fn fast_out_interface_test as "FastOutInterfaceTest"(out: *mut *mut c_void) {
        let site = Site::new("FastOutInterfaceTest", "out");
        if let Some(slot) = runtime_policy::check(view::value_mut(site, out)) {
            *slot = NativeObject::create(FastOutObject);
        }
    }
}

abi_fn! {
    fn get_pass_through_method_test as "GetPassThroughMethodTest"() -> *mut c_void {
        NativeObject::create(PassThroughObject)
    }
}
