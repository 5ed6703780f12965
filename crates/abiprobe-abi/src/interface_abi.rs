//! Value interfaces: `IInterface`/`IInterface2`, `IInterfaceWithGuid`,
//! `ILargeInterface`, `IElement` and the COM sample object.

use std::cell::Cell;
use std::ffi::{c_int, c_void};

use abiprobe_core::Guid;
use abiprobe_core::capability::{
    IID_IELEMENT, IID_IINTERFACE, IID_IINTERFACE_WITH_GUID, IID_IINTERFACE2, IID_ILARGE_INTERFACE,
};
use abiprobe_core::shape::plain::MyValue;
use abiprobe_membrane::ViolationKind;
use abiprobe_membrane::view::{self, Site};

use crate::macros::abi_fn;
use crate::object::{ComPtr, IObject, IObjectVtbl, Inherits, Interface, Lookup, NativeObject, ObjectImpl};
use crate::runtime_policy;

/// Slot returning `MyValue` through a hidden return pointer.
pub type GetValueFn = unsafe extern "system" fn(this: *mut c_void, ret: *mut MyValue) -> *mut MyValue;
/// `void Method()`
pub type VoidMethodFn = unsafe extern "system" fn(this: *mut c_void);
/// `int Method()`
pub type IntMethodFn = unsafe extern "system" fn(this: *mut c_void) -> c_int;

#[repr(C)]
pub struct IInterfaceVtbl {
    pub base: IObjectVtbl,
    pub get_value: GetValueFn,
}

#[repr(C)]
pub struct IInterface2Vtbl {
    pub base: IInterfaceVtbl,
    pub get_value2: GetValueFn,
    pub add_to_this:
        unsafe extern "system" fn(this: *mut c_void, interfaces: *const *mut c_void, count: c_int),
}

#[repr(C)]
pub struct IInterfaceWithGuidVtbl {
    pub base: IObjectVtbl,
    pub method: VoidMethodFn,
}

#[repr(C)]
pub struct ILargeInterfaceVtbl {
    pub base: IObjectVtbl,
    pub method1: IntMethodFn,
    pub method2: IntMethodFn,
    pub method3: IntMethodFn,
}

#[repr(C)]
pub struct IElementVtbl {
    pub base: IObjectVtbl,
    pub method: VoidMethodFn,
    pub one: IntMethodFn,
}

pub enum IInterface {}
pub enum IInterface2 {}
pub enum IInterfaceWithGuid {}
pub enum ILargeInterface {}
pub enum IElement {}

unsafe impl Interface for IInterface {
    const NAME: &'static str = "IInterface";
    const IID: Guid = IID_IINTERFACE;
    type Vtbl = IInterfaceVtbl;
}

unsafe impl Interface for IInterface2 {
    const NAME: &'static str = "IInterface2";
    const IID: Guid = IID_IINTERFACE2;
    type Vtbl = IInterface2Vtbl;
}

unsafe impl Interface for IInterfaceWithGuid {
    const NAME: &'static str = "IInterfaceWithGuid";
    const IID: Guid = IID_IINTERFACE_WITH_GUID;
    type Vtbl = IInterfaceWithGuidVtbl;
}

unsafe impl Interface for ILargeInterface {
    const NAME: &'static str = "ILargeInterface";
    const IID: Guid = IID_ILARGE_INTERFACE;
    type Vtbl = ILargeInterfaceVtbl;
}

unsafe impl Interface for IElement {
    const NAME: &'static str = "IElement";
    const IID: Guid = IID_IELEMENT;
    type Vtbl = IElementVtbl;
}

unsafe impl Inherits<IObject> for IInterface {}
unsafe impl Inherits<IObject> for IInterface2 {}
unsafe impl Inherits<IInterface> for IInterface2 {}
unsafe impl Inherits<IObject> for IInterfaceWithGuid {}
unsafe impl Inherits<IObject> for ILargeInterface {}
unsafe impl Inherits<IObject> for IElement {}

/// Exported data symbol carrying the `IInterfaceWithGuid` identifier.
#[unsafe(export_name = "IID_IInterfaceWithGuid")]
pub static IID_IINTERFACE_WITH_GUID_SYMBOL: Guid = IID_IINTERFACE_WITH_GUID;

/// Canonical value of objects made by `CreateInstance`.
pub const DEFAULT_VALUE: MyValue = MyValue { i: 1, j: 3.0 };

unsafe fn write_return(site: Site, ret: *mut MyValue, value: MyValue) -> *mut MyValue {
    match runtime_policy::check(unsafe { view::value_mut(site, ret) }) {
        Some(slot) => {
            *slot = value;
            ret
        }
        None => std::ptr::null_mut(),
    }
}

// ---------------------------------------------------------------------------
// IInterface2 implementation
// ---------------------------------------------------------------------------

pub(crate) struct ValueObject {
    value: Cell<MyValue>,
}

impl ObjectImpl for ValueObject {
    const TYPE_NAME: &'static str = "ValueObject";
    const LOOKUP: Lookup = Lookup::Supported(&[IID_IINTERFACE, IID_IINTERFACE2]);
    type Vtbl = IInterface2Vtbl;

    fn vtable() -> &'static IInterface2Vtbl {
        &VALUE_VTBL
    }
}

static VALUE_VTBL: IInterface2Vtbl = IInterface2Vtbl {
    base: IInterfaceVtbl {
        base: NativeObject::<ValueObject>::base_vtbl(),
        get_value: value_get_value,
    },
    get_value2: value_get_value2,
    add_to_this: value_add_to_this,
};

pub(crate) fn new_value_object(value: MyValue) -> *mut c_void {
    NativeObject::create(ValueObject {
        value: Cell::new(value),
    })
}

unsafe extern "system" fn value_get_value(this: *mut c_void, ret: *mut MyValue) -> *mut MyValue {
    let state = unsafe { NativeObject::<ValueObject>::state(this) };
    unsafe { write_return(Site::new("IInterface::GetValue", "ret"), ret, state.value.get()) }
}

unsafe extern "system" fn value_get_value2(this: *mut c_void, ret: *mut MyValue) -> *mut MyValue {
    let state = unsafe { NativeObject::<ValueObject>::state(this) };
    unsafe { write_return(Site::new("IInterface2::GetValue2", "ret"), ret, state.value.get()) }
}

unsafe extern "system" fn value_add_to_this(
    this: *mut c_void,
    interfaces: *const *mut c_void,
    count: c_int,
) {
    const SITE: Site = Site::new("IInterface2::AddToThis", "interfaces");
    let state = unsafe { NativeObject::<ValueObject>::state(this) };
    let Some(others) = runtime_policy::check(unsafe { view::array(SITE, interfaces, count) }) else {
        return;
    };
    // A null anywhere leaves the target untouched.
    let all_present = if others.iter().all(|p| !p.is_null()) {
        Ok(())
    } else {
        Err(SITE.violation(ViolationKind::NullPointer))
    };
    if runtime_policy::check(all_present).is_none() {
        return;
    }
    for other in others
        .iter()
        .filter_map(|&p| unsafe { ComPtr::<IInterface2>::from_borrowed(p) })
    {
        // Each element is read when reached; an element aliasing `this`
        // observes the additions made so far.
        let add = other.get_value2();
        let mut value = state.value.get();
        value.i = value.i.wrapping_add(add.i);
        value.j += add.j;
        state.value.set(value);
    }
}

impl ComPtr<IInterface> {
    #[must_use]
    pub fn get_value(&self) -> MyValue {
        let mut out = MyValue::default();
        unsafe { (self.vtbl().get_value)(self.as_raw(), &mut out) };
        out
    }
}

impl ComPtr<IInterface2> {
    #[must_use]
    pub fn get_value(&self) -> MyValue {
        let mut out = MyValue::default();
        unsafe { (self.vtbl().base.get_value)(self.as_raw(), &mut out) };
        out
    }

    #[must_use]
    pub fn get_value2(&self) -> MyValue {
        let mut out = MyValue::default();
        unsafe { (self.vtbl().get_value2)(self.as_raw(), &mut out) };
        out
    }

    pub fn add_to_this(&self, others: &[ComPtr<IInterface2>]) {
        let raw: Vec<*mut c_void> = others.iter().map(ComPtr::as_raw).collect();
        let count = c_int::try_from(raw.len()).unwrap_or(c_int::MAX);
        unsafe { (self.vtbl().add_to_this)(self.as_raw(), raw.as_ptr(), count) };
    }
}

// ---------------------------------------------------------------------------
// COM sample: answers NOT_IMPLEMENTED to every lookup
// ---------------------------------------------------------------------------

struct ComSample;

impl ObjectImpl for ComSample {
    const TYPE_NAME: &'static str = "ComSample";
    const LOOKUP: Lookup = Lookup::NotImplemented;
    type Vtbl = IInterfaceVtbl;

    fn vtable() -> &'static IInterfaceVtbl {
        &COM_SAMPLE_VTBL
    }
}

static COM_SAMPLE_VTBL: IInterfaceVtbl = IInterfaceVtbl {
    base: NativeObject::<ComSample>::base_vtbl(),
    get_value: com_sample_get_value,
};

unsafe extern "system" fn com_sample_get_value(_this: *mut c_void, ret: *mut MyValue) -> *mut MyValue {
    unsafe { write_return(Site::new("IComInterface::GetValue", "ret"), ret, DEFAULT_VALUE) }
}

// ---------------------------------------------------------------------------
// IInterfaceWithGuid, ILargeInterface, IElement
// ---------------------------------------------------------------------------

struct GuidSample;

impl ObjectImpl for GuidSample {
    const TYPE_NAME: &'static str = "GuidSample";
    const LOOKUP: Lookup = Lookup::Supported(&[IID_IINTERFACE_WITH_GUID]);
    type Vtbl = IInterfaceWithGuidVtbl;

    fn vtable() -> &'static IInterfaceWithGuidVtbl {
        &GUID_SAMPLE_VTBL
    }
}

static GUID_SAMPLE_VTBL: IInterfaceWithGuidVtbl = IInterfaceWithGuidVtbl {
    base: NativeObject::<GuidSample>::base_vtbl(),
    method: noop_method,
};

unsafe extern "system" fn noop_method(_this: *mut c_void) {}

struct LargeSample;

impl ObjectImpl for LargeSample {
    const TYPE_NAME: &'static str = "LargeSample";
    const LOOKUP: Lookup = Lookup::Supported(&[IID_ILARGE_INTERFACE]);
    type Vtbl = ILargeInterfaceVtbl;

    fn vtable() -> &'static ILargeInterfaceVtbl {
        &LARGE_SAMPLE_VTBL
    }
}

static LARGE_SAMPLE_VTBL: ILargeInterfaceVtbl = ILargeInterfaceVtbl {
    base: NativeObject::<LargeSample>::base_vtbl(),
    method1: large_method1,
    method2: large_method2,
    method3: large_method3,
};

unsafe extern "system" fn large_method1(_this: *mut c_void) -> c_int {
    1
}

unsafe extern "system" fn large_method2(_this: *mut c_void) -> c_int {
    2
}

unsafe extern "system" fn large_method3(_this: *mut c_void) -> c_int {
    3
}

struct Element;

impl ObjectImpl for Element {
    const TYPE_NAME: &'static str = "Element";
    const LOOKUP: Lookup = Lookup::Supported(&[IID_IELEMENT]);
    type Vtbl = IElementVtbl;

    fn vtable() -> &'static IElementVtbl {
        &ELEMENT_VTBL
    }
}

static ELEMENT_VTBL: IElementVtbl = IElementVtbl {
    base: NativeObject::<Element>::base_vtbl(),
    method: noop_method,
    one: element_one,
};

unsafe extern "system" fn element_one(_this: *mut c_void) -> c_int {
    1
}

/// New `IElement` carrying one reference for the caller.
pub(crate) fn new_element() -> *mut c_void {
    NativeObject::create(Element)
}

impl ComPtr<IElement> {
    pub fn method(&self) {
        unsafe { (self.vtbl().method)(self.as_raw()) }
    }

    #[must_use]
    pub fn one(&self) -> i32 {
        unsafe { (self.vtbl().one)(self.as_raw()) }
    }
}

impl ComPtr<ILargeInterface> {
    #[must_use]
    pub fn methods(&self) -> [i32; 3] {
        let vtbl = self.vtbl();
        unsafe {
            [
                (vtbl.method1)(self.as_raw()),
                (vtbl.method2)(self.as_raw()),
                (vtbl.method3)(self.as_raw()),
            ]
        }
    }
}

impl ComPtr<IInterfaceWithGuid> {
    pub fn method(&self) {
        unsafe { (self.vtbl().method)(self.as_raw()) }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

abi_fn! {
    /// New `IInterface2` holding `{1, 3.0}`.
    fn create_instance as "CreateInstance"() -> *mut c_void {
        new_value_object(DEFAULT_VALUE)
    }
}

abi_fn! {
    /// New object holding `{i, j}`, returned through its `IInterface` view.
    fn create_instance2 as "CreateInstance2"(i: c_int, j: f64) -> *mut c_void {
        new_value_object(MyValue { i, j })
    }
}

abi_fn! {
    /// Read `source`'s value through its vtable and write a fresh object with
    /// the same value to `*cloned`.
    fn clone_instance as "CloneInstance"(source: *mut c_void, cloned: *mut *mut c_void) -> bool {
        const SOURCE: Site = Site::new("CloneInstance", "source");
        let Some(out) = runtime_policy::check(view::value_mut(Site::new("CloneInstance", "cloned"), cloned)) else {
            return false;
        };
        let source = ComPtr::<IInterface>::from_borrowed(source);
        let Some(source) = runtime_policy::check(source.ok_or(SOURCE.violation(ViolationKind::NullPointer)))
        else {
            return false;
        };
        *out = new_value_object(source.get_value());
        true
    }
}

abi_fn! {
    /// COM-style sample whose lookup is never implemented.
    fn create_com_instance as "CreateComInstance"() -> *mut c_void {
        NativeObject::create(ComSample)
    }
}

abi_fn! {
    fn create_interface_with_guid as "CreateInterfaceWithGuid"() -> *mut c_void {
        NativeObject::create(GuidSample)
    }
}

abi_fn! {
    fn create_large_interface as "CreateLargeInterface"() -> *mut c_void {
        NativeObject::create(LargeSample)
    }
}

abi_fn! {
    /// Objects created behind the boundary and not yet destroyed.
    fn live_objects as "AbiProbeLiveObjects"() -> usize {
        crate::object::live_objects()
    }
}
