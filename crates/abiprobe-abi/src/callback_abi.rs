//! Callback protocol.
//!
//! Two directions share one vtable:
//!
//! * host side: a Rust [`CallbackHandler`] is wrapped by [`CallbackShadow`]
//!   into a reference-counted `ICallback` object whose static table forwards
//!   every slot to the handler;
//! * native side: [`CallbackView`] invokes any `ICallback*` purely through its
//!   table, and `RunCallbackProbe` drives every slot with fixed inputs and
//!   reports what came back.

use std::ffi::{CStr, CString, c_char, c_int, c_void};

use abiprobe_core::callback::{self, CallbackProbeReport, HANDLER_NAME, probe_inputs};
use abiprobe_core::capability::IID_ICALLBACK;
use abiprobe_core::functions::first_unit;
use abiprobe_core::shape::plain::{CallbackLargeStruct, LargeStructWithMarshalling};
use abiprobe_core::{AbiError, Guid, MethodOperation, Status};
use abiprobe_membrane::view::{self, Site};
use abiprobe_membrane::ViolationKind;

use crate::macros::abi_fn;
use crate::object::{ComPtr, IObject, IObjectVtbl, Inherits, Interface, Lookup, NativeObject, ObjectImpl};
use crate::runtime_policy;
use crate::util;

#[repr(C)]
pub struct ICallbackVtbl {
    pub base: IObjectVtbl,
    pub add: unsafe extern "system" fn(this: *mut c_void, i: c_int, j: c_int) -> c_int,
    pub are_equal: unsafe extern "system" fn(this: *mut c_void, other: *mut c_void) -> bool,
    pub clone_instance: unsafe extern "system" fn(this: *mut c_void, out: *mut *mut c_void) -> Status,
    pub get_first_ansi_character: unsafe extern "system" fn(this: *mut c_void, text: *const c_char) -> u8,
    pub get_first_character: unsafe extern "system" fn(this: *mut c_void, text: *const u16) -> u16,
    pub get_large_marshalled_struct: unsafe extern "system" fn(
        this: *mut c_void,
        ret: *mut LargeStructWithMarshalling,
        a: i64,
        b: i64,
        c: i64,
    ) -> *mut LargeStructWithMarshalling,
    pub get_large_struct: unsafe extern "system" fn(
        this: *mut c_void,
        ret: *mut CallbackLargeStruct,
        a: i64,
        b: i64,
    ) -> *mut CallbackLargeStruct,
    pub get_zero: unsafe extern "system" fn(this: *mut c_void, out: *mut c_int),
    pub increment: unsafe extern "system" fn(this: *mut c_void, value: *mut c_int),
    pub mapped_type_test: unsafe extern "system" fn(this: *mut c_void, value: u32) -> c_int,
    pub modify_pointer:
        unsafe extern "system" fn(this: *mut c_void, ptr: isize, op: MethodOperation) -> isize,
    pub array_relation_and:
        unsafe extern "system" fn(this: *mut c_void, values: *const u8, len: c_int) -> bool,
    pub array_relation_sum:
        unsafe extern "system" fn(this: *mut c_void, values: *const c_int, len: c_int) -> c_int,
    pub array_relation_sum_struct: unsafe extern "system" fn(
        this: *mut c_void,
        values: *const LargeStructWithMarshalling,
        len: c_int,
    ) -> i64,
    pub get_name: unsafe extern "system" fn(this: *mut c_void) -> *const c_char,
}

pub enum ICallback {}

unsafe impl Interface for ICallback {
    const NAME: &'static str = "ICallback";
    const IID: Guid = IID_ICALLBACK;
    type Vtbl = ICallbackVtbl;
}

unsafe impl Inherits<IObject> for ICallback {}

/// Host-side implementation of `ICallback`.
///
/// Every method defaults to the reference behavior; a handler overrides only
/// what it wants to perturb.
pub trait CallbackHandler: 'static {
    /// Backs `CloneInstance`. An error surfaces as `FAILED`.
    fn clone_handler(&self) -> Result<Box<dyn CallbackHandler>, AbiError>;

    fn add(&self, i: i32, j: i32) -> i32 {
        callback::add(i, j)
    }

    /// Two callbacks are equal when they agree on `Add(1, 1)`.
    fn are_equal(&self, other: &CallbackView) -> bool {
        self.add(1, 1) == other.add(1, 1)
    }

    fn first_ansi_character(&self, text: &CStr) -> u8 {
        first_unit(text.to_bytes())
    }

    fn first_character(&self, text: &[u16]) -> u16 {
        first_unit(text)
    }

    fn large_marshalled_struct(&self, a: i64, b: i64, c: i64) -> LargeStructWithMarshalling {
        callback::get_large_marshalled_struct(a, b, c)
    }

    fn large_struct(&self, a: i64, b: i64) -> CallbackLargeStruct {
        callback::get_large_struct(a, b)
    }

    fn zero(&self) -> i32 {
        0
    }

    fn increment(&self, value: &mut i32) {
        *value = value.wrapping_add(1);
    }

    fn mapped_type_test(&self, value: u32) -> i32 {
        callback::mapped_type_test(value)
    }

    fn modify_pointer(&self, ptr: isize, op: MethodOperation) -> isize {
        callback::modify_pointer(ptr, op)
    }

    fn array_relation_and(&self, values: &[u8]) -> bool {
        callback::array_relation_and(values)
    }

    fn array_relation_sum(&self, values: &[i32]) -> i32 {
        callback::array_relation_sum(values)
    }

    fn array_relation_sum_struct(&self, values: &[LargeStructWithMarshalling]) -> i64 {
        callback::array_relation_sum_struct(values)
    }

    /// Returned by `GetName`; must outlive the handler's object.
    fn name(&self) -> &CStr {
        HANDLER_NAME
    }
}

/// The reference handler: every default, cloneable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceHandler;

impl CallbackHandler for ReferenceHandler {
    fn clone_handler(&self) -> Result<Box<dyn CallbackHandler>, AbiError> {
        Ok(Box::new(*self))
    }
}

// ---------------------------------------------------------------------------
// Host side: handler -> ICallback object
// ---------------------------------------------------------------------------

/// `ICallback` object forwarding to a boxed handler.
pub struct CallbackShadow {
    handler: Box<dyn CallbackHandler>,
}

impl ObjectImpl for CallbackShadow {
    const TYPE_NAME: &'static str = "CallbackShadow";
    const LOOKUP: Lookup = Lookup::Supported(&[IID_ICALLBACK]);
    type Vtbl = ICallbackVtbl;

    fn vtable() -> &'static ICallbackVtbl {
        &SHADOW_VTBL
    }
}

impl CallbackShadow {
    /// Wrap `handler` into a new object; the handle owns its one reference.
    #[must_use]
    pub fn wrap(handler: Box<dyn CallbackHandler>) -> CallbackView {
        // SAFETY: the shadow's table is `ICallbackVtbl`.
        CallbackView(unsafe { NativeObject::create_handle(Self { handler }) })
    }
}

static SHADOW_VTBL: ICallbackVtbl = ICallbackVtbl {
    base: NativeObject::<CallbackShadow>::base_vtbl(),
    add: shadow_add,
    are_equal: shadow_are_equal,
    clone_instance: shadow_clone_instance,
    get_first_ansi_character: shadow_first_ansi,
    get_first_character: shadow_first_character,
    get_large_marshalled_struct: shadow_large_marshalled,
    get_large_struct: shadow_large_struct,
    get_zero: shadow_get_zero,
    increment: shadow_increment,
    mapped_type_test: shadow_mapped,
    modify_pointer: shadow_modify_pointer,
    array_relation_and: shadow_array_and,
    array_relation_sum: shadow_array_sum,
    array_relation_sum_struct: shadow_array_sum_struct,
    get_name: shadow_get_name,
};

unsafe fn handler<'a>(this: *mut c_void) -> &'a dyn CallbackHandler {
    unsafe { NativeObject::<CallbackShadow>::state(this) }.handler.as_ref()
}

unsafe extern "system" fn shadow_add(this: *mut c_void, i: c_int, j: c_int) -> c_int {
    unsafe { handler(this) }.add(i, j)
}

unsafe extern "system" fn shadow_are_equal(this: *mut c_void, other: *mut c_void) -> bool {
    const SITE: Site = Site::new("ICallback::AreEqual", "other");
    let other = unsafe { CallbackView::from_borrowed(other) };
    match runtime_policy::check(other.ok_or(SITE.violation(ViolationKind::NullPointer))) {
        Some(other) => unsafe { handler(this) }.are_equal(&other),
        None => false,
    }
}

unsafe extern "system" fn shadow_clone_instance(this: *mut c_void, out: *mut *mut c_void) -> Status {
    if out.is_null() {
        return Status::INVALID_POINTER;
    }
    match unsafe { handler(this) }.clone_handler() {
        Ok(cloned) => {
            let raw = NativeObject::create(CallbackShadow { handler: cloned });
            unsafe { out.write(raw) };
            Status::OK
        }
        Err(_) => Status::FAILED,
    }
}

unsafe extern "system" fn shadow_first_ansi(this: *mut c_void, text: *const c_char) -> u8 {
    let site = Site::new("ICallback::GetFirstAnsiCharacter", "text");
    match runtime_policy::check(unsafe { util::c_str(site, text) }) {
        Some(text) => unsafe { handler(this) }.first_ansi_character(text),
        None => 0,
    }
}

unsafe extern "system" fn shadow_first_character(this: *mut c_void, text: *const u16) -> u16 {
    let site = Site::new("ICallback::GetFirstCharacter", "text");
    match runtime_policy::check(unsafe { util::utf16_str(site, text) }) {
        Some(text) => unsafe { handler(this) }.first_character(text),
        None => 0,
    }
}

unsafe extern "system" fn shadow_large_marshalled(
    this: *mut c_void,
    ret: *mut LargeStructWithMarshalling,
    a: i64,
    b: i64,
    c: i64,
) -> *mut LargeStructWithMarshalling {
    let site = Site::new("ICallback::GetLargeMarshalledStruct", "ret");
    let Some(slot) = runtime_policy::check(unsafe { view::value_mut(site, ret) }) else {
        return std::ptr::null_mut();
    };
    *slot = unsafe { handler(this) }.large_marshalled_struct(a, b, c);
    ret
}

unsafe extern "system" fn shadow_large_struct(
    this: *mut c_void,
    ret: *mut CallbackLargeStruct,
    a: i64,
    b: i64,
) -> *mut CallbackLargeStruct {
    let site = Site::new("ICallback::GetLargeStruct", "ret");
    let Some(slot) = runtime_policy::check(unsafe { view::value_mut(site, ret) }) else {
        return std::ptr::null_mut();
    };
    *slot = unsafe { handler(this) }.large_struct(a, b);
    ret
}

unsafe extern "system" fn shadow_get_zero(this: *mut c_void, out: *mut c_int) {
    let site = Site::new("ICallback::GetZero", "out");
    if let Some(slot) = runtime_policy::check(unsafe { view::value_mut(site, out) }) {
        *slot = unsafe { handler(this) }.zero();
    }
}

unsafe extern "system" fn shadow_increment(this: *mut c_void, value: *mut c_int) {
    let site = Site::new("ICallback::Increment", "value");
    if let Some(slot) = runtime_policy::check(unsafe { view::value_mut(site, value) }) {
        unsafe { handler(this) }.increment(slot);
    }
}

unsafe extern "system" fn shadow_mapped(this: *mut c_void, value: u32) -> c_int {
    unsafe { handler(this) }.mapped_type_test(value)
}

unsafe extern "system" fn shadow_modify_pointer(this: *mut c_void, ptr: isize, op: MethodOperation) -> isize {
    unsafe { handler(this) }.modify_pointer(ptr, op)
}

unsafe extern "system" fn shadow_array_and(this: *mut c_void, values: *const u8, len: c_int) -> bool {
    let site = Site::new("ICallback::ArrayRelationAnd", "values");
    match runtime_policy::check(unsafe { view::array(site, values, len) }) {
        Some(values) => unsafe { handler(this) }.array_relation_and(values),
        None => false,
    }
}

unsafe extern "system" fn shadow_array_sum(this: *mut c_void, values: *const c_int, len: c_int) -> c_int {
    let site = Site::new("ICallback::ArrayRelationSum", "values");
    match runtime_policy::check(unsafe { view::array(site, values, len) }) {
        Some(values) => unsafe { handler(this) }.array_relation_sum(values),
        None => 0,
    }
}

unsafe extern "system" fn shadow_array_sum_struct(
    this: *mut c_void,
    values: *const LargeStructWithMarshalling,
    len: c_int,
) -> i64 {
    let site = Site::new("ICallback::ArrayRelationSumStruct", "values");
    match runtime_policy::check(unsafe { view::array(site, values, len) }) {
        Some(values) => unsafe { handler(this) }.array_relation_sum_struct(values),
        None => 0,
    }
}

unsafe extern "system" fn shadow_get_name(this: *mut c_void) -> *const c_char {
    unsafe { handler(this) }.name().as_ptr()
}

// ---------------------------------------------------------------------------
// Native side: calls through any ICallback table
// ---------------------------------------------------------------------------

fn len_arg(len: usize) -> c_int {
    // Saturation only ever shortens what the callee reads.
    c_int::try_from(len).unwrap_or(c_int::MAX)
}

/// Owning handle that invokes an `ICallback` through its table.
#[derive(Debug, Clone)]
pub struct CallbackView(ComPtr<ICallback>);

impl CallbackView {
    #[must_use]
    pub fn new(ptr: ComPtr<ICallback>) -> Self {
        Self(ptr)
    }

    /// Acquire a reference to a borrowed `ICallback*`. `None` for null.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must be a live object implementing `ICallback`.
    pub unsafe fn from_borrowed(ptr: *mut c_void) -> Option<Self> {
        unsafe { ComPtr::from_borrowed(ptr) }.map(Self)
    }

    #[must_use]
    pub fn as_ptr(&self) -> &ComPtr<ICallback> {
        &self.0
    }

    fn call(&self) -> (&ICallbackVtbl, *mut c_void) {
        (self.0.vtbl(), self.0.as_raw())
    }

    #[must_use]
    pub fn add(&self, i: i32, j: i32) -> i32 {
        let (v, this) = self.call();
        unsafe { (v.add)(this, i, j) }
    }

    #[must_use]
    pub fn are_equal(&self, other: &CallbackView) -> bool {
        let (v, this) = self.call();
        unsafe { (v.are_equal)(this, other.0.as_raw()) }
    }

    pub fn clone_instance(&self) -> Result<CallbackView, AbiError> {
        let (v, this) = self.call();
        let mut out = std::ptr::null_mut();
        AbiError::check(unsafe { (v.clone_instance)(this, &mut out) })?;
        unsafe { ComPtr::from_raw(out) }
            .map(Self)
            .ok_or(AbiError::StatusFailure {
                status: Status::INVALID_POINTER,
            })
    }

    #[must_use]
    pub fn first_ansi_character(&self, text: &CStr) -> u8 {
        let (v, this) = self.call();
        unsafe { (v.get_first_ansi_character)(this, text.as_ptr()) }
    }

    /// `text` is copied and terminated before the call.
    #[must_use]
    pub fn first_character(&self, text: &[u16]) -> u16 {
        let (v, this) = self.call();
        let terminated: Vec<u16> = text.iter().copied().take_while(|u| *u != 0).chain([0]).collect();
        unsafe { (v.get_first_character)(this, terminated.as_ptr()) }
    }

    #[must_use]
    pub fn large_marshalled_struct(&self, a: i64, b: i64, c: i64) -> LargeStructWithMarshalling {
        let (v, this) = self.call();
        let mut out = LargeStructWithMarshalling::default();
        unsafe { (v.get_large_marshalled_struct)(this, &mut out, a, b, c) };
        out
    }

    #[must_use]
    pub fn large_struct(&self, a: i64, b: i64) -> CallbackLargeStruct {
        let (v, this) = self.call();
        let mut out = CallbackLargeStruct::default();
        unsafe { (v.get_large_struct)(this, &mut out, a, b) };
        out
    }

    /// Starts from a non-zero value so an untouched slot is visible.
    #[must_use]
    pub fn zero(&self) -> i32 {
        let (v, this) = self.call();
        let mut out = -1;
        unsafe { (v.get_zero)(this, &mut out) };
        out
    }

    pub fn increment(&self, value: &mut i32) {
        let (v, this) = self.call();
        unsafe { (v.increment)(this, value) }
    }

    #[must_use]
    pub fn mapped_type_test(&self, value: u32) -> i32 {
        let (v, this) = self.call();
        unsafe { (v.mapped_type_test)(this, value) }
    }

    #[must_use]
    pub fn modify_pointer(&self, ptr: isize, op: MethodOperation) -> isize {
        let (v, this) = self.call();
        unsafe { (v.modify_pointer)(this, ptr, op) }
    }

    #[must_use]
    pub fn array_relation_and(&self, values: &[u8]) -> bool {
        let (v, this) = self.call();
        unsafe { (v.array_relation_and)(this, values.as_ptr(), len_arg(values.len())) }
    }

    #[must_use]
    pub fn array_relation_sum(&self, values: &[i32]) -> i32 {
        let (v, this) = self.call();
        unsafe { (v.array_relation_sum)(this, values.as_ptr(), len_arg(values.len())) }
    }

    #[must_use]
    pub fn array_relation_sum_struct(&self, values: &[LargeStructWithMarshalling]) -> i64 {
        let (v, this) = self.call();
        unsafe { (v.array_relation_sum_struct)(this, values.as_ptr(), len_arg(values.len())) }
    }

    /// Copy of the callee's name; `None` when it returns null.
    #[must_use]
    pub fn name(&self) -> Option<CString> {
        let (v, this) = self.call();
        let ptr = unsafe { (v.get_name)(this) };
        if ptr.is_null() {
            return None;
        }
        // SAFETY: valid while the callee is alive, which `self` guarantees.
        Some(unsafe { CStr::from_ptr(ptr) }.to_owned())
    }
}

/// Drive every slot of `view` with the fixed probe inputs.
#[must_use]
pub fn run_probe(view: &CallbackView) -> CallbackProbeReport {
    use probe_inputs as p;

    let mut incremented = p::INCREMENT_FROM;
    view.increment(&mut incremented);
    let large_marshalled =
        view.large_marshalled_struct(p::LARGE_MARSHALLED.0, p::LARGE_MARSHALLED.1, p::LARGE_MARSHALLED.2);
    let reference_marshalled =
        callback::get_large_marshalled_struct(p::LARGE_MARSHALLED.0, p::LARGE_MARSHALLED.1, p::LARGE_MARSHALLED.2);
    let (clone_succeeded, clone_add) = match view.clone_instance() {
        Ok(clone) => (1, clone.add(p::CLONE_ADD.0, p::CLONE_ADD.1)),
        Err(_) => (0, 0),
    };

    CallbackProbeReport {
        add: view.add(p::ADD.0, p::ADD.1),
        zero: view.zero(),
        incremented,
        first_ansi: view.first_ansi_character(p::ANSI_TEXT),
        are_equal_self: u8::from(view.are_equal(view)),
        array_and: u8::from(view.array_relation_and(&p::AND_ARRAY)),
        clone_succeeded,
        first_utf16: view.first_character(&p::UTF16_TEXT),
        clone_add,
        large_struct: view.large_struct(p::LARGE_STRUCT.0, p::LARGE_STRUCT.1),
        large_marshalled,
        mapped: view.mapped_type_test(p::MAPPED),
        array_sum: view.array_relation_sum(&p::SUM_ARRAY),
        pointer_pass_through: view.modify_pointer(p::POINTER, p::POINTER_OPS[0]),
        pointer_increment: view.modify_pointer(p::POINTER, p::POINTER_OPS[1]),
        array_sum_struct: view.array_relation_sum_struct(&[reference_marshalled]),
        name_len: view.name().map_or(0, |n| n.as_bytes().len()),
    }
}

abi_fn! {
    /// Probe `callback` and write the report. The report is untouched unless
    /// the result is `OK`.
    fn run_callback_probe as "RunCallbackProbe"(callback: *mut c_void, report: *mut CallbackProbeReport) -> Status {
        const CALLBACK: Site = Site::new("RunCallbackProbe", "callback");
        let Some(slot) = runtime_policy::check(view::value_mut(Site::new("RunCallbackProbe", "report"), report)) else {
            return Status::INVALID_POINTER;
        };
        let callback = CallbackView::from_borrowed(callback);
        let Some(callback) = runtime_policy::check(callback.ok_or(CALLBACK.violation(ViolationKind::NullPointer)))
        else {
            return Status::INVALID_POINTER;
        };
        *slot = run_probe(&callback);
        Status::OK
    }
}

abi_fn! {
    /// Native `ICallback` backed by the reference handler.
    fn create_reference_callback as "CreateReferenceCallback"() -> *mut c_void {
        NativeObject::create(CallbackShadow { handler: Box::new(ReferenceHandler) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn reference_handler_matches_expected_report() {
        let view = CallbackShadow::wrap(Box::new(ReferenceHandler));
        let report = run_probe(&view);
        let expected = CallbackProbeReport::expected(HANDLER_NAME);
        assert_eq!(report.mismatches(&expected), Vec::<&str>::new());
        assert_eq!(report, expected);
    }

    struct NoClone;

    impl CallbackHandler for NoClone {
        fn clone_handler(&self) -> Result<Box<dyn CallbackHandler>, AbiError> {
            Err(AbiError::StatusFailure {
                status: Status::FAILED,
            })
        }
    }

    #[test]
    fn clone_failure_surfaces_as_failed_and_leaves_out() {
        let view = CallbackShadow::wrap(Box::new(NoClone));
        let sentinel = 0x40usize as *mut c_void;
        let mut out = sentinel;
        let status = unsafe { (view.as_ptr().vtbl().clone_instance)(view.as_ptr().as_raw(), &mut out) };
        assert_eq!(status, Status::FAILED);
        assert_eq!(out, sentinel);
        let report = run_probe(&view);
        assert_eq!(
            report.mismatches(&CallbackProbeReport::expected(HANDLER_NAME)),
            vec!["clone_succeeded", "clone_add"]
        );
    }

    struct OffByOne;

    impl CallbackHandler for OffByOne {
        fn clone_handler(&self) -> Result<Box<dyn CallbackHandler>, AbiError> {
            Ok(Box::new(OffByOne))
        }

        fn add(&self, i: i32, j: i32) -> i32 {
            i + j + 1
        }

        fn name(&self) -> &CStr {
            c"OffByOne"
        }
    }

    #[test]
    fn perturbed_handler_is_detected() {
        let view = CallbackShadow::wrap(Box::new(OffByOne));
        let report = run_probe(&view);
        let mismatches = report.mismatches(&CallbackProbeReport::expected(HANDLER_NAME));
        assert_eq!(mismatches, vec!["add", "clone_add", "name_len"]);
        assert_eq!(report.are_equal_self, 1);
    }

    #[test]
    fn are_equal_compares_through_the_other_table() {
        let reference = CallbackShadow::wrap(Box::new(ReferenceHandler));
        let off = CallbackShadow::wrap(Box::new(OffByOne));
        assert!(reference.are_equal(&reference));
        assert!(!reference.are_equal(&off));
        assert!(!off.are_equal(&reference));
    }

    struct Counting(Rc<Cell<u32>>);

    impl CallbackHandler for Counting {
        fn clone_handler(&self) -> Result<Box<dyn CallbackHandler>, AbiError> {
            Ok(Box::new(Counting(Rc::clone(&self.0))))
        }

        fn increment(&self, value: &mut i32) {
            self.0.set(self.0.get() + 1);
            *value += 1;
        }
    }

    impl Drop for Counting {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 100);
        }
    }

    #[test]
    fn shadow_drops_handler_on_last_release() {
        let hits = Rc::new(Cell::new(0));
        let view = CallbackShadow::wrap(Box::new(Counting(Rc::clone(&hits))));
        let mut v = 1;
        view.increment(&mut v);
        assert_eq!(v, 2);
        let second = view.clone();
        drop(view);
        assert_eq!(hits.get(), 1);
        drop(second);
        assert_eq!(hits.get(), 101);
    }

    #[test]
    fn view_terminates_utf16_input() {
        let view = CallbackShadow::wrap(Box::new(ReferenceHandler));
        assert_eq!(view.first_character(&[0x263A, 0x41]), 0x263A);
        assert_eq!(view.first_character(&[]), 0);
        assert_eq!(view.zero(), 0);
    }

    #[test]
    fn native_reference_callback_probes_clean() {
        let raw = unsafe { create_reference_callback() };
        let mut report = CallbackProbeReport::default();
        assert_eq!(unsafe { run_callback_probe(raw, &mut report) }, Status::OK);
        assert_eq!(report, CallbackProbeReport::expected(HANDLER_NAME));
        drop(unsafe { ComPtr::<ICallback>::from_raw(raw) });
    }
}
