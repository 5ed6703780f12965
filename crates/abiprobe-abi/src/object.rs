//! Reference-counted interface objects.
//!
//! An interface pointer is the address of an object whose first word points
//! to a `#[repr(C)]` table of `extern "system"` function pointers. Every table
//! begins with the [`IObjectVtbl`] base (`QueryCapability`, `Acquire`,
//! `Release`); a derived table embeds its base table as its first field, so
//! slots are append-only.
//!
//! Objects created behind the boundary are [`NativeObject<T>`]: the table
//! pointer, an atomic [`RefCount`] and the implementation state. They are
//! registered with the membrane tracker for their whole lifetime.
//!
//! On the Rust side [`ComPtr<I>`] is the owning handle: `Clone` acquires,
//! `Drop` releases, `query` performs capability lookup and `upcast` converts
//! a derived handle to its base without touching the count.

use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use abiprobe_core::capability::{Guid, IID_IOBJECT};
use abiprobe_core::{AbiError, Status};
use abiprobe_membrane::{RefCount, ReleaseOutcome, global_tracker};

/// `QueryCapability(this, iid, out) -> Status`
pub type QueryCapabilityFn =
    unsafe extern "system" fn(this: *mut c_void, iid: *const Guid, out: *mut *mut c_void) -> Status;
/// `Acquire(this)` / `Release(this)`; returns the resulting count.
pub type RefCountFn = unsafe extern "system" fn(this: *mut c_void) -> u32;

/// Base table shared by every interface.
#[repr(C)]
pub struct IObjectVtbl {
    pub query_capability: QueryCapabilityFn,
    pub acquire: RefCountFn,
    pub release: RefCountFn,
}

/// A Rust marker for one interface of the model.
///
/// # Safety
///
/// `Vtbl` must be `#[repr(C)]` and start with [`IObjectVtbl`], directly or
/// through its base table, and `IID` must be the interface's identifier.
pub unsafe trait Interface: 'static {
    const NAME: &'static str;
    const IID: Guid;
    type Vtbl: 'static;
}

/// Declares that `Self`'s table starts with `Base`'s table.
///
/// # Safety
///
/// `Self::Vtbl` must embed `Base::Vtbl` as its first field (transitively).
pub unsafe trait Inherits<Base: Interface>: Interface {}

/// The base interface every object answers.
pub enum IObject {}

unsafe impl Interface for IObject {
    const NAME: &'static str = "IObject";
    const IID: Guid = IID_IOBJECT;
    type Vtbl = IObjectVtbl;
}

/// Owning handle to one reference on an interface object.
pub struct ComPtr<I: Interface> {
    raw: NonNull<*const I::Vtbl>,
    _marker: PhantomData<I>,
}

impl<I: Interface> ComPtr<I> {
    /// Take ownership of one reference. `None` for null.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must point to a live object implementing `I` and the
    /// caller must own the reference being transferred.
    pub unsafe fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr.cast()).map(|raw| Self {
            raw,
            _marker: PhantomData,
        })
    }

    /// Acquire a new reference to an object the caller only borrows.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must point to a live object implementing `I`.
    pub unsafe fn from_borrowed(ptr: *mut c_void) -> Option<Self> {
        let this = unsafe { Self::from_raw(ptr) }?;
        unsafe { (this.base().acquire)(this.as_raw()) };
        Some(this)
    }

    /// The interface pointer, without affecting ownership.
    #[must_use]
    pub fn as_raw(&self) -> *mut c_void {
        self.raw.as_ptr().cast()
    }

    /// Give up ownership of the reference; the caller must release it.
    #[must_use]
    pub fn into_raw(self) -> *mut c_void {
        let raw = self.as_raw();
        std::mem::forget(self);
        raw
    }

    /// The interface's method table.
    #[must_use]
    pub fn vtbl(&self) -> &I::Vtbl {
        // SAFETY: a live object's first word points at its table.
        unsafe { &**self.raw.as_ptr() }
    }

    fn base(&self) -> &IObjectVtbl {
        // SAFETY: every table starts with the base table.
        unsafe { &*(*self.raw.as_ptr()).cast::<IObjectVtbl>() }
    }

    /// Capability lookup. The result owns the reference the lookup acquired.
    pub fn query<J: Interface>(&self) -> Result<ComPtr<J>, AbiError> {
        let mut out: *mut c_void = std::ptr::null_mut();
        let status = unsafe { (self.base().query_capability)(self.as_raw(), &J::IID, &mut out) };
        if status == Status::NOT_SUPPORTED {
            return Err(AbiError::CapabilityNotSupported { iid: J::IID });
        }
        AbiError::check(status)?;
        // SAFETY: on success the callee wrote an acquired pointer for `J`.
        unsafe { ComPtr::from_raw(out) }.ok_or(AbiError::StatusFailure {
            status: Status::INVALID_POINTER,
        })
    }

    /// View through a base interface; the reference moves with it.
    #[must_use]
    pub fn upcast<B: Interface>(self) -> ComPtr<B>
    where
        I: Inherits<B>,
    {
        let raw = self.raw.cast::<*const B::Vtbl>();
        std::mem::forget(self);
        ComPtr {
            raw,
            _marker: PhantomData,
        }
    }

    /// Identity comparison by address.
    #[must_use]
    pub fn same_object<J: Interface>(&self, other: &ComPtr<J>) -> bool {
        self.as_raw() == other.as_raw()
    }

    /// Count after an acquire/release pair, i.e. the references outstanding
    /// including this handle.
    #[must_use]
    pub fn ref_count(&self) -> u32 {
        unsafe {
            (self.base().acquire)(self.as_raw());
            (self.base().release)(self.as_raw())
        }
    }
}

impl<I: Interface> Clone for ComPtr<I> {
    fn clone(&self) -> Self {
        unsafe { (self.base().acquire)(self.as_raw()) };
        Self {
            raw: self.raw,
            _marker: PhantomData,
        }
    }
}

impl<I: Interface> Drop for ComPtr<I> {
    fn drop(&mut self) {
        unsafe { (self.base().release)(self.as_raw()) };
    }
}

impl<I: Interface> fmt::Debug for ComPtr<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComPtr<{}>({:p})", I::NAME, self.as_raw())
    }
}

/// How an object answers capability lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Answers `IObject` plus the listed capabilities.
    Supported(&'static [Guid]),
    /// Never answers; every lookup returns `NOT_IMPLEMENTED`.
    NotImplemented,
}

/// An implementation backing [`NativeObject`].
pub trait ObjectImpl: Sized + 'static {
    const TYPE_NAME: &'static str;
    const LOOKUP: Lookup;
    type Vtbl: 'static;

    fn vtable() -> &'static Self::Vtbl;
}

/// Heap object behind an interface pointer.
#[repr(C)]
pub struct NativeObject<T: ObjectImpl> {
    vtbl: &'static T::Vtbl,
    refs: RefCount,
    state: T,
}

impl<T: ObjectImpl> NativeObject<T> {
    fn allocate(state: T) -> NonNull<Self> {
        let ptr = NonNull::from(Box::leak(Box::new(Self {
            vtbl: T::vtable(),
            refs: RefCount::new(),
            state,
        })));
        global_tracker().register(ptr.as_ptr() as usize, T::TYPE_NAME);
        ptr
    }

    /// Allocate with one reference owned by the caller and register it.
    #[must_use]
    pub fn create(state: T) -> *mut c_void {
        Self::allocate(state).as_ptr().cast()
    }

    /// Allocate and return the caller's reference as a handle.
    ///
    /// # Safety
    ///
    /// `T::Vtbl` must be `I::Vtbl` or start with it.
    #[must_use]
    pub unsafe fn create_handle<I: Interface>(state: T) -> ComPtr<I> {
        ComPtr {
            raw: Self::allocate(state).cast(),
            _marker: PhantomData,
        }
    }

    /// Implementation state behind `this`.
    ///
    /// # Safety
    ///
    /// `this` must be a live object created by [`NativeObject::<T>::create`].
    pub unsafe fn state<'a>(this: *mut c_void) -> &'a T {
        unsafe { &(*this.cast::<Self>()).state }
    }

    /// Base table entries for `T`.
    #[must_use]
    pub const fn base_vtbl() -> IObjectVtbl {
        IObjectVtbl {
            query_capability: query_thunk::<T>,
            acquire: acquire_thunk::<T>,
            release: release_thunk::<T>,
        }
    }
}

unsafe extern "system" fn query_thunk<T: ObjectImpl>(
    this: *mut c_void,
    iid: *const Guid,
    out: *mut *mut c_void,
) -> Status {
    let Lookup::Supported(capabilities) = T::LOOKUP else {
        return Status::NOT_IMPLEMENTED;
    };
    if iid.is_null() || out.is_null() {
        return Status::INVALID_POINTER;
    }
    let iid = unsafe { &*iid };
    if *iid != IID_IOBJECT && !capabilities.contains(iid) {
        return Status::NOT_SUPPORTED;
    }
    unsafe {
        (*this.cast::<NativeObject<T>>()).refs.acquire();
        *out = this;
    }
    Status::OK
}

unsafe extern "system" fn acquire_thunk<T: ObjectImpl>(this: *mut c_void) -> u32 {
    unsafe { (*this.cast::<NativeObject<T>>()).refs.acquire() }
}

unsafe extern "system" fn release_thunk<T: ObjectImpl>(this: *mut c_void) -> u32 {
    let obj = this.cast::<NativeObject<T>>();
    match unsafe { (*obj).refs.release() } {
        ReleaseOutcome::Alive(remaining) => remaining,
        ReleaseOutcome::Destroy => {
            global_tracker().unregister(obj as usize);
            // SAFETY: allocated by `create`; this was the last reference.
            drop(unsafe { Box::from_raw(obj) });
            0
        }
    }
}

/// Objects created behind the boundary that are still alive.
#[must_use]
pub fn live_objects() -> usize {
    global_tracker().live_count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Probe {
        hits: Cell<u32>,
    }

    #[repr(C)]
    struct ProbeVtbl {
        base: IObjectVtbl,
        hit: unsafe extern "system" fn(*mut c_void) -> u32,
    }

    unsafe extern "system" fn probe_hit(this: *mut c_void) -> u32 {
        let state = unsafe { NativeObject::<Probe>::state(this) };
        state.hits.set(state.hits.get() + 1);
        state.hits.get()
    }

    static PROBE_VTBL: ProbeVtbl = ProbeVtbl {
        base: NativeObject::<Probe>::base_vtbl(),
        hit: probe_hit,
    };

    const IID_PROBE: Guid = Guid::new(0x0BAD_F00D, 1, 2, [3; 8]);

    impl ObjectImpl for Probe {
        const TYPE_NAME: &'static str = "ObjectModuleProbe";
        const LOOKUP: Lookup = Lookup::Supported(&[IID_PROBE]);
        type Vtbl = ProbeVtbl;

        fn vtable() -> &'static ProbeVtbl {
            &PROBE_VTBL
        }
    }

    enum IProbe {}

    unsafe impl Interface for IProbe {
        const NAME: &'static str = "IProbe";
        const IID: Guid = IID_PROBE;
        type Vtbl = ProbeVtbl;
    }

    unsafe impl Inherits<IObject> for IProbe {}

    enum IUnrelated {}

    unsafe impl Interface for IUnrelated {
        const NAME: &'static str = "IUnrelated";
        const IID: Guid = Guid::new(1, 1, 1, [1; 8]);
        type Vtbl = IObjectVtbl;
    }

    fn new_probe() -> ComPtr<IProbe> {
        let raw = NativeObject::create(Probe { hits: Cell::new(0) });
        unsafe { ComPtr::from_raw(raw) }.unwrap()
    }

    fn live_probes() -> usize {
        global_tracker().live_of_type("ObjectModuleProbe")
    }

    #[test]
    fn clone_and_drop_balance() {
        let probe = new_probe();
        assert_eq!(probe.ref_count(), 1);
        let second = probe.clone();
        assert_eq!(probe.ref_count(), 2);
        assert!(probe.same_object(&second));
        drop(second);
        assert_eq!(probe.ref_count(), 1);
    }

    #[test]
    fn methods_dispatch_through_table() {
        let probe = new_probe();
        assert_eq!(unsafe { (probe.vtbl().hit)(probe.as_raw()) }, 1);
        assert_eq!(unsafe { (probe.vtbl().hit)(probe.as_raw()) }, 2);
    }

    #[test]
    fn query_supported_returns_same_identity() {
        let probe = new_probe();
        let again: ComPtr<IProbe> = probe.query().unwrap();
        assert!(again.same_object(&probe));
        assert_eq!(probe.ref_count(), 2);
        let base: ComPtr<IObject> = probe.query().unwrap();
        assert!(base.same_object(&probe));
    }

    #[test]
    fn query_unsupported_leaves_out_untouched() {
        let probe = new_probe();
        let err = probe.query::<IUnrelated>().unwrap_err();
        assert_eq!(
            err,
            AbiError::CapabilityNotSupported {
                iid: IUnrelated::IID
            }
        );

        let sentinel = 0x1234usize as *mut c_void;
        let mut out = sentinel;
        let status = unsafe {
            (probe.vtbl().base.query_capability)(probe.as_raw(), &IUnrelated::IID, &mut out)
        };
        assert_eq!(status, Status::NOT_SUPPORTED);
        assert_eq!(out, sentinel);
        assert_eq!(probe.ref_count(), 1);
    }

    #[test]
    fn query_with_null_out_is_invalid_pointer() {
        let probe = new_probe();
        let status = unsafe {
            (probe.vtbl().base.query_capability)(probe.as_raw(), &IID_PROBE, std::ptr::null_mut())
        };
        assert_eq!(status, Status::INVALID_POINTER);
    }

    #[test]
    fn upcast_keeps_count() {
        let probe = new_probe();
        let keep = probe.clone();
        let base: ComPtr<IObject> = probe.upcast();
        assert!(base.same_object(&keep));
        assert_eq!(keep.ref_count(), 2);
    }

    #[test]
    fn last_release_destroys_and_unregisters() {
        let probe = new_probe();
        let addr = probe.as_raw() as usize;
        assert!(global_tracker().is_live(addr));
        assert!(live_probes() >= 1);
        drop(probe);
        assert!(!global_tracker().is_live(addr));
    }

    #[test]
    fn into_raw_transfers_ownership() {
        let probe = new_probe();
        let raw = probe.into_raw();
        let back = unsafe { ComPtr::<IProbe>::from_raw(raw) }.unwrap();
        assert_eq!(back.ref_count(), 1);
    }
}
