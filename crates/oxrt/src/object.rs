//! Object headers, instance lifecycle and associated objects.
//!
//! Every runtime entity that can receive a message starts with a [`Header`]:
//! instances are heap-allocated headers, classes embed one as their first
//! field. An [`Id`] is a raw pointer to a header.
//!
//! # Ownership
//!
//! Instances are reference counted but the runtime never retains or
//! releases on a caller's behalf: `alloc` hands out one reference, and the
//! caller balances it with `release`. Classes are immortal; retain/release on
//! a class object is a no-op.
//!
//! # Associated objects
//!
//! Each header carries a side table from an opaque key (the address of some
//! static) to an opaque pointer-sized value. The runtime never interprets or
//! frees associated values; the table is dropped with the instance.

use crate::class::ClassRef;
use crate::error::{Error, Result};
use fxhash::FxHashMap;
use std::ffi::c_void;
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{PoisonError, RwLock};

/// Key of an associated-object slot. Conventionally the address of a
/// `static` owned by whoever installs the association.
pub type AssociationKey = *const c_void;

/// Common prefix of instances and class objects.
#[repr(C)]
pub(crate) struct Header {
    /// Class of an instance; `None` marks a class object.
    pub(crate) isa: Option<ClassRef>,
    refcount: AtomicU32,
    associated: RwLock<FxHashMap<usize, usize>>,
}

impl Header {
    pub(crate) fn new(isa: Option<ClassRef>) -> Self {
        Header {
            isa,
            refcount: AtomicU32::new(1),
            associated: RwLock::new(FxHashMap::default()),
        }
    }
}

/// Opaque reference to an object (instance or class).
///
/// `Id` is a plain pointer: copying it neither retains nor releases, and
/// equality is pointer identity.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Id(*mut Header);

// SAFETY: Id is an address; all shared state behind it is atomics or locks.
unsafe impl Send for Id {}
unsafe impl Sync for Id {}

impl Id {
    /// The nil object.
    pub const NIL: Id = Id(ptr::null_mut());

    /// Returns `true` for nil.
    #[must_use]
    pub const fn is_nil(self) -> bool {
        self.0.is_null()
    }

    /// Returns the opaque address.
    #[must_use]
    pub const fn as_ptr(self) -> *mut c_void {
        self.0.cast()
    }

    /// Wraps an opaque address. Any pointer may be wrapped; every operation
    /// that dereferences an `Id` states its own safety contract.
    #[must_use]
    pub const fn from_ptr(ptr: *mut c_void) -> Id {
        Id(ptr.cast())
    }

    /// # Safety
    ///
    /// `self` must be non-nil and point to a live object.
    pub(crate) unsafe fn header<'a>(self) -> &'a Header {
        // SAFETY: guaranteed by caller
        unsafe { &*self.0 }
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            write!(f, "Id(nil)")
        } else {
            write!(f, "Id({:p})", self.0)
        }
    }
}

/// Allocates a new instance of `class` with a reference count of one.
///
/// # Errors
///
/// Returns [`Error::ClassNotRegistered`] if the class pair has not been
/// registered yet.
pub fn class_create_instance(class: ClassRef) -> Result<Id> {
    if !class.is_registered() {
        return Err(Error::ClassNotRegistered {
            name: class.name().to_string(),
        });
    }

    let raw = Box::into_raw(Box::new(Header::new(Some(class))));
    Ok(Id(raw))
}

/// Returns the class of an instance without sending a message.
///
/// Returns `None` for nil and for class objects.
///
/// # Safety
///
/// `obj` must be nil or point to a live object.
#[must_use]
pub unsafe fn object_get_class(obj: Id) -> Option<ClassRef> {
    if obj.is_nil() {
        return None;
    }
    // SAFETY: non-nil and live per caller
    unsafe { obj.header() }.isa
}

/// Returns `true` if `obj` is a class object.
///
/// # Safety
///
/// `obj` must be nil or point to a live object.
#[must_use]
pub unsafe fn object_is_class(obj: Id) -> bool {
    // SAFETY: non-nil and live per caller
    !obj.is_nil() && unsafe { obj.header() }.isa.is_none()
}

/// Increments the reference count of an instance.
///
/// # Safety
///
/// `obj` must be nil or point to a live object.
///
/// # Panics
///
/// Panics on reference count overflow.
pub unsafe fn object_retain(obj: Id) -> Id {
    if obj.is_nil() {
        return obj;
    }
    // SAFETY: non-nil and live per caller
    let header = unsafe { obj.header() };
    if header.isa.is_some() {
        let old = header.refcount.fetch_add(1, Ordering::AcqRel);
        assert!(old != u32::MAX, "Reference count overflow in object_retain");
    }
    obj
}

/// Decrements the reference count, freeing the instance at zero.
///
/// # Safety
///
/// `obj` must be nil or point to a live object, and the caller must own the
/// reference being released. `obj` must not be used after its last release.
pub unsafe fn object_release(obj: Id) {
    if obj.is_nil() {
        return;
    }
    // SAFETY: non-nil and live per caller
    let header = unsafe { obj.header() };
    if header.isa.is_none() {
        return;
    }
    if header.refcount.fetch_sub(1, Ordering::AcqRel) == 1 {
        // SAFETY: last reference; instances are always boxed headers
        drop(unsafe { Box::from_raw(obj.0) });
    }
}

/// Returns the current reference count (always 1 for class objects).
///
/// # Safety
///
/// `obj` must be non-nil and point to a live object.
#[must_use]
pub unsafe fn object_retain_count(obj: Id) -> u32 {
    // SAFETY: guaranteed by caller
    unsafe { obj.header() }.refcount.load(Ordering::Acquire)
}

/// Stores `value` under `key` on `obj`; a null `value` removes the entry.
///
/// The runtime neither retains nor frees `value`.
///
/// # Safety
///
/// `obj` must be non-nil and point to a live object.
pub unsafe fn set_associated_object(obj: Id, key: AssociationKey, value: *mut c_void) {
    // SAFETY: guaranteed by caller
    let header = unsafe { obj.header() };
    let mut table = header
        .associated
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    if value.is_null() {
        table.remove(&(key as usize));
    } else {
        table.insert(key as usize, value as usize);
    }
}

/// Returns the value stored under `key` on `obj`, or null.
///
/// # Safety
///
/// `obj` must be non-nil and point to a live object.
#[must_use]
pub unsafe fn get_associated_object(obj: Id, key: AssociationKey) -> *mut c_void {
    // SAFETY: guaranteed by caller
    let header = unsafe { obj.header() };
    header
        .associated
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&(key as usize))
        .map_or(ptr::null_mut(), |value| *value as *mut c_void)
}

/// Removes every associated value from `obj`.
///
/// # Safety
///
/// `obj` must be non-nil and point to a live object.
pub unsafe fn remove_associated_objects(obj: Id) {
    // SAFETY: guaranteed by caller
    let header = unsafe { obj.header() };
    header
        .associated
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}
