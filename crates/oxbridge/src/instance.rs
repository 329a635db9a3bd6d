//! Instance binding: native instance to host struct.
//!
//! Binding allocates a native instance (`alloc` then `init`), stores its
//! handle in the host struct and installs an association from the instance
//! to a [`HostBinding`]: the struct's address and its type. The trampoline
//! follows that association on every dispatch and checks the type against
//! the method it is about to run, so the address must stay valid while the
//! instance can receive messages.
//!
//! [`Bound`] is the owning form: it boxes the host value so the address is
//! stable, and on drop clears the association and releases the instance.

use crate::fault::{self, BridgeFault};
use crate::handle::{Class, Handle, HostObject, Object, Selector};
use oxidex_log::debug;
use oxrt::Value;
use std::any::{TypeId, type_name};
use std::ffi::c_void;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

static HOST_KEY: u8 = 1;

fn host_key() -> oxrt::AssociationKey {
    ptr::from_ref(&HOST_KEY).cast()
}

/// What an instance is bound to: a host struct address and its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostBinding {
    host: NonNull<c_void>,
    host_type: TypeId,
    host_type_name: &'static str,
}

impl HostBinding {
    fn of<T: 'static>(host: NonNull<T>) -> Self {
        HostBinding {
            host: host.cast(),
            host_type: TypeId::of::<T>(),
            host_type_name: type_name::<T>(),
        }
    }

    /// Address of the host struct.
    #[must_use]
    pub fn host(&self) -> NonNull<c_void> {
        self.host
    }

    /// Type of the host struct.
    #[must_use]
    pub fn host_type(&self) -> TypeId {
        self.host_type
    }

    /// Name of [`HostBinding::host_type`], for diagnostics.
    #[must_use]
    pub fn host_type_name(&self) -> &'static str {
        self.host_type_name
    }
}

/// The binding record of `handle`, if any.
///
/// # Safety
///
/// `handle` must refer to a live native object.
#[must_use]
pub unsafe fn binding(handle: Handle) -> Option<HostBinding> {
    // SAFETY: forwarded to caller
    let raw = unsafe { oxrt::get_associated_object(handle.id(), host_key()) };
    // SAFETY: only `associate` stores under this key, always a leaked
    // `Box<HostBinding>` that `unbind` reclaims before clearing
    NonNull::new(raw.cast::<HostBinding>()).map(|record| unsafe { *record.as_ptr() })
}

/// Address of the host struct bound to `handle`, if any.
///
/// # Safety
///
/// `handle` must refer to a live native object.
#[must_use]
pub unsafe fn association(handle: Handle) -> Option<NonNull<c_void>> {
    // SAFETY: forwarded to caller
    unsafe { binding(handle) }.map(|bound| bound.host)
}

/// Installs the association `handle` to the `T` at `host`, replacing any
/// earlier one.
///
/// # Safety
///
/// `handle` must refer to a live native object.
pub(crate) unsafe fn associate<T: 'static>(handle: Handle, host: NonNull<T>) {
    // SAFETY: forwarded to caller
    unsafe { unbind(handle) };
    let record = Box::into_raw(Box::new(HostBinding::of(host)));
    // SAFETY: forwarded to caller
    unsafe { oxrt::set_associated_object(handle.id(), host_key(), record.cast()) };
}

/// Removes the association from `handle`. Later dispatch to the instance
/// faults with `MissingAssociation` instead of touching the old struct.
///
/// # Safety
///
/// `handle` must refer to a live native object.
pub unsafe fn unbind(handle: Handle) {
    // SAFETY: forwarded to caller
    let raw = unsafe { oxrt::get_associated_object(handle.id(), host_key()) };
    if raw.is_null() {
        return;
    }
    // SAFETY: forwarded to caller
    unsafe { oxrt::set_associated_object(handle.id(), host_key(), ptr::null_mut()) };
    // SAFETY: leaked by `associate` and no longer reachable from the instance
    drop(unsafe { Box::from_raw(raw.cast::<HostBinding>()) });
}

/// Allocates an instance of `class_name` and binds it to `host`.
///
/// Faults if the class does not exist, if `alloc`/`init` fail, or if they
/// return something other than an object.
///
/// # Safety
///
/// `host` must point to a live `T` that stays at the same address, and is
/// not otherwise mutably borrowed while the instance receives messages.
pub(crate) unsafe fn bind_instance<T: HostObject>(class_name: &str, host: NonNull<T>) -> Handle {
    let class = crate::handle::get_class(class_name);
    if class.is_nil() {
        fault::raise(BridgeFault::InstanceAllocationFailed {
            class: class_name.to_string(),
            reason: "no registered class with this name".to_string(),
        });
    }

    let handle = alloc_init(class, class_name);

    // SAFETY: the caller guarantees `host` is live and unaliased
    unsafe { (*host.as_ptr()).set_object(handle) };
    // SAFETY: alloc/init returned a live instance
    unsafe { associate(handle, host) };

    debug!("bound {:?} of '{}' to {:p}", handle, class_name, host);
    handle
}

fn alloc_init(class: Class, class_name: &str) -> Handle {
    let send = |receiver: Handle, name: &str| {
        // SAFETY: the receiver is a registered class or the instance it
        // just allocated
        match unsafe { receiver.send_message(Selector::register(name), &[]) } {
            Ok(value) => value,
            Err(err) => fault::raise(BridgeFault::InstanceAllocationFailed {
                class: class_name.to_string(),
                reason: format!("{name}: {err}"),
            }),
        }
    };

    let object = |value: Value| match value {
        Value::Object(id) if !id.is_nil() => Handle::from_id(id),
        _ => fault::raise(BridgeFault::NotAnObject {
            class: class_name.to_string(),
        }),
    };

    let allocated = object(send(class.handle(), "alloc"));
    object(send(allocated, "init"))
}

/// A host value boxed and bound to its own native instance.
///
/// `Bound` owns the reference `alloc` returned. Dropping it clears the
/// association, releases that reference and frees the host value. Code that
/// retained the instance elsewhere keeps a live object whose messages fault
/// with `MissingAssociation` instead of reaching freed memory.
///
/// Every message to the instance runs its host method on a `&mut T` to the
/// boxed value. A reference obtained through `Deref` must therefore end
/// before the next send to [`Bound::handle`]; [`Bound::with`] scopes one.
pub struct Bound<T: HostObject> {
    // Always a leaked Box, reclaimed in Drop
    host: NonNull<T>,
    handle: Handle,
}

impl<T: HostObject> Bound<T> {
    /// Boxes `value` and binds it to a new instance of `class_name`.
    pub(crate) fn new(class_name: &str, value: T) -> Self {
        let host = NonNull::from(Box::leak(Box::new(value)));
        // SAFETY: the box is owned by `Bound` and never moves
        let handle = unsafe { bind_instance(class_name, host) };
        Bound { host, handle }
    }

    /// The native instance.
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Address of the bound host value.
    #[must_use]
    pub fn as_ptr(&self) -> *mut T {
        self.host.as_ptr()
    }

    /// Runs `f` on the host value. The borrow cannot outlive the call, so it
    /// cannot overlap a send made after `with` returns.
    pub fn with<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut **self)
    }
}

/// Must not be held across a message send to the instance.
impl<T: HostObject> Deref for Bound<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: `host` is a live box owned by self
        unsafe { self.host.as_ref() }
    }
}

/// Must not be held across a message send to the instance.
impl<T: HostObject> DerefMut for Bound<T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: `host` is a live box owned by self
        unsafe { self.host.as_mut() }
    }
}

impl<T: HostObject> Drop for Bound<T> {
    fn drop(&mut self) {
        // SAFETY: Bound holds a reference, so the instance is live
        unsafe {
            unbind(self.handle);
            oxrt::object_release(self.handle.id());
        }
        // SAFETY: `host` came from Box::leak in `new`
        drop(unsafe { Box::from_raw(self.host.as_ptr()) });
    }
}

impl<T: HostObject + fmt::Debug> fmt::Debug for Bound<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bound")
            .field("handle", &self.handle)
            .field("host", &**self)
            .finish()
    }
}
