//! Handles to native objects, classes and selectors.
//!
//! A [`Handle`] is a plain, non-owning wrapper around a native object
//! address. Equality is identity. [`Class`] and [`Selector`] are thin
//! newtypes so that they carry their own encoding (`#` and `:`) through
//! method signatures.

use crate::error::Result;
use oxrt::{ClassRef, Id, Sel, Value};
use std::ffi::c_void;
use std::fmt;

/// Non-owning reference to a native object.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Handle(Id);

impl Handle {
    /// The nil handle.
    pub const NIL: Handle = Handle(Id::NIL);

    /// Wraps a runtime object reference.
    #[must_use]
    pub const fn from_id(id: Id) -> Self {
        Handle(id)
    }

    /// Wraps an opaque native pointer.
    #[must_use]
    pub const fn from_pointer(ptr: *mut c_void) -> Self {
        Handle(Id::from_ptr(ptr))
    }

    /// Returns the runtime object reference.
    #[must_use]
    pub const fn id(self) -> Id {
        self.0
    }

    /// Returns the opaque native pointer.
    #[must_use]
    pub const fn pointer(self) -> *mut c_void {
        self.0.as_ptr()
    }

    /// Returns `true` for nil.
    #[must_use]
    pub const fn is_nil(self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            write!(f, "Handle(nil)")
        } else {
            write!(f, "Handle({:p})", self.pointer())
        }
    }
}

impl Default for Handle {
    fn default() -> Self {
        Handle::NIL
    }
}

/// Capability of being (or embedding) a native object.
///
/// Host structs bound to native instances implement this by returning the
/// handle the binder stored in them (see [`HostObject`]).
pub trait Object {
    /// The native object.
    fn handle(&self) -> Handle;

    /// Opaque native pointer of [`Object::handle`].
    fn pointer(&self) -> *mut c_void {
        self.handle().pointer()
    }

    /// Sends `selector` through the runtime's generic message send.
    ///
    /// # Errors
    ///
    /// Propagates the runtime's send errors (nil receiver, unrecognized
    /// selector, argument mismatch).
    ///
    /// # Safety
    ///
    /// The handle must be nil or refer to a live native object, and object
    /// arguments must be valid for the called method.
    ///
    /// If the receiver is bound to a host struct, the trampoline takes a
    /// `&mut` to that struct for the duration of the call. No other Rust
    /// reference to it may be live during the send: not one held across it
    /// by the caller, not `&self` when the host struct itself is the
    /// receiver (send through its [`Handle`] instead), and not the one a host
    /// method already holds when it sends to its own receiver.
    unsafe fn send_message(&self, selector: Selector, args: &[Value]) -> Result<Value> {
        // SAFETY: forwarded to caller
        Ok(unsafe { oxrt::msg_send(self.handle().id(), selector.sel(), args) }?)
    }
}

impl Object for Handle {
    fn handle(&self) -> Handle {
        *self
    }
}

/// A host struct that embeds the native object it is bound to.
///
/// The binder allocates the native instance and hands its handle to
/// [`HostObject::set_object`] before installing the association.
///
/// ```rust
/// use oxbridge::{Handle, HostObject, Object};
///
/// #[derive(Default)]
/// struct Counter {
///     object: Handle,
///     count: i32,
/// }
///
/// impl Object for Counter {
///     fn handle(&self) -> Handle {
///         self.object
///     }
/// }
///
/// impl HostObject for Counter {
///     fn set_object(&mut self, handle: Handle) {
///         self.object = handle;
///     }
/// }
/// ```
pub trait HostObject: Object + 'static {
    /// Stores the native instance bound to this struct.
    fn set_object(&mut self, handle: Handle);
}

/// Handle to a native class.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Class(Handle);

impl Class {
    /// The nil class.
    pub const NIL: Class = Class(Handle::NIL);

    /// Wraps a runtime class.
    #[must_use]
    pub fn from_class_ref(class: ClassRef) -> Self {
        Class(Handle::from_id(class.as_id()))
    }

    /// Returns the runtime class, or `None` for nil.
    #[must_use]
    pub fn class_ref(self) -> Option<ClassRef> {
        // SAFETY: a non-nil Class is only built from a ClassRef, and classes
        // are never freed
        unsafe { ClassRef::from_id(self.0.id()) }
    }

    /// Returns the class name, or `None` for nil.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        self.class_ref().map(oxrt::class_get_name)
    }

    /// Returns `true` for nil.
    #[must_use]
    pub const fn is_nil(self) -> bool {
        self.0.is_nil()
    }
}

impl Object for Class {
    fn handle(&self) -> Handle {
        self.0
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.debug_tuple("Class").field(&name).finish(),
            None => write!(f, "Class(nil)"),
        }
    }
}

/// An interned selector.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Selector(Sel);

impl Selector {
    /// Interns `name` in the native runtime.
    #[must_use]
    pub fn register(name: &str) -> Self {
        Selector(oxrt::sel_register_name(name))
    }

    /// Wraps a runtime selector.
    #[must_use]
    pub const fn from_sel(sel: Sel) -> Self {
        Selector(sel)
    }

    /// Returns the runtime selector.
    #[must_use]
    pub const fn sel(self) -> Sel {
        self.0
    }

    /// Returns the selector name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.0.name()
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selector").field(&self.name()).finish()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Looks up a registered native class by name; nil when absent.
#[must_use]
pub fn get_class(name: &str) -> Class {
    oxrt::get_class(name).map_or(Class::NIL, Class::from_class_ref)
}

/// Returns the class of `handle` without sending a message.
///
/// The trampoline resolves classes through this rather than a `class`
/// message, which would dispatch back into the runtime.
///
/// # Safety
///
/// `handle` must be nil or refer to a live native object.
pub(crate) unsafe fn class_of(handle: Handle) -> Option<ClassRef> {
    // SAFETY: forwarded to caller
    unsafe { oxrt::object_get_class(handle.id()) }
}
