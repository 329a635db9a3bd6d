//! Host struct descriptors.
//!
//! A [`ClassDescriptor`] states, at compile time, which fields of the host
//! struct are outlets: fields the runtime may set through the
//! `setValue:forKey:` protocol. Each outlet is a key plus a setter closure;
//! the setter's value type fixes the outlet's shape, which must be an object
//! shape for the class definition to succeed.
//!
//! ```rust
//! use oxbridge::{ClassDescriptor, Handle};
//!
//! struct Window {
//!     object: Handle,
//!     button: Handle,
//! }
//!
//! let descriptor = ClassDescriptor::<Window>::new()
//!     .outlet("button", |window: &mut Window, button: Handle| window.button = button);
//! assert!(descriptor.has_outlets());
//! ```

use crate::error::{Error, Result};
use crate::signature::{NativeType, Shape};
use oxrt::Value;
use std::any::{TypeId, type_name};
use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;

type ErasedSetter = Box<dyn Fn(*mut c_void, Value) -> Result<()> + Send + Sync>;

/// A declared outlet: key, shape and type-erased setter.
pub struct OutletEntry {
    key: String,
    shape: Shape,
    host_type: TypeId,
    host_type_name: &'static str,
    setter: ErasedSetter,
}

impl OutletEntry {
    /// Outlet key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Declared shape of the outlet's value.
    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Host struct the setter writes into.
    #[must_use]
    pub fn host_type(&self) -> TypeId {
        self.host_type
    }

    /// Name of [`OutletEntry::host_type`], for diagnostics.
    #[must_use]
    pub fn host_type_name(&self) -> &'static str {
        self.host_type_name
    }

    /// Converts `value` and stores it into the host struct at `host`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueShapeMismatch`] if `value` does not convert to
    /// the outlet's type.
    ///
    /// # Safety
    ///
    /// `host` must point to a live value of the descriptor's host type, not
    /// aliased for the duration of the call.
    pub unsafe fn set(&self, host: *mut c_void, value: Value) -> Result<()> {
        (self.setter)(host, value)
    }
}

impl fmt::Debug for OutletEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutletEntry")
            .field("key", &self.key)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

/// Compile-time description of the host struct `T` behind a class.
pub struct ClassDescriptor<T> {
    outlets: Vec<OutletEntry>,
    _host: PhantomData<fn(&mut T)>,
}

impl<T: 'static> ClassDescriptor<T> {
    /// A descriptor with no outlets.
    #[must_use]
    pub fn new() -> Self {
        ClassDescriptor {
            outlets: Vec::new(),
            _host: PhantomData,
        }
    }

    /// Declares an outlet named `key`, stored by `setter`.
    ///
    /// Declaring the same key twice keeps the later setter.
    #[must_use]
    pub fn outlet<V, F>(mut self, key: &str, setter: F) -> Self
    where
        V: NativeType,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let erased: ErasedSetter = Box::new(move |host, value| {
            let value = V::from_value(value).ok_or_else(|| Error::ValueShapeMismatch {
                index: 0,
                expected: V::SHAPE,
                got: Some(value.type_code().as_char()),
            })?;
            // SAFETY: `OutletEntry::set` is only called with a pointer to a
            // live `T`
            setter(unsafe { &mut *host.cast::<T>() }, value);
            Ok(())
        });

        self.outlets.retain(|outlet| outlet.key != key);
        self.outlets.push(OutletEntry {
            key: key.to_string(),
            shape: V::SHAPE,
            host_type: TypeId::of::<T>(),
            host_type_name: type_name::<T>(),
            setter: erased,
        });
        self
    }

    /// Whether any outlet is declared.
    #[must_use]
    pub fn has_outlets(&self) -> bool {
        !self.outlets.is_empty()
    }

    /// Declared outlet keys, in declaration order.
    pub fn outlet_keys(&self) -> impl Iterator<Item = &str> {
        self.outlets.iter().map(|outlet| outlet.key.as_str())
    }

    /// Name of the host type, for diagnostics.
    #[must_use]
    pub fn host_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    /// Returns the first outlet whose shape is not an object shape.
    pub(crate) fn first_non_object_outlet(&self) -> Option<&OutletEntry> {
        self.outlets.iter().find(|outlet| !outlet.shape.is_object())
    }

    pub(crate) fn into_outlets(self) -> Vec<OutletEntry> {
        self.outlets
    }
}

impl<T: 'static> Default for ClassDescriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ClassDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("host", &type_name::<T>())
            .field("outlets", &self.outlets)
            .finish()
    }
}
