//! The dispatch trampoline.
//!
//! Every method the bridge installs, and the outlet accessor, point at the
//! single function [`trampoline`]. It finds the host callable from data
//! alone: the receiver's class name, the selector and the registry attached
//! to the class.
//!
//! The runtime calls an `Imp` with nothing but the receiver, selector and
//! argument slots, so the registry travels as an associated object on the
//! class object. [`attach_registry`] leaks one `Arc` reference per class;
//! classes are never destroyed, so neither is the reference.

use crate::fault::{self, BridgeFault};
use crate::handle::{Handle, Selector, class_of};
use crate::instance::binding;
use crate::registry::ClassRegistry;
use oxidex_log::trace;
use oxrt::{ClassRef, Id, Sel, TypeCode, Value};
use std::any::TypeId;
use std::ffi::{CStr, c_void};
use std::ptr::{self, NonNull};
use std::sync::Arc;

/// Selector of the outlet accessor.
pub const SET_VALUE_FOR_KEY: &str = "setValue:forKey:";

/// Encoding of the outlet accessor: value object, key as C string.
pub const SET_VALUE_FOR_KEY_ENCODING: &str = "v@:@*";

static REGISTRY_KEY: u8 = 0;

fn registry_key() -> oxrt::AssociationKey {
    ptr::from_ref(&REGISTRY_KEY).cast()
}

/// Attaches `registry` to `class` for the trampoline to find.
pub(crate) fn attach_registry(class: ClassRef, registry: &Arc<ClassRegistry>) {
    let raw = Arc::into_raw(Arc::clone(registry)).cast_mut().cast::<c_void>();
    // SAFETY: classes are immortal objects
    unsafe { oxrt::set_associated_object(class.as_id(), registry_key(), raw) };
}

/// Registry attached to `class` or its nearest ancestor.
pub(crate) fn registry_for(class: ClassRef) -> Option<&'static ClassRegistry> {
    class.ancestry().find_map(|class| {
        // SAFETY: classes are immortal objects
        let raw = unsafe { oxrt::get_associated_object(class.as_id(), registry_key()) };
        // SAFETY: only `attach_registry` stores under this key, and the
        // reference it leaks is never released
        NonNull::new(raw.cast::<ClassRegistry>()).map(|registry| unsafe { &*registry.as_ptr() })
    })
}

/// Entry point installed for every bridged selector.
///
/// Faults (see [`BridgeFault`]) if the receiver's class is unknown to the
/// bridge, if no host method exists for `cmd`, if the receiver is not bound
/// to a host struct of the type the method expects, or if its arguments do
/// not convert.
///
/// # Safety
///
/// Must only be called by the runtime's message send, with `args` and `ret`
/// laid out for the encoding the method was installed with.
pub unsafe extern "C-unwind" fn trampoline(
    this: Id,
    cmd: Sel,
    args: *const *mut u8,
    ret: *mut u8,
) {
    let receiver = Handle::from_id(this);
    let selector = Selector::from_sel(cmd);

    // SAFETY: the runtime only dispatches to live objects
    let Some(class) = (unsafe { class_of(receiver) }) else {
        fault::raise(BridgeFault::UnregisteredClass {
            class: format!("<class object {receiver:?}>"),
        })
    };
    let class_name = class.name();

    let Some(registry) = registry_for(class).filter(|registry| registry.contains(class_name))
    else {
        fault::raise(BridgeFault::UnregisteredClass {
            class: class_name.to_string(),
        })
    };

    trace!("dispatch -[{} {}]", class_name, selector);

    match registry.lookup_method(class_name, selector) {
        Some(entry) => {
            let host = host_pointer(
                receiver,
                class_name,
                selector,
                entry.host_type(),
                entry.host_type_name(),
            );

            // SAFETY: the method was installed with this entry's encoding
            let decoded = unsafe { entry.signature().decode_args(args) };
            let result = decoded
                // SAFETY: the association points at a live host struct of the
                // entry's host type
                .and_then(|values| unsafe { entry.invoke(host.as_ptr(), &values) })
                // SAFETY: `ret` is the runtime's return slot
                .and_then(|value| unsafe { entry.signature().encode_return(value, ret) });

            if let Err(error) = result {
                fault::raise(BridgeFault::ArgumentDecode {
                    class: class_name.to_string(),
                    selector: selector.name().to_string(),
                    error,
                });
            }
        }
        None if selector.name() == SET_VALUE_FOR_KEY && registry.has_outlets(class_name) => {
            // SAFETY: installed with SET_VALUE_FOR_KEY_ENCODING
            unsafe { set_outlet(registry, receiver, class_name, selector, args) };
        }
        None => fault::raise(BridgeFault::UnregisteredSelector {
            class: class_name.to_string(),
            selector: selector.name().to_string(),
        }),
    }
}

/// Host struct bound to `receiver`, checked against the `expected` type.
fn host_pointer(
    receiver: Handle,
    class_name: &str,
    selector: Selector,
    expected: TypeId,
    expected_name: &'static str,
) -> NonNull<c_void> {
    // SAFETY: the runtime only dispatches to live objects
    match unsafe { binding(receiver) } {
        Some(bound) if bound.host_type() == expected => bound.host(),
        Some(bound) => fault::raise(BridgeFault::HostTypeMismatch {
            class: class_name.to_string(),
            selector: Some(selector.name().to_string()),
            expected: expected_name,
            got: bound.host_type_name(),
        }),
        None => fault::raise(BridgeFault::MissingAssociation {
            class: class_name.to_string(),
            selector: selector.name().to_string(),
        }),
    }
}

/// `setValue:forKey:` routed to a declared outlet.
///
/// # Safety
///
/// `args` must hold an object and a C string, per
/// [`SET_VALUE_FOR_KEY_ENCODING`].
unsafe fn set_outlet(
    registry: &ClassRegistry,
    receiver: Handle,
    class_name: &str,
    selector: Selector,
    args: *const *mut u8,
) {
    // SAFETY: guaranteed by caller
    let (value, key) = unsafe {
        (
            Value::read_from(TypeCode::Object, *args),
            Value::read_from(TypeCode::CString, *args.add(1)),
        )
    };
    let key = match key {
        // SAFETY: the runtime passes NUL-terminated keys
        Value::CString(raw) if !raw.is_null() => unsafe { CStr::from_ptr(raw) }
            .to_string_lossy()
            .into_owned(),
        _ => String::new(),
    };

    let Some(outlet) = registry.lookup_outlet(class_name, &key) else {
        fault::raise(BridgeFault::UnknownOutlet {
            class: class_name.to_string(),
            key,
        })
    };

    let host = host_pointer(
        receiver,
        class_name,
        selector,
        outlet.host_type(),
        outlet.host_type_name(),
    );
    trace!("outlet '{}' of {:?} set to {:?}", key, receiver, value);

    // SAFETY: the association points at a live host struct of the type the
    // outlet was declared for
    if let Err(error) = unsafe { outlet.set(host.as_ptr(), value) } {
        fault::raise(BridgeFault::ArgumentDecode {
            class: class_name.to_string(),
            selector: selector.name().to_string(),
            error,
        });
    }
}
