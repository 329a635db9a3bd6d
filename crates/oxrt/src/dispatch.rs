//! Generic message send.
//!
//! [`msg_send`] resolves the method for a selector on the receiver's class
//! (or, for a class receiver, among class methods), checks the caller's
//! arguments against the method's type encoding, packs them into an
//! [`ArgFrame`] and calls the implementation.

use crate::class::{ClassRef, Method};
use crate::encoding::parse_signature;
use crate::error::{Error, Result};
use crate::message::ArgFrame;
use crate::object::Id;
use crate::selector::Sel;
use crate::value::{Slot, Value};
use oxidex_log::trace;

/// Resolves the method `sel` names for `receiver`.
///
/// # Safety
///
/// `receiver` must be non-nil and point to a live object.
unsafe fn resolve(receiver: Id, sel: Sel) -> Result<(ClassRef, Method)> {
    // SAFETY: non-nil and live per caller
    let header = unsafe { receiver.header() };
    let (class, method) = match header.isa {
        Some(class) => (class, class.lookup_method(sel)),
        None => {
            // SAFETY: a header without isa is the first field of a class
            let class = unsafe { ClassRef::from_id(receiver) }.ok_or_else(|| {
                Error::NilReceiver {
                    selector: sel.name().to_string(),
                }
            })?;
            (class, class.lookup_class_method(sel))
        }
    };

    method.map(|method| (class, method)).ok_or_else(|| Error::SelectorNotFound {
        class: class.name().to_string(),
        selector: sel.name().to_string(),
    })
}

/// Sends `sel` to `receiver` with `args` and returns the method's result.
///
/// `args` lists the declared parameters only; the receiver and selector are
/// passed implicitly. Each argument must fit the declared type exactly
/// (a class also fits an object parameter).
///
/// # Errors
///
/// - [`Error::NilReceiver`] if `receiver` is nil
/// - [`Error::SelectorNotFound`] if no method is found in the class chain
/// - [`Error::ArgumentCountMismatch`] / [`Error::ArgumentTypeMismatch`] if
///   `args` do not match the method's encoding
///
/// Panics raised inside the implementation propagate to the caller.
///
/// # Safety
///
/// `receiver` must be nil or point to a live object, and every object or
/// pointer carried in `args` must be valid for the called method.
pub unsafe fn msg_send(receiver: Id, sel: Sel, args: &[Value]) -> Result<Value> {
    if receiver.is_nil() {
        return Err(Error::NilReceiver {
            selector: sel.name().to_string(),
        });
    }

    // SAFETY: non-nil and live per caller
    let (class, method) = unsafe { resolve(receiver, sel) }?;
    let (return_type, arg_types) = parse_signature(&method.types)?;

    let declared = &arg_types[2..];
    if declared.len() != args.len() {
        return Err(Error::ArgumentCountMismatch {
            expected: declared.len(),
            got: args.len(),
        });
    }
    for (index, (value, code)) in args.iter().zip(declared).enumerate() {
        if !value.fits(*code) {
            return Err(Error::ArgumentTypeMismatch {
                expected: code.as_char(),
                got: value.type_code().as_char(),
                index,
            });
        }
    }

    trace!("[{} {}] with {} argument(s)", class.name(), sel, args.len());

    let frame = ArgFrame::new(args);
    let mut ret: Slot = [0; 2];
    let ret_ptr = ret.as_mut_ptr().cast::<u8>();

    // SAFETY: the frame matches the method's encoding and `ret` is a full
    // slot; the receiver is live per caller
    unsafe {
        (method.imp)(receiver, sel, frame.as_ptr(), ret_ptr);
        Ok(Value::read_from(return_type, ret_ptr))
    }
}

/// Returns `true` if `receiver` has a method for `sel`, without sending it.
///
/// # Safety
///
/// `receiver` must be nil or point to a live object.
#[must_use]
pub unsafe fn responds_to_selector(receiver: Id, sel: Sel) -> bool {
    // SAFETY: non-nil and live per caller
    !receiver.is_nil() && unsafe { resolve(receiver, sel) }.is_ok()
}
