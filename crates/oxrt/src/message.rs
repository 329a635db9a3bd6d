//! Argument frames for the method calling convention.
//!
//! Every [`Imp`](crate::Imp) receives its declared arguments as a pointer to
//! an array of argument pointers, one per declared parameter, each pointing
//! at a [`Slot`] holding the value. [`ArgFrame`] owns that storage for the
//! duration of one call.
//!
//! # Example
//!
//! ```rust
//! use oxrt::{ArgFrame, TypeCode, Value};
//!
//! let frame = ArgFrame::new(&[Value::Int(5), Value::Double(0.5)]);
//! assert_eq!(frame.len(), 2);
//!
//! let second = unsafe { Value::read_from(TypeCode::Double, *frame.as_ptr().add(1)) };
//! assert_eq!(second, Value::Double(0.5));
//! ```

use crate::value::{Slot, Value};

/// Owned argument storage plus the pointer array handed to an `Imp`.
pub struct ArgFrame {
    // Never resized after construction; `pointers` point into its buffer.
    slots: Box<[Slot]>,
    pointers: Box<[*mut u8]>,
}

impl ArgFrame {
    /// Packs `args` into slots, in order.
    #[must_use]
    pub fn new(args: &[Value]) -> Self {
        let mut slots: Box<[Slot]> = vec![[0u64; 2]; args.len()].into_boxed_slice();

        for (slot, value) in slots.iter_mut().zip(args) {
            // SAFETY: a slot is 16 bytes, enough for any encodable value
            unsafe { value.write_to(slot.as_mut_ptr().cast()) };
        }

        let pointers = slots
            .iter_mut()
            .map(|slot| slot.as_mut_ptr().cast::<u8>())
            .collect();

        ArgFrame { slots, pointers }
    }

    /// Number of arguments in the frame.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` when the frame holds no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Pointer to the argument pointer array, valid while `self` lives.
    #[must_use]
    pub fn as_ptr(&self) -> *const *mut u8 {
        self.pointers.as_ptr()
    }
}

impl std::fmt::Debug for ArgFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgFrame").field("len", &self.len()).finish()
    }
}
