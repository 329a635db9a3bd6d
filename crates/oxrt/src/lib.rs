//! # `OxideC` native runtime
//!
//! A small message-based object runtime in the Objective-C tradition:
//!
//! - **Classes** are created at run time in two phases
//!   ([`allocate_class_pair`], then [`register_class_pair`]) and are
//!   themselves objects.
//! - **Selectors** ([`Sel`]) are interned method names compared by pointer.
//! - **Methods** are [`Imp`] function pointers with a uniform calling
//!   convention, described by a type encoding string such as `"i@:i"`.
//! - **Message send** ([`msg_send`]) resolves a selector along the
//!   superclass chain and calls the implementation.
//! - **Associated objects** attach opaque pointers to an instance under
//!   caller-chosen keys.
//!
//! Every class descends from the root class `OxObject`, which provides
//! `alloc`, `new`, `init`, `class`, `retain`, `release`, `retainCount`,
//! `respondsToSelector:` and `isKindOfClass:`.
//!
//! ## Example
//!
//! ```rust
//! use oxrt::{Sel, Value, allocate_class_pair, msg_send, register_class_pair, root_class};
//!
//! let class = allocate_class_pair(Some(root_class()), "DocExample").unwrap();
//! register_class_pair(class).unwrap();
//!
//! unsafe {
//!     let obj = msg_send(class.as_id(), Sel::register("new"), &[])
//!         .unwrap()
//!         .as_object()
//!         .unwrap();
//!     let count = msg_send(obj, Sel::register("retainCount"), &[]).unwrap();
//!     assert_eq!(count, Value::ULongLong(1));
//!     msg_send(obj, Sel::register("release"), &[]).unwrap();
//! }
//! ```

pub mod class;
pub mod dispatch;
pub mod encoding;
pub mod error;
pub mod message;
pub mod object;
mod root;
pub mod selector;
pub mod value;

pub use class::{
    ClassRef, Imp, Method, ROOT_CLASS_NAME, allocate_class_pair, class_add_class_method,
    class_add_method, class_get_name, class_list, class_replace_method, get_class,
    method_type_encoding, register_class_pair, root_class,
};
pub use dispatch::{msg_send, responds_to_selector};
pub use encoding::TypeCode;
pub use error::{Error, Result};
pub use message::ArgFrame;
pub use object::{
    AssociationKey, Id, class_create_instance, get_associated_object, object_get_class,
    object_is_class, object_release, object_retain, object_retain_count,
    remove_associated_objects, set_associated_object,
};
pub use selector::{Sel, sel_get_name, sel_register_name};
pub use value::{Slot, Value};
