//! # oxbridge
//!
//! Lets Rust functions act as methods of native classes created at run time
//! in the `OxideC` object runtime ([`oxrt`]).
//!
//! A [`Bridge`] defines a class under a native superclass, installs host
//! functions for selectors and binds native instances to host structs. Every
//! installed method points at one shared [`trampoline`], which uses the
//! receiver's class name, the selector and the instance's association to
//! find the host function and the struct it runs on.
//!
//! ## Example
//!
//! ```rust
//! use oxbridge::{Bridge, ClassDescriptor, Handle, HostObject, Object, Selector, get_class};
//! use oxrt::Value;
//!
//! #[derive(Default)]
//! struct Widget {
//!     object: Handle,
//!     calls: Vec<i32>,
//! }
//!
//! impl Object for Widget {
//!     fn handle(&self) -> Handle {
//!         self.object
//!     }
//! }
//!
//! impl HostObject for Widget {
//!     fn set_object(&mut self, handle: Handle) {
//!         self.object = handle;
//!     }
//! }
//!
//! let bridge = Bridge::new();
//! let class = bridge.new_class(get_class("OxObject"), "DocWidget", ClassDescriptor::<Widget>::new());
//! bridge.add_method(&class, "doThing:", |w: &mut Widget, x: i32| {
//!     w.calls.push(x);
//!     x * 10
//! });
//! bridge.register_class(&class);
//!
//! let widget = bridge.bind(&class, Widget::default());
//! let handle = widget.handle();
//! let result = unsafe { handle.send_message(Selector::register("doThing:"), &[Value::Int(5)]) };
//! assert_eq!(result, Ok(Value::Int(50)));
//! assert_eq!(widget.calls, [5]);
//! ```
//!
//! ## Faults
//!
//! Misuse that cannot be reported through a message send (an unregistered
//! selector reaching the trampoline, a receiver with no bound struct) is a
//! [`BridgeFault`]. Faults abort by default; see [`BridgeConfig`] and
//! [`FaultAction`].

pub mod bridge;
pub mod builder;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod fault;
pub mod handle;
pub mod instance;
pub mod method;
pub mod registry;
pub mod signature;
pub mod trampoline;

pub use bridge::Bridge;
pub use builder::ClassBuilder;
pub use config::BridgeConfig;
pub use descriptor::{ClassDescriptor, OutletEntry};
pub use error::{Error, Result};
pub use fault::{BridgeFault, FaultAction, fault_action, set_fault_action};
pub use handle::{Class, Handle, HostObject, Object, Selector, get_class};
pub use instance::{Bound, HostBinding};
pub use method::{HostMethod, MethodEntry};
pub use registry::{BuildState, ClassInfo, ClassRegistry};
pub use signature::{MethodSignature, NativeType, Shape};
pub use trampoline::{SET_VALUE_FOR_KEY, SET_VALUE_FOR_KEY_ENCODING, trampoline};
