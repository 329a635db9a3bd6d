//! Fluent class definition.
//!
//! ```rust
//! use oxbridge::{Bridge, Handle, HostObject, Object, get_class};
//!
//! #[derive(Default)]
//! struct Counter {
//!     object: Handle,
//!     count: i64,
//! }
//!
//! impl Object for Counter {
//!     fn handle(&self) -> Handle {
//!         self.object
//!     }
//! }
//!
//! impl HostObject for Counter {
//!     fn set_object(&mut self, handle: Handle) {
//!         self.object = handle;
//!     }
//! }
//!
//! let bridge = Bridge::new();
//! let class = bridge
//!     .build_class::<Counter>(get_class("OxObject"), "BuilderDocCounter")
//!     .method("increment", |c: &mut Counter| {
//!         c.count += 1;
//!         c.count
//!     })
//!     .register();
//!
//! assert_eq!(class.name(), Some("BuilderDocCounter"));
//! ```

use crate::bridge::Bridge;
use crate::descriptor::ClassDescriptor;
use crate::handle::Class;
use crate::method::HostMethod;
use crate::signature::NativeType;

type Pending<'b> = Box<dyn FnOnce(&Bridge, &Class) + 'b>;

/// Collects outlets and methods, then defines and registers a class.
#[must_use = "a ClassBuilder does nothing until `build` or `register` is called"]
pub struct ClassBuilder<'b, T> {
    bridge: &'b Bridge,
    superclass: Class,
    name: String,
    descriptor: ClassDescriptor<T>,
    methods: Vec<Pending<'b>>,
}

impl<'b, T: 'static> ClassBuilder<'b, T> {
    pub(crate) fn new(bridge: &'b Bridge, superclass: Class, name: &str) -> Self {
        ClassBuilder {
            bridge,
            superclass,
            name: name.to_string(),
            descriptor: ClassDescriptor::new(),
            methods: Vec::new(),
        }
    }

    /// Declares an outlet; see [`ClassDescriptor::outlet`].
    pub fn outlet<V, F>(mut self, key: &str, setter: F) -> Self
    where
        V: NativeType,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.descriptor = self.descriptor.outlet(key, setter);
        self
    }

    /// Queues `f` as the method for `selector`; see [`Bridge::add_method`].
    pub fn method<Args, F>(mut self, selector: &str, f: F) -> Self
    where
        Args: 'b,
        F: HostMethod<T, Args>,
    {
        let selector = selector.to_string();
        self.methods.push(Box::new(move |bridge, class| {
            bridge.add_method::<T, Args, F>(class, &selector, f);
        }));
        self
    }

    /// Defines the class and adds its methods without registering it.
    pub fn build(self) -> Class {
        let class = self
            .bridge
            .new_class(self.superclass, &self.name, self.descriptor);
        for add in self.methods {
            add(self.bridge, &class);
        }
        class
    }

    /// Defines, populates and registers the class.
    pub fn register(self) -> Class {
        let bridge = self.bridge;
        let class = self.build();
        bridge.register_class(&class);
        class
    }
}
