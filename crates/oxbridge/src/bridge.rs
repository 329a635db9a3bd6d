//! The bridge facade: class definition, method installation and binding.

use crate::builder::ClassBuilder;
use crate::config::BridgeConfig;
use crate::descriptor::ClassDescriptor;
use crate::fault::{self, BridgeFault};
use crate::handle::{Class, Handle, HostObject, Selector};
use crate::instance::{self, Bound};
use crate::method::{HostMethod, MethodEntry};
use crate::error::Error;
use crate::registry::{BuildState, ClassRegistry};
use crate::trampoline::{self, SET_VALUE_FOR_KEY, SET_VALUE_FOR_KEY_ENCODING};
use oxidex_log::{debug, info, warn};
use oxrt::ClassRef;
use std::any::{TypeId, type_name};
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::Arc;

/// Defines native classes backed by host structs and binds instances.
///
/// Each bridge owns a [`ClassRegistry`]. Classes it defines carry a
/// reference to that registry, so they keep dispatching after the `Bridge`
/// value itself is dropped.
///
/// Every failure here is a [`BridgeFault`]: a programming error reported
/// according to the configured [`FaultAction`](crate::FaultAction).
#[derive(Debug)]
pub struct Bridge {
    registry: Arc<ClassRegistry>,
    config: BridgeConfig,
}

impl Bridge {
    /// A bridge with a fresh registry. Process-wide settings are untouched.
    #[must_use]
    pub fn new() -> Self {
        Bridge {
            registry: Arc::new(ClassRegistry::new()),
            config: BridgeConfig::default(),
        }
    }

    /// A bridge with a fresh registry, applying `config` process-wide.
    #[must_use]
    pub fn with_config(config: BridgeConfig) -> Self {
        config.apply();
        Bridge {
            registry: Arc::new(ClassRegistry::new()),
            config,
        }
    }

    /// The configuration this bridge was created with.
    #[must_use]
    pub fn config(&self) -> BridgeConfig {
        self.config
    }

    /// The class registry.
    #[must_use]
    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Allocates class `name` under `superclass`, bound to host struct `T`.
    ///
    /// If `descriptor` declares outlets, each must have an object shape, and
    /// the `setValue:forKey:` accessor is installed to route them. The class
    /// still has to be registered with [`Bridge::register_class`] before
    /// instances can be created.
    ///
    /// Faults on a nil superclass, on allocation failure (duplicate name,
    /// unregistered superclass) and on a non-object outlet.
    pub fn new_class<T: 'static>(
        &self,
        superclass: Class,
        name: &str,
        descriptor: ClassDescriptor<T>,
    ) -> Class {
        let Some(superclass) = superclass.class_ref() else {
            fault::raise(BridgeFault::InvalidSuperclass {
                class: name.to_string(),
            })
        };

        let class = match oxrt::allocate_class_pair(Some(superclass), name) {
            Ok(class) => class,
            Err(source) => fault::raise(BridgeFault::ClassAllocationFailed {
                class: name.to_string(),
                source,
            }),
        };
        trampoline::attach_registry(class, &self.registry);

        if let Some(outlet) = descriptor.first_non_object_outlet() {
            fault::raise(BridgeFault::OutletNotObject {
                class: name.to_string(),
                key: outlet.key().to_string(),
                shape: outlet.shape(),
            });
        }

        let has_outlets = descriptor.has_outlets();
        self.registry.define(name, descriptor);

        if has_outlets {
            self.install(class, Selector::register(SET_VALUE_FOR_KEY), SET_VALUE_FOR_KEY_ENCODING);
            self.advance(name, BuildState::OutletsWired);
        }

        info!(
            "defined class {} : {} bound to {}",
            name,
            superclass.name(),
            type_name::<T>()
        );
        Class::from_class_ref(class)
    }

    /// Starts a fluent definition of class `name`.
    #[must_use]
    pub fn build_class<T: 'static>(&self, superclass: Class, name: &str) -> ClassBuilder<'_, T> {
        ClassBuilder::new(self, superclass, name)
    }

    /// Installs `f` as the method for `selector` on `class`.
    ///
    /// `f` takes the bound host struct first, then the declared parameters.
    /// Adding a selector again replaces the previous method. `f` must not
    /// send messages to its own receiver: the struct is already mutably
    /// borrowed for the call.
    ///
    /// Faults if `class` was not defined by this bridge, if `f` expects a
    /// different host struct than the class binds, or if its signature has
    /// no native encoding.
    pub fn add_method<T, Args, F>(&self, class: &Class, selector: &str, f: F)
    where
        T: 'static,
        F: HostMethod<T, Args>,
    {
        let (class_ref, name) = self.defined(class);

        let Some(info) = self.registry.class_info(name) else {
            fault::raise(BridgeFault::UnregisteredClass {
                class: name.to_string(),
            })
        };
        if info.host_type() != TypeId::of::<T>() {
            fault::raise(BridgeFault::HostTypeMismatch {
                class: name.to_string(),
                selector: Some(selector.to_string()),
                expected: info.host_type_name(),
                got: type_name::<T>(),
            });
        }

        let sel = Selector::register(selector);
        let entry = match MethodEntry::new(sel, f) {
            Ok(entry) => entry,
            Err(error) => fault::raise(BridgeFault::UnsupportedShape {
                class: name.to_string(),
                selector: selector.to_string(),
                error,
            }),
        };
        if sel.sel().arity() != entry.signature().arity() {
            warn!(
                "-[{} {}] declares {} parameter(s) for a selector with {} colon(s)",
                name,
                selector,
                entry.signature().arity(),
                sel.sel().arity()
            );
        }

        self.install(class_ref, sel, entry.encoding());
        debug!("added -[{} {}] as {}", name, selector, entry.encoding());

        match self.registry.add_method(name, entry) {
            Ok(()) => {}
            Err(Error::HostTypeMismatch { expected, got, .. }) => {
                fault::raise(BridgeFault::HostTypeMismatch {
                    class: name.to_string(),
                    selector: Some(selector.to_string()),
                    expected,
                    got,
                })
            }
            Err(_) => fault::raise(BridgeFault::UnregisteredClass {
                class: name.to_string(),
            }),
        }
    }

    /// Registers `class` with the runtime, making it instantiable.
    ///
    /// Faults if the class is nil or already registered.
    pub fn register_class(&self, class: &Class) {
        let Some(class_ref) = class.class_ref() else {
            fault::raise(BridgeFault::UnregisteredClass {
                class: "nil".to_string(),
            })
        };
        let name = class_ref.name();

        if let Err(source) = oxrt::register_class_pair(class_ref) {
            fault::raise(BridgeFault::RegistrationFailed {
                class: name.to_string(),
                source,
            });
        }
        if self.registry.contains(name) {
            self.advance(name, BuildState::Registered);
        }
        info!("registered class {}", name);
    }

    /// Creates an instance of `class_name` bound to the host struct at
    /// `host`, stores the instance's handle in it and returns the handle.
    ///
    /// The caller owns the returned native reference and should
    /// [`Bridge::unbind`] the instance before releasing it for the last time.
    /// Faults if the class does not exist, was not defined by a bridge, binds
    /// a different host type, or `alloc`/`init` fail.
    ///
    /// # Safety
    ///
    /// `host` must point to a live `T` that stays at the same address, and
    /// is not otherwise borrowed while the instance receives messages, until
    /// the instance is released or [`Bridge::unbind`] is called.
    pub unsafe fn new_instance<T: HostObject>(&self, class_name: &str, host: NonNull<T>) -> Handle {
        // Unknown names fault in `bind_instance`
        if let Some(class) = oxrt::get_class(class_name) {
            check_host_type::<T>(class);
        }
        // SAFETY: forwarded to caller
        unsafe { instance::bind_instance(class_name, host) }
    }

    /// Boxes `value` and binds it to a new instance of `class`.
    ///
    /// The safe counterpart of [`Bridge::new_instance`]; see [`Bound`].
    pub fn bind<T: HostObject>(&self, class: &Class, value: T) -> Bound<T> {
        let Some(class) = class.class_ref() else {
            fault::raise(BridgeFault::UnregisteredClass {
                class: "nil".to_string(),
            })
        };
        check_host_type::<T>(class);
        Bound::new(class.name(), value)
    }

    /// Host struct address bound to `handle`, if any.
    ///
    /// # Safety
    ///
    /// `handle` must refer to a live native object.
    #[must_use]
    pub unsafe fn association(&self, handle: Handle) -> Option<NonNull<c_void>> {
        // SAFETY: forwarded to caller
        unsafe { instance::association(handle) }
    }

    /// Removes the binding of `handle`; later dispatch to it faults.
    ///
    /// # Safety
    ///
    /// `handle` must refer to a live native object.
    pub unsafe fn unbind(&self, handle: Handle) {
        // SAFETY: forwarded to caller
        unsafe { instance::unbind(handle) }
    }

    fn defined(&self, class: &Class) -> (ClassRef, &'static str) {
        match class.class_ref() {
            Some(class_ref) if self.registry.contains(class_ref.name()) => {
                (class_ref, class_ref.name())
            }
            Some(class_ref) => fault::raise(BridgeFault::UnregisteredClass {
                class: class_ref.name().to_string(),
            }),
            None => fault::raise(BridgeFault::UnregisteredClass {
                class: "nil".to_string(),
            }),
        }
    }

    fn install(&self, class: ClassRef, selector: Selector, encoding: &str) {
        let imp: oxrt::Imp = trampoline::trampoline;
        if let Err(err) = oxrt::class_replace_method(class, selector.sel(), imp, encoding) {
            fault::raise(BridgeFault::UnsupportedShape {
                class: class.name().to_string(),
                selector: selector.name().to_string(),
                error: err.into(),
            });
        }
    }

    fn advance(&self, name: &str, state: BuildState) {
        if self.registry.advance(name, state).is_err() {
            fault::raise(BridgeFault::UnregisteredClass {
                class: name.to_string(),
            });
        }
    }
}

/// Faults unless `class` was defined by a bridge for host struct `T`.
///
/// The registry consulted is the one attached to the class, which need not
/// belong to the bridge doing the binding.
fn check_host_type<T: 'static>(class: ClassRef) {
    let name = class.name();
    let Some(info) = trampoline::registry_for(class).and_then(|registry| registry.class_info(name))
    else {
        fault::raise(BridgeFault::UnregisteredClass {
            class: name.to_string(),
        })
    };
    if info.host_type() != TypeId::of::<T>() {
        fault::raise(BridgeFault::HostTypeMismatch {
            class: name.to_string(),
            selector: None,
            expected: info.host_type_name(),
            got: type_name::<T>(),
        });
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}
