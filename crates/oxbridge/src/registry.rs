//! Class registry: what the bridge knows about each class it defined.
//!
//! The registry maps class names to [`ClassInfo`]: the host struct type the
//! class binds, the host method for each selector and the declared outlets.
//! The trampoline consults it on every dispatch.
//!
//! Definition is expected to complete before instances of a class receive
//! messages. The lock only keeps the map itself consistent; entries are
//! `Arc`s cloned out under the read lock, so host methods may call back into
//! the bridge.

use crate::descriptor::{ClassDescriptor, OutletEntry};
use crate::error::{Error, Result};
use crate::handle::Selector;
use crate::method::MethodEntry;
use fxhash::FxHashMap;
use oxidex_log::{debug, warn};
use std::any::{TypeId, type_name};
use std::sync::{Arc, PoisonError, RwLock};

/// Where a class is in its definition lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildState {
    /// Class pair allocated; methods may be added.
    Allocated,
    /// Outlet accessor installed.
    OutletsWired,
    /// Registered with the runtime and instantiable.
    Registered,
}

/// Everything the bridge records for one class.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    host_type: TypeId,
    host_type_name: &'static str,
    methods: FxHashMap<Selector, Arc<MethodEntry>>,
    outlets: FxHashMap<String, Arc<OutletEntry>>,
    state: BuildState,
}

impl ClassInfo {
    /// Host struct type instances of the class bind.
    #[must_use]
    pub fn host_type(&self) -> TypeId {
        self.host_type
    }

    /// Name of [`ClassInfo::host_type`].
    #[must_use]
    pub fn host_type_name(&self) -> &'static str {
        self.host_type_name
    }

    /// Host method registered for `selector`.
    #[must_use]
    pub fn method(&self, selector: Selector) -> Option<Arc<MethodEntry>> {
        self.methods.get(&selector).cloned()
    }

    /// Declared outlet named `key`.
    #[must_use]
    pub fn outlet(&self, key: &str) -> Option<Arc<OutletEntry>> {
        self.outlets.get(key).cloned()
    }

    /// Whether the class declares outlets.
    #[must_use]
    pub fn has_outlets(&self) -> bool {
        !self.outlets.is_empty()
    }

    /// Number of registered host methods.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> BuildState {
        self.state
    }
}

/// Table of bridge-defined classes, keyed by class name.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: RwLock<FxHashMap<String, ClassInfo>>,
}

impl ClassRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a class definition and returns a snapshot of it.
    ///
    /// Redefining a name replaces the previous entry, methods included: the
    /// last definition wins.
    pub fn define<T: 'static>(&self, name: &str, descriptor: ClassDescriptor<T>) -> ClassInfo {
        let outlets = descriptor
            .into_outlets()
            .into_iter()
            .map(|outlet| (outlet.key().to_string(), Arc::new(outlet)))
            .collect();

        let info = ClassInfo {
            host_type: TypeId::of::<T>(),
            host_type_name: type_name::<T>(),
            methods: FxHashMap::default(),
            outlets,
            state: BuildState::Allocated,
        };

        let previous = self
            .classes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), info.clone());
        if previous.is_some() {
            warn!("class '{}' redefined; previous methods are discarded", name);
        }
        debug!("defined class '{}' bound to {}", name, type_name::<T>());

        info
    }

    /// Adds or replaces the method for `entry.selector()` on class `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotDefined`] if `name` was never defined, and
    /// [`Error::HostTypeMismatch`] if `entry` runs on a different host
    /// struct than the class binds.
    pub fn add_method(&self, name: &str, entry: MethodEntry) -> Result<()> {
        let mut classes = self
            .classes
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let info = classes.get_mut(name).ok_or_else(|| Error::ClassNotDefined {
            name: name.to_string(),
        })?;
        if entry.host_type() != info.host_type {
            return Err(Error::HostTypeMismatch {
                class: name.to_string(),
                expected: info.host_type_name,
                got: entry.host_type_name(),
            });
        }

        let selector = entry.selector();
        if info.methods.insert(selector, Arc::new(entry)).is_some() {
            debug!("replaced -[{} {}]", name, selector);
        }
        Ok(())
    }

    /// Host method for `selector` on class `name`.
    #[must_use]
    pub fn lookup_method(&self, name: &str, selector: Selector) -> Option<Arc<MethodEntry>> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .and_then(|info| info.method(selector))
    }

    /// Declared outlet `key` on class `name`.
    #[must_use]
    pub fn lookup_outlet(&self, name: &str, key: &str) -> Option<Arc<OutletEntry>> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .and_then(|info| info.outlet(key))
    }

    /// Whether class `name` declares outlets.
    #[must_use]
    pub fn has_outlets(&self, name: &str) -> bool {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .is_some_and(ClassInfo::has_outlets)
    }

    /// Snapshot of class `name`.
    #[must_use]
    pub fn class_info(&self, name: &str) -> Option<ClassInfo> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Whether class `name` is defined.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Selectors with host methods on class `name` (empty if undefined).
    #[must_use]
    pub fn selectors(&self, name: &str) -> Vec<Selector> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|info| info.methods.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Host type name bound by class `name`.
    #[must_use]
    pub fn host_type_name(&self, name: &str) -> Option<&'static str> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(ClassInfo::host_type_name)
    }

    /// Names of every defined class.
    #[must_use]
    pub fn class_names(&self) -> Vec<String> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Number of defined classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no class is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lifecycle state of class `name`.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<BuildState> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(ClassInfo::state)
    }

    /// Advances class `name` to `state`. States never move backwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotDefined`] if `name` was never defined.
    pub fn advance(&self, name: &str, state: BuildState) -> Result<()> {
        let mut classes = self
            .classes
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let info = classes.get_mut(name).ok_or_else(|| Error::ClassNotDefined {
            name: name.to_string(),
        })?;
        info.state = info.state.max(state);
        Ok(())
    }

    /// Marks class `name` as registered with the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotDefined`] if `name` was never defined.
    pub fn mark_registered(&self, name: &str) -> Result<()> {
        self.advance(name, BuildState::Registered)
    }
}
