//! Class pairs: allocation, method tables and registration.
//!
//! A class goes through two phases, as in the Objective-C runtime:
//!
//! 1. **Allocated** by [`allocate_class_pair`]: the name is reserved and
//!    methods may be added, but instances cannot be created and
//!    [`get_class`] does not find it.
//! 2. **Registered** by [`register_class_pair`]: the class is instantiable
//!    and visible by name.
//!
//! Classes are never deallocated. Each class embeds an object
//! [`Header`](crate::object) as its first field, so a class is itself an
//! object that can receive messages (class methods such as `alloc`) and carry
//! associated objects.
//!
//! # Thread Safety
//!
//! The class table and each method table sit behind an `RwLock`. Method
//! lookups clone the entry out, so an implementation may itself send
//! messages or add methods without deadlocking.

use crate::encoding::validate_encoding;
use crate::error::{Error, Result};
use crate::object::{Header, Id};
use crate::selector::Sel;
use fxhash::FxHashMap;
use oxidex_log::debug;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Method implementation function pointer type.
///
/// Every method in the runtime is called the same way:
///
/// - `this`: the receiver (an instance, or the class for class methods)
/// - `cmd`: the selector that was sent
/// - `args`: pointer to an array of pointers, one per declared parameter,
///   each pointing at a slot holding the argument
/// - `ret`: pointer to a 16-byte slot receiving the return value
///
/// The implementation must read `args` and write `ret` according to the
/// type encoding the method was installed with. Unwinding out of an `Imp` is
/// permitted and propagates to the sender.
pub type Imp = unsafe extern "C-unwind" fn(this: Id, cmd: Sel, args: *const *mut u8, ret: *mut u8);

/// Name of the root class every bridge class descends from.
pub const ROOT_CLASS_NAME: &str = "OxObject";

/// An installed method.
#[derive(Clone)]
pub struct Method {
    /// Implementation pointer.
    pub imp: Imp,
    /// Type encoding, e.g. `"i@:i"`.
    pub types: Arc<str>,
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("imp", &format!("{:p}", self.imp as *const ()))
            .field("types", &&*self.types)
            .finish()
    }
}

#[repr(C)]
pub(crate) struct ClassInner {
    // Must stay first: a class pointer is also an object pointer.
    header: Header,
    name: &'static str,
    superclass: Option<ClassRef>,
    methods: RwLock<FxHashMap<Sel, Method>>,
    class_methods: RwLock<FxHashMap<Sel, Method>>,
    registered: AtomicBool,
}

/// Reference to a class. Classes live for the whole process.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ClassRef(NonNull<ClassInner>);

// SAFETY: ClassInner is leaked (never freed) and all its mutable state is
// behind atomics or locks.
unsafe impl Send for ClassRef {}
unsafe impl Sync for ClassRef {}

struct ClassTable {
    classes: RwLock<FxHashMap<&'static str, ClassRef>>,
    root: ClassRef,
}

static CLASSES: OnceLock<ClassTable> = OnceLock::new();

fn table() -> &'static ClassTable {
    CLASSES.get_or_init(|| {
        let root = ClassRef::leak(ROOT_CLASS_NAME, None);
        crate::root::install(root);
        root.inner().registered.store(true, Ordering::Release);

        let mut classes = FxHashMap::default();
        classes.insert(root.name(), root);
        ClassTable {
            classes: RwLock::new(classes),
            root,
        }
    })
}

impl ClassRef {
    fn leak(name: &str, superclass: Option<ClassRef>) -> ClassRef {
        let inner = Box::leak(Box::new(ClassInner {
            header: Header::new(None),
            name: Box::leak(name.to_owned().into_boxed_str()),
            superclass,
            methods: RwLock::new(FxHashMap::default()),
            class_methods: RwLock::new(FxHashMap::default()),
            registered: AtomicBool::new(false),
        }));
        ClassRef(NonNull::from(inner))
    }

    fn inner(self) -> &'static ClassInner {
        // SAFETY: ClassInner is leaked and never freed
        unsafe { &*self.0.as_ptr() }
    }

    /// Returns the class name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.inner().name
    }

    /// Returns the superclass, `None` for a root class.
    #[must_use]
    pub fn superclass(self) -> Option<ClassRef> {
        self.inner().superclass
    }

    /// Whether [`register_class_pair`] has run for this class.
    #[must_use]
    pub fn is_registered(self) -> bool {
        self.inner().registered.load(Ordering::Acquire)
    }

    /// The class as a message receiver.
    #[must_use]
    pub fn as_id(self) -> Id {
        Id::from_ptr(self.0.as_ptr().cast())
    }

    /// Recovers a class from its object reference.
    ///
    /// Returns `None` for nil and for instances.
    ///
    /// # Safety
    ///
    /// `id` must be nil or point to a live object.
    #[must_use]
    pub unsafe fn from_id(id: Id) -> Option<ClassRef> {
        // SAFETY: nil or live per caller
        if unsafe { crate::object::object_is_class(id) } {
            NonNull::new(id.as_ptr().cast::<ClassInner>()).map(ClassRef)
        } else {
            None
        }
    }

    /// Iterates this class followed by its superclasses.
    pub fn ancestry(self) -> impl Iterator<Item = ClassRef> {
        std::iter::successors(Some(self), |class| class.superclass())
    }

    /// Returns `true` if `self` is `other` or inherits from it.
    #[must_use]
    pub fn is_subclass_of(self, other: ClassRef) -> bool {
        self.ancestry().any(|class| class == other)
    }

    /// Finds an instance method in this class or its ancestors.
    #[must_use]
    pub fn lookup_method(self, sel: Sel) -> Option<Method> {
        self.ancestry().find_map(|class| {
            class
                .inner()
                .methods
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&sel)
                .cloned()
        })
    }

    /// Finds a class method in this class or its ancestors.
    #[must_use]
    pub fn lookup_class_method(self, sel: Sel) -> Option<Method> {
        self.ancestry().find_map(|class| {
            class
                .inner()
                .class_methods
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&sel)
                .cloned()
        })
    }

    /// Whether instances respond to `sel`.
    #[must_use]
    pub fn responds_to(self, sel: Sel) -> bool {
        self.lookup_method(sel).is_some()
    }

    /// Selectors of the instance methods declared directly on this class.
    #[must_use]
    pub fn method_selectors(self) -> Vec<Sel> {
        self.inner()
            .methods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    pub(crate) fn insert_method(self, sel: Sel, method: Method) -> Option<Method> {
        self.inner()
            .methods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sel, method)
    }

    pub(crate) fn insert_class_method(self, sel: Sel, method: Method) -> Option<Method> {
        self.inner()
            .class_methods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sel, method)
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassRef").field(&self.name()).finish()
    }
}

/// Returns the root class, `OxObject`.
#[must_use]
pub fn root_class() -> ClassRef {
    table().root
}

/// Looks up a registered class by name.
#[must_use]
pub fn get_class(name: &str) -> Option<ClassRef> {
    table()
        .classes
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .copied()
        .filter(|class| class.is_registered())
}

/// Returns every registered class.
#[must_use]
pub fn class_list() -> Vec<ClassRef> {
    table()
        .classes
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .values()
        .copied()
        .filter(|class| class.is_registered())
        .collect()
}

/// Allocates a new class pair named `name`.
///
/// A `None` superclass creates a new root class.
///
/// # Errors
///
/// - [`Error::InvalidClassName`] if `name` is empty or contains NUL
/// - [`Error::InvalidSuperclass`] if the superclass is not registered
/// - [`Error::ClassAlreadyExists`] if the name is taken, registered or not
pub fn allocate_class_pair(superclass: Option<ClassRef>, name: &str) -> Result<ClassRef> {
    if name.is_empty() || name.contains('\0') {
        return Err(Error::InvalidClassName);
    }
    if let Some(superclass) = superclass {
        if !superclass.is_registered() {
            return Err(Error::InvalidSuperclass {
                name: superclass.name().to_string(),
            });
        }
    }

    let mut classes = table()
        .classes
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    if classes.contains_key(name) {
        return Err(Error::ClassAlreadyExists {
            name: name.to_string(),
        });
    }

    let class = ClassRef::leak(name, superclass);
    classes.insert(class.name(), class);

    debug!(
        "allocated class pair {} : {}",
        name,
        superclass.map_or("<root>", ClassRef::name)
    );
    Ok(class)
}

/// Makes an allocated class pair instantiable and visible by name.
///
/// # Errors
///
/// Returns [`Error::ClassAlreadyRegistered`] on a second registration.
pub fn register_class_pair(class: ClassRef) -> Result<()> {
    if class.inner().registered.swap(true, Ordering::AcqRel) {
        return Err(Error::ClassAlreadyRegistered {
            name: class.name().to_string(),
        });
    }
    debug!("registered class {}", class.name());
    Ok(())
}

/// Adds an instance method unless the class already declares `sel`.
///
/// Returns `Ok(false)` when the class already has a method for `sel`
/// (inherited methods do not count; adding one overrides it).
///
/// # Errors
///
/// Returns [`Error::InvalidEncoding`] if `types` is not a valid signature.
pub fn class_add_method(class: ClassRef, sel: Sel, imp: Imp, types: &str) -> Result<bool> {
    validate_encoding(types)?;

    let mut methods = class
        .inner()
        .methods
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    if methods.contains_key(&sel) {
        return Ok(false);
    }
    methods.insert(
        sel,
        Method {
            imp,
            types: Arc::from(types),
        },
    );
    Ok(true)
}

/// Adds or replaces an instance method, returning the previous
/// implementation declared on this class, if any.
///
/// # Errors
///
/// Returns [`Error::InvalidEncoding`] if `types` is not a valid signature.
pub fn class_replace_method(
    class: ClassRef,
    sel: Sel,
    imp: Imp,
    types: &str,
) -> Result<Option<Imp>> {
    validate_encoding(types)?;

    let previous = class.insert_method(
        sel,
        Method {
            imp,
            types: Arc::from(types),
        },
    );
    Ok(previous.map(|method| method.imp))
}

/// Adds or replaces a class method.
///
/// # Errors
///
/// Returns [`Error::InvalidEncoding`] if `types` is not a valid signature.
pub fn class_add_class_method(class: ClassRef, sel: Sel, imp: Imp, types: &str) -> Result<()> {
    validate_encoding(types)?;
    class.insert_class_method(
        sel,
        Method {
            imp,
            types: Arc::from(types),
        },
    );
    Ok(())
}

/// Returns the class name.
#[must_use]
pub fn class_get_name(class: ClassRef) -> &'static str {
    class.name()
}

/// Returns the type encoding of the instance method for `sel`, if any.
#[must_use]
pub fn method_type_encoding(class: ClassRef, sel: Sel) -> Option<Arc<str>> {
    class.lookup_method(sel).map(|method| method.types)
}
