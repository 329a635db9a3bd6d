//! Selector interning.
//!
//! Every selector name maps to exactly one [`Sel`] for the life of the
//! process, so selectors compare and hash by pointer. Interned names are
//! leaked and never freed.

use fxhash::FxHashMap;
use std::fmt;
use std::ptr::NonNull;
use std::sync::{OnceLock, PoisonError, RwLock};

struct InternedSelector {
    name: &'static str,
}

/// An interned method name.
///
/// # Example
///
/// ```rust
/// use oxrt::Sel;
///
/// let a = Sel::register("doThing:");
/// let b = Sel::register("doThing:");
/// assert_eq!(a, b);
/// assert_eq!(a.name(), "doThing:");
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Sel(NonNull<InternedSelector>);

// SAFETY: interned selectors are immutable and leaked, so the pointer is
// valid and unaliased-mutably from every thread for the whole process.
unsafe impl Send for Sel {}
unsafe impl Sync for Sel {}

struct SelectorTable {
    names: RwLock<FxHashMap<&'static str, Sel>>,
}

static SELECTORS: OnceLock<SelectorTable> = OnceLock::new();

fn table() -> &'static SelectorTable {
    SELECTORS.get_or_init(|| SelectorTable {
        names: RwLock::new(FxHashMap::default()),
    })
}

impl Sel {
    /// Returns the selector for `name`, interning it on first use.
    #[must_use]
    pub fn register(name: &str) -> Sel {
        let table = table();

        // Fast path: read lock only
        if let Some(sel) = table
            .names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return *sel;
        }

        let mut names =
            table.names.write().unwrap_or_else(PoisonError::into_inner);

        // Another thread may have interned it while we waited
        if let Some(sel) = names.get(name) {
            return *sel;
        }

        let name: &'static str = Box::leak(name.to_owned().into_boxed_str());
        let interned = Box::leak(Box::new(InternedSelector { name }));
        let sel = Sel(NonNull::from(interned));
        names.insert(name, sel);
        sel
    }

    /// Returns the selector for `name` if it has been interned.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Sel> {
        table()
            .names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
    }

    /// Returns the selector's name.
    #[must_use]
    pub fn name(self) -> &'static str {
        // SAFETY: the pointee is leaked and immutable
        unsafe { self.0.as_ref() }.name
    }

    /// Number of colons in the name, i.e. the declared parameter count
    /// implied by keyword selector syntax.
    #[must_use]
    pub fn arity(self) -> usize {
        self.name().matches(':').count()
    }

    /// Returns the opaque pointer for this selector.
    #[must_use]
    pub fn as_ptr(self) -> *mut std::ffi::c_void {
        self.0.as_ptr().cast()
    }

    /// Rebuilds a selector from [`Sel::as_ptr`].
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a value previously returned by [`Sel::as_ptr`].
    #[must_use]
    pub unsafe fn from_ptr(ptr: *mut std::ffi::c_void) -> Option<Sel> {
        NonNull::new(ptr.cast::<InternedSelector>()).map(Sel)
    }
}

/// Interns `name`; the C-style spelling of [`Sel::register`].
#[must_use]
pub fn sel_register_name(name: &str) -> Sel {
    Sel::register(name)
}

/// Returns the name of `sel`.
#[must_use]
pub fn sel_get_name(sel: Sel) -> &'static str {
    sel.name()
}

impl fmt::Debug for Sel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sel").field(&self.name()).finish()
    }
}

impl fmt::Display for Sel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
