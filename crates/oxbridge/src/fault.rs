//! Unrecoverable bridge faults.
//!
//! A fault is a programming error in how the bridge was set up or used:
//! defining a class under a nil superclass, installing a method whose
//! signature cannot be encoded, or a message reaching the trampoline for a
//! selector that was never added. The native calling convention has no slot
//! to carry an error back through a message send, so faults are never
//! returned; [`raise`] reports the fault and then applies the process-wide
//! [`FaultAction`].
//!
//! The default action aborts. Embedders that run the bridge under
//! `catch_unwind` (and the test suites) switch to [`FaultAction::Panic`],
//! which unwinds with the [`BridgeFault`] itself as the panic payload.

use crate::error::Error;
use crate::signature::Shape;
use oxidex_log::error;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

/// What [`raise`] does after reporting a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultAction {
    /// Terminate the process.
    #[default]
    Abort,
    /// Unwind with the fault as the panic payload.
    Panic,
}

impl FaultAction {
    const fn as_u8(self) -> u8 {
        match self {
            FaultAction::Abort => 0,
            FaultAction::Panic => 1,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => FaultAction::Panic,
            _ => FaultAction::Abort,
        }
    }
}

impl fmt::Display for FaultAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultAction::Abort => f.write_str("abort"),
            FaultAction::Panic => f.write_str("panic"),
        }
    }
}

/// Error returned when parsing an unknown fault action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFaultActionError {
    input: String,
}

impl fmt::Display for ParseFaultActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown fault action '{}' (expected abort or panic)", self.input)
    }
}

impl std::error::Error for ParseFaultActionError {}

impl FromStr for FaultAction {
    type Err = ParseFaultActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FaultAction::Abort),
            "panic" | "unwind" => Ok(FaultAction::Panic),
            _ => Err(ParseFaultActionError {
                input: s.to_string(),
            }),
        }
    }
}

static FAULT_ACTION: AtomicU8 = AtomicU8::new(0);

/// Sets the process-wide fault action.
pub fn set_fault_action(action: FaultAction) {
    FAULT_ACTION.store(action.as_u8(), Ordering::Relaxed);
}

/// Returns the process-wide fault action.
#[must_use]
pub fn fault_action() -> FaultAction {
    FaultAction::from_u8(FAULT_ACTION.load(Ordering::Relaxed))
}

/// An unrecoverable bridge fault.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeFault {
    // Setup time
    /// A class was defined under a nil superclass.
    InvalidSuperclass {
        /// Class being defined.
        class: String,
    },
    /// The runtime refused to allocate the class pair.
    ClassAllocationFailed {
        /// Class being defined.
        class: String,
        /// Runtime error.
        source: oxrt::Error,
    },
    /// The runtime refused to register the class pair.
    RegistrationFailed {
        /// Class being registered.
        class: String,
        /// Runtime error.
        source: oxrt::Error,
    },
    /// A method signature has no native encoding.
    UnsupportedShape {
        /// Class receiving the method.
        class: String,
        /// Selector being added.
        selector: String,
        /// Encoding error.
        error: Error,
    },
    /// An outlet was declared with a non-object type.
    OutletNotObject {
        /// Class being defined.
        class: String,
        /// Outlet key.
        key: String,
        /// Declared shape.
        shape: Shape,
    },
    /// A method or instance uses a host struct other than the class's.
    HostTypeMismatch {
        /// Class being extended or instantiated.
        class: String,
        /// Selector being added; `None` when binding an instance.
        selector: Option<String>,
        /// Host type the class was defined with.
        expected: &'static str,
        /// Host type of the method.
        got: &'static str,
    },
    /// `alloc`/`init` failed while binding a host struct.
    InstanceAllocationFailed {
        /// Class being instantiated.
        class: String,
        /// What went wrong.
        reason: String,
    },
    /// `alloc`/`init` produced something other than an object.
    NotAnObject {
        /// Class being instantiated.
        class: String,
    },

    // Dispatch time
    /// The receiver's class is unknown to the bridge.
    UnregisteredClass {
        /// Class name.
        class: String,
    },
    /// The selector was routed to the trampoline without a handler.
    UnregisteredSelector {
        /// Receiver's class.
        class: String,
        /// Selector sent.
        selector: String,
    },
    /// The receiver has no bound host struct.
    MissingAssociation {
        /// Receiver's class.
        class: String,
        /// Selector sent.
        selector: String,
    },
    /// `setValue:forKey:` named a key that is not a declared outlet.
    UnknownOutlet {
        /// Receiver's class.
        class: String,
        /// Key received.
        key: String,
    },
    /// Native arguments could not be converted to the host types.
    ArgumentDecode {
        /// Receiver's class.
        class: String,
        /// Selector sent.
        selector: String,
        /// Conversion error.
        error: Error,
    },
}

impl BridgeFault {
    /// Whether the fault was detected during dispatch rather than setup.
    #[must_use]
    pub const fn is_dispatch_fault(&self) -> bool {
        matches!(
            self,
            BridgeFault::UnregisteredClass { .. }
                | BridgeFault::UnregisteredSelector { .. }
                | BridgeFault::MissingAssociation { .. }
                | BridgeFault::UnknownOutlet { .. }
                | BridgeFault::ArgumentDecode { .. }
        )
    }
}

impl fmt::Display for BridgeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeFault::InvalidSuperclass { class } => {
                write!(f, "cannot define '{class}': superclass is nil")
            }
            BridgeFault::ClassAllocationFailed { class, source } => {
                write!(f, "unable to allocate class pair '{class}': {source}")
            }
            BridgeFault::RegistrationFailed { class, source } => {
                write!(f, "unable to register class '{class}': {source}")
            }
            BridgeFault::UnsupportedShape {
                class,
                selector,
                error,
            } => write!(f, "-[{class} {selector}]: {error}"),
            BridgeFault::OutletNotObject { class, key, shape } => write!(
                f,
                "outlet '{key}' of '{class}' must be an object, declared as {shape}"
            ),
            BridgeFault::HostTypeMismatch {
                class,
                selector: Some(selector),
                expected,
                got,
            } => write!(
                f,
                "-[{class} {selector}]: method takes {got} but the class binds {expected}"
            ),
            BridgeFault::HostTypeMismatch {
                class,
                selector: None,
                expected,
                got,
            } => write!(
                f,
                "cannot bind {got} to an instance of '{class}', which binds {expected}"
            ),
            BridgeFault::InstanceAllocationFailed { class, reason } => {
                write!(f, "unable to instantiate '{class}': {reason}")
            }
            BridgeFault::NotAnObject { class } => {
                write!(f, "alloc/init of '{class}' did not return an object")
            }
            BridgeFault::UnregisteredClass { class } => {
                write!(f, "class '{class}' is not registered with the bridge")
            }
            BridgeFault::UnregisteredSelector { class, selector } => {
                write!(f, "-[{class} {selector}]: no host method registered")
            }
            BridgeFault::MissingAssociation { class, selector } => write!(
                f,
                "-[{class} {selector}]: receiver is not bound to a host struct"
            ),
            BridgeFault::UnknownOutlet { class, key } => {
                write!(f, "'{class}' has no outlet named '{key}'")
            }
            BridgeFault::ArgumentDecode {
                class,
                selector,
                error,
            } => write!(f, "-[{class} {selector}]: {error}"),
        }
    }
}

impl std::error::Error for BridgeFault {}

/// Reports `fault` and applies the current [`FaultAction`]. Never returns.
#[cold]
#[inline(never)]
pub fn raise(fault: BridgeFault) -> ! {
    error!("bridge fault: {}", fault);

    #[cfg(feature = "fault_backtrace")]
    error!("fault backtrace:\n{:?}", backtrace::Backtrace::new());

    match fault_action() {
        FaultAction::Abort => std::process::abort(),
        FaultAction::Panic => std::panic::panic_any(fault),
    }
}
