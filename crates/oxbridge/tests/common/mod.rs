// Shared fixtures for the bridge integration tests.
//
// Class names are process-global in the runtime, so every helper hands out
// a unique name. Faults unwind instead of aborting so tests can observe them.

#![allow(dead_code)]

use oxbridge::{
    Bridge, BridgeFault, Class, FaultAction, Handle, HostObject, Object, Selector, get_class,
    set_fault_action,
};
use oxrt::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};

static TEST_ID: AtomicUsize = AtomicUsize::new(0);

/// Returns `prefix` with a process-unique suffix.
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}_{}", TEST_ID.fetch_add(1, Ordering::SeqCst))
}

/// A bridge whose faults unwind with the fault as payload.
pub fn bridge() -> Bridge {
    set_fault_action(FaultAction::Panic);
    Bridge::new()
}

/// The runtime's root class.
pub fn root() -> Class {
    get_class(oxrt::ROOT_CLASS_NAME)
}

/// Runs `f`, which must fault, and returns the fault.
pub fn expect_fault<R>(f: impl FnOnce() -> R) -> BridgeFault {
    set_fault_action(FaultAction::Panic);
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(_) => panic!("expected a bridge fault"),
        Err(payload) => match payload.downcast::<BridgeFault>() {
            Ok(fault) => *fault,
            Err(_) => panic!("panicked with something other than a bridge fault"),
        },
    }
}

/// Sends `selector` to `receiver` and unwraps the result.
pub fn send(receiver: Handle, selector: &str, args: &[Value]) -> Value {
    unsafe { receiver.send_message(Selector::register(selector), args) }
        .expect("message send failed")
}

/// Host struct used by most tests. Records every call it receives.
#[derive(Debug, Default)]
pub struct Widget {
    pub object: Handle,
    pub calls: Vec<String>,
    pub total: i64,
    pub delegate: Handle,
}

impl Object for Widget {
    fn handle(&self) -> Handle {
        self.object
    }
}

impl HostObject for Widget {
    fn set_object(&mut self, handle: Handle) {
        self.object = handle;
    }
}

/// A second host type, for type mismatch checks.
#[derive(Debug, Default)]
pub struct Gadget {
    pub object: Handle,
}

impl Object for Gadget {
    fn handle(&self) -> Handle {
        self.object
    }
}

impl HostObject for Gadget {
    fn set_object(&mut self, handle: Handle) {
        self.object = handle;
    }
}
