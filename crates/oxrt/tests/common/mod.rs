// Shared fixtures for the runtime integration tests.
//
// The class namespace is process-global, so every helper hands out a
// unique class name.

#![allow(dead_code)]

use oxrt::{ClassRef, Id, Imp, Sel, Value, allocate_class_pair, class_add_method, msg_send,
    register_class_pair, root_class};
use std::sync::atomic::{AtomicUsize, Ordering};

static TEST_ID: AtomicUsize = AtomicUsize::new(0);

/// Returns `prefix` with a process-unique suffix.
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}_{}", TEST_ID.fetch_add(1, Ordering::SeqCst))
}

/// Allocates and registers a direct subclass of the root class.
pub fn registered_class(prefix: &str) -> ClassRef {
    let class = allocate_class_pair(Some(root_class()), &unique_name(prefix))
        .expect("Failed to allocate test class");
    register_class_pair(class).expect("Failed to register test class");
    class
}

/// Allocates and registers a subclass with one method installed.
pub fn class_with_method(prefix: &str, selector: &str, imp: Imp, types: &str) -> ClassRef {
    let class = allocate_class_pair(Some(root_class()), &unique_name(prefix))
        .expect("Failed to allocate test class");
    class_add_method(class, Sel::register(selector), imp, types)
        .expect("Failed to add test method");
    register_class_pair(class).expect("Failed to register test class");
    class
}

/// `[class new]`
pub fn new_instance(class: ClassRef) -> Id {
    unsafe { msg_send(class.as_id(), Sel::register("new"), &[]) }
        .expect("new failed")
        .as_object()
        .expect("new returned a non-object")
}

/// `[obj release]`
pub fn release(obj: Id) {
    unsafe { msg_send(obj, Sel::register("release"), &[]) }.expect("release failed");
}

/// Sends `selector` and unwraps the result.
pub fn send(receiver: Id, selector: &str, args: &[Value]) -> Value {
    unsafe { msg_send(receiver, Sel::register(selector), args) }.expect("message send failed")
}
