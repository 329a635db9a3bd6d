//! Built-in methods of the root class `OxObject`.

use crate::class::{ClassRef, Imp, Method};
use crate::dispatch::msg_send;
use crate::encoding::TypeCode;
use crate::object::{
    Id, class_create_instance, object_get_class, object_release, object_retain,
    object_retain_count,
};
use crate::selector::Sel;
use crate::value::Value;
use std::sync::Arc;

/// Installs the built-ins on `root`.
///
/// Called while the class table is being initialized, so nothing here may
/// touch the table.
pub(crate) fn install(root: ClassRef) {
    let class_methods: [(&str, Imp, &str); 3] = [
        ("alloc", class_alloc, "@@:"),
        ("new", class_new, "@@:"),
        ("class", class_self, "#@:"),
    ];
    let instance_methods: [(&str, Imp, &str); 7] = [
        ("init", init, "@@:"),
        ("class", class, "#@:"),
        ("retain", retain, "@@:"),
        ("release", release, "v@:"),
        ("retainCount", retain_count, "Q@:"),
        ("respondsToSelector:", responds_to_selector, "B@::"),
        ("isKindOfClass:", is_kind_of_class, "B@:#"),
    ];

    for (name, imp, types) in class_methods {
        root.insert_class_method(
            Sel::register(name),
            Method {
                imp,
                types: Arc::from(types),
            },
        );
    }
    for (name, imp, types) in instance_methods {
        root.insert_method(
            Sel::register(name),
            Method {
                imp,
                types: Arc::from(types),
            },
        );
    }
}

// Class methods

unsafe extern "C-unwind" fn class_alloc(this: Id, _cmd: Sel, _args: *const *mut u8, ret: *mut u8) {
    // SAFETY: class methods are only dispatched to class objects
    let obj = unsafe { ClassRef::from_id(this) }
        .and_then(|class| class_create_instance(class).ok())
        .unwrap_or(Id::NIL);
    // SAFETY: ret is a full slot
    unsafe { Value::Object(obj).write_to(ret) };
}

unsafe extern "C-unwind" fn class_new(this: Id, cmd: Sel, args: *const *mut u8, ret: *mut u8) {
    // SAFETY: same contract as alloc
    unsafe { class_alloc(this, cmd, args, ret) };
    // SAFETY: alloc wrote an object
    let Some(obj) = (unsafe { Value::read_from(TypeCode::Object, ret) }).as_object() else {
        return;
    };
    if obj.is_nil() {
        return;
    }
    // SAFETY: obj was just allocated
    let initialized = unsafe { msg_send(obj, Sel::register("init"), &[]) }
        .ok()
        .and_then(|value| value.as_object())
        .unwrap_or(Id::NIL);
    // SAFETY: ret is a full slot
    unsafe { Value::Object(initialized).write_to(ret) };
}

unsafe extern "C-unwind" fn class_self(this: Id, _cmd: Sel, _args: *const *mut u8, ret: *mut u8) {
    // SAFETY: ret is a full slot
    unsafe { Value::Class(this).write_to(ret) };
}

// Instance methods

unsafe extern "C-unwind" fn init(this: Id, _cmd: Sel, _args: *const *mut u8, ret: *mut u8) {
    // SAFETY: ret is a full slot
    unsafe { Value::Object(this).write_to(ret) };
}

unsafe extern "C-unwind" fn class(this: Id, _cmd: Sel, _args: *const *mut u8, ret: *mut u8) {
    // SAFETY: instance methods receive live instances
    let class = unsafe { object_get_class(this) }.map_or(Id::NIL, ClassRef::as_id);
    // SAFETY: ret is a full slot
    unsafe { Value::Class(class).write_to(ret) };
}

unsafe extern "C-unwind" fn retain(this: Id, _cmd: Sel, _args: *const *mut u8, ret: *mut u8) {
    // SAFETY: live receiver; ret is a full slot
    unsafe { Value::Object(object_retain(this)).write_to(ret) };
}

unsafe extern "C-unwind" fn release(this: Id, _cmd: Sel, _args: *const *mut u8, _ret: *mut u8) {
    // SAFETY: the sender owns the reference being released
    unsafe { object_release(this) };
}

unsafe extern "C-unwind" fn retain_count(this: Id, _cmd: Sel, _args: *const *mut u8, ret: *mut u8) {
    // SAFETY: live receiver; ret is a full slot
    unsafe { Value::ULongLong(u64::from(object_retain_count(this))).write_to(ret) };
}

unsafe extern "C-unwind" fn responds_to_selector(
    this: Id,
    _cmd: Sel,
    args: *const *mut u8,
    ret: *mut u8,
) {
    // SAFETY: encoding `B@::` guarantees one selector argument
    let responds = match unsafe { Value::read_from(TypeCode::Selector, *args) } {
        // SAFETY: live receiver
        Value::Selector(sel) => unsafe { object_get_class(this) }
            .is_some_and(|class| class.responds_to(sel)),
        _ => false,
    };
    // SAFETY: ret is a full slot
    unsafe { Value::Bool(responds).write_to(ret) };
}

unsafe extern "C-unwind" fn is_kind_of_class(
    this: Id,
    _cmd: Sel,
    args: *const *mut u8,
    ret: *mut u8,
) {
    // SAFETY: encoding `B@:#` guarantees one class argument
    let other = unsafe { Value::read_from(TypeCode::Class, *args) }
        .as_object()
        // SAFETY: class arguments are nil or class objects
        .and_then(|id| unsafe { ClassRef::from_id(id) });
    // SAFETY: live receiver
    let kind = match (unsafe { object_get_class(this) }, other) {
        (Some(class), Some(other)) => class.is_subclass_of(other),
        _ => false,
    };
    // SAFETY: ret is a full slot
    unsafe { Value::Bool(kind).write_to(ret) };
}
