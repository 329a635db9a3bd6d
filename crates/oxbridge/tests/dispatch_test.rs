// Dispatch through the shared trampoline: argument decoding, host struct
// recovery, return encoding and the dispatch-time faults.

mod common;

use common::{Gadget, Widget, bridge, expect_fault, root, send, unique_name};
use oxbridge::{
    BridgeFault, ClassDescriptor, Error, Handle, MethodEntry, Object, SET_VALUE_FOR_KEY, Selector,
    trampoline,
};
use oxrt::Value;
use std::any::type_name;
use std::ffi::CString;

#[test]
fn test_widget_do_thing() {
    let bridge = bridge();
    let name = unique_name("Widget");
    let class = bridge.new_class(root(), &name, ClassDescriptor::<Widget>::new());
    bridge.add_method(&class, "doThing:", |w: &mut Widget, x: i32| {
        w.calls.push(format!("doThing:{x}"));
        x * 7 + 1
    });
    bridge.register_class(&class);

    let widget = bridge.bind(&class, Widget::default());
    let handle = widget.handle();
    let result = send(handle, "doThing:", &[Value::Int(5)]);

    assert_eq!(result, Value::Int(36));
    assert_eq!(widget.calls, ["doThing:5"]);
    assert_eq!(widget.object, handle);
}

#[test]
fn test_arguments_arrive_in_declared_order() {
    let bridge = bridge();
    let class = bridge
        .build_class::<Widget>(root(), &unique_name("Ordered"))
        .method(
            "mix:with:and:scale:",
            |w: &mut Widget, a: i32, b: u8, c: f64, d: i64| {
                w.calls.push(format!("{a} {b} {c} {d}"));
                w.total += 1;
            },
        )
        .register();

    let widget = bridge.bind(&class, Widget::default());
    let result = send(
        widget.handle(),
        "mix:with:and:scale:",
        &[
            Value::Int(-3),
            Value::UChar(200),
            Value::Double(0.5),
            Value::LongLong(1 << 40),
        ],
    );

    assert_eq!(result, Value::Void);
    assert_eq!(widget.total, 1, "host function must run exactly once");
    assert_eq!(widget.calls, [format!("-3 200 0.5 {}", 1_i64 << 40)]);
}

#[test]
fn test_eight_parameters() {
    let bridge = bridge();
    let class = bridge
        .build_class::<Widget>(root(), &unique_name("Wide"))
        .method(
            "a:b:c:d:e:f:g:h:",
            |_: &mut Widget, a: i64, b: i64, c: i64, d: i64, e: i64, f: i64, g: i64, h: i64| {
                [a, b, c, d, e, f, g, h]
                    .iter()
                    .enumerate()
                    .map(|(i, v)| v * 10_i64.pow(i as u32))
                    .sum::<i64>()
            },
        )
        .register();

    let widget = bridge.bind(&class, Widget::default());
    let args: Vec<Value> = (1..=8).map(Value::LongLong).collect();
    let result = send(widget.handle(), "a:b:c:d:e:f:g:h:", &args);

    assert_eq!(result, Value::LongLong(87_654_321));
}

#[test]
fn test_each_instance_reaches_its_own_struct() {
    let bridge = bridge();
    let class = bridge
        .build_class::<Widget>(root(), &unique_name("Tally"))
        .method("add:", |w: &mut Widget, n: i64| {
            w.total += n;
            w.total
        })
        .register();

    let first = bridge.bind(&class, Widget::default());
    let second = bridge.bind(&class, Widget::default());

    send(first.handle(), "add:", &[Value::LongLong(2)]);
    send(first.handle(), "add:", &[Value::LongLong(3)]);
    let result = send(second.handle(), "add:", &[Value::LongLong(10)]);

    assert_eq!(result, Value::LongLong(10));
    assert_eq!(first.total, 5);
    assert_eq!(second.total, 10);
}

#[test]
fn test_object_arguments_and_results() {
    let bridge = bridge();
    let class = bridge
        .build_class::<Widget>(root(), &unique_name("Linked"))
        .method("setDelegate:", |w: &mut Widget, d: Handle| {
            w.delegate = d;
        })
        .method("delegate", |w: &mut Widget| w.delegate)
        .method("isRoot:", |_: &mut Widget, c: oxbridge::Class| c == root())
        .register();

    let a = bridge.bind(&class, Widget::default());
    let b = bridge.bind(&class, Widget::default());

    send(a.handle(), "setDelegate:", &[Value::Object(b.handle().id())]);
    assert_eq!(a.delegate, b.handle());
    assert_eq!(
        send(a.handle(), "delegate", &[]),
        Value::Object(b.handle().id())
    );
    assert_eq!(
        send(a.handle(), "isRoot:", &[Value::Class(root().handle().id())]),
        Value::Bool(true)
    );
    assert_eq!(
        send(a.handle(), "isRoot:", &[Value::Class(class.handle().id())]),
        Value::Bool(false)
    );
}

#[test]
fn test_methods_are_inherited_by_subclasses() {
    let bridge = bridge();
    let base = bridge
        .build_class::<Widget>(root(), &unique_name("Base"))
        .method("describe", |w: &mut Widget| {
            w.calls.push("describe".into());
        })
        .register();
    let derived = bridge.new_class(base, &unique_name("Derived"), ClassDescriptor::<Widget>::new());
    bridge.add_method(&derived, "extra", |w: &mut Widget| {
        w.calls.push("extra".into());
    });
    bridge.register_class(&derived);

    let widget = bridge.bind(&derived, Widget::default());
    send(widget.handle(), "extra", &[]);
    let fault = expect_fault(|| send(widget.handle(), "describe", &[]));

    // The registry is keyed by the receiver's own class name.
    assert!(matches!(
        fault,
        BridgeFault::UnregisteredSelector { ref selector, .. } if selector == "describe"
    ));
    assert_eq!(widget.calls, ["extra"]);
}

#[test]
fn test_unregistered_selector_faults() {
    let bridge = bridge();
    let name = unique_name("Silent");
    let class = bridge.new_class(root(), &name, ClassDescriptor::<Widget>::new());
    // Route a selector to the trampoline without telling the bridge about it
    let class_ref = class.class_ref().expect("class is not nil");
    oxrt::class_add_method(class_ref, oxrt::Sel::register("frobnicate:"), trampoline, "i@:i")
        .expect("Failed to install raw method");
    bridge.register_class(&class);

    let widget = bridge.bind(&class, Widget::default());
    let fault = expect_fault(|| send(widget.handle(), "frobnicate:", &[Value::Int(1)]));

    assert_eq!(
        fault,
        BridgeFault::UnregisteredSelector {
            class: name.clone(),
            selector: "frobnicate:".into(),
        }
    );
    assert!(fault.is_dispatch_fault());
    assert_eq!(
        fault.to_string(),
        format!("-[{name} frobnicate:]: no host method registered")
    );
    assert!(widget.calls.is_empty());
}

#[test]
fn test_selector_unknown_to_runtime_is_an_error() {
    let bridge = bridge();
    let class = bridge
        .build_class::<Widget>(root(), &unique_name("Plain"))
        .register();
    let widget = bridge.bind(&class, Widget::default());

    let result = unsafe {
        widget
            .handle()
            .send_message(Selector::register("neverInstalled"), &[])
    };

    assert!(matches!(
        result,
        Err(oxbridge::Error::Runtime(oxrt::Error::SelectorNotFound { .. }))
    ));
}

#[test]
fn test_missing_association_faults() {
    let bridge = bridge();
    let name = unique_name("Orphan");
    let class = bridge
        .build_class::<Widget>(root(), &name)
        .method("ping", |w: &mut Widget| w.total += 1)
        .register();

    let widget = bridge.bind(&class, Widget::default());
    let handle = widget.handle();
    unsafe { bridge.unbind(handle) };

    let fault = expect_fault(|| send(handle, "ping", &[]));
    assert_eq!(
        fault,
        BridgeFault::MissingAssociation {
            class: name,
            selector: "ping".into(),
        }
    );
    assert_eq!(widget.total, 0);
}

#[test]
fn test_foreign_class_faults() {
    let bridge = bridge();
    let other = oxbridge::Bridge::new();
    let name = unique_name("Foreign");
    let class = other.new_class(root(), &name, ClassDescriptor::<Widget>::new());
    other.add_method(&class, "ping", |_: &mut Widget| {});
    other.register_class(&class);

    // Adding through a bridge that never defined the class
    let fault = expect_fault(|| bridge.add_method(&class, "pong", |_: &mut Widget| {}));
    assert_eq!(fault, BridgeFault::UnregisteredClass { class: name.clone() });

    // Dispatch still works through the defining bridge's registry
    let widget = other.bind(&class, Widget::default());
    assert_eq!(send(widget.handle(), "ping", &[]), Value::Void);
}

#[test]
fn test_plain_runtime_instance_is_not_a_bridged_class() {
    let bridge = bridge();
    let class = bridge
        .build_class::<Widget>(root(), &unique_name("Sub"))
        .method("ping", |_: &mut Widget| {})
        .register();

    // A subclass the bridge never defined inherits the trampoline
    let bare = oxrt::allocate_class_pair(class.class_ref(), &unique_name("Bare"))
        .expect("Failed to allocate bare subclass");
    oxrt::register_class_pair(bare).expect("Failed to register bare subclass");
    let instance = oxrt::class_create_instance(bare).expect("Failed to create instance");

    let fault = expect_fault(|| send(Handle::from_id(instance), "ping", &[]));
    assert_eq!(
        fault,
        BridgeFault::UnregisteredClass {
            class: bare.name().to_string(),
        }
    );
    unsafe { oxrt::object_release(instance) };
}

#[test]
fn test_replacing_a_method() {
    let bridge = bridge();
    let class = bridge.new_class(root(), &unique_name("Swap"), ClassDescriptor::<Widget>::new());
    bridge.add_method(&class, "value", |_: &mut Widget| 1_i32);
    bridge.add_method(&class, "value", |_: &mut Widget| 2_i32);
    bridge.register_class(&class);

    let widget = bridge.bind(&class, Widget::default());
    assert_eq!(send(widget.handle(), "value", &[]), Value::Int(2));
    assert_eq!(
        bridge
            .registry()
            .class_info(class.name().expect("class is not nil"))
            .map(|info| info.method_count()),
        Some(1)
    );
}

#[test]
fn test_last_definition_is_consulted_at_dispatch() {
    let bridge = bridge();
    let name = unique_name("Redefined");
    let class = bridge
        .build_class::<Widget>(root(), &name)
        .method("value", |_: &mut Widget| 1_i32)
        .method("stale", |_: &mut Widget| 0_i32)
        .register();
    let widget = bridge.bind(&class, Widget::default());
    assert_eq!(send(widget.handle(), "value", &[]), Value::Int(1));

    // Redefine the name in the registry and give it a new table
    let registry = bridge.registry();
    registry.define(&name, ClassDescriptor::<Widget>::new());
    let entry = MethodEntry::new(Selector::register("value"), |_: &mut Widget| 2_i32)
        .expect("i32 has a native encoding");
    registry.add_method(&name, entry).expect("class is defined");

    assert_eq!(send(widget.handle(), "value", &[]), Value::Int(2));
    let fault = expect_fault(|| send(widget.handle(), "stale", &[]));
    assert!(matches!(fault, BridgeFault::UnregisteredSelector { .. }));
}

#[test]
fn test_registry_rejects_methods_for_another_host_type() {
    let bridge = bridge();
    let name = unique_name("GadgetOnly");
    bridge
        .build_class::<Gadget>(root(), &name)
        .method("idle", |_: &mut Gadget| {})
        .register();

    let entry = MethodEntry::new(Selector::register("total"), |w: &mut Widget| w.total)
        .expect("i64 has a native encoding");
    assert_eq!(
        bridge.registry().add_method(&name, entry),
        Err(Error::HostTypeMismatch {
            class: name.clone(),
            expected: type_name::<Gadget>(),
            got: type_name::<Widget>(),
        })
    );
    assert_eq!(bridge.registry().selectors(&name), [Selector::register("idle")]);
}

#[test]
fn test_redefined_host_type_faults_for_existing_instances() {
    let bridge = bridge();
    let name = unique_name("Retyped");
    let class = bridge
        .build_class::<Widget>(root(), &name)
        .method("total", |w: &mut Widget| w.total)
        .register();
    let widget = bridge.bind(&class, Widget::default());

    // The class now claims Gadget hosts, but this instance still holds a Widget
    let registry = bridge.registry();
    registry.define(&name, ClassDescriptor::<Gadget>::new());
    let entry = MethodEntry::new(Selector::register("total"), |_: &mut Gadget| 0_i64)
        .expect("i64 has a native encoding");
    registry.add_method(&name, entry).expect("entry matches the new host type");

    let fault = expect_fault(|| send(widget.handle(), "total", &[]));
    assert_eq!(
        fault,
        BridgeFault::HostTypeMismatch {
            class: name,
            selector: Some("total".into()),
            expected: type_name::<Gadget>(),
            got: type_name::<Widget>(),
        }
    );
}

#[test]
fn test_redefined_outlets_check_the_bound_host_type() {
    let bridge = bridge();
    let name = unique_name("RetypedOutlet");
    let descriptor =
        ClassDescriptor::<Widget>::new().outlet("delegate", |w: &mut Widget, d: Handle| w.delegate = d);
    let class = bridge.new_class(root(), &name, descriptor);
    bridge.register_class(&class);
    let widget = bridge.bind(&class, Widget::default());

    bridge.registry().define(
        &name,
        ClassDescriptor::<Gadget>::new().outlet("delegate", |g: &mut Gadget, d: Handle| g.object = d),
    );

    let key = CString::new("delegate").expect("no interior NUL");
    let fault = expect_fault(|| {
        send(
            widget.handle(),
            SET_VALUE_FOR_KEY,
            &[Value::Object(oxrt::Id::NIL), Value::CString(key.as_ptr())],
        )
    });
    assert!(matches!(
        fault,
        BridgeFault::HostTypeMismatch { selector: Some(ref s), got, .. }
            if s == SET_VALUE_FOR_KEY && got == type_name::<Widget>()
    ));
    assert!(widget.delegate.is_nil());
}
