// Class definition: superclass checks, outlets, build states and the
// setup-time faults.

mod common;

use common::{Gadget, Widget, bridge, expect_fault, root, send, unique_name};
use oxbridge::{
    Bridge, BridgeConfig, BridgeFault, BuildState, FaultAction, Class, ClassDescriptor, Error, Handle, NativeType, Object,
    SET_VALUE_FOR_KEY, Shape, get_class,
};
use oxidex_log::Level;
use oxrt::Value;
use std::ffi::CString;

#[test]
fn test_class_lifecycle() {
    let bridge = bridge();
    let name = unique_name("Lifecycle");

    let class = bridge.new_class(root(), &name, ClassDescriptor::<Widget>::new());
    assert_eq!(class.name(), Some(name.as_str()));
    assert!(get_class(&name).is_nil(), "unregistered classes are not visible");
    assert_eq!(bridge.registry().state(&name), Some(BuildState::Allocated));

    bridge.add_method(&class, "ping", |_: &mut Widget| {});
    bridge.register_class(&class);

    assert_eq!(get_class(&name), class);
    assert_eq!(bridge.registry().state(&name), Some(BuildState::Registered));
    assert_eq!(
        bridge.registry().selectors(&name),
        [oxbridge::Selector::register("ping")]
    );
    assert_eq!(
        bridge.registry().host_type_name(&name),
        Some(std::any::type_name::<Widget>())
    );
    assert_eq!(bridge.registry().class_names(), [name]);
}

#[test]
fn test_bridge_keeps_its_config() {
    let config = BridgeConfig::new()
        .with_log_level(Level::Warn)
        .with_fault_action(FaultAction::Panic);
    let bridge = Bridge::with_config(config);

    assert_eq!(bridge.config(), config);
    assert_eq!(oxbridge::fault_action(), FaultAction::Panic);
    assert_eq!(Bridge::new().config(), BridgeConfig::default());
}

#[test]
fn test_installed_encoding() {
    let bridge = bridge();
    let class = bridge.new_class(root(), &unique_name("Encoded"), ClassDescriptor::<Widget>::new());
    bridge.add_method(&class, "scale:by:", |_: &mut Widget, x: f64, n: i32| x * f64::from(n));
    bridge.add_method(&class, "peer", |w: &mut Widget| w.delegate);

    let class_ref = class.class_ref().expect("class is not nil");
    let encoding = |sel: &str| {
        oxrt::method_type_encoding(class_ref, oxrt::Sel::register(sel)).map(|e| e.to_string())
    };
    assert_eq!(encoding("scale:by:").as_deref(), Some("d@:di"));
    assert_eq!(encoding("peer").as_deref(), Some("@@:"));
}

#[test]
fn test_nil_superclass_faults() {
    let bridge = bridge();
    let name = unique_name("Orphaned");

    let fault = expect_fault(|| bridge.new_class(Class::NIL, &name, ClassDescriptor::<Widget>::new()));

    assert_eq!(fault, BridgeFault::InvalidSuperclass { class: name.clone() });
    assert!(!bridge.registry().contains(&name));
}

#[test]
fn test_duplicate_class_name_faults() {
    let bridge = bridge();
    let name = unique_name("Twice");
    bridge.new_class(root(), &name, ClassDescriptor::<Widget>::new());

    let fault = expect_fault(|| bridge.new_class(root(), &name, ClassDescriptor::<Widget>::new()));

    assert!(matches!(
        fault,
        BridgeFault::ClassAllocationFailed {
            source: oxrt::Error::ClassAlreadyExists { .. },
            ..
        }
    ));
}

#[test]
fn test_unregistered_superclass_faults() {
    let bridge = bridge();
    let parent = bridge.new_class(root(), &unique_name("Pending"), ClassDescriptor::<Widget>::new());

    let fault = expect_fault(|| {
        bridge.new_class(parent, &unique_name("Child"), ClassDescriptor::<Widget>::new())
    });

    assert!(matches!(
        fault,
        BridgeFault::ClassAllocationFailed {
            source: oxrt::Error::InvalidSuperclass { .. },
            ..
        }
    ));
}

#[test]
fn test_double_registration_faults() {
    let bridge = bridge();
    let class = bridge
        .build_class::<Widget>(root(), &unique_name("Registered"))
        .register();

    let fault = expect_fault(|| bridge.register_class(&class));
    assert!(matches!(
        fault,
        BridgeFault::RegistrationFailed {
            source: oxrt::Error::ClassAlreadyRegistered { .. },
            ..
        }
    ));
}

#[test]
fn test_host_type_mismatch_faults() {
    let bridge = bridge();
    let name = unique_name("Typed");
    let class = bridge.new_class(root(), &name, ClassDescriptor::<Widget>::new());

    let fault = expect_fault(|| bridge.add_method(&class, "poke", |_: &mut Gadget| {}));
    assert_eq!(
        fault,
        BridgeFault::HostTypeMismatch {
            class: name.clone(),
            selector: Some("poke".into()),
            expected: std::any::type_name::<Widget>(),
            got: std::any::type_name::<Gadget>(),
        }
    );

    bridge.register_class(&class);
    let fault = expect_fault(|| bridge.bind(&class, Gadget::default()));
    assert!(matches!(
        fault,
        BridgeFault::HostTypeMismatch { selector: None, .. }
    ));
}

struct Point {
    x: f64,
    y: f64,
}

impl NativeType for Point {
    const SHAPE: Shape = Shape::Compound("Point");

    fn into_value(self) -> Value {
        Value::Double(self.x + self.y)
    }

    fn from_value(_value: Value) -> Option<Self> {
        None
    }
}

#[test]
fn test_compound_shape_faults() {
    let bridge = bridge();
    let name = unique_name("Geometry");
    let class = bridge.new_class(root(), &name, ClassDescriptor::<Widget>::new());

    let fault = expect_fault(|| bridge.add_method(&class, "moveTo:", |_: &mut Widget, _p: Point| {}));

    assert_eq!(
        fault,
        BridgeFault::UnsupportedShape {
            class: name.clone(),
            selector: "moveTo:".into(),
            error: Error::UnsupportedShape {
                position: 1,
                shape: Shape::Compound("Point"),
            },
        }
    );
    let class_ref = class.class_ref().expect("class is not nil");
    assert!(!class_ref.responds_to(oxrt::Sel::register("moveTo:")));
}

#[test]
fn test_outlets_are_wired_through_set_value_for_key() {
    let bridge = bridge();
    let name = unique_name("Controller");
    let descriptor = ClassDescriptor::<Widget>::new()
        .outlet("delegate", |w: &mut Widget, d: Handle| w.delegate = d)
        .outlet("window", |w: &mut Widget, d: Handle| {
            w.calls.push(format!("window {}", !d.is_nil()));
        });
    let class = bridge.new_class(root(), &name, descriptor);
    bridge.register_class(&class);

    let info = bridge.registry().class_info(&name).expect("class is defined");
    assert!(info.has_outlets());
    assert_eq!(info.state(), BuildState::Registered);
    let class_ref = class.class_ref().expect("class is not nil");
    assert_eq!(
        oxrt::method_type_encoding(class_ref, oxrt::Sel::register(SET_VALUE_FOR_KEY)).as_deref(),
        Some("v@:@*")
    );

    let controller = bridge.bind(&class, Widget::default());
    let target = bridge.bind(&class, Widget::default());

    let key = CString::new("delegate").expect("no interior NUL");
    let result = send(
        controller.handle(),
        SET_VALUE_FOR_KEY,
        &[Value::Object(target.handle().id()), Value::CString(key.as_ptr())],
    );
    assert_eq!(result, Value::Void);
    assert_eq!(controller.delegate, target.handle());

    let key = CString::new("window").expect("no interior NUL");
    send(
        controller.handle(),
        SET_VALUE_FOR_KEY,
        &[Value::Object(oxrt::Id::NIL), Value::CString(key.as_ptr())],
    );
    assert_eq!(controller.calls, ["window false"]);
    assert!(target.delegate.is_nil());
}

#[test]
fn test_unknown_outlet_key_faults() {
    let bridge = bridge();
    let name = unique_name("Keyed");
    let class = bridge
        .build_class::<Widget>(root(), &name)
        .outlet("delegate", |w: &mut Widget, d: Handle| w.delegate = d)
        .register();
    let widget = bridge.bind(&class, Widget::default());

    let key = CString::new("missing").expect("no interior NUL");
    let fault = expect_fault(|| {
        send(
            widget.handle(),
            SET_VALUE_FOR_KEY,
            &[Value::Object(widget.handle().id()), Value::CString(key.as_ptr())],
        )
    });

    assert_eq!(
        fault,
        BridgeFault::UnknownOutlet {
            class: name,
            key: "missing".into(),
        }
    );
    assert!(widget.delegate.is_nil());
}

#[test]
fn test_explicit_set_value_for_key_wins() {
    let bridge = bridge();
    let class = bridge
        .build_class::<Widget>(root(), &unique_name("Custom"))
        .outlet("delegate", |w: &mut Widget, d: Handle| w.delegate = d)
        .method(
            SET_VALUE_FOR_KEY,
            |w: &mut Widget, _value: Handle, _key: *const std::ffi::c_char| {
                w.calls.push("custom".into());
            },
        )
        .register();
    let widget = bridge.bind(&class, Widget::default());

    let key = CString::new("delegate").expect("no interior NUL");
    send(
        widget.handle(),
        SET_VALUE_FOR_KEY,
        &[Value::Object(widget.handle().id()), Value::CString(key.as_ptr())],
    );

    assert_eq!(widget.calls, ["custom"]);
    assert!(widget.delegate.is_nil());
}

#[test]
fn test_non_object_outlet_faults_before_instances_exist() {
    let bridge = bridge();
    let name = unique_name("BadOutlet");
    let descriptor = ClassDescriptor::<Widget>::new()
        .outlet("delegate", |w: &mut Widget, d: Handle| w.delegate = d)
        .outlet("total", |w: &mut Widget, n: i64| w.total = n);

    let fault = expect_fault(|| bridge.new_class(root(), &name, descriptor));

    assert_eq!(
        fault,
        BridgeFault::OutletNotObject {
            class: name.clone(),
            key: "total".into(),
            shape: <i64 as NativeType>::SHAPE,
        }
    );
    assert!(get_class(&name).is_nil(), "the class never became instantiable");
    assert!(!bridge.registry().contains(&name));
}

#[test]
fn test_classes_without_outlets_get_no_accessor() {
    let bridge = bridge();
    let name = unique_name("NoOutlets");
    let class = bridge.build_class::<Widget>(root(), &name).register();

    let class_ref = class.class_ref().expect("class is not nil");
    assert!(!class_ref.responds_to(oxrt::Sel::register(SET_VALUE_FOR_KEY)));
    assert_eq!(bridge.registry().state(&name), Some(BuildState::Registered));
    assert!(!bridge.registry().has_outlets(&name));
}

#[test]
fn test_methods_added_after_registration_dispatch() {
    let bridge = bridge();
    let class = bridge
        .build_class::<Widget>(root(), &unique_name("Late"))
        .register();
    bridge.add_method(&class, "late", |_: &mut Widget| 9_u32);

    let widget = bridge.bind(&class, Widget::default());
    assert_eq!(send(widget.handle(), "late", &[]), Value::UInt(9));
    assert_eq!(widget.object.handle(), widget.handle());
}
