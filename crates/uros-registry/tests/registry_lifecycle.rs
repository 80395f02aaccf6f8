use uros_base::{Address, ErrorKind, ParamValue, TopicFlags, TypeDescriptor};
use uros_registry::Registry;

fn std_string_type() -> TypeDescriptor {
    TypeDescriptor::new("std_msgs/String", "992ce8a1687cec8c8bd883ec73ca41d1")
}

#[test]
fn advertise_requires_a_registered_type() {
    let registry = Registry::new();
    let err = registry.advertise_topic("/chatter", "std_msgs/String", TopicFlags::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MapMiss);
}

#[test]
fn advertise_twice_is_a_deterministic_no_op() {
    let registry = Registry::new();
    registry.register_static_type(std_string_type()).unwrap();
    registry.advertise_topic("/chatter", "std_msgs/String", TopicFlags::default()).unwrap();
    registry.advertise_topic("/chatter", "std_msgs/String", TopicFlags::default()).unwrap();
    assert_eq!(registry.published_topics().len(), 1);
}

#[test]
fn register_static_type_conflict_fails() {
    let registry = Registry::new();
    registry.register_static_type(std_string_type()).unwrap();
    let err = registry
        .register_static_type(TypeDescriptor::new("std_msgs/String", "deadbeef"))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadParam);
}

#[test]
fn register_static_type_identical_reregister_is_ok() {
    let registry = Registry::new();
    registry.register_static_type(std_string_type()).unwrap();
    registry.register_static_type(std_string_type()).unwrap();
}

#[test]
fn sessionless_topic_has_zero_session_count() {
    let registry = Registry::new();
    registry.register_static_type(std_string_type()).unwrap();
    registry.advertise_topic("/chatter", "std_msgs/String", TopicFlags::default()).unwrap();
    assert_eq!(registry.count_sessions("/chatter"), 0);
}

#[test]
fn add_and_remove_session_round_trips_count() {
    let registry = Registry::new();
    let id = registry.add_session("/chatter", Address::loopback(1000), Address::loopback(2000));
    assert_eq!(registry.count_sessions("/chatter"), 1);
    registry.remove_session(id);
    assert_eq!(registry.count_sessions("/chatter"), 0);
}

#[test]
fn unsubscribe_topic_removes_entry() {
    let registry = Registry::new();
    registry.register_static_type(std_string_type()).unwrap();
    registry.subscribe_topic("/chatter", "std_msgs/String").unwrap();
    assert!(registry.lookup_subscribed_topic("/chatter").is_some());
    registry.unsubscribe_topic("/chatter").unwrap();
    assert!(registry.lookup_subscribed_topic("/chatter").is_none());
}

#[test]
fn unsubscribe_unknown_topic_fails_map_miss() {
    let registry = Registry::new();
    let err = registry.unsubscribe_topic("/nope").unwrap_err();
    assert_eq!(err.kind, ErrorKind::MapMiss);
}

#[test]
fn param_update_on_unknown_key_leaves_registry_unchanged() {
    let registry = Registry::new();
    let err = registry.update_param("/unknown", ParamValue::Bool(true)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MapMiss);
}

#[test]
fn param_update_on_subscribed_key_succeeds() {
    let registry = Registry::new();
    registry.subscribe_param("/rate").unwrap();
    registry.update_param("/rate", ParamValue::Double(10.0)).unwrap();
}
