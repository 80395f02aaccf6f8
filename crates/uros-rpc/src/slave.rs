//! Slave-API dispatch: one worker parses a single `<methodCall>`, matches
//! on the method name and calls back into whatever owns the node's state.
//! The match is exact and case-sensitive, per the method the original
//! Slave server uses to route.

use uros_base::{Address, ErrorKind, ParamValue, UrosError, UrosResult};
use uros_registry::Registry;
use uros_xmlrpc::{MethodCall, Reply, Value};

/// Everything the dispatch loop needs from the node that owns it. Kept as
/// a trait rather than a concrete struct so `uros-node`'s supervisor can
/// be the implementor without this crate depending back on it.
pub trait SlaveHandler: Send + Sync {
    fn caller_id(&self) -> &str;
    fn registry(&self) -> &Registry;
    fn tcpros_addr(&self) -> Address;
    fn pid(&self) -> u32;
    fn master_uri(&self) -> &str;

    /// Called once `shutdown`'s reply has been queued for send; the
    /// handler starts draining but must not block this call.
    fn on_shutdown(&self, reason: &str);

    /// A subscribed param changed; `BadParam`/`MapMiss` here becomes an
    /// RPC failure (code 0), anything else propagates as an error.
    fn on_param_update(&self, key: &str, value: ParamValue) -> UrosResult<()>;

    /// The Master told us about a (possibly updated) publisher list for
    /// a topic we subscribe to; reconnecting to new publishers is the
    /// TCPROS engine's job, triggered from here.
    fn on_publisher_update(&self, topic: &str, publisher_uris: &[String]) -> UrosResult<()>;
}

/// Parses and dispatches one Slave-API call, returning the XML-RPC value
/// to write back (always the `[code, statusMessage, value]` shape).
pub fn dispatch(handler: &dyn SlaveHandler, call: &MethodCall) -> Value {
    let reply = match call.name.as_str() {
        "getBusStats" => get_bus_stats(handler),
        "getBusInfo" => get_bus_info(handler),
        "getMasterUri" => Reply::ok("master uri", Value::Str(handler.master_uri().to_owned())),
        "shutdown" => shutdown(handler, call),
        "getPid" => Reply::ok("pid", Value::Int(handler.pid() as i32)),
        "getSubscriptions" => get_subscriptions(handler),
        "getPublications" => get_publications(handler),
        "paramUpdate" => param_update(handler, call),
        "publisherUpdate" => publisher_update(handler, call),
        "requestTopic" => request_topic(handler, call),
        other => Reply::error(format!("unknown method: {other}")),
    };
    reply.into_value()
}

fn get_bus_stats(handler: &dyn SlaveHandler) -> Reply {
    let registry = handler.registry();
    let publish = Value::Array(
        registry
            .published_topics()
            .into_iter()
            .map(|t| {
                let count = registry.count_sessions(t.name.as_str());
                Value::Array(vec![Value::Str(t.name.as_str().to_owned()), Value::Int(count as i32)])
            })
            .collect(),
    );
    let subscribe = Value::Array(
        registry
            .subscribed_topics()
            .into_iter()
            .map(|t| {
                let count = registry.count_sessions(t.name.as_str());
                Value::Array(vec![Value::Str(t.name.as_str().to_owned()), Value::Int(count as i32)])
            })
            .collect(),
    );
    let service = Value::Array(vec![]);
    Reply::ok("bus stats", Value::Array(vec![publish, subscribe, service]))
}

fn get_bus_info(handler: &dyn SlaveHandler) -> Reply {
    let sessions = handler.registry().sessions();
    let info = sessions
        .into_iter()
        .map(|session| {
            Value::Array(vec![
                Value::Int(session.id as i32),
                Value::Str(session.remote.to_string()),
                Value::Str("connected".into()),
                Value::Str("TCPROS".into()),
                Value::Str(session.topic_or_service.as_str().to_owned()),
            ])
        })
        .collect();
    Reply::ok("bus info", Value::Array(info))
}

fn shutdown(handler: &dyn SlaveHandler, call: &MethodCall) -> Reply {
    let reason = call.params.get(1).and_then(Value::as_str).unwrap_or("");
    handler.on_shutdown(reason);
    Reply::ok("shutting down", Value::Int(0))
}

fn get_subscriptions(handler: &dyn SlaveHandler) -> Reply {
    let topics = handler
        .registry()
        .subscribed_topics()
        .into_iter()
        .map(|t| Value::Array(vec![Value::Str(t.name.as_str().to_owned()), Value::Str(t.type_desc.name.as_str().to_owned())]))
        .collect();
    Reply::ok("subscriptions", Value::Array(topics))
}

fn get_publications(handler: &dyn SlaveHandler) -> Reply {
    let topics = handler
        .registry()
        .published_topics()
        .into_iter()
        .map(|t| Value::Array(vec![Value::Str(t.name.as_str().to_owned()), Value::Str(t.type_desc.name.as_str().to_owned())]))
        .collect();
    Reply::ok("publications", Value::Array(topics))
}

fn param_update(handler: &dyn SlaveHandler, call: &MethodCall) -> Reply {
    let (Some(key), Some(value)) = (call.params.get(1).and_then(Value::as_str), call.params.get(2)) else {
        return Reply::error("paramUpdate: missing key/value");
    };
    let param_value = match value {
        Value::Int(i) => ParamValue::Int(i64::from(*i)),
        Value::Bool(b) => ParamValue::Bool(*b),
        Value::Double(d) => ParamValue::Double(*d),
        Value::Str(s) => ParamValue::Str(s.clone()),
        _ => return Reply::failure("paramUpdate: unsupported value kind"),
    };
    match handler.registry().update_param(key, param_value.clone()) {
        Ok(()) => match handler.on_param_update(key, param_value) {
            Ok(()) => Reply::ok("param updated", Value::Int(1)),
            Err(err) => reply_for_handler_error(err),
        },
        Err(err) if err.kind == ErrorKind::MapMiss => Reply::failure(err.message),
        Err(err) => Reply::error(err.message),
    }
}

fn publisher_update(handler: &dyn SlaveHandler, call: &MethodCall) -> Reply {
    let Some(topic) = call.params.get(1).and_then(Value::as_str) else {
        return Reply::error("publisherUpdate: missing topic");
    };
    let Some(publishers) = call.params.get(2).and_then(Value::as_array) else {
        return Reply::error("publisherUpdate: missing publisher list");
    };
    let uris: Vec<String> = publishers.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect();
    match handler.on_publisher_update(topic, &uris) {
        Ok(()) => Reply::ok("publishers updated", Value::Int(1)),
        Err(err) => reply_for_handler_error(err),
    }
}

fn request_topic(handler: &dyn SlaveHandler, call: &MethodCall) -> Reply {
    let Some(topic) = call.params.get(1).and_then(Value::as_str) else {
        return Reply::error("requestTopic: missing topic");
    };
    let Some(protocols) = call.params.get(2).and_then(Value::as_array) else {
        return Reply::error("requestTopic: missing protocol list");
    };

    let Some(entry) = handler.registry().lookup_published_topic(topic) else {
        return Reply::failure(format!("not a publisher of {topic}"));
    };

    let supports_tcpros = protocols.iter().any(|proto| {
        proto.as_array().is_some_and(|p| p.first().and_then(Value::as_str) == Some("TCPROS"))
    });
    if !supports_tcpros {
        return Reply::failure("no matching protocol (TCPROS only)");
    }
    let _ = entry;

    let addr = handler.tcpros_addr();
    Reply::ok(
        "ready on socket",
        Value::Array(vec![Value::Str("TCPROS".into()), Value::Str(addr.ip.to_string()), Value::Int(i32::from(addr.port))]),
    )
}

fn reply_for_handler_error(err: UrosError) -> Reply {
    match err.kind {
        ErrorKind::MapMiss | ErrorKind::BadParam => Reply::failure(err.message),
        _ => Reply::error(err.message),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use uros_base::TypeDescriptor;

    use super::*;

    struct TestHandler {
        registry: Registry,
        shutdown_reason: Mutex<Option<String>>,
        param_updates: Mutex<Vec<(String, ParamValue)>>,
    }

    impl TestHandler {
        fn new() -> Self {
            let registry = Registry::new();
            registry
                .register_static_type(TypeDescriptor::new("std_msgs/String", "992ce8a1687cec8c8bd883ec73ca41d1"))
                .unwrap();
            Self { registry, shutdown_reason: Mutex::new(None), param_updates: Mutex::new(Vec::new()) }
        }
    }

    impl SlaveHandler for TestHandler {
        fn caller_id(&self) -> &str {
            "/listener"
        }
        fn registry(&self) -> &Registry {
            &self.registry
        }
        fn tcpros_addr(&self) -> Address {
            Address::loopback(9021)
        }
        fn pid(&self) -> u32 {
            4242
        }
        fn master_uri(&self) -> &str {
            "http://127.0.0.1:11311/"
        }
        fn on_shutdown(&self, reason: &str) {
            *self.shutdown_reason.lock().unwrap() = Some(reason.to_owned());
        }
        fn on_param_update(&self, key: &str, value: ParamValue) -> UrosResult<()> {
            self.param_updates.lock().unwrap().push((key.to_owned(), value));
            Ok(())
        }
        fn on_publisher_update(&self, _topic: &str, _uris: &[String]) -> UrosResult<()> {
            Ok(())
        }
    }

    #[test]
    fn get_bus_stats_reflects_live_session_count() {
        let handler = TestHandler::new();
        handler.registry.advertise_topic("/chatter", "std_msgs/String", Default::default()).unwrap();

        let call = MethodCall::new("getBusStats", vec![Value::Str("/caller".into())]);
        let reply = Reply::from_value(dispatch(&handler, &call)).unwrap();
        let publish = reply.value.as_array().unwrap()[0].as_array().unwrap();
        assert_eq!(publish[0].as_array().unwrap()[1].as_int(), Some(0));

        let id = handler.registry.add_session("/chatter", Address::loopback(9021), Address::loopback(4000));
        let reply = Reply::from_value(dispatch(&handler, &call)).unwrap();
        let publish = reply.value.as_array().unwrap()[0].as_array().unwrap();
        assert_eq!(publish[0].as_array().unwrap()[1].as_int(), Some(1));

        handler.registry.remove_session(id);
        let reply = Reply::from_value(dispatch(&handler, &call)).unwrap();
        let publish = reply.value.as_array().unwrap()[0].as_array().unwrap();
        assert_eq!(publish[0].as_array().unwrap()[1].as_int(), Some(0));
    }

    #[test]
    fn request_topic_succeeds_for_known_publisher() {
        let handler = TestHandler::new();
        handler.registry.advertise_topic("/chatter", "std_msgs/String", Default::default()).unwrap();
        let call = MethodCall::new(
            "requestTopic",
            vec![Value::Str("/listener".into()), Value::Str("/chatter".into()), Value::Array(vec![Value::Array(vec![Value::Str("TCPROS".into())])])],
        );
        let value = dispatch(&handler, &call);
        let reply = Reply::from_value(value).unwrap();
        assert_eq!(reply.code, 1);
        let fields = reply.value.as_array().unwrap();
        assert_eq!(fields[0].as_str(), Some("TCPROS"));
        assert_eq!(fields[2].as_int(), Some(9021));
    }

    #[test]
    fn request_topic_fails_for_unknown_topic() {
        let handler = TestHandler::new();
        let call = MethodCall::new(
            "requestTopic",
            vec![Value::Str("/listener".into()), Value::Str("/nope".into()), Value::Array(vec![Value::Array(vec![Value::Str("TCPROS".into())])])],
        );
        let value = dispatch(&handler, &call);
        let reply = Reply::from_value(value).unwrap();
        assert_eq!(reply.code, 0);
    }

    #[test]
    fn request_topic_fails_for_unsupported_protocol() {
        let handler = TestHandler::new();
        handler.registry.advertise_topic("/chatter", "std_msgs/String", Default::default()).unwrap();
        let call = MethodCall::new(
            "requestTopic",
            vec![Value::Str("/listener".into()), Value::Str("/chatter".into()), Value::Array(vec![Value::Array(vec![Value::Str("UDPROS".into())])])],
        );
        let value = dispatch(&handler, &call);
        let reply = Reply::from_value(value).unwrap();
        assert_eq!(reply.code, 0);
    }

    #[test]
    fn param_update_on_unknown_key_fails_with_code_zero() {
        let handler = TestHandler::new();
        let call = MethodCall::new("paramUpdate", vec![Value::Str("/caller".into()), Value::Str("/unknown".into()), Value::Int(1)]);
        let value = dispatch(&handler, &call);
        let reply = Reply::from_value(value).unwrap();
        assert_eq!(reply.code, 0);
        assert!(handler.param_updates.lock().unwrap().is_empty());
    }

    #[test]
    fn param_update_on_subscribed_key_succeeds_and_notifies() {
        let handler = TestHandler::new();
        handler.registry.subscribe_param("/rate").unwrap();
        let call = MethodCall::new("paramUpdate", vec![Value::Str("/caller".into()), Value::Str("/rate".into()), Value::Int(10)]);
        let value = dispatch(&handler, &call);
        let reply = Reply::from_value(value).unwrap();
        assert_eq!(reply.code, 1);
        assert_eq!(handler.param_updates.lock().unwrap().as_slice(), &[("/rate".to_owned(), ParamValue::Int(10))]);
    }

    #[test]
    fn shutdown_invokes_handler_and_replies_first() {
        let handler = TestHandler::new();
        let call = MethodCall::new("shutdown", vec![Value::Str("/caller".into()), Value::Str("operator request".into())]);
        let value = dispatch(&handler, &call);
        let reply = Reply::from_value(value).unwrap();
        assert_eq!(reply.code, 1);
        assert_eq!(handler.shutdown_reason.lock().unwrap().as_deref(), Some("operator request"));
    }

    #[test]
    fn unknown_method_returns_error_code() {
        let handler = TestHandler::new();
        let call = MethodCall::new("bogusMethod", vec![]);
        let value = dispatch(&handler, &call);
        let reply = Reply::from_value(value).unwrap();
        assert_eq!(reply.code, -1);
    }
}
