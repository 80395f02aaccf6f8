//! One-shot client calls against the Master's XMLRPC API. Every call opens
//! a fresh connection, sends one request, waits for one response within
//! the configured timeout, and returns — no connection reuse, no retries;
//! failure is surfaced to the caller to handle.

use std::time::Duration;

use uros_base::{Address, ErrorKind, UrosError, UrosResult};
use uros_xmlrpc::{parse_method_response, write_method_call, MethodCall, Reply, Value};

pub struct MasterClient {
    addr: Address,
    timeout: Duration,
}

impl MasterClient {
    pub fn new(addr: Address, timeout: Duration) -> Self {
        Self { addr, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The single primitive every named call below is built from: connect,
    /// send one `<methodCall>`, read one `<methodResponse>`, parse the
    /// three-element reply.
    pub fn call(&self, method: &str, params: Vec<Value>) -> UrosResult<Reply> {
        let mut conn = uros_net::Connection::connect(self.addr, self.timeout)?;
        conn.set_read_timeout(Some(self.timeout))?;
        conn.set_write_timeout(Some(self.timeout))?;

        let body = write_method_call(&MethodCall::new(method, params));
        let host = self.addr.to_string();
        uros_xmlrpc::write_request(&mut conn, "/RPC2", &host, &body)
            .map_err(|err| UrosError::with_source(ErrorKind::ConnRefused, "master request failed", err))?;
        let response_body = uros_xmlrpc::read_response(&mut conn)
            .map_err(|err| UrosError::with_source(ErrorKind::Parse, "master response malformed", err))?;
        let value = parse_method_response(&response_body)
            .map_err(|err| UrosError::with_source(ErrorKind::Parse, "master response malformed", err))?;
        Reply::from_value(value).ok_or_else(|| UrosError::new(ErrorKind::Parse, "master reply not a 3-tuple"))
    }

    pub fn register_publisher(&self, caller_id: &str, topic: &str, type_name: &str, caller_api: &str) -> UrosResult<Reply> {
        self.call(
            "registerPublisher",
            vec![caller_id.into(), topic.into(), type_name.into(), caller_api.into()],
        )
    }

    pub fn unregister_publisher(&self, caller_id: &str, topic: &str, caller_api: &str) -> UrosResult<Reply> {
        self.call("unregisterPublisher", vec![caller_id.into(), topic.into(), caller_api.into()])
    }

    pub fn register_subscriber(&self, caller_id: &str, topic: &str, type_name: &str, caller_api: &str) -> UrosResult<Reply> {
        self.call(
            "registerSubscriber",
            vec![caller_id.into(), topic.into(), type_name.into(), caller_api.into()],
        )
    }

    pub fn unregister_subscriber(&self, caller_id: &str, topic: &str, caller_api: &str) -> UrosResult<Reply> {
        self.call("unregisterSubscriber", vec![caller_id.into(), topic.into(), caller_api.into()])
    }

    pub fn register_service(&self, caller_id: &str, service: &str, service_api: &str, caller_api: &str) -> UrosResult<Reply> {
        self.call(
            "registerService",
            vec![caller_id.into(), service.into(), service_api.into(), caller_api.into()],
        )
    }

    pub fn unregister_service(&self, caller_id: &str, service: &str, service_api: &str) -> UrosResult<Reply> {
        self.call("unregisterService", vec![caller_id.into(), service.into(), service_api.into()])
    }

    pub fn lookup_node(&self, caller_id: &str, node_name: &str) -> UrosResult<Reply> {
        self.call("lookupNode", vec![caller_id.into(), node_name.into()])
    }

    pub fn lookup_service(&self, caller_id: &str, service: &str) -> UrosResult<Reply> {
        self.call("lookupService", vec![caller_id.into(), service.into()])
    }

    pub fn get_published_topics(&self, caller_id: &str, subgraph: &str) -> UrosResult<Reply> {
        self.call("getPublishedTopics", vec![caller_id.into(), subgraph.into()])
    }

    pub fn get_topic_types(&self, caller_id: &str) -> UrosResult<Reply> {
        self.call("getTopicTypes", vec![caller_id.into()])
    }

    pub fn get_system_state(&self, caller_id: &str) -> UrosResult<Reply> {
        self.call("getSystemState", vec![caller_id.into()])
    }

    pub fn get_uri(&self, caller_id: &str) -> UrosResult<Reply> {
        self.call("getUri", vec![caller_id.into()])
    }

    pub fn get_pid(&self, caller_id: &str) -> UrosResult<Reply> {
        self.call("getPid", vec![caller_id.into()])
    }

    pub fn get_param(&self, caller_id: &str, key: &str) -> UrosResult<Reply> {
        self.call("getParam", vec![caller_id.into(), key.into()])
    }

    pub fn set_param(&self, caller_id: &str, key: &str, value: Value) -> UrosResult<Reply> {
        self.call("setParam", vec![caller_id.into(), key.into(), value])
    }

    pub fn delete_param(&self, caller_id: &str, key: &str) -> UrosResult<Reply> {
        self.call("deleteParam", vec![caller_id.into(), key.into()])
    }

    pub fn subscribe_param(&self, caller_id: &str, caller_api: &str, key: &str) -> UrosResult<Reply> {
        self.call("subscribeParam", vec![caller_id.into(), caller_api.into(), key.into()])
    }

    pub fn unsubscribe_param(&self, caller_id: &str, caller_api: &str, key: &str) -> UrosResult<Reply> {
        self.call("unsubscribeParam", vec![caller_id.into(), caller_api.into(), key.into()])
    }

    pub fn has_param(&self, caller_id: &str, key: &str) -> UrosResult<Reply> {
        self.call("hasParam", vec![caller_id.into(), key.into()])
    }

    pub fn search_param(&self, caller_id: &str, key: &str) -> UrosResult<Reply> {
        self.call("searchParam", vec![caller_id.into(), key.into()])
    }

    pub fn param_update(&self, caller_id: &str, key: &str, value: Value) -> UrosResult<Reply> {
        self.call("paramUpdate", vec![caller_id.into(), key.into(), value])
    }

    pub fn publisher_update(&self, caller_id: &str, topic: &str, publishers: Vec<Value>) -> UrosResult<Reply> {
        self.call("publisherUpdate", vec![caller_id.into(), topic.into(), Value::Array(publishers)])
    }

    pub fn request_topic(&self, caller_id: &str, topic: &str, protocols: Vec<Value>) -> UrosResult<Reply> {
        self.call("requestTopic", vec![caller_id.into(), topic.into(), Value::Array(protocols)])
    }
}

#[cfg(test)]
mod tests {
    use std::{net::TcpListener, thread};

    use super::*;

    /// A minimal fake Master: accepts one connection, reads the request,
    /// and replies with a fixed `registerPublisher`-shaped success.
    fn fake_master_once(response: Reply) -> Address {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = Address::from(match listener.local_addr().unwrap() {
            std::net::SocketAddr::V4(a) => a,
            _ => unreachable!(),
        });
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut conn = uros_net::Connection::from_stream(stream).unwrap();
            let _request = uros_xmlrpc::read_request(&mut conn).unwrap();
            let body = uros_xmlrpc::write_method_response(&response.into_value());
            uros_xmlrpc::write_response(&mut conn, &body).unwrap();
        });
        addr
    }

    #[test]
    fn register_publisher_round_trips_through_a_fake_master() {
        let addr = fake_master_once(Reply::ok("registered", Value::Array(vec![Value::Str("http://127.0.0.1:11311/".into())])));
        let client = MasterClient::new(addr, Duration::from_secs(1));
        let reply = client.register_publisher("/talker", "/chatter", "std_msgs/String", "http://127.0.0.1:9000/").unwrap();
        assert_eq!(reply.code, 1);
        assert_eq!(reply.message, "registered");
    }

    #[test]
    fn get_param_surfaces_failure_code() {
        let addr = fake_master_once(Reply::failure("no such key"));
        let client = MasterClient::new(addr, Duration::from_secs(1));
        let reply = client.get_param("/talker", "/missing").unwrap();
        assert_eq!(reply.code, 0);
    }

    #[test]
    fn connection_refused_is_surfaced_as_an_error() {
        let addr = Address::loopback(1);
        let client = MasterClient::new(addr, Duration::from_millis(200));
        let err = client.get_pid("/talker").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConnRefused);
    }
}
