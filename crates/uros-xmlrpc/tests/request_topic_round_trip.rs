//! End-to-end: encode a `requestTopic` call, push it over a real loopback
//! socket as an HTTP POST, read it back on the other end, and do the same
//! for the three-element reply.

use std::{net::TcpListener, thread, time::Duration};

use uros_base::Address;
use uros_net::Connection;
use uros_xmlrpc::{parse_method_call, parse_method_response, write_method_call, write_method_response, MethodCall, Reply, Value};

fn loopback_pair() -> (Connection, Connection) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = Address::from(match listener.local_addr().unwrap() {
        std::net::SocketAddr::V4(a) => a,
        _ => unreachable!(),
    });
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        Connection::from_stream(stream).unwrap()
    });
    let client = Connection::connect(addr, Duration::from_secs(1)).unwrap();
    (server.join().unwrap(), client)
}

#[test]
fn request_topic_call_and_reply_round_trip_over_http() {
    let (mut server, mut client) = loopback_pair();

    let call = MethodCall::new(
        "requestTopic",
        vec![
            Value::Str("/listener".into()),
            Value::Str("/chatter".into()),
            Value::Array(vec![Value::Array(vec![Value::Str("TCPROS".into())])]),
        ],
    );
    let request_body = write_method_call(&call);

    let writer = thread::spawn(move || {
        uros_xmlrpc::write_request(&mut client, "/RPC2", "127.0.0.1:0", &request_body).unwrap();
        client
    });
    let received = uros_xmlrpc::read_request(&mut server).unwrap();
    let mut client = writer.join().unwrap();

    let parsed = parse_method_call(&received).unwrap();
    assert_eq!(parsed, call);
    assert_eq!(parsed.name, "requestTopic");

    let reply = Reply::ok(
        "ready on socket",
        Value::Array(vec![Value::Str("TCPROS".into()), Value::Str("10.0.0.5".into()), Value::Int(9021)]),
    );
    let response_body = write_method_response(&reply.clone().into_value());

    let responder = thread::spawn(move || {
        uros_xmlrpc::write_response(&mut server, &response_body).unwrap();
    });
    let response_text = uros_xmlrpc::read_response(&mut client).unwrap();
    responder.join().unwrap();

    let value = parse_method_response(&response_text).unwrap();
    let round_tripped = Reply::from_value(value).unwrap();
    assert_eq!(round_tripped, reply);
}

#[test]
fn malformed_method_call_body_is_rejected() {
    let body = "<methodCall><methodName>requestTopic</methodName><params><param><value><int>not-a-number</int></value></param></params></methodCall>";
    let err = parse_method_call(body).unwrap_err();
    assert!(matches!(err, uros_xmlrpc::XmlRpcError::ValueRange(_)));
}
