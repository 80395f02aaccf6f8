//! End-to-end publisher/subscriber handshake over real loopback sockets,
//! covering the advertise+connect happy path, one streamed message, and
//! the md5 mismatch rejection.

use std::{
    net::TcpListener,
    sync::{atomic::AtomicBool, Arc},
    thread,
    time::Duration,
};

use uros_base::{Address, TopicFlags, TypeDescriptor};
use uros_net::Connection;
use uros_registry::Registry;
use uros_tcpros::{accept_publisher_session, connect_subscriber_session};

fn std_msgs_string() -> TypeDescriptor {
    TypeDescriptor::new("std_msgs/String", "992ce8a1687cec8c8bd883ec73ca41d1")
}

fn listener_addr(listener: &TcpListener) -> Address {
    Address::from(match listener.local_addr().unwrap() {
        std::net::SocketAddr::V4(a) => a,
        _ => unreachable!(),
    })
}

#[test]
fn subscriber_receives_one_message_after_handshake() {
    let registry = Arc::new(Registry::new());
    registry.register_static_type(std_msgs_string()).unwrap();
    registry.advertise_topic("/chatter", "std_msgs/String", TopicFlags::default()).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let pub_addr = listener_addr(&listener);

    let pub_registry = Arc::clone(&registry);
    let publisher = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let conn = Connection::from_stream(stream).unwrap();
        let exit = Arc::new(AtomicBool::new(false));
        accept_publisher_session(conn, &pub_registry, exit, |session| {
            uros_tcpros::write_message(&mut session.conn, b"hello")
        })
        .unwrap();
    });

    let sub_registry = Arc::clone(&registry);
    let type_desc = std_msgs_string();
    let exit = Arc::new(AtomicBool::new(false));
    let mut received = None;
    connect_subscriber_session(pub_addr, &sub_registry, "/chatter", &type_desc, "/listener", Duration::from_secs(1), exit, |session| {
        received = Some(uros_tcpros::read_message(&mut session.conn)?);
        Ok(())
    })
    .unwrap();

    publisher.join().unwrap();
    assert_eq!(received.unwrap().as_ref(), b"hello" as &[u8]);
    assert_eq!(registry.count_sessions("/chatter"), 0);
}

#[test]
fn md5_mismatch_is_rejected_with_an_error_header() {
    let registry = Arc::new(Registry::new());
    registry.register_static_type(std_msgs_string()).unwrap();
    registry.advertise_topic("/chatter", "std_msgs/String", TopicFlags::default()).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let pub_addr = listener_addr(&listener);

    let pub_registry = Arc::clone(&registry);
    let publisher = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let conn = Connection::from_stream(stream).unwrap();
        let exit = Arc::new(AtomicBool::new(false));
        let result = accept_publisher_session(conn, &pub_registry, exit, |_session| Ok(()));
        assert!(result.is_err());
    });

    let bad_type = TypeDescriptor::new("std_msgs/String", "deadbeefdeadbeefdeadbeefdeadbeef");
    let exit = Arc::new(AtomicBool::new(false));
    let outcome = connect_subscriber_session(pub_addr, &registry, "/chatter", &bad_type, "/listener", Duration::from_secs(1), exit, |_session| Ok(()));

    publisher.join().unwrap();
    assert!(outcome.is_err());
}
