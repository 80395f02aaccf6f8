//! End-to-end node lifecycle tests: a fake Master plus two real `Node`s
//! (publisher and subscriber) talking real XMLRPC and TCPROS over
//! loopback sockets.

use std::{
    net::TcpListener,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use uros_base::{Address, TopicFlags, TypeDescriptor, UrosResult};
use uros_net::Connection;
use uros_node::{AppCallbacks, Node, NodeConfig, NodeState};
use uros_xmlrpc::{parse_method_call, write_method_response, MethodCall, Reply, Value};

struct QuietCallbacks;
impl AppCallbacks for QuietCallbacks {}

fn listener_addr(listener: &TcpListener) -> Address {
    Address::from(match listener.local_addr().unwrap() {
        std::net::SocketAddr::V4(a) => a,
        _ => unreachable!(),
    })
}

/// A fake Master that services `registerPublisher`/`registerSubscriber`
/// forever on one thread, remembering the one publisher caller_api it's
/// seen so a later `registerSubscriber` can hand it back.
fn spawn_fake_master() -> Address {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener_addr(&listener);
    let known_publisher = Arc::new(Mutex::new(None::<String>));

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let mut conn = Connection::from_stream(stream).unwrap();
            let body = uros_xmlrpc::read_request(&mut conn).unwrap();
            let call = parse_method_call(&body).unwrap();
            let reply = handle_call(&call, &known_publisher);
            let response_body = write_method_response(&reply.into_value());
            uros_xmlrpc::write_response(&mut conn, &response_body).unwrap();
        }
    });

    addr
}

fn handle_call(call: &MethodCall, known_publisher: &Arc<Mutex<Option<String>>>) -> Reply {
    match call.name.as_str() {
        "registerPublisher" => {
            if let Some(caller_api) = call.params.get(3).and_then(Value::as_str) {
                *known_publisher.lock().unwrap() = Some(caller_api.to_owned());
            }
            Reply::ok("registered", Value::Array(vec![]))
        }
        "registerSubscriber" => {
            let publishers = known_publisher
                .lock()
                .unwrap()
                .clone()
                .map(|uri| vec![Value::Str(uri)])
                .unwrap_or_default();
            Reply::ok("registered", Value::Array(publishers))
        }
        "unregisterPublisher" | "unregisterSubscriber" => Reply::ok("unregistered", Value::Int(1)),
        other => Reply::error(format!("fake master doesn't implement {other}")),
    }
}

fn boot_node(master_addr: Address, name: &str) -> Node {
    let mut config = NodeConfig::default();
    config.node_name = name.to_owned();
    config.master_addr = master_addr.into();
    config.xmlrpc_listen = Address::loopback(0).into();
    config.tcpros_listen = Address::loopback(0).into();
    config.rosout_topic = None;
    Node::boot(config, Arc::new(QuietCallbacks)).unwrap()
}

fn chatter_type() -> TypeDescriptor {
    TypeDescriptor::new("std_msgs/String", "992ce8a1687cec8c8bd883ec73ca41d1")
}

#[test]
fn publish_subscribe_round_trip_delivers_one_message() {
    let master_addr = spawn_fake_master();

    let talker = boot_node(master_addr, "/talker");
    let (tx, rx) = std::sync::mpsc::channel::<Vec<u8>>();
    talker
        .advertise_topic("/chatter", chatter_type(), TopicFlags::default(), move |session| {
            uros_tcpros::write_message(&mut session.conn, b"hello")?;
            while !session.should_exit() {
                thread::sleep(Duration::from_millis(20));
            }
            Ok(())
        })
        .unwrap();

    let listener = boot_node(master_addr, "/listener");
    let tx_clone = tx.clone();
    listener
        .subscribe_topic("/chatter", chatter_type(), move |session| {
            let body = uros_tcpros::read_message(&mut session.conn)?;
            let _ = tx_clone.send(body.to_vec());
            while !session.should_exit() {
                thread::sleep(Duration::from_millis(20));
            }
            Ok(())
        })
        .unwrap();

    let received = rx.recv_timeout(Duration::from_secs(5)).expect("message should arrive");
    assert_eq!(received, b"hello");

    listener.shutdown("test done");
    listener.run().unwrap();
    talker.shutdown("test done");
    talker.run().unwrap();
}

#[test]
fn boot_without_rosout_never_contacts_an_unreachable_master() -> UrosResult<()> {
    let unreachable = Address::loopback(1);
    let mut config = NodeConfig::default();
    config.node_name = "/silent".to_owned();
    config.master_addr = unreachable.into();
    config.xmlrpc_listen = Address::loopback(0).into();
    config.tcpros_listen = Address::loopback(0).into();
    config.rosout_topic = None;

    let node = Node::boot(config, Arc::new(QuietCallbacks))?;
    assert_eq!(node.state(), NodeState::Running);
    node.shutdown("done");
    node.run()
}

#[test]
fn shutdown_called_twice_before_run_is_not_an_error() {
    let master_addr = spawn_fake_master();
    let node = boot_node(master_addr, "/lonely");
    node.shutdown("first");
    node.shutdown("second");
    node.run().unwrap();
}
