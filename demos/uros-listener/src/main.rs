//! Subscribes to `/chatter` (`std_msgs/String`) and logs every message
//! that arrives. Exercises `uros_node::Node::subscribe_topic` end to end
//! against a real Master and real TCPROS publisher.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use clap::Parser;
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use tracing::info;
use uros_base::{Address, ErrorKind, TypeDescriptor, UrosResult};
use uros_node::{AppCallbacks, Node, NodeConfig};

#[derive(Parser, Debug)]
#[command(name = "uros-listener")]
struct Args {
    /// Node name registered with the Master.
    #[arg(long, default_value = "/listener")]
    node_name: String,

    /// Master XMLRPC address, host:port.
    #[arg(long, default_value = "127.0.0.1:11311")]
    master_addr: String,
}

struct ListenerCallbacks;
impl AppCallbacks for ListenerCallbacks {}

/// Inverse of the talker's `encode_ros_string`: a 4-byte LE length prefix
/// followed by UTF-8 bytes.
fn decode_ros_string(body: &[u8]) -> UrosResult<String> {
    let len = uros_base::read_le32(body.get(..4).ok_or_else(|| {
        uros_base::UrosError::new(ErrorKind::Parse, "std_msgs/String payload shorter than its length prefix")
    })?)? as usize;
    let text = body
        .get(4..4 + len)
        .ok_or_else(|| uros_base::UrosError::new(ErrorKind::Parse, "std_msgs/String payload truncated"))?;
    std::str::from_utf8(text)
        .map(str::to_owned)
        .map_err(|_| uros_base::UrosError::new(ErrorKind::Parse, "std_msgs/String payload is not valid utf-8"))
}

fn parse_addr(s: &str) -> Address {
    let (host, port) = s.rsplit_once(':').expect("master address must be host:port");
    let ip = uros_base::parse_ipv4_literal(host).expect("master address host must be an ipv4 literal");
    Address::new(ip, port.parse().expect("master address port must be numeric"))
}

fn main() -> UrosResult<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut config = NodeConfig::default();
    config.node_name = args.node_name.clone();
    config.master_addr = parse_addr(&args.master_addr).into();

    let node = Node::boot(config, Arc::new(ListenerCallbacks))?;
    info!(xmlrpc = %node.xmlrpc_addr(), tcpros = %node.tcpros_addr(), "listener node booted");

    let type_desc = TypeDescriptor::new("std_msgs/String", "992ce8a1687cec8c8bd883ec73ca41d1");
    node.subscribe_topic("/chatter", type_desc, move |session| loop {
        if session.should_exit() {
            return Ok(());
        }
        match uros_tcpros::read_message(&mut session.conn) {
            Ok(body) => match decode_ros_string(&body) {
                Ok(text) => info!(%text, "chatter"),
                Err(err) => return Err(err),
            },
            Err(err) if err.kind == ErrorKind::Timeout => continue,
            Err(err) => return Err(err),
        }
    })?;

    let shutdown = Arc::new(AtomicBool::new(false));
    flag::register(SIGINT, Arc::clone(&shutdown)).expect("failed to register SIGINT handler");
    flag::register(SIGTERM, Arc::clone(&shutdown)).expect("failed to register SIGTERM handler");

    while !shutdown.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(200));
    }

    node.shutdown("ctrl-c");
    node.run()
}
