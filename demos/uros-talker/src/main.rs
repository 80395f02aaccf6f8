//! Publishes `std_msgs/String` on `/chatter` once per tick, counting up.
//! Exercises `uros_node::Node::advertise_topic` end to end against a real
//! Master and real TCPROS subscribers.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
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
use uros_base::{Address, TopicFlags, TypeDescriptor, UrosResult};
use uros_node::{AppCallbacks, Node, NodeConfig};

/// Sample publisher: advertises `/chatter` and sends "hello N" at a fixed rate.
#[derive(Parser, Debug)]
#[command(name = "uros-talker")]
struct Args {
    /// Node name registered with the Master.
    #[arg(long, default_value = "/talker")]
    node_name: String,

    /// Master XMLRPC address, host:port.
    #[arg(long, default_value = "127.0.0.1:11311")]
    master_addr: String,

    /// Publish rate in Hz.
    #[arg(long, default_value_t = 1.0)]
    rate: f64,
}

struct TalkerCallbacks;
impl AppCallbacks for TalkerCallbacks {}

/// `std_msgs/String`'s wire serialization: a 4-byte LE length prefix
/// followed by the UTF-8 bytes, no terminator.
fn encode_ros_string(text: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + text.len());
    uros_base::write_le32(&mut buf, text.len() as u32);
    buf.extend_from_slice(text.as_bytes());
    buf
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

    let node = Node::boot(config, Arc::new(TalkerCallbacks))?;
    info!(xmlrpc = %node.xmlrpc_addr(), tcpros = %node.tcpros_addr(), "talker node booted");

    let type_desc = TypeDescriptor::new("std_msgs/String", "992ce8a1687cec8c8bd883ec73ca41d1");
    let counter = Arc::new(AtomicU64::new(0));
    let period = Duration::from_secs_f64(1.0 / args.rate.max(0.01));

    node.advertise_topic("/chatter", type_desc, TopicFlags::default(), move |session| {
        while !session.should_exit() {
            let n = counter.fetch_add(1, Ordering::Relaxed);
            let payload = encode_ros_string(&format!("hello {n}"));
            uros_tcpros::write_message(&mut session.conn, &payload)?;
            thread::sleep(period);
        }
        Ok(())
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
