//! Subscriber connect: `CONNECT -> SEND_HDR -> RECV_HDR -> VALIDATE ->
//! STREAM_LOOP -> CLOSED`.

use std::{
    sync::{atomic::AtomicBool, Arc},
    time::Duration,
};

use tracing::warn;
use uros_base::{Address, ErrorKind, TypeDescriptor, UrosError, UrosResult};
use uros_net::Connection;
use uros_registry::Registry;

use crate::header::Header;
use crate::session::Session;

/// Opens a socket to a publisher's TCPROS address (as returned by
/// `requestTopic`), performs the handshake, then hands the session to
/// `subscribe_fn` — the application subscriber routine.
#[allow(clippy::too_many_arguments)]
pub fn connect_subscriber_session(
    remote: Address,
    registry: &Registry,
    topic: &str,
    type_desc: &TypeDescriptor,
    caller_id: &str,
    timeout: Duration,
    exit: Arc<AtomicBool>,
    subscribe_fn: impl FnOnce(&mut Session) -> UrosResult<()>,
) -> UrosResult<()> {
    let mut conn = Connection::connect(remote, timeout)?;
    conn.set_read_timeout(Some(timeout))?;
    conn.set_write_timeout(Some(timeout))?;

    let mut client_header = Header::new();
    client_header
        .insert("callerid", caller_id.to_owned())
        .insert("topic", topic.to_owned())
        .insert("type", type_desc.name.as_str().to_owned())
        .insert("md5sum", type_desc.md5.as_str().to_owned())
        .insert("tcp_nodelay", "0");
    client_header.write(&mut conn).map_err(UrosError::from)?;

    let server_header = Header::read(&mut conn).map_err(UrosError::from)?;

    if let Some(reason) = server_header.error() {
        return Err(UrosError::new(ErrorKind::Parse, format!("publisher rejected handshake: {reason}")));
    }
    let got_md5 = server_header.md5sum().unwrap_or("");
    if !type_desc.md5_matches(got_md5) {
        return Err(UrosError::new(ErrorKind::Parse, "publisher md5sum mismatch"));
    }
    let got_type = server_header.type_name().unwrap_or("");
    if !type_desc.type_matches(got_type) {
        return Err(UrosError::new(ErrorKind::Parse, "publisher type mismatch"));
    }
    if server_header.topic() != Some(topic) {
        return Err(UrosError::new(ErrorKind::Parse, "publisher topic mismatch"));
    }

    let local = conn.local_addr();
    let session_id = registry.add_session(topic.to_owned(), local, remote);
    let mut session = Session::new(session_id, topic.to_owned(), conn, exit);
    let result = subscribe_fn(&mut session);
    registry.remove_session(session_id);
    if let Err(ref err) = result {
        warn!(topic, ?remote, ?err, "subscriber session ended with error");
    }
    result
}
