//! Publisher accept: `WAIT_HDR -> PARSE_HDR -> VALIDATE -> SEND_HDR ->
//! STREAM_LOOP -> CLOSED`.

use std::sync::{atomic::AtomicBool, Arc};

use tracing::{debug, warn};
use uros_base::{ErrorKind, UrosError, UrosResult};
use uros_net::Connection;
use uros_registry::Registry;

use crate::header::Header;
use crate::session::Session;

/// Accepts one subscriber connection for a topic we publish. `publish_fn`
/// is the application publisher routine; it owns the STREAM_LOOP and
/// returns when `session.should_exit()` or on I/O error.
pub fn accept_publisher_session(
    mut conn: Connection,
    registry: &Registry,
    exit: Arc<AtomicBool>,
    publish_fn: impl FnOnce(&mut Session) -> UrosResult<()>,
) -> UrosResult<()> {
    let peer = conn.peer_addr();

    let client_header = Header::read(&mut conn).map_err(|err| {
        debug!(?peer, ?err, "publisher accept: header parse failed");
        UrosError::from(err)
    })?;

    accept_publisher_session_with_header(client_header, conn, registry, exit, publish_fn)
}

/// Same as [`accept_publisher_session`] but for a caller (typically a
/// dispatch loop routing several session kinds through one listener) that
/// has already read the handshake header off `conn` to decide where to
/// route it.
pub fn accept_publisher_session_with_header(
    client_header: Header,
    mut conn: Connection,
    registry: &Registry,
    exit: Arc<AtomicBool>,
    publish_fn: impl FnOnce(&mut Session) -> UrosResult<()>,
) -> UrosResult<()> {
    let peer = conn.peer_addr();
    let local = conn.local_addr();

    let topic = client_header
        .topic()
        .ok_or_else(|| UrosError::new(ErrorKind::Parse, "handshake missing topic key"))?;

    let Some(entry) = registry.lookup_published_topic(topic) else {
        let reason = format!("not a publisher of {topic}");
        let _ = Header::error_with(&reason).write(&mut conn);
        return Err(UrosError::new(ErrorKind::Parse, reason));
    };

    let requested_md5 = client_header.md5sum().unwrap_or("");
    let requested_type = client_header.type_name().unwrap_or("");
    if !entry.type_desc.md5_matches(requested_md5) {
        let reason = "md5sum mismatch".to_owned();
        let _ = Header::error_with(&reason).write(&mut conn);
        return Err(UrosError::new(ErrorKind::Parse, reason));
    }
    if !entry.type_desc.type_matches(requested_type) {
        let reason = format!("type mismatch: expected {}", entry.type_desc.name.as_str());
        let _ = Header::error_with(&reason).write(&mut conn);
        return Err(UrosError::new(ErrorKind::Parse, reason));
    }

    let mut server_header = Header::new();
    server_header
        .insert("callerid", client_header.callerid().unwrap_or("").to_owned())
        .insert("topic", topic.to_owned())
        .insert("type", entry.type_desc.name.as_str().to_owned())
        .insert("md5sum", entry.type_desc.md5.as_str().to_owned())
        .insert("latching", if entry.flags.latched { "1" } else { "0" });
    server_header.write(&mut conn).map_err(UrosError::from)?;

    let session_id = registry.add_session(topic.to_owned(), local, peer);
    let mut session = Session::new(session_id, topic.to_owned(), conn, exit);
    let result = publish_fn(&mut session);
    registry.remove_session(session_id);
    if let Err(ref err) = result {
        warn!(?peer, topic, ?err, "publisher session ended with error");
    }
    result
}
