//! Service server: `WAIT_HDR -> PARSE_HDR -> if probe then
//! VALIDATE_AND_CLOSE else SEND_HDR -> REQ_LOOP -> CLOSED`.
//! Service caller: `CONNECT -> SEND_HDR -> RECV_HDR -> (REQ -> RESP)* ->
//! CLOSED`.

use std::{
    sync::{atomic::AtomicBool, Arc},
    time::Duration,
};

use uros_base::{Address, ErrorKind, TypeDescriptor, UrosError, UrosResult};
use uros_net::Connection;
use uros_registry::Registry;

use crate::framing;
use crate::header::Header;
use crate::session::Session;

const OK_SUCCESS: u8 = 1;
const OK_FAILURE: u8 = 0;

/// Accepts one service connection. `request_fn` is the application
/// service routine: it takes one request body and returns either the
/// response body or an error message to send back on the wire.
pub fn accept_service_session(
    mut conn: Connection,
    registry: &Registry,
    exit: Arc<AtomicBool>,
    request_fn: impl Fn(&[u8]) -> Result<Vec<u8>, String>,
) -> UrosResult<()> {
    let client_header = Header::read(&mut conn).map_err(UrosError::from)?;
    accept_service_session_with_header(client_header, conn, registry, exit, request_fn)
}

/// Same as [`accept_service_session`] but for a caller that has already
/// read the handshake header off `conn` to decide where to route it.
pub fn accept_service_session_with_header(
    client_header: Header,
    mut conn: Connection,
    registry: &Registry,
    exit: Arc<AtomicBool>,
    request_fn: impl Fn(&[u8]) -> Result<Vec<u8>, String>,
) -> UrosResult<()> {
    let peer = conn.peer_addr();
    let local = conn.local_addr();

    let service_name = client_header
        .service()
        .ok_or_else(|| UrosError::new(ErrorKind::Parse, "handshake missing service key"))?;

    let Some(entry) = registry.lookup_published_service(service_name) else {
        let reason = format!("not a server of {service_name}");
        let _ = Header::error_with(&reason).write(&mut conn);
        return Err(UrosError::new(ErrorKind::Parse, reason));
    };

    let requested_md5 = client_header.md5sum().unwrap_or("");
    if !entry.type_desc.md5_matches(requested_md5) {
        let reason = "md5sum mismatch".to_owned();
        let _ = Header::error_with(&reason).write(&mut conn);
        return Err(UrosError::new(ErrorKind::Parse, reason));
    }

    if client_header.probe() {
        let mut reply = Header::new();
        reply
            .insert("callerid", client_header.callerid().unwrap_or("").to_owned())
            .insert("service", service_name.to_owned())
            .insert("type", entry.type_desc.name.as_str().to_owned())
            .insert("md5sum", entry.type_desc.md5.as_str().to_owned());
        reply.write(&mut conn).map_err(UrosError::from)?;
        return Ok(());
    }

    let mut server_header = Header::new();
    server_header
        .insert("callerid", client_header.callerid().unwrap_or("").to_owned())
        .insert("type", entry.type_desc.name.as_str().to_owned())
        .insert("md5sum", entry.type_desc.md5.as_str().to_owned());
    server_header.write(&mut conn).map_err(UrosError::from)?;

    let persistent = client_header.persistent();
    let session_id = registry.add_session(service_name.to_owned(), local, peer);
    let mut session = Session::new(session_id, service_name.to_owned(), conn, exit);

    let result = (|| -> UrosResult<()> {
        loop {
            if session.should_exit() {
                return Ok(());
            }
            let request = match framing::read_message(&mut session.conn) {
                Ok(body) => body,
                Err(err) if err.kind == ErrorKind::Eof && persistent => return Ok(()),
                Err(err) => return Err(err),
            };
            match request_fn(&request) {
                Ok(response) => {
                    session.conn.send_all(&[OK_SUCCESS])?;
                    framing::write_message(&mut session.conn, &response)?;
                }
                Err(message) => {
                    session.conn.send_all(&[OK_FAILURE])?;
                    framing::write_message(&mut session.conn, message.as_bytes())?;
                }
            }
            if !persistent {
                return Ok(());
            }
        }
    })();

    registry.remove_session(session_id);
    result
}

/// One-shot (or, reused across calls, persistent) service caller
/// connection. Each `call` does one `REQ -> RESP` exchange.
pub struct ServiceCaller {
    conn: Connection,
}

impl ServiceCaller {
    pub fn connect(
        remote: Address,
        service: &str,
        type_desc: &TypeDescriptor,
        caller_id: &str,
        persistent: bool,
        timeout: Duration,
    ) -> UrosResult<Self> {
        let mut conn = Connection::connect(remote, timeout)?;
        conn.set_read_timeout(Some(timeout))?;
        conn.set_write_timeout(Some(timeout))?;

        let mut header = Header::new();
        header
            .insert("callerid", caller_id.to_owned())
            .insert("service", service.to_owned())
            .insert("md5sum", type_desc.md5.as_str().to_owned())
            .insert("persistent", if persistent { "1" } else { "0" });
        header.write(&mut conn).map_err(UrosError::from)?;

        let server_header = Header::read(&mut conn).map_err(UrosError::from)?;
        if let Some(reason) = server_header.error() {
            return Err(UrosError::new(ErrorKind::Parse, format!("service server rejected handshake: {reason}")));
        }
        let got_md5 = server_header.md5sum().unwrap_or("");
        if !type_desc.md5_matches(got_md5) {
            return Err(UrosError::new(ErrorKind::Parse, "service server md5sum mismatch"));
        }

        Ok(Self { conn })
    }

    /// Sends one request and waits for its response. `Ok(Err(message))`
    /// is a well-formed service-level failure; `Err(_)` is a transport
    /// or protocol error.
    pub fn call(&mut self, request: &[u8]) -> UrosResult<Result<Vec<u8>, String>> {
        framing::write_message(&mut self.conn, request)?;
        let mut ok_byte = [0u8; 1];
        self.conn.recv_all(&mut ok_byte)?;
        let body = framing::read_message(&mut self.conn)?;
        if ok_byte[0] == OK_SUCCESS {
            Ok(Ok(body.to_vec()))
        } else {
            Ok(Err(String::from_utf8_lossy(&body).into_owned()))
        }
    }
}
