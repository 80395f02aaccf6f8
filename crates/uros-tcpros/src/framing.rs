//! Little-endian length-prefixed framing shared by handshake headers and
//! message/request/response payloads. All integers are LE u32, per the
//! wire format.

use bytes::{Bytes, BytesMut};
use uros_base::{read_le32, write_le32, UrosResult};
use uros_net::Connection;

pub fn read_u32(conn: &mut Connection) -> UrosResult<u32> {
    let mut buf = [0u8; 4];
    conn.recv_all(&mut buf)?;
    read_le32(&buf)
}

pub fn write_u32(conn: &mut Connection, value: u32) -> UrosResult<()> {
    let mut buf = Vec::with_capacity(4);
    write_le32(&mut buf, value);
    conn.send_all(&buf)
}

/// Reads one length-prefixed payload: 4-byte LE length, then that many
/// body bytes. Returned as `Bytes` so the application handler can hold
/// onto it without an extra copy past this read.
pub fn read_message(conn: &mut Connection) -> UrosResult<Bytes> {
    let len = read_u32(conn)? as usize;
    let mut body = BytesMut::zeroed(len);
    conn.recv_all(&mut body)?;
    Ok(body.freeze())
}

/// Writes one length-prefixed payload.
pub fn write_message(conn: &mut Connection, body: &[u8]) -> UrosResult<()> {
    write_u32(conn, body.len() as u32)?;
    conn.send_all(body)
}
