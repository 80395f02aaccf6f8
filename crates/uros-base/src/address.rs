use std::{
    fmt,
    net::{Ipv4Addr, SocketAddrV4},
};

use crate::error::{ErrorKind, UrosError, UrosResult};

/// IPv4 dotted quad + port, the wire-level peer address type used
/// throughout the registry, the XML-RPC `requestTopic` reply, and TCPROS
/// handshakes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl Address {
    pub const fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    pub const fn unspecified(port: u16) -> Self {
        Self { ip: Ipv4Addr::UNSPECIFIED, port }
    }

    pub const fn loopback(port: u16) -> Self {
        Self { ip: Ipv4Addr::LOCALHOST, port }
    }

    pub fn to_socket_addr(self) -> SocketAddrV4 {
        SocketAddrV4::new(self.ip, self.port)
    }
}

impl From<SocketAddrV4> for Address {
    fn from(addr: SocketAddrV4) -> Self {
        Self { ip: *addr.ip(), port: addr.port() }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

/// Parses a decimal dotted-quad IPv4 literal (`"a.b.c.d"`), rejecting
/// out-of-range octets and malformed separators. No DNS resolution —
/// the spec calls for a literal parser, not a resolver.
pub fn parse_ipv4_literal(s: &str) -> UrosResult<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = s.split('.');

    for octet in octets.iter_mut() {
        let part = parts
            .next()
            .ok_or_else(|| UrosError::new(ErrorKind::Parse, format!("short ipv4 literal: {s}")))?;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(UrosError::new(ErrorKind::Parse, format!("malformed octet: {part}")));
        }
        let value: u32 = part
            .parse()
            .map_err(|_| UrosError::new(ErrorKind::Parse, format!("non-numeric octet: {part}")))?;
        if value > 255 {
            return Err(UrosError::new(ErrorKind::Parse, format!("octet out of range: {value}")));
        }
        *octet = value as u8;
    }

    if parts.next().is_some() {
        return Err(UrosError::new(ErrorKind::Parse, format!("too many octets: {s}")));
    }

    Ok(Ipv4Addr::from(octets))
}

/// Writes `x` as 4 little-endian bytes.
pub fn write_le32(buf: &mut Vec<u8>, x: u32) {
    buf.extend_from_slice(&x.to_le_bytes());
}

/// Reads a little-endian `u32` from the front of a 4-byte slice.
pub fn read_le32(bytes: &[u8]) -> UrosResult<u32> {
    let arr: [u8; 4] =
        bytes.try_into().map_err(|_| UrosError::new(ErrorKind::Parse, "short le32 buffer"))?;
    Ok(u32::from_le_bytes(arr))
}
