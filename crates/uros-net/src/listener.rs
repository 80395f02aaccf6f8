use std::net::TcpListener as StdTcpListener;

use uros_base::{Address, ErrorKind, UrosError, UrosResult};

use crate::connection::Connection;

/// Listening socket. `bind` binds and starts listening in one step (the
/// OS default backlog is used — `std` doesn't expose a separate `listen`
/// call); `accept` blocks until a peer connects or the listener is
/// aborted from another thread via a cloned handle.
pub struct Listener {
    inner: StdTcpListener,
    local: Address,
}

impl Listener {
    /// `backlog` is accepted for documentation parity with the
    /// bind/listen/accept contract but has no effect: `std::net` always
    /// listens with the platform default backlog.
    pub fn bind(addr: Address, _backlog: i32) -> UrosResult<Self> {
        let inner = StdTcpListener::bind(addr.to_socket_addr())?;
        let local = Address::from(match inner.local_addr()? {
            std::net::SocketAddr::V4(a) => a,
            std::net::SocketAddr::V6(_) => {
                return Err(UrosError::new(ErrorKind::SysError, "ipv6 not supported"))
            }
        });
        Ok(Self { inner, local })
    }

    pub fn local_addr(&self) -> Address {
        self.local
    }

    /// Blocks until a peer connects. Returns the accepted connection and
    /// its remote address.
    pub fn accept(&self) -> UrosResult<(Connection, Address)> {
        let (stream, _peer) = self.inner.accept()?;
        let conn = Connection::from_stream(stream)?;
        let peer = conn.peer_addr();
        Ok((conn, peer))
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;

    #[test]
    fn accept_returns_connected_peer() {
        let listener = Listener::bind(Address::loopback(0), 16).unwrap();
        let addr = listener.local_addr();

        let client = thread::spawn(move || {
            Connection::connect(addr, Duration::from_secs(1)).unwrap()
        });

        let (server, peer) = listener.accept().unwrap();
        let client = client.join().unwrap();
        assert_eq!(peer.ip, client.local_addr().ip);
        assert!(server.is_valid());
    }
}
