use std::{
    io::{Read, Write},
    net::{Shutdown, TcpStream},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tracing::debug;
use uros_base::{Address, ErrorKind, UrosError, UrosResult};

/// One live stream connection. Owned by whichever worker thread is
/// servicing it; on every exit path (including panics unwinding through
/// `Drop`) the underlying socket is released.
///
/// `is_valid` is backed by an atomic so it stays truthful across a
/// concurrent `abort()` call from another thread (the session's own exit
/// flag kicks a blocked peer exactly this way).
pub struct Connection {
    stream: TcpStream,
    local: Address,
    remote: Address,
    valid: Arc<AtomicBool>,
}

impl Connection {
    pub fn connect(remote: Address, timeout: Duration) -> UrosResult<Self> {
        let stream = TcpStream::connect_timeout(&remote.to_socket_addr().into(), timeout)?;
        Self::from_stream(stream)
    }

    /// Wraps an already-connected/accepted stream (the listener's
    /// `accept()` path).
    pub fn from_stream(stream: TcpStream) -> UrosResult<Self> {
        stream.set_nodelay(true)?;
        let local = Address::from(match stream.local_addr()? {
            std::net::SocketAddr::V4(a) => a,
            std::net::SocketAddr::V6(_) => {
                return Err(UrosError::new(ErrorKind::SysError, "ipv6 not supported"))
            }
        });
        let remote = Address::from(match stream.peer_addr()? {
            std::net::SocketAddr::V4(a) => a,
            std::net::SocketAddr::V6(_) => {
                return Err(UrosError::new(ErrorKind::SysError, "ipv6 not supported"))
            }
        });
        Ok(Self { stream, local, remote, valid: Arc::new(AtomicBool::new(true)) })
    }

    pub fn local_addr(&self) -> Address {
        self.local
    }

    pub fn peer_addr(&self) -> Address {
        self.remote
    }

    /// Truthful across a concurrent `abort()`/`close_write()` from
    /// another thread.
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> UrosResult<()> {
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> UrosResult<()> {
        self.stream.set_write_timeout(timeout)?;
        Ok(())
    }

    /// One `recv`: returns the number of bytes read, `0` on orderly EOF.
    pub fn recv(&mut self, buf: &mut [u8]) -> UrosResult<usize> {
        Ok(self.stream.read(buf)?)
    }

    /// One `send`.
    pub fn send(&mut self, buf: &[u8]) -> UrosResult<usize> {
        Ok(self.stream.write(buf)?)
    }

    /// Loops until `buf.len()` bytes have been read or an error occurs
    /// (including a `0`-byte read, surfaced as `Eof`).
    pub fn recv_all(&mut self, buf: &mut [u8]) -> UrosResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.stream.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(UrosError::new(ErrorKind::Eof, "peer closed mid-read"));
            }
            filled += n;
        }
        Ok(())
    }

    /// Loops until all of `buf` has been written or an error occurs.
    pub fn send_all(&mut self, buf: &[u8]) -> UrosResult<()> {
        let mut sent = 0;
        while sent < buf.len() {
            let n = self.stream.write(&buf[sent..])?;
            if n == 0 {
                return Err(UrosError::new(ErrorKind::ConnReset, "peer closed mid-write"));
            }
            sent += n;
        }
        Ok(())
    }

    /// Half-close: shuts down the write side, then drains any remaining
    /// inbound bytes so the peer's own close is observed cleanly.
    pub fn graceful_close(&mut self) -> UrosResult<()> {
        self.valid.store(false, Ordering::Release);
        self.stream.shutdown(Shutdown::Write)?;
        let mut sink = [0u8; 256];
        loop {
            match self.stream.read(&mut sink) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Hard close: shuts down both directions immediately. This is the
    /// mechanism used to unblock a peer blocked inside `recv_all`/`recv`
    /// when that peer's exit flag is set.
    pub fn abort(&mut self) {
        self.valid.store(false, Ordering::Release);
        if let Err(err) = self.stream.shutdown(Shutdown::Both) {
            debug!(?err, "abort: shutdown failed (socket likely already closed)");
        }
    }

    /// Clones the underlying socket handle. The returned `Connection`
    /// shares this one's validity flag: an `abort()` through either
    /// handle is observed by both, which is what lets one thread kick a
    /// peer blocked in `recv_all` on the other handle.
    pub fn try_clone(&self) -> UrosResult<Connection> {
        let stream = self.stream.try_clone()?;
        Ok(Connection { stream, local: self.local, remote: self.remote, valid: Arc::clone(&self.valid) })
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.valid.load(Ordering::Acquire) {
            let _ = self.stream.shutdown(Shutdown::Both);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{net::TcpListener as StdTcpListener, thread};

    use super::*;

    fn loopback_pair() -> (Connection, Connection) {
        let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        let addr = Address::from(match listener.local_addr().unwrap() {
            std::net::SocketAddr::V4(a) => a,
            _ => unreachable!(),
        });
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            Connection::from_stream(stream).unwrap()
        });
        let client = Connection::connect(addr, Duration::from_secs(1)).unwrap();
        (server.join().unwrap(), client)
    }

    #[test]
    fn send_all_then_recv_all_round_trips() {
        let (mut server, mut client) = loopback_pair();
        client.send_all(b"hello").unwrap();
        let mut buf = [0u8; 5];
        server.recv_all(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn recv_all_fails_on_short_close() {
        let (mut server, mut client) = loopback_pair();
        client.send_all(b"hi").unwrap();
        client.abort();
        let mut buf = [0u8; 10];
        let err = server.recv_all(&mut buf).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Eof | ErrorKind::ConnReset));
    }

    #[test]
    fn timeout_leaves_socket_valid() {
        let (mut server, _client) = loopback_pair();
        server.set_read_timeout(Some(Duration::from_millis(50))).unwrap();
        let mut buf = [0u8; 4];
        let err = server.recv_all(&mut buf).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(server.is_valid());
    }

    #[test]
    fn abort_is_observed_by_concurrent_reader() {
        let (mut server, _client) = loopback_pair();
        let aborter = server.try_clone().unwrap();
        let server_valid = thread::spawn(move || {
            let mut buf = [0u8; 8];
            let result = server.recv_all(&mut buf);
            (result.is_err(), server.is_valid())
        });
        thread::sleep(Duration::from_millis(20));
        let mut aborter = aborter;
        aborter.abort();
        let (errored, valid) = server_valid.join().unwrap();
        assert!(errored);
        assert!(!valid);
    }
}
