//! Bounded-buffer HTTP/1.1 framing for the one XML-RPC body per connection
//! that the Master and Slave ever exchange. No keep-alive, no chunked
//! transfer encoding: one request, one response, one `Content-Length`.

use uros_net::Connection;

use crate::error::{XmlRpcError, XmlRpcResult};

/// Read granularity while hunting for the end of the header block.
const DEFAULT_READ_CHUNK: usize = 128;
/// Refuse to buffer more than this many header bytes; a well-formed
/// caller never sends anywhere near it.
const MAX_HEADER_BYTES: usize = 8 * 1024;

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

fn content_length(header: &str) -> XmlRpcResult<usize> {
    for line in header.split("\r\n") {
        let lower = line.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("content-length:") {
            return value
                .trim()
                .parse()
                .map_err(|_| XmlRpcError::Malformed(format!("bad content-length: {line}")));
        }
    }
    Err(XmlRpcError::Malformed("missing content-length header".to_owned()))
}

/// Reads header bytes off `conn` one chunk at a time until `\r\n\r\n` is
/// found or the cap is exceeded, then reads exactly `Content-Length` body
/// bytes (accounting for any body bytes the initial read already pulled
/// in past the header boundary).
fn read_message(conn: &mut Connection) -> XmlRpcResult<(String, String)> {
    let mut buf = Vec::with_capacity(DEFAULT_READ_CHUNK);
    let mut chunk = [0u8; DEFAULT_READ_CHUNK];

    let header_end = loop {
        if let Some(end) = find_header_end(&buf) {
            break end;
        }
        if buf.len() >= MAX_HEADER_BYTES {
            return Err(XmlRpcError::BoundsExceeded(MAX_HEADER_BYTES));
        }
        let n = conn.recv(&mut chunk)?;
        if n == 0 {
            return Err(XmlRpcError::Malformed("connection closed before headers completed".to_owned()));
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let header_text = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let needed = content_length(&header_text)?;

    let mut body = buf[header_end..].to_vec();
    if body.len() < needed {
        let mut rest = vec![0u8; needed - body.len()];
        conn.recv_all(&mut rest)?;
        body.extend_from_slice(&rest);
    } else {
        body.truncate(needed);
    }

    let body_text = String::from_utf8_lossy(&body).into_owned();
    Ok((header_text, body_text))
}

/// Reads one `POST` request and returns its body (the XML-RPC
/// `methodCall` document).
pub fn read_request(conn: &mut Connection) -> XmlRpcResult<String> {
    let (_header, body) = read_message(conn)?;
    Ok(body)
}

/// Reads one HTTP response and returns its body (the XML-RPC
/// `methodResponse` document).
pub fn read_response(conn: &mut Connection) -> XmlRpcResult<String> {
    let (_header, body) = read_message(conn)?;
    Ok(body)
}

pub fn write_request(conn: &mut Connection, path: &str, host: &str, body: &str) -> XmlRpcResult<()> {
    let message = format!(
        "POST {path} HTTP/1.1\r\n\
         User-Agent: uros-xmlrpc\r\n\
         Host: {host}\r\n\
         Content-Type: text/xml\r\n\
         Content-Length: {len}\r\n\r\n{body}",
        len = body.len()
    );
    conn.send_all(message.as_bytes())?;
    Ok(())
}

pub fn write_response(conn: &mut Connection, body: &str) -> XmlRpcResult<()> {
    let message = format!(
        "HTTP/1.1 200 OK\r\n\
         Server: uros-xmlrpc\r\n\
         Content-Type: text/xml\r\n\
         Content-Length: {len}\r\n\r\n{body}",
        len = body.len()
    );
    conn.send_all(message.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{net::TcpListener, thread, time::Duration};

    use uros_base::Address;

    use super::*;

    fn loopback_pair() -> (Connection, Connection) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
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
    fn request_round_trips_body() {
        let (mut server, mut client) = loopback_pair();
        let writer = thread::spawn(move || {
            write_request(&mut client, "/RPC2", "localhost:0", "<methodCall/>").unwrap();
        });
        let body = read_request(&mut server).unwrap();
        writer.join().unwrap();
        assert_eq!(body, "<methodCall/>");
    }

    #[test]
    fn response_round_trips_body_with_multibyte_content() {
        let (mut server, mut client) = loopback_pair();
        let payload = "<methodResponse>caf\u{e9}</methodResponse>";
        let writer = thread::spawn(move || {
            write_response(&mut server, payload).unwrap();
        });
        let body = read_response(&mut client).unwrap();
        writer.join().unwrap();
        assert_eq!(body, payload);
    }

    #[test]
    fn missing_content_length_is_malformed() {
        let (mut server, mut client) = loopback_pair();
        let writer = thread::spawn(move || {
            client.send_all(b"POST /RPC2 HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        });
        let err = read_request(&mut server).unwrap_err();
        writer.join().unwrap();
        assert!(matches!(err, XmlRpcError::Malformed(_)));
    }

    #[test]
    fn oversized_header_block_is_rejected() {
        let (mut server, mut client) = loopback_pair();
        let writer = thread::spawn(move || {
            let junk = "X-Pad: ".to_owned() + &"a".repeat(MAX_HEADER_BYTES + DEFAULT_READ_CHUNK) + "\r\n";
            let _ = client.send_all(junk.as_bytes());
        });
        let err = read_request(&mut server).unwrap_err();
        writer.join().unwrap();
        assert!(matches!(err, XmlRpcError::BoundsExceeded(_)));
    }
}
