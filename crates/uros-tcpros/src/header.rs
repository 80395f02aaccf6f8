//! Handshake header: a 4-byte LE total length, then one or more
//! `KEY=VALUE` pairs, each itself 4-byte-length prefixed. Keys are
//! case-sensitive and looked up by exact string match.

use uros_base::UString;
use uros_net::Connection;

use crate::error::{TcprosError, TcprosResult};
use crate::framing;

/// Refuses to buffer more than this many header bytes per block.
pub const MAX_HEADER_BLOCK: usize = 64 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pairs: Vec<(UString, UString)>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<UString>, value: impl Into<UString>) -> &mut Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k.as_str() == key).map(|(_, v)| v.as_str())
    }

    pub fn callerid(&self) -> Option<&str> {
        self.get("callerid")
    }
    pub fn topic(&self) -> Option<&str> {
        self.get("topic")
    }
    pub fn service(&self) -> Option<&str> {
        self.get("service")
    }
    pub fn type_name(&self) -> Option<&str> {
        self.get("type")
    }
    pub fn md5sum(&self) -> Option<&str> {
        self.get("md5sum")
    }
    pub fn message_definition(&self) -> Option<&str> {
        self.get("message_definition")
    }
    pub fn latching(&self) -> bool {
        self.get("latching") == Some("1")
    }
    pub fn persistent(&self) -> bool {
        self.get("persistent") == Some("1")
    }
    pub fn tcp_nodelay(&self) -> bool {
        self.get("tcp_nodelay") == Some("1")
    }
    pub fn request_type(&self) -> Option<&str> {
        self.get("request_type")
    }
    pub fn response_type(&self) -> Option<&str> {
        self.get("response_type")
    }
    pub fn probe(&self) -> bool {
        self.get("probe") == Some("1")
    }
    pub fn error(&self) -> Option<&str> {
        self.get("error")
    }

    pub fn error_with(reason: impl Into<String>) -> Self {
        let mut header = Self::new();
        header.insert("error", reason.into());
        header
    }

    fn encode_body(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for (key, value) in &self.pairs {
            let pair = format!("{}={}", key.as_str(), value.as_str());
            let mut pair_buf = Vec::with_capacity(4 + pair.len());
            uros_base::write_le32(&mut pair_buf, pair.len() as u32);
            pair_buf.extend_from_slice(pair.as_bytes());
            body.extend_from_slice(&pair_buf);
        }
        body
    }

    /// Writes the full framed block (outer length prefix included).
    pub fn write(&self, conn: &mut Connection) -> TcprosResult<()> {
        let body = self.encode_body();
        framing::write_message(conn, &body).map_err(TcprosError::Io)
    }

    /// Reads one framed header block, enforcing the empty/oversized
    /// boundary checks the handshake calls for.
    pub fn read(conn: &mut Connection) -> TcprosResult<Self> {
        let len = framing::read_u32(conn).map_err(TcprosError::Io)? as usize;
        if len == 0 {
            return Err(TcprosError::HeaderEmpty);
        }
        if len > MAX_HEADER_BLOCK {
            return Err(TcprosError::HeaderTooLarge(len));
        }
        let mut body = vec![0u8; len];
        conn.recv_all(&mut body).map_err(TcprosError::Io)?;

        let mut pairs = Vec::new();
        let mut pos = 0usize;
        while pos < body.len() {
            if pos + 4 > body.len() {
                return Err(TcprosError::Malformed("truncated pair length".to_owned()));
            }
            let pair_len = uros_base::read_le32(&body[pos..pos + 4])
                .map_err(|err| TcprosError::Malformed(err.to_string()))? as usize;
            pos += 4;
            if pos + pair_len > body.len() {
                return Err(TcprosError::Malformed("truncated pair body".to_owned()));
            }
            let pair_text = std::str::from_utf8(&body[pos..pos + pair_len])
                .map_err(|_| TcprosError::Malformed("pair is not valid utf-8".to_owned()))?;
            let (key, value) = pair_text
                .split_once('=')
                .ok_or_else(|| TcprosError::Malformed(format!("pair missing '=': {pair_text}")))?;
            pairs.push((UString::from(key.to_owned()), UString::from(value.to_owned())));
            pos += pair_len;
        }
        Ok(Self { pairs })
    }
}
