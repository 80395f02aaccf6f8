use thiserror::Error;

/// The error kinds from the node runtime's error design. These are kinds,
/// not Rust types — every fallible call in the workspace returns a
/// [`UrosError`] wrapping one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Ok,
    Timeout,
    NotImplemented,
    NoBuffer,
    /// Malformed wire input (XML-RPC or TCPROS framing).
    Parse,
    Eof,
    /// Semantic rejection by an application callback or registry check.
    BadParam,
    ConnRefused,
    ConnReset,
    NotConnected,
    /// Name not found in a registry catalog.
    MapMiss,
    /// Registry catalog at capacity.
    MapFull,
    NoMemory,
    /// Resource contested (pool exhausted, handoff slot busy).
    Busy,
    /// Cooperative cancellation observed.
    Forced,
    /// Underlying platform/I/O error.
    SysError,
}

impl ErrorKind {
    /// Maps a session/registry level error kind onto the three-element
    /// `[code, statusMessage, value]` XML-RPC response code used throughout
    /// the Slave API (-1 error, 0 failure, 1 success).
    pub fn as_rpc_code(self) -> i32 {
        match self {
            ErrorKind::Ok => 1,
            ErrorKind::Parse | ErrorKind::SysError => -1,
            _ => 0,
        }
    }
}

#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct UrosError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl UrosError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), source: None }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self { kind, message: message.into(), source: Some(Box::new(source)) }
    }
}

impl From<std::io::Error> for UrosError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => ErrorKind::Timeout,
            std::io::ErrorKind::ConnectionRefused => ErrorKind::ConnRefused,
            std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe => {
                ErrorKind::ConnReset
            }
            std::io::ErrorKind::NotConnected => ErrorKind::NotConnected,
            std::io::ErrorKind::UnexpectedEof => ErrorKind::Eof,
            _ => ErrorKind::SysError,
        };
        UrosError::with_source(kind, "io error", err)
    }
}

pub type UrosResult<T> = std::result::Result<T, UrosError>;
