use thiserror::Error;
use uros_base::{ErrorKind, UrosError};

/// Errors specific to TCPROS framing and handshake validation. All map
/// onto `Parse` at the session boundary except `Io`, which keeps the
/// underlying I/O kind.
#[derive(Debug, Error)]
pub enum TcprosError {
    #[error("header block length is 0")]
    HeaderEmpty,
    #[error("header block length {0} exceeds the configured cap")]
    HeaderTooLarge(usize),
    #[error("malformed header pair: {0}")]
    Malformed(String),
    #[error("handshake mismatch: {0}")]
    HandshakeMismatch(String),
    #[error(transparent)]
    Io(#[from] UrosError),
}

pub type TcprosResult<T> = std::result::Result<T, TcprosError>;

impl From<TcprosError> for UrosError {
    fn from(err: TcprosError) -> Self {
        match err {
            TcprosError::Io(inner) => inner,
            other => UrosError::with_source(ErrorKind::Parse, "tcpros error", other),
        }
    }
}
