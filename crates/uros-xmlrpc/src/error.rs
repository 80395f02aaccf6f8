use thiserror::Error;

/// Errors from the XML-RPC parser/streamer. All map onto `BAD_PARAM` or
/// `CONN_REFUSED` at the Slave boundary (see `uros_base::ErrorKind`).
#[derive(Debug, Error)]
pub enum XmlRpcError {
    #[error("malformed xml: {0}")]
    Malformed(String),
    #[error("unexpected tag: expected {expected}, got {got}")]
    UnexpectedTag { expected: String, got: String },
    #[error("value out of range: {0}")]
    ValueRange(String),
    #[error("header block length 0 or exceeds the {0}-byte cap")]
    BoundsExceeded(usize),
    #[error("io error")]
    Io(#[from] std::io::Error),
}

pub type XmlRpcResult<T> = std::result::Result<T, XmlRpcError>;

impl From<XmlRpcError> for uros_base::UrosError {
    fn from(err: XmlRpcError) -> Self {
        let kind = match &err {
            XmlRpcError::Io(_) => uros_base::ErrorKind::ConnRefused,
            _ => uros_base::ErrorKind::BadParam,
        };
        uros_base::UrosError::with_source(kind, "xml-rpc error", err)
    }
}
