use statediff_adt::AdtError;
use statediff_types::TypeError;
use thiserror::Error;

/// Errors raised by a token sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("unexpected {token} token: {reason}")]
    Unexpected { token: &'static str, reason: &'static str },

    #[error("non-finite float {0} has no JSON form")]
    NonFiniteFloat(f64),

    #[error("token stream ended inside an open container")]
    Incomplete,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors raised while marshaling a node.
#[derive(Debug, Error)]
pub enum MarshalError {
    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("invalid address at {path}: {source}")]
    InvalidAddress { path: String, source: TypeError },

    #[error("invalid cid at {path}: {source}")]
    InvalidCid { path: String, source: TypeError },

    #[error("invalid bitfield at {path}: {source}")]
    InvalidBitField { path: String, source: AdtError },

    #[error("link emission only supported for CID-typed links")]
    UnsupportedLink,

    #[error("marshal nesting deeper than {max}")]
    DepthExceeded { max: usize },
}

/// Result alias for marshal operations.
pub type MarshalResult<T> = Result<T, MarshalError>;
