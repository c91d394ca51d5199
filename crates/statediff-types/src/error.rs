use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid varint: {0}")]
    InvalidVarint(&'static str),

    #[error("invalid {base} character: {ch:?}")]
    InvalidMultibase { base: &'static str, ch: char },

    #[error("unsupported multibase prefix: {0:?}")]
    UnsupportedMultibase(char),

    #[error("invalid multihash: {0}")]
    InvalidMultihash(String),

    #[error("invalid cid: {0}")]
    InvalidCid(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("unknown address protocol: {0}")]
    UnknownAddressProtocol(u8),

    #[error("address checksum mismatch")]
    AddressChecksum,

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
