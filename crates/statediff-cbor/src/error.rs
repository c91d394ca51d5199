use thiserror::Error;

use crate::decoder::Major;

/// Error type for DAG-CBOR decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CborError {
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("expected {expected} at offset {offset}, found {found}")]
    UnexpectedMajor {
        expected: &'static str,
        found: Major,
        offset: usize,
    },

    #[error("reserved additional information {minor} at offset {offset}")]
    ReservedMinor { minor: u8, offset: usize },

    #[error("indefinite-length item at offset {offset}")]
    IndefiniteLength { offset: usize },

    #[error("unsupported simple value {value} at offset {offset}")]
    UnsupportedSimple { value: u8, offset: usize },

    #[error("unexpected tag {tag} at offset {offset}")]
    UnexpectedTag { tag: u64, offset: usize },

    #[error("invalid utf-8 in text string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("invalid cid link at offset {offset}: {reason}")]
    InvalidLink { offset: usize, reason: String },

    #[error("map key at offset {offset} is not a text string")]
    NonTextKey { offset: usize },

    #[error("integer out of range at offset {offset}")]
    IntegerOverflow { offset: usize },

    #[error("length {len} at offset {offset} exceeds the input")]
    LengthOverflow { len: u64, offset: usize },

    #[error("{count} trailing bytes after value")]
    TrailingBytes { count: usize },

    #[error("nesting deeper than {max}")]
    DepthExceeded { max: usize },
}

/// Result alias for CBOR operations.
pub type CborResult<T> = Result<T, CborError>;
