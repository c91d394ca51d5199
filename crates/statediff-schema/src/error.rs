use statediff_cbor::CborError;
use thiserror::Error;

use crate::node::Kind;

/// Errors from building or decoding schema-typed nodes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown schema type: {0}")]
    UnknownType(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("{type_name} expects {expected}, got {actual}")]
    KindMismatch {
        type_name: &'static str,
        expected: &'static str,
        actual: Kind,
    },

    #[error("{type_name} is a tuple of {expected} fields, got {actual}")]
    TupleArity {
        type_name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate key {key:?} in {type_name}")]
    DuplicateKey { type_name: &'static str, key: String },

    #[error("integer out of range for {type_name}")]
    IntOverflow { type_name: &'static str },

    #[error("schema nesting deeper than {max}")]
    DepthExceeded { max: usize },

    #[error(transparent)]
    Cbor(#[from] CborError),
}

/// Result alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;
