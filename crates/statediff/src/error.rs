use statediff_adt::AdtError;
use statediff_cbor::CborError;
use statediff_fcjson::MarshalError;
use statediff_schema::SchemaError;
use statediff_store::StoreError;
use statediff_types::TypeError;
use thiserror::Error;

/// Errors from decoding state.
///
/// Lower layer errors pass through unchanged.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The type path resolves to no registered prototype.
    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Structure(#[from] AdtError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cbor(#[from] CborError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Marshal(#[from] MarshalError),
}

/// Result alias for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;
