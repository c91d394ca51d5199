use statediff_cbor::CborError;
use statediff_store::StoreError;

/// Errors from loading or walking sharded structures.
#[derive(Debug, thiserror::Error)]
pub enum AdtError {
    /// A shard could not be read from the block store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A shard is not valid DAG-CBOR of the expected layout.
    #[error(transparent)]
    Cbor(#[from] CborError),

    /// A shard decoded but violates the structure's invariants.
    #[error("malformed {structure}: {reason}")]
    Malformed {
        structure: &'static str,
        reason: String,
    },

    /// Unsupported trie fan-out.
    #[error("invalid bit width {0}")]
    InvalidBitWidth(u32),

    /// RLE+ bytes that do not decode to a bit set.
    #[error("invalid bitfield: {0}")]
    BitField(&'static str),
}

impl AdtError {
    pub(crate) fn malformed(structure: &'static str, reason: impl Into<String>) -> Self {
        AdtError::Malformed {
            structure,
            reason: reason.into(),
        }
    }
}

/// Result alias for structure operations.
pub type AdtResult<T> = Result<T, AdtError>;
