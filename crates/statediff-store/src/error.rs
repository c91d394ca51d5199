use statediff_types::Cid;

/// Errors from block store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested block was not found.
    #[error("block not found: {0}")]
    NotFound(Cid),

    /// The block's bytes do not hash to its CID.
    #[error("hash mismatch for {cid}")]
    HashMismatch { cid: Cid },

    /// The CID names a hash function this store cannot verify.
    #[error("unsupported multihash {code:#x} for {cid}")]
    UnsupportedHash { cid: Cid, code: u64 },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
