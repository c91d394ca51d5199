use statediff_types::{multihash_code, Cid, Multihash};

use crate::error::{StoreError, StoreResult};

/// A block of bytes together with the CID that names it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub cid: Cid,
    pub data: Vec<u8>,
}

impl Block {
    /// Name `data` with a BLAKE2b-256 CIDv1 of the given codec.
    pub fn new(codec: u64, data: Vec<u8>) -> Self {
        Self {
            cid: Cid::for_block(codec, &data),
            data,
        }
    }

    /// Pair existing bytes with a caller-supplied CID without hashing.
    pub fn with_cid(cid: Cid, data: Vec<u8>) -> Self {
        Self { cid, data }
    }

    /// Recompute the digest and compare it with the CID.
    pub fn verify(&self) -> StoreResult<()> {
        let hash = self.cid.hash();
        let computed = match hash.code() {
            multihash_code::BLAKE2B_256 => Multihash::blake2b_256(&self.data),
            multihash_code::SHA2_256 => Multihash::sha2_256(&self.data),
            multihash_code::IDENTITY => Multihash::identity(&self.data),
            code => {
                return Err(StoreError::UnsupportedHash {
                    cid: self.cid.clone(),
                    code,
                })
            }
        };
        if &computed != hash {
            return Err(StoreError::HashMismatch {
                cid: self.cid.clone(),
            });
        }
        Ok(())
    }
}
