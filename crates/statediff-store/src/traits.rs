use statediff_types::Cid;

use crate::block::Block;
use crate::error::{StoreError, StoreResult};

/// Content-addressed block store.
///
/// All implementations must satisfy these invariants:
/// - Blocks are immutable once written: a CID always maps to the same bytes.
/// - Concurrent reads are always safe.
/// - The store never interprets block contents.
pub trait BlockStore: Send + Sync {
    /// Read a block's bytes.
    ///
    /// Returns `Err(StoreError::NotFound)` if the block does not exist.
    fn get(&self, cid: &Cid) -> StoreResult<Vec<u8>>;

    /// Verify and write a block, returning its CID.
    ///
    /// Writing a block that is already present is a no-op.
    fn put(&self, block: &Block) -> StoreResult<Cid>;

    /// Check whether a block exists in the store.
    fn has(&self, cid: &Cid) -> StoreResult<bool>;

    /// Read a block, mapping a missing block to `Ok(None)`.
    fn get_opt(&self, cid: &Cid) -> StoreResult<Option<Vec<u8>>> {
        match self.get(cid) {
            Ok(data) => Ok(Some(data)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write multiple blocks in a batch and return their CIDs.
    fn put_batch(&self, blocks: &[Block]) -> StoreResult<Vec<Cid>> {
        blocks.iter().map(|block| self.put(block)).collect()
    }
}

impl<S: BlockStore + ?Sized> BlockStore for &S {
    fn get(&self, cid: &Cid) -> StoreResult<Vec<u8>> {
        (**self).get(cid)
    }

    fn put(&self, block: &Block) -> StoreResult<Cid> {
        (**self).put(block)
    }

    fn has(&self, cid: &Cid) -> StoreResult<bool> {
        (**self).has(cid)
    }
}
