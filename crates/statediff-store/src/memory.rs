use std::collections::HashMap;
use std::sync::RwLock;

use statediff_types::Cid;

use crate::block::Block;
use crate::error::{StoreError, StoreResult};
use crate::traits::BlockStore;

/// In-memory, HashMap-based block store.
///
/// Intended for tests and embedding. Blocks are held behind a `RwLock` for
/// safe concurrent access and cloned on read.
pub struct InMemoryBlockStore {
    blocks: RwLock<HashMap<Cid, Vec<u8>>>,
}

impl InMemoryBlockStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.blocks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored blocks.
    pub fn total_bytes(&self) -> usize {
        self.blocks
            .read()
            .expect("lock poisoned")
            .values()
            .map(Vec::len)
            .sum()
    }
}

impl Default for InMemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore for InMemoryBlockStore {
    fn get(&self, cid: &Cid) -> StoreResult<Vec<u8>> {
        let map = self.blocks.read().expect("lock poisoned");
        map.get(cid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(cid.clone()))
    }

    fn put(&self, block: &Block) -> StoreResult<Cid> {
        block.verify()?;
        let mut map = self.blocks.write().expect("lock poisoned");
        map.entry(block.cid.clone())
            .or_insert_with(|| block.data.clone());
        tracing::trace!(cid = %block.cid, bytes = block.data.len(), "stored block");
        Ok(block.cid.clone())
    }

    fn has(&self, cid: &Cid) -> StoreResult<bool> {
        let map = self.blocks.read().expect("lock poisoned");
        Ok(map.contains_key(cid))
    }
}

impl std::fmt::Debug for InMemoryBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryBlockStore")
            .field("block_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statediff_types::{codec, Multihash};

    fn block(data: &[u8]) -> Block {
        Block::new(codec::DAG_CBOR, data.to_vec())
    }

    // -----------------------------------------------------------------------
    // Core operations
    // -----------------------------------------------------------------------

    #[test]
    fn put_and_get() {
        let store = InMemoryBlockStore::new();
        let cid = store.put(&block(b"\x82\x01\x02")).unwrap();
        assert_eq!(store.get(&cid).unwrap(), b"\x82\x01\x02");
        assert!(store.has(&cid).unwrap());
    }

    #[test]
    fn missing_block_is_not_found() {
        let store = InMemoryBlockStore::new();
        let cid = Cid::for_block(codec::DAG_CBOR, b"absent");
        assert!(matches!(store.get(&cid), Err(StoreError::NotFound(c)) if c == cid));
        assert_eq!(store.get_opt(&cid).unwrap(), None);
        assert!(!store.has(&cid).unwrap());
    }

    #[test]
    fn put_is_idempotent() {
        let store = InMemoryBlockStore::new();
        let b = block(b"\xf6");
        let first = store.put(&b).unwrap();
        let second = store.put(&b).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 1);
    }

    #[test]
    fn put_rejects_mismatched_cid() {
        let store = InMemoryBlockStore::new();
        let cid = Cid::new_v1(codec::DAG_CBOR, Multihash::blake2b_256(b"other"));
        let err = store.put(&Block::with_cid(cid, b"data".to_vec())).unwrap_err();
        assert!(matches!(err, StoreError::HashMismatch { .. }));
        assert!(store.is_empty());
    }

    // -----------------------------------------------------------------------
    // Batch and reference impls
    // -----------------------------------------------------------------------

    #[test]
    fn put_batch_returns_cids_in_order() {
        let store = InMemoryBlockStore::new();
        let blocks = vec![block(b"\x01"), block(b"\x02")];
        let cids = store.put_batch(&blocks).unwrap();
        assert_eq!(cids, vec![blocks[0].cid.clone(), blocks[1].cid.clone()]);
    }

    #[test]
    fn store_reference_is_a_store() {
        fn read_through(store: impl BlockStore, cid: &Cid) -> Vec<u8> {
            store.get(cid).unwrap()
        }
        let store = InMemoryBlockStore::new();
        let cid = store.put(&block(b"\x00")).unwrap();
        assert_eq!(read_through(&store, &cid), b"\x00");
    }
}
