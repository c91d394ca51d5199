//! HAMT used as a set: keys only, values are `null`.

use statediff_cbor::constants::NULL;
use statediff_store::BlockStore;
use statediff_types::Cid;

use crate::error::{AdtError, AdtResult};
use crate::hamt::Hamt;

pub struct Set<'s, S: ?Sized> {
    hamt: Hamt<'s, S>,
}

impl<'s, S: BlockStore + ?Sized> Set<'s, S> {
    pub fn load(store: &'s S, cid: &Cid, bit_width: u32) -> AdtResult<Self> {
        Ok(Self {
            hamt: Hamt::load(store, cid, bit_width)?,
        })
    }

    /// Visit every key once, in HAMT order. Values are not inspected.
    pub fn for_each<E, F>(&self, mut f: F) -> Result<(), E>
    where
        E: From<AdtError>,
        F: FnMut(&[u8]) -> Result<(), E>,
    {
        self.hamt.for_each(|key, _| f(key))
    }

    pub fn has(&self, key: &[u8]) -> AdtResult<bool> {
        Ok(self.hamt.get(key)?.is_some())
    }
}

impl<S: BlockStore + ?Sized> Set<'_, S> {
    pub fn build(
        store: &S,
        bit_width: u32,
        keys: impl IntoIterator<Item = Vec<u8>>,
    ) -> AdtResult<Cid> {
        Hamt::build(store, bit_width, keys.into_iter().map(|k| (k, vec![NULL])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hamt::DEFAULT_BIT_WIDTH;
    use statediff_store::InMemoryBlockStore;
    use statediff_types::encode_uvarint;

    fn uvarint(v: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_uvarint(&mut buf, v);
        buf
    }

    #[test]
    fn keys_roundtrip() {
        let store = InMemoryBlockStore::new();
        let keys: Vec<Vec<u8>> = [1u64, 300, 70_000].into_iter().map(uvarint).collect();
        let cid = Set::build(&store, DEFAULT_BIT_WIDTH, keys.clone()).unwrap();
        let set = Set::load(&store, &cid, DEFAULT_BIT_WIDTH).unwrap();

        let mut seen = Vec::new();
        set.for_each(|k| -> AdtResult<()> {
            seen.push(k.to_vec());
            Ok(())
        })
        .unwrap();
        seen.sort();
        let mut expected = keys.clone();
        expected.sort();
        assert_eq!(seen, expected);
        assert!(set.has(&uvarint(300)).unwrap());
        assert!(!set.has(&uvarint(301)).unwrap());
    }
}
