//! HAMT of AMTs: each key owns an array of values.

use statediff_cbor::Encoder;
use statediff_store::BlockStore;
use statediff_types::Cid;

use crate::amt::Amt;
use crate::error::{AdtError, AdtResult};
use crate::hamt::Hamt;

pub struct Multimap<'s, S: ?Sized> {
    hamt: Hamt<'s, S>,
}

impl<'s, S: BlockStore + ?Sized> Multimap<'s, S> {
    pub fn load(store: &'s S, cid: &Cid, bit_width: u32) -> AdtResult<Self> {
        Ok(Self {
            hamt: Hamt::load(store, cid, bit_width)?,
        })
    }

    /// Visit every key with its loaded array, in HAMT order.
    pub fn for_all<E, F>(&self, mut f: F) -> Result<(), E>
    where
        E: From<AdtError>,
        F: FnMut(&[u8], &Amt<'s, S>) -> Result<(), E>,
    {
        let store = self.hamt.store();
        self.hamt.for_each(|key, value| {
            let cid = value.as_link().map_err(AdtError::from)?;
            let array = Amt::load(store, &cid)?;
            f(key, &array)
        })
    }
}

impl<S: BlockStore + ?Sized> Multimap<'_, S> {
    /// Write one AMT per key and a HAMT linking them.
    pub fn build(
        store: &S,
        bit_width: u32,
        entries: impl IntoIterator<Item = (Vec<u8>, Vec<Vec<u8>>)>,
    ) -> AdtResult<Cid> {
        let mut links = Vec::new();
        for (key, values) in entries {
            let array = Amt::build_list(store, values)?;
            let mut enc = Encoder::new();
            enc.write_link(&array);
            links.push((key, enc.into_bytes()));
        }
        Hamt::build(store, bit_width, links)
    }
}
