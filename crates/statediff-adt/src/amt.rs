//! Array mapped trie.
//!
//! The root is `[height, count, node]`, or `[bit_width, height, count, node]`
//! for the newer layout. A node is `[bmap, links, values]` where `bmap` is a
//! little-endian bitmap of occupied slots: leaves (height 0) fill `values`,
//! interior nodes fill `links`. A child of a node at height `h` covers
//! `width^h` consecutive indices.

use std::collections::BTreeMap;

use statediff_cbor::{Decoder, Deferred, Encoder};
use statediff_store::BlockStore;
use statediff_types::Cid;

use crate::error::{AdtError, AdtResult};
use crate::node_util::{check_single_item, le_bit, popcount, put_cbor};

/// Fan-out bits of the v0 root layout (width 8).
pub const DEFAULT_AMT_BIT_WIDTH: u32 = 3;

const STRUCTURE: &str = "amt";

#[derive(Debug, Clone, Default)]
struct Node {
    bmap: Vec<u8>,
    links: Vec<Cid>,
    values: Vec<Vec<u8>>,
}

impl Node {
    fn read(d: &mut Decoder<'_>, width: usize, height: u32) -> AdtResult<Self> {
        if d.read_array_len()? != 3 {
            return Err(AdtError::malformed(STRUCTURE, "node is not a 3-tuple"));
        }
        let bmap = d.read_bytes()?.to_vec();
        let link_count = d.read_array_len()?;
        let mut links = Vec::with_capacity(link_count);
        for _ in 0..link_count {
            links.push(d.read_link()?);
        }
        let value_count = d.read_array_len()?;
        let mut values = Vec::with_capacity(value_count);
        for _ in 0..value_count {
            values.push(d.read_raw()?.to_vec());
        }

        if bmap.len() != width.div_ceil(8) {
            return Err(AdtError::malformed(
                STRUCTURE,
                format!("bitmap of {} bytes for width {width}", bmap.len()),
            ));
        }
        let (filled, empty) = if height == 0 {
            (values.len(), links.len())
        } else {
            (links.len(), values.len())
        };
        if empty != 0 || filled != popcount(&bmap) {
            return Err(AdtError::malformed(
                STRUCTURE,
                format!(
                    "node at height {height} has {} links and {} values for {} set bits",
                    links.len(),
                    values.len(),
                    popcount(&bmap)
                ),
            ));
        }
        Ok(Self {
            bmap,
            links,
            values,
        })
    }

    fn decode(data: &[u8], width: usize, height: u32) -> AdtResult<Self> {
        let mut d = Decoder::new(data);
        let node = Self::read(&mut d, width, height)?;
        d.finish()?;
        Ok(node)
    }

    fn write(&self, enc: &mut Encoder) {
        enc.write_array_header(3);
        enc.write_bytes(&self.bmap);
        enc.write_array_header(self.links.len());
        for link in &self.links {
            enc.write_link(link);
        }
        enc.write_array_header(self.values.len());
        for value in &self.values {
            enc.write_raw(value);
        }
    }

    fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        self.write(&mut enc);
        enc.into_bytes()
    }

    /// Occupied slots in ascending order.
    fn slots(&self, width: usize) -> impl Iterator<Item = usize> + '_ {
        (0..width).filter(|&i| le_bit(&self.bmap, i))
    }
}

/// A loaded AMT. Only the root node is held; children are read on demand.
pub struct Amt<'s, S: ?Sized> {
    store: &'s S,
    bit_width: u32,
    height: u32,
    count: u64,
    root: Node,
}

impl<'s, S: BlockStore + ?Sized> Amt<'s, S> {
    /// Load the root at `cid`, accepting both root layouts.
    pub fn load(store: &'s S, cid: &Cid) -> AdtResult<Self> {
        let data = store.get(cid)?;
        let mut d = Decoder::new(&data);
        let (bit_width, height, count) = match d.read_array_len()? {
            3 => (DEFAULT_AMT_BIT_WIDTH, d.read_uint()?, d.read_uint()?),
            4 => {
                let bit_width = d.read_uint()?;
                let bit_width = u32::try_from(bit_width)
                    .ok()
                    .filter(|w| (1..=8).contains(w))
                    .ok_or(AdtError::InvalidBitWidth(bit_width.min(u32::MAX as u64) as u32))?;
                (bit_width, d.read_uint()?, d.read_uint()?)
            }
            n => {
                return Err(AdtError::malformed(
                    STRUCTURE,
                    format!("root is a {n}-tuple"),
                ))
            }
        };
        let width = 1usize << bit_width;
        // Height is bounded by the u64 index space.
        let height = u32::try_from(height)
            .ok()
            .filter(|&h| (width as u64).checked_pow(h).is_some())
            .ok_or_else(|| AdtError::malformed(STRUCTURE, format!("height {height} too large")))?;
        let root = Node::read(&mut d, width, height)?;
        d.finish()?;
        tracing::debug!(cid = %cid, height, count, "loaded amt");
        Ok(Self {
            store,
            bit_width,
            height,
            count,
            root,
        })
    }

    /// Entry count recorded in the root.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn width(&self) -> usize {
        1 << self.bit_width
    }

    /// Visit every `(index, value)` pair once, in ascending index order.
    pub fn for_each<E, F>(&self, mut f: F) -> Result<(), E>
    where
        E: From<AdtError>,
        F: FnMut(u64, Deferred<'_>) -> Result<(), E>,
    {
        self.walk(&self.root, self.height, 0, &mut f)
    }

    fn walk<E, F>(&self, node: &Node, height: u32, offset: u64, f: &mut F) -> Result<(), E>
    where
        E: From<AdtError>,
        F: FnMut(u64, Deferred<'_>) -> Result<(), E>,
    {
        let width = self.width();
        if height == 0 {
            for (slot, value) in node.slots(width).zip(&node.values) {
                f(offset + slot as u64, Deferred::new(value))?;
            }
            return Ok(());
        }
        let span = (width as u64).pow(height);
        for (slot, link) in node.slots(width).zip(&node.links) {
            let child_offset = span
                .checked_mul(slot as u64)
                .and_then(|o| o.checked_add(offset))
                .ok_or_else(|| AdtError::malformed(STRUCTURE, "index overflows u64"))?;
            let data = self.store.get(link).map_err(AdtError::from)?;
            let child = Node::decode(&data, width, height - 1)?;
            self.walk(&child, height - 1, child_offset, f)?;
        }
        Ok(())
    }

    /// Look up the raw value at `index`.
    pub fn get(&self, index: u64) -> AdtResult<Option<Vec<u8>>> {
        let width = self.width() as u64;
        if width.checked_pow(self.height + 1).is_some_and(|cap| index >= cap) {
            return Ok(None);
        }
        let mut node = self.root.clone();
        let mut height = self.height;
        let mut rest = index;
        loop {
            let span = width.pow(height);
            let slot = (rest / span) as usize;
            rest %= span;
            if !le_bit(&node.bmap, slot) {
                return Ok(None);
            }
            let at = (0..slot).filter(|&i| le_bit(&node.bmap, i)).count();
            if height == 0 {
                return Ok(node.values.get(at).cloned());
            }
            height -= 1;
            node = Node::decode(&self.store.get(&node.links[at])?, width as usize, height)?;
        }
    }
}

impl<S: BlockStore + ?Sized> Amt<'_, S> {
    /// Write an AMT in the v0 root layout and return its root CID.
    ///
    /// Values must each be one encoded CBOR item. A repeated index keeps
    /// its last value.
    pub fn build(store: &S, values: impl IntoIterator<Item = (u64, Vec<u8>)>) -> AdtResult<Cid> {
        let values: BTreeMap<u64, Vec<u8>> = values.into_iter().collect();
        for value in values.values() {
            check_single_item(value)?;
        }
        let width = 1u64 << DEFAULT_AMT_BIT_WIDTH;
        let max = values.keys().next_back().copied().unwrap_or(0);
        let mut height = 0u32;
        while width
            .checked_pow(height + 1)
            .is_some_and(|cap| max >= cap)
        {
            height += 1;
        }

        let entries: Vec<(u64, Vec<u8>)> = values.into_iter().collect();
        let count = entries.len() as u64;
        let root = build_node(store, width, height, &entries)?;

        let mut enc = Encoder::new();
        enc.write_array_header(3);
        enc.write_uint(height as u64);
        enc.write_uint(count);
        root.write(&mut enc);
        let cid = put_cbor(store, enc.into_bytes())?;
        tracing::debug!(cid = %cid, height, count, "built amt");
        Ok(cid)
    }

    /// Write an AMT holding `values` at indices `0..n`.
    pub fn build_list(store: &S, values: impl IntoIterator<Item = Vec<u8>>) -> AdtResult<Cid> {
        Self::build(store, (0u64..).zip(values))
    }
}

/// `entries` are sorted and relative to the node's first index.
fn build_node<S: BlockStore + ?Sized>(
    store: &S,
    width: u64,
    height: u32,
    entries: &[(u64, Vec<u8>)],
) -> AdtResult<Node> {
    let mut node = Node {
        bmap: vec![0u8; (width as usize).div_ceil(8)],
        ..Node::default()
    };
    if height == 0 {
        for (index, value) in entries {
            let slot = *index as usize;
            node.bmap[slot / 8] |= 1 << (slot % 8);
            node.values.push(value.clone());
        }
        return Ok(node);
    }

    let span = width.pow(height);
    let mut start = 0;
    while start < entries.len() {
        let slot = entries[start].0 / span;
        let end = start + entries[start..].partition_point(|(i, _)| i / span == slot);
        let child_entries: Vec<(u64, Vec<u8>)> = entries[start..end]
            .iter()
            .map(|(i, v)| (i % span, v.clone()))
            .collect();
        let child = build_node(store, width, height - 1, &child_entries)?;
        node.bmap[slot as usize / 8] |= 1 << (slot % 8);
        node.links.push(put_cbor(store, child.encode())?);
        start = end;
    }
    Ok(node)
}
