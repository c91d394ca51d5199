//! Hash array mapped trie.
//!
//! A node is the tuple `[bitfield, pointers]`. The bitfield is a big-endian
//! integer whose bit `i` marks slot `i` as occupied; `pointers` holds one
//! entry per occupied slot in slot order. A pointer is either a link to a
//! child node or a bucket of at most three `[key, value]` pairs sorted by
//! key. Keys are placed by the SHA-256 of the key, consumed `bit_width`
//! bits at a time from the most significant bit.
//!
//! Both pointer layouts are read: the keyed map `{"0": link}` /
//! `{"1": bucket}` and the bare link / bucket array. Builders write the
//! keyed map form.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use statediff_cbor::{Decoder, Deferred, Encoder, Major};
use statediff_store::BlockStore;
use statediff_types::Cid;

use crate::error::{AdtError, AdtResult};
use crate::node_util::{be_bit, be_bits_to_bytes, check_single_item, popcount, put_cbor};

/// Fan-out used by every Filecoin actor map.
pub const DEFAULT_BIT_WIDTH: u32 = 5;

const BUCKET_SIZE: usize = 3;
const HASH_BITS: u32 = 256;
const STRUCTURE: &str = "hamt";

#[derive(Debug, Clone)]
struct Entry {
    key: Vec<u8>,
    value: Vec<u8>,
}

#[derive(Debug, Clone)]
enum Pointer {
    Link(Cid),
    Bucket(Vec<Entry>),
}

#[derive(Debug, Clone, Default)]
struct Node {
    bitfield: Vec<u8>,
    pointers: Vec<Pointer>,
}

impl Node {
    fn decode(data: &[u8], bit_width: u32) -> AdtResult<Self> {
        let mut d = Decoder::new(data);
        if d.read_array_len()? != 2 {
            return Err(AdtError::malformed(STRUCTURE, "node is not a 2-tuple"));
        }
        let bitfield = d.read_bytes()?.to_vec();
        let count = d.read_array_len()?;
        let mut pointers = Vec::with_capacity(count);
        for _ in 0..count {
            pointers.push(read_pointer(&mut d)?);
        }
        d.finish()?;

        let slots = 1usize << bit_width;
        if bitfield.len() * 8 > slots && (slots..bitfield.len() * 8).any(|i| be_bit(&bitfield, i)) {
            return Err(AdtError::malformed(
                STRUCTURE,
                format!("bitfield addresses more than {slots} slots"),
            ));
        }
        if popcount(&bitfield) != pointers.len() {
            return Err(AdtError::malformed(
                STRUCTURE,
                format!(
                    "bitfield has {} bits set but node has {} pointers",
                    popcount(&bitfield),
                    pointers.len()
                ),
            ));
        }
        Ok(Self { bitfield, pointers })
    }

    fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.write_array_header(2);
        enc.write_bytes(&self.bitfield);
        enc.write_array_header(self.pointers.len());
        for pointer in &self.pointers {
            enc.write_map_header(1);
            match pointer {
                Pointer::Link(cid) => {
                    enc.write_text("0");
                    enc.write_link(cid);
                }
                Pointer::Bucket(entries) => {
                    enc.write_text("1");
                    enc.write_array_header(entries.len());
                    for entry in entries {
                        enc.write_array_header(2);
                        enc.write_bytes(&entry.key);
                        enc.write_raw(&entry.value);
                    }
                }
            }
        }
        enc.into_bytes()
    }

    /// Position in `pointers` of the occupied slot `index`.
    fn pointer_index(&self, index: usize) -> Option<usize> {
        if !be_bit(&self.bitfield, index) {
            return None;
        }
        Some((0..index).filter(|&i| be_bit(&self.bitfield, i)).count())
    }
}

fn read_pointer(d: &mut Decoder<'_>) -> AdtResult<Pointer> {
    match d.peek_major()? {
        Major::Map => {
            if d.read_map_len()? != 1 {
                return Err(AdtError::malformed(STRUCTURE, "pointer map must have one key"));
            }
            match d.read_text()? {
                "0" => Ok(Pointer::Link(d.read_link()?)),
                "1" => read_bucket(d),
                other => Err(AdtError::malformed(
                    STRUCTURE,
                    format!("unknown pointer key {other:?}"),
                )),
            }
        }
        Major::Tag => Ok(Pointer::Link(d.read_link()?)),
        Major::Array => read_bucket(d),
        other => Err(AdtError::malformed(
            STRUCTURE,
            format!("pointer cannot be a {other}"),
        )),
    }
}

fn read_bucket(d: &mut Decoder<'_>) -> AdtResult<Pointer> {
    let len = d.read_array_len()?;
    if len == 0 {
        return Err(AdtError::malformed(STRUCTURE, "empty bucket"));
    }
    let mut entries = Vec::with_capacity(len);
    for _ in 0..len {
        if d.read_array_len()? != 2 {
            return Err(AdtError::malformed(STRUCTURE, "bucket entry is not a pair"));
        }
        let key = d.read_bytes()?.to_vec();
        let value = d.read_raw()?.to_vec();
        entries.push(Entry { key, value });
    }
    Ok(Pointer::Bucket(entries))
}

/// `width` bits of `hash` starting at bit `offset`, most significant first.
fn hash_bits(hash: &[u8], offset: u32, width: u32) -> Option<usize> {
    if offset + width > HASH_BITS {
        return None;
    }
    Some((offset..offset + width).fold(0usize, |acc, i| {
        let bit = (hash[(i / 8) as usize] >> (7 - i % 8)) & 1;
        (acc << 1) | bit as usize
    }))
}

fn check_bit_width(bit_width: u32) -> AdtResult<()> {
    if (1..=8).contains(&bit_width) {
        Ok(())
    } else {
        Err(AdtError::InvalidBitWidth(bit_width))
    }
}

/// A loaded HAMT. Only the root node is held; children are read on demand.
pub struct Hamt<'s, S: ?Sized> {
    store: &'s S,
    root: Node,
    bit_width: u32,
}

impl<'s, S: BlockStore + ?Sized> Hamt<'s, S> {
    /// Load the root node at `cid`.
    pub fn load(store: &'s S, cid: &Cid, bit_width: u32) -> AdtResult<Self> {
        check_bit_width(bit_width)?;
        tracing::debug!(cid = %cid, bit_width, "loading hamt");
        let root = Node::decode(&store.get(cid)?, bit_width)?;
        Ok(Self {
            store,
            root,
            bit_width,
        })
    }

    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    pub fn store(&self) -> &'s S {
        self.store
    }

    fn max_depth(&self) -> u32 {
        HASH_BITS / self.bit_width
    }

    /// Visit every `(key, value)` pair once, in slot order.
    ///
    /// The first error returned by `f` stops the walk and is returned.
    pub fn for_each<E, F>(&self, mut f: F) -> Result<(), E>
    where
        E: From<AdtError>,
        F: FnMut(&[u8], Deferred<'_>) -> Result<(), E>,
    {
        let visited = self.walk(&self.root, 0, &mut f)?;
        tracing::trace!(entries = visited, "walked hamt");
        Ok(())
    }

    fn walk<E, F>(&self, node: &Node, depth: u32, f: &mut F) -> Result<usize, E>
    where
        E: From<AdtError>,
        F: FnMut(&[u8], Deferred<'_>) -> Result<(), E>,
    {
        let mut visited = 0;
        for pointer in &node.pointers {
            match pointer {
                Pointer::Link(cid) => {
                    if depth + 1 >= self.max_depth() {
                        return Err(AdtError::malformed(
                            STRUCTURE,
                            format!("link below depth {depth} exceeds the hash length"),
                        )
                        .into());
                    }
                    let data = self.store.get(cid).map_err(AdtError::from)?;
                    let child = Node::decode(&data, self.bit_width)?;
                    visited += self.walk(&child, depth + 1, f)?;
                }
                Pointer::Bucket(entries) => {
                    for entry in entries {
                        f(&entry.key, Deferred::new(&entry.value))?;
                    }
                    visited += entries.len();
                }
            }
        }
        Ok(visited)
    }

    /// Look up the raw value stored under `key`.
    pub fn get(&self, key: &[u8]) -> AdtResult<Option<Vec<u8>>> {
        let hash = Sha256::digest(key);
        let mut node = self.root.clone();
        for depth in 0..self.max_depth() {
            let Some(index) = hash_bits(&hash, depth * self.bit_width, self.bit_width) else {
                break;
            };
            let Some(at) = node.pointer_index(index) else {
                return Ok(None);
            };
            match &node.pointers[at] {
                Pointer::Bucket(entries) => {
                    return Ok(entries
                        .iter()
                        .find(|e| e.key == key)
                        .map(|e| e.value.clone()));
                }
                Pointer::Link(cid) => {
                    node = Node::decode(&self.store.get(cid)?, self.bit_width)?;
                }
            }
        }
        Ok(None)
    }
}

impl<S: BlockStore + ?Sized> Hamt<'_, S> {
    /// Write a HAMT holding `entries` and return its root CID.
    ///
    /// Values must each be one encoded CBOR item. A repeated key keeps its
    /// last value.
    pub fn build(
        store: &S,
        bit_width: u32,
        entries: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
    ) -> AdtResult<Cid> {
        check_bit_width(bit_width)?;
        let mut hashed = Vec::new();
        for (key, value) in entries.into_iter().collect::<BTreeMap<_, _>>() {
            check_single_item(&value)?;
            hashed.push((Sha256::digest(&key).to_vec(), Entry { key, value }));
        }
        let root = build_node(store, bit_width, 0, hashed)?;
        let cid = put_cbor(store, root.encode())?;
        tracing::debug!(cid = %cid, "built hamt");
        Ok(cid)
    }
}

fn build_node<S: BlockStore + ?Sized>(
    store: &S,
    bit_width: u32,
    depth: u32,
    entries: Vec<(Vec<u8>, Entry)>,
) -> AdtResult<Node> {
    let mut slots: BTreeMap<usize, Vec<(Vec<u8>, Entry)>> = BTreeMap::new();
    for (hash, entry) in entries {
        let index = hash_bits(&hash, depth * bit_width, bit_width)
            .ok_or_else(|| AdtError::malformed(STRUCTURE, "hash exhausted while building"))?;
        slots.entry(index).or_default().push((hash, entry));
    }

    let bitfield = be_bits_to_bytes(slots.keys().copied(), 1 << bit_width);
    let mut pointers = Vec::with_capacity(slots.len());
    for (_, group) in slots {
        if group.len() <= BUCKET_SIZE {
            // Keys arrive sorted, so each bucket is sorted too.
            pointers.push(Pointer::Bucket(group.into_iter().map(|(_, e)| e).collect()));
        } else {
            let child = build_node(store, bit_width, depth + 1, group)?;
            pointers.push(Pointer::Link(put_cbor(store, child.encode())?));
        }
    }
    Ok(Node { bitfield, pointers })
}
