//! Bitmap helpers shared by the trie node codecs.

use statediff_cbor::Decoder;
use statediff_store::{Block, BlockStore};
use statediff_types::{codec, Cid};

use crate::error::AdtResult;

/// Test bit `i` of a big-endian integer.
pub(crate) fn be_bit(bytes: &[u8], i: usize) -> bool {
    let byte = i / 8;
    byte < bytes.len() && bytes[bytes.len() - 1 - byte] & (1 << (i % 8)) != 0
}

/// Minimal big-endian bytes of the integer whose set bits are `bits`.
pub(crate) fn be_bits_to_bytes(bits: impl IntoIterator<Item = usize>, width: usize) -> Vec<u8> {
    let mut out = vec![0u8; width.div_ceil(8)];
    let len = out.len();
    for i in bits {
        out[len - 1 - i / 8] |= 1 << (i % 8);
    }
    let zeros = out.iter().take_while(|&&b| b == 0).count();
    out.split_off(zeros)
}

/// Test bit `i` of a little-endian bitmap.
pub(crate) fn le_bit(bytes: &[u8], i: usize) -> bool {
    bytes.get(i / 8).is_some_and(|b| b & (1 << (i % 8)) != 0)
}

pub(crate) fn popcount(bytes: &[u8]) -> usize {
    bytes.iter().map(|b| b.count_ones() as usize).sum()
}

/// Check that `raw` holds exactly one CBOR item.
pub(crate) fn check_single_item(raw: &[u8]) -> AdtResult<()> {
    let mut decoder = Decoder::new(raw);
    decoder.skip_value()?;
    decoder.finish()?;
    Ok(())
}

pub(crate) fn put_cbor<S: BlockStore + ?Sized>(store: &S, data: Vec<u8>) -> AdtResult<Cid> {
    Ok(store.put(&Block::new(codec::DAG_CBOR, data))?)
}
