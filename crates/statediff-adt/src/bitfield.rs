//! RLE+ bitfields.
//!
//! The encoding is a little-endian bit stream: a 2-bit version (`00`), one
//! bit giving the value of the first run, then run lengths of alternating
//! value. A run length is `1` for a run of one, `01` followed by four bits
//! for runs of 2 to 15, or `00` followed by a varint for longer runs. Bits
//! past the end read as zero, so a zero-length run ends the stream.
//!
//! Canonical encodings end on a run of ones, carry no trailing zero bytes,
//! use the shortest run-length form and encode the empty set as no bytes.

use std::ops::Range;

use statediff_cbor::{Decoder, Encoder};

use crate::error::{AdtError, AdtResult};

/// A set of `u64` stored as sorted, disjoint, non-adjacent ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitField {
    ranges: Vec<Range<u64>>,
}

impl BitField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode canonical RLE+ bytes.
    pub fn from_rle_bytes(data: &[u8]) -> AdtResult<Self> {
        decode(data, true)
    }

    /// Decode RLE+ bytes without enforcing the canonical form.
    pub fn from_rle_bytes_lenient(data: &[u8]) -> AdtResult<Self> {
        decode(data, false)
    }

    /// Decode RLE+ bytes wrapped in a CBOR byte string.
    pub fn from_cbor(data: &[u8]) -> AdtResult<Self> {
        let mut d = Decoder::new(data);
        let inner = d.read_bytes()?;
        d.finish()?;
        decode(inner, false)
    }

    /// Decode bytes that may be either bare or CBOR-wrapped RLE+.
    ///
    /// Canonical bare RLE+ is tried first, then the CBOR-wrapped form, then
    /// bare RLE+ without canonical checks. When all fail, the error of the
    /// first attempt is returned.
    pub fn decode_any(data: &[u8]) -> AdtResult<Self> {
        match Self::from_rle_bytes(data) {
            Ok(bits) => Ok(bits),
            Err(direct) => Self::from_cbor(data)
                .or_else(|_| Self::from_rle_bytes_lenient(data))
                .map_err(|_| direct),
        }
    }

    /// Canonical RLE+ bytes.
    pub fn to_rle_bytes(&self) -> Vec<u8> {
        let Some(first) = self.ranges.first() else {
            return Vec::new();
        };
        let mut w = BitWriter::default();
        w.put(0, 2);
        w.put(u64::from(first.start == 0), 1);
        let mut pos = 0;
        for range in &self.ranges {
            if range.start > pos {
                w.put_run(range.start - pos);
            }
            w.put_run(range.end - range.start);
            pos = range.end;
        }
        w.finish()
    }

    /// Canonical RLE+ bytes wrapped in a CBOR byte string.
    pub fn to_cbor_bytes(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.write_bytes(&self.to_rle_bytes());
        enc.into_bytes()
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.ranges.iter().flat_map(|r| r.clone())
    }

    pub fn ranges(&self) -> &[Range<u64>] {
        &self.ranges
    }

    /// Number of set bits.
    pub fn len(&self) -> u64 {
        self.ranges.iter().map(|r| r.end - r.start).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, bit: u64) -> bool {
        let at = self.ranges.partition_point(|r| r.end <= bit);
        self.ranges.get(at).is_some_and(|r| r.contains(&bit))
    }

    fn push_range(&mut self, range: Range<u64>) {
        match self.ranges.last_mut() {
            Some(last) if last.end >= range.start => last.end = last.end.max(range.end),
            _ => self.ranges.push(range),
        }
    }
}

impl FromIterator<u64> for BitField {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        let mut bits: Vec<u64> = iter.into_iter().collect();
        bits.sort_unstable();
        bits.dedup();
        let mut out = BitField::new();
        for bit in bits {
            // u64::MAX cannot be represented as a half-open range end.
            if let Some(end) = bit.checked_add(1) {
                out.push_range(bit..end);
            }
        }
        out
    }
}

fn decode(data: &[u8], strict: bool) -> AdtResult<BitField> {
    let mut out = BitField::new();
    if data.is_empty() {
        return Ok(out);
    }
    let mut r = BitReader::new(data);
    if r.read(2) != 0 {
        return Err(AdtError::BitField("unsupported version"));
    }
    let mut value = r.read(1) == 1;
    let mut pos: u64 = 0;
    let mut last_value = None;
    loop {
        let len = if r.read(1) == 1 {
            1
        } else if r.read(1) == 1 {
            let len = r.read(4);
            if strict && len < 2 {
                return Err(AdtError::BitField("short run is not minimally encoded"));
            }
            len
        } else {
            let len = r.read_varint(strict)?;
            if strict && len != 0 && len < 16 {
                return Err(AdtError::BitField("long run is not minimally encoded"));
            }
            len
        };
        if len == 0 {
            break;
        }
        let end = pos
            .checked_add(len)
            .ok_or(AdtError::BitField("run overflows u64"))?;
        if value {
            out.push_range(pos..end);
        }
        pos = end;
        last_value = Some(value);
        value = !value;
    }

    if strict {
        if last_value != Some(true) {
            return Err(AdtError::BitField("does not end on a run of ones"));
        }
        if !r.rest_is_zero() {
            return Err(AdtError::BitField("data after terminator"));
        }
        if data.last() == Some(&0) {
            return Err(AdtError::BitField("trailing zero bytes"));
        }
    }
    Ok(out)
}

struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn bit(&mut self) -> u64 {
        let byte = self.data.get(self.pos / 8).copied().unwrap_or(0);
        self.pos += 1;
        u64::from((byte >> ((self.pos - 1) % 8)) & 1)
    }

    /// Read `n` bits, least significant first.
    fn read(&mut self, n: u32) -> u64 {
        (0..n).fold(0, |acc, k| acc | (self.bit() << k))
    }

    fn read_varint(&mut self, strict: bool) -> AdtResult<u64> {
        let mut value = 0u64;
        for i in 0..10 {
            let byte = self.read(8);
            if i == 9 && byte > 1 {
                return Err(AdtError::BitField("varint overflows u64"));
            }
            value |= (byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                if strict && i > 0 && byte == 0 {
                    return Err(AdtError::BitField("varint is not minimally encoded"));
                }
                return Ok(value);
            }
        }
        Err(AdtError::BitField("varint overflows u64"))
    }

    fn rest_is_zero(&self) -> bool {
        let total = self.data.len() * 8;
        (self.pos..total).all(|i| self.data[i / 8] & (1 << (i % 8)) == 0)
    }
}

#[derive(Default)]
struct BitWriter {
    out: Vec<u8>,
    bits: usize,
}

impl BitWriter {
    /// Write the low `n` bits of `value`, least significant first.
    fn put(&mut self, value: u64, n: u32) {
        for k in 0..n {
            if self.bits % 8 == 0 {
                self.out.push(0);
            }
            if (value >> k) & 1 == 1 {
                let last = self.out.len() - 1;
                self.out[last] |= 1 << (self.bits % 8);
            }
            self.bits += 1;
        }
    }

    fn put_run(&mut self, len: u64) {
        match len {
            1 => self.put(1, 1),
            2..=15 => {
                self.put(0b10, 2);
                self.put(len, 4);
            }
            _ => {
                self.put(0, 2);
                let mut rest = len;
                loop {
                    let low = rest & 0x7f;
                    rest >>= 7;
                    if rest == 0 {
                        self.put(low, 8);
                        break;
                    }
                    self.put(low | 0x80, 8);
                }
            }
        }
    }

    fn finish(mut self) -> Vec<u8> {
        while self.out.last() == Some(&0) {
            self.out.pop();
        }
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(bits: &[u64]) -> BitField {
        bits.iter().copied().collect()
    }

    // -----------------------------------------------------------------------
    // Encoding
    // -----------------------------------------------------------------------

    #[test]
    fn known_encodings() {
        assert_eq!(hex::encode(set(&[0, 2, 5]).to_rle_bytes()), "bc12");
        assert_eq!(hex::encode(set(&[0]).to_rle_bytes()), "0c");
        assert_eq!(hex::encode(set(&[1]).to_rle_bytes()), "18");
        assert_eq!(hex::encode(set(&[3, 4, 5]).to_rle_bytes()), "701c");
        assert_eq!(hex::encode(set(&[0, 1000]).to_rle_bytes()), "ccf941");
        let wide: Vec<u64> = (10..40).collect();
        assert_eq!(hex::encode(set(&wide).to_rle_bytes()), "50f1");
    }

    #[test]
    fn empty_set_is_empty_bytes() {
        assert!(BitField::new().to_rle_bytes().is_empty());
        assert_eq!(BitField::new().to_cbor_bytes(), vec![0x40]);
        assert!(BitField::from_rle_bytes(&[]).unwrap().is_empty());
    }

    #[test]
    fn cbor_wrapping() {
        assert_eq!(hex::encode(set(&[0, 2, 5]).to_cbor_bytes()), "42bc12");
    }

    // -----------------------------------------------------------------------
    // Decoding
    // -----------------------------------------------------------------------

    #[test]
    fn decodes_bare_and_wrapped() {
        let expected = set(&[0, 2, 5]);
        assert_eq!(BitField::from_rle_bytes(&[0xbc, 0x12]).unwrap(), expected);
        assert_eq!(BitField::from_cbor(&[0x42, 0xbc, 0x12]).unwrap(), expected);
        assert_eq!(BitField::decode_any(&[0xbc, 0x12]).unwrap(), expected);
        assert_eq!(BitField::decode_any(&[0x42, 0xbc, 0x12]).unwrap(), expected);
    }

    #[test]
    fn strict_rejects_trailing_zero_bytes() {
        assert!(BitField::from_rle_bytes(&[0xbc, 0x12, 0x00]).is_err());
        assert_eq!(
            BitField::from_rle_bytes_lenient(&[0xbc, 0x12, 0x00]).unwrap(),
            set(&[0, 2, 5])
        );
        assert_eq!(BitField::decode_any(&[0xbc, 0x12, 0x00]).unwrap(), set(&[0, 2, 5]));
    }

    #[test]
    fn strict_rejects_non_minimal_runs() {
        // Version 00, first value 1, then a run of one written as the
        // short block 01 1000 instead of the single bit 1.
        let data = [0x34];
        assert!(BitField::from_rle_bytes(&data).is_err());
        assert_eq!(BitField::from_rle_bytes_lenient(&data).unwrap(), set(&[0]));
    }

    #[test]
    fn unknown_version_is_rejected() {
        assert!(matches!(
            BitField::from_rle_bytes_lenient(&[0x01]),
            Err(AdtError::BitField("unsupported version"))
        ));
    }

    #[test]
    fn query_helpers() {
        let bits = set(&[1, 2, 3, 10]);
        assert_eq!(bits.len(), 4);
        assert!(bits.contains(2));
        assert!(!bits.contains(4));
        assert!(bits.contains(10));
        assert_eq!(bits.ranges(), &[1..4, 10..11]);
        assert_eq!(bits.iter().collect::<Vec<_>>(), vec![1, 2, 3, 10]);
    }

    proptest::proptest! {
        #[test]
        fn encode_decode_is_a_fixed_point(
            bits in proptest::collection::btree_set(0u64..10_000, 0..64)
        ) {
            let field: BitField = bits.iter().copied().collect();
            let bytes = field.to_rle_bytes();
            let back = BitField::from_rle_bytes(&bytes).unwrap();
            proptest::prop_assert_eq!(&back, &field);
            proptest::prop_assert_eq!(back.to_rle_bytes(), bytes);
            proptest::prop_assert_eq!(BitField::from_cbor(&field.to_cbor_bytes()).unwrap(), field);
        }
    }
}
