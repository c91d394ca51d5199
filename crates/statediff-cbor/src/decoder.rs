//! Cursor-style DAG-CBOR decoder.

use std::fmt;

use statediff_types::Cid;

use crate::constants::*;
use crate::error::{CborError, CborResult};
use crate::value::Value;

/// CBOR major type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Major {
    Unsigned,
    Negative,
    Bytes,
    Text,
    Array,
    Map,
    Tag,
    Simple,
}

impl Major {
    fn from_bits(bits: u8) -> Self {
        match bits {
            MAJOR_UIN => Major::Unsigned,
            MAJOR_NIN => Major::Negative,
            MAJOR_BIN => Major::Bytes,
            MAJOR_STR => Major::Text,
            MAJOR_ARR => Major::Array,
            MAJOR_MAP => Major::Map,
            MAJOR_TAG => Major::Tag,
            _ => Major::Simple,
        }
    }
}

impl fmt::Display for Major {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Major::Unsigned => "unsigned integer",
            Major::Negative => "negative integer",
            Major::Bytes => "byte string",
            Major::Text => "text string",
            Major::Array => "array",
            Major::Map => "map",
            Major::Tag => "tag",
            Major::Simple => "simple value",
        })
    }
}

/// An item's initial byte and argument.
///
/// For [`Major::Simple`] the argument of a float is its raw bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub major: Major,
    pub minor: u8,
    pub arg: u64,
    pub offset: usize,
}

/// DAG-CBOR decoder over a borrowed byte slice.
///
/// Every nested array, map and tag counts toward the depth limit, so hostile
/// input cannot recurse without bound.
pub struct Decoder<'a> {
    data: &'a [u8],
    x: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_max_depth(data, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(data: &'a [u8], max_depth: usize) -> Self {
        Self {
            data,
            x: 0,
            depth: 0,
            max_depth,
        }
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.x
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.x
    }

    pub fn is_empty(&self) -> bool {
        self.x >= self.data.len()
    }

    /// Succeed only when the whole input has been consumed.
    pub fn finish(&self) -> CborResult<()> {
        match self.remaining() {
            0 => Ok(()),
            count => Err(CborError::TrailingBytes { count }),
        }
    }

    // -----------------------------------------------------------------------
    // Raw input
    // -----------------------------------------------------------------------

    fn take(&mut self, n: usize) -> CborResult<&'a [u8]> {
        let end = self
            .x
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(CborError::UnexpectedEof { offset: self.x })?;
        let slice = &self.data[self.x..end];
        self.x = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> CborResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn enter(&mut self) -> CborResult<()> {
        if self.depth >= self.max_depth {
            return Err(CborError::DepthExceeded {
                max: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // -----------------------------------------------------------------------
    // Headers
    // -----------------------------------------------------------------------

    /// Major type of the next item, without consuming it.
    pub fn peek_major(&self) -> CborResult<Major> {
        self.data
            .get(self.x)
            .map(|&b| Major::from_bits(b >> 5))
            .ok_or(CborError::UnexpectedEof { offset: self.x })
    }

    /// Whether the next item is `null`.
    pub fn peek_null(&self) -> bool {
        self.data.get(self.x) == Some(&NULL)
    }

    pub fn read_header(&mut self) -> CborResult<Header> {
        let offset = self.x;
        let [initial] = self.take_array::<1>()?;
        let major = Major::from_bits(initial >> 5);
        let minor = initial & MINOR_MASK;
        let arg = match minor {
            0..=23 => minor as u64,
            24 => self.take_array::<1>()?[0] as u64,
            25 => u16::from_be_bytes(self.take_array()?) as u64,
            26 => u32::from_be_bytes(self.take_array()?) as u64,
            27 => u64::from_be_bytes(self.take_array()?),
            MINOR_INDEFINITE => return Err(CborError::IndefiniteLength { offset }),
            _ => return Err(CborError::ReservedMinor { minor, offset }),
        };
        Ok(Header {
            major,
            minor,
            arg,
            offset,
        })
    }

    fn expect(&mut self, major: Major, expected: &'static str) -> CborResult<Header> {
        let header = self.read_header()?;
        if header.major != major {
            return Err(CborError::UnexpectedMajor {
                expected,
                found: header.major,
                offset: header.offset,
            });
        }
        Ok(header)
    }

    fn length(&self, header: &Header) -> CborResult<usize> {
        usize::try_from(header.arg)
            .ok()
            .filter(|&len| len <= self.remaining())
            .ok_or(CborError::LengthOverflow {
                len: header.arg,
                offset: header.offset,
            })
    }

    // -----------------------------------------------------------------------
    // Scalars
    // -----------------------------------------------------------------------

    pub fn read_uint(&mut self) -> CborResult<u64> {
        Ok(self.expect(Major::Unsigned, "unsigned integer")?.arg)
    }

    /// Read a major type 0 or 1 integer.
    pub fn read_int(&mut self) -> CborResult<i128> {
        let header = self.read_header()?;
        match header.major {
            Major::Unsigned => Ok(header.arg as i128),
            Major::Negative => Ok(-1 - header.arg as i128),
            found => Err(CborError::UnexpectedMajor {
                expected: "integer",
                found,
                offset: header.offset,
            }),
        }
    }

    pub fn read_i64(&mut self) -> CborResult<i64> {
        let offset = self.x;
        i64::try_from(self.read_int()?).map_err(|_| CborError::IntegerOverflow { offset })
    }

    pub fn read_bytes(&mut self) -> CborResult<&'a [u8]> {
        let header = self.expect(Major::Bytes, "byte string")?;
        let len = self.length(&header)?;
        self.take(len)
    }

    pub fn read_text(&mut self) -> CborResult<&'a str> {
        let header = self.expect(Major::Text, "text string")?;
        let len = self.length(&header)?;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map_err(|_| CborError::InvalidUtf8 {
            offset: header.offset,
        })
    }

    pub fn read_bool(&mut self) -> CborResult<bool> {
        let header = self.expect(Major::Simple, "boolean")?;
        match header.minor {
            SIMPLE_FALSE => Ok(false),
            SIMPLE_TRUE => Ok(true),
            value => Err(CborError::UnsupportedSimple {
                value,
                offset: header.offset,
            }),
        }
    }

    pub fn read_null(&mut self) -> CborResult<()> {
        let header = self.expect(Major::Simple, "null")?;
        match header.minor {
            SIMPLE_NULL => Ok(()),
            value => Err(CborError::UnsupportedSimple {
                value,
                offset: header.offset,
            }),
        }
    }

    /// Consume a `null` if one is next.
    pub fn try_read_null(&mut self) -> bool {
        if self.peek_null() {
            self.x += 1;
            true
        } else {
            false
        }
    }

    pub fn read_float(&mut self) -> CborResult<f64> {
        let header = self.expect(Major::Simple, "float")?;
        float_from_header(&header)
    }

    /// Read a tag 42 CID link.
    pub fn read_link(&mut self) -> CborResult<Cid> {
        let header = self.expect(Major::Tag, "cid link")?;
        if header.arg != TAG_CID {
            return Err(CborError::UnexpectedTag {
                tag: header.arg,
                offset: header.offset,
            });
        }
        let bytes = self.read_bytes()?;
        link_from_bytes(bytes, header.offset)
    }

    // -----------------------------------------------------------------------
    // Containers
    // -----------------------------------------------------------------------

    pub fn read_array_len(&mut self) -> CborResult<usize> {
        let header = self.expect(Major::Array, "array")?;
        self.length(&header)
    }

    pub fn read_map_len(&mut self) -> CborResult<usize> {
        let header = self.expect(Major::Map, "map")?;
        // Each entry takes at least two bytes.
        usize::try_from(header.arg)
            .ok()
            .filter(|&len| len <= self.remaining() / 2)
            .ok_or(CborError::LengthOverflow {
                len: header.arg,
                offset: header.offset,
            })
    }

    /// Run `f` one nesting level deeper.
    pub fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> CborResult<T>) -> CborResult<T> {
        self.enter()?;
        let out = f(self);
        self.leave();
        out
    }

    /// Skip one complete item.
    pub fn skip_value(&mut self) -> CborResult<()> {
        let header = self.read_header()?;
        match header.major {
            Major::Unsigned | Major::Negative | Major::Simple => Ok(()),
            Major::Bytes | Major::Text => {
                let len = self.length(&header)?;
                self.take(len).map(|_| ())
            }
            Major::Array => {
                let len = self.length(&header)?;
                self.nested(|d| (0..len).try_for_each(|_| d.skip_value()))
            }
            Major::Map => {
                let len = self.length(&header)?;
                self.nested(|d| (0..len * 2).try_for_each(|_| d.skip_value()))
            }
            Major::Tag => self.nested(|d| d.skip_value()),
        }
    }

    /// Consume one item and return its raw bytes.
    pub fn read_raw(&mut self) -> CborResult<&'a [u8]> {
        let start = self.x;
        self.skip_value()?;
        Ok(&self.data[start..self.x])
    }

    /// Decode one item into a generic [`Value`].
    pub fn read_value(&mut self) -> CborResult<Value> {
        let header = self.read_header()?;
        match header.major {
            Major::Unsigned => Ok(Value::Integer(header.arg as i128)),
            Major::Negative => Ok(Value::Integer(-1 - header.arg as i128)),
            Major::Bytes => {
                let len = self.length(&header)?;
                Ok(Value::Bytes(self.take(len)?.to_vec()))
            }
            Major::Text => {
                let len = self.length(&header)?;
                let bytes = self.take(len)?;
                std::str::from_utf8(bytes)
                    .map(|s| Value::Text(s.to_owned()))
                    .map_err(|_| CborError::InvalidUtf8 {
                        offset: header.offset,
                    })
            }
            Major::Array => {
                let len = self.length(&header)?;
                self.nested(|d| {
                    let mut items = Vec::with_capacity(len);
                    for _ in 0..len {
                        items.push(d.read_value()?);
                    }
                    Ok(Value::Array(items))
                })
            }
            Major::Map => {
                let len = self.length(&header)?;
                self.nested(|d| {
                    let mut entries = Vec::with_capacity(len);
                    for _ in 0..len {
                        if d.peek_major()? != Major::Text {
                            return Err(CborError::NonTextKey { offset: d.x });
                        }
                        let key = d.read_text()?.to_owned();
                        entries.push((key, d.read_value()?));
                    }
                    Ok(Value::Map(entries))
                })
            }
            Major::Tag if header.arg == TAG_CID => {
                let bytes = self.nested(|d| d.read_bytes())?;
                Ok(Value::Link(link_from_bytes(bytes, header.offset)?))
            }
            Major::Tag => Err(CborError::UnexpectedTag {
                tag: header.arg,
                offset: header.offset,
            }),
            Major::Simple => match header.minor {
                SIMPLE_FALSE => Ok(Value::Bool(false)),
                SIMPLE_TRUE => Ok(Value::Bool(true)),
                SIMPLE_NULL => Ok(Value::Null),
                FLOAT_16 | FLOAT_32 | FLOAT_64 => float_from_header(&header).map(Value::Float),
                value => Err(CborError::UnsupportedSimple {
                    value,
                    offset: header.offset,
                }),
            },
        }
    }
}

fn link_from_bytes(bytes: &[u8], offset: usize) -> CborResult<Cid> {
    match bytes.split_first() {
        Some((0x00, rest)) => Cid::from_bytes(rest).map_err(|e| CborError::InvalidLink {
            offset,
            reason: e.to_string(),
        }),
        _ => Err(CborError::InvalidLink {
            offset,
            reason: "missing identity multibase prefix".into(),
        }),
    }
}

fn float_from_header(header: &Header) -> CborResult<f64> {
    match header.minor {
        FLOAT_16 => Ok(f16_to_f64(header.arg as u16)),
        FLOAT_32 => Ok(f32::from_bits(header.arg as u32) as f64),
        FLOAT_64 => Ok(f64::from_bits(header.arg)),
        value => Err(CborError::UnsupportedSimple {
            value,
            offset: header.offset,
        }),
    }
}

fn f16_to_f64(bits: u16) -> f64 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exp = ((bits >> 10) & 0x1f) as i32;
    let mant = (bits & 0x3ff) as f64;
    let magnitude = match exp {
        0 => mant * 2f64.powi(-24),
        31 if mant == 0.0 => f64::INFINITY,
        31 => f64::NAN,
        _ => (1.0 + mant / 1024.0) * 2f64.powi(exp - 15),
    };
    sign * magnitude
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use statediff_types::codec;

    fn dec(hex_str: &str) -> Vec<u8> {
        hex::decode(hex_str).unwrap()
    }

    // -----------------------------------------------------------------------
    // Scalars
    // -----------------------------------------------------------------------

    #[test]
    fn unsigned_widths() {
        for (input, expected) in [
            ("17", 23u64),
            ("1818", 24),
            ("190100", 256),
            ("1a00010000", 65536),
            ("1b0000000100000000", 1 << 32),
        ] {
            let data = dec(input);
            let mut d = Decoder::new(&data);
            assert_eq!(d.read_uint().unwrap(), expected, "{input}");
            assert!(d.finish().is_ok());
        }
    }

    #[test]
    fn negative_integers() {
        let data = dec("3903e7");
        assert_eq!(Decoder::new(&data).read_int().unwrap(), -1000);
        let data = dec("3bffffffffffffffff");
        assert_eq!(Decoder::new(&data).read_int().unwrap(), -(1i128 << 64));
        assert!(matches!(
            Decoder::new(&data).read_i64(),
            Err(CborError::IntegerOverflow { offset: 0 })
        ));
    }

    #[test]
    fn text_and_bytes() {
        let data = dec("6449455446");
        assert_eq!(Decoder::new(&data).read_text().unwrap(), "IETF");
        let data = dec("4401020304");
        assert_eq!(Decoder::new(&data).read_bytes().unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn floats_of_every_width() {
        assert_eq!(Decoder::new(&dec("f93c00")).read_float().unwrap(), 1.0);
        assert_eq!(Decoder::new(&dec("f9c400")).read_float().unwrap(), -4.0);
        assert_eq!(Decoder::new(&dec("fa47c35000")).read_float().unwrap(), 100000.0);
        assert_eq!(
            Decoder::new(&dec("fb3ff199999999999a")).read_float().unwrap(),
            1.1
        );
    }

    #[test]
    fn wrong_major_is_reported() {
        let data = dec("6161");
        let err = Decoder::new(&data).read_uint().unwrap_err();
        assert_eq!(
            err,
            CborError::UnexpectedMajor {
                expected: "unsigned integer",
                found: Major::Text,
                offset: 0
            }
        );
    }

    #[test]
    fn indefinite_length_is_rejected() {
        let data = dec("9f01ff");
        assert_eq!(
            Decoder::new(&data).read_array_len().unwrap_err(),
            CborError::IndefiniteLength { offset: 0 }
        );
    }

    #[test]
    fn truncated_input() {
        let data = dec("1a0001");
        assert!(matches!(
            Decoder::new(&data).read_uint(),
            Err(CborError::UnexpectedEof { .. })
        ));
        let data = dec("45010203");
        assert!(matches!(
            Decoder::new(&data).read_bytes(),
            Err(CborError::LengthOverflow { len: 5, .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Links
    // -----------------------------------------------------------------------

    #[test]
    fn link_roundtrip_through_tag_42() {
        let cid = Cid::for_block(codec::DAG_CBOR, b"child");
        let mut enc = crate::Encoder::new();
        enc.write_link(&cid);
        let data = enc.into_bytes();
        assert_eq!(data[0], 0xd8);
        assert_eq!(data[1], 42);
        assert_eq!(Decoder::new(&data).read_link().unwrap(), cid);
    }

    #[test]
    fn link_without_prefix_is_rejected() {
        let cid = Cid::for_block(codec::DAG_CBOR, b"child");
        let mut enc = crate::Encoder::new();
        enc.write_tag(TAG_CID);
        enc.write_bytes(&cid.to_bytes());
        let data = enc.into_bytes();
        assert!(matches!(
            Decoder::new(&data).read_link(),
            Err(CborError::InvalidLink { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    #[test]
    fn read_raw_spans_one_item() {
        // [1, [2, 3], "a"] followed by 0x04
        let data = dec("8301820203616104");
        let mut d = Decoder::new(&data);
        assert_eq!(d.read_array_len().unwrap(), 3);
        assert_eq!(d.read_raw().unwrap(), &[0x01]);
        assert_eq!(d.read_raw().unwrap(), &[0x82, 0x02, 0x03]);
        assert_eq!(d.read_raw().unwrap(), &[0x61, 0x61]);
        assert_eq!(d.finish(), Err(CborError::TrailingBytes { count: 1 }));
    }

    #[test]
    fn depth_limit_applies() {
        let data = vec![0x81; 10]
            .into_iter()
            .chain(std::iter::once(0x01))
            .collect::<Vec<_>>();
        assert!(Decoder::with_max_depth(&data, 10).read_value().is_ok());
        assert_eq!(
            Decoder::with_max_depth(&data, 9).read_value().unwrap_err(),
            CborError::DepthExceeded { max: 9 }
        );
        assert_eq!(
            Decoder::with_max_depth(&data, 9).skip_value().unwrap_err(),
            CborError::DepthExceeded { max: 9 }
        );
    }

    #[test]
    fn map_keys_must_be_text() {
        let data = dec("a10102");
        assert_eq!(
            Decoder::new(&data).read_value().unwrap_err(),
            CborError::NonTextKey { offset: 1 }
        );
    }

    #[test]
    fn peek_and_try_null() {
        let data = dec("f601");
        let mut d = Decoder::new(&data);
        assert!(d.peek_null());
        assert!(d.try_read_null());
        assert!(!d.try_read_null());
        assert_eq!(d.peek_major().unwrap(), Major::Unsigned);
    }

    #[test]
    fn undefined_is_unsupported() {
        let data = dec("f7");
        assert_eq!(
            Decoder::new(&data).read_value().unwrap_err(),
            CborError::UnsupportedSimple {
                value: SIMPLE_UNDEFINED,
                offset: 0
            }
        );
    }

    fn canonical_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (-(1i128 << 64)..(1i128 << 64)).prop_map(Value::Integer),
            any::<f64>()
                .prop_filter("finite", |f| f.is_finite())
                .prop_map(Value::Float),
            prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
            "[a-z0-9]{0,8}".prop_map(Value::Text),
            prop::collection::vec(any::<u8>(), 0..8)
                .prop_map(|b| Value::Link(Cid::for_block(codec::DAG_CBOR, &b))),
        ];
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                // Unique keys in length-first order, as the encoder writes them.
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..6).prop_map(|entries| {
                    let mut entries: Vec<(String, Value)> = entries.into_iter().collect();
                    entries.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
                    Value::Map(entries)
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn encoded_values_read_back(value in canonical_value()) {
            let bytes = crate::to_vec(&value);

            let mut d = Decoder::new(&bytes);
            prop_assert_eq!(d.read_value().unwrap(), value);
            prop_assert!(d.finish().is_ok());

            let mut d = Decoder::new(&bytes);
            prop_assert_eq!(d.read_raw().unwrap(), &bytes[..]);
            prop_assert!(d.is_empty());
        }
    }
}
