//! Minimal-length DAG-CBOR writer.

use statediff_types::Cid;

use crate::constants::*;
use crate::value::Value;

/// DAG-CBOR encoder writing into an owned buffer.
///
/// Integers and lengths always use the shortest header; floats are always
/// written as 64-bit. [`Value::Map`] entries are sorted length-first as
/// DAG-CBOR requires.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    fn write_header(&mut self, major: u8, arg: u64) {
        let overlay = major << 5;
        if arg <= 23 {
            self.buf.push(overlay | arg as u8);
        } else if arg <= 0xff {
            self.buf.extend_from_slice(&[overlay | 24, arg as u8]);
        } else if arg <= 0xffff {
            self.buf.push(overlay | 25);
            self.buf.extend_from_slice(&(arg as u16).to_be_bytes());
        } else if arg <= 0xffff_ffff {
            self.buf.push(overlay | 26);
            self.buf.extend_from_slice(&(arg as u32).to_be_bytes());
        } else {
            self.buf.push(overlay | 27);
            self.buf.extend_from_slice(&arg.to_be_bytes());
        }
    }

    pub fn write_uint(&mut self, v: u64) {
        self.write_header(MAJOR_UIN, v);
    }

    pub fn write_int(&mut self, v: i64) {
        if v >= 0 {
            self.write_header(MAJOR_UIN, v as u64);
        } else {
            self.write_header(MAJOR_NIN, (-1 - v) as u64);
        }
    }

    /// Write an integer in the full CBOR range `-2^64..2^64`.
    ///
    /// Values outside that range are clamped.
    pub fn write_big_int(&mut self, v: i128) {
        if v >= 0 {
            self.write_header(MAJOR_UIN, u64::try_from(v).unwrap_or(u64::MAX));
        } else {
            self.write_header(MAJOR_NIN, u64::try_from(-1 - v).unwrap_or(u64::MAX));
        }
    }

    pub fn write_float(&mut self, v: f64) {
        self.buf.push((MAJOR_TKN << 5) | FLOAT_64);
        self.buf.extend_from_slice(&v.to_bits().to_be_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf
            .push((MAJOR_TKN << 5) | if v { SIMPLE_TRUE } else { SIMPLE_FALSE });
    }

    pub fn write_null(&mut self) {
        self.buf.push(NULL);
    }

    pub fn write_bytes(&mut self, v: &[u8]) {
        self.write_header(MAJOR_BIN, v.len() as u64);
        self.buf.extend_from_slice(v);
    }

    pub fn write_text(&mut self, v: &str) {
        self.write_header(MAJOR_STR, v.len() as u64);
        self.buf.extend_from_slice(v.as_bytes());
    }

    pub fn write_array_header(&mut self, len: usize) {
        self.write_header(MAJOR_ARR, len as u64);
    }

    pub fn write_map_header(&mut self, len: usize) {
        self.write_header(MAJOR_MAP, len as u64);
    }

    pub fn write_tag(&mut self, tag: u64) {
        self.write_header(MAJOR_TAG, tag);
    }

    /// Write a tag 42 link with its identity multibase prefix.
    pub fn write_link(&mut self, cid: &Cid) {
        let mut bytes = Vec::with_capacity(40);
        bytes.push(0x00);
        bytes.extend_from_slice(&cid.to_bytes());
        self.write_tag(TAG_CID);
        self.write_bytes(&bytes);
    }

    /// Splice already-encoded bytes.
    pub fn write_raw(&mut self, raw: &[u8]) {
        self.buf.extend_from_slice(raw);
    }

    pub fn write_value(&mut self, value: &Value) {
        match value {
            Value::Null => self.write_null(),
            Value::Bool(b) => self.write_bool(*b),
            Value::Integer(i) => self.write_big_int(*i),
            Value::Float(f) => self.write_float(*f),
            Value::Bytes(b) => self.write_bytes(b),
            Value::Text(s) => self.write_text(s),
            Value::Array(items) => {
                self.write_array_header(items.len());
                for item in items {
                    self.write_value(item);
                }
            }
            Value::Map(entries) => {
                let mut sorted: Vec<&(String, Value)> = entries.iter().collect();
                sorted.sort_by(|(a, _), (b, _)| {
                    a.len().cmp(&b.len()).then_with(|| a.as_bytes().cmp(b.as_bytes()))
                });
                self.write_map_header(sorted.len());
                for (key, item) in sorted {
                    self.write_text(key);
                    self.write_value(item);
                }
            }
            Value::Link(cid) => self.write_link(cid),
        }
    }
}
