use std::fmt;

use statediff_types::Cid;

use crate::decoder::Decoder;
use crate::error::CborResult;
use crate::value::Value;

/// One encoded CBOR item whose interpretation is left to the caller.
///
/// Sharded structures hand out their values this way: the element type is
/// only known to whoever walks the structure.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Deferred<'a> {
    raw: &'a [u8],
}

impl<'a> Deferred<'a> {
    /// Wrap an already delimited item.
    pub fn new(raw: &'a [u8]) -> Self {
        Self { raw }
    }

    /// Read the next item from `decoder` without interpreting it.
    pub fn read(decoder: &mut Decoder<'a>) -> CborResult<Self> {
        decoder.read_raw().map(Self::new)
    }

    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    /// A fresh decoder over the item.
    pub fn decoder(&self) -> Decoder<'a> {
        Decoder::new(self.raw)
    }

    fn decode_with<T>(&self, f: impl FnOnce(&mut Decoder<'a>) -> CborResult<T>) -> CborResult<T> {
        let mut decoder = self.decoder();
        let out = f(&mut decoder)?;
        decoder.finish()?;
        Ok(out)
    }

    pub fn decode_value(&self) -> CborResult<Value> {
        self.decode_with(|d| d.read_value())
    }

    pub fn as_link(&self) -> CborResult<Cid> {
        self.decode_with(|d| d.read_link())
    }

    pub fn as_bytes(&self) -> CborResult<&'a [u8]> {
        self.decode_with(|d| d.read_bytes())
    }

    pub fn as_uint(&self) -> CborResult<u64> {
        self.decode_with(|d| d.read_uint())
    }

    pub fn is_null(&self) -> bool {
        self.raw == [crate::constants::NULL]
    }
}

impl fmt::Debug for Deferred<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deferred({} bytes)", self.raw.len())
    }
}
