//! DAG-CBOR for statediff.
//!
//! Filecoin state is encoded as DAG-CBOR: definite-length CBOR with text map
//! keys and CID links under tag 42. This crate provides:
//!
//! - [`Decoder`] -- a cursor over a byte slice, with typed reads, raw value
//!   spans, and a nesting depth limit
//! - [`Encoder`] -- minimal-length writer used to lay out fixtures
//! - [`Value`] -- a generic decoded value tree
//! - [`Deferred`] -- a raw, not yet interpreted value span
//!
//! Indefinite-length items are rejected.

pub mod constants;
pub mod decoder;
pub mod deferred;
pub mod encoder;
pub mod error;
pub mod value;

pub use constants::{DEFAULT_MAX_DEPTH, TAG_CID};
pub use decoder::{Decoder, Header, Major};
pub use deferred::Deferred;
pub use encoder::Encoder;
pub use error::{CborError, CborResult};
pub use value::Value;

/// Decode a single value occupying all of `data`.
pub fn from_slice(data: &[u8]) -> CborResult<Value> {
    let mut decoder = Decoder::new(data);
    let value = decoder.read_value()?;
    decoder.finish()?;
    Ok(value)
}

/// Encode a value.
pub fn to_vec(value: &Value) -> Vec<u8> {
    let mut encoder = Encoder::new();
    encoder.write_value(value);
    encoder.into_bytes()
}
