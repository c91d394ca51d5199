//! Foundation types for statediff.
//!
//! This crate provides the identifier and scalar encodings used throughout
//! the state decoder and the marshaler. Every other statediff crate depends
//! on `statediff-types`.
//!
//! # Key Types
//!
//! - [`Cid`] -- Content identifier naming an immutable block
//! - [`Multihash`] -- Self-describing digest carried inside a [`Cid`]
//! - [`Address`] -- Filecoin actor address (binary and text forms)
//! - [`Network`] -- Text prefix used when rendering addresses
//!
//! Helpers for unsigned varints, multibase alphabets, and big-endian
//! unsigned integers of arbitrary length live in [`varint`], [`multibase`]
//! and [`uint`].

pub mod address;
pub mod cid;
pub mod error;
pub mod multibase;
pub mod uint;
pub mod varint;

pub use address::{Address, Network, Protocol};
pub use cid::{codec, multihash_code, Cid, Multihash, Version};
pub use error::{TypeError, TypeResult};
pub use uint::{decimal_from_be_bytes, u64_from_be_bytes};
pub use varint::{decode_uvarint, encode_uvarint};
