//! Sharded state structures.
//!
//! Filecoin actors keep large collections in content-addressed tries whose
//! nodes are separate blocks. Each structure here offers one read primitive,
//! a `for_each` that visits every entry exactly once in the structure's
//! native order and loads shards lazily from a [`BlockStore`]. Each also has
//! a `build` that lays out a well-formed structure in a store.
//!
//! - [`Hamt`] -- hash array mapped trie keyed by byte strings
//! - [`Amt`] -- array mapped trie keyed by `u64` index
//! - [`Multimap`] -- HAMT whose values are AMTs
//! - [`Set`] -- HAMT whose values are ignored
//! - [`BitField`] -- RLE+ run-length compressed bit set
//!
//! [`BlockStore`]: statediff_store::BlockStore

pub mod amt;
pub mod bitfield;
pub mod error;
pub mod hamt;
pub mod multimap;
pub mod set;

mod node_util;

pub use amt::Amt;
pub use bitfield::BitField;
pub use error::{AdtError, AdtResult};
pub use hamt::{Hamt, DEFAULT_BIT_WIDTH};
pub use multimap::Multimap;
pub use set::Set;
