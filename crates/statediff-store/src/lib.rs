//! Content-addressed block storage for statediff.
//!
//! State trees are stored as immutable blocks keyed by their [`Cid`]. The
//! decoder only ever reads; writing exists so tests and embedders can lay
//! out fixtures.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlockStore`] trait:
//!
//! - [`InMemoryBlockStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Blocks are immutable once written.
//! 2. A block's CID is verified against its bytes before it is stored.
//! 3. Concurrent reads are always safe.
//! 4. The store never interprets block contents.
//!
//! [`Cid`]: statediff_types::Cid

pub mod block;
pub mod error;
pub mod memory;
pub mod traits;

pub use block::Block;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBlockStore;
pub use traits::BlockStore;
