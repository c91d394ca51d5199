//! # statediff
//!
//! Decode Filecoin actor state into schema-typed nodes and render it as
//! JSON.
//!
//! A type path such as `storageMinerActor.Deadlines.Due[3].Partitions`
//! names where a block sits in the state tree. [`resolve_type`] normalizes it
//! to a [`TypeKey`]; the [`Registry`] maps the key to a schema type and the
//! type to the [`Shape`] of the structure that stores it; the [`Loader`]
//! walks that structure and assembles a [`Node`].
//!
//! ```text
//! type path --resolve--> TypeKey --registry--> prototype + Shape
//!                                                   |
//!                     block store <--- Loader ------+
//!                                        |
//!                                      Node --DagMarshaler--> tokens --> JSON
//! ```
//!
//! [`StateLinkLoader`] plugs the decoder into the marshaler so links in the
//! output are expanded by decoding the block they point at, typed by the
//! path at which they were found.
//!
//! ## Design Rules
//!
//! 1. Everything is synchronous and depth-first; registries are read-only
//!    statics shared across threads.
//! 2. Every container is decoded completely or not at all.
//! 3. Nesting is bounded in the CBOR reader, the schema decoder, the
//!    structure walkers and the marshaler.

pub mod config;
pub mod error;
pub mod load;
pub mod registry;
pub mod resolve;
pub mod state_loader;
pub mod transform;

#[cfg(test)]
mod fixtures;

pub use config::DecodeConfig;
pub use error::{TransformError, TransformResult};
pub use load::Loader;
pub use registry::{KeyMode, Registry, Shape};
pub use resolve::{resolve_type, TypeKey};
pub use state_loader::{marshal_state, StateLinkLoader};
pub use transform::{transform, Transformer};

pub use statediff_fcjson::{
    marshal, DagMarshaler, JsonWriter, LinkLoader, MarshalConfig, NodePath, Token, TokenBuffer,
    TokenSink, ValueSink,
};
pub use statediff_schema::{Maybe, Node, Prototype, TypeSystem};
pub use statediff_store::{BlockStore, InMemoryBlockStore};
pub use statediff_types::{Address, Cid, Network};
