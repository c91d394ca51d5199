//! Schema-typed nodes for Filecoin actor state.
//!
//! A [`TypeSystem`] is a static table of named [`TypeDef`]s. A
//! [`Prototype`] is one type within a system; it hands out
//! [`NodeBuilder`]s, which produce immutable [`Node`]s either by direct
//! assignment, through map and list assemblers, or by decoding DAG-CBOR
//! against the type.
//!
//! Nodes carry domain tags on strings and bytes (addresses, CID bytes,
//! big integers, bitfields) so renderers can format them without knowing
//! the schema.
//!
//! # Building
//!
//! Builders and assemblers are consumed by `finish`/`assign_*`, so a node
//! can never be observed half built.

pub mod actors;
pub mod builder;
pub mod decode;
pub mod error;
pub mod node;
pub mod schema;

pub use builder::{ListAssembler, MapAssembler, NodeBuilder, SlotAssembler};
pub use error::{SchemaError, SchemaResult};
pub use node::{BytesTag, Kind, Link, Maybe, Node, StrTag, TaggedBytes, Text};
pub use schema::{Field, Prototype, TypeDef, TypeKind, TypeSystem};
