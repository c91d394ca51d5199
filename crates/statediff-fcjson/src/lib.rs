//! Filecoin-flavoured JSON for schema-typed nodes.
//!
//! [`DagMarshaler`] walks a [`Node`](statediff_schema::Node) depth first and
//! emits [`Token`]s into a [`TokenSink`]. It differs from plain DAG-JSON in
//! four places:
//!
//! - addresses render as their text form (`f01234`), whether carried as
//!   bytes or as raw-address map keys
//! - CID-bytes keys render as CID text
//! - big integers render as decimal strings
//! - bitfields render as `{"_type": "bitfield", "bytes": <hex>}` in their
//!   canonical encoding
//!
//! Links are handed to an optional [`LinkLoader`]; a loaded node is emitted
//! in place of the link, otherwise the link is written as `{"/": <cid>}`.
//!
//! Three sinks are provided: [`TokenBuffer`] collects tokens,
//! [`JsonWriter`] writes indented JSON text, and [`ValueSink`] builds a
//! `serde_json::Value`.

pub mod config;
pub mod error;
pub mod json;
pub mod marshal;
pub mod path;
pub mod token;
pub mod value;

pub use config::MarshalConfig;
pub use error::{MarshalError, MarshalResult, SinkError, SinkResult};
pub use json::{to_json_string, JsonWriter};
pub use marshal::{marshal, DagMarshaler, LinkLoader};
pub use path::{NodePath, PathSegment};
pub use token::{Token, TokenBuffer, TokenSink};
pub use value::ValueSink;
