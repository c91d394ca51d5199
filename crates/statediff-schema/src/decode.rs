//! Schema-directed DAG-CBOR decoding.
//!
//! The CBOR is read against the prototype rather than into a generic value
//! first: a struct must be an array of the declared arity, a map must have
//! text keys, and every scalar must have the major type its schema kind
//! implies. Any mismatch is an error; there is no partial result.

use indexmap::IndexMap;
use statediff_cbor::{Decoder, Value};
use tracing::trace;

use crate::error::{SchemaError, SchemaResult};
use crate::node::{Link, Node, StrTag, TaggedBytes, Text};
use crate::schema::{Prototype, TypeKind};

/// Decode `data` as one value of `proto`; trailing bytes are an error.
pub fn decode_document(proto: Prototype<'_>, data: &[u8], max_depth: usize) -> SchemaResult<Node> {
    trace!(type_name = proto.name(), len = data.len(), "schema decode");
    let mut walker = Walker {
        d: Decoder::with_max_depth(data, max_depth),
        depth: 0,
        max_depth,
    };
    let node = walker.value(proto, false)?;
    walker.d.finish()?;
    Ok(node)
}

/// Convert a generically decoded value into an untyped node.
pub fn node_from_value(value: Value) -> SchemaResult<Node> {
    Ok(match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Bool(b),
        Value::Integer(i) => Node::Int(
            i64::try_from(i).map_err(|_| SchemaError::IntOverflow { type_name: "Any" })?,
        ),
        Value::Float(f) => Node::Float(f),
        Value::Bytes(b) => Node::Bytes(TaggedBytes::new(b, Default::default())),
        Value::Text(s) => Node::String(Text::plain(s)),
        Value::Link(cid) => Node::Link(Link::Cid(cid)),
        Value::Array(items) => Node::List(
            items
                .into_iter()
                .map(node_from_value)
                .collect::<SchemaResult<_>>()?,
        ),
        Value::Map(entries) => {
            let mut map = IndexMap::with_capacity(entries.len());
            for (k, v) in entries {
                let key = Text::plain(k);
                if map.contains_key(&key) {
                    return Err(duplicate("Any", &key));
                }
                map.insert(key, node_from_value(v)?);
            }
            Node::Map(map)
        }
    })
}

struct Walker<'d> {
    d: Decoder<'d>,
    depth: usize,
    max_depth: usize,
}

impl Walker<'_> {
    fn value(&mut self, proto: Prototype<'_>, nullable: bool) -> SchemaResult<Node> {
        if nullable && self.d.try_read_null() {
            return Ok(Node::Null);
        }
        let type_name = proto.name();
        match proto.kind() {
            TypeKind::Bool => Ok(Node::Bool(self.d.read_bool()?)),
            TypeKind::Int => {
                let i = self.d.read_int()?;
                i64::try_from(i)
                    .map(Node::Int)
                    .map_err(|_| SchemaError::IntOverflow { type_name })
            }
            TypeKind::Float => Ok(Node::Float(self.d.read_float()?)),
            TypeKind::String(tag) => Ok(Node::String(Text::new(self.d.read_text()?.as_bytes(), tag))),
            TypeKind::Bytes(tag) => Ok(Node::Bytes(TaggedBytes::new(self.d.read_bytes()?, tag))),
            TypeKind::Link => Ok(Node::Link(Link::Cid(self.d.read_link()?))),
            TypeKind::Any => node_from_value(self.d.read_value()?),
            TypeKind::List { nullable, .. } => {
                let elem = value_type(proto)?;
                self.descend(|w| {
                    let len = w.d.read_array_len()?;
                    let mut items = Vec::with_capacity(len.min(1024));
                    for _ in 0..len {
                        items.push(w.value(elem, nullable)?);
                    }
                    Ok(Node::List(items))
                })
            }
            TypeKind::Map { key, nullable, .. } => {
                let value = value_type(proto)?;
                self.descend(|w| {
                    let len = w.d.read_map_len()?;
                    let mut map = IndexMap::with_capacity(len.min(1024));
                    for _ in 0..len {
                        let k = Text::new(w.d.read_text()?.as_bytes(), key);
                        if map.contains_key(&k) {
                            return Err(duplicate(type_name, &k));
                        }
                        let v = w.value(value, nullable)?;
                        map.insert(k, v);
                    }
                    Ok(Node::Map(map))
                })
            }
            TypeKind::Tuple { fields } => self.descend(|w| {
                let len = w.d.read_array_len()?;
                let required = fields.iter().filter(|f| !f.optional).count();
                if len < required || len > fields.len() {
                    return Err(SchemaError::TupleArity {
                        type_name,
                        expected: fields.len(),
                        actual: len,
                    });
                }
                let system = proto.system();
                let mut map = IndexMap::with_capacity(len);
                for field in &fields[..len] {
                    let field_proto = system.prototype(field.type_name)?;
                    let v = w.value(field_proto, field.nullable)?;
                    map.insert(Text::plain(field.name), v);
                }
                Ok(Node::Map(map))
            }),
        }
    }

    fn descend(
        &mut self,
        f: impl FnOnce(&mut Self) -> SchemaResult<Node>,
    ) -> SchemaResult<Node> {
        if self.depth >= self.max_depth {
            return Err(SchemaError::DepthExceeded {
                max: self.max_depth,
            });
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }
}

fn value_type(proto: Prototype<'_>) -> SchemaResult<Prototype<'_>> {
    proto
        .value_type()
        .ok_or_else(|| SchemaError::UnknownType(format!("value type of {}", proto.name())))
}

pub(crate) fn duplicate(type_name: &'static str, key: &Text) -> SchemaError {
    let key = match (key.tag(), key.as_str()) {
        (StrTag::Plain, Some(s)) => s.to_string(),
        _ => hex::encode(key.as_bytes()),
    };
    SchemaError::DuplicateKey { type_name, key }
}
