//! Builders and assemblers.
//!
//! A [`NodeBuilder`] is single-use: every `assign_*` consumes it and returns
//! the finished node, and `begin_map`/`begin_list` turn it into an assembler
//! whose `finish` consumes it in turn. Entries are added through a
//! [`SlotAssembler`], which borrows its parent until the value is assigned.

use indexmap::IndexMap;
use statediff_cbor::DEFAULT_MAX_DEPTH;
use statediff_types::Cid;

use crate::decode::duplicate;
use crate::error::{SchemaError, SchemaResult};
use crate::node::{BytesTag, Kind, Link, Node, StrTag, TaggedBytes, Text};
use crate::schema::{Prototype, TypeKind};

/// Builds one node of a prototype.
#[derive(Debug, Clone, Copy)]
pub struct NodeBuilder<'a> {
    proto: Prototype<'a>,
    nullable: bool,
    max_depth: usize,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(proto: Prototype<'a>) -> Self {
        Self {
            proto,
            nullable: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Nesting limit for `assign_cbor`, inherited by child builders.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn prototype(&self) -> Prototype<'a> {
        self.proto
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn child(&self, proto: Prototype<'a>, nullable: bool) -> NodeBuilder<'a> {
        NodeBuilder {
            proto,
            nullable,
            max_depth: self.max_depth,
        }
    }

    fn mismatch(&self, actual: Kind) -> SchemaError {
        SchemaError::KindMismatch {
            type_name: self.proto.name(),
            expected: self.proto.repr_kind().map_or("any", Kind::as_str),
            actual,
        }
    }

    fn value_type(&self) -> SchemaResult<Prototype<'a>> {
        self.proto.value_type().ok_or_else(|| {
            SchemaError::UnknownType(format!("value type of {}", self.proto.name()))
        })
    }

    pub fn begin_map(self, size_hint: usize) -> SchemaResult<MapAssembler<'a>> {
        let TypeKind::Map { key, nullable, .. } = self.proto.kind() else {
            return Err(self.mismatch(Kind::Map));
        };
        Ok(MapAssembler {
            value: self.child(self.value_type()?, nullable),
            key_tag: key,
            proto: self.proto,
            entries: IndexMap::with_capacity(size_hint.min(4096)),
        })
    }

    pub fn begin_list(self, size_hint: usize) -> SchemaResult<ListAssembler<'a>> {
        let TypeKind::List { nullable, .. } = self.proto.kind() else {
            return Err(self.mismatch(Kind::List));
        };
        Ok(ListAssembler {
            elem: self.child(self.value_type()?, nullable),
            proto: self.proto,
            items: Vec::with_capacity(size_hint.min(4096)),
        })
    }

    pub fn assign_null(self) -> SchemaResult<Node> {
        self.assign_node(Node::Null)
    }

    pub fn assign_bool(self, v: bool) -> SchemaResult<Node> {
        self.assign_node(Node::Bool(v))
    }

    pub fn assign_int(self, v: i64) -> SchemaResult<Node> {
        self.assign_node(Node::Int(v))
    }

    /// Bytes take the prototype's domain tag.
    pub fn assign_bytes(self, v: impl Into<Vec<u8>>) -> SchemaResult<Node> {
        let tag = match self.proto.kind() {
            TypeKind::Bytes(tag) => tag,
            _ => BytesTag::Plain,
        };
        self.assign_node(Node::Bytes(TaggedBytes::new(v, tag)))
    }

    /// Strings take the prototype's domain tag.
    pub fn assign_string(self, v: impl Into<Vec<u8>>) -> SchemaResult<Node> {
        let tag = match self.proto.kind() {
            TypeKind::String(tag) => tag,
            _ => StrTag::Plain,
        };
        self.assign_node(Node::String(Text::new(v, tag)))
    }

    pub fn assign_link(self, cid: Cid) -> SchemaResult<Node> {
        self.assign_node(Node::Link(Link::Cid(cid)))
    }

    /// Accept a finished node if its kind fits the prototype.
    pub fn assign_node(self, node: Node) -> SchemaResult<Node> {
        if self.proto.accepts(&node, self.nullable) {
            Ok(node)
        } else {
            Err(self.mismatch(node.kind()))
        }
    }

    /// Decode one DAG-CBOR document against the prototype.
    pub fn assign_cbor(self, data: &[u8]) -> SchemaResult<Node> {
        if self.nullable && data == [statediff_cbor::constants::NULL] {
            return Ok(Node::Null);
        }
        self.proto.decode_with_depth(data, self.max_depth)
    }
}

/// Collects the entries of a map node.
#[derive(Debug)]
pub struct MapAssembler<'a> {
    proto: Prototype<'a>,
    key_tag: StrTag,
    value: NodeBuilder<'a>,
    entries: IndexMap<Text, Node>,
}

impl<'a> MapAssembler<'a> {
    pub fn prototype(&self) -> Prototype<'a> {
        self.proto
    }

    pub fn key_tag(&self) -> StrTag {
        self.key_tag
    }

    /// Builder for a value, not tied to any entry.
    pub fn value_builder(&self) -> NodeBuilder<'a> {
        self.value
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Open the slot for `key`. Keys take the map's key tag; a key already
    /// present is an error.
    pub fn assemble_entry(&mut self, key: impl Into<Vec<u8>>) -> SchemaResult<SlotAssembler<'_, 'a>> {
        let key = Text::new(key, self.key_tag);
        if self.entries.contains_key(&key) {
            return Err(duplicate(self.proto.name(), &key));
        }
        Ok(SlotAssembler {
            builder: self.value,
            slot: Slot::Entry(&mut self.entries, key),
        })
    }

    pub fn finish(self) -> SchemaResult<Node> {
        Ok(Node::Map(self.entries))
    }
}

/// Collects the elements of a list node.
#[derive(Debug)]
pub struct ListAssembler<'a> {
    proto: Prototype<'a>,
    elem: NodeBuilder<'a>,
    items: Vec<Node>,
}

impl<'a> ListAssembler<'a> {
    pub fn prototype(&self) -> Prototype<'a> {
        self.proto
    }

    pub fn value_builder(&self) -> NodeBuilder<'a> {
        self.elem
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn assemble_value(&mut self) -> SlotAssembler<'_, 'a> {
        SlotAssembler {
            builder: self.elem,
            slot: Slot::Item(&mut self.items),
        }
    }

    pub fn finish(self) -> SchemaResult<Node> {
        Ok(Node::List(self.items))
    }
}

#[derive(Debug)]
enum Slot<'s> {
    Entry(&'s mut IndexMap<Text, Node>, Text),
    Item(&'s mut Vec<Node>),
}

/// One pending map entry or list element.
#[derive(Debug)]
pub struct SlotAssembler<'s, 'a> {
    builder: NodeBuilder<'a>,
    slot: Slot<'s>,
}

impl<'a> SlotAssembler<'_, 'a> {
    /// Builder for the slot's value type, for values assembled elsewhere
    /// and then passed to [`assign_node`](Self::assign_node).
    pub fn builder(&self) -> NodeBuilder<'a> {
        self.builder
    }

    pub fn assign_node(self, node: Node) -> SchemaResult<()> {
        let node = self.builder.assign_node(node)?;
        match self.slot {
            Slot::Entry(entries, key) => {
                entries.insert(key, node);
            }
            Slot::Item(items) => items.push(node),
        }
        Ok(())
    }

    pub fn assign_int(self, v: i64) -> SchemaResult<()> {
        let node = self.builder.assign_int(v)?;
        self.assign_node(node)
    }

    pub fn assign_bytes(self, v: impl Into<Vec<u8>>) -> SchemaResult<()> {
        let node = self.builder.assign_bytes(v)?;
        self.assign_node(node)
    }

    pub fn assign_cbor(self, data: &[u8]) -> SchemaResult<()> {
        let node = self.builder.assign_cbor(data)?;
        self.assign_node(node)
    }
}
