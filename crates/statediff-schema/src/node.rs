//! The immutable schema-typed node.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use statediff_types::Cid;

/// Representation kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Bytes,
    Link,
    Map,
    List,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::Link => "link",
            Kind::Map => "map",
            Kind::List => "list",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain tag on string nodes and map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StrTag {
    #[default]
    Plain,
    /// Binary address bytes carried in a string slot (HAMT keys).
    RawAddress,
    /// Binary CID bytes carried in a string slot (HAMT keys).
    CidString,
}

/// Domain tag on byte nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BytesTag {
    #[default]
    Plain,
    Address,
    /// Sign-prefixed big-endian integer, as Filecoin serializes `big.Int`.
    BigInt,
    /// RLE+ bitfield, direct or CBOR-wrapped.
    BitField,
}

/// A tagged string.
///
/// Map keys from sharded structures are arbitrary bytes, so the payload is
/// not required to be UTF-8. Equality and hashing look at the bytes only,
/// which lets maps be queried by `&[u8]`.
#[derive(Clone)]
pub struct Text {
    bytes: Vec<u8>,
    tag: StrTag,
}

impl Text {
    pub fn new(bytes: impl Into<Vec<u8>>, tag: StrTag) -> Self {
        Self {
            bytes: bytes.into(),
            tag,
        }
    }

    pub fn plain(s: impl Into<String>) -> Self {
        Self::new(s.into().into_bytes(), StrTag::Plain)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn tag(&self) -> StrTag {
        self.tag
    }

    /// The payload as UTF-8, if it is.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Text {}

impl Hash for Text {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl Borrow<[u8]> for Text {
    fn borrow(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.tag, self.as_str()) {
            (StrTag::Plain, Some(s)) => write!(f, "{s:?}"),
            (tag, _) => write!(f, "{tag:?}(0x{})", hex::encode(&self.bytes)),
        }
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Self::plain(s)
    }
}

/// Bytes with a domain tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedBytes {
    pub bytes: Vec<u8>,
    pub tag: BytesTag,
}

impl TaggedBytes {
    pub fn new(bytes: impl Into<Vec<u8>>, tag: BytesTag) -> Self {
        Self {
            bytes: bytes.into(),
            tag,
        }
    }
}

/// A link. Only CID links can be decoded from DAG-CBOR; other link kinds
/// exist for nodes assembled by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    Cid(Cid),
    Other(String),
}

/// A schema-typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Text),
    Bytes(TaggedBytes),
    Link(Link),
    Map(IndexMap<Text, Node>),
    List(Vec<Node>),
}

impl Node {
    pub fn kind(&self) -> Kind {
        match self {
            Node::Null => Kind::Null,
            Node::Bool(_) => Kind::Bool,
            Node::Int(_) => Kind::Int,
            Node::Float(_) => Kind::Float,
            Node::String(_) => Kind::String,
            Node::Bytes(_) => Kind::Bytes,
            Node::Link(_) => Kind::Link,
            Node::Map(_) => Kind::Map,
            Node::List(_) => Kind::List,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    /// Entry count of a map or list; zero for scalars.
    pub fn len(&self) -> usize {
        match self {
            Node::Map(m) => m.len(),
            Node::List(l) => l.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map lookup by key bytes.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&Node> {
        match self {
            Node::Map(m) => m.get(key.as_ref()),
            _ => None,
        }
    }

    /// Struct field lookup with the absent/null distinction kept.
    pub fn field(&self, name: &str) -> Maybe<&Node> {
        match self.get(name) {
            None => Maybe::Absent,
            Some(Node::Null) => Maybe::Null,
            Some(node) => Maybe::Value(node),
        }
    }

    pub fn index(&self, i: usize) -> Option<&Node> {
        match self {
            Node::List(l) => l.get(i),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Node::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::String(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&TaggedBytes> {
        match self {
            Node::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&Link> {
        match self {
            Node::Link(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<Text, Node>> {
        match self {
            Node::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(l) => Some(l),
            _ => None,
        }
    }
}

/// Three-state optional: a field can be missing, present as null, or set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maybe<T> {
    Absent,
    Null,
    Value(T),
}

impl<T> Maybe<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Maybe::Absent)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Maybe::Null)
    }

    /// True when the field is present, null or not.
    pub fn exists(&self) -> bool {
        !self.is_absent()
    }

    pub fn value(self) -> Option<T> {
        match self {
            Maybe::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Maybe<&T> {
        match self {
            Maybe::Absent => Maybe::Absent,
            Maybe::Null => Maybe::Null,
            Maybe::Value(v) => Maybe::Value(v),
        }
    }
}
