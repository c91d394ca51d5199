//! Static schema type definitions and prototypes.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::builder::NodeBuilder;
use crate::decode;
use crate::error::{SchemaError, SchemaResult};
use crate::node::{BytesTag, Kind, Node, StrTag};

/// One field of a tuple-represented struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub type_name: &'static str,
    /// May be encoded as CBOR null.
    pub nullable: bool,
    /// May be missing from the end of the tuple.
    pub optional: bool,
}

impl Field {
    pub const fn new(name: &'static str, type_name: &'static str) -> Self {
        Self {
            name,
            type_name,
            nullable: false,
            optional: false,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Shape of a named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Bool,
    Int,
    Float,
    String(StrTag),
    Bytes(BytesTag),
    Link,
    /// Any DAG-CBOR value, decoded generically.
    Any,
    List {
        elem: &'static str,
        nullable: bool,
    },
    Map {
        key: StrTag,
        value: &'static str,
        nullable: bool,
    },
    /// A struct encoded as a CBOR array of its fields in order.
    Tuple { fields: &'static [Field] },
}

impl TypeKind {
    /// Node kind produced by this type; `None` for [`TypeKind::Any`].
    pub fn repr_kind(&self) -> Option<Kind> {
        Some(match self {
            TypeKind::Bool => Kind::Bool,
            TypeKind::Int => Kind::Int,
            TypeKind::Float => Kind::Float,
            TypeKind::String(_) => Kind::String,
            TypeKind::Bytes(_) => Kind::Bytes,
            TypeKind::Link => Kind::Link,
            TypeKind::Any => return None,
            TypeKind::List { .. } => Kind::List,
            TypeKind::Map { .. } | TypeKind::Tuple { .. } => Kind::Map,
        })
    }

    fn references(&self) -> Vec<&'static str> {
        match *self {
            TypeKind::List { elem, .. } => vec![elem],
            TypeKind::Map { value, .. } => vec![value],
            TypeKind::Tuple { fields } => fields.iter().map(|f| f.type_name).collect(),
            _ => Vec::new(),
        }
    }
}

/// A named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDef {
    pub name: &'static str,
    pub kind: TypeKind,
}

impl TypeDef {
    pub const fn new(name: &'static str, kind: TypeKind) -> Self {
        Self { name, kind }
    }
}

static BUILTIN: LazyLock<TypeSystem> =
    LazyLock::new(|| TypeSystem::from_defs(crate::actors::TYPES.iter().copied()));

/// A set of named types that reference each other by name.
#[derive(Debug, Clone)]
pub struct TypeSystem {
    types: HashMap<&'static str, TypeDef>,
}

impl TypeSystem {
    /// The Filecoin v0 actor state schema.
    pub fn builtin() -> &'static TypeSystem {
        &BUILTIN
    }

    /// Build a system and check every type reference resolves.
    pub fn new(defs: impl IntoIterator<Item = TypeDef>) -> SchemaResult<Self> {
        let system = Self::from_defs(defs);
        system.validate()?;
        Ok(system)
    }

    fn from_defs(defs: impl IntoIterator<Item = TypeDef>) -> Self {
        Self {
            types: defs.into_iter().map(|d| (d.name, d)).collect(),
        }
    }

    /// Every referenced name exists and optional tuple fields are trailing.
    pub fn validate(&self) -> SchemaResult<()> {
        for def in self.types.values() {
            for name in def.kind.references() {
                if !self.types.contains_key(name) {
                    return Err(SchemaError::InvalidSchema(format!(
                        "{} references unknown type {name}",
                        def.name
                    )));
                }
            }
            if let TypeKind::Tuple { fields } = def.kind {
                let first_optional = fields.iter().position(|f| f.optional);
                if let Some(at) = first_optional {
                    if fields[at..].iter().any(|f| !f.optional) {
                        return Err(SchemaError::InvalidSchema(format!(
                            "{}: optional field {} is not trailing",
                            def.name, fields[at].name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn prototype(&self, name: &str) -> SchemaResult<Prototype<'_>> {
        self.get(name)
            .map(|def| Prototype { def, system: self })
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }
}

/// A type within a [`TypeSystem`]; the factory for builders.
#[derive(Debug, Clone, Copy)]
pub struct Prototype<'a> {
    def: &'a TypeDef,
    system: &'a TypeSystem,
}

impl<'a> Prototype<'a> {
    pub fn name(&self) -> &'static str {
        self.def.name
    }

    pub fn kind(&self) -> TypeKind {
        self.def.kind
    }

    pub fn repr_kind(&self) -> Option<Kind> {
        self.def.kind.repr_kind()
    }

    pub fn system(&self) -> &'a TypeSystem {
        self.system
    }

    /// Element type of a list or value type of a map.
    pub fn value_type(&self) -> Option<Prototype<'a>> {
        let name = match self.def.kind {
            TypeKind::List { elem, .. } => elem,
            TypeKind::Map { value, .. } => value,
            _ => return None,
        };
        self.system.prototype(name).ok()
    }

    /// Key tag of a map type.
    pub fn key_tag(&self) -> Option<StrTag> {
        match self.def.kind {
            TypeKind::Map { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Whether elements or values of this container may be null.
    pub fn nullable_values(&self) -> bool {
        matches!(
            self.def.kind,
            TypeKind::List { nullable: true, .. } | TypeKind::Map { nullable: true, .. }
        )
    }

    /// Whether `node` is an acceptable value of this type.
    pub fn accepts(&self, node: &Node, nullable: bool) -> bool {
        match (node, self.repr_kind()) {
            (Node::Null, _) if nullable => true,
            (_, None) => true,
            (node, Some(kind)) => node.kind() == kind,
        }
    }

    pub fn new_builder(&self) -> NodeBuilder<'a> {
        NodeBuilder::new(*self)
    }

    /// Decode one DAG-CBOR document occupying all of `data`.
    pub fn decode(&self, data: &[u8]) -> SchemaResult<Node> {
        self.decode_with_depth(data, statediff_cbor::DEFAULT_MAX_DEPTH)
    }

    pub fn decode_with_depth(&self, data: &[u8], max_depth: usize) -> SchemaResult<Node> {
        decode::decode_document(*self, data, max_depth)
    }
}

impl PartialEq for Prototype<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.system, other.system) && self.def.name == other.def.name
    }
}

impl Eq for Prototype<'_> {}
