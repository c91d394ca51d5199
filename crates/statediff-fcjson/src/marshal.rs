//! Node to token stream.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use statediff_adt::BitField;
use statediff_schema::{BytesTag, Link, Node, StrTag, TaggedBytes, Text};
use statediff_types::{decimal_from_be_bytes, Address, Cid};
use tracing::trace;

use crate::config::MarshalConfig;
use crate::error::{MarshalError, MarshalResult};
use crate::path::{NodePath, PathSegment};
use crate::token::{Token, TokenBuffer, TokenSink};

/// Resolves a link to the node it points at, if it can.
///
/// `path` is where the link sits relative to the marshal root. Returning
/// `None` makes the marshaler emit the link itself.
pub trait LinkLoader {
    fn load(&self, cid: &Cid, path: &NodePath) -> Option<Node>;
}

impl<F> LinkLoader for F
where
    F: Fn(&Cid, &NodePath) -> Option<Node>,
{
    fn load(&self, cid: &Cid, path: &NodePath) -> Option<Node> {
        self(cid, path)
    }
}

/// Marshal without link expansion.
pub fn marshal<S: TokenSink + ?Sized>(node: &Node, sink: &mut S) -> MarshalResult<()> {
    DagMarshaler::new().marshal_recursive(node, &NodePath::new(), sink)
}

/// Depth-first node to token marshaler with optional link expansion.
#[derive(Default)]
pub struct DagMarshaler<'l> {
    loader: Option<&'l dyn LinkLoader>,
    config: MarshalConfig,
}

impl<'l> DagMarshaler<'l> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(loader: &'l dyn LinkLoader) -> Self {
        Self {
            loader: Some(loader),
            config: MarshalConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MarshalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &MarshalConfig {
        &self.config
    }

    /// Emit `node` into `sink`. `path` is the position of `node` and is
    /// extended for every map key and list index visited below it.
    ///
    /// The walk is buffered: `sink` sees no token unless the whole node
    /// marshals, and the first failed `step` ends the replay.
    pub fn marshal_recursive<S: TokenSink + ?Sized>(
        &self,
        node: &Node,
        path: &NodePath,
        sink: &mut S,
    ) -> MarshalResult<()> {
        let mut walk = Walk {
            marshaler: self,
            path: path.clone(),
            depth: 0,
        };
        let mut buffer = TokenBuffer::new();
        walk.node(node, &mut buffer)?;
        buffer.replay(sink)?;
        Ok(())
    }
}

struct Walk<'m, 'l> {
    marshaler: &'m DagMarshaler<'l>,
    path: NodePath,
    depth: usize,
}

impl Walk<'_, '_> {
    fn node<S: TokenSink + ?Sized>(&mut self, node: &Node, sink: &mut S) -> MarshalResult<()> {
        match node {
            Node::Null => sink.step(Token::Null)?,
            Node::Bool(b) => sink.step(Token::Bool(*b))?,
            Node::Int(i) => sink.step(Token::Int(*i))?,
            Node::Float(v) => sink.step(Token::Float64(*v))?,
            Node::String(text) => {
                let s = self.render_text(text)?;
                sink.step(Token::String(s))?;
            }
            Node::Bytes(bytes) => self.bytes(bytes, sink)?,
            Node::Link(link) => self.link(link, sink)?,
            Node::Map(entries) => self.nested(|w| {
                sink.step(Token::MapOpen(entries.len()))?;
                for (key, value) in entries {
                    let key = w.render_text(key)?;
                    sink.step(Token::String(key.clone()))?;
                    w.path.push(PathSegment::Key(key));
                    let out = w.node(value, sink);
                    w.path.pop();
                    out?;
                }
                sink.step(Token::MapClose)?;
                Ok(())
            })?,
            Node::List(items) => self.nested(|w| {
                sink.step(Token::ArrOpen(items.len()))?;
                for (i, item) in items.iter().enumerate() {
                    w.path.push(PathSegment::Index(i));
                    let out = w.node(item, sink);
                    w.path.pop();
                    out?;
                }
                sink.step(Token::ArrClose)?;
                Ok(())
            })?,
        }
        Ok(())
    }

    fn nested(
        &mut self,
        f: impl FnOnce(&mut Self) -> MarshalResult<()>,
    ) -> MarshalResult<()> {
        let max = self.marshaler.config.max_depth;
        if self.depth >= max {
            return Err(MarshalError::DepthExceeded { max });
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    fn render_text(&self, text: &Text) -> MarshalResult<String> {
        match text.tag() {
            StrTag::Plain => Ok(String::from_utf8_lossy(text.as_bytes()).into_owned()),
            StrTag::RawAddress => self.render_address(text.as_bytes()),
            StrTag::CidString => Cid::from_bytes(text.as_bytes())
                .map(|cid| cid.to_string())
                .map_err(|source| MarshalError::InvalidCid {
                    path: self.path.to_string(),
                    source,
                }),
        }
    }

    fn render_address(&self, bytes: &[u8]) -> MarshalResult<String> {
        Address::from_bytes(bytes)
            .map(|a| a.encode(self.marshaler.config.network))
            .map_err(|source| MarshalError::InvalidAddress {
                path: self.path.to_string(),
                source,
            })
    }

    fn bytes<S: TokenSink + ?Sized>(&self, bytes: &TaggedBytes, sink: &mut S) -> MarshalResult<()> {
        let s = match bytes.tag {
            BytesTag::Address => self.render_address(&bytes.bytes)?,
            BytesTag::BigInt => decimal_from_be_bytes(&bytes.bytes),
            BytesTag::BitField => {
                let field = BitField::decode_any(&bytes.bytes).map_err(|source| {
                    MarshalError::InvalidBitField {
                        path: self.path.to_string(),
                        source,
                    }
                })?;
                sink.step(Token::MapOpen(2))?;
                sink.step(Token::from("_type"))?;
                sink.step(Token::from("bitfield"))?;
                sink.step(Token::from("bytes"))?;
                sink.step(Token::String(hex::encode(field.to_cbor_bytes())))?;
                sink.step(Token::MapClose)?;
                return Ok(());
            }
            BytesTag::Plain => STANDARD.encode(&bytes.bytes),
        };
        sink.step(Token::String(s))?;
        Ok(())
    }

    fn link<S: TokenSink + ?Sized>(&mut self, link: &Link, sink: &mut S) -> MarshalResult<()> {
        let Link::Cid(cid) = link else {
            return Err(MarshalError::UnsupportedLink);
        };
        if let Some(loader) = self.marshaler.loader {
            if let Some(node) = loader.load(cid, &self.path) {
                trace!(cid = %cid, path = %self.path, "expanding link");
                return self.nested(|w| w.node(&node, sink));
            }
        }
        sink.step(Token::MapOpen(1))?;
        sink.step(Token::from("/"))?;
        sink.step(Token::String(cid.to_string()))?;
        sink.step(Token::MapClose)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SinkError, SinkResult};
    use crate::value::ValueSink;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use statediff_types::codec;
    use std::cell::RefCell;

    fn tokens(node: &Node) -> Vec<Token> {
        let mut buf = TokenBuffer::new();
        marshal(node, &mut buf).unwrap();
        buf.into_tokens()
    }

    fn s(v: &str) -> Token {
        Token::from(v)
    }

    fn map(entries: Vec<(Text, Node)>) -> Node {
        Node::Map(entries.into_iter().collect::<IndexMap<_, _>>())
    }

    fn cid(data: &[u8]) -> Cid {
        Cid::for_block(codec::DAG_CBOR, data)
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(tokens(&Node::Null), vec![Token::Null]);
        assert_eq!(tokens(&Node::Bool(true)), vec![Token::Bool(true)]);
        assert_eq!(tokens(&Node::Int(-7)), vec![Token::Int(-7)]);
        assert_eq!(tokens(&Node::Float(0.5)), vec![Token::Float64(0.5)]);
        assert_eq!(tokens(&Node::String(Text::plain("hi"))), vec![s("hi")]);
    }

    #[test]
    fn map_emits_length_and_entries_in_order() {
        let node = map(vec![
            (Text::plain("b"), Node::Int(1)),
            (Text::plain("a"), Node::List(vec![Node::Bool(false)])),
        ]);
        assert_eq!(
            tokens(&node),
            vec![
                Token::MapOpen(2),
                s("b"),
                Token::Int(1),
                s("a"),
                Token::ArrOpen(1),
                Token::Bool(false),
                Token::ArrClose,
                Token::MapClose,
            ]
        );
    }

    #[test]
    fn tagged_keys_are_rerendered() {
        let key_cid = cid(b"k");
        let node = map(vec![
            (Text::new(vec![0x00, 0xe8, 0x07], StrTag::RawAddress), Node::Int(1)),
            (Text::new(key_cid.to_bytes(), StrTag::CidString), Node::Int(2)),
        ]);
        assert_eq!(
            tokens(&node),
            vec![
                Token::MapOpen(2),
                s("f01000"),
                Token::Int(1),
                Token::String(key_cid.to_string()),
                Token::Int(2),
                Token::MapClose,
            ]
        );
    }

    #[test]
    fn address_bytes_render_as_text_for_configured_network() {
        let node = Node::Bytes(TaggedBytes::new(vec![0x00, 0x01], BytesTag::Address));
        assert_eq!(tokens(&node), vec![s("f01")]);

        let mut buf = TokenBuffer::new();
        DagMarshaler::new()
            .with_config(MarshalConfig::testnet())
            .marshal_recursive(&node, &NodePath::new(), &mut buf)
            .unwrap();
        assert_eq!(buf.into_tokens(), vec![s("t01")]);
    }

    #[test]
    fn big_ints_render_unsigned_decimal() {
        let big = |b: Vec<u8>| Node::Bytes(TaggedBytes::new(b, BytesTag::BigInt));
        assert_eq!(tokens(&big(vec![])), vec![s("0")]);
        assert_eq!(tokens(&big(vec![0x00, 0x01, 0x00])), vec![s("256")]);
        assert_eq!(tokens(&big(vec![0x01, 0x00])), vec![s("256")]);
        assert_eq!(tokens(&big(vec![0x30, 0x39])), vec![s("12345")]);
    }

    #[test]
    fn plain_bytes_render_base64() {
        let node = Node::Bytes(TaggedBytes::new(b"hello".to_vec(), BytesTag::Plain));
        assert_eq!(tokens(&node), vec![s("aGVsbG8=")]);
    }

    #[test]
    fn bitfields_render_canonical_cbor_hex() {
        let expected = vec![
            Token::MapOpen(2),
            s("_type"),
            s("bitfield"),
            s("bytes"),
            s("42bc12"),
            Token::MapClose,
        ];
        // Direct RLE+ and CBOR-wrapped input of {0, 2, 5} render the same.
        for raw in [vec![0xbc, 0x12], vec![0x42, 0xbc, 0x12]] {
            let node = Node::Bytes(TaggedBytes::new(raw, BytesTag::BitField));
            assert_eq!(tokens(&node), expected);
        }
        let back = BitField::from_cbor(&hex::decode("42bc12").unwrap()).unwrap();
        assert_eq!(back.iter().collect::<Vec<_>>(), vec![0, 2, 5]);
    }

    #[test]
    fn unloaded_link_emits_four_tokens() {
        let c = cid(b"block");
        assert_eq!(
            tokens(&Node::Link(Link::Cid(c.clone()))),
            vec![Token::MapOpen(1), s("/"), Token::String(c.to_string()), Token::MapClose]
        );
    }

    #[test]
    fn non_cid_link_is_an_error() {
        let mut buf = TokenBuffer::new();
        let err = marshal(&Node::Link(Link::Other("x".into())), &mut buf).unwrap_err();
        assert!(matches!(err, MarshalError::UnsupportedLink));
        assert_eq!(
            err.to_string(),
            "link emission only supported for CID-typed links"
        );
    }

    #[test]
    fn loader_replaces_links_and_sees_paths() {
        let target = cid(b"target");
        let other = cid(b"other");
        let seen = RefCell::new(Vec::new());
        let loader = |c: &Cid, path: &NodePath| {
            seen.borrow_mut().push(path.to_string());
            (*c == target).then(|| Node::Int(42))
        };
        let node = map(vec![(
            Text::plain("Due"),
            Node::List(vec![
                Node::Link(Link::Cid(other.clone())),
                Node::Link(Link::Cid(target.clone())),
            ]),
        )]);

        let mut sink = ValueSink::new();
        let root = [PathSegment::Key("Deadlines".into())].into_iter().collect();
        DagMarshaler::with_loader(&loader)
            .marshal_recursive(&node, &root, &mut sink)
            .unwrap();
        assert_eq!(
            sink.into_value().unwrap(),
            json!({"Due": [{"/": other.to_string()}, 42]})
        );
        assert_eq!(
            seen.into_inner(),
            vec!["Deadlines.Due[0]".to_string(), "Deadlines.Due[1]".to_string()]
        );
    }

    #[test]
    fn inlined_link_matches_direct_marshal() {
        let target = cid(b"target");
        let loaded = map(vec![
            (Text::plain("x"), Node::List(vec![Node::Int(1), Node::Null])),
            (Text::new(vec![0x00, 0x05], StrTag::RawAddress), Node::Bool(true)),
        ]);
        let loader = |c: &Cid, _: &NodePath| (*c == target).then(|| loaded.clone());
        let wrap = |inner: Node| map(vec![(Text::plain("a"), inner)]);

        let mut via_link = TokenBuffer::new();
        DagMarshaler::with_loader(&loader)
            .marshal_recursive(
                &wrap(Node::Link(Link::Cid(target.clone()))),
                &NodePath::new(),
                &mut via_link,
            )
            .unwrap();
        assert_eq!(via_link.into_tokens(), tokens(&wrap(loaded.clone())));
    }

    #[test]
    fn invalid_address_reports_path() {
        let node = map(vec![(
            Text::plain("Owner"),
            Node::Bytes(TaggedBytes::new(vec![0x09], BytesTag::Address)),
        )]);
        let mut buf = TokenBuffer::new();
        let err = marshal(&node, &mut buf).unwrap_err();
        assert!(matches!(err, MarshalError::InvalidAddress { ref path, .. } if path == "Owner"));
    }

    #[test]
    fn failed_walk_leaves_sink_untouched() {
        let bad_address = map(vec![
            (Text::plain("Nonce"), Node::Int(1)),
            (
                Text::plain("Owner"),
                Node::Bytes(TaggedBytes::new(vec![0x09], BytesTag::Address)),
            ),
        ]);
        let mut buf = TokenBuffer::new();
        let err = marshal(&bad_address, &mut buf).unwrap_err();
        assert!(matches!(err, MarshalError::InvalidAddress { .. }));
        assert!(buf.is_empty());

        let bad_bits = Node::List(vec![
            Node::Int(1),
            Node::Bytes(TaggedBytes::new(vec![0xff], BytesTag::BitField)),
        ]);
        let err = marshal(&bad_bits, &mut buf).unwrap_err();
        assert!(matches!(err, MarshalError::InvalidBitField { ref path, .. } if path == "[1]"));
        assert!(buf.is_empty());
    }

    /// Accepts `limit - 1` tokens, rejects the next and panics on any later
    /// call.
    struct FailingSink {
        limit: usize,
        calls: usize,
    }

    impl FailingSink {
        fn new(limit: usize) -> Self {
            Self { limit, calls: 0 }
        }
    }

    impl TokenSink for FailingSink {
        fn step(&mut self, token: Token) -> SinkResult<()> {
            self.calls += 1;
            assert!(self.calls <= self.limit, "step called after a failed step");
            if self.calls == self.limit {
                return Err(SinkError::Unexpected {
                    token: token.name(),
                    reason: "sink closed",
                });
            }
            Ok(())
        }
    }

    #[test]
    fn sink_failure_inside_map_stops_the_walk() {
        let node = map(vec![
            (Text::plain("a"), Node::Int(1)),
            (Text::plain("b"), Node::List(vec![Node::Int(2), Node::Int(3)])),
            (Text::plain("c"), Node::Null),
        ]);
        let mut sink = FailingSink::new(4);
        let err = marshal(&node, &mut sink).unwrap_err();
        assert!(matches!(
            err,
            MarshalError::Sink(SinkError::Unexpected { token: "string", .. })
        ));
        assert_eq!(sink.calls, 4);
    }

    #[test]
    fn sink_failure_inside_inlined_link_stops_the_walk() {
        let target = cid(b"target");
        let loaded = map(vec![(Text::plain("x"), Node::List(vec![Node::Int(1)]))]);
        let loader = |c: &Cid, _: &NodePath| (*c == target).then(|| loaded.clone());
        let node = map(vec![
            (Text::plain("a"), Node::Link(Link::Cid(target.clone()))),
            (Text::plain("b"), Node::Int(2)),
        ]);

        // MapOpen, "a", MapOpen, "x", ArrOpen: the fifth token is inside the
        // loaded node.
        let mut sink = FailingSink::new(5);
        let err = DagMarshaler::with_loader(&loader)
            .marshal_recursive(&node, &NodePath::new(), &mut sink)
            .unwrap_err();
        assert!(matches!(
            err,
            MarshalError::Sink(SinkError::Unexpected { token: "array open", .. })
        ));
        assert_eq!(sink.calls, 5);
    }

    #[test]
    fn depth_limit_applies() {
        let mut node = Node::Int(0);
        for _ in 0..5 {
            node = Node::List(vec![node]);
        }
        let cfg = MarshalConfig {
            max_depth: 4,
            ..Default::default()
        };
        let mut buf = TokenBuffer::new();
        let err = DagMarshaler::new()
            .with_config(cfg)
            .marshal_recursive(&node, &NodePath::new(), &mut buf)
            .unwrap_err();
        assert!(matches!(err, MarshalError::DepthExceeded { max: 4 }));
    }
}
