//! Link expansion backed by the state decoder.

use statediff_fcjson::{DagMarshaler, LinkLoader, MarshalConfig, NodePath, TokenSink};
use statediff_schema::Node;
use statediff_store::BlockStore;
use statediff_types::Cid;
use tracing::trace;

use crate::error::TransformResult;
use crate::transform::Transformer;

/// Expands links by decoding their target as the type named by
/// `<root>.<path>`.
///
/// Any failure (unregistered path, missing block, bad data) leaves the link
/// unexpanded.
pub struct StateLinkLoader<'a, S: ?Sized> {
    transformer: &'a Transformer<'a>,
    store: &'a S,
    root: String,
}

impl<'a, S: BlockStore + ?Sized> StateLinkLoader<'a, S> {
    pub fn new(transformer: &'a Transformer<'a>, store: &'a S, root: impl Into<String>) -> Self {
        Self {
            transformer,
            store,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }
}

impl<S: BlockStore + ?Sized> LinkLoader for StateLinkLoader<'_, S> {
    fn load(&self, cid: &Cid, path: &NodePath) -> Option<Node> {
        let type_path = path.join_onto(&self.root);
        match self.transformer.transform(cid, self.store, &type_path) {
            Ok(node) => Some(node),
            Err(err) => {
                trace!(cid = %cid, type_path = %type_path, error = %err, "link not expanded");
                None
            }
        }
    }
}

/// Decode the state at `cid` as `type_path` and marshal it into `sink`,
/// expanding every link the decoder can type.
pub fn marshal_state<S, K>(
    transformer: &Transformer<'_>,
    store: &S,
    cid: &Cid,
    type_path: &str,
    config: MarshalConfig,
    sink: &mut K,
) -> TransformResult<()>
where
    S: BlockStore + ?Sized,
    K: TokenSink + ?Sized,
{
    let node = transformer.transform(cid, store, type_path)?;
    let loader = StateLinkLoader::new(transformer, store, type_path);
    DagMarshaler::with_loader(&loader)
        .with_config(config)
        .marshal_recursive(&node, &NodePath::new(), sink)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::fixtures::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use statediff_fcjson::{JsonWriter, MarshalError, PathSegment, TokenBuffer, ValueSink};
    use statediff_store::InMemoryBlockStore;

    fn miner_json(m: &Miner, config: MarshalConfig) -> Value {
        let t = Transformer::new();
        let mut sink = ValueSink::new();
        marshal_state(&t, &m.store, &m.head, "storageMinerActor", config, &mut sink).unwrap();
        sink.into_value().unwrap()
    }

    #[test]
    fn miner_state_expands_typed_links() {
        let m = miner();
        let v = miner_json(&m, MarshalConfig::default());

        assert_eq!(v["Info"]["Owner"], "f0100");
        assert_eq!(v["Info"]["ControlAddresses"], json!(["f0102"]));
        assert_eq!(v["Info"]["PendingWorkerKey"], Value::Null);
        assert_eq!(v["Info"]["PeerId"], "cGVlcg==");
        assert_eq!(v["LockedFunds"], "1000");
        assert_eq!(v["ProvingPeriodStart"], -1);
        assert_eq!(v["EarlyTerminations"], json!({"_type": "bitfield", "bytes": "42bc12"}));

        let due = &v["Deadlines"]["Due"];
        assert_eq!(due[0]["LiveSectors"], 1);
        assert_eq!(due[1]["LiveSectors"], 2);
        assert_eq!(due[0]["Partitions"], json!({}));
        assert_eq!(
            due[1]["ExpirationsEpochs"],
            json!({"7": {"_type": "bitfield", "bytes": "42bc12"}})
        );
        assert_eq!(due[0]["EarlyTerminations"], json!({"_type": "bitfield", "bytes": "40"}));
        assert_eq!(due[0]["FaultyPower"], json!({"Raw": "0", "QA": "0"}));
    }

    #[test]
    fn unresolvable_links_are_emitted_as_links() {
        let m = miner();
        let v = miner_json(&m, MarshalConfig::default());
        assert_eq!(v["VestingFunds"], json!({"/": m.vesting.to_string()}));
        assert!(v["PreCommittedSectors"]["/"].is_string());
        assert!(v["AllocatedSectors"]["/"].is_string());
    }

    #[test]
    fn network_prefix_follows_config() {
        let m = miner();
        let v = miner_json(&m, MarshalConfig::testnet());
        assert_eq!(v["Info"]["Owner"], "t0100");
        assert_eq!(v["Info"]["ControlAddresses"], json!(["t0102"]));
    }

    #[test]
    fn json_text_matches_value_output() {
        let m = miner();
        let t = Transformer::new();
        let mut writer = JsonWriter::new(Vec::new());
        marshal_state(
            &t,
            &m.store,
            &m.head,
            "storageMinerActor",
            MarshalConfig::default(),
            &mut writer,
        )
        .unwrap();
        let text = writer.finish().unwrap();
        let parsed: Value = serde_json::from_slice(&text).unwrap();
        assert_eq!(parsed, miner_json(&m, MarshalConfig::default()));
        assert!(String::from_utf8(text).unwrap().starts_with("{\n  \"Info\": {\n    \"Owner\""));
    }

    #[test]
    fn loader_types_links_by_joined_path() {
        let m = miner();
        let t = Transformer::new();
        let loader = StateLinkLoader::new(&t, &m.store, "storageMinerActor");
        assert_eq!(loader.root(), "storageMinerActor");

        let path: NodePath = [
            PathSegment::Key("Deadlines".into()),
            PathSegment::Key("Due".into()),
            PathSegment::Index(3),
            PathSegment::Key("Partitions".into()),
        ]
        .into_iter()
        .collect();
        let partitions = loader.load(&m.partitions, &path).unwrap();
        assert!(partitions.as_map().unwrap().is_empty());

        // The empty AMT is not a valid miner info.
        let mut info = NodePath::new();
        info.push(PathSegment::Key("Info".into()));
        assert!(loader.load(&m.partitions, &info).is_none());
        assert!(loader.load(&m.head, &NodePath::new()).is_some());
    }

    #[test]
    fn loader_gives_up_on_unknown_roots() {
        let m = miner();
        let t = Transformer::new();
        let loader = StateLinkLoader::new(&t, &m.store, "nothing");
        assert!(loader.load(&m.head, &NodePath::new()).is_none());
    }

    #[test]
    fn marshal_state_reports_decode_errors() {
        let store = InMemoryBlockStore::new();
        let t = Transformer::new();
        let mut buf = TokenBuffer::new();
        let err = marshal_state(
            &t,
            &store,
            &dangling(b"x"),
            "no.such.thing",
            MarshalConfig::default(),
            &mut buf,
        )
        .unwrap_err();
        assert!(matches!(err, TransformError::UnknownType(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn marshal_failure_emits_nothing() {
        let m = miner();
        let head = put(
            &m.store,
            cbor(|e| {
                e.write_array_header(1);
                e.write_bytes(&[0x09]);
            }),
        );
        let t = Transformer::new();
        let mut buf = TokenBuffer::new();
        let err = marshal_state(
            &t,
            &m.store,
            &head,
            "accountActor",
            MarshalConfig::default(),
            &mut buf,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TransformError::Marshal(MarshalError::InvalidAddress { ref path, .. }) if path == "Address"
        ));
        assert!(buf.is_empty());
    }
}
