//! Type key to prototype, and prototype to structure shape.

use std::collections::HashMap;
use std::sync::LazyLock;

use statediff_types::Cid;

use crate::resolve::TypeKey;

/// How raw keys of a sharded structure become map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyMode {
    /// Keys are used as is and take the map type's key tag.
    Passthrough,
    /// Keys are unsigned big-endian integers, rendered in decimal.
    BigEndianUint,
}

/// The structure a map type is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// One block, one CBOR document.
    FlatCbor,
    /// HAMT; values decode as the map's value type.
    HamtMap(KeyMode),
    /// AMT; keys are decimal indices.
    ShardedArrayMap,
    /// HAMT of links to AMTs; values are maps keyed by AMT index.
    Multimap(KeyMode),
    /// HAMT of links to sets of uvarint keys; values are lists of ints.
    SetOfUintMap(KeyMode),
}

/// Registered type keys and the schema type each decodes as.
pub const PROTOTYPES: &[(&str, &str)] = &[
    ("tipset", "LotusBlockHeader"),
    ("stateRoot", "Map__LotusActors"),
    ("accountActor", "AccountV0State"),
    ("cronActor", "CronV0State"),
    ("initActor", "InitV0State"),
    ("initActorAddresses", "Map__ActorID"),
    ("storageMarketActor", "MarketV0State"),
    ("storageMarketActor.Proposals", "Map__MarketV0DealProposal"),
    ("storageMarketActor.States", "Map__MarketV0DealState"),
    ("storageMarketActor.PendingProposals", "Map__MarketV0RawDealProposal"),
    ("storageMarketActor.EscrowTable", "Map__BalanceTable"),
    ("storageMarketActor.LockedTable", "Map__BalanceTable"),
    ("storageMarketActor.DealOpsByEpoch", "Map__List__DealID"),
    ("multisigActor", "MultisigV0State"),
    ("multisigActor.PendingTxns", "Map__MultisigV0Transaction"),
    ("storageMinerActor", "MinerV0State"),
    ("storageMinerActor.Info", "MinerV0Info"),
    ("storageMinerActor.VestingFunds", "MinerV0VestingFunds"),
    ("storageMinerActor.PreCommittedSectors", "Map__SectorPreCommitOnChainInfo"),
    ("storageMinerActor.PreCommittedSectorsExpiry", "Map__BitField"),
    ("storageMinerActor.AllocatedSectors", "BitField"),
    ("storageMinerActor.Sectors", "Map__SectorOnChainInfo"),
    ("storageMinerActor.Deadlines", "MinerV0Deadlines"),
    ("storageMinerActor.Deadlines.Due", "MinerV0Deadline"),
    ("storageMinerActor.Deadlines.Due.Partitions", "Map__MinerV0Partition"),
    (
        "storageMinerActor.Deadlines.Due.Partitions.ExpirationsEpochs",
        "Map__MinerV0ExpirationSet",
    ),
    ("storageMinerActor.Deadlines.Due.Partitions.EarlyTerminated", "Map__BitField"),
    ("storageMinerActor.Deadlines.Due.ExpirationsEpochs", "Map__BitField"),
    ("storagePowerActor", "PowerV0State"),
    ("storagePowerCronEventQueue", "Map__PowerV0CronEvent"),
    ("storagePowerClaims", "Map__PowerV0Claim"),
    ("rewardActor", "RewardV0State"),
    ("verifiedRegistryActor", "VerifregV0State"),
    ("verifiedRegistryActor.Verifiers", "Map__DataCap"),
    ("verifiedRegistryActor.VerifiedClients", "Map__DataCap"),
    ("paymentChannelActor", "PaychV0State"),
    ("paymentChannelActor.LaneStates", "Map__PaychV0LaneState"),
];

/// Schema types stored in sharded structures. Types not listed are flat.
pub const SHAPES: &[(&str, Shape)] = &[
    ("Map__LotusActors", Shape::HamtMap(KeyMode::Passthrough)),
    ("Map__ActorID", Shape::HamtMap(KeyMode::Passthrough)),
    ("Map__BalanceTable", Shape::HamtMap(KeyMode::Passthrough)),
    ("Map__DataCap", Shape::HamtMap(KeyMode::Passthrough)),
    ("Map__PowerV0Claim", Shape::HamtMap(KeyMode::Passthrough)),
    ("Map__MarketV0RawDealProposal", Shape::HamtMap(KeyMode::Passthrough)),
    ("Map__SectorPreCommitOnChainInfo", Shape::HamtMap(KeyMode::BigEndianUint)),
    ("Map__MultisigV0Transaction", Shape::HamtMap(KeyMode::BigEndianUint)),
    ("Map__MarketV0DealProposal", Shape::ShardedArrayMap),
    ("Map__MarketV0DealState", Shape::ShardedArrayMap),
    ("Map__SectorOnChainInfo", Shape::ShardedArrayMap),
    ("Map__MinerV0Partition", Shape::ShardedArrayMap),
    ("Map__MinerV0ExpirationSet", Shape::ShardedArrayMap),
    ("Map__BitField", Shape::ShardedArrayMap),
    ("Map__PaychV0LaneState", Shape::ShardedArrayMap),
    ("Map__PowerV0CronEvent", Shape::Multimap(KeyMode::BigEndianUint)),
    ("Map__List__DealID", Shape::SetOfUintMap(KeyMode::BigEndianUint)),
];

/// Builtin actor code CIDs and the type key of each actor's state.
///
/// Codes are raw-codec CIDs over an identity hash of `fil/1/<name>`. The
/// system actor has no decodable state.
pub const ACTOR_CODES: &[(&str, &str)] = &[
    ("bafkqaddgnfwc6mjpon4xg5dfnu", "systemActor"),
    ("bafkqactgnfwc6mjpnfxgs5a", "initActor"),
    ("bafkqaddgnfwc6mjpojsxoylsmq", "rewardActor"),
    ("bafkqactgnfwc6mjpmnzg63q", "cronActor"),
    ("bafkqaetgnfwc6mjpon2g64tbm5sxa33xmvza", "storagePowerActor"),
    ("bafkqae3gnfwc6mjpon2g64tbm5sw2ylsnnsxi", "storageMarketActor"),
    ("bafkqaftgnfwc6mjpozsxe2lgnfswi4tfm5uxg5dspe", "verifiedRegistryActor"),
    ("bafkqadlgnfwc6mjpmfrwg33vnz2a", "accountActor"),
    ("bafkqadtgnfwc6mjpnv2wy5djonuwo", "multisigActor"),
    ("bafkqafdgnfwc6mjpobqxs3lfnz2gg2dbnzxgk3a", "paymentChannelActor"),
    ("bafkqaetgnfwc6mjpon2g64tbm5sw22lomvza", "storageMinerActor"),
];

static BUILTIN: LazyLock<Registry> =
    LazyLock::new(|| Registry::new(PROTOTYPES, SHAPES, ACTOR_CODES));

/// Lookup tables for the decoder.
#[derive(Debug, Clone)]
pub struct Registry {
    prototypes: HashMap<String, &'static str>,
    shapes: HashMap<&'static str, Shape>,
    actor_codes: HashMap<String, &'static str>,
}

impl Registry {
    /// The Filecoin v0 registry.
    pub fn builtin() -> &'static Registry {
        &BUILTIN
    }

    pub fn new(
        prototypes: &[(&str, &'static str)],
        shapes: &[(&'static str, Shape)],
        actor_codes: &[(&str, &'static str)],
    ) -> Self {
        Self {
            prototypes: prototypes
                .iter()
                .map(|(key, name)| (key.to_string(), *name))
                .collect(),
            shapes: shapes.iter().copied().collect(),
            actor_codes: actor_codes
                .iter()
                .map(|(code, key)| (code.to_string(), *key))
                .collect(),
        }
    }

    /// Schema type name registered for `key`.
    pub fn prototype_name(&self, key: &TypeKey) -> Option<&'static str> {
        self.prototypes.get(key.as_str()).copied()
    }

    /// Shape of a schema type; unregistered types are flat.
    pub fn shape(&self, type_name: &str) -> Shape {
        self.shapes
            .get(type_name)
            .copied()
            .unwrap_or(Shape::FlatCbor)
    }

    /// State type key of a builtin actor, by code CID.
    pub fn actor_state_key(&self, code: &Cid) -> Option<&'static str> {
        self.actor_codes.get(&code.to_string()).copied()
    }

    /// Registered keys, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.prototypes.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{resolve_type, ALIASES};
    use statediff_schema::{Kind, TypeSystem};
    use statediff_types::{codec, Multihash};

    #[test]
    fn every_prototype_exists_in_schema() {
        let ts = TypeSystem::builtin();
        for (key, name) in PROTOTYPES {
            assert!(ts.contains(name), "{key} -> {name}");
        }
    }

    #[test]
    fn sharded_shapes_are_map_types() {
        let ts = TypeSystem::builtin();
        for (name, _) in SHAPES {
            let p = ts.prototype(name).unwrap();
            assert_eq!(p.repr_kind(), Some(Kind::Map), "{name}");
        }
    }

    #[test]
    fn registered_keys_are_canonical() {
        for (key, _) in PROTOTYPES {
            assert_eq!(resolve_type(key), *key);
        }
        for (_, target) in ALIASES {
            assert!(Registry::builtin().prototype_name(&resolve_type(target)).is_some());
        }
    }

    #[test]
    fn shapes() {
        let r = Registry::builtin();
        assert_eq!(r.shape("Map__LotusActors"), Shape::HamtMap(KeyMode::Passthrough));
        assert_eq!(r.shape("Map__MarketV0DealProposal"), Shape::ShardedArrayMap);
        assert_eq!(
            r.shape("Map__MarketV0RawDealProposal"),
            Shape::HamtMap(KeyMode::Passthrough)
        );
        assert_eq!(r.shape("Map__PowerV0CronEvent"), Shape::Multimap(KeyMode::BigEndianUint));
        assert_eq!(r.shape("MinerV0State"), Shape::FlatCbor);
    }

    #[test]
    fn proposals_are_arrays_and_pending_proposals_are_cid_keyed() {
        let r = Registry::builtin();
        let proposals = r.prototype_name(&resolve_type("storageMarketActor.Proposals")).unwrap();
        let pending = r
            .prototype_name(&resolve_type("storageMarketActor.PendingProposals"))
            .unwrap();
        assert_eq!(r.shape(proposals), Shape::ShardedArrayMap);
        assert_eq!(r.shape(pending), Shape::HamtMap(KeyMode::Passthrough));
        let key_tag = TypeSystem::builtin().prototype(pending).unwrap().key_tag();
        assert_eq!(key_tag, Some(statediff_schema::StrTag::CidString));
    }

    #[test]
    fn actor_codes_roundtrip_through_text() {
        let r = Registry::builtin();
        for (text, key) in ACTOR_CODES {
            let cid: Cid = text.parse().unwrap();
            assert_eq!(cid.codec(), codec::RAW);
            let name = std::str::from_utf8(cid.hash().digest()).unwrap();
            assert!(name.starts_with("fil/1/"), "{name}");
            assert_eq!(cid.to_string(), *text);
            assert_eq!(r.actor_state_key(&cid), Some(*key));
        }
    }

    #[test]
    fn actor_code_from_name() {
        let code = Cid::new_v1(codec::RAW, Multihash::identity(b"fil/1/account"));
        assert_eq!(Registry::builtin().actor_state_key(&code), Some("accountActor"));
        let state = Registry::builtin().actor_state_key(&code).unwrap();
        assert!(Registry::builtin()
            .prototype_name(&resolve_type(state))
            .is_some());
        let system = Cid::new_v1(codec::RAW, Multihash::identity(b"fil/1/system"));
        let key = Registry::builtin().actor_state_key(&system).unwrap();
        assert!(Registry::builtin().prototype_name(&resolve_type(key)).is_none());
    }
}
