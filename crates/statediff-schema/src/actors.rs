//! The Filecoin v0 actor state schema.
//!
//! Structs are tuple-encoded, as the chain serializes them. `Map__*` types
//! are the materialized form of sharded structures (HAMT, AMT, multimap,
//! set); which structure backs each one is decided by the decoder registry,
//! not here.

use crate::node::{BytesTag, StrTag};
use crate::schema::{Field, TypeDef, TypeKind};

const fn f(name: &'static str, type_name: &'static str) -> Field {
    Field::new(name, type_name)
}

const fn alias(name: &'static str, kind: TypeKind) -> TypeDef {
    TypeDef::new(name, kind)
}

const fn tuple(name: &'static str, fields: &'static [Field]) -> TypeDef {
    TypeDef::new(name, TypeKind::Tuple { fields })
}

const fn list(name: &'static str, elem: &'static str) -> TypeDef {
    TypeDef::new(
        name,
        TypeKind::List {
            elem,
            nullable: false,
        },
    )
}

const fn map(name: &'static str, key: StrTag, value: &'static str) -> TypeDef {
    TypeDef::new(
        name,
        TypeKind::Map {
            key,
            value,
            nullable: false,
        },
    )
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

const LOTUS_BLOCK_HEADER: &[Field] = &[
    f("Miner", "Address"),
    f("Ticket", "LotusTicket").nullable(),
    f("ElectionProof", "LotusElectionProof").nullable(),
    f("BeaconEntries", "List__LotusBeaconEntry"),
    f("WinPoStProof", "List__LotusPoStProof"),
    f("Parents", "List__Link"),
    f("ParentWeight", "BigInt"),
    f("Height", "ChainEpoch"),
    f("ParentStateRoot", "Link"),
    f("ParentMessageReceipts", "Link"),
    f("Messages", "Link"),
    f("BLSAggregate", "Signature").nullable(),
    f("Timestamp", "Int"),
    f("BlockSig", "Signature").nullable(),
    f("ForkSignaling", "Int"),
    // Absent from headers mined before the base fee upgrade.
    f("ParentBaseFee", "TokenAmount").optional(),
];

const LOTUS_TICKET: &[Field] = &[f("VRFProof", "Bytes")];

const LOTUS_ELECTION_PROOF: &[Field] = &[f("WinCount", "Int"), f("VRFProof", "Bytes")];

const LOTUS_BEACON_ENTRY: &[Field] = &[f("Round", "Int"), f("Data", "Bytes")];

const LOTUS_POST_PROOF: &[Field] = &[f("PoStProof", "Int"), f("ProofBytes", "Bytes")];

const LOTUS_ACTORS: &[Field] = &[
    f("Code", "Link"),
    f("Head", "Link"),
    f("Nonce", "Int"),
    f("Balance", "TokenAmount"),
];

// ---------------------------------------------------------------------------
// Actors
// ---------------------------------------------------------------------------

const ACCOUNT_V0_STATE: &[Field] = &[f("Address", "Address")];

const CRON_V0_STATE: &[Field] = &[f("Entries", "List__CronV0Entry")];

const CRON_V0_ENTRY: &[Field] = &[f("Receiver", "Address"), f("MethodNum", "MethodNum")];

const INIT_V0_STATE: &[Field] = &[
    f("AddressMap", "Link"),
    f("NextID", "ActorID"),
    f("NetworkName", "String"),
];

const MARKET_V0_STATE: &[Field] = &[
    f("Proposals", "Link"),
    f("States", "Link"),
    f("PendingProposals", "Link"),
    f("EscrowTable", "Link"),
    f("LockedTable", "Link"),
    f("NextID", "DealID"),
    f("DealOpsByEpoch", "Link"),
    f("LastCron", "ChainEpoch"),
    f("TotalClientLockedCollateral", "TokenAmount"),
    f("TotalProviderLockedCollateral", "TokenAmount"),
    f("TotalClientStorageFee", "TokenAmount"),
];

const MARKET_V0_DEAL_PROPOSAL: &[Field] = &[
    f("PieceCID", "Link"),
    f("PieceSize", "PaddedPieceSize"),
    f("VerifiedDeal", "Bool"),
    f("Client", "Address"),
    f("Provider", "Address"),
    f("Label", "String"),
    f("StartEpoch", "ChainEpoch"),
    f("EndEpoch", "ChainEpoch"),
    f("StoragePricePerEpoch", "TokenAmount"),
    f("ProviderCollateral", "TokenAmount"),
    f("ClientCollateral", "TokenAmount"),
];

const MARKET_V0_DEAL_STATE: &[Field] = &[
    f("SectorStartEpoch", "ChainEpoch"),
    f("LastUpdatedEpoch", "ChainEpoch"),
    f("SlashEpoch", "ChainEpoch"),
];

const MULTISIG_V0_STATE: &[Field] = &[
    f("Signers", "List__Address"),
    f("NumApprovalsThreshold", "Int"),
    f("NextTxnID", "MultisigV0TxnID"),
    f("InitialBalance", "TokenAmount"),
    f("StartEpoch", "ChainEpoch"),
    f("UnlockDuration", "ChainEpoch"),
    f("PendingTxns", "Link"),
];

const MULTISIG_V0_TRANSACTION: &[Field] = &[
    f("To", "Address"),
    f("Value", "TokenAmount"),
    f("Method", "MethodNum"),
    f("Params", "Bytes"),
    f("Approved", "List__Address"),
];

const MINER_V0_STATE: &[Field] = &[
    f("Info", "Link"),
    f("PreCommitDeposits", "TokenAmount"),
    f("LockedFunds", "TokenAmount"),
    f("VestingFunds", "Link"),
    f("InitialPledgeRequirement", "TokenAmount"),
    f("PreCommittedSectors", "Link"),
    f("PreCommittedSectorsExpiry", "Link"),
    f("AllocatedSectors", "Link"),
    f("Sectors", "Link"),
    f("ProvingPeriodStart", "ChainEpoch"),
    f("CurrentDeadline", "Int"),
    f("Deadlines", "Link"),
    f("EarlyTerminations", "BitField"),
];

const MINER_V0_INFO: &[Field] = &[
    f("Owner", "Address"),
    f("Worker", "Address"),
    f("ControlAddresses", "List__Address"),
    f("PendingWorkerKey", "MinerV0WorkerChangeKey").nullable(),
    f("PeerId", "PeerID"),
    f("Multiaddrs", "List__Multiaddrs"),
    f("SealProofType", "RegisteredSealProof"),
    f("SectorSize", "SectorSize"),
    f("WindowPoStPartitionSectors", "Int"),
];

const MINER_V0_WORKER_CHANGE_KEY: &[Field] =
    &[f("NewWorker", "Address"), f("EffectiveAt", "ChainEpoch")];

const MINER_V0_VESTING_FUNDS: &[Field] = &[f("Funds", "List__MinerV0VestingFund")];

const MINER_V0_VESTING_FUND: &[Field] = &[f("Epoch", "ChainEpoch"), f("Amount", "TokenAmount")];

const MINER_V0_SECTOR_PRE_COMMIT_ON_CHAIN_INFO: &[Field] = &[
    f("Info", "MinerV0SectorPreCommitInfo"),
    f("PreCommitDeposit", "TokenAmount"),
    f("PreCommitEpoch", "ChainEpoch"),
    f("DealWeight", "DealWeight"),
    f("VerifiedDealWeight", "DealWeight"),
];

const MINER_V0_SECTOR_PRE_COMMIT_INFO: &[Field] = &[
    f("SealProof", "RegisteredSealProof"),
    f("SectorNumber", "SectorNumber"),
    f("SealedCID", "Link"),
    f("SealRandEpoch", "ChainEpoch"),
    f("DealIDs", "List__DealID"),
    f("Expiration", "ChainEpoch"),
    f("ReplaceCapacity", "Bool"),
    f("ReplaceSectorDeadline", "Int"),
    f("ReplaceSectorPartition", "Int"),
    f("ReplaceSectorNumber", "SectorNumber"),
];

const MINER_V0_SECTOR_ON_CHAIN_INFO: &[Field] = &[
    f("SectorNumber", "SectorNumber"),
    f("SealProof", "RegisteredSealProof"),
    f("SealedCID", "Link"),
    f("DealIDs", "List__DealID"),
    f("Activation", "ChainEpoch"),
    f("Expiration", "ChainEpoch"),
    f("DealWeight", "DealWeight"),
    f("VerifiedDealWeight", "DealWeight"),
    f("InitialPledge", "TokenAmount"),
    f("ExpectedDayReward", "TokenAmount"),
    f("ExpectedStoragePledge", "TokenAmount"),
];

const MINER_V0_DEADLINES: &[Field] = &[f("Due", "List__Link")];

const MINER_V0_DEADLINE: &[Field] = &[
    f("Partitions", "Link"),
    f("ExpirationsEpochs", "Link"),
    f("PostSubmissions", "BitField"),
    f("EarlyTerminations", "BitField"),
    f("LiveSectors", "Int"),
    f("TotalSectors", "Int"),
    f("FaultyPower", "MinerV0PowerPair"),
];

const MINER_V0_PARTITION: &[Field] = &[
    f("Sectors", "BitField"),
    f("Faults", "BitField"),
    f("Recoveries", "BitField"),
    f("Terminated", "BitField"),
    f("ExpirationsEpochs", "Link"),
    f("EarlyTerminated", "Link"),
    f("LivePower", "MinerV0PowerPair"),
    f("FaultyPower", "MinerV0PowerPair"),
    f("RecoveringPower", "MinerV0PowerPair"),
];

const MINER_V0_EXPIRATION_SET: &[Field] = &[
    f("OnTimeSectors", "BitField"),
    f("EarlySectors", "BitField"),
    f("OnTimePledge", "TokenAmount"),
    f("ActivePower", "MinerV0PowerPair"),
    f("FaultyPower", "MinerV0PowerPair"),
];

const MINER_V0_POWER_PAIR: &[Field] = &[f("Raw", "StoragePower"), f("QA", "StoragePower")];

const POWER_V0_STATE: &[Field] = &[
    f("TotalRawBytePower", "StoragePower"),
    f("TotalBytesCommitted", "StoragePower"),
    f("TotalQualityAdjPower", "StoragePower"),
    f("TotalQABytesCommitted", "StoragePower"),
    f("TotalPledgeCollateral", "TokenAmount"),
    f("ThisEpochRawBytePower", "StoragePower"),
    f("ThisEpochQualityAdjPower", "StoragePower"),
    f("ThisEpochPledgeCollateral", "TokenAmount"),
    f("ThisEpochQAPowerSmoothed", "V0FilterEstimate").nullable(),
    f("MinerCount", "Int"),
    f("MinerAboveMinPowerCount", "Int"),
    f("CronEventQueue", "Link"),
    f("FirstCronEpoch", "ChainEpoch"),
    f("LastProcessedCronEpoch", "ChainEpoch"),
    f("Claims", "Link"),
    f("ProofValidationBatch", "Link").nullable(),
];

const POWER_V0_CRON_EVENT: &[Field] =
    &[f("MinerAddr", "Address"), f("CallbackPayload", "Bytes")];

const POWER_V0_CLAIM: &[Field] = &[
    f("RawBytePower", "StoragePower"),
    f("QualityAdjPower", "StoragePower"),
];

const V0_FILTER_ESTIMATE: &[Field] = &[
    f("PositionEstimate", "BigInt"),
    f("VelocityEstimate", "BigInt"),
];

const REWARD_V0_STATE: &[Field] = &[
    f("CumsumBaseline", "BigInt"),
    f("CumsumRealized", "BigInt"),
    f("EffectiveNetworkTime", "ChainEpoch"),
    f("EffectiveBaselinePower", "StoragePower"),
    f("ThisEpochReward", "TokenAmount"),
    f("ThisEpochRewardSmoothed", "V0FilterEstimate").nullable(),
    f("ThisEpochBaselinePower", "StoragePower"),
    f("Epoch", "ChainEpoch"),
    f("TotalMined", "TokenAmount"),
];

const VERIFREG_V0_STATE: &[Field] = &[
    f("RootKey", "Address"),
    f("Verifiers", "Link"),
    f("VerifiedClients", "Link"),
];

const PAYCH_V0_STATE: &[Field] = &[
    f("From", "Address"),
    f("To", "Address"),
    f("ToSend", "TokenAmount"),
    f("SettlingAt", "ChainEpoch"),
    f("MinSettleHeight", "ChainEpoch"),
    f("LaneStates", "Link"),
];

const PAYCH_V0_LANE_STATE: &[Field] = &[f("Redeemed", "TokenAmount"), f("Nonce", "Int")];

/// Every type of the schema.
pub static TYPES: &[TypeDef] = &[
    // Primitives and domain scalars.
    alias("Bool", TypeKind::Bool),
    alias("Int", TypeKind::Int),
    alias("Float", TypeKind::Float),
    alias("String", TypeKind::String(StrTag::Plain)),
    alias("Bytes", TypeKind::Bytes(BytesTag::Plain)),
    alias("Link", TypeKind::Link),
    alias("Any", TypeKind::Any),
    alias("RawAddress", TypeKind::String(StrTag::RawAddress)),
    alias("CidString", TypeKind::String(StrTag::CidString)),
    alias("Address", TypeKind::Bytes(BytesTag::Address)),
    alias("BigInt", TypeKind::Bytes(BytesTag::BigInt)),
    alias("TokenAmount", TypeKind::Bytes(BytesTag::BigInt)),
    alias("StoragePower", TypeKind::Bytes(BytesTag::BigInt)),
    alias("DealWeight", TypeKind::Bytes(BytesTag::BigInt)),
    alias("DataCap", TypeKind::Bytes(BytesTag::BigInt)),
    alias("BitField", TypeKind::Bytes(BytesTag::BitField)),
    alias("Signature", TypeKind::Bytes(BytesTag::Plain)),
    alias("PeerID", TypeKind::Bytes(BytesTag::Plain)),
    alias("Multiaddr", TypeKind::Bytes(BytesTag::Plain)),
    alias("ChainEpoch", TypeKind::Int),
    alias("ActorID", TypeKind::Int),
    alias("DealID", TypeKind::Int),
    alias("SectorNumber", TypeKind::Int),
    alias("SectorSize", TypeKind::Int),
    alias("MethodNum", TypeKind::Int),
    alias("PaddedPieceSize", TypeKind::Int),
    alias("RegisteredSealProof", TypeKind::Int),
    alias("MultisigV0TxnID", TypeKind::Int),
    // Lists.
    list("List__Address", "Address"),
    list("List__Link", "Link"),
    list("List__DealID", "DealID"),
    list("List__Multiaddrs", "Multiaddr"),
    list("List__CronV0Entry", "CronV0Entry"),
    list("List__LotusBeaconEntry", "LotusBeaconEntry"),
    list("List__LotusPoStProof", "LotusPoStProof"),
    list("List__MinerV0VestingFund", "MinerV0VestingFund"),
    // Chain structs.
    tuple("LotusBlockHeader", LOTUS_BLOCK_HEADER),
    tuple("LotusTicket", LOTUS_TICKET),
    tuple("LotusElectionProof", LOTUS_ELECTION_PROOF),
    tuple("LotusBeaconEntry", LOTUS_BEACON_ENTRY),
    tuple("LotusPoStProof", LOTUS_POST_PROOF),
    tuple("LotusActors", LOTUS_ACTORS),
    // Actor structs.
    tuple("AccountV0State", ACCOUNT_V0_STATE),
    tuple("CronV0State", CRON_V0_STATE),
    tuple("CronV0Entry", CRON_V0_ENTRY),
    tuple("InitV0State", INIT_V0_STATE),
    tuple("MarketV0State", MARKET_V0_STATE),
    tuple("MarketV0DealProposal", MARKET_V0_DEAL_PROPOSAL),
    tuple("MarketV0DealState", MARKET_V0_DEAL_STATE),
    tuple("MultisigV0State", MULTISIG_V0_STATE),
    tuple("MultisigV0Transaction", MULTISIG_V0_TRANSACTION),
    tuple("MinerV0State", MINER_V0_STATE),
    tuple("MinerV0Info", MINER_V0_INFO),
    tuple("MinerV0WorkerChangeKey", MINER_V0_WORKER_CHANGE_KEY),
    tuple("MinerV0VestingFunds", MINER_V0_VESTING_FUNDS),
    tuple("MinerV0VestingFund", MINER_V0_VESTING_FUND),
    tuple("MinerV0SectorPreCommitOnChainInfo", MINER_V0_SECTOR_PRE_COMMIT_ON_CHAIN_INFO),
    tuple("MinerV0SectorPreCommitInfo", MINER_V0_SECTOR_PRE_COMMIT_INFO),
    tuple("MinerV0SectorOnChainInfo", MINER_V0_SECTOR_ON_CHAIN_INFO),
    tuple("MinerV0Deadlines", MINER_V0_DEADLINES),
    tuple("MinerV0Deadline", MINER_V0_DEADLINE),
    tuple("MinerV0Partition", MINER_V0_PARTITION),
    tuple("MinerV0ExpirationSet", MINER_V0_EXPIRATION_SET),
    tuple("MinerV0PowerPair", MINER_V0_POWER_PAIR),
    tuple("PowerV0State", POWER_V0_STATE),
    tuple("PowerV0CronEvent", POWER_V0_CRON_EVENT),
    tuple("PowerV0Claim", POWER_V0_CLAIM),
    tuple("V0FilterEstimate", V0_FILTER_ESTIMATE),
    tuple("RewardV0State", REWARD_V0_STATE),
    tuple("VerifregV0State", VERIFREG_V0_STATE),
    tuple("PaychV0State", PAYCH_V0_STATE),
    tuple("PaychV0LaneState", PAYCH_V0_LANE_STATE),
    // Materialized sharded structures.
    map("Map__LotusActors", StrTag::RawAddress, "LotusActors"),
    map("Map__ActorID", StrTag::RawAddress, "ActorID"),
    map("Map__BalanceTable", StrTag::RawAddress, "TokenAmount"),
    map("Map__DataCap", StrTag::RawAddress, "DataCap"),
    map("Map__PowerV0Claim", StrTag::RawAddress, "PowerV0Claim"),
    map("Map__MarketV0RawDealProposal", StrTag::CidString, "MarketV0DealProposal"),
    map("Map__MarketV0DealProposal", StrTag::Plain, "MarketV0DealProposal"),
    map("Map__MarketV0DealState", StrTag::Plain, "MarketV0DealState"),
    map("Map__List__DealID", StrTag::Plain, "List__DealID"),
    map("Map__MultisigV0Transaction", StrTag::Plain, "MultisigV0Transaction"),
    map("Map__SectorPreCommitOnChainInfo", StrTag::Plain, "MinerV0SectorPreCommitOnChainInfo"),
    map("Map__SectorOnChainInfo", StrTag::Plain, "MinerV0SectorOnChainInfo"),
    map("Map__BitField", StrTag::Plain, "BitField"),
    map("Map__MinerV0Partition", StrTag::Plain, "MinerV0Partition"),
    map("Map__MinerV0ExpirationSet", StrTag::Plain, "MinerV0ExpirationSet"),
    map("Map__PowerV0CronEvent", StrTag::Plain, "Map__Index__PowerV0CronEvent"),
    map("Map__Index__PowerV0CronEvent", StrTag::Plain, "PowerV0CronEvent"),
    map("Map__PaychV0LaneState", StrTag::Plain, "PaychV0LaneState"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn type_names_are_unique() {
        let mut seen = HashSet::new();
        for def in TYPES {
            assert!(seen.insert(def.name), "duplicate type {}", def.name);
        }
    }

    #[test]
    fn address_keyed_maps_use_raw_address_keys() {
        for name in [
            "Map__LotusActors",
            "Map__ActorID",
            "Map__BalanceTable",
            "Map__DataCap",
            "Map__PowerV0Claim",
        ] {
            let def = TYPES.iter().find(|d| d.name == name).unwrap();
            assert!(
                matches!(def.kind, TypeKind::Map { key: StrTag::RawAddress, .. }),
                "{name}"
            );
        }
    }

    #[test]
    fn only_block_header_has_optional_fields() {
        for def in TYPES {
            if let TypeKind::Tuple { fields } = def.kind {
                let optional = fields.iter().any(|f| f.optional);
                assert_eq!(optional, def.name == "LotusBlockHeader", "{}", def.name);
            }
        }
    }
}
