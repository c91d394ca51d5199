//! Builders for state trees used by the tests.

use statediff_adt::{Amt, Hamt, Multimap, Set, DEFAULT_BIT_WIDTH};
use statediff_cbor::Encoder;
use statediff_store::{Block, BlockStore, InMemoryBlockStore};
use statediff_types::{codec, encode_uvarint, Address, Cid};

pub fn cbor(f: impl FnOnce(&mut Encoder)) -> Vec<u8> {
    let mut enc = Encoder::new();
    f(&mut enc);
    enc.into_bytes()
}

pub fn put(store: &InMemoryBlockStore, data: Vec<u8>) -> Cid {
    store.put(&Block::new(codec::DAG_CBOR, data)).unwrap()
}

pub fn id(n: u64) -> Vec<u8> {
    Address::new_id(n).to_bytes()
}

/// Chain big-int encoding: sign byte then big-endian magnitude.
pub fn big(n: u64) -> Vec<u8> {
    if n == 0 {
        return Vec::new();
    }
    let be = n.to_be_bytes();
    let start = be.iter().position(|b| *b != 0).unwrap_or(be.len());
    let mut out = vec![0x00];
    out.extend_from_slice(&be[start..]);
    out
}

/// Minimal big-endian key bytes for an epoch.
pub fn epoch_key(n: u64) -> Vec<u8> {
    big(n).into_iter().skip(1).collect()
}

pub fn link(cid: &Cid) -> Vec<u8> {
    cbor(|e| e.write_link(cid))
}

/// A code CID that no block in the store matches.
pub fn dangling(tag: &[u8]) -> Cid {
    Cid::for_block(codec::RAW, tag)
}

/// `LotusActors` tuple.
pub fn actor(code: &Cid, head: &Cid, nonce: u64, balance: u64) -> Vec<u8> {
    cbor(|e| {
        e.write_array_header(4);
        e.write_link(code);
        e.write_link(head);
        e.write_uint(nonce);
        e.write_bytes(&big(balance));
    })
}

/// `MarketV0DealProposal` tuple.
pub fn deal_proposal(client: u64, provider: u64, label: &str) -> Vec<u8> {
    cbor(|e| {
        e.write_array_header(11);
        e.write_link(&dangling(label.as_bytes()));
        e.write_uint(2048);
        e.write_bool(false);
        e.write_bytes(&id(client));
        e.write_bytes(&id(provider));
        e.write_text(label);
        e.write_int(10);
        e.write_int(20);
        e.write_bytes(&big(1));
        e.write_bytes(&big(0));
        e.write_bytes(&big(0));
    })
}

/// `PowerV0CronEvent` tuple.
pub fn cron_event(miner: u64, payload: &[u8]) -> Vec<u8> {
    cbor(|e| {
        e.write_array_header(2);
        e.write_bytes(&id(miner));
        e.write_bytes(payload);
    })
}

/// HAMT of epoch to set of uvarint deal ids.
pub fn deal_ops(store: &InMemoryBlockStore, epochs: Vec<(u64, Vec<u64>)>) -> Cid {
    let mut entries = Vec::new();
    for (epoch, deals) in epochs {
        let keys = deals.iter().map(|d| {
            let mut buf = Vec::new();
            encode_uvarint(&mut buf, *d);
            buf
        });
        let set = Set::build(store, DEFAULT_BIT_WIDTH, keys).unwrap();
        entries.push((epoch_key(epoch), link(&set)));
    }
    Hamt::build(store, DEFAULT_BIT_WIDTH, entries).unwrap()
}

pub fn cron_queue(store: &InMemoryBlockStore, epochs: Vec<(Vec<u8>, Vec<Vec<u8>>)>) -> Cid {
    Multimap::build(store, DEFAULT_BIT_WIDTH, epochs).unwrap()
}

/// RLE+ of {0, 2, 5}.
pub const BITS: &[u8] = &[0xbc, 0x12];

fn power_pair(e: &mut Encoder, raw: u64, qa: u64) {
    e.write_array_header(2);
    e.write_bytes(&big(raw));
    e.write_bytes(&big(qa));
}

/// A miner with one info block and two deadlines. Everything else the
/// state links to is absent from the store.
pub struct Miner {
    pub store: InMemoryBlockStore,
    pub head: Cid,
    pub vesting: Cid,
    pub partitions: Cid,
}

pub fn miner() -> Miner {
    let store = InMemoryBlockStore::new();
    let info = put(
        &store,
        cbor(|e| {
            e.write_array_header(9);
            e.write_bytes(&id(100));
            e.write_bytes(&id(101));
            e.write_array_header(1);
            e.write_bytes(&id(102));
            e.write_null();
            e.write_bytes(b"peer");
            e.write_array_header(0);
            e.write_uint(3);
            e.write_uint(34_359_738_368);
            e.write_uint(2349);
        }),
    );
    let expirations = Amt::build(&store, [(7, cbor(|e| e.write_bytes(BITS)))]).unwrap();
    let partitions = Amt::build_list(&store, Vec::<Vec<u8>>::new()).unwrap();
    let deadline = |live: u64| {
        put(
            &store,
            cbor(|e| {
                e.write_array_header(7);
                e.write_link(&partitions);
                e.write_link(&expirations);
                e.write_bytes(BITS);
                e.write_bytes(&[]);
                e.write_uint(live);
                e.write_uint(live);
                power_pair(e, 0, 0);
            }),
        )
    };
    let due = [deadline(1), deadline(2)];
    let deadlines = put(
        &store,
        cbor(|e| {
            e.write_array_header(1);
            e.write_array_header(due.len());
            for d in &due {
                e.write_link(d);
            }
        }),
    );
    let vesting = dangling(b"vesting");
    let head = put(
        &store,
        cbor(|e| {
            e.write_array_header(13);
            e.write_link(&info);
            e.write_bytes(&big(0));
            e.write_bytes(&big(1000));
            e.write_link(&vesting);
            e.write_bytes(&big(5));
            e.write_link(&dangling(b"precommitted"));
            e.write_link(&dangling(b"expiry"));
            e.write_link(&dangling(b"allocated"));
            e.write_link(&dangling(b"sectors"));
            e.write_int(-1);
            e.write_uint(0);
            e.write_link(&deadlines);
            e.write_bytes(BITS);
        }),
    );
    Miner {
        store,
        head,
        vesting,
        partitions,
    }
}
