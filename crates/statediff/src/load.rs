//! Recursive state decoding.
//!
//! The shape registered for the builder's prototype decides how the block at
//! a CID is read. Flat types are one CBOR document. Sharded types are walked
//! entry by entry, and each entry's raw value is decoded against the map
//! type's value prototype, so one decoder per shape serves every domain
//! type stored that way.

use statediff_adt::{Amt, Hamt, Multimap, Set};
use statediff_schema::{Node, NodeBuilder, SchemaError};
use statediff_store::BlockStore;
use statediff_types::{decimal_from_be_bytes, decode_uvarint, Cid};
use tracing::{debug, trace};

use crate::config::DecodeConfig;
use crate::error::TransformResult;
use crate::registry::{KeyMode, Registry, Shape};

/// Decodes blocks from a store into schema-typed nodes.
pub struct Loader<'a, S: ?Sized> {
    store: &'a S,
    registry: &'a Registry,
    config: &'a DecodeConfig,
}

impl<'a, S: BlockStore + ?Sized> Loader<'a, S> {
    pub fn new(store: &'a S, registry: &'a Registry, config: &'a DecodeConfig) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    /// Decode the state at `cid` as the builder's prototype.
    pub fn load(&self, cid: &Cid, builder: NodeBuilder<'_>) -> TransformResult<Node> {
        let builder = builder.with_max_depth(self.config.max_depth);
        let type_name = builder.prototype().name();
        let shape = self.registry.shape(type_name);
        debug!(cid = %cid, type_name, ?shape, "loading state");
        match shape {
            Shape::FlatCbor => self.load_flat(cid, builder),
            Shape::HamtMap(mode) => self.load_hamt_map(cid, builder, mode),
            Shape::ShardedArrayMap => self.load_array_map(cid, builder),
            Shape::Multimap(mode) => self.load_multimap(cid, builder, mode),
            Shape::SetOfUintMap(mode) => self.load_set_map(cid, builder, mode),
        }
    }

    fn load_flat(&self, cid: &Cid, builder: NodeBuilder<'_>) -> TransformResult<Node> {
        let data = self.store.get(cid)?;
        Ok(builder.assign_cbor(&data)?)
    }

    fn load_hamt_map(
        &self,
        cid: &Cid,
        builder: NodeBuilder<'_>,
        mode: KeyMode,
    ) -> TransformResult<Node> {
        let hamt = Hamt::load(self.store, cid, self.config.hamt_bit_width)?;
        let mut map = builder.begin_map(0)?;
        hamt.for_each(|key, value| -> TransformResult<()> {
            map.assemble_entry(map_key(key, mode))?
                .assign_cbor(value.raw())?;
            Ok(())
        })?;
        trace!(cid = %cid, entries = map.len(), "decoded hamt map");
        Ok(map.finish()?)
    }

    fn load_array_map(&self, cid: &Cid, builder: NodeBuilder<'_>) -> TransformResult<Node> {
        let amt = Amt::load(self.store, cid)?;
        let mut map = builder.begin_map(usize::try_from(amt.count()).unwrap_or(0))?;
        amt.for_each(|index, value| -> TransformResult<()> {
            map.assemble_entry(index.to_string())?
                .assign_cbor(value.raw())?;
            Ok(())
        })?;
        trace!(cid = %cid, entries = map.len(), "decoded amt map");
        Ok(map.finish()?)
    }

    fn load_multimap(
        &self,
        cid: &Cid,
        builder: NodeBuilder<'_>,
        mode: KeyMode,
    ) -> TransformResult<Node> {
        let multimap = Multimap::load(self.store, cid, self.config.hamt_bit_width)?;
        let mut outer = builder.begin_map(0)?;
        multimap.for_all(|key, array| -> TransformResult<()> {
            let entry = outer.assemble_entry(map_key(key, mode))?;
            let mut inner = entry
                .builder()
                .begin_map(usize::try_from(array.count()).unwrap_or(0))?;
            array.for_each(|index, value| -> TransformResult<()> {
                inner
                    .assemble_entry(index.to_string())?
                    .assign_cbor(value.raw())?;
                Ok(())
            })?;
            entry.assign_node(inner.finish()?)?;
            Ok(())
        })?;
        trace!(cid = %cid, entries = outer.len(), "decoded multimap");
        Ok(outer.finish()?)
    }

    fn load_set_map(
        &self,
        cid: &Cid,
        builder: NodeBuilder<'_>,
        mode: KeyMode,
    ) -> TransformResult<Node> {
        let hamt = Hamt::load(self.store, cid, self.config.hamt_bit_width)?;
        let mut outer = builder.begin_map(0)?;
        hamt.for_each(|key, value| -> TransformResult<()> {
            let set_root = value.as_link()?;
            let set = Set::load(self.store, &set_root, self.config.hamt_bit_width)?;
            let entry = outer.assemble_entry(map_key(key, mode))?;
            let mut list = entry.builder().begin_list(0)?;
            let elem_type = list.value_builder().prototype().name();
            set.for_each(|member| -> TransformResult<()> {
                let (value, _) = decode_uvarint(member)?;
                let value = i64::try_from(value)
                    .map_err(|_| SchemaError::IntOverflow { type_name: elem_type })?;
                list.assemble_value().assign_int(value)?;
                Ok(())
            })?;
            entry.assign_node(list.finish()?)?;
            Ok(())
        })?;
        trace!(cid = %cid, entries = outer.len(), "decoded set map");
        Ok(outer.finish()?)
    }
}

/// Map key for a raw structure key.
fn map_key(raw: &[u8], mode: KeyMode) -> Vec<u8> {
    match mode {
        KeyMode::Passthrough => raw.to_vec(),
        KeyMode::BigEndianUint => decimal_from_be_bytes(raw).into_bytes(),
    }
}
