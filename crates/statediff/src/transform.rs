//! Top-level entry point: type path plus CID to node.

use statediff_schema::{Node, TypeSystem};
use statediff_store::BlockStore;
use statediff_types::Cid;
use tracing::debug;

use crate::config::DecodeConfig;
use crate::error::{TransformError, TransformResult};
use crate::load::Loader;
use crate::registry::Registry;
use crate::resolve::resolve_type;

/// Decode state with the builtin registry and default configuration.
pub fn transform<S: BlockStore + ?Sized>(
    cid: &Cid,
    store: &S,
    type_path: &str,
) -> TransformResult<Node> {
    Transformer::new().transform(cid, store, type_path)
}

/// Resolves type paths and decodes the state they name.
#[derive(Debug, Clone)]
pub struct Transformer<'r> {
    registry: &'r Registry,
    types: &'r TypeSystem,
    config: DecodeConfig,
}

impl Transformer<'static> {
    /// Builtin registry and schema, default configuration.
    pub fn new() -> Self {
        Self::with_parts(Registry::builtin(), TypeSystem::builtin(), DecodeConfig::default())
    }
}

impl Default for Transformer<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Transformer<'r> {
    pub fn with_parts(registry: &'r Registry, types: &'r TypeSystem, config: DecodeConfig) -> Self {
        Self {
            registry,
            types,
            config,
        }
    }

    pub fn with_config(mut self, config: DecodeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn types(&self) -> &'r TypeSystem {
        self.types
    }

    /// Decode the block at `cid` as the type `type_path` names.
    pub fn transform<S: BlockStore + ?Sized>(
        &self,
        cid: &Cid,
        store: &S,
        type_path: &str,
    ) -> TransformResult<Node> {
        let key = resolve_type(type_path);
        let name = self
            .registry
            .prototype_name(&key)
            .ok_or_else(|| TransformError::UnknownType(type_path.to_string()))?;
        let proto = self.types.prototype(name)?;
        debug!(cid = %cid, type_path, key = %key, type_name = name, "transform");
        Loader::new(store, self.registry, &self.config).load(cid, proto.new_builder())
    }

    /// Decode an actor's state given its code CID and head.
    pub fn transform_actor<S: BlockStore + ?Sized>(
        &self,
        code: &Cid,
        head: &Cid,
        store: &S,
    ) -> TransformResult<Node> {
        let key = self
            .registry
            .actor_state_key(code)
            .ok_or_else(|| TransformError::UnknownType(code.to_string()))?;
        self.transform(head, store, key)
    }
}
