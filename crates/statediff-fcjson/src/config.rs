use serde::{Deserialize, Serialize};
use statediff_types::Network;

/// Default nesting limit, counting containers and expanded links.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Configuration for [`DagMarshaler`](crate::DagMarshaler).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarshalConfig {
    /// Network prefix used when rendering addresses.
    pub network: Network,
    /// Maximum nesting of maps, lists and loaded links.
    pub max_depth: usize,
}

impl Default for MarshalConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl MarshalConfig {
    /// Render addresses with the testnet prefix.
    pub fn testnet() -> Self {
        Self {
            network: Network::Testnet,
            ..Default::default()
        }
    }
}
