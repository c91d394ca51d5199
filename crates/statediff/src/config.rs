use serde::{Deserialize, Serialize};
use statediff_adt::DEFAULT_BIT_WIDTH;
use statediff_cbor::DEFAULT_MAX_DEPTH;

/// Configuration for decoding state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Bit width of every HAMT walked. Filecoin v0 state uses 5.
    pub hamt_bit_width: u32,
    /// Maximum CBOR and schema nesting within one block.
    pub max_depth: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            hamt_bit_width: DEFAULT_BIT_WIDTH,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
