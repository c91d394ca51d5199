//! CBOR constants.

// Major type values (bits 7-5 of the initial byte)
pub const MAJOR_UIN: u8 = 0b000;
pub const MAJOR_NIN: u8 = 0b001;
pub const MAJOR_BIN: u8 = 0b010;
pub const MAJOR_STR: u8 = 0b011;
pub const MAJOR_ARR: u8 = 0b100;
pub const MAJOR_MAP: u8 = 0b101;
pub const MAJOR_TAG: u8 = 0b110;
pub const MAJOR_TKN: u8 = 0b111;

pub const MINOR_MASK: u8 = 0b11111;

/// Additional-information value for indefinite lengths.
pub const MINOR_INDEFINITE: u8 = 31;

pub const SIMPLE_FALSE: u8 = 20;
pub const SIMPLE_TRUE: u8 = 21;
pub const SIMPLE_NULL: u8 = 22;
pub const SIMPLE_UNDEFINED: u8 = 23;

pub const FLOAT_16: u8 = 25;
pub const FLOAT_32: u8 = 26;
pub const FLOAT_64: u8 = 27;

/// Encoded `null`.
pub const NULL: u8 = 0xf6;

/// Tag marking a CID link in DAG-CBOR.
pub const TAG_CID: u64 = 42;

/// Default limit on nested arrays, maps and tags.
pub const DEFAULT_MAX_DEPTH: usize = 128;
