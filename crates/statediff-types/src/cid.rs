use std::fmt;
use std::str::FromStr;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;

use crate::error::{TypeError, TypeResult};
use crate::multibase::{self, BASE32_PREFIX, BASE58_PREFIX};
use crate::varint::{decode_uvarint, encode_uvarint};

/// Multicodec content types carried by CIDs.
pub mod codec {
    pub const RAW: u64 = 0x55;
    pub const DAG_PB: u64 = 0x70;
    pub const DAG_CBOR: u64 = 0x71;
}

/// Multihash function codes.
pub mod multihash_code {
    pub const IDENTITY: u64 = 0x00;
    pub const SHA2_256: u64 = 0x12;
    pub const BLAKE2B_256: u64 = 0xb220;
}

/// A self-describing digest: hash function code plus digest bytes.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Multihash {
    code: u64,
    digest: Vec<u8>,
}

impl Multihash {
    pub fn new(code: u64, digest: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            digest: digest.into(),
        }
    }

    /// BLAKE2b-256 of `data`, the hash Filecoin uses for state blocks.
    pub fn blake2b_256(data: &[u8]) -> Self {
        Self::new(
            multihash_code::BLAKE2B_256,
            Blake2b::<U32>::digest(data).to_vec(),
        )
    }

    /// SHA2-256 of `data`.
    pub fn sha2_256(data: &[u8]) -> Self {
        Self::new(multihash_code::SHA2_256, Sha256::digest(data).to_vec())
    }

    /// The identity "hash": the data itself.
    pub fn identity(data: &[u8]) -> Self {
        Self::new(multihash_code::IDENTITY, data.to_vec())
    }

    pub fn code(&self) -> u64 {
        self.code
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Append the binary form to `buf`.
    pub fn write_bytes(&self, buf: &mut Vec<u8>) {
        encode_uvarint(buf, self.code);
        encode_uvarint(buf, self.digest.len() as u64);
        buf.extend_from_slice(&self.digest);
    }

    /// Read a multihash from the front of `data`, returning it and the
    /// number of bytes consumed.
    pub fn read_bytes(data: &[u8]) -> TypeResult<(Self, usize)> {
        let (code, a) = decode_uvarint(data)?;
        let (len, b) = decode_uvarint(&data[a..])?;
        let start = a + b;
        let len = usize::try_from(len)
            .map_err(|_| TypeError::InvalidMultihash("digest length overflow".into()))?;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| {
                TypeError::InvalidMultihash(format!(
                    "digest of {len} bytes truncated at {}",
                    data.len() - start
                ))
            })?;
        Ok((Self::new(code, &data[start..end]), end))
    }
}

impl fmt::Debug for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multihash({:#x}, {} bytes)", self.code, self.digest.len())
    }
}

/// CID version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Version {
    V0,
    V1,
}

/// Content identifier naming an immutable block.
///
/// Version 1 CIDs carry a content codec and render as base32 with the `b`
/// multibase prefix. Version 0 CIDs are bare SHA2-256 multihashes of
/// DAG-PB blocks and render as base58btc (`Qm...`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid {
    version: Version,
    codec: u64,
    hash: Multihash,
}

impl Cid {
    /// Build a version 0 CID. The multihash must be a 32-byte SHA2-256.
    pub fn new_v0(hash: Multihash) -> TypeResult<Self> {
        if hash.code != multihash_code::SHA2_256 || hash.digest.len() != 32 {
            return Err(TypeError::InvalidCid(
                "v0 requires a 32-byte sha2-256 multihash".into(),
            ));
        }
        Ok(Self {
            version: Version::V0,
            codec: codec::DAG_PB,
            hash,
        })
    }

    pub fn new_v1(codec: u64, hash: Multihash) -> Self {
        Self {
            version: Version::V1,
            codec,
            hash,
        }
    }

    /// Hash `data` with BLAKE2b-256 and name it with a v1 CID.
    pub fn for_block(codec: u64, data: &[u8]) -> Self {
        Self::new_v1(codec, Multihash::blake2b_256(data))
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn codec(&self) -> u64 {
        self.codec
    }

    pub fn hash(&self) -> &Multihash {
        &self.hash
    }

    /// Binary form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.hash.digest.len() + 8);
        if self.version == Version::V1 {
            encode_uvarint(&mut buf, 1);
            encode_uvarint(&mut buf, self.codec);
        }
        self.hash.write_bytes(&mut buf);
        buf
    }

    /// Read a CID from the front of `data`, returning it and the number of
    /// bytes consumed.
    pub fn read_bytes(data: &[u8]) -> TypeResult<(Self, usize)> {
        if data.len() >= 2 && data[0] == multihash_code::SHA2_256 as u8 && data[1] == 32 {
            let (hash, used) = Multihash::read_bytes(data)?;
            return Ok((Self::new_v0(hash)?, used));
        }
        let (version, a) = decode_uvarint(data)?;
        if version != 1 {
            return Err(TypeError::InvalidCid(format!("unsupported version {version}")));
        }
        let (codec, b) = decode_uvarint(&data[a..])?;
        let (hash, c) = Multihash::read_bytes(&data[a + b..])?;
        Ok((Self::new_v1(codec, hash), a + b + c))
    }

    /// Parse a CID that occupies all of `data`.
    pub fn from_bytes(data: &[u8]) -> TypeResult<Self> {
        let (cid, used) = Self::read_bytes(data)?;
        if used != data.len() {
            return Err(TypeError::InvalidCid(format!(
                "{} trailing bytes",
                data.len() - used
            )));
        }
        Ok(cid)
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Version::V0 => f.write_str(&multibase::base58_encode(&self.to_bytes())),
            Version::V1 => write!(
                f,
                "{BASE32_PREFIX}{}",
                multibase::base32_encode(&self.to_bytes())
            ),
        }
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({self})")
    }
}

impl FromStr for Cid {
    type Err = TypeError;

    fn from_str(s: &str) -> TypeResult<Self> {
        if s.len() == 46 && s.starts_with("Qm") {
            return Self::from_bytes(&multibase::base58_decode(s)?);
        }
        let mut chars = s.chars();
        let bytes = match chars.next() {
            Some(BASE32_PREFIX) => multibase::base32_decode(chars.as_str())?,
            Some(BASE58_PREFIX) => multibase::base58_decode(chars.as_str())?,
            Some(other) => return Err(TypeError::UnsupportedMultibase(other)),
            None => return Err(TypeError::InvalidCid("empty string".into())),
        };
        Self::from_bytes(&bytes)
    }
}

impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_dag_cbor_blake2b_text() {
        let cid = Cid::for_block(codec::DAG_CBOR, b"hello");
        assert_eq!(
            cid.to_string(),
            "bafy2bzaceaze3tycpxkkgcutfrcb6ns2exugwfz556slrzmjjasti4nydnzm6"
        );
    }

    #[test]
    fn v1_text_roundtrip() {
        let cid = Cid::for_block(codec::DAG_CBOR, b"hello");
        let parsed: Cid = cid.to_string().parse().unwrap();
        assert_eq!(parsed, cid);
        assert_eq!(parsed.version(), Version::V1);
        assert_eq!(parsed.codec(), codec::DAG_CBOR);
        assert_eq!(parsed.hash().code(), multihash_code::BLAKE2B_256);
    }

    #[test]
    fn identity_raw_actor_code() {
        let cid = Cid::new_v1(codec::RAW, Multihash::identity(b"fil/1/system"));
        assert_eq!(cid.to_string(), "bafkqaddgnfwc6mjpon4xg5dfnu");
        let parsed: Cid = "bafkqaddgnfwc6mjpon4xg5dfnu".parse().unwrap();
        assert_eq!(parsed.hash().digest(), b"fil/1/system");
    }

    #[test]
    fn v0_renders_base58() {
        let cid = Cid::new_v0(Multihash::sha2_256(b"hello")).unwrap();
        let text = cid.to_string();
        assert_eq!(text, "QmRN6wdp1S2A5EtjW9A3M1vKSBuQQGcgvuhoMUoEz4iiT5");
        assert_eq!(text.parse::<Cid>().unwrap(), cid);
    }

    #[test]
    fn v0_requires_sha256() {
        assert!(Cid::new_v0(Multihash::identity(b"x")).is_err());
    }

    #[test]
    fn read_bytes_reports_consumed_length() {
        let cid = Cid::for_block(codec::RAW, b"data");
        let mut bytes = cid.to_bytes();
        let len = bytes.len();
        bytes.extend_from_slice(&[0xde, 0xad]);
        let (parsed, used) = Cid::read_bytes(&bytes).unwrap();
        assert_eq!(parsed, cid);
        assert_eq!(used, len);
        assert!(Cid::from_bytes(&bytes).is_err());
    }

    #[test]
    fn truncated_digest_is_rejected() {
        let bytes = Cid::for_block(codec::RAW, b"data").to_bytes();
        let err = Cid::from_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, TypeError::InvalidMultihash(_)));
    }

    #[test]
    fn unsupported_multibase() {
        let err = "mAXESIA".parse::<Cid>().unwrap_err();
        assert_eq!(err, TypeError::UnsupportedMultibase('m'));
    }

    #[test]
    fn serde_as_string() {
        let cid = Cid::for_block(codec::DAG_CBOR, b"hello");
        let json = serde_json::to_string(&cid).unwrap();
        assert_eq!(json, format!("\"{cid}\""));
        let back: Cid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cid);
    }
}
