use std::fmt;
use std::str::FromStr;

use blake2::digest::consts::U4;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::multibase;
use crate::varint::{decode_uvarint, encode_uvarint};

const CHECKSUM_LEN: usize = 4;
const HASH_PAYLOAD_LEN: usize = 20;
const BLS_PAYLOAD_LEN: usize = 48;

/// Network an address is rendered for. Only the text prefix differs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub fn prefix(self) -> char {
        match self {
            Network::Mainnet => 'f',
            Network::Testnet => 't',
        }
    }

    fn from_prefix(ch: char) -> Option<Self> {
        match ch {
            'f' => Some(Network::Mainnet),
            't' => Some(Network::Testnet),
            _ => None,
        }
    }
}

/// Address protocol, the first byte of the binary form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Protocol {
    /// Actor id, payload is an unsigned varint.
    Id = 0,
    /// BLAKE2b-160 of a secp256k1 public key.
    Secp256k1 = 1,
    /// BLAKE2b-160 of actor creation data.
    Actor = 2,
    /// BLS public key.
    Bls = 3,
}

impl TryFrom<u8> for Protocol {
    type Error = TypeError;

    fn try_from(value: u8) -> TypeResult<Self> {
        match value {
            0 => Ok(Protocol::Id),
            1 => Ok(Protocol::Secp256k1),
            2 => Ok(Protocol::Actor),
            3 => Ok(Protocol::Bls),
            other => Err(TypeError::UnknownAddressProtocol(other)),
        }
    }
}

/// A Filecoin address.
///
/// The binary form is the protocol byte followed by the payload. The text
/// form is `<network><protocol>` followed by the decimal id for protocol 0,
/// or the base32 of payload plus a 4-byte BLAKE2b checksum otherwise.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    protocol: Protocol,
    payload: Vec<u8>,
}

impl Address {
    pub fn new_id(id: u64) -> Self {
        let mut payload = Vec::with_capacity(10);
        encode_uvarint(&mut payload, id);
        Self {
            protocol: Protocol::Id,
            payload,
        }
    }

    pub fn new_secp256k1(payload: &[u8]) -> TypeResult<Self> {
        Self::with_payload(Protocol::Secp256k1, payload)
    }

    pub fn new_actor(payload: &[u8]) -> TypeResult<Self> {
        Self::with_payload(Protocol::Actor, payload)
    }

    pub fn new_bls(payload: &[u8]) -> TypeResult<Self> {
        Self::with_payload(Protocol::Bls, payload)
    }

    fn with_payload(protocol: Protocol, payload: &[u8]) -> TypeResult<Self> {
        let expected = match protocol {
            Protocol::Id => {
                let (_, used) = decode_uvarint(payload)?;
                if used != payload.len() {
                    return Err(TypeError::InvalidAddress(
                        "trailing bytes after id".into(),
                    ));
                }
                return Ok(Self {
                    protocol,
                    payload: payload.to_vec(),
                });
            }
            Protocol::Secp256k1 | Protocol::Actor => HASH_PAYLOAD_LEN,
            Protocol::Bls => BLS_PAYLOAD_LEN,
        };
        if payload.len() != expected {
            return Err(TypeError::InvalidLength {
                expected,
                actual: payload.len(),
            });
        }
        Ok(Self {
            protocol,
            payload: payload.to_vec(),
        })
    }

    /// Parse the binary form.
    pub fn from_bytes(bytes: &[u8]) -> TypeResult<Self> {
        let (&first, payload) = bytes
            .split_first()
            .ok_or_else(|| TypeError::InvalidAddress("empty".into()))?;
        Self::with_payload(Protocol::try_from(first)?, payload)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.payload.len());
        out.push(self.protocol as u8);
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The actor id, for protocol 0 addresses.
    pub fn id(&self) -> Option<u64> {
        match self.protocol {
            Protocol::Id => decode_uvarint(&self.payload).ok().map(|(id, _)| id),
            _ => None,
        }
    }

    /// Text form for the given network.
    pub fn encode(&self, network: Network) -> String {
        let mut out = String::with_capacity(2 + (self.payload.len() + CHECKSUM_LEN) * 8 / 5 + 1);
        out.push(network.prefix());
        out.push(char::from(b'0' + self.protocol as u8));
        match self.id() {
            Some(id) => out.push_str(&id.to_string()),
            None => {
                let mut data = self.payload.clone();
                data.extend_from_slice(&checksum(self.protocol, &self.payload));
                out.push_str(&multibase::base32_encode(&data));
            }
        }
        out
    }
}

fn checksum(protocol: Protocol, payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Blake2b::<U4>::new();
    hasher.update([protocol as u8]);
    hasher.update(payload);
    hasher.finalize().into()
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode(Network::Mainnet))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> TypeResult<Self> {
        let mut chars = s.chars();
        let (Some(net), Some(proto)) = (chars.next(), chars.next()) else {
            return Err(TypeError::InvalidAddress(format!("too short: {s:?}")));
        };
        if Network::from_prefix(net).is_none() {
            return Err(TypeError::InvalidAddress(format!("unknown network {net:?}")));
        }
        let protocol = proto
            .to_digit(10)
            .and_then(|d| u8::try_from(d).ok())
            .ok_or_else(|| TypeError::InvalidAddress(format!("bad protocol {proto:?}")))
            .and_then(Protocol::try_from)?;
        let rest = chars.as_str();
        if rest.is_empty() {
            return Err(TypeError::InvalidAddress("missing payload".into()));
        }

        if protocol == Protocol::Id {
            let id: u64 = rest
                .parse()
                .map_err(|_| TypeError::InvalidAddress(format!("bad id {rest:?}")))?;
            return Ok(Self::new_id(id));
        }

        let data = multibase::base32_decode(rest)?;
        if data.len() < CHECKSUM_LEN {
            return Err(TypeError::InvalidAddress("payload shorter than checksum".into()));
        }
        let (payload, sum) = data.split_at(data.len() - CHECKSUM_LEN);
        let address = Self::with_payload(protocol, payload)?;
        if checksum(protocol, payload) != sum {
            return Err(TypeError::AddressChecksum);
        }
        Ok(address)
    }
}
