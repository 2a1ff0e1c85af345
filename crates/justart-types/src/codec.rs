//! Value codecs for application arguments and global-state bytes.
//!
//! Addresses and digests are 32-byte values. Their text forms are unpadded
//! base32; addresses carry a 4-byte SHA-512/256 checksum suffix.

use data_encoding::BASE32_NOPAD;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha512_256};
use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;

const CHECKSUM_LEN: usize = 4;
const ADDRESS_TEXT_LEN: usize = 58;
const APP_ID_PREFIX: &[u8] = b"appID";

pub fn encode_text(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

/// Strict UTF-8; no replacement characters.
pub fn decode_text(bytes: &[u8]) -> Result<String, ProtocolError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| ProtocolError::Decode(format!("invalid utf-8 in state value: {e}")))
}

/// 8-byte big-endian. Anything that does not fit a u64 is a `Range` error.
pub fn encode_uint64<N>(n: N) -> Result<[u8; 8], ProtocolError>
where
    N: TryInto<u64> + Copy + fmt::Display,
{
    let value: u64 = n
        .try_into()
        .map_err(|_| ProtocolError::Range(format!("{n} does not fit in uint64")))?;
    Ok(value.to_be_bytes())
}

pub fn decode_uint64(bytes: &[u8]) -> Result<u64, ProtocolError> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        ProtocolError::Decode(format!("uint64 needs 8 bytes, got {}", bytes.len()))
    })?;
    Ok(u64::from_be_bytes(raw))
}

/// SHA-512/256, the ledger's hash for ids and checksums.
pub fn sha512_256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// 32-byte hash (transaction id, group id, genesis hash).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&BASE32_NOPAD.encode(&self.0))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({self})")
    }
}

/// Raw account or application address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let hash = sha512_256(&[&self.0]);
        let mut out = [0u8; CHECKSUM_LEN];
        out.copy_from_slice(&hash[32 - CHECKSUM_LEN..]);
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::with_capacity(32 + CHECKSUM_LEN);
        buf.extend_from_slice(&self.0);
        buf.extend_from_slice(&self.checksum());
        f.write_str(&BASE32_NOPAD.encode(&buf))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ADDRESS_TEXT_LEN {
            return Err(ProtocolError::Decode(format!(
                "address must be {ADDRESS_TEXT_LEN} chars, got {}",
                s.len()
            )));
        }
        let decoded = BASE32_NOPAD
            .decode(s.as_bytes())
            .map_err(|e| ProtocolError::Decode(format!("invalid address encoding: {e}")))?;
        let (raw, checksum) = decoded.split_at(32);
        let address = Address(
            raw.try_into()
                .map_err(|_| ProtocolError::Decode("invalid address length".into()))?,
        );
        if address.checksum() != checksum {
            return Err(ProtocolError::Decode(format!("address checksum mismatch: {s}")));
        }
        Ok(address)
    }
}

/// Checksummed text form of a raw 32-byte address (the OWNER state value).
pub fn address_from_raw(bytes: &[u8]) -> Result<String, ProtocolError> {
    let raw: [u8; 32] = bytes.try_into().map_err(|_| {
        ProtocolError::Decode(format!("address needs 32 bytes, got {}", bytes.len()))
    })?;
    Ok(Address(raw).to_string())
}

/// Escrow address of an application. Pure; no ledger lookup.
pub fn application_address(app_id: u64) -> Address {
    Address(sha512_256(&[APP_ID_PREFIX, &app_id.to_be_bytes()]))
}

// --- msgpack `bin` serde for the 32-byte newtypes ---

struct Bytes32Visitor;

impl<'de> Visitor<'de> for Bytes32Visitor {
    type Value = [u8; 32];

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("32 bytes")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        v.try_into().map_err(|_| E::invalid_length(v.len(), &self))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
        self.visit_bytes(&v)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut out = [0u8; 32];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        Ok(out)
    }
}

macro_rules! bytes32_serde {
    ($ty:ident) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_bytes(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_bytes(Bytes32Visitor).map($ty)
            }
        }
    };
}

bytes32_serde!(Address);
bytes32_serde!(Digest);
