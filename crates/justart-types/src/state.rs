//! Global-state decoding: raw indexer key/value entries → typed [`Item`].

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::codec::{address_from_raw, application_address, decode_text, decode_uint64};
use crate::{Item, ProtocolError};

/// Fixed global-state vocabulary of an item application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    Name,
    Description,
    Image,
    Location,
    Price,
    PrevPrice,
    Owner,
    Listed,
}

/// How a state value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Uint,
    Address,
}

impl StateKey {
    pub const ALL: [StateKey; 8] = [
        StateKey::Name,
        StateKey::Description,
        StateKey::Image,
        StateKey::Location,
        StateKey::Price,
        StateKey::PrevPrice,
        StateKey::Owner,
        StateKey::Listed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "NAME",
            Self::Description => "DESCRIPTION",
            Self::Image => "IMAGE",
            Self::Location => "LOCATION",
            Self::Price => "PRICE",
            Self::PrevPrice => "PREVPRICE",
            Self::Owner => "OWNER",
            Self::Listed => "LISTED",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Name | Self::Description | Self::Image | Self::Location => FieldKind::Text,
            Self::Price | Self::PrevPrice | Self::Listed => FieldKind::Uint,
            Self::Owner => FieldKind::Address,
        }
    }

    /// Case-sensitive match against a decoded raw key.
    pub fn from_tag(tag: &[u8]) -> Option<StateKey> {
        Self::ALL.into_iter().find(|k| key_tag(*k) == tag)
    }
}

/// Encoded form of a tag as the ledger stores it in state keys.
pub fn key_tag(key: StateKey) -> &'static [u8] {
    key.as_str().as_bytes()
}

/// `type` discriminator of an indexer TealValue.
pub const TEAL_TYPE_BYTES: u8 = 1;
pub const TEAL_TYPE_UINT: u8 = 2;

/// Indexer `TealValue`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TealValue {
    #[serde(rename = "type")]
    pub kind: u8,
    /// Base64.
    #[serde(default)]
    pub bytes: String,
    #[serde(default)]
    pub uint: u64,
}

/// Indexer `TealKeyValue`; `key` is base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TealKeyValue {
    pub key: String,
    pub value: TealValue,
}

impl TealKeyValue {
    pub fn bytes(tag: &str, value: &[u8]) -> Self {
        Self {
            key: B64.encode(tag),
            value: TealValue {
                kind: TEAL_TYPE_BYTES,
                bytes: B64.encode(value),
                uint: 0,
            },
        }
    }

    pub fn uint(tag: &str, value: u64) -> Self {
        Self {
            key: B64.encode(tag),
            value: TealValue {
                kind: TEAL_TYPE_UINT,
                bytes: String::new(),
                uint: value,
            },
        }
    }
}

/// Indexer `Application` record, as returned by an application lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: u64,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub params: ApplicationParams,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationParams {
    #[serde(default)]
    pub creator: String,
    #[serde(rename = "global-state", default)]
    pub global_state: Vec<TealKeyValue>,
}

pub(crate) fn decode_b64(field: &str, value: &str) -> Result<Vec<u8>, ProtocolError> {
    B64.decode(value)
        .map_err(|e| ProtocolError::Decode(format!("invalid base64 in {field}: {e}")))
}

/// A decoded value before field-specific interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Bytes(Vec<u8>),
    Uint(u64),
}

impl RawValue {
    pub fn into_text(self, key: StateKey) -> Result<String, ProtocolError> {
        match self {
            Self::Bytes(b) => decode_text(&b),
            Self::Uint(_) => Err(type_mismatch(key, "bytes")),
        }
    }

    /// Uint values pass through; byte values must be an 8-byte big-endian integer.
    pub fn into_uint(self, key: StateKey) -> Result<u64, ProtocolError> {
        match self {
            Self::Uint(n) => Ok(n),
            Self::Bytes(b) => decode_uint64(&b)
                .map_err(|e| ProtocolError::Decode(format!("{}: {e}", key.as_str()))),
        }
    }

    pub fn into_address(self, key: StateKey) -> Result<String, ProtocolError> {
        match self {
            Self::Bytes(b) => address_from_raw(&b)
                .map_err(|e| ProtocolError::Decode(format!("{}: {e}", key.as_str()))),
            Self::Uint(_) => Err(type_mismatch(key, "bytes")),
        }
    }
}

fn type_mismatch(key: StateKey, expected: &str) -> ProtocolError {
    ProtocolError::Decode(format!("{} expected {expected} value", key.as_str()))
}

fn raw_value(key: StateKey, value: &TealValue) -> Result<RawValue, ProtocolError> {
    match value.kind {
        TEAL_TYPE_BYTES => Ok(RawValue::Bytes(decode_b64(key.as_str(), &value.bytes)?)),
        TEAL_TYPE_UINT => Ok(RawValue::Uint(value.uint)),
        other => Err(ProtocolError::Decode(format!(
            "{} has unknown value type {other}",
            key.as_str()
        ))),
    }
}

/// Resolve every known tag once. Unknown keys are ignored.
fn index_state(entries: &[TealKeyValue]) -> Result<HashMap<StateKey, RawValue>, ProtocolError> {
    let mut out = HashMap::with_capacity(StateKey::ALL.len());
    for entry in entries {
        let tag = decode_b64("state key", &entry.key)?;
        if let Some(key) = StateKey::from_tag(&tag) {
            out.insert(key, raw_value(key, &entry.value)?);
        }
    }
    Ok(out)
}

/// Decode an application's global state into an [`Item`].
///
/// `Ok(None)` means the application is deleted (the item was withdrawn).
/// Absent keys take their defaults; present-but-malformed values are errors.
/// `history` is left empty.
pub fn decode_item(
    app_id: u64,
    global_state: &[TealKeyValue],
    deleted: bool,
) -> Result<Option<Item>, ProtocolError> {
    if deleted {
        return Ok(None);
    }

    let mut state = index_state(global_state)?;
    let mut text = |key: StateKey| -> Result<String, ProtocolError> {
        state.remove(&key).map_or(Ok(String::new()), |v| v.into_text(key))
    };
    let name = text(StateKey::Name)?;
    let description = text(StateKey::Description)?;
    let image = text(StateKey::Image)?;
    let location = text(StateKey::Location)?;

    let mut uint = |key: StateKey| -> Result<u64, ProtocolError> {
        state.remove(&key).map_or(Ok(0), |v| v.into_uint(key))
    };
    let curr_price = uint(StateKey::Price)?;
    let prev_price = uint(StateKey::PrevPrice)?;
    let is_item_listed = uint(StateKey::Listed)?;

    let curr_owner = state
        .remove(&StateKey::Owner)
        .map_or(Ok(String::new()), |v| v.into_address(StateKey::Owner))?;

    Ok(Some(Item {
        app_id: Some(app_id),
        app_address: Some(application_address(app_id).to_string()),
        name,
        description,
        image,
        location,
        curr_price,
        prev_price,
        curr_owner,
        is_item_listed,
        history: Vec::new(),
    }))
}

/// [`decode_item`] over an indexer application record.
pub fn decode_application(app: &ApplicationRecord) -> Result<Option<Item>, ProtocolError> {
    decode_item(app.id, &app.params.global_state, app.deleted)
}
