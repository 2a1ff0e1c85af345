//! Per-item transaction history from indexer application-call records.

use serde::{Deserialize, Serialize};

use crate::codec::decode_text;
use crate::state::{decode_b64, RawValue, StateKey};
use crate::{ProtocolError, Transaction, TxKind};

/// `action` values of an indexer EvalDelta.
pub const DELTA_SET_BYTES: u8 = 1;
pub const DELTA_SET_UINT: u8 = 2;
pub const DELTA_DELETE: u8 = 3;

/// Indexer `EvalDelta`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalDelta {
    pub action: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uint: Option<u64>,
}

/// Indexer `EvalDeltaKeyValue`; `key` is base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalDeltaKeyValue {
    pub key: String,
    pub value: EvalDelta,
}

/// `on-completion` of an application call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnCompletion {
    #[default]
    Noop,
    Optin,
    Closeout,
    Clear,
    Update,
    Delete,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationCallFields {
    #[serde(rename = "application-id", default)]
    pub application_id: u64,
    #[serde(rename = "on-completion", default)]
    pub on_completion: OnCompletion,
    /// Base64.
    #[serde(rename = "application-args", default)]
    pub application_args: Vec<String>,
}

/// Indexer `Transaction`, restricted to what discovery and history need.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppCallRecord {
    pub id: String,
    #[serde(default)]
    pub sender: String,
    #[serde(rename = "round-time", default)]
    pub round_time: u64,
    #[serde(rename = "confirmed-round", default)]
    pub confirmed_round: u64,
    #[serde(rename = "created-application-index", default, skip_serializing_if = "Option::is_none")]
    pub created_application_index: Option<u64>,
    #[serde(rename = "application-transaction", default, skip_serializing_if = "Option::is_none")]
    pub application_transaction: Option<ApplicationCallFields>,
    #[serde(rename = "global-state-delta", default)]
    pub global_state_delta: Vec<EvalDeltaKeyValue>,
}

/// Price-carrying delta entry for an operation: the superseded price for
/// `buy`, the current price otherwise.
fn price_key(kind: TxKind) -> StateKey {
    match kind {
        TxKind::Buy => StateKey::PrevPrice,
        _ => StateKey::Price,
    }
}

fn classify(call: &ApplicationCallFields, tx_id: &str) -> Result<TxKind, ProtocolError> {
    // Creation calls target application id 0.
    if call.application_id == 0 {
        return Ok(TxKind::Add);
    }
    let first = call
        .application_args
        .first()
        .ok_or_else(|| ProtocolError::Decode(format!("call {tx_id} has no arguments")))?;
    decode_text(&decode_b64("application argument", first)?)?.parse()
}

fn delta_price(
    delta: &[EvalDeltaKeyValue],
    key: StateKey,
) -> Result<Option<u64>, ProtocolError> {
    for entry in delta {
        if StateKey::from_tag(&decode_b64("delta key", &entry.key)?) != Some(key) {
            continue;
        }
        let value = &entry.value;
        return match value.action {
            // Zero uints are omitted from indexer output.
            DELTA_SET_UINT => Ok(Some(value.uint.unwrap_or(0))),
            DELTA_SET_BYTES => {
                let bytes = decode_b64(key.as_str(), value.bytes.as_deref().unwrap_or_default())?;
                RawValue::Bytes(bytes).into_uint(key).map(Some)
            }
            DELTA_DELETE => Ok(None),
            other => Err(ProtocolError::Decode(format!(
                "{} delta has unknown action {other}",
                key.as_str()
            ))),
        };
    }
    Ok(None)
}

/// Build the history log of one item, oldest first, in input order.
///
/// Only plain (`noop`) application calls are kept. No reordering or
/// deduplication happens here.
pub fn reconstruct_history(records: &[AppCallRecord]) -> Result<Vec<Transaction>, ProtocolError> {
    let mut out = Vec::new();
    for record in records {
        let Some(call) = &record.application_transaction else {
            continue;
        };
        if call.on_completion != OnCompletion::Noop {
            continue;
        }
        let kind = classify(call, &record.id)?;
        let price = delta_price(&record.global_state_delta, price_key(kind))?;
        out.push(Transaction {
            tx_hash: record.id.clone(),
            kind,
            from: record.sender.clone(),
            price,
            created_at: record.round_time,
        });
    }
    Ok(out)
}
