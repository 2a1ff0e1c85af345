//! Unsigned ledger transactions in canonical msgpack form.
//!
//! Fields are declared in lexicographic order of their wire keys and empty
//! values are skipped, so `rmp_serde::to_vec_named` yields the canonical
//! encoding the ledger hashes.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use justart_types::codec::sha512_256;
use justart_types::{Address, Digest};

use crate::Error;

const TXID_PREFIX: &[u8] = b"TX";
const GROUP_PREFIX: &[u8] = b"TG";
/// `{sig: bin64, txn: …}` envelope added by signing.
const SIGNATURE_OVERHEAD: u64 = 75;
/// Validity window opened by suggested params.
const VALIDITY_ROUNDS: u64 = 1000;

pub const ON_COMPLETE_NOOP: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnType {
    Payment,
    ApplicationCall,
}

impl TxnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "pay",
            Self::ApplicationCall => "appl",
        }
    }
}

impl Serialize for TxnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TxnType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "pay" => Ok(Self::Payment),
            "appl" => Ok(Self::ApplicationCall),
            other => Err(serde::de::Error::unknown_variant(other, &["pay", "appl"])),
        }
    }
}

/// Storage allocation requested at application creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSchema {
    #[serde(rename = "nbs", default, skip_serializing_if = "is_zero")]
    pub num_byte_slices: u64,
    #[serde(rename = "nui", default, skip_serializing_if = "is_zero")]
    pub num_uints: u64,
}

impl StateSchema {
    pub fn is_empty(&self) -> bool {
        self.num_byte_slices == 0 && self.num_uints == 0
    }
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

/// Unsigned transaction. Payment and application-call fields share one
/// struct, as on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Txn {
    #[serde(rename = "amt", default, skip_serializing_if = "is_zero")]
    pub amount: u64,
    #[serde(rename = "apaa", default, skip_serializing_if = "Vec::is_empty")]
    pub app_args: Vec<ByteBuf>,
    #[serde(rename = "apan", default, skip_serializing_if = "is_zero")]
    pub on_complete: u64,
    #[serde(
        rename = "apap",
        default,
        with = "serde_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub approval_program: Option<Vec<u8>>,
    #[serde(rename = "apat", default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<Address>,
    #[serde(rename = "apgs", default, skip_serializing_if = "StateSchema::is_empty")]
    pub global_schema: StateSchema,
    #[serde(rename = "apid", default, skip_serializing_if = "is_zero")]
    pub app_id: u64,
    #[serde(rename = "apls", default, skip_serializing_if = "StateSchema::is_empty")]
    pub local_schema: StateSchema,
    #[serde(
        rename = "apsu",
        default,
        with = "serde_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub clear_program: Option<Vec<u8>>,
    #[serde(rename = "fee", default, skip_serializing_if = "is_zero")]
    pub fee: u64,
    #[serde(rename = "fv", default, skip_serializing_if = "is_zero")]
    pub first_valid: u64,
    #[serde(rename = "gen", default, skip_serializing_if = "String::is_empty")]
    pub genesis_id: String,
    #[serde(rename = "gh")]
    pub genesis_hash: Digest,
    #[serde(rename = "grp", default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Digest>,
    #[serde(rename = "lv", default, skip_serializing_if = "is_zero")]
    pub last_valid: u64,
    #[serde(
        rename = "note",
        default,
        with = "serde_bytes",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub note: Vec<u8>,
    #[serde(rename = "rcv", default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Address>,
    #[serde(rename = "snd")]
    pub sender: Address,
    #[serde(rename = "type")]
    pub kind: TxnType,
}

impl Txn {
    /// Empty transaction of `kind` inside the window of `params`. Fee is
    /// assigned by [`Txn::with_suggested_fee`] once all fields are set.
    pub fn new(kind: TxnType, sender: Address, params: &SuggestedParams) -> Self {
        Self {
            amount: 0,
            app_args: Vec::new(),
            on_complete: ON_COMPLETE_NOOP,
            approval_program: None,
            accounts: Vec::new(),
            global_schema: StateSchema::default(),
            app_id: 0,
            local_schema: StateSchema::default(),
            clear_program: None,
            fee: 0,
            first_valid: params.first_valid,
            genesis_id: params.genesis_id.clone(),
            genesis_hash: params.genesis_hash,
            group: None,
            last_valid: params.last_valid,
            note: Vec::new(),
            receiver: None,
            sender,
            kind,
        }
    }

    /// Canonical msgpack; the bytes handed to a signer.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        rmp_serde::to_vec_named(self).map_err(|e| Error::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        rmp_serde::from_slice(bytes).map_err(|e| Error::Decode(format!("invalid transaction: {e}")))
    }

    pub fn raw_id(&self) -> Result<Digest, Error> {
        let encoded = self.encode()?;
        Ok(Digest(sha512_256(&[TXID_PREFIX, &encoded])))
    }

    /// Base32 transaction id, as the ledger reports it.
    pub fn id(&self) -> Result<String, Error> {
        Ok(self.raw_id()?.to_string())
    }

    /// `max(min_fee, fee_per_byte × estimated signed size)`.
    pub fn with_suggested_fee(mut self, params: &SuggestedParams) -> Result<Self, Error> {
        let size = self.encode()?.len() as u64 + SIGNATURE_OVERHEAD;
        let fee = params.fee_per_byte.saturating_mul(size);
        self.fee = fee.max(params.min_fee);
        Ok(self)
    }
}

/// Network parameters every transaction is built against. Fetched fresh for
/// each operation; reusing a stale window is a caller bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedParams {
    pub fee_per_byte: u64,
    pub min_fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: Digest,
}

/// algod `/v2/transactions/params` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionParamsResponse {
    pub fee: u64,
    #[serde(rename = "min-fee")]
    pub min_fee: u64,
    #[serde(rename = "last-round")]
    pub last_round: u64,
    #[serde(rename = "genesis-id")]
    pub genesis_id: String,
    /// Base64.
    #[serde(rename = "genesis-hash")]
    pub genesis_hash: String,
}

impl TryFrom<TransactionParamsResponse> for SuggestedParams {
    type Error = Error;

    fn try_from(resp: TransactionParamsResponse) -> Result<Self, Self::Error> {
        let hash = B64
            .decode(&resp.genesis_hash)
            .map_err(|e| Error::Decode(format!("invalid genesis hash: {e}")))?;
        let hash: [u8; 32] = hash
            .try_into()
            .map_err(|_| Error::Decode("genesis hash must be 32 bytes".into()))?;
        Ok(Self {
            fee_per_byte: resp.fee,
            min_fee: resp.min_fee,
            first_valid: resp.last_round,
            last_valid: resp.last_round + VALIDITY_ROUNDS,
            genesis_id: resp.genesis_id,
            genesis_hash: Digest(hash),
        })
    }
}

#[derive(Serialize)]
struct TxGroup<'a> {
    txlist: &'a [Digest],
}

/// Group id over `txns` in the given order. Members must not carry a group yet.
pub fn compute_group_id(txns: &[&Txn]) -> Result<Digest, Error> {
    let ids = txns
        .iter()
        .map(|t| {
            let mut ungrouped = (*t).clone();
            ungrouped.group = None;
            ungrouped.raw_id()
        })
        .collect::<Result<Vec<_>, _>>()?;
    let encoded = rmp_serde::to_vec_named(&TxGroup { txlist: &ids })
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(Digest(sha512_256(&[GROUP_PREFIX, &encoded])))
}

/// The purchase group: application call first, payment second.
///
/// Positions are fields, so the members cannot be reordered after the group
/// id is computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyGroup {
    app_call: Txn,
    payment: Txn,
    group_id: Digest,
}

impl BuyGroup {
    /// Compute the group id over (app call, payment) and stamp both members.
    pub fn new(mut app_call: Txn, mut payment: Txn) -> Result<Self, Error> {
        let group_id = compute_group_id(&[&app_call, &payment])?;
        app_call.group = Some(group_id);
        payment.group = Some(group_id);
        Ok(Self {
            app_call,
            payment,
            group_id,
        })
    }

    pub fn app_call(&self) -> &Txn {
        &self.app_call
    }

    pub fn payment(&self) -> &Txn {
        &self.payment
    }

    pub fn group_id(&self) -> Digest {
        self.group_id
    }

    /// Members in signing/submission order.
    pub fn members(&self) -> [&Txn; 2] {
        [&self.app_call, &self.payment]
    }

    /// Both members must carry the id recomputed over their current order.
    pub fn verify(&self) -> Result<(), Error> {
        for member in self.members() {
            if member.group != Some(self.group_id) {
                return Err(Error::InvalidState("group member lacks group id".into()));
            }
        }
        let expected = compute_group_id(&self.members())?;
        if expected != self.group_id {
            return Err(Error::InvalidState("group id does not match member order".into()));
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn members_mut(&mut self) -> (&mut Txn, &mut Txn) {
        (&mut self.app_call, &mut self.payment)
    }
}
