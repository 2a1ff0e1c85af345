//! Ledger collaborators: the node (`Ledger`) and the indexer (`Indexer`).
//!
//! HTTP implementations live in [`crate::rpc`]; tests substitute in-memory ones.

use async_trait::async_trait;
use serde::Deserialize;

use justart_types::{AppCallRecord, ApplicationRecord};

use crate::txn::SuggestedParams;
use crate::Error;

/// algod `/v2/transactions/pending/{txid}` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PendingTxn {
    #[serde(rename = "confirmed-round", default)]
    pub confirmed_round: u64,
    #[serde(rename = "pool-error", default)]
    pub pool_error: String,
    #[serde(rename = "application-index", default)]
    pub application_index: Option<u64>,
}

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn suggested_params(&self) -> Result<SuggestedParams, Error>;

    /// Compile TEAL source to program bytes.
    async fn compile(&self, source: &str) -> Result<Vec<u8>, Error>;

    /// Submit concatenated signed transactions. Returns the first txid.
    async fn send_raw(&self, signed: &[u8]) -> Result<String, Error>;

    /// Latest round the node has seen.
    async fn last_round(&self) -> Result<u64, Error>;

    /// Suspend until a block after `round` exists. Returns the new last round.
    async fn wait_for_block_after(&self, round: u64) -> Result<u64, Error>;

    async fn pending_txn(&self, tx_id: &str) -> Result<PendingTxn, Error>;
}

/// Filter for indexer transaction search. Unset fields are not filtered on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxnQuery {
    pub note_prefix: Option<Vec<u8>>,
    pub application_id: Option<u64>,
    pub tx_type: Option<&'static str>,
    pub min_round: Option<u64>,
}

impl TxnQuery {
    pub const APPLICATION_CALL: &'static str = "appl";

    /// Marketplace creations: note-prefixed application calls since `min_round`.
    pub fn creations(note: &[u8], min_round: u64) -> Self {
        Self {
            note_prefix: Some(note.to_vec()),
            application_id: None,
            tx_type: Some(Self::APPLICATION_CALL),
            min_round: Some(min_round),
        }
    }

    /// Every application call against one item.
    pub fn calls_to(app_id: u64) -> Self {
        Self {
            note_prefix: None,
            application_id: Some(app_id),
            tx_type: Some(Self::APPLICATION_CALL),
            min_round: None,
        }
    }
}

#[async_trait]
pub trait Indexer: Send + Sync {
    /// `None` when the application does not exist.
    async fn lookup_application(&self, app_id: u64) -> Result<Option<ApplicationRecord>, Error>;

    /// All matching transactions in confirmation order (pagination resolved).
    async fn search_transactions(&self, query: &TxnQuery) -> Result<Vec<AppCallRecord>, Error>;

    /// Account balance in micro-units.
    async fn account_balance(&self, address: &str) -> Result<u64, Error>;
}
