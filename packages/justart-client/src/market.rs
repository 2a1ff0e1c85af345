//! Marketplace client: item queries and the four state-mutating operations.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use justart_types::{decode_application, filter_by_owner, reconstruct_history, Item, ItemDraft};

use crate::builder::{build_add, build_buy, build_relist, build_unlist, Programs};
use crate::ledger::{Indexer, Ledger, TxnQuery};
use crate::rpc::{AlgodClient, Endpoint, IndexerClient};
use crate::session::Session;
use crate::signer::Signer;
use crate::submitter::{Confirmation, Submitter, DEFAULT_CONFIRMATION_ROUNDS};
use crate::{Config, Error};

/// Where a TEAL program's source comes from.
#[derive(Debug, Clone)]
pub enum TealSource {
    Path(PathBuf),
    Inline(String),
}

impl TealSource {
    async fn load(&self) -> Result<String, Error> {
        match self {
            TealSource::Inline(source) => Ok(source.clone()),
            TealSource::Path(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                Error::Config(format!("Failed to read TEAL program {}: {e}", path.display()))
            }),
        }
    }
}

pub struct MarketClient {
    ledger: Arc<dyn Ledger>,
    indexer: Arc<dyn Indexer>,
    note: Vec<u8>,
    min_round: u64,
    confirmation_rounds: u64,
    concurrency: usize,
    approval: TealSource,
    clear: TealSource,
}

impl MarketClient {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        indexer: Arc<dyn Indexer>,
        approval: TealSource,
        clear: TealSource,
    ) -> Self {
        let defaults = Config::default();
        Self {
            ledger,
            indexer,
            note: defaults.market_note.into_bytes(),
            min_round: defaults.min_round,
            confirmation_rounds: DEFAULT_CONFIRMATION_ROUNDS,
            concurrency: defaults.query_concurrency,
            approval,
            clear,
        }
    }

    /// HTTP-backed client with failover for both the node and the indexer.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let algod = AlgodClient::new(
            Endpoint::new(&config.algod_url, &config.algod_token),
            Endpoint::new(&config.fallback_algod_url, &config.algod_token),
            timeout,
        )?;
        let indexer = IndexerClient::new(
            Endpoint::new(&config.indexer_url, &config.indexer_token),
            Endpoint::new(&config.fallback_indexer_url, &config.indexer_token),
            timeout,
        )?;
        Ok(Self::new(
            Arc::new(algod),
            Arc::new(indexer),
            TealSource::Path(config.approval_program_path.clone().into()),
            TealSource::Path(config.clear_program_path.clone().into()),
        )
        .with_note(config.market_note.as_bytes())
        .with_min_round(config.min_round)
        .with_confirmation_rounds(config.confirmation_rounds)
        .with_concurrency(config.query_concurrency))
    }

    pub fn with_note(mut self, note: &[u8]) -> Self {
        self.note = note.to_vec();
        self
    }

    pub fn with_min_round(mut self, min_round: u64) -> Self {
        self.min_round = min_round;
        self
    }

    pub fn with_confirmation_rounds(mut self, rounds: u64) -> Self {
        self.confirmation_rounds = rounds;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn submitter(&self) -> Submitter<'_> {
        Submitter::new(self.ledger.as_ref(), self.confirmation_rounds)
    }

    // --- Queries ---

    /// Every live marketplace item, in creation order. History is not loaded.
    pub async fn get_items(&self) -> Result<Vec<Item>, Error> {
        let creations = self
            .indexer
            .search_transactions(&TxnQuery::creations(&self.note, self.min_round))
            .await?;
        let ids: Vec<u64> = creations
            .iter()
            .filter_map(|r| r.created_application_index)
            .collect();
        debug!(count = ids.len(), "Resolving marketplace items");

        let resolved: Vec<Option<Item>> = stream::iter(ids)
            .map(|id| self.get_item(id, false))
            .buffered(self.concurrency)
            .try_collect()
            .await?;
        let items: Vec<Item> = resolved.into_iter().flatten().collect();
        info!(count = items.len(), "Loaded marketplace items");
        Ok(items)
    }

    /// `None` when the application is missing or deleted.
    pub async fn get_item(&self, app_id: u64, with_history: bool) -> Result<Option<Item>, Error> {
        let Some(app) = self.indexer.lookup_application(app_id).await? else {
            debug!(app_id, "Application not found");
            return Ok(None);
        };
        let Some(mut item) = decode_application(&app)? else {
            debug!(app_id, "Application deleted");
            return Ok(None);
        };
        if with_history {
            let calls = self
                .indexer
                .search_transactions(&TxnQuery::calls_to(app_id))
                .await?;
            item.history = reconstruct_history(&calls)?;
        }
        Ok(Some(item))
    }

    /// Items currently owned by `owner`. Filters [`Self::get_items`].
    pub async fn get_user_items(&self, owner: &str) -> Result<Vec<Item>, Error> {
        Ok(filter_by_owner(self.get_items().await?, owner))
    }

    /// Account balance in micro-units.
    pub async fn balance(&self, address: &str) -> Result<u64, Error> {
        self.indexer.account_balance(address).await
    }

    // --- Operations ---

    async fn programs(&self) -> Result<Programs, Error> {
        let approval = self.ledger.compile(&self.approval.load().await?).await?;
        let clear = self.ledger.compile(&self.clear.load().await?).await?;
        Ok(Programs { approval, clear })
    }

    /// Create a new item. Returns its application id.
    pub async fn add_item(
        &self,
        session: &Session,
        draft: &ItemDraft,
        signer: &dyn Signer,
    ) -> Result<u64, Error> {
        let sender = session.sender()?;
        let programs = self.programs().await?;
        let params = self.ledger.suggested_params().await?;
        let txn = build_add(sender, draft, &programs, &self.note, &params)?;
        let confirmation = self.submitter().submit(&txn, signer).await?;
        let app_id = confirmation.application_index.ok_or_else(|| {
            Error::Decode(format!(
                "creation {} confirmed without an application index",
                confirmation.tx_id
            ))
        })?;
        info!(app_id, name = %draft.name, "Item created");
        Ok(app_id)
    }

    pub async fn buy_item(
        &self,
        session: &Session,
        item: &Item,
        signer: &dyn Signer,
    ) -> Result<Confirmation, Error> {
        let sender = session.sender()?;
        let params = self.ledger.suggested_params().await?;
        let group = build_buy(sender, item, &params)?;
        let confirmation = self.submitter().submit_group(&group, signer).await?;
        info!(app_id = ?item.app_id, price = item.curr_price, "Item bought");
        Ok(confirmation)
    }

    pub async fn relist_item(
        &self,
        session: &Session,
        item: &Item,
        new_location: &str,
        new_price: u64,
        signer: &dyn Signer,
    ) -> Result<Confirmation, Error> {
        let sender = session.sender()?;
        let params = self.ledger.suggested_params().await?;
        let txn = build_relist(sender, item, new_location, new_price, &params)?;
        let confirmation = self.submitter().submit(&txn, signer).await?;
        info!(app_id = ?item.app_id, price = new_price, "Item relisted");
        Ok(confirmation)
    }

    pub async fn unlist_item(
        &self,
        session: &Session,
        item: &Item,
        signer: &dyn Signer,
    ) -> Result<Confirmation, Error> {
        let sender = session.sender()?;
        let params = self.ledger.suggested_params().await?;
        let txn = build_unlist(sender, item, &params)?;
        let confirmation = self.submitter().submit(&txn, signer).await?;
        info!(app_id = ?item.app_id, "Item unlisted");
        Ok(confirmation)
    }
}
