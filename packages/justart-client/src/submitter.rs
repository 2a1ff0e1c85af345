//! Sign, submit and confirm built transactions.

use tracing::{info, warn};

use crate::ledger::{Ledger, PendingTxn};
use crate::signer::{sign_batch, Signer};
use crate::txn::{BuyGroup, Txn};
use crate::Error;

/// Round bound used by the reference deployment.
pub const DEFAULT_CONFIRMATION_ROUNDS: u64 = 4;

/// Outcome of a confirmed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_id: String,
    pub confirmed_round: u64,
    /// Set for application creations.
    pub application_index: Option<u64>,
}

/// Holds no state between calls beyond its ledger handle.
pub struct Submitter<'a> {
    ledger: &'a dyn Ledger,
    max_rounds: u64,
}

impl<'a> Submitter<'a> {
    pub fn new(ledger: &'a dyn Ledger, max_rounds: u64) -> Self {
        Self { ledger, max_rounds }
    }

    /// Sign and submit one transaction, then wait for confirmation.
    pub async fn submit(&self, txn: &Txn, signer: &dyn Signer) -> Result<Confirmation, Error> {
        let tx_id = txn.id()?;
        let signed = sign_batch(signer, vec![txn.encode()?]).await?;
        info!(tx_id = %tx_id, "Signed transaction");
        self.send_and_confirm(&tx_id, &signed.concat()).await
    }

    /// Verify, sign and submit the purchase group in build order.
    pub async fn submit_group(
        &self,
        group: &BuyGroup,
        signer: &dyn Signer,
    ) -> Result<Confirmation, Error> {
        group.verify()?;
        let unsigned = group
            .members()
            .iter()
            .map(|t| t.encode())
            .collect::<Result<Vec<_>, _>>()?;
        let tx_id = group.app_call().id()?;
        let signed = sign_batch(signer, unsigned).await?;
        info!(tx_id = %tx_id, group = %group.group_id(), "Signed group transaction");
        self.send_and_confirm(&tx_id, &signed.concat()).await
    }

    async fn send_and_confirm(&self, tx_id: &str, signed: &[u8]) -> Result<Confirmation, Error> {
        let accepted = self.ledger.send_raw(signed).await?;
        if accepted != tx_id {
            warn!(expected = %tx_id, accepted = %accepted, "Ledger reported a different txid");
        }
        let pending = self.wait_for_confirmation(tx_id).await?;
        info!(tx_id = %tx_id, round = pending.confirmed_round, "Transaction confirmed");
        Ok(Confirmation {
            tx_id: tx_id.to_string(),
            confirmed_round: pending.confirmed_round,
            application_index: pending.application_index,
        })
    }

    /// Poll until confirmed, rejected from the pool, or `max_rounds` pass.
    ///
    /// Suspends on the node's wait-for-block between polls.
    pub async fn wait_for_confirmation(&self, tx_id: &str) -> Result<PendingTxn, Error> {
        let start = self.ledger.last_round().await?;
        let mut current = start;
        while current < start + self.max_rounds {
            match self.ledger.pending_txn(tx_id).await {
                Ok(pending) if pending.confirmed_round > 0 => return Ok(pending),
                Ok(pending) if !pending.pool_error.is_empty() => {
                    return Err(Error::Submission(pending.pool_error));
                }
                Ok(_) => {}
                // A lagging node behind a load balancer may not know the txn yet.
                Err(e) => warn!(tx_id = %tx_id, error = %e, "Pending lookup failed"),
            }
            self.ledger.wait_for_block_after(current).await?;
            current += 1;
        }
        Err(Error::Timeout {
            tx_id: tx_id.to_string(),
            rounds: self.max_rounds,
        })
    }
}
