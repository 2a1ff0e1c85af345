//! # JustArt Client
//!
//! Async client for the JustArt on-ledger marketplace. Each listing is its own
//! application; this crate discovers them through the indexer, builds the
//! add / buy / relist / unlist transactions, hands them to an external signer
//! and waits for confirmation.
//!
//! ## Quick Start
//! ```bash
//! cargo run --bin justart -- items
//! ```
//!
//! ## Layout
//! - [`txn`] - canonical wire transactions and the purchase group
//! - [`builder`] - pure transaction construction
//! - [`submitter`] - sign, submit, wait for confirmation
//! - [`rpc`] - HTTP node and indexer clients with failover
//! - [`MarketClient`] - queries and operations over the above

pub mod builder;
pub mod config;
mod error;
pub mod ledger;
mod market;
pub mod rpc;
mod session;
mod signer;
pub mod submitter;
pub mod txn;

pub use config::Config;
pub use error::Error;
pub use ledger::{Indexer, Ledger, PendingTxn, TxnQuery};
pub use market::{MarketClient, TealSource};
pub use session::{Session, SessionStore};
pub use signer::Signer;
pub use submitter::{Confirmation, Submitter};

pub use justart_types as types;
