//! Marketplace domain records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;

/// One listing, backed by one item application.
///
/// An item without `app_id` has not been created on-chain yet and must not be
/// looked up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_address: Option<String>,
    pub name: String,
    pub description: String,
    pub image: String,
    pub location: String,
    /// Micro-units.
    pub curr_price: u64,
    pub prev_price: u64,
    pub curr_owner: String,
    /// 0 or 1.
    pub is_item_listed: u64,
    #[serde(default)]
    pub history: Vec<Transaction>,
}

impl Item {
    pub fn is_listed(&self) -> bool {
        self.is_item_listed == 1
    }

    /// History newest-first, for display.
    pub fn history_newest_first(&self) -> impl Iterator<Item = &Transaction> {
        self.history.iter().rev()
    }
}

/// Fields supplied when creating an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    pub description: String,
    pub image: String,
    pub location: String,
    pub price: u64,
}

/// Operation keyword of a state-mutating call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Add,
    Buy,
    Relist,
    Unlist,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Buy => "buy",
            Self::Relist => "relist",
            Self::Unlist => "unlist",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "buy" => Ok(Self::Buy),
            "relist" => Ok(Self::Relist),
            "unlist" => Ok(Self::Unlist),
            other => Err(ProtocolError::Decode(format!("unknown operation keyword: {other:?}"))),
        }
    }
}

/// One history entry: a state-mutating call against an item application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_hash: String,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub from: String,
    /// `None` when the call changed no price; distinct from a zero price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
    /// Seconds since epoch of the confirming round.
    pub created_at: u64,
}

/// Items currently owned by `owner`, in input order.
pub fn filter_by_owner(items: Vec<Item>, owner: &str) -> Vec<Item> {
    items.into_iter().filter(|item| item.curr_owner == owner).collect()
}
