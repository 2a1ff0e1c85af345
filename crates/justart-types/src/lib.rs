//! Shared types and pure-logic codecs for the JustArt marketplace protocol.
//! No I/O; usable from any async runtime or none.

mod amount;
pub mod codec;
mod error;
pub mod history;
mod item;
pub mod state;

pub use amount::{format_amount, parse_amount, MICRO_UNITS_DECIMALS};
pub use codec::{Address, Digest};
pub use error::ProtocolError;
pub use history::{reconstruct_history, AppCallRecord};
pub use item::{filter_by_owner, Item, ItemDraft, Transaction, TxKind};
pub use state::{decode_application, decode_item, key_tag, ApplicationRecord, StateKey, TealKeyValue};
