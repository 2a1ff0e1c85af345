//! Transaction construction for marketplace operations.
//!
//! Pure: nothing here talks to a signer or the network. Every function
//! returns an unsigned, fully populated transaction (or group).

use serde_bytes::ByteBuf;

use justart_types::codec::{encode_text, encode_uint64};
use justart_types::{Address, Item, ItemDraft, TxKind};

use crate::txn::{BuyGroup, StateSchema, SuggestedParams, Txn, TxnType};
use crate::Error;

/// Global storage of an item application: PRICE, PREVPRICE, LISTED.
pub const GLOBAL_UINTS: u64 = 3;
/// NAME, DESCRIPTION, IMAGE, LOCATION, OWNER.
pub const GLOBAL_BYTE_SLICES: u64 = 5;

/// Compiled approval and clear programs of the item contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Programs {
    pub approval: Vec<u8>,
    pub clear: Vec<u8>,
}

fn arg(bytes: impl Into<Vec<u8>>) -> ByteBuf {
    ByteBuf::from(bytes.into())
}

fn price_arg(price: u64) -> Result<ByteBuf, Error> {
    Ok(arg(encode_uint64(price)?.to_vec()))
}

fn require_app_id(item: &Item) -> Result<u64, Error> {
    match item.app_id {
        Some(id) if id > 0 => Ok(id),
        _ => Err(Error::InvalidState(format!(
            "item {:?} has no application id",
            item.name
        ))),
    }
}

fn app_call(sender: Address, item: &Item, params: &SuggestedParams) -> Result<Txn, Error> {
    let mut txn = Txn::new(TxnType::ApplicationCall, sender, params);
    txn.app_id = require_app_id(item)?;
    Ok(txn)
}

/// Application-creation transaction for a new item.
///
/// Args: name, description, image, location, price. `note` is the shared
/// marketplace discovery tag.
pub fn build_add(
    sender: Address,
    draft: &ItemDraft,
    programs: &Programs,
    note: &[u8],
    params: &SuggestedParams,
) -> Result<Txn, Error> {
    let mut txn = Txn::new(TxnType::ApplicationCall, sender, params);
    txn.approval_program = Some(programs.approval.clone());
    txn.clear_program = Some(programs.clear.clone());
    txn.global_schema = StateSchema {
        num_byte_slices: GLOBAL_BYTE_SLICES,
        num_uints: GLOBAL_UINTS,
    };
    txn.note = note.to_vec();
    txn.app_args = vec![
        arg(encode_text(&draft.name)),
        arg(encode_text(&draft.description)),
        arg(encode_text(&draft.image)),
        arg(encode_text(&draft.location)),
        price_arg(draft.price)?,
    ];
    txn.with_suggested_fee(params)
}

/// Purchase group: `buy` call naming the current owner, then payment of
/// exactly `curr_price` to that owner.
pub fn build_buy(sender: Address, item: &Item, params: &SuggestedParams) -> Result<BuyGroup, Error> {
    if item.curr_owner.is_empty() {
        return Err(Error::InvalidState(format!(
            "item {:?} has no current owner",
            item.name
        )));
    }
    let owner: Address = item.curr_owner.parse()?;

    let mut call = app_call(sender, item, params)?;
    call.app_args = vec![arg(encode_text(TxKind::Buy.as_str()))];
    call.accounts = vec![owner];
    let call = call.with_suggested_fee(params)?;

    let mut payment = Txn::new(TxnType::Payment, sender, params);
    payment.receiver = Some(owner);
    payment.amount = item.curr_price;
    let payment = payment.with_suggested_fee(params)?;

    BuyGroup::new(call, payment)
}

/// `relist` call with the new location and price.
pub fn build_relist(
    sender: Address,
    item: &Item,
    new_location: &str,
    new_price: u64,
    params: &SuggestedParams,
) -> Result<Txn, Error> {
    let mut txn = app_call(sender, item, params)?;
    txn.app_args = vec![
        arg(encode_text(TxKind::Relist.as_str())),
        arg(encode_text(new_location)),
        price_arg(new_price)?,
    ];
    txn.with_suggested_fee(params)
}

/// `unlist` call.
pub fn build_unlist(sender: Address, item: &Item, params: &SuggestedParams) -> Result<Txn, Error> {
    let mut txn = app_call(sender, item, params)?;
    txn.app_args = vec![arg(encode_text(TxKind::Unlist.as_str()))];
    txn.with_suggested_fee(params)
}
