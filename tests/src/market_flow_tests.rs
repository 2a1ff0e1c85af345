//! End-to-end marketplace flows against the in-memory ledger.

use anyhow::Result;
use justart_client::{Error, MarketClient, Session};
use justart_types::codec::application_address;
use justart_types::{Item, ItemDraft, TxKind};

use crate::utils::{account, market, RejectingSigner, SandboxLedger, WalletSigner};

fn draft(name: &str, price: u64) -> ItemDraft {
    ItemDraft {
        name: name.into(),
        description: "Hand-thrown stoneware".into(),
        image: "https://images.example/vase.png".into(),
        location: "Accra".into(),
        price,
    }
}

async fn fetch(market: &MarketClient, app_id: u64) -> Result<Item> {
    market
        .get_item(app_id, true)
        .await?
        .ok_or_else(|| anyhow::anyhow!("item {app_id} not found"))
}

async fn add(market: &MarketClient, seller: &Session, name: &str, price: u64) -> Result<u64> {
    Ok(market.add_item(seller, &draft(name, price), &WalletSigner::default()).await?)
}

// ── Creation ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_add_item_then_read_back() -> Result<()> {
    let ledger = SandboxLedger::new();
    let market = market(&ledger);
    let (seller, session) = account(&ledger, 1, "Ama");

    let app_id = add(&market, &session, "Vase", 2_000_000).await?;
    let item = fetch(&market, app_id).await?;

    assert_eq!(item.app_id, Some(app_id));
    assert_eq!(
        item.app_address,
        Some(application_address(app_id).to_string())
    );
    assert_eq!(item.name, "Vase");
    assert_eq!(item.location, "Accra");
    assert_eq!(item.curr_price, 2_000_000);
    assert_eq!(item.prev_price, 0);
    assert_eq!(item.curr_owner, seller.to_string());
    assert!(item.is_listed());

    assert_eq!(item.history.len(), 1);
    assert_eq!(item.history[0].kind, TxKind::Add);
    assert_eq!(item.history[0].price, Some(2_000_000));
    assert_eq!(item.history[0].from, seller.to_string());
    Ok(())
}

#[tokio::test]
async fn test_add_item_requires_session() -> Result<()> {
    let ledger = SandboxLedger::new();
    let market = market(&ledger);
    let err = market
        .add_item(&Session::default(), &draft("Vase", 1), &WalletSigner::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    assert_eq!(ledger.submissions(), 0);
    Ok(())
}

#[tokio::test]
async fn test_contract_rejects_empty_fields() -> Result<()> {
    let ledger = SandboxLedger::new();
    let market = market(&ledger);
    let (_, session) = account(&ledger, 1, "Ama");

    let mut bad = draft("Vase", 2_000_000);
    bad.description.clear();
    let err = market
        .add_item(&session, &bad, &WalletSigner::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Submission(ref m) if m.contains("ApprovalProgram")));
    assert!(market.get_items().await?.is_empty());
    Ok(())
}

// ── Purchase and relisting ──────────────────────────────────────────

#[tokio::test]
async fn test_buy_then_relist_tracks_prices_and_history() -> Result<()> {
    let ledger = SandboxLedger::new();
    ledger.set_next_app_id(42);
    let market = market(&ledger);
    let (seller, seller_session) = account(&ledger, 1, "Ama");
    let (buyer, buyer_session) = account(&ledger, 2, "Kofi");

    let app_id = add(&market, &seller_session, "Vase", 2_000_000).await?;
    assert_eq!(app_id, 42);

    let signer = WalletSigner::default();
    let listed = fetch(&market, app_id).await?;
    market.buy_item(&buyer_session, &listed, &signer).await?;
    assert_eq!(*signer.requests.lock().unwrap(), vec![2]);

    let bought = fetch(&market, app_id).await?;
    assert_eq!(bought.curr_owner, buyer.to_string());
    assert_eq!(bought.curr_price, 0);
    assert_eq!(bought.prev_price, 2_000_000);
    assert!(!bought.is_listed());

    // Creation fee, then the sale proceeds.
    assert_eq!(market.balance(&seller.to_string()).await?, 10_000_000 - 1_000 + 2_000_000);
    assert_eq!(market.balance(&buyer.to_string()).await?, 10_000_000 - 2_000_000 - 2_000);

    market
        .relist_item(&buyer_session, &bought, "Kumasi", 3_000_000, &signer)
        .await?;
    let relisted = fetch(&market, app_id).await?;
    assert_eq!(relisted.curr_price, 3_000_000);
    assert_eq!(relisted.prev_price, 2_000_000);
    assert_eq!(relisted.location, "Kumasi");
    assert!(relisted.is_listed());

    let history: Vec<(TxKind, Option<u64>)> = relisted
        .history
        .iter()
        .map(|t| (t.kind, t.price))
        .collect();
    assert_eq!(
        history,
        vec![
            (TxKind::Add, Some(2_000_000)),
            (TxKind::Buy, Some(2_000_000)),
            (TxKind::Relist, Some(3_000_000)),
        ]
    );
    assert_eq!(relisted.history[1].from, buyer.to_string());
    Ok(())
}

#[tokio::test]
async fn test_buy_with_stale_price_is_rejected() -> Result<()> {
    let ledger = SandboxLedger::new();
    let market = market(&ledger);
    let (_, seller) = account(&ledger, 1, "Ama");
    let (_, buyer) = account(&ledger, 2, "Kofi");
    let signer = WalletSigner::default();

    let app_id = add(&market, &seller, "Vase", 2_000_000).await?;
    let seen_by_buyer = fetch(&market, app_id).await?;

    let current = fetch(&market, app_id).await?;
    market.unlist_item(&seller, &current, &signer).await?;
    let current = fetch(&market, app_id).await?;
    market
        .relist_item(&seller, &current, "Accra", 5_000_000, &signer)
        .await?;

    let err = market
        .buy_item(&buyer, &seen_by_buyer, &signer)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Submission(_)));
    assert!(err.is_transient());
    assert_eq!(fetch(&market, app_id).await?.curr_price, 5_000_000);
    Ok(())
}

#[tokio::test]
async fn test_owner_cannot_buy_own_item() -> Result<()> {
    let ledger = SandboxLedger::new();
    let market = market(&ledger);
    let (_, seller) = account(&ledger, 1, "Ama");

    let app_id = add(&market, &seller, "Vase", 2_000_000).await?;
    let item = fetch(&market, app_id).await?;
    let err = market
        .buy_item(&seller, &item, &WalletSigner::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Submission(ref m) if m.contains("buy preconditions")));
    Ok(())
}

#[tokio::test]
async fn test_relist_while_listed_is_rejected() -> Result<()> {
    let ledger = SandboxLedger::new();
    let market = market(&ledger);
    let (_, seller) = account(&ledger, 1, "Ama");

    let app_id = add(&market, &seller, "Vase", 2_000_000).await?;
    let item = fetch(&market, app_id).await?;
    let err = market
        .relist_item(&seller, &item, "Tema", 4_000_000, &WalletSigner::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Submission(ref m) if m.contains("relist preconditions")));
    Ok(())
}

#[tokio::test]
async fn test_unlist_zeroes_price() -> Result<()> {
    let ledger = SandboxLedger::new();
    let market = market(&ledger);
    let (_, seller) = account(&ledger, 1, "Ama");

    let app_id = add(&market, &seller, "Vase", 2_000_000).await?;
    let item = fetch(&market, app_id).await?;
    market
        .unlist_item(&seller, &item, &WalletSigner::default())
        .await?;

    let unlisted = fetch(&market, app_id).await?;
    assert!(!unlisted.is_listed());
    assert_eq!(unlisted.curr_price, 0);
    let last = unlisted.history.last().unwrap();
    assert_eq!(last.kind, TxKind::Unlist);
    assert_eq!(last.price, Some(0));
    Ok(())
}

// ── Queries ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_user_items_filters_by_owner_in_order() -> Result<()> {
    let ledger = SandboxLedger::new();
    let market = market(&ledger);
    let (ama, ama_session) = account(&ledger, 1, "Ama");
    let (_, kofi_session) = account(&ledger, 2, "Kofi");

    for (i, session) in [&kofi_session, &ama_session, &kofi_session, &ama_session, &kofi_session]
        .into_iter()
        .enumerate()
    {
        add(&market, session, &format!("Piece {i}"), 1_000_000 + i as u64).await?;
    }

    let all = market.get_items().await?;
    let names: Vec<&str> = all.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Piece 0", "Piece 1", "Piece 2", "Piece 3", "Piece 4"]);
    assert!(all.iter().all(|i| i.history.is_empty()));

    let mine = market.get_user_items(&ama.to_string()).await?;
    let names: Vec<&str> = mine.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Piece 1", "Piece 3"]);
    Ok(())
}

#[tokio::test]
async fn test_deleted_items_are_withdrawn_not_errors() -> Result<()> {
    let ledger = SandboxLedger::new();
    let market = market(&ledger);
    let (_, seller) = account(&ledger, 1, "Ama");

    let keep = add(&market, &seller, "Vase", 2_000_000).await?;
    let gone = add(&market, &seller, "Bowl", 1_000_000).await?;
    ledger.delete_app(gone);

    assert!(market.get_item(gone, true).await?.is_none());
    assert!(market.get_item(9_999_999, false).await?.is_none());
    let items = market.get_items().await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].app_id, Some(keep));
    Ok(())
}

#[tokio::test]
async fn test_other_notes_are_not_discovered() -> Result<()> {
    let ledger = SandboxLedger::new();
    let (_, seller) = account(&ledger, 1, "Ama");
    add(&market(&ledger), &seller, "Vase", 2_000_000).await?;

    let other = market(&ledger).with_note(b"someone-else:v1");
    assert!(other.get_items().await?.is_empty());
    let later = market(&ledger).with_min_round(ledger.round() + 1);
    assert!(later.get_items().await?.is_empty());
    Ok(())
}

// ── Signing and confirmation failures ───────────────────────────────

#[tokio::test]
async fn test_signing_rejection_submits_nothing() -> Result<()> {
    let ledger = SandboxLedger::new();
    let market = market(&ledger);
    let (_, seller) = account(&ledger, 1, "Ama");

    let err = market
        .add_item(&seller, &draft("Vase", 2_000_000), &RejectingSigner)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Signing(_)));
    assert_eq!(ledger.submissions(), 0);
    Ok(())
}

#[tokio::test]
async fn test_unconfirmed_submission_times_out() -> Result<()> {
    let ledger = SandboxLedger::new();
    let market = market(&ledger);
    let (_, seller) = account(&ledger, 1, "Ama");
    ledger.stall_confirmations();

    let start = ledger.round();
    let err = market
        .add_item(&seller, &draft("Vase", 2_000_000), &WalletSigner::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { rounds: 4, .. }));
    // One block for the submission, then the bounded wait.
    assert_eq!(ledger.round(), start + 1 + 4);
    Ok(())
}
