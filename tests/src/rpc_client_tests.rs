//! HTTP-level tests of the node and indexer clients against mock servers.

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use justart_client::rpc::{AlgodClient, Endpoint, IndexerClient};
use justart_client::{Error, Indexer, Ledger, MarketClient, TealSource, TxnQuery};
use justart_types::Address;

const TIMEOUT: Duration = Duration::from_secs(5);
/// Nothing listens here.
const DEAD_URL: &str = "http://127.0.0.1:9";

fn algod(primary: &str, fallback: &str) -> Result<AlgodClient> {
    Ok(AlgodClient::new(
        Endpoint::new(primary, "algod-secret"),
        Endpoint::new(fallback, "algod-secret"),
        TIMEOUT,
    )?)
}

fn indexer(primary: &str) -> Result<IndexerClient> {
    Ok(IndexerClient::new(
        Endpoint::new(primary, ""),
        Endpoint::new(DEAD_URL, ""),
        TIMEOUT,
    )?)
}

fn b64(s: &str) -> String {
    B64.encode(s)
}

// ── Node ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_suggested_params_sends_token_and_opens_window() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/transactions/params"))
        .and(header("X-Algo-API-Token", "algod-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "consensus-version": "future",
            "fee": 0,
            "genesis-hash": B64.encode([0x48u8; 32]),
            "genesis-id": "testnet-v1.0",
            "last-round": 21600000u64,
            "min-fee": 1000
        })))
        .expect(1)
        .mount(&server)
        .await;

    let params = algod(&server.uri(), DEAD_URL)?.suggested_params().await?;
    assert_eq!(params.first_valid, 21_600_000);
    assert_eq!(params.last_valid, 21_601_000);
    assert_eq!(params.min_fee, 1000);
    assert_eq!(params.genesis_id, "testnet-v1.0");
    assert_eq!(params.genesis_hash.0, [0x48u8; 32]);
    Ok(())
}

#[tokio::test]
async fn test_reads_fail_over_to_fallback() -> Result<()> {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/status"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"last-round": 77})))
        .expect(1)
        .mount(&fallback)
        .await;

    let client = algod(&primary.uri(), &fallback.uri())?;
    assert_eq!(client.last_round().await?, 77);
    Ok(())
}

#[tokio::test]
async fn test_reads_fail_when_both_endpoints_down() -> Result<()> {
    let client = algod(DEAD_URL, DEAD_URL)?;
    assert!(matches!(client.last_round().await, Err(Error::Rpc(_))));
    Ok(())
}

#[tokio::test]
async fn test_rejected_submission_carries_node_message() -> Result<()> {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/transactions"))
        .and(header("Content-Type", "application/x-binary"))
        .and(body_bytes(vec![0x81, 0xa3, 0x73, 0x69, 0x67]))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "TransactionPool.Remember: transaction ABC: overspend"
        })))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"txId": "ABC"})))
        .expect(0)
        .mount(&fallback)
        .await;

    let client = algod(&primary.uri(), &fallback.uri())?;
    let err = client
        .send_raw(&[0x81, 0xa3, 0x73, 0x69, 0x67])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Submission(ref m) if m.ends_with("overspend")));
    Ok(())
}

#[tokio::test]
async fn test_submission_never_fails_over() -> Result<()> {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/transactions"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"txId": "ABC"})))
        .expect(0)
        .mount(&fallback)
        .await;

    let client = algod(&primary.uri(), &fallback.uri())?;
    assert!(matches!(client.send_raw(b"blob").await, Err(Error::Rpc(_))));
    Ok(())
}

#[tokio::test]
async fn test_accepted_submission_returns_txid() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"txId": "TXID52"})))
        .mount(&server)
        .await;
    assert_eq!(algod(&server.uri(), DEAD_URL)?.send_raw(b"blob").await?, "TXID52");
    Ok(())
}

#[tokio::test]
async fn test_compile_and_pending_info() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/teal/compile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hash": "HASH",
            "result": B64.encode([6u8, 0x81, 0x01])
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/transactions/pending/TX1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "confirmed-round": 21600003u64,
            "pool-error": "",
            "application-index": 42,
            "txn": {}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/status/wait-for-block-after/10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"last-round": 11})))
        .mount(&server)
        .await;

    let client = algod(&server.uri(), DEAD_URL)?;
    assert_eq!(client.compile("#pragma version 6\nint 1").await?, vec![6, 0x81, 0x01]);
    let pending = client.pending_txn("TX1").await?;
    assert_eq!(pending.confirmed_round, 21_600_003);
    assert_eq!(pending.application_index, Some(42));
    assert_eq!(client.wait_for_block_after(10).await?, 11);
    Ok(())
}

#[tokio::test]
async fn test_compile_error_is_config_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/teal/compile"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"message": "1: unknown opcode: frobnicate"})),
        )
        .mount(&server)
        .await;
    let err = algod(&server.uri(), DEAD_URL)?
        .compile("frobnicate")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(ref m) if m.contains("unknown opcode")));
    Ok(())
}

// ── Indexer ─────────────────────────────────────────────────────────

fn application_json(id: u64, owner: Address, deleted: bool) -> serde_json::Value {
    json!({
        "application": {
            "id": id,
            "deleted": deleted,
            "created-at-round": 21600001u64,
            "params": {
                "creator": owner.to_string(),
                "global-state": [
                    {"key": b64("NAME"), "value": {"type": 1, "bytes": b64("Vase"), "uint": 0}},
                    {"key": b64("PRICE"), "value": {"type": 2, "bytes": "", "uint": 2000000}},
                    {"key": b64("LISTED"), "value": {"type": 2, "bytes": "", "uint": 1}},
                    {"key": b64("OWNER"), "value": {"type": 1, "bytes": B64.encode(owner.0), "uint": 0}}
                ]
            }
        },
        "current-round": 21600100u64
    })
}

#[tokio::test]
async fn test_application_lookup() -> Result<()> {
    let server = MockServer::start().await;
    let owner = Address([5u8; 32]);
    Mock::given(method("GET"))
        .and(path("/v2/applications/42"))
        .and(query_param("include-all", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(application_json(42, owner, false)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/applications/43"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "no application found"})),
        )
        .mount(&server)
        .await;

    let client = indexer(&server.uri())?;
    let app = client
        .lookup_application(42)
        .await?
        .ok_or_else(|| anyhow::anyhow!("missing"))?;
    assert_eq!(app.id, 42);
    assert_eq!(app.params.global_state.len(), 4);
    assert!(client.lookup_application(43).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_search_follows_pagination() -> Result<()> {
    let server = MockServer::start().await;
    let note = b"justArt-market:uv0001";
    // Mounted first so it wins over the unqualified first-page mock.
    Mock::given(method("GET"))
        .and(path("/v2/transactions"))
        .and(query_param("next", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current-round": 21600100u64,
            "next-token": "page-3",
            "transactions": [{"id": "T2", "created-application-index": 2}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/transactions"))
        .and(query_param("next", "page-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current-round": 21600100u64,
            "next-token": "page-4",
            "transactions": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/transactions"))
        .and(query_param("note-prefix", B64.encode(note)))
        .and(query_param("tx-type", "appl"))
        .and(query_param("min-round", "21540981"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current-round": 21600100u64,
            "next-token": "page-2",
            "transactions": [{"id": "T1", "created-application-index": 1}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let records = indexer(&server.uri())?
        .search_transactions(&TxnQuery::creations(note, 21_540_981))
        .await?;
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["T1", "T2"]);
    Ok(())
}

#[tokio::test]
async fn test_account_balance() -> Result<()> {
    let server = MockServer::start().await;
    let funded = Address([1u8; 32]).to_string();
    let unknown = Address([2u8; 32]).to_string();
    Mock::given(method("GET"))
        .and(path(format!("/v2/accounts/{funded}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "account": {"address": funded, "amount": 12500000u64},
            "current-round": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/accounts/{unknown}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "no accounts found"})))
        .mount(&server)
        .await;

    let client = indexer(&server.uri())?;
    assert_eq!(client.account_balance(&funded).await?, 12_500_000);
    assert_eq!(client.account_balance(&unknown).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_market_listing_over_http() -> Result<()> {
    let idx = MockServer::start().await;
    let owner = Address([5u8; 32]);
    Mock::given(method("GET"))
        .and(path("/v2/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current-round": 21600100u64,
            "transactions": [
                {"id": "C1", "created-application-index": 42},
                {"id": "C2", "created-application-index": 43}
            ]
        })))
        .mount(&idx)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/applications/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(application_json(42, owner, false)))
        .mount(&idx)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/applications/43"))
        .respond_with(ResponseTemplate::new(200).set_body_json(application_json(43, owner, true)))
        .mount(&idx)
        .await;

    let market = MarketClient::new(
        Arc::new(algod(DEAD_URL, DEAD_URL)?),
        Arc::new(indexer(&idx.uri())?),
        TealSource::Inline(String::new()),
        TealSource::Inline(String::new()),
    );
    let items = market.get_user_items(&owner.to_string()).await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].app_id, Some(42));
    assert_eq!(items[0].name, "Vase");
    assert_eq!(items[0].curr_price, 2_000_000);
    assert_eq!(items[0].curr_owner, owner.to_string());
    Ok(())
}
