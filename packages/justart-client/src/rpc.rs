//! HTTP ledger clients with primary → fallback failover and a circuit breaker.
//!
//! Reads fail over to the fallback endpoint. Raw submission only goes to the
//! active endpoint: a failed submit is reported, never silently resent.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

use justart_types::{AppCallRecord, ApplicationRecord};

use crate::ledger::{Indexer, Ledger, PendingTxn, TxnQuery};
use crate::txn::{SuggestedParams, TransactionParamsResponse};
use crate::Error;

const CIRCUIT_BREAKER_THRESHOLD: u64 = 5;
/// How long (ms) before a tripped breaker retries the primary.
const CIRCUIT_BREAKER_WINDOW_MS: u64 = 30_000;

const ALGOD_TOKEN_HEADER: &str = "X-Algo-API-Token";
const INDEXER_TOKEN_HEADER: &str = "X-Indexer-API-Token";

struct CircuitState {
    failures: u64,
    last_failure_ms: u64,
    open: bool,
}

/// One node URL plus its API token (empty for public nodes).
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub url: String,
    pub token: String,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }
}

/// Failover pair shared by the node and indexer clients.
struct Failover {
    http: reqwest::Client,
    primary: Endpoint,
    fallback: Endpoint,
    token_header: &'static str,
    circuit: Mutex<CircuitState>,
    total_failovers: AtomicU64,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl Failover {
    fn new(
        primary: Endpoint,
        fallback: Endpoint,
        token_header: &'static str,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {e}")))?;
        info!(
            primary = %primary.url,
            fallback = %fallback.url,
            "Ledger client initialized with failover"
        );
        Ok(Self {
            http,
            primary,
            fallback,
            token_header,
            circuit: Mutex::new(CircuitState {
                failures: 0,
                last_failure_ms: 0,
                open: false,
            }),
            total_failovers: AtomicU64::new(0),
        })
    }

    fn request(&self, endpoint: &Endpoint, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{path}", endpoint.url));
        if endpoint.token.is_empty() {
            builder
        } else {
            builder.header(self.token_header, &endpoint.token)
        }
    }

    /// Active endpoint and whether it is the primary.
    fn active(&self) -> (&Endpoint, bool) {
        if self.is_circuit_open() {
            (&self.fallback, false)
        } else {
            (&self.primary, true)
        }
    }

    /// Send via the active endpoint; on transport failure or 5xx, via the other.
    async fn send<F>(&self, what: &str, build: F) -> Result<Response, Error>
    where
        F: Fn(&Endpoint) -> RequestBuilder,
    {
        let (first, is_primary) = self.active();
        let reason = match build(first).send().await {
            Ok(resp) if !resp.status().is_server_error() => {
                if is_primary {
                    self.record_success();
                }
                return Ok(resp);
            }
            Ok(resp) => format!("HTTP {}", resp.status()),
            Err(e) => e.to_string(),
        };
        if is_primary {
            self.record_failure();
        }
        let second = if is_primary { &self.fallback } else { &self.primary };
        warn!(error = %reason, next = %second.url, "{what} failed, trying other endpoint");
        let resp = build(second).send().await.map_err(|e2| {
            Error::Rpc(format!("{what} failed on both endpoints: first={reason}, second={e2}"))
        })?;
        if resp.status().is_server_error() {
            return Err(Error::Rpc(format!(
                "{what} failed on both endpoints: first={reason}, second=HTTP {}",
                resp.status()
            )));
        }
        Ok(resp)
    }

    /// Send via the active endpoint only.
    async fn send_once<F>(&self, what: &str, build: F) -> Result<Response, Error>
    where
        F: Fn(&Endpoint) -> RequestBuilder,
    {
        let (endpoint, is_primary) = self.active();
        match build(endpoint).send().await {
            Ok(resp) => {
                if is_primary && !resp.status().is_server_error() {
                    self.record_success();
                }
                Ok(resp)
            }
            Err(e) => {
                if is_primary {
                    self.record_failure();
                }
                Err(Error::Rpc(format!("{what} failed: {e}")))
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, Error> {
        let resp = self
            .send(path, |ep| self.request(ep, Method::GET, path).query(query))
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(path, resp).await.map(Some)
    }

    fn record_success(&self) {
        let mut circuit = self.circuit.lock().unwrap_or_else(|e| e.into_inner());
        if circuit.failures > 0 {
            info!(primary = %self.primary.url, "Primary endpoint recovered");
            circuit.failures = 0;
            circuit.open = false;
        }
    }

    fn record_failure(&self) {
        let mut circuit = self.circuit.lock().unwrap_or_else(|e| e.into_inner());
        circuit.failures += 1;
        circuit.last_failure_ms = now_ms();
        if circuit.failures >= CIRCUIT_BREAKER_THRESHOLD && !circuit.open {
            circuit.open = true;
            self.total_failovers.fetch_add(1, Ordering::Relaxed);
            warn!(
                failures = circuit.failures,
                fallback = %self.fallback.url,
                "Circuit breaker opened, routing to fallback"
            );
        }
    }

    fn is_circuit_open(&self) -> bool {
        let mut circuit = self.circuit.lock().unwrap_or_else(|e| e.into_inner());
        if !circuit.open {
            return false;
        }
        // Half-open: retry primary after window
        if now_ms().saturating_sub(circuit.last_failure_ms) > CIRCUIT_BREAKER_WINDOW_MS {
            circuit.open = false;
            circuit.failures = 0;
            info!(primary = %self.primary.url, "Circuit breaker half-open, retrying primary");
            return false;
        }
        true
    }

    fn active_url(&self) -> &str {
        &self.active().0.url
    }
}

async fn error_message(resp: Response) -> String {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) if !body.message.is_empty() => body.message,
        _ if !text.is_empty() => text,
        _ => format!("HTTP {status}"),
    }
}

async fn read_json<T: DeserializeOwned>(what: &str, resp: Response) -> Result<T, Error> {
    if !resp.status().is_success() {
        let status = resp.status();
        return Err(Error::Rpc(format!("{what}: HTTP {status}: {}", error_message(resp).await)));
    }
    resp.json::<T>()
        .await
        .map_err(|e| Error::Decode(format!("{what}: invalid response body: {e}")))
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// --- Node (algod) ---

#[derive(Deserialize)]
struct NodeStatus {
    #[serde(rename = "last-round")]
    last_round: u64,
}

#[derive(Deserialize)]
struct CompileResponse {
    result: String,
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(rename = "txId")]
    tx_id: String,
}

/// algod REST client.
pub struct AlgodClient {
    inner: Failover,
}

impl AlgodClient {
    pub fn new(primary: Endpoint, fallback: Endpoint, timeout: Duration) -> Result<Self, Error> {
        Ok(Self {
            inner: Failover::new(primary, fallback, ALGOD_TOKEN_HEADER, timeout)?,
        })
    }

    pub fn active_url(&self) -> &str {
        self.inner.active_url()
    }

    pub fn failover_count(&self) -> u64 {
        self.inner.total_failovers.load(Ordering::Relaxed)
    }

    async fn get_required<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.inner
            .get_json(path, &[])
            .await?
            .ok_or_else(|| Error::Rpc(format!("{path}: not found")))
    }
}

#[async_trait]
impl Ledger for AlgodClient {
    async fn suggested_params(&self) -> Result<SuggestedParams, Error> {
        let resp: TransactionParamsResponse = self.get_required("/v2/transactions/params").await?;
        resp.try_into()
    }

    async fn compile(&self, source: &str) -> Result<Vec<u8>, Error> {
        let path = "/v2/teal/compile";
        let resp = self
            .inner
            .send(path, |ep| {
                self.inner
                    .request(ep, Method::POST, path)
                    .header(reqwest::header::CONTENT_TYPE, "application/x-binary")
                    .body(source.to_owned())
            })
            .await?;
        if resp.status().is_client_error() {
            return Err(Error::Config(format!("TEAL compile failed: {}", error_message(resp).await)));
        }
        let compiled: CompileResponse = read_json(path, resp).await?;
        B64.decode(&compiled.result)
            .map_err(|e| Error::Decode(format!("compiled program is not base64: {e}")))
    }

    async fn send_raw(&self, signed: &[u8]) -> Result<String, Error> {
        let path = "/v2/transactions";
        let resp = self
            .inner
            .send_once(path, |ep| {
                self.inner
                    .request(ep, Method::POST, path)
                    .header(reqwest::header::CONTENT_TYPE, "application/x-binary")
                    .body(signed.to_vec())
            })
            .await?;
        if resp.status().is_client_error() {
            return Err(Error::Submission(error_message(resp).await));
        }
        let sent: SendResponse = read_json(path, resp).await?;
        debug!(tx_id = %sent.tx_id, "Raw transaction accepted");
        Ok(sent.tx_id)
    }

    async fn last_round(&self) -> Result<u64, Error> {
        let status: NodeStatus = self.get_required("/v2/status").await?;
        Ok(status.last_round)
    }

    async fn wait_for_block_after(&self, round: u64) -> Result<u64, Error> {
        let path = format!("/v2/status/wait-for-block-after/{round}");
        let status: NodeStatus = self.get_required(&path).await?;
        Ok(status.last_round)
    }

    async fn pending_txn(&self, tx_id: &str) -> Result<PendingTxn, Error> {
        self.get_required(&format!("/v2/transactions/pending/{tx_id}"))
            .await
    }
}

// --- Indexer ---

#[derive(Deserialize)]
struct ApplicationResponse {
    application: ApplicationRecord,
}

#[derive(Deserialize)]
struct TransactionsPage {
    #[serde(default)]
    transactions: Vec<AppCallRecord>,
    #[serde(rename = "next-token", default)]
    next_token: Option<String>,
}

#[derive(Deserialize)]
struct AccountResponse {
    account: AccountInfo,
}

#[derive(Deserialize)]
struct AccountInfo {
    #[serde(default)]
    amount: u64,
}

/// Indexer REST client.
pub struct IndexerClient {
    inner: Failover,
}

impl IndexerClient {
    pub fn new(primary: Endpoint, fallback: Endpoint, timeout: Duration) -> Result<Self, Error> {
        Ok(Self {
            inner: Failover::new(primary, fallback, INDEXER_TOKEN_HEADER, timeout)?,
        })
    }

    pub fn active_url(&self) -> &str {
        self.inner.active_url()
    }
}

fn query_params(query: &TxnQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(prefix) = &query.note_prefix {
        params.push(("note-prefix", B64.encode(prefix)));
    }
    if let Some(app_id) = query.application_id {
        params.push(("application-id", app_id.to_string()));
    }
    if let Some(tx_type) = query.tx_type {
        params.push(("tx-type", tx_type.to_string()));
    }
    if let Some(min_round) = query.min_round {
        params.push(("min-round", min_round.to_string()));
    }
    params
}

#[async_trait]
impl Indexer for IndexerClient {
    async fn lookup_application(&self, app_id: u64) -> Result<Option<ApplicationRecord>, Error> {
        let resp: Option<ApplicationResponse> = self
            .inner
            .get_json(
                &format!("/v2/applications/{app_id}"),
                &[("include-all", "true".to_string())],
            )
            .await?;
        Ok(resp.map(|r| r.application))
    }

    async fn search_transactions(&self, query: &TxnQuery) -> Result<Vec<AppCallRecord>, Error> {
        let base = query_params(query);
        let mut out = Vec::new();
        let mut next: Option<String> = None;
        loop {
            let mut params = base.clone();
            if let Some(token) = &next {
                params.push(("next", token.clone()));
            }
            let page: TransactionsPage = self
                .inner
                .get_json("/v2/transactions", &params)
                .await?
                .ok_or_else(|| Error::Rpc("/v2/transactions: not found".into()))?;
            let empty = page.transactions.is_empty();
            out.extend(page.transactions);
            match page.next_token {
                Some(token) if !empty => next = Some(token),
                _ => break,
            }
        }
        debug!(count = out.len(), "Indexer search complete");
        Ok(out)
    }

    async fn account_balance(&self, address: &str) -> Result<u64, Error> {
        let resp: Option<AccountResponse> = self
            .inner
            .get_json(&format!("/v2/accounts/{address}"), &[])
            .await?;
        // Unknown accounts hold nothing.
        Ok(resp.map(|r| r.account.amount).unwrap_or(0))
    }
}
