//! Client configuration.

use serde::Deserialize;

/// Configuration for the marketplace client.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::algod_url")]
    pub algod_url: String,

    #[serde(default = "defaults::fallback_algod_url")]
    pub fallback_algod_url: String,

    #[serde(default)]
    pub algod_token: String,

    #[serde(default = "defaults::indexer_url")]
    pub indexer_url: String,

    #[serde(default = "defaults::fallback_indexer_url")]
    pub fallback_indexer_url: String,

    #[serde(default)]
    pub indexer_token: String,

    /// Discovery note attached to every item creation.
    #[serde(default = "defaults::market_note")]
    pub market_note: String,

    /// Lowest round searched for item creations.
    #[serde(default = "defaults::min_round")]
    pub min_round: u64,

    #[serde(default = "defaults::confirmation_rounds")]
    pub confirmation_rounds: u64,

    #[serde(default = "defaults::approval_program_path")]
    pub approval_program_path: String,

    #[serde(default = "defaults::clear_program_path")]
    pub clear_program_path: String,

    #[serde(default = "defaults::session_path")]
    pub session_path: String,

    /// Item lookups in flight at once while listing.
    #[serde(default = "defaults::query_concurrency")]
    pub query_concurrency: usize,

    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algod_url: defaults::algod_url(),
            fallback_algod_url: defaults::fallback_algod_url(),
            algod_token: String::new(),
            indexer_url: defaults::indexer_url(),
            fallback_indexer_url: defaults::fallback_indexer_url(),
            indexer_token: String::new(),
            market_note: defaults::market_note(),
            min_round: defaults::min_round(),
            confirmation_rounds: defaults::confirmation_rounds(),
            approval_program_path: defaults::approval_program_path(),
            clear_program_path: defaults::clear_program_path(),
            session_path: defaults::session_path(),
            query_concurrency: defaults::query_concurrency(),
            request_timeout_secs: defaults::request_timeout_secs(),
        }
    }
}

mod defaults {
    fn network() -> String {
        std::env::var("JUSTART_NETWORK").unwrap_or_else(|_| "testnet".into())
    }

    pub fn algod_url() -> String {
        if network().contains("mainnet") {
            "https://mainnet-api.algonode.cloud".into()
        } else {
            "https://testnet-api.algonode.cloud".into()
        }
    }

    pub fn fallback_algod_url() -> String {
        if network().contains("mainnet") {
            "https://mainnet-api.4160.nodely.dev".into()
        } else {
            "https://testnet-api.4160.nodely.dev".into()
        }
    }

    pub fn indexer_url() -> String {
        if network().contains("mainnet") {
            "https://mainnet-idx.algonode.cloud".into()
        } else {
            "https://testnet-idx.algonode.cloud".into()
        }
    }

    pub fn fallback_indexer_url() -> String {
        if network().contains("mainnet") {
            "https://mainnet-idx.4160.nodely.dev".into()
        } else {
            "https://testnet-idx.4160.nodely.dev".into()
        }
    }

    pub fn market_note() -> String {
        "justArt-market:uv0001".into()
    }

    pub fn min_round() -> u64 {
        21_540_981
    }

    pub fn confirmation_rounds() -> u64 {
        crate::submitter::DEFAULT_CONFIRMATION_ROUNDS
    }

    pub fn approval_program_path() -> String {
        "./contracts/marketplace_approval.teal".into()
    }

    pub fn clear_program_path() -> String {
        "./contracts/marketplace_clear.teal".into()
    }

    pub fn session_path() -> String {
        "./.justart/session.json".into()
    }

    pub fn query_concurrency() -> usize {
        8
    }

    /// Above algod's wait-for-block long-poll.
    pub fn request_timeout_secs() -> u64 {
        75
    }
}
