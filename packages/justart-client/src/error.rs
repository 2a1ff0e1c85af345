//! Error types for the marketplace client.

use justart_types::ProtocolError;
use std::fmt;

/// Client error type.
///
/// `Signing`, `Submission` and `Timeout` are transient from the caller's
/// point of view; everything else signals a caller or protocol bug.
#[derive(Debug)]
pub enum Error {
    /// Malformed bytes from the ledger.
    Decode(String),
    /// Numeric input outside the wire range.
    Range(String),
    /// Operation on an item or group missing required identity.
    InvalidState(String),
    /// External signer declined or failed.
    Signing(String),
    /// Ledger or contract rejected a signed transaction. Carries the reason verbatim.
    Submission(String),
    /// Confirmation not observed within the round bound. Rebuild before retrying.
    Timeout { tx_id: String, rounds: u64 },
    /// Transport-level RPC failure.
    Rpc(String),
    /// Configuration error.
    Config(String),
    /// Transaction serialization failure.
    Encode(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Decode(msg) => write!(f, "decode error: {msg}"),
            Error::Range(msg) => write!(f, "range error: {msg}"),
            Error::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            Error::Signing(msg) => write!(f, "signing failed: {msg}"),
            Error::Submission(msg) => write!(f, "submission rejected: {msg}"),
            Error::Timeout { tx_id, rounds } => {
                write!(f, "transaction {tx_id} not confirmed after {rounds} rounds")
            }
            Error::Rpc(msg) => write!(f, "rpc error: {msg}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Encode(msg) => write!(f, "encode error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Decode(msg) => Error::Decode(msg),
            ProtocolError::Range(msg) => Error::Range(msg),
        }
    }
}

impl Error {
    /// Whether the caller may retry (after rebuilding, for timeouts).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Signing(_) | Error::Submission(_) | Error::Timeout { .. } | Error::Rpc(_)
        )
    }
}
