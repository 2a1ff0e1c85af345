/// Protocol-level decode/encode error. Never swallowed by the decoders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Malformed bytes from the ledger (bad UTF-8, wrong length, bad checksum).
    Decode(String),
    /// Numeric input that does not fit the wire type.
    Range(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
            Self::Range(msg) => write!(f, "range error: {msg}"),
        }
    }
}

impl std::error::Error for ProtocolError {}
