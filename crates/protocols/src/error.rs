use crate::layout::LayoutError;
use thiserror::Error;

/// Errors from on-chain reads.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// RPC call failed after all retries.
    #[error("upstream unavailable: {0}")]
    Upstream(String),
    /// Requested account does not exist.
    #[error("account not found: {0}")]
    AccountNotFound(String),
    /// Account exists but does not match the expected layout.
    #[error("decode anomaly for {address}: {source}")]
    Decode {
        address: String,
        #[source]
        source: LayoutError,
    },
    /// Input could not be parsed as an address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

impl SourceError {
    /// Whether the failure is worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }
}
