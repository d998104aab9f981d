use thiserror::Error;

/// Token registry load failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Request failed or returned a non-success status.
    #[error("token list request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Body was not a recognised token list.
    #[error("invalid token list: {0}")]
    Parse(String),
}

/// Price lookup failures.
#[derive(Debug, Error)]
pub enum PriceError {
    /// Request failed or returned a non-success status.
    #[error("price request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Body did not match the expected shape.
    #[error("invalid price response: {0}")]
    Parse(String),
    /// A configured price could not be parsed.
    #[error("invalid price entry '{0}'")]
    InvalidEntry(String),
}

/// Cache backend failures. Callers treat these as misses.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Store could not be reached or rejected the command.
    #[error("cache backend error: {0}")]
    Backend(String),
    /// Value could not be encoded or decoded.
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        Self::Backend(e.to_string())
    }
}
