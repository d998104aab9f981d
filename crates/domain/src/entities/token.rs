use crate::token::TokenAmount;
use serde::{Deserialize, Serialize};

/// Symbol used when a mint is missing from the token registry.
pub const UNKNOWN_SYMBOL: &str = "Unknown";

/// Human-readable description of a mint, as published by a token registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: Option<u8>,
    pub logo_uri: Option<String>,
}

impl TokenMetadata {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals: Some(decimals),
            logo_uri: None,
        }
    }

    /// Record returned for mints the registry does not know.
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_SYMBOL.to_string(),
            symbol: UNKNOWN_SYMBOL.to_string(),
            decimals: None,
            logo_uri: None,
        }
    }
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self::unknown()
    }
}

/// One side of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolToken {
    pub mint_address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub reserve_amount: TokenAmount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
}
