//! Token metadata registry.
//!
//! A snapshot of a Solana token list, loaded once at start-up. Lookups are
//! exact, case-sensitive matches on the mint address.

use crate::error::RegistryError;
use meteora_lp_domain::TokenMetadata;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// Solana mainnet chain ID in token lists.
pub const MAINNET_CHAIN_ID: u64 = 101;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenListEntry {
    address: String,
    #[serde(default)]
    chain_id: Option<u64>,
    symbol: String,
    name: String,
    #[serde(default)]
    decimals: Option<u8>,
    #[serde(default, rename = "logoURI")]
    logo_uri: Option<String>,
}

/// Mint address to metadata map.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: HashMap<String, TokenMetadata>,
}

impl TokenRegistry {
    /// Creates an empty registry; every lookup resolves to the unknown record.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a registry from explicit entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, TokenMetadata)>) -> Self {
        Self {
            tokens: entries.into_iter().collect(),
        }
    }

    /// Parses a token list body.
    ///
    /// Accepts `{ "tokens": [...] }` or a bare array. Entries tagged with a
    /// chain other than mainnet are dropped; untagged entries are kept.
    pub fn from_json(body: &str) -> Result<Self, RegistryError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| RegistryError::Parse(e.to_string()))?;

        let list = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("tokens") {
                Some(Value::Array(items)) => items,
                _ => return Err(RegistryError::Parse("missing tokens array".to_string())),
            },
            _ => return Err(RegistryError::Parse("expected object or array".to_string())),
        };

        let mut tokens = HashMap::with_capacity(list.len());
        let mut skipped = 0usize;
        for item in list {
            let entry: TokenListEntry = match serde_json::from_value(item) {
                Ok(entry) => entry,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };
            if entry.chain_id.is_some_and(|id| id != MAINNET_CHAIN_ID) {
                continue;
            }
            tokens.insert(
                entry.address,
                TokenMetadata {
                    name: entry.name,
                    symbol: entry.symbol,
                    decimals: entry.decimals,
                    logo_uri: entry.logo_uri,
                },
            );
        }

        if skipped > 0 {
            warn!(skipped, "Ignored malformed token list entries");
        }
        Ok(Self { tokens })
    }

    /// Fetches and parses the token list at `url`.
    pub async fn load(url: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let body = client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let registry = Self::from_json(&body)?;
        info!(url, tokens = registry.len(), "Loaded token registry");
        Ok(registry)
    }

    /// Like [`load`](Self::load), but starts empty when loading fails.
    pub async fn load_or_empty(url: &str, timeout: Duration) -> Self {
        match Self::load(url, timeout).await {
            Ok(registry) => registry,
            Err(e) => {
                warn!(url, error = %e, "Token registry unavailable, starting empty");
                Self::empty()
            }
        }
    }

    /// Metadata for `mint`, or the unknown record.
    pub fn resolve(&self, mint: &str) -> TokenMetadata {
        self.tokens
            .get(mint)
            .cloned()
            .unwrap_or_else(TokenMetadata::unknown)
    }

    /// Number of known mints.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no mints are known.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
