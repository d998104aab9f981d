use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where a unit price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriceSource {
    /// Fetched from a live price feed.
    Oracle,
    /// Configured stand-in value; figures derived from it are not production accurate.
    Placeholder,
}

/// USD price of one whole token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub usd: Decimal,
    pub source: PriceSource,
}

impl PriceQuote {
    pub fn oracle(usd: Decimal) -> Self {
        Self {
            usd,
            source: PriceSource::Oracle,
        }
    }

    pub fn placeholder(usd: Decimal) -> Self {
        Self {
            usd,
            source: PriceSource::Placeholder,
        }
    }
}

/// Prices for both sides of a pool. A missing side means "no price known".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolPrices {
    pub a: Option<PriceQuote>,
    pub b: Option<PriceQuote>,
}
