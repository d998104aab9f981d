//! Unit prices for pool tokens.

use crate::error::PriceError;
use async_trait::async_trait;
use meteora_lp_domain::{PoolPrices, PriceQuote};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Source of USD prices per mint.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Prices for both sides of a pool. A side without a price is `None`.
    async fn pool_prices(&self, mint_a: &str, mint_b: &str) -> Result<PoolPrices, PriceError>;
}

/// Fixed prices from configuration, reported as placeholders.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceOracle {
    prices: HashMap<String, Decimal>,
}

impl StaticPriceOracle {
    /// Creates an oracle from a mint to price map.
    pub fn new(prices: HashMap<String, Decimal>) -> Self {
        Self { prices }
    }

    /// Parses `mint=price,mint=price`. Blank input yields an empty oracle.
    pub fn parse(spec: &str) -> Result<Self, PriceError> {
        let mut prices = HashMap::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (mint, price) = entry
                .split_once('=')
                .ok_or_else(|| PriceError::InvalidEntry(entry.to_string()))?;
            let price = Decimal::from_str(price.trim())
                .ok()
                .filter(|p| !p.is_sign_negative())
                .ok_or_else(|| PriceError::InvalidEntry(entry.to_string()))?;
            prices.insert(mint.trim().to_string(), price);
        }
        Ok(Self { prices })
    }

    /// Placeholder quote for `mint`.
    pub fn quote(&self, mint: &str) -> Option<PriceQuote> {
        self.prices.get(mint).copied().map(PriceQuote::placeholder)
    }

    /// Whether any prices are configured.
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

#[async_trait]
impl PriceOracle for StaticPriceOracle {
    async fn pool_prices(&self, mint_a: &str, mint_b: &str) -> Result<PoolPrices, PriceError> {
        Ok(PoolPrices {
            a: self.quote(mint_a),
            b: self.quote(mint_b),
        })
    }
}

/// Price API client (`GET <url>?ids=a,b`).
///
/// Mints the API does not price fall back to configured placeholders.
#[derive(Debug, Clone)]
pub struct HttpPriceOracle {
    client: reqwest::Client,
    url: String,
    fallback: StaticPriceOracle,
}

impl HttpPriceOracle {
    /// Creates a client for `url`.
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        fallback: StaticPriceOracle,
    ) -> Result<Self, PriceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            fallback,
        })
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn pool_prices(&self, mint_a: &str, mint_b: &str) -> Result<PoolPrices, PriceError> {
        let ids = format!("{mint_a},{mint_b}");
        let body: Value = self
            .client
            .get(&self.url)
            .query(&[("ids", ids.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let quoted = parse_price_response(&body)?;
        debug!(mint_a, mint_b, priced = quoted.len(), "Fetched prices");

        let pick = |mint: &str| {
            quoted
                .get(mint)
                .copied()
                .map(PriceQuote::oracle)
                .or_else(|| self.fallback.quote(mint))
        };
        Ok(PoolPrices {
            a: pick(mint_a),
            b: pick(mint_b),
        })
    }
}

/// Extracts `{ data: { <mint>: { price } } }`. Prices may be strings or numbers;
/// unparseable or missing entries are left out.
pub fn parse_price_response(body: &Value) -> Result<HashMap<String, Decimal>, PriceError> {
    let data = body
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| PriceError::Parse("missing data object".to_string()))?;

    Ok(data
        .iter()
        .filter_map(|(mint, entry)| {
            let price = match entry.get("price")? {
                Value::String(s) => Decimal::from_str(s).ok()?,
                Value::Number(n) => Decimal::from_str(&n.to_string())
                    .or_else(|_| Decimal::from_scientific(&n.to_string()))
                    .ok()?,
                _ => return None,
            };
            Some((mint.clone(), price))
        })
        .collect())
}
