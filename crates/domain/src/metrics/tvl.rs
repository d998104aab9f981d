use crate::entities::token::PoolToken;
use crate::value_objects::{Amount, PoolPrices, PriceSource};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Total value locked in USD, tagged with the weakest price source used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TvlEstimate {
    pub usd: Decimal,
    pub price_source: PriceSource,
}

/// Sums both reserves in human units times their unit price.
///
/// Returns `None` when either side has no price or its reserve cannot be
/// represented, rather than reporting a partial figure.
pub fn estimate_tvl(
    token_a: &PoolToken,
    token_b: &PoolToken,
    prices: &PoolPrices,
) -> Option<TvlEstimate> {
    let price_a = prices.a?;
    let price_b = prices.b?;

    let human_a = Amount::new(token_a.reserve_amount, token_a.decimals).to_decimal()?;
    let human_b = Amount::new(token_b.reserve_amount, token_b.decimals).to_decimal()?;

    let value_a = human_a.checked_mul(price_a.usd)?;
    let value_b = human_b.checked_mul(price_b.usd)?;
    let usd = value_a.checked_add(value_b)?.round_dp(2);

    let price_source = if price_a.source == PriceSource::Placeholder
        || price_b.source == PriceSource::Placeholder
    {
        PriceSource::Placeholder
    } else {
        PriceSource::Oracle
    };

    Some(TvlEstimate { usd, price_source })
}
