use crate::entities::token::PoolToken;
use crate::metrics::{Apr, TvlEstimate};
use crate::token::TokenAmount;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A Meteora pool as served to clients.
///
/// `tvl` and `apr` are recomputed on every aggregation pass; the chain stays
/// the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub pool_id: String,
    pub lp_token_mint: String,
    pub reserve_account_a: String,
    pub reserve_account_b: String,
    pub token_a: PoolToken,
    pub token_b: PoolToken,
    pub total_supply: TokenAmount,
    pub swap_fee: Decimal,
    pub tvl: Option<TvlEstimate>,
    pub apr: Apr,
    pub last_updated: DateTime<Utc>,
}
