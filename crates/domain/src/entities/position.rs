use crate::token::TokenAmount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A wallet's stake in one pool, derived from its LP balance.
///
/// The owning wallet is not stored on the entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub pool_id: String,
    pub lp_token_mint: String,
    pub token_a_symbol: String,
    pub token_b_symbol: String,
    pub lp_token_balance: TokenAmount,
    /// Fraction of the pool owned, in `[0, 1]`.
    pub pool_share: Decimal,
    pub value_a: TokenAmount,
    pub value_b: TokenAmount,
}
