//! Pool aggregation.
//!
//! Combines a decoded pool record, live balances, mint data and registry
//! metadata into the served `Pool`, and derives positions from it.

use crate::entities::{Pool, PoolToken, Position, TokenMetadata};
use crate::error::DomainError;
use crate::metrics::{Apr, estimate_tvl, pool_share, position_values};
use crate::token::TokenAmount;
use crate::value_objects::PoolPrices;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Live state of one pool side, as read from chain and registry.
#[derive(Debug, Clone, PartialEq)]
pub struct SideSnapshot {
    pub mint: String,
    pub reserve: TokenAmount,
    /// Decimals from the on-chain mint account.
    pub decimals: u8,
    pub metadata: TokenMetadata,
}

impl SideSnapshot {
    fn into_pool_token(self) -> PoolToken {
        PoolToken {
            mint_address: self.mint,
            symbol: self.metadata.symbol,
            name: self.metadata.name,
            decimals: self.decimals,
            reserve_amount: self.reserve,
            logo_uri: self.metadata.logo_uri,
        }
    }
}

/// Everything needed to build a `Pool`.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSnapshot {
    pub pool_id: String,
    pub lp_token_mint: String,
    pub reserve_account_a: String,
    pub reserve_account_b: String,
    pub side_a: SideSnapshot,
    pub side_b: SideSnapshot,
    pub total_supply: TokenAmount,
    pub swap_fee: Decimal,
}

/// Builds a fully populated `Pool` with derived TVL.
///
/// Deterministic: the same snapshot, prices, APR and timestamp always yield
/// the same pool.
pub fn aggregate_pool(
    snapshot: PoolSnapshot,
    prices: &PoolPrices,
    apr: Apr,
    now: DateTime<Utc>,
) -> Result<Pool, DomainError> {
    if snapshot.side_a.mint == snapshot.side_b.mint {
        return Err(DomainError::IdenticalMints {
            pool_id: snapshot.pool_id,
            mint: snapshot.side_a.mint,
        });
    }

    let token_a = snapshot.side_a.into_pool_token();
    let token_b = snapshot.side_b.into_pool_token();
    let tvl = estimate_tvl(&token_a, &token_b, prices);

    Ok(Pool {
        pool_id: snapshot.pool_id,
        lp_token_mint: snapshot.lp_token_mint,
        reserve_account_a: snapshot.reserve_account_a,
        reserve_account_b: snapshot.reserve_account_b,
        token_a,
        token_b,
        total_supply: snapshot.total_supply,
        swap_fee: snapshot.swap_fee,
        tvl,
        apr,
        last_updated: now,
    })
}

/// Derives a wallet's position from its LP balance in `pool`.
pub fn derive_position(pool: &Pool, lp_balance: TokenAmount) -> Position {
    let (value_a, value_b) = position_values(
        pool.token_a.reserve_amount,
        pool.token_b.reserve_amount,
        lp_balance,
        pool.total_supply,
    );

    Position {
        pool_id: pool.pool_id.clone(),
        lp_token_mint: pool.lp_token_mint.clone(),
        token_a_symbol: pool.token_a.symbol.clone(),
        token_b_symbol: pool.token_b.symbol.clone(),
        lp_token_balance: lp_balance,
        pool_share: pool_share(lp_balance, pool.total_supply),
        value_a,
        value_b,
    }
}
