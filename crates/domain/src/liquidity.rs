//! Add/remove liquidity quotes.
//!
//! Nothing is signed or submitted; quotes describe what the pool would do at
//! its current reserves.

use crate::entities::Pool;
use crate::error::DomainError;
use crate::metrics::pool_share;
use crate::token::TokenAmount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Result of depositing both tokens at current reserves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLiquidityQuote {
    pub pool_id: String,
    pub amount_a: TokenAmount,
    pub amount_b: TokenAmount,
    pub estimated_lp_tokens: TokenAmount,
    /// Share of the pool the minted LP tokens would represent afterwards.
    pub resulting_pool_share: Decimal,
    pub simulated: bool,
}

/// Result of burning LP tokens at current reserves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLiquidityQuote {
    pub pool_id: String,
    pub lp_token_amount: TokenAmount,
    pub token_a_amount: TokenAmount,
    pub token_b_amount: TokenAmount,
    pub simulated: bool,
}

/// LP tokens minted for a deposit: the smaller of the two proportional claims.
pub fn quote_add_liquidity(
    pool: &Pool,
    amount_a: TokenAmount,
    amount_b: TokenAmount,
) -> Result<AddLiquidityQuote, DomainError> {
    if amount_a.is_zero() {
        return Err(DomainError::ZeroAmount { field: "amountA" });
    }
    if amount_b.is_zero() {
        return Err(DomainError::ZeroAmount { field: "amountB" });
    }

    let supply = pool.total_supply;
    let reserve_a = pool.token_a.reserve_amount;
    let reserve_b = pool.token_b.reserve_amount;

    let estimated_lp_tokens = if supply.is_zero() || reserve_a.is_zero() || reserve_b.is_zero() {
        TokenAmount::zero()
    } else {
        let via_a = amount_a.mul_div_floor(supply, reserve_a);
        let via_b = amount_b.mul_div_floor(supply, reserve_b);
        via_a.min(via_b)
    };

    let new_supply = TokenAmount(supply.0.saturating_add(estimated_lp_tokens.0));

    Ok(AddLiquidityQuote {
        pool_id: pool.pool_id.clone(),
        amount_a,
        amount_b,
        estimated_lp_tokens,
        resulting_pool_share: pool_share(estimated_lp_tokens, new_supply),
        simulated: true,
    })
}

/// Tokens returned for burning `lp_amount`, checked against optional minimums.
pub fn quote_remove_liquidity(
    pool: &Pool,
    lp_amount: TokenAmount,
    min_a: Option<TokenAmount>,
    min_b: Option<TokenAmount>,
) -> Result<RemoveLiquidityQuote, DomainError> {
    if lp_amount.is_zero() {
        return Err(DomainError::ZeroAmount { field: "lpTokenAmount" });
    }
    if lp_amount > pool.total_supply {
        return Err(DomainError::ExceedsSupply {
            requested: lp_amount.to_string(),
            supply: pool.total_supply.to_string(),
        });
    }

    let token_a_amount = pool
        .token_a
        .reserve_amount
        .mul_div_floor(lp_amount, pool.total_supply);
    let token_b_amount = pool
        .token_b
        .reserve_amount
        .mul_div_floor(lp_amount, pool.total_supply);

    check_minimum("minAmountA", token_a_amount, min_a)?;
    check_minimum("minAmountB", token_b_amount, min_b)?;

    Ok(RemoveLiquidityQuote {
        pool_id: pool.pool_id.clone(),
        lp_token_amount: lp_amount,
        token_a_amount,
        token_b_amount,
        simulated: true,
    })
}

fn check_minimum(
    field: &'static str,
    actual: TokenAmount,
    minimum: Option<TokenAmount>,
) -> Result<(), DomainError> {
    match minimum {
        Some(min) if actual < min => Err(DomainError::SlippageExceeded {
            field,
            minimum: min.to_string(),
            actual: actual.to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PoolToken;
    use crate::metrics::Apr;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn pool(reserve_a: u64, reserve_b: u64, supply: u64) -> Pool {
        let token = |mint: &str, reserve: u64, decimals: u8| PoolToken {
            mint_address: mint.to_string(),
            symbol: mint.to_string(),
            name: mint.to_string(),
            decimals,
            reserve_amount: TokenAmount::from(reserve),
            logo_uri: None,
        };
        Pool {
            pool_id: "pool".to_string(),
            lp_token_mint: "lp".to_string(),
            reserve_account_a: "va".to_string(),
            reserve_account_b: "vb".to_string(),
            token_a: token("A", reserve_a, 6),
            token_b: token("B", reserve_b, 9),
            total_supply: TokenAmount::from(supply),
            swap_fee: dec!(0.003),
            tvl: None,
            apr: Apr::Unavailable,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_add_liquidity_takes_smaller_side() {
        let p = pool(10_000_000_000, 5_000_000_000_000, 1_000_000);
        // 10% of A, 5% of B -> 5% of supply
        let quote = quote_add_liquidity(
            &p,
            TokenAmount::from(1_000_000_000u64),
            TokenAmount::from(250_000_000_000u64),
        )
        .unwrap();

        assert_eq!(quote.estimated_lp_tokens, TokenAmount::from(50_000u64));
        assert!(quote.simulated);
        assert!(quote.resulting_pool_share > Decimal::ZERO);
        assert!(quote.resulting_pool_share < Decimal::ONE);
    }

    #[test]
    fn test_add_liquidity_empty_pool() {
        let p = pool(0, 0, 0);
        let quote =
            quote_add_liquidity(&p, TokenAmount::from(1u64), TokenAmount::from(1u64)).unwrap();
        assert!(quote.estimated_lp_tokens.is_zero());
        assert_eq!(quote.resulting_pool_share, Decimal::ZERO);
    }

    #[test]
    fn test_add_liquidity_rejects_zero() {
        let p = pool(1, 1, 1);
        let err =
            quote_add_liquidity(&p, TokenAmount::zero(), TokenAmount::from(1u64)).unwrap_err();
        assert_eq!(err, DomainError::ZeroAmount { field: "amountA" });
    }

    #[test]
    fn test_remove_liquidity_proportional() {
        let p = pool(10_000_000_000, 5_000_000_000_000, 1_000_000);
        let quote = quote_remove_liquidity(&p, TokenAmount::from(100_000u64), None, None).unwrap();

        assert_eq!(quote.token_a_amount, TokenAmount::from(1_000_000_000u64));
        assert_eq!(quote.token_b_amount, TokenAmount::from(500_000_000_000u64));
    }

    #[test]
    fn test_remove_liquidity_slippage() {
        let p = pool(10_000_000_000, 5_000_000_000_000, 1_000_000);
        let err = quote_remove_liquidity(
            &p,
            TokenAmount::from(100_000u64),
            Some(TokenAmount::from(1_000_000_001u64)),
            None,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            DomainError::SlippageExceeded {
                field: "minAmountA",
                ..
            }
        ));
    }

    #[test]
    fn test_remove_liquidity_exceeds_supply() {
        let p = pool(10, 10, 100);
        let err = quote_remove_liquidity(&p, TokenAmount::from(101u64), None, None).unwrap_err();
        assert!(matches!(err, DomainError::ExceedsSupply { .. }));
    }
}
