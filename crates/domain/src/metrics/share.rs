use crate::token::TokenAmount;
use rust_decimal::Decimal;

/// Fraction of the pool represented by `lp_balance`, clamped to `[0, 1]`.
///
/// An empty pool (`total_supply == 0`) yields zero instead of NaN.
pub fn pool_share(lp_balance: TokenAmount, total_supply: TokenAmount) -> Decimal {
    if total_supply.is_zero() {
        return Decimal::ZERO;
    }
    if lp_balance >= total_supply {
        return Decimal::ONE;
    }

    // Keep both operands inside Decimal's 96-bit mantissa.
    let shift = total_supply.0.bits().saturating_sub(96);
    let numerator = TokenAmount(lp_balance.0 >> shift).to_decimal();
    let denominator = TokenAmount(total_supply.0 >> shift).to_decimal();

    match (numerator, denominator) {
        (Some(n), Some(d)) if !d.is_zero() => {
            (n / d).normalize().clamp(Decimal::ZERO, Decimal::ONE)
        }
        _ => Decimal::ZERO,
    }
}

/// Underlying token amounts owned through `lp_balance`.
///
/// Computed as `floor(reserve * lp / supply)` with the balance clamped to the
/// supply, so values never exceed the reserves.
pub fn position_values(
    reserve_a: TokenAmount,
    reserve_b: TokenAmount,
    lp_balance: TokenAmount,
    total_supply: TokenAmount,
) -> (TokenAmount, TokenAmount) {
    if total_supply.is_zero() {
        return (TokenAmount::zero(), TokenAmount::zero());
    }
    let lp = lp_balance.min(total_supply);
    (
        reserve_a.mul_div_floor(lp, total_supply),
        reserve_b.mul_div_floor(lp, total_supply),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitive_types::U256;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pool_share_basic() {
        let share = pool_share(TokenAmount::from(100_000u64), TokenAmount::from(1_000_000u64));
        assert_eq!(share, dec!(0.1));
    }

    #[test]
    fn test_pool_share_zero_supply() {
        let share = pool_share(TokenAmount::from(100u64), TokenAmount::zero());
        assert_eq!(share, Decimal::ZERO);
    }

    #[test]
    fn test_pool_share_clamped_to_one() {
        let share = pool_share(TokenAmount::from(2_000u64), TokenAmount::from(1_000u64));
        assert_eq!(share, Decimal::ONE);
    }

    #[test]
    fn test_pool_share_huge_supply_stays_in_range() {
        let supply = TokenAmount(U256::MAX);
        let balance = TokenAmount(U256::MAX >> 1usize);
        let share = pool_share(balance, supply);
        assert!(share > dec!(0.49) && share < dec!(0.51));
    }

    #[test]
    fn test_position_values() {
        let (a, b) = position_values(
            TokenAmount::from(10_000_000_000u64),
            TokenAmount::from(5_000_000_000_000u64),
            TokenAmount::from(100_000u64),
            TokenAmount::from(1_000_000u64),
        );
        assert_eq!(a, TokenAmount::from(1_000_000_000u64));
        assert_eq!(b, TokenAmount::from(500_000_000_000u64));
    }

    #[test]
    fn test_position_values_never_exceed_reserves() {
        let (a, b) = position_values(
            TokenAmount::from(500u64),
            TokenAmount::from(700u64),
            TokenAmount::from(9_999u64),
            TokenAmount::from(10u64),
        );
        assert_eq!(a, TokenAmount::from(500u64));
        assert_eq!(b, TokenAmount::from(700u64));
    }
}
