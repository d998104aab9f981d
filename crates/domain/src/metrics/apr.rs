use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Annual percentage rate for liquidity providers.
///
/// Without trading-volume history the rate is unknown and reported as such.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Apr {
    Unavailable,
    Estimated {
        /// Annualized fee yield in percent.
        percent: Decimal,
        #[serde(rename = "windowDays")]
        window_days: u32,
    },
}

impl Apr {
    /// Annualizes the fees earned on `volume_usd` over `window_days`.
    ///
    /// `percent = volume * swap_fee / tvl * 365 / window_days * 100`
    pub fn from_fee_volume(
        volume_usd: Decimal,
        swap_fee: Decimal,
        tvl_usd: Decimal,
        window_days: u32,
    ) -> Self {
        if tvl_usd <= Decimal::ZERO || window_days == 0 || volume_usd < Decimal::ZERO {
            return Self::Unavailable;
        }

        let fees = volume_usd * swap_fee;
        let annualized = fees / tvl_usd * Decimal::from(365) / Decimal::from(window_days);

        Self::Estimated {
            percent: (annualized * Decimal::ONE_HUNDRED).round_dp(2),
            window_days,
        }
    }
}

impl Default for Apr {
    fn default() -> Self {
        Self::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_apr_from_fee_volume() {
        // 100k daily volume at 0.3% on 1M TVL -> 300/day -> 10.95% a year
        let apr = Apr::from_fee_volume(dec!(100000), dec!(0.003), dec!(1000000), 1);
        assert_eq!(
            apr,
            Apr::Estimated {
                percent: dec!(10.95),
                window_days: 1
            }
        );
    }

    #[test]
    fn test_apr_unavailable_for_empty_pool() {
        assert_eq!(
            Apr::from_fee_volume(dec!(100), dec!(0.003), Decimal::ZERO, 7),
            Apr::Unavailable
        );
        assert_eq!(
            Apr::from_fee_volume(dec!(100), dec!(0.003), dec!(10), 0),
            Apr::Unavailable
        );
    }

    #[test]
    fn test_apr_serialization() {
        let json = serde_json::to_value(Apr::Unavailable).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "unavailable" }));

        let json = serde_json::to_value(Apr::Estimated {
            percent: dec!(12.5),
            window_days: 7,
        })
        .unwrap();
        assert_eq!(json["status"], "estimated");
        assert_eq!(json["windowDays"], 7);
    }
}
