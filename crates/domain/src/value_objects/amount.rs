use crate::token::TokenAmount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A raw amount paired with the decimals of its mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub raw: TokenAmount,
    pub decimals: u8,
}

impl Amount {
    pub fn new(raw: TokenAmount, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    /// Human units: `raw / 10^decimals`.
    ///
    /// `None` when the raw value exceeds `Decimal` range or the mint uses more
    /// than 28 decimals.
    pub fn to_decimal(&self) -> Option<Decimal> {
        let mut value = self.raw.to_decimal()?;
        value.set_scale(u32::from(self.decimals)).ok()?;
        Some(value.normalize())
    }
}
