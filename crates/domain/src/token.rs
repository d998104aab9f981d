use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Raw on-chain token quantity in the smallest unit.
///
/// Held as a 256-bit integer and serialized as a decimal string so that
/// on-chain scale values never pass through floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenAmount(pub U256);

impl TokenAmount {
    pub fn new(amount: impl Into<U256>) -> Self {
        Self(amount.into())
    }

    pub fn zero() -> Self {
        Self(U256::zero())
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parses a base-10 integer string. Signs, fractions and blanks are rejected.
    pub fn from_dec_str(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        U256::from_dec_str(trimmed).ok().map(Self)
    }

    /// Computes `floor(self * numerator / denominator)`.
    ///
    /// Returns zero when `denominator` is zero.
    pub fn mul_div_floor(&self, numerator: TokenAmount, denominator: TokenAmount) -> TokenAmount {
        if denominator.is_zero() {
            return Self::zero();
        }
        match self.0.checked_mul(numerator.0) {
            Some(product) => Self(product / denominator.0),
            // Product does not fit in 256 bits: divide first and accept the extra truncation.
            None => Self((self.0 / denominator.0).saturating_mul(numerator.0)),
        }
    }

    /// Converts to a `Decimal` when the value fits in its 96-bit mantissa.
    pub fn to_decimal(&self) -> Option<Decimal> {
        if self.0.bits() > 96 {
            return None;
        }
        Decimal::from_str(&self.0.to_string()).ok()
    }
}

impl From<u64> for TokenAmount {
    fn from(v: u64) -> Self {
        Self(U256::from(v))
    }
}

impl From<u128> for TokenAmount {
    fn from(v: u128) -> Self {
        Self(U256::from(v))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_dec_str(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid token amount: {raw}")))
    }
}
