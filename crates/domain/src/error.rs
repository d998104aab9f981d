use thiserror::Error;

/// Errors raised by pool aggregation and liquidity quoting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Both sides of a pool point at the same mint.
    #[error("pool {pool_id} pairs mint {mint} with itself")]
    IdenticalMints { pool_id: String, mint: String },
    /// An amount that must be positive was zero.
    #[error("{field} must be greater than zero")]
    ZeroAmount { field: &'static str },
    /// LP amount to burn exceeds the pool's total supply.
    #[error("lp amount {requested} exceeds total supply {supply}")]
    ExceedsSupply { requested: String, supply: String },
    /// Withdrawal would return less than the caller's minimum.
    #[error("{field} would be {actual}, below the requested minimum {minimum}")]
    SlippageExceeded {
        field: &'static str,
        minimum: String,
        actual: String,
    },
}
