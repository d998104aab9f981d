//! Domain model for the Meteora LP gateway.
//!
//! Pools, positions and token metadata, plus the pure computations the
//! gateway performs over them:
//! - Pool aggregation from on-chain snapshots
//! - Pool share and position value
//! - TVL and APR
//! - Add/remove liquidity quotes

pub mod aggregate;
pub mod entities;
pub mod error;
pub mod liquidity;
pub mod metrics;
pub mod token;
pub mod value_objects;

pub use aggregate::{PoolSnapshot, SideSnapshot, aggregate_pool, derive_position};
pub use entities::{Pool, PoolToken, Position, TokenMetadata};
pub use error::DomainError;
pub use liquidity::{
    AddLiquidityQuote, RemoveLiquidityQuote, quote_add_liquidity, quote_remove_liquidity,
};
pub use metrics::{Apr, TvlEstimate};
pub use token::TokenAmount;
pub use value_objects::{Amount, PoolPrices, PriceQuote, PriceSource};
