//! Off-chain data for the Meteora LP gateway.
//!
//! - `token_registry`: token-list snapshot resolving mints to metadata
//! - `prices`: unit prices from a price API or configured placeholders
//! - `cache`: TTL result cache over memory or Redis

pub mod cache;
pub mod error;
pub mod prices;
pub mod token_registry;

pub use cache::{
    CacheKey, CacheStore, Clock, ManualClock, MemoryStore, RedisStore, ResultCache, SystemClock,
};
pub use error::{CacheError, PriceError, RegistryError};
pub use prices::{HttpPriceOracle, PriceOracle, StaticPriceOracle};
pub use token_registry::TokenRegistry;
