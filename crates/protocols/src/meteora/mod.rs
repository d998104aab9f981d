//! Meteora pool program adapter.
//!
//! This module provides read access to Meteora pools:
//! - Enumerate and decode pool accounts
//! - Read live reserve and LP supply state
//! - Read a wallet's LP balances

/// Live pool state reader.
pub mod pool_reader;
/// Wallet LP balance reader.
pub mod position_reader;
/// Pool account enumeration and decoding.
pub mod registry;

pub use pool_reader::{PoolChainState, PoolReader};
pub use position_reader::PositionReader;
pub use registry::{DecodeAnomaly, METEORA_POOL_LAYOUT, PoolRecord, RegistryLoad, RegistryLoader};

/// Default Meteora pool program ID.
pub const METEORA_PROGRAM_ID: &str = "Eo7WjKq67rjJQSZxS6z3YkapzY3eMj6Xy8X5EQVn5UaB";
