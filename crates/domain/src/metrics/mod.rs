//! Derived pool metrics.
//!
//! Everything here is a pure function of already-fetched numbers:
//! - Pool share and position value from LP balances
//! - TVL from reserves and unit prices
//! - APR from a fee/volume window, or explicitly unavailable

pub mod apr;
pub mod share;
pub mod tvl;

pub use apr::Apr;
pub use share::{pool_share, position_values};
pub use tvl::{TvlEstimate, estimate_tvl};
