pub mod amount;
pub mod price;

pub use amount::Amount;
pub use price::{PoolPrices, PriceQuote, PriceSource};
