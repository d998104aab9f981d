//! REST API for Meteora liquidity pools.
//!
//! This crate serves the gateway's HTTP surface:
//! - Pool listing and lookup with derived TVL and APR
//! - Wallet LP positions
//! - Simulated add/remove liquidity quotes
//! - Cache invalidation
//! - API key authentication, rate limiting and request IDs

/// Authentication module.
pub mod auth;
/// Error types.
pub mod error;
/// Request handlers.
pub mod handlers;
/// Middleware components.
pub mod middleware;
/// API request/response models.
pub mod models;
/// Per-client rate limiting.
pub mod rate_limit;
/// Route definitions.
pub mod routes;
/// Server configuration and startup.
pub mod server;
/// Service layer for API operations.
pub mod services;
/// Application state.
pub mod state;

pub use auth::{AuthConfig, AuthError, AuthState};
pub use error::ApiError;
pub use rate_limit::{RateLimitConfig, RateLimitState};
pub use routes::create_router;
pub use server::{ApiServer, ServerConfig, ServerError};
pub use services::{PoolFilter, PoolService, PoolServiceConfig};
pub use state::AppState;
