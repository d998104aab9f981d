//! Application state.

use crate::auth::AuthState;
use crate::rate_limit::RateLimitState;
use crate::services::PoolService;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Pool and position service.
    pub service: Arc<PoolService>,
    /// API key authentication.
    pub auth: AuthState,
    /// Per-client request quotas.
    pub rate_limit: RateLimitState,
    /// Server start time.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Creates application state without rate limiting.
    pub fn new(service: Arc<PoolService>, auth: AuthState) -> Self {
        Self {
            service,
            auth,
            rate_limit: RateLimitState::default(),
            started_at: Utc::now(),
        }
    }

    /// Applies per-client request quotas.
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimitState) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Seconds since start-up.
    pub fn uptime_secs(&self) -> u64 {
        u64::try_from((Utc::now() - self.started_at).num_seconds()).unwrap_or_default()
    }
}
