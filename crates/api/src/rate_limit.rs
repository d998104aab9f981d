//! Per-client request rate limiting.
//!
//! Clients are keyed by API key when one is sent, otherwise by peer IP.

use crate::auth::extract_api_key;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Tracked clients before idle entries are pruned.
const PRUNE_THRESHOLD: usize = 10_000;

/// Rate limit settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per window; 0 disables limiting.
    pub max_requests: u32,
    /// Window length.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(900),
        }
    }
}

/// Shared limiter state.
#[derive(Clone, Default)]
pub struct RateLimitState {
    limiter: Option<Arc<DefaultKeyedRateLimiter<String>>>,
}

impl RateLimitState {
    /// Builds a limiter allowing `max_requests` per window as a burst,
    /// replenished evenly across the window.
    pub fn new(config: RateLimitConfig) -> Self {
        let Some(burst) = NonZeroU32::new(config.max_requests) else {
            info!("Rate limiting disabled");
            return Self::default();
        };
        let period = config.window / config.max_requests;
        let Some(quota) = Quota::with_period(period) else {
            warn!(window = ?config.window, "Rate limit window too short, limiting disabled");
            return Self::default();
        };

        Self {
            limiter: Some(Arc::new(RateLimiter::keyed(quota.allow_burst(burst)))),
        }
    }

    /// Records one request for `client`.
    pub fn check(&self, client: &str) -> Result<(), ApiError> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        if limiter.len() > PRUNE_THRESHOLD {
            limiter.retain_recent();
        }

        limiter.check_key(&client.to_string()).map_err(|not_until| {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            ApiError::RateLimited {
                retry_after_secs: wait.as_secs().max(1),
            }
        })
    }
}

/// Rejects clients over their quota with 429.
pub async fn rate_limit_middleware(
    State(limits): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_key(&request);
    if let Err(e) = limits.check(&client) {
        warn!(path = %request.uri().path(), "Rate limit exceeded");
        return Err(e);
    }
    Ok(next.run(request).await)
}

fn client_key(request: &Request) -> String {
    if let Some(key) = extract_api_key(request.headers()) {
        return format!("api-key:{key}");
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| format!("ip:{}", addr.ip()))
        .unwrap_or_else(|| "anonymous".to_string())
}
