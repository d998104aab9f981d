//! Server configuration and startup.

use crate::auth::{AuthConfig, AuthState};
use crate::rate_limit::{RateLimitConfig, RateLimitState};
use crate::routes::create_router;
use crate::services::{DEFAULT_FAN_OUT, PoolService, PoolServiceConfig};
use crate::state::AppState;
use meteora_lp_data::cache::{DEFAULT_STALE_FACTOR, DEFAULT_TTL_SECS};
use meteora_lp_data::{
    CacheStore, Clock, HttpPriceOracle, MemoryStore, PriceOracle, RedisStore, ResultCache,
    StaticPriceOracle, SystemClock, TokenRegistry,
};
use meteora_lp_protocols::meteora::METEORA_PROGRAM_ID;
use meteora_lp_protocols::{AccountSource, Pubkey, RpcConfig, RpcProvider, parse_address};
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Default token list location.
pub const DEFAULT_TOKEN_LIST_URL: &str =
    "https://cdn.jsdelivr.net/gh/solana-labs/token-list@main/src/tokens/solana.tokenlist.json";

/// Timeout for off-chain HTTP calls (token list, prices).
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Startup errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// An environment variable holds an unusable value.
    #[error("invalid value for {var}: {reason}")]
    Config {
        /// Variable name.
        var: &'static str,
        /// What is wrong.
        reason: String,
    },
    /// Listener could not be bound or the server failed.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Solana RPC settings.
    pub rpc: RpcConfig,
    /// Meteora pool program.
    pub program_id: Pubkey,
    /// Expected pool account size.
    pub pool_account_size: usize,
    /// Swap fee reported for every pool.
    pub default_swap_fee: Decimal,
    /// Token list URL.
    pub token_list_url: String,
    /// Optional price API.
    pub price_api_url: Option<String>,
    /// Placeholder prices, `mint=price,...`.
    pub placeholder_prices: String,
    /// Optional Redis URL; memory cache otherwise.
    pub redis_url: Option<String>,
    /// Cache TTL in seconds.
    pub cache_ttl_secs: u64,
    /// Stale retention as a multiple of the TTL.
    pub cache_stale_factor: u64,
    /// Accepted API keys; empty disables authentication.
    pub auth: AuthConfig,
    /// Allowed CORS origin; any when unset.
    pub cors_origin: Option<String>,
    /// Per-client request quota on the API routes.
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            rpc: RpcConfig::default(),
            program_id: Pubkey::from_str(METEORA_PROGRAM_ID).unwrap_or_default(),
            pool_account_size: 352,
            default_swap_fee: Decimal::new(3, 3),
            token_list_url: DEFAULT_TOKEN_LIST_URL.to_string(),
            price_api_url: None,
            placeholder_prices: String::new(),
            redis_url: None,
            cache_ttl_secs: DEFAULT_TTL_SECS,
            cache_stale_factor: DEFAULT_STALE_FACTOR,
            auth: AuthConfig::default(),
            cors_origin: None,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`. Unset or blank variables keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(host) = get("HOST") {
            config.host = host;
        }
        config.port = parse_or("PORT", get("PORT"), config.port)?;

        if let Some(url) = get("RPC_URL") {
            config.rpc.url = url;
        }
        config.rpc.timeout_secs =
            parse_or("RPC_TIMEOUT_SECS", get("RPC_TIMEOUT_SECS"), config.rpc.timeout_secs)?;
        config.rpc.max_retries =
            parse_or("RPC_MAX_RETRIES", get("RPC_MAX_RETRIES"), config.rpc.max_retries)?;
        config.rpc.retry_base_ms =
            parse_or("RPC_RETRY_BASE_MS", get("RPC_RETRY_BASE_MS"), config.rpc.retry_base_ms)?;

        if let Some(program) = get("METEORA_PROGRAM_ID") {
            config.program_id = parse_address(&program).map_err(|e| ServerError::Config {
                var: "METEORA_PROGRAM_ID",
                reason: e.to_string(),
            })?;
        }
        config.pool_account_size =
            parse_or("POOL_ACCOUNT_SIZE", get("POOL_ACCOUNT_SIZE"), config.pool_account_size)?;

        config.default_swap_fee =
            parse_or("DEFAULT_SWAP_FEE", get("DEFAULT_SWAP_FEE"), config.default_swap_fee)?;
        if config.default_swap_fee < Decimal::ZERO || config.default_swap_fee >= Decimal::ONE {
            return Err(ServerError::Config {
                var: "DEFAULT_SWAP_FEE",
                reason: "must be a fraction in [0, 1)".to_string(),
            });
        }

        if let Some(url) = get("TOKEN_LIST_URL") {
            config.token_list_url = url;
        }
        config.price_api_url = get("PRICE_API_URL");
        if let Some(prices) = get("PLACEHOLDER_PRICES") {
            StaticPriceOracle::parse(&prices).map_err(|e| ServerError::Config {
                var: "PLACEHOLDER_PRICES",
                reason: e.to_string(),
            })?;
            config.placeholder_prices = prices;
        }

        config.redis_url = get("REDIS_URL");
        config.cache_ttl_secs =
            parse_or("CACHE_TTL_SECS", get("CACHE_TTL_SECS"), config.cache_ttl_secs)?;
        config.cache_stale_factor =
            parse_or("CACHE_STALE_FACTOR", get("CACHE_STALE_FACTOR"), config.cache_stale_factor)?;

        if let Some(keys) = get("API_KEYS") {
            config.auth = AuthConfig::from_key_list(&keys);
        }
        config.cors_origin = get("CORS_ORIGIN");

        config.rate_limit.max_requests = parse_or(
            "RATE_LIMIT_MAX",
            get("RATE_LIMIT_MAX"),
            config.rate_limit.max_requests,
        )?;
        let window_secs = parse_or(
            "RATE_LIMIT_WINDOW_SECS",
            get("RATE_LIMIT_WINDOW_SECS"),
            config.rate_limit.window.as_secs(),
        )?;
        if window_secs == 0 {
            return Err(ServerError::Config {
                var: "RATE_LIMIT_WINDOW_SECS",
                reason: "must be at least 1".to_string(),
            });
        }
        config.rate_limit.window = Duration::from_secs(window_secs);

        Ok(config)
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, ServerError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ServerError::Config {
                var: "HOST",
                reason: e.to_string(),
            })
    }
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ServerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ServerError::Config {
            var,
            reason: format!("'{raw}': {e}"),
        }),
    }
}

/// API server.
pub struct ApiServer {
    config: ServerConfig,
}

impl ApiServer {
    /// Creates a server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Wires up RPC, registry, prices and cache into application state.
    pub async fn build_state(&self) -> Result<AppState, ServerError> {
        let config = &self.config;

        let source: Arc<dyn AccountSource> = Arc::new(RpcProvider::new(config.rpc.clone()));
        let tokens =
            Arc::new(TokenRegistry::load_or_empty(&config.token_list_url, HTTP_TIMEOUT).await);

        let placeholders = StaticPriceOracle::parse(&config.placeholder_prices).map_err(|e| {
            ServerError::Config {
                var: "PLACEHOLDER_PRICES",
                reason: e.to_string(),
            }
        })?;
        let prices: Arc<dyn PriceOracle> = match &config.price_api_url {
            Some(url) => {
                let oracle = HttpPriceOracle::new(url.clone(), HTTP_TIMEOUT, placeholders)
                    .map_err(|e| ServerError::Config {
                        var: "PRICE_API_URL",
                        reason: e.to_string(),
                    })?;
                Arc::new(oracle)
            }
            None => Arc::new(placeholders),
        };

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store: Arc<dyn CacheStore> = match &config.redis_url {
            Some(url) => match RedisStore::connect(url).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    warn!(error = %e, "Redis unavailable, using in-memory cache");
                    Arc::new(MemoryStore::new(clock.clone()))
                }
            },
            None => Arc::new(MemoryStore::new(clock.clone())),
        };
        let cache = ResultCache::new(store, clock)
            .with_ttl(config.cache_ttl_secs)
            .with_stale_factor(config.cache_stale_factor);

        let service = PoolService::new(
            PoolServiceConfig {
                program_id: config.program_id,
                pool_account_size: config.pool_account_size,
                swap_fee: config.default_swap_fee,
                fan_out: DEFAULT_FAN_OUT,
            },
            source,
            tokens,
            prices,
            Arc::new(cache),
        );

        Ok(AppState::new(
            Arc::new(service),
            AuthState::new(config.auth.clone()),
        )
        .with_rate_limit(RateLimitState::new(config.rate_limit)))
    }

    /// Binds and serves until Ctrl-C.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.bind_addr()?;
        let state = self.build_state().await?;
        let app = create_router(state, self.config.cors_origin.as_deref());

        let listener = TcpListener::bind(addr).await?;
        info!(
            %addr,
            rpc = %self.config.rpc.url,
            program = %self.config.program_id,
            auth = !self.config.auth.api_keys.is_empty(),
            "Meteora LP gateway listening"
        );

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.rpc.max_retries, 3);
        assert_eq!(config.rpc.retry_base_ms, 200);
        assert_eq!(config.pool_account_size, 352);
        assert_eq!(config.default_swap_fee, dec!(0.003));
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.cache_stale_factor, 10);
        assert_eq!(config.program_id.to_string(), METEORA_PROGRAM_ID);
        assert!(config.auth.api_keys.is_empty());
        assert!(config.redis_url.is_none());
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window, Duration::from_secs(900));
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("RPC_URL", "https://rpc.example.com"),
            ("CACHE_TTL_SECS", "30"),
            ("API_KEYS", "a,b"),
            ("REDIS_URL", "redis://127.0.0.1:6379"),
            ("PLACEHOLDER_PRICES", "MintA=1,MintB=10"),
            ("PRICE_API_URL", "  "),
            ("RATE_LIMIT_MAX", "0"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rpc.url, "https://rpc.example.com");
        assert_eq!(config.cache_ttl_secs, 30);
        assert_eq!(config.auth.api_keys.len(), 2);
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
        assert!(config.price_api_url.is_none());
        assert_eq!(config.rate_limit.max_requests, 0);
        assert_eq!(config.bind_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_invalid_values_fail() {
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("PORT", "http")])),
            Err(ServerError::Config { var: "PORT", .. })
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("METEORA_PROGRAM_ID", "nope")])),
            Err(ServerError::Config { var: "METEORA_PROGRAM_ID", .. })
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("DEFAULT_SWAP_FEE", "1.5")])),
            Err(ServerError::Config { var: "DEFAULT_SWAP_FEE", .. })
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("PLACEHOLDER_PRICES", "MintA")])),
            Err(ServerError::Config { var: "PLACEHOLDER_PRICES", .. })
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("RATE_LIMIT_WINDOW_SECS", "0")])),
            Err(ServerError::Config { var: "RATE_LIMIT_WINDOW_SECS", .. })
        ));
    }
}
