//! Service layer: cache, chain reads and aggregation.

use crate::error::ApiError;
use crate::models::{Pagination, PoolPage};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use meteora_lp_data::{CacheKey, PriceOracle, ResultCache, TokenRegistry};
use meteora_lp_domain::{
    AddLiquidityQuote, Apr, Pool, PoolPrices, Position, RemoveLiquidityQuote, TokenAmount,
    aggregate_pool, derive_position, quote_add_liquidity, quote_remove_liquidity,
};
use meteora_lp_protocols::meteora::{
    METEORA_POOL_LAYOUT, PoolReader, PoolRecord, PositionReader, RegistryLoader,
};
use meteora_lp_protocols::{AccountSource, Pubkey, SourceError, parse_address};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default number of pools aggregated concurrently.
pub const DEFAULT_FAN_OUT: usize = 8;

/// Pools per page when the client sends no limit.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// Token pair filter for the pool listing.
///
/// With both mints set, a pool matches when it trades exactly that pair in
/// either order. With one mint set, any pool holding it matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolFilter {
    pub mint_a: Option<Pubkey>,
    pub mint_b: Option<Pubkey>,
}

impl PoolFilter {
    fn matches(&self, pool: &Pool) -> bool {
        let a = pool.token_a.mint_address.as_str();
        let b = pool.token_b.mint_address.as_str();
        match (self.mint_a.map(|m| m.to_string()), self.mint_b.map(|m| m.to_string())) {
            (Some(x), Some(y)) => (a == x && b == y) || (a == y && b == x),
            (Some(x), None) | (None, Some(x)) => a == x || b == x,
            (None, None) => true,
        }
    }
}

/// Pool service settings.
#[derive(Debug, Clone)]
pub struct PoolServiceConfig {
    /// Pool program.
    pub program_id: Pubkey,
    /// Expected pool account size in bytes.
    pub pool_account_size: usize,
    /// Fee applied to every pool; the pool account does not carry one.
    pub swap_fee: Decimal,
    /// Concurrent pool aggregations when listing.
    pub fan_out: usize,
}

/// Orchestrates pool and position requests.
pub struct PoolService {
    source: Arc<dyn AccountSource>,
    loader: RegistryLoader,
    pools: PoolReader,
    positions: PositionReader,
    tokens: Arc<TokenRegistry>,
    prices: Arc<dyn PriceOracle>,
    cache: Arc<ResultCache>,
    swap_fee: Decimal,
    fan_out: usize,
}

impl PoolService {
    /// Creates a service over the given collaborators.
    pub fn new(
        config: PoolServiceConfig,
        source: Arc<dyn AccountSource>,
        tokens: Arc<TokenRegistry>,
        prices: Arc<dyn PriceOracle>,
        cache: Arc<ResultCache>,
    ) -> Self {
        let layout = METEORA_POOL_LAYOUT.with_size(config.pool_account_size);
        Self {
            loader: RegistryLoader::new(source.clone(), config.program_id).with_layout(layout),
            pools: PoolReader::new(source.clone()),
            positions: PositionReader::new(source.clone()),
            source,
            tokens,
            prices,
            cache,
            swap_fee: config.swap_fee,
            fan_out: config.fan_out.max(1),
        }
    }

    /// The result cache.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Whether the RPC node is healthy.
    pub async fn rpc_healthy(&self) -> bool {
        self.source.is_healthy().await
    }

    /// All pools, sorted by address.
    pub async fn list_pools(&self) -> Result<Vec<Pool>, ApiError> {
        let key = CacheKey::AllPools;
        self.cached(&key, || self.fetch_all_pools()).await
    }

    /// Filtered page of the pool listing. `page` is 1-based; pages past the
    /// end are empty.
    pub async fn find_pools(
        &self,
        filter: &PoolFilter,
        page: usize,
        limit: usize,
    ) -> Result<PoolPage, ApiError> {
        let pools = self.list_pools().await?;
        Ok(paginate(
            pools.into_iter().filter(|pool| filter.matches(pool)).collect(),
            page,
            limit,
        ))
    }

    /// One pool by address.
    pub async fn get_pool(&self, pool_id: &str) -> Result<Pool, ApiError> {
        let address = parse_pubkey("poolId", pool_id)?;
        let key = CacheKey::Pool(pool_id.to_string());
        self.cached(&key, || async move {
            let record = self.loader.load_pool(&address).await.map_err(|e| match e {
                SourceError::AccountNotFound(_) => {
                    ApiError::NotFound(format!("Pool {pool_id} not found"))
                }
                other => ApiError::from(other),
            })?;
            self.build_pool(&record).await
        })
        .await
    }

    /// Non-zero LP positions of `wallet` across all pools.
    ///
    /// Reads the wallet's token accounts once and matches them against the
    /// LP mints of the pool listing.
    pub async fn positions(&self, wallet: &str) -> Result<Vec<Position>, ApiError> {
        let owner = parse_pubkey("address", wallet)?;
        let key = CacheKey::Positions(wallet.to_string());
        self.cached(&key, || async move {
            let balances = async { Ok::<_, ApiError>(self.positions.balances(&owner).await?) };
            let (pools, balances) = tokio::try_join!(self.list_pools(), balances)?;

            let mut positions: Vec<Position> = pools
                .iter()
                .filter_map(|pool| {
                    let lp_mint = pool.lp_token_mint.parse::<Pubkey>().ok()?;
                    let balance = *balances.get(&lp_mint)?;
                    Some(derive_position(pool, TokenAmount::from(balance)))
                })
                .collect();
            positions.sort_by(|a, b| a.pool_id.cmp(&b.pool_id));

            debug!(wallet = %owner, positions = positions.len(), "Derived positions");
            Ok(positions)
        })
        .await
    }

    /// Quotes a two-sided deposit.
    pub async fn quote_add(
        &self,
        pool_id: &str,
        amount_a: TokenAmount,
        amount_b: TokenAmount,
    ) -> Result<AddLiquidityQuote, ApiError> {
        let pool = self.get_pool(pool_id).await?;
        Ok(quote_add_liquidity(&pool, amount_a, amount_b)?)
    }

    /// Quotes an LP burn.
    pub async fn quote_remove(
        &self,
        pool_id: &str,
        lp_amount: TokenAmount,
        min_a: Option<TokenAmount>,
        min_b: Option<TokenAmount>,
    ) -> Result<RemoveLiquidityQuote, ApiError> {
        let pool = self.get_pool(pool_id).await?;
        Ok(quote_remove_liquidity(&pool, lp_amount, min_a, min_b)?)
    }

    /// Drops the cached pool and the cached listing.
    pub async fn invalidate_pool(&self, pool_id: &str) -> Result<bool, ApiError> {
        parse_pubkey("poolId", pool_id)?;
        let removed = self.cache.delete(&CacheKey::Pool(pool_id.to_string())).await;
        self.cache.delete(&CacheKey::AllPools).await;
        info!(pool = pool_id, removed, "Invalidated pool cache");
        Ok(removed)
    }

    async fn fetch_all_pools(&self) -> Result<Vec<Pool>, ApiError> {
        let load = self.loader.load_all().await?;
        let total = load.pools.len();

        let results: Vec<(PoolRecord, Result<Pool, ApiError>)> = stream::iter(load.pools)
            .map(|record| async move { (record, self.build_pool(&record).await) })
            .buffer_unordered(self.fan_out)
            .collect()
            .await;

        let mut pools = Vec::with_capacity(total);
        for (record, result) in results {
            match result {
                Ok(pool) => pools.push(pool),
                Err(e) if e.is_upstream() => return Err(e),
                Err(e) => warn!(pool = %record.address, error = %e, "Skipping pool"),
            }
        }
        pools.sort_by(|a, b| a.pool_id.cmp(&b.pool_id));

        info!(
            pools = pools.len(),
            skipped = total - pools.len() + load.anomalies.len(),
            "Aggregated pool listing"
        );
        Ok(pools)
    }

    async fn build_pool(&self, record: &PoolRecord) -> Result<Pool, ApiError> {
        let state = self.pools.read(record).await?;

        let mint_a = record.token_a_mint.to_string();
        let mint_b = record.token_b_mint.to_string();
        let prices = match self.prices.pool_prices(&mint_a, &mint_b).await {
            Ok(prices) => prices,
            Err(e) => {
                warn!(pool = %record.address, error = %e, "Prices unavailable");
                PoolPrices::default()
            }
        };

        let snapshot = state.into_snapshot(
            self.tokens.resolve(&mint_a),
            self.tokens.resolve(&mint_b),
            self.swap_fee,
        );
        Ok(aggregate_pool(snapshot, &prices, Apr::Unavailable, Utc::now())?)
    }

    /// Cache lookup with fetch on miss, falling back to the last stored value
    /// when the fetch fails upstream.
    async fn cached<T, F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        match self.cache.get_or_fetch(key, None, fetch).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_upstream() => match self.cache.get_stale::<T>(key).await {
                Some(stale) => {
                    warn!(key = %key, error = %e, "Serving stale value");
                    Ok(stale)
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}

fn paginate(pools: Vec<Pool>, page: usize, limit: usize) -> PoolPage {
    let page = page.max(1);
    let limit = limit.max(1);
    let total_items = pools.len();
    let pagination = Pagination {
        total_items,
        total_pages: total_items.div_ceil(limit),
        current_page: page,
        items_per_page: limit,
    };
    let pools = pools
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .collect();
    PoolPage { pools, pagination }
}

fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey, ApiError> {
    parse_address(value)
        .map_err(|_| ApiError::invalid_field(field, format!("'{value}' is not a valid address")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use meteora_lp_data::{ManualClock, MemoryStore, StaticPriceOracle};
    use meteora_lp_domain::{PriceSource, TokenMetadata};
    use meteora_lp_protocols::testing::{
        InMemoryAccounts, PoolFixture, encode_pool_account, fixture_program,
    };
    use rust_decimal_macros::dec;
    use std::time::Duration;

    struct Harness {
        source: Arc<InMemoryAccounts>,
        clock: Arc<ManualClock>,
        service: PoolService,
    }

    fn harness_with(
        source: Arc<InMemoryAccounts>,
        prices: StaticPriceOracle,
        tokens: TokenRegistry,
    ) -> Harness {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = ResultCache::new(Arc::new(MemoryStore::new(clock.clone())), clock.clone());
        let service = PoolService::new(
            PoolServiceConfig {
                program_id: fixture_program(),
                pool_account_size: 352,
                swap_fee: dec!(0.003),
                fan_out: DEFAULT_FAN_OUT,
            },
            source.clone(),
            Arc::new(tokens),
            Arc::new(prices),
            Arc::new(cache),
        );
        Harness {
            source,
            clock,
            service,
        }
    }

    fn default_harness() -> Harness {
        harness_with(
            Arc::new(InMemoryAccounts::new()),
            StaticPriceOracle::default(),
            TokenRegistry::empty(),
        )
    }

    #[tokio::test]
    async fn test_list_pools_aggregates_fixture() {
        let h = default_harness();
        let fixture = PoolFixture::new().install(&h.source);

        let pools = h.service.list_pools().await.unwrap();
        assert_eq!(pools.len(), 1);

        let pool = &pools[0];
        assert_eq!(pool.pool_id, fixture.record.address.to_string());
        assert_eq!(pool.token_a.reserve_amount, TokenAmount::from(10_000_000_000u64));
        assert_eq!(pool.token_a.symbol, "Unknown");
        assert_eq!(pool.swap_fee, dec!(0.003));
        assert!(pool.tvl.is_none());
        assert_eq!(pool.apr, Apr::Unavailable);
        assert_ne!(pool.token_a.mint_address, pool.token_b.mint_address);
    }

    #[tokio::test]
    async fn test_placeholder_prices_mark_tvl() {
        let source = Arc::new(InMemoryAccounts::new());
        let fixture = PoolFixture::new().install(&source);
        let prices = StaticPriceOracle::parse(&format!(
            "{}=1,{}=10",
            fixture.record.token_a_mint, fixture.record.token_b_mint
        ))
        .unwrap();
        let tokens = TokenRegistry::from_entries([(
            fixture.record.token_a_mint.to_string(),
            TokenMetadata::new("USD Coin", "USDC", 6),
        )]);
        let h = harness_with(source, prices, tokens);

        let pool = h
            .service
            .get_pool(&fixture.record.address.to_string())
            .await
            .unwrap();
        let tvl = pool.tvl.unwrap();
        // 10,000 * $1 + 5,000 * $10
        assert_eq!(tvl.usd, dec!(60000));
        assert_eq!(tvl.price_source, PriceSource::Placeholder);
        assert_eq!(pool.token_a.symbol, "USDC");
        assert_eq!(pool.token_b.symbol, "Unknown");
    }

    #[tokio::test]
    async fn test_get_pool_not_found_and_invalid() {
        let h = default_harness();
        let missing = Pubkey::new_unique().to_string();
        assert!(matches!(
            h.service.get_pool(&missing).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            h.service.get_pool("not-an-address").await,
            Err(ApiError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_listing_is_cached() {
        let h = default_harness();
        PoolFixture::new().install(&h.source);

        h.service.list_pools().await.unwrap();
        let calls = h.source.calls();
        h.service.list_pools().await.unwrap();
        assert_eq!(h.source.calls(), calls);
    }

    #[tokio::test]
    async fn test_stale_listing_served_on_outage() {
        let h = default_harness();
        PoolFixture::new().install(&h.source);

        let fresh = h.service.list_pools().await.unwrap();
        h.clock.advance(Duration::from_secs(61));
        h.source.set_failing(true);

        let stale = h.service.list_pools().await.unwrap();
        assert_eq!(stale, fresh);
    }

    #[tokio::test]
    async fn test_outage_without_cache_is_upstream_error() {
        let h = default_harness();
        h.source.set_failing(true);
        let err = h.service.list_pools().await.unwrap_err();
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn test_positions_reference_scenario() {
        let h = default_harness();
        let fixture = PoolFixture::new().install(&h.source);
        PoolFixture::new().install(&h.source);
        let wallet = Pubkey::new_unique();
        fixture.give_lp(&h.source, &wallet, 100_000);

        let positions = h.service.positions(&wallet.to_string()).await.unwrap();
        assert_eq!(positions.len(), 1);

        let position = &positions[0];
        assert_eq!(position.pool_id, fixture.record.address.to_string());
        assert_eq!(position.pool_share, dec!(0.1));
        assert_eq!(position.value_a, TokenAmount::from(1_000_000_000u64));
        assert_eq!(position.value_b, TokenAmount::from(500_000_000_000u64));
    }

    #[tokio::test]
    async fn test_quotes() {
        let h = default_harness();
        let fixture = PoolFixture::new().install(&h.source);
        let pool_id = fixture.record.address.to_string();

        let add = h
            .service
            .quote_add(
                &pool_id,
                TokenAmount::from(1_000_000_000u64),
                TokenAmount::from(500_000_000_000u64),
            )
            .await
            .unwrap();
        assert_eq!(add.estimated_lp_tokens, TokenAmount::from(100_000u64));
        assert!(add.simulated);

        let slippage = h
            .service
            .quote_remove(
                &pool_id,
                TokenAmount::from(100_000u64),
                Some(TokenAmount::from(2_000_000_000u64)),
                None,
            )
            .await;
        assert!(matches!(slippage, Err(ApiError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_invalidate_pool() {
        let h = default_harness();
        let fixture = PoolFixture::new().install(&h.source);
        let pool_id = fixture.record.address.to_string();

        h.service.get_pool(&pool_id).await.unwrap();
        assert!(h.service.invalidate_pool(&pool_id).await.unwrap());
        assert!(!h.service.invalidate_pool(&pool_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_pool_rejects_foreign_owned_account() {
        let h = default_harness();
        let fixture = PoolFixture::new().install(&h.source);
        let r = fixture.record;
        let impostor = Pubkey::new_unique();
        h.source.insert(
            impostor,
            Pubkey::new_unique(),
            encode_pool_account(
                &r.token_a_mint,
                &r.token_b_mint,
                &r.token_a_vault,
                &r.token_b_vault,
                &r.lp_mint,
            ),
        );

        assert!(matches!(
            h.service.get_pool(&impostor.to_string()).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_positions_read_wallet_once() {
        let h = default_harness();
        let first = PoolFixture::new().install(&h.source);
        let second = PoolFixture::new().install(&h.source);
        PoolFixture::new().install(&h.source);
        let wallet = Pubkey::new_unique();
        first.give_lp(&h.source, &wallet, 100_000);
        second.give_lp(&h.source, &wallet, 500_000);

        h.service.list_pools().await.unwrap();
        let before = h.source.calls();
        let positions = h.service.positions(&wallet.to_string()).await.unwrap();

        assert_eq!(positions.len(), 2);
        assert_eq!(h.source.calls() - before, 1);
        let half = positions
            .iter()
            .find(|p| p.pool_id == second.record.address.to_string())
            .unwrap();
        assert_eq!(half.pool_share, dec!(0.5));
    }

    #[tokio::test]
    async fn test_find_pools_filters_pair_in_either_order() {
        let h = default_harness();
        let wanted = PoolFixture::new().install(&h.source);
        PoolFixture::new().install(&h.source);

        let reversed = PoolFilter {
            mint_a: Some(wanted.record.token_b_mint),
            mint_b: Some(wanted.record.token_a_mint),
        };
        let page = h.service.find_pools(&reversed, 1, 10).await.unwrap();
        assert_eq!(page.pools.len(), 1);
        assert_eq!(page.pools[0].pool_id, wanted.record.address.to_string());
        assert_eq!(page.pagination.total_items, 1);

        let one_side = PoolFilter {
            mint_a: Some(wanted.record.token_a_mint),
            mint_b: None,
        };
        assert_eq!(h.service.find_pools(&one_side, 1, 10).await.unwrap().pools.len(), 1);

        let everything = h.service.find_pools(&PoolFilter::default(), 1, 10).await.unwrap();
        assert_eq!(everything.pools.len(), 2);
    }

    #[tokio::test]
    async fn test_find_pools_paginates() {
        let h = default_harness();
        for _ in 0..5 {
            PoolFixture::new().install(&h.source);
        }
        let all = h.service.list_pools().await.unwrap();

        let page = h.service.find_pools(&PoolFilter::default(), 2, 2).await.unwrap();
        assert_eq!(
            page.pagination,
            Pagination {
                total_items: 5,
                total_pages: 3,
                current_page: 2,
                items_per_page: 2,
            }
        );
        assert_eq!(page.pools, all[2..4].to_vec());

        let past_end = h.service.find_pools(&PoolFilter::default(), 4, 2).await.unwrap();
        assert!(past_end.pools.is_empty());
        assert_eq!(past_end.pagination.total_pages, 3);
    }
}
