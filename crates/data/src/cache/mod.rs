//! TTL result cache.
//!
//! Values are stored as JSON envelopes `{ payload, storedAtMs, ttlSecs }`
//! under the `meteora:` namespace. Freshness is checked lazily against an
//! injectable [`Clock`]; expired entries stay readable through
//! [`ResultCache::get_stale`] until the backend's retention lapses.

mod clock;
mod redis_store;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use redis_store::RedisStore;
pub use store::{CacheStore, MemoryStore};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Namespace prepended to every stored key.
pub const KEY_PREFIX: &str = "meteora:";

/// Default entry lifetime.
pub const DEFAULT_TTL_SECS: u64 = 60;

/// Default stale retention, as a multiple of the TTL.
pub const DEFAULT_STALE_FACTOR: u64 = 10;

/// Identifies a cached result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The full pool listing.
    AllPools,
    /// One pool by address.
    Pool(String),
    /// All positions of one wallet.
    Positions(String),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllPools => f.write_str("pools:all"),
            Self::Pool(id) => write!(f, "pool:{id}"),
            Self::Positions(wallet) => write!(f, "positions:{wallet}"),
        }
    }
}

impl CacheKey {
    fn storage_key(&self) -> String {
        format!("{KEY_PREFIX}{self}")
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    payload: T,
    stored_at_ms: u64,
    ttl_secs: u64,
}

impl<T> Envelope<T> {
    fn is_fresh(&self, now_ms: u64) -> bool {
        now_ms < self
            .stored_at_ms
            .saturating_add(self.ttl_secs.saturating_mul(1000))
    }
}

/// What the fetching caller hands to the callers queued behind it.
enum Outcome {
    /// JSON of the fetched value, readable even when the store write failed.
    Value(String),
    /// The fetch error, cloned out to each waiter.
    Failed(Arc<dyn Any + Send + Sync>),
}

type Flight = Arc<tokio::sync::Mutex<Option<Outcome>>>;

/// Result cache shared by all request handlers.
///
/// Backend failures are logged and read as misses; no method fails a request.
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    default_ttl_secs: u64,
    stale_factor: u64,
    in_flight: Mutex<HashMap<String, Flight>>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            default_ttl_secs: DEFAULT_TTL_SECS,
            stale_factor: DEFAULT_STALE_FACTOR,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// In-memory cache on the wall clock.
    pub fn in_memory() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::new(Arc::new(MemoryStore::new(clock.clone())), clock)
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.default_ttl_secs = ttl_secs;
        self
    }

    #[must_use]
    pub fn with_stale_factor(mut self, factor: u64) -> Self {
        self.stale_factor = factor.max(1);
        self
    }

    pub fn default_ttl_secs(&self) -> u64 {
        self.default_ttl_secs
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn ping(&self) -> bool {
        self.store.ping().await
    }

    /// Fresh value for `key`.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let envelope = self.read::<T>(key).await?;
        if envelope.is_fresh(self.clock.now_ms()) {
            debug!(key = %key, "Cache hit");
            Some(envelope.payload)
        } else {
            debug!(key = %key, "Cache entry expired");
            None
        }
    }

    /// Last stored value for `key`, fresh or not.
    pub async fn get_stale<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.read::<T>(key).await.map(|envelope| envelope.payload)
    }

    /// Stores `value`; `None` uses the default TTL. Returns whether it was stored.
    pub async fn set<T: Serialize>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl_secs: Option<u64>,
    ) -> bool {
        let ttl_secs = ttl_secs.unwrap_or(self.default_ttl_secs);
        let envelope = Envelope {
            payload: value,
            stored_at_ms: self.clock.now_ms(),
            ttl_secs,
        };
        let encoded = match serde_json::to_string(&envelope) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode cache entry");
                return false;
            }
        };
        let retain_secs = ttl_secs.saturating_mul(self.stale_factor).max(1);
        match self.store.set(&key.storage_key(), encoded, retain_secs).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache write failed");
                false
            }
        }
    }

    /// Removes `key`. Returns whether an entry existed.
    pub async fn delete(&self, key: &CacheKey) -> bool {
        match self.store.delete(&key.storage_key()).await {
            Ok(existed) => existed,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// Returns the fresh value for `key`, or runs `fetch` and stores its result.
    ///
    /// Concurrent misses on the same key are coalesced: one caller fetches
    /// and every caller already queued on the key receives its outcome, the
    /// value or a clone of the error. Errors are never stored.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl_secs: Option<u64>,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let flight = self.join_flight(key);
        let mut slot = flight.lock().await;
        if let Some(shared) = slot.as_ref().and_then(|outcome| shared_outcome(outcome)) {
            debug!(key = %key, "Reusing coalesced fetch outcome");
            return shared;
        }

        let result = fetch().await;
        *slot = match &result {
            Ok(value) => {
                self.set(key, value, ttl_secs).await;
                serde_json::to_string(value).ok().map(Outcome::Value)
            }
            Err(e) => Some(Outcome::Failed(Arc::new(e.clone()))),
        };
        self.leave_flight(key, &flight);
        result
    }

    async fn read<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<Envelope<T>> {
        let raw = match self.store.get(&key.storage_key()).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    fn join_flight(&self, key: &CacheKey) -> Flight {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight
            .entry(key.storage_key())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(None)))
            .clone()
    }

    /// Detaches the finished flight; later callers start a new one while
    /// queued callers still read its outcome.
    fn leave_flight(&self, key: &CacheKey, flight: &Flight) {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let storage_key = key.storage_key();
        if in_flight
            .get(&storage_key)
            .is_some_and(|current| Arc::ptr_eq(current, flight))
        {
            in_flight.remove(&storage_key);
        }
    }
}

fn shared_outcome<T, E>(outcome: &Outcome) -> Option<Result<T, E>>
where
    T: DeserializeOwned,
    E: Clone + 'static,
{
    match outcome {
        Outcome::Value(json) => serde_json::from_str(json).ok().map(Ok),
        Outcome::Failed(error) => error.downcast_ref::<E>().cloned().map(Err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn cache_with_clock() -> (ResultCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store = Arc::new(MemoryStore::new(clock.clone()));
        (ResultCache::new(store, clock.clone()).with_ttl(60), clock)
    }

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }
        async fn set(&self, _key: &str, _value: String, _retain: u64) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }
        async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }
        fn backend(&self) -> &'static str {
            "broken"
        }
        async fn ping(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_key_format() {
        assert_eq!(CacheKey::AllPools.to_string(), "pools:all");
        assert_eq!(CacheKey::Pool("abc".into()).to_string(), "pool:abc");
        assert_eq!(
            CacheKey::Positions("w".into()).storage_key(),
            "meteora:positions:w"
        );
    }

    #[tokio::test]
    async fn test_round_trip() {
        let (cache, _) = cache_with_clock();
        let key = CacheKey::Pool("p1".into());
        assert!(cache.set(&key, &vec![1u32, 2, 3], None).await);
        assert_eq!(cache.get::<Vec<u32>>(&key).await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_lazy_expiry_keeps_stale_copy() {
        let (cache, clock) = cache_with_clock();
        let key = CacheKey::AllPools;
        cache.set(&key, &"listing", Some(60)).await;

        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get::<String>(&key).await.as_deref(), Some("listing"));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get::<String>(&key).await, None);
        assert_eq!(
            cache.get_stale::<String>(&key).await.as_deref(),
            Some("listing")
        );

        // Stale retention is ten times the TTL.
        clock.advance(Duration::from_secs(540));
        assert_eq!(cache.get_stale::<String>(&key).await, None);
    }

    #[tokio::test]
    async fn test_delete() {
        let (cache, _) = cache_with_clock();
        let key = CacheKey::Pool("p1".into());
        cache.set(&key, &1u8, None).await;
        assert!(cache.delete(&key).await);
        assert_eq!(cache.get::<u8>(&key).await, None);
        assert!(!cache.delete(&key).await);
    }

    #[tokio::test]
    async fn test_backend_failure_is_a_miss() {
        let cache = ResultCache::new(Arc::new(BrokenStore), Arc::new(ManualClock::new(0)));
        let key = CacheKey::AllPools;
        assert!(!cache.set(&key, &1u8, None).await);
        assert_eq!(cache.get::<u8>(&key).await, None);

        let fetched: Result<u8, ()> = cache.get_or_fetch(&key, None, || async { Ok(7) }).await;
        assert_eq!(fetched, Ok(7));
    }

    #[tokio::test]
    async fn test_get_or_fetch_caches_success_only() {
        let (cache, _) = cache_with_clock();
        let key = CacheKey::Pool("p1".into());

        let failed: Result<u32, &str> =
            cache.get_or_fetch(&key, None, || async { Err("down") }).await;
        assert_eq!(failed, Err("down"));
        assert_eq!(cache.get::<u32>(&key).await, None);

        let ok: Result<u32, &str> = cache.get_or_fetch(&key, None, || async { Ok(5) }).await;
        assert_eq!(ok, Ok(5));
        let again: Result<u32, &str> = cache.get_or_fetch(&key, None, || async { Ok(6) }).await;
        assert_eq!(again, Ok(5));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_fetch_once() {
        let (cache, _) = cache_with_clock();
        let cache = Arc::new(cache);
        let fetches = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let fetches = fetches.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch::<u64, (), _, _>(&CacheKey::AllPools, None, || async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(42));
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failed_fetch_is_shared_with_queued_callers() {
        let (cache, _) = cache_with_clock();
        let cache = Arc::new(cache);
        let fetches = Arc::new(AtomicUsize::new(0));
        let started = std::time::Instant::now();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let fetches = fetches.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch::<u64, String, _, _>(&CacheKey::AllPools, None, || async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Err("rpc down".to_string())
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Err("rpc down".to_string()));
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_millis(400));

        // The failure is not remembered: the next caller fetches again.
        let retried: Result<u64, String> = cache
            .get_or_fetch(&CacheKey::AllPools, None, || async { Ok(9) })
            .await;
        assert_eq!(retried, Ok(9));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_coalescing_survives_broken_store() {
        let cache = Arc::new(ResultCache::new(
            Arc::new(BrokenStore),
            Arc::new(ManualClock::new(0)),
        ));
        let fetches = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let fetches = fetches.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch::<u64, (), _, _>(&CacheKey::AllPools, None, || async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(3)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(3));
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }
}
