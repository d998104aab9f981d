use super::clock::Clock;
use crate::error::CacheError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Key-value backend for cached JSON.
///
/// `retain_secs` bounds how long the raw value is kept. Freshness is decided
/// by the cache from the stored envelope, not by the backend.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, retain_secs: u64) -> Result<(), CacheError>;

    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Backend name for health output.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> bool;
}

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    retain_until_ms: u64,
}

/// In-process store. Retention is enforced lazily on read.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Slot>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = self.clock.now_ms();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(slot) if slot.retain_until_ms > now => return Ok(Some(slot.value.clone())),
                Some(_) => {}
            }
        }
        // Past retention: evict.
        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|slot| slot.retain_until_ms <= now)
        {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, retain_secs: u64) -> Result<(), CacheError> {
        let retain_until_ms = self
            .clock
            .now_ms()
            .saturating_add(retain_secs.saturating_mul(1000));
        self.entries.write().await.insert(
            key.to_string(),
            Slot {
                value,
                retain_until_ms,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> bool {
        true
    }
}
