use crate::error::SourceError;
use crate::layout::{AccountLayout, FieldKind, FieldSpec, LayoutError};
use crate::AccountSource;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pool account layout: a discriminator, both mints, both vaults, then the LP mint.
pub const METEORA_POOL_LAYOUT: AccountLayout = AccountLayout {
    name: "meteora_pool",
    size: 352,
    fields: &[
        FieldSpec::new("token_a_mint", 8, FieldKind::Pubkey),
        FieldSpec::new("token_b_mint", 40, FieldKind::Pubkey),
        FieldSpec::new("token_a_vault", 72, FieldKind::Pubkey),
        FieldSpec::new("token_b_vault", 104, FieldKind::Pubkey),
        FieldSpec::new("lp_mint", 168, FieldKind::Pubkey),
    ],
};

/// Decoded pool account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolRecord {
    /// Pool account address.
    pub address: Pubkey,
    /// Token A mint.
    pub token_a_mint: Pubkey,
    /// Token B mint.
    pub token_b_mint: Pubkey,
    /// Token account holding reserve A.
    pub token_a_vault: Pubkey,
    /// Token account holding reserve B.
    pub token_b_vault: Pubkey,
    /// LP token mint.
    pub lp_mint: Pubkey,
}

impl PoolRecord {
    /// Decodes a pool account with `layout`.
    pub fn decode(
        address: Pubkey,
        data: &[u8],
        layout: &AccountLayout,
    ) -> Result<Self, LayoutError> {
        let decoded = layout.decode(data)?;
        Ok(Self {
            address,
            token_a_mint: decoded.pubkey("token_a_mint")?,
            token_b_mint: decoded.pubkey("token_b_mint")?,
            token_a_vault: decoded.pubkey("token_a_vault")?,
            token_b_vault: decoded.pubkey("token_b_vault")?,
            lp_mint: decoded.pubkey("lp_mint")?,
        })
    }
}

/// An account skipped during loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeAnomaly {
    /// Account address.
    pub address: Pubkey,
    /// Why it was skipped.
    pub reason: String,
}

/// Outcome of a full registry load.
#[derive(Debug, Clone, Default)]
pub struct RegistryLoad {
    /// Successfully decoded pools.
    pub pools: Vec<PoolRecord>,
    /// Accounts that were skipped.
    pub anomalies: Vec<DecodeAnomaly>,
}

/// Enumerates and decodes the pool accounts of one program.
#[derive(Clone)]
pub struct RegistryLoader {
    source: Arc<dyn AccountSource>,
    program_id: Pubkey,
    layout: AccountLayout,
}

impl RegistryLoader {
    /// Creates a loader using the default pool layout.
    pub fn new(source: Arc<dyn AccountSource>, program_id: Pubkey) -> Self {
        Self {
            source,
            program_id,
            layout: METEORA_POOL_LAYOUT,
        }
    }

    /// Overrides the pool layout, e.g. to change the expected account size.
    #[must_use]
    pub fn with_layout(mut self, layout: AccountLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Program whose accounts are loaded.
    #[must_use]
    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Loads every pool account of the program.
    ///
    /// Accounts that fail to decode are logged and returned as anomalies;
    /// only an upstream failure fails the whole load.
    pub async fn load_all(&self) -> Result<RegistryLoad, SourceError> {
        let accounts = self
            .source
            .program_accounts(&self.program_id, self.layout.size as u64)
            .await?;

        debug!(
            program = %self.program_id,
            accounts = accounts.len(),
            "Fetched pool program accounts"
        );

        let mut load = RegistryLoad::default();
        for (address, data) in accounts {
            match self.decode(address, &data) {
                Ok(record) => load.pools.push(record),
                Err(reason) => {
                    warn!(address = %address, reason = %reason, "Skipping pool account");
                    load.anomalies.push(DecodeAnomaly { address, reason });
                }
            }
        }

        info!(
            program = %self.program_id,
            pools = load.pools.len(),
            skipped = load.anomalies.len(),
            "Loaded pool registry"
        );
        Ok(load)
    }

    /// Loads one pool account.
    ///
    /// Accounts owned by another program or not matching the layout are
    /// reported as not found.
    pub async fn load_pool(&self, address: &Pubkey) -> Result<PoolRecord, SourceError> {
        let account = self
            .source
            .account(address)
            .await?
            .ok_or_else(|| SourceError::AccountNotFound(address.to_string()))?;

        if account.owner != self.program_id {
            warn!(
                address = %address,
                owner = %account.owner,
                program = %self.program_id,
                "Account is not owned by the pool program"
            );
            return Err(SourceError::AccountNotFound(address.to_string()));
        }

        self.decode(*address, &account.data).map_err(|reason| {
            warn!(address = %address, reason = %reason, "Pool account does not match layout");
            SourceError::AccountNotFound(address.to_string())
        })
    }

    fn decode(&self, address: Pubkey, data: &[u8]) -> Result<PoolRecord, String> {
        let record = PoolRecord::decode(address, data, &self.layout).map_err(|e| e.to_string())?;
        if record.token_a_mint == record.token_b_mint {
            return Err(format!("both sides use mint {}", record.token_a_mint));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryAccounts, encode_pool_account, fixture_program};

    fn loader(source: Arc<InMemoryAccounts>) -> RegistryLoader {
        RegistryLoader::new(source, fixture_program())
    }

    fn record_keys() -> [Pubkey; 5] {
        [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ]
    }

    #[tokio::test]
    async fn test_load_all_decodes_pools() {
        let source = Arc::new(InMemoryAccounts::new());
        let [a, b, va, vb, lp] = record_keys();
        let pool = Pubkey::new_unique();
        source.insert(pool, fixture_program(), encode_pool_account(&a, &b, &va, &vb, &lp));

        let load = loader(source).load_all().await.unwrap();
        assert_eq!(load.pools.len(), 1);
        assert!(load.anomalies.is_empty());

        let record = load.pools[0];
        assert_eq!(record.address, pool);
        assert_eq!(record.token_a_mint, a);
        assert_eq!(record.token_b_mint, b);
        assert_eq!(record.token_a_vault, va);
        assert_eq!(record.token_b_vault, vb);
        assert_eq!(record.lp_mint, lp);
    }

    #[tokio::test]
    async fn test_wrong_size_account_is_excluded() {
        let source = Arc::new(InMemoryAccounts::new());
        let [a, b, va, vb, lp] = record_keys();
        source.insert(
            Pubkey::new_unique(),
            fixture_program(),
            encode_pool_account(&a, &b, &va, &vb, &lp),
        );
        // Same program, wrong length: returned by the source unfiltered.
        source.insert_unfiltered(Pubkey::new_unique(), fixture_program(), vec![1u8; 300]);

        let load = loader(source).load_all().await.unwrap();
        assert_eq!(load.pools.len(), 1);
        assert_eq!(load.anomalies.len(), 1);
    }

    #[tokio::test]
    async fn test_identical_mints_are_anomalies() {
        let source = Arc::new(InMemoryAccounts::new());
        let [a, _, va, vb, lp] = record_keys();
        source.insert(
            Pubkey::new_unique(),
            fixture_program(),
            encode_pool_account(&a, &a, &va, &vb, &lp),
        );

        let load = loader(source).load_all().await.unwrap();
        assert!(load.pools.is_empty());
        assert_eq!(load.anomalies.len(), 1);
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let source = Arc::new(InMemoryAccounts::new());
        source.set_failing(true);

        let err = loader(source).load_all().await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_load_pool_missing() {
        let source = Arc::new(InMemoryAccounts::new());
        let err = loader(source)
            .load_pool(&Pubkey::new_unique())
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn test_load_pool_decodes_owned_account() {
        let source = Arc::new(InMemoryAccounts::new());
        let [a, b, va, vb, lp] = record_keys();
        let pool = Pubkey::new_unique();
        source.insert(pool, fixture_program(), encode_pool_account(&a, &b, &va, &vb, &lp));

        let record = loader(source).load_pool(&pool).await.unwrap();
        assert_eq!(record.lp_mint, lp);
    }

    #[tokio::test]
    async fn test_load_pool_rejects_foreign_owner() {
        let source = Arc::new(InMemoryAccounts::new());
        let [a, b, va, vb, lp] = record_keys();
        let pool = Pubkey::new_unique();
        // Valid layout, but owned by another program.
        source.insert(pool, Pubkey::new_unique(), encode_pool_account(&a, &b, &va, &vb, &lp));

        let err = loader(source).load_pool(&pool).await.unwrap_err();
        assert!(matches!(err, SourceError::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn test_load_pool_rejects_wrong_size() {
        let source = Arc::new(InMemoryAccounts::new());
        let pool = Pubkey::new_unique();
        source.insert(pool, fixture_program(), vec![1u8; 300]);

        let err = loader(source).load_pool(&pool).await.unwrap_err();
        assert!(matches!(err, SourceError::AccountNotFound(_)));
    }
}
