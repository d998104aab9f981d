use super::registry::PoolRecord;
use crate::error::SourceError;
use crate::AccountSource;
use meteora_lp_domain::{PoolSnapshot, SideSnapshot, TokenAmount, TokenMetadata};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

/// Live on-chain state of one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolChainState {
    /// Decoded pool account.
    pub record: PoolRecord,
    /// Balance of the token A vault.
    pub reserve_a: u64,
    /// Balance of the token B vault.
    pub reserve_b: u64,
    /// Outstanding LP supply.
    pub lp_supply: u64,
    /// Token A mint decimals.
    pub decimals_a: u8,
    /// Token B mint decimals.
    pub decimals_b: u8,
}

impl PoolChainState {
    /// Combines chain state with registry metadata into an aggregation input.
    #[must_use]
    pub fn into_snapshot(
        self,
        metadata_a: TokenMetadata,
        metadata_b: TokenMetadata,
        swap_fee: Decimal,
    ) -> PoolSnapshot {
        let record = self.record;
        PoolSnapshot {
            pool_id: record.address.to_string(),
            lp_token_mint: record.lp_mint.to_string(),
            reserve_account_a: record.token_a_vault.to_string(),
            reserve_account_b: record.token_b_vault.to_string(),
            side_a: SideSnapshot {
                mint: record.token_a_mint.to_string(),
                reserve: TokenAmount::from(self.reserve_a),
                decimals: self.decimals_a,
                metadata: metadata_a,
            },
            side_b: SideSnapshot {
                mint: record.token_b_mint.to_string(),
                reserve: TokenAmount::from(self.reserve_b),
                decimals: self.decimals_b,
                metadata: metadata_b,
            },
            total_supply: TokenAmount::from(self.lp_supply),
            swap_fee,
        }
    }
}

/// Reads reserves, LP supply and mint decimals for pools.
#[derive(Clone)]
pub struct PoolReader {
    source: Arc<dyn AccountSource>,
}

impl PoolReader {
    /// Creates a reader over `source`.
    pub fn new(source: Arc<dyn AccountSource>) -> Self {
        Self { source }
    }

    /// Reads the live state of one pool.
    ///
    /// The five account reads run concurrently; any failure fails the pool.
    pub async fn read(&self, record: &PoolRecord) -> Result<PoolChainState, SourceError> {
        let source = self.source.as_ref();
        let (reserve_a, reserve_b, lp_mint, mint_a, mint_b) = tokio::try_join!(
            source.token_balance(&record.token_a_vault),
            source.token_balance(&record.token_b_vault),
            source.mint_info(&record.lp_mint),
            source.mint_info(&record.token_a_mint),
            source.mint_info(&record.token_b_mint),
        )?;

        debug!(
            pool = %record.address,
            reserve_a,
            reserve_b,
            lp_supply = lp_mint.supply,
            "Read pool state"
        );

        Ok(PoolChainState {
            record: *record,
            reserve_a,
            reserve_b,
            lp_supply: lp_mint.supply,
            decimals_a: mint_a.decimals,
            decimals_b: mint_b.decimals,
        })
    }
}
