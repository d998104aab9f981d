//! On-chain access for Meteora pools.
//!
//! - `AccountSource`: read-only seam over Solana RPC
//! - `RpcProvider`: retrying RPC implementation
//! - `layout`: fixed-offset account schemas and the generic decoder
//! - `meteora`: pool registry loader and live state readers

pub mod error;
pub mod layout;
pub mod meteora;
pub mod rpc;
pub mod spl;
#[cfg(any(test, feature = "test-fixtures"))]
pub mod testing;

use async_trait::async_trait;

pub use error::SourceError;
pub use rpc::{RpcConfig, RpcProvider};
pub use solana_sdk::pubkey::Pubkey;
pub use spl::{MintInfo, TokenAccountInfo};

/// One account as read from chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAccount {
    /// Program owning the account.
    pub owner: Pubkey,
    /// Account data.
    pub data: Vec<u8>,
}

/// Read-only view of chain state.
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// All accounts owned by `program_id` whose data is exactly `data_size` bytes.
    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        data_size: u64,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, SourceError>;

    /// One account with its owner, `None` when it does not exist.
    async fn account(&self, address: &Pubkey) -> Result<Option<RawAccount>, SourceError>;

    /// Every SPL token account held by `owner`, through the owner index.
    async fn token_accounts(&self, owner: &Pubkey) -> Result<Vec<TokenAccountInfo>, SourceError>;

    /// Whether the upstream node answers health checks.
    async fn is_healthy(&self) -> bool;

    /// Balance of a token account.
    async fn token_balance(&self, address: &Pubkey) -> Result<u64, SourceError> {
        let account = self
            .account(address)
            .await?
            .ok_or_else(|| SourceError::AccountNotFound(address.to_string()))?;
        TokenAccountInfo::decode(&account.data)
            .map(|info| info.amount)
            .map_err(|source| SourceError::Decode {
                address: address.to_string(),
                source,
            })
    }

    /// Supply and decimals of a mint.
    async fn mint_info(&self, address: &Pubkey) -> Result<MintInfo, SourceError> {
        let account = self
            .account(address)
            .await?
            .ok_or_else(|| SourceError::AccountNotFound(address.to_string()))?;
        MintInfo::decode(&account.data).map_err(|source| SourceError::Decode {
            address: address.to_string(),
            source,
        })
    }
}

/// Parses a base58 address.
pub fn parse_address(value: &str) -> Result<Pubkey, SourceError> {
    value
        .parse::<Pubkey>()
        .map_err(|_| SourceError::InvalidAddress(value.to_string()))
}
