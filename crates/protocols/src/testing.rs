//! In-memory chain state for tests.

use crate::error::SourceError;
use crate::meteora::PoolRecord;
use crate::spl::{TOKEN_PROGRAM_ID, TokenAccountInfo, encode_mint, encode_token_account};
use crate::{AccountSource, RawAccount};
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredAccount {
    owner: Pubkey,
    data: Vec<u8>,
    // Returned by program scans even when the size does not match.
    unfiltered: bool,
}

/// `AccountSource` backed by a map, with a failure switch and a call counter.
#[derive(Debug, Default)]
pub struct InMemoryAccounts {
    accounts: Mutex<HashMap<Pubkey, StoredAccount>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl InMemoryAccounts {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an account owned by `owner`.
    pub fn insert(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        self.store(address, owner, data, false);
    }

    /// Stores an account that program scans return regardless of size.
    pub fn insert_unfiltered(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        self.store(address, owner, data, true);
    }

    /// Stores an SPL token account.
    pub fn insert_token_account(
        &self,
        address: Pubkey,
        mint: &Pubkey,
        owner: &Pubkey,
        amount: u64,
    ) {
        self.insert(
            address,
            token_program(),
            encode_token_account(mint, owner, amount),
        );
    }

    /// Stores an SPL mint.
    pub fn insert_mint(&self, address: Pubkey, supply: u64, decimals: u8) {
        self.insert(address, token_program(), encode_mint(supply, decimals));
    }

    /// Deletes an account.
    pub fn remove(&self, address: &Pubkey) {
        self.lock().remove(address);
    }

    /// Makes every call fail with an upstream error while `failing` is set.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of source calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn store(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>, unfiltered: bool) {
        self.lock().insert(
            address,
            StoredAccount {
                owner,
                data,
                unfiltered,
            },
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Pubkey, StoredAccount>> {
        self.accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self) -> Result<(), SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::Upstream("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountSource for InMemoryAccounts {
    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        data_size: u64,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, SourceError> {
        self.enter()?;
        let mut accounts: Vec<_> = self
            .lock()
            .iter()
            .filter(|(_, account)| account.owner == *program_id)
            .filter(|(_, account)| account.unfiltered || account.data.len() as u64 == data_size)
            .map(|(address, account)| (*address, account.data.clone()))
            .collect();
        accounts.sort_by_key(|(address, _)| *address);
        Ok(accounts)
    }

    async fn account(&self, address: &Pubkey) -> Result<Option<RawAccount>, SourceError> {
        self.enter()?;
        Ok(self.lock().get(address).map(|account| RawAccount {
            owner: account.owner,
            data: account.data.clone(),
        }))
    }

    async fn token_accounts(&self, owner: &Pubkey) -> Result<Vec<TokenAccountInfo>, SourceError> {
        self.enter()?;
        let program = token_program();
        Ok(self
            .lock()
            .values()
            .filter(|account| account.owner == program)
            .filter_map(|account| TokenAccountInfo::decode(&account.data).ok())
            .filter(|info| info.owner == *owner)
            .collect())
    }

    async fn is_healthy(&self) -> bool {
        !self.failing.load(Ordering::SeqCst)
    }
}

/// SPL token program key.
pub fn token_program() -> Pubkey {
    Pubkey::from_str(TOKEN_PROGRAM_ID).unwrap_or_default()
}

/// Program ID the fixtures install pools under.
pub fn fixture_program() -> Pubkey {
    Pubkey::new_from_array([7u8; 32])
}

/// Encodes a 352-byte pool account.
pub fn encode_pool_account(
    token_a_mint: &Pubkey,
    token_b_mint: &Pubkey,
    token_a_vault: &Pubkey,
    token_b_vault: &Pubkey,
    lp_mint: &Pubkey,
) -> Vec<u8> {
    let mut data = vec![0u8; 352];
    data[8..40].copy_from_slice(token_a_mint.as_ref());
    data[40..72].copy_from_slice(token_b_mint.as_ref());
    data[72..104].copy_from_slice(token_a_vault.as_ref());
    data[104..136].copy_from_slice(token_b_vault.as_ref());
    data[168..200].copy_from_slice(lp_mint.as_ref());
    data
}

/// Builder for a complete pool: pool account, vaults and mints.
#[derive(Debug, Clone)]
pub struct PoolFixture {
    /// Pool addresses.
    pub record: PoolRecord,
    reserve_a: u64,
    reserve_b: u64,
    lp_supply: u64,
    decimals_a: u8,
    decimals_b: u8,
}

impl Default for PoolFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolFixture {
    /// Fresh addresses with 10,000 USDC-like and 5,000 SOL-like reserves.
    pub fn new() -> Self {
        Self {
            record: PoolRecord {
                address: Pubkey::new_unique(),
                token_a_mint: Pubkey::new_unique(),
                token_b_mint: Pubkey::new_unique(),
                token_a_vault: Pubkey::new_unique(),
                token_b_vault: Pubkey::new_unique(),
                lp_mint: Pubkey::new_unique(),
            },
            reserve_a: 10_000_000_000,
            reserve_b: 5_000_000_000_000,
            lp_supply: 1_000_000,
            decimals_a: 6,
            decimals_b: 9,
        }
    }

    /// Sets both vault balances.
    pub fn reserves(mut self, a: u64, b: u64) -> Self {
        self.reserve_a = a;
        self.reserve_b = b;
        self
    }

    /// Sets the LP supply.
    pub fn lp_supply(mut self, supply: u64) -> Self {
        self.lp_supply = supply;
        self
    }

    /// Sets both mints' decimals.
    pub fn decimals(mut self, a: u8, b: u8) -> Self {
        self.decimals_a = a;
        self.decimals_b = b;
        self
    }

    /// Writes every account into `source` under [`fixture_program`].
    pub fn install(self, source: &InMemoryAccounts) -> Self {
        let r = &self.record;
        source.insert(
            r.address,
            fixture_program(),
            encode_pool_account(
                &r.token_a_mint,
                &r.token_b_mint,
                &r.token_a_vault,
                &r.token_b_vault,
                &r.lp_mint,
            ),
        );
        source.insert_token_account(r.token_a_vault, &r.token_a_mint, &r.address, self.reserve_a);
        source.insert_token_account(r.token_b_vault, &r.token_b_mint, &r.address, self.reserve_b);
        source.insert_mint(r.token_a_mint, u64::MAX / 2, self.decimals_a);
        source.insert_mint(r.token_b_mint, u64::MAX / 2, self.decimals_b);
        source.insert_mint(r.lp_mint, self.lp_supply, 6);
        self
    }

    /// Gives `wallet` an LP balance in this pool.
    pub fn give_lp(&self, source: &InMemoryAccounts, wallet: &Pubkey, amount: u64) {
        source.insert_token_account(Pubkey::new_unique(), &self.record.lp_mint, wallet, amount);
    }
}

