use crate::error::SourceError;
use crate::AccountSource;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::Arc;

/// Reads LP token holdings of a wallet.
#[derive(Clone)]
pub struct PositionReader {
    source: Arc<dyn AccountSource>,
}

impl PositionReader {
    /// Creates a reader over `source`.
    pub fn new(source: Arc<dyn AccountSource>) -> Self {
        Self { source }
    }

    /// Non-zero balances of every mint held by `wallet`, summed across its
    /// token accounts. One owner-indexed read per call.
    pub async fn balances(&self, wallet: &Pubkey) -> Result<HashMap<Pubkey, u64>, SourceError> {
        let accounts = self.source.token_accounts(wallet).await?;
        let mut balances: HashMap<Pubkey, u64> = HashMap::new();
        for account in accounts
            .iter()
            .filter(|account| account.owner == *wallet && account.amount > 0)
        {
            let total = balances.entry(account.mint).or_default();
            *total = total.saturating_add(account.amount);
        }
        Ok(balances)
    }
}
