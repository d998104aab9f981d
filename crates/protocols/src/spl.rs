//! SPL token account and mint layouts.

use crate::layout::{AccountLayout, FieldKind, FieldSpec, LayoutError};
use solana_sdk::pubkey::Pubkey;

/// SPL Token program ID.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Token account: mint, owner and amount lead the 165-byte record.
pub const TOKEN_ACCOUNT_LAYOUT: AccountLayout = AccountLayout {
    name: "spl_token_account",
    size: 165,
    fields: &[
        FieldSpec::new("mint", 0, FieldKind::Pubkey),
        FieldSpec::new("owner", 32, FieldKind::Pubkey),
        FieldSpec::new("amount", 64, FieldKind::U64),
    ],
};

/// Mint: supply and decimals follow the optional mint authority.
pub const MINT_LAYOUT: AccountLayout = AccountLayout {
    name: "spl_mint",
    size: 82,
    fields: &[
        FieldSpec::new("supply", 36, FieldKind::U64),
        FieldSpec::new("decimals", 44, FieldKind::U8),
    ],
};

/// Decoded token account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccountInfo {
    /// Mint of the held token.
    pub mint: Pubkey,
    /// Wallet owning the account.
    pub owner: Pubkey,
    /// Raw balance.
    pub amount: u64,
}

impl TokenAccountInfo {
    /// Decodes a token account.
    pub fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        let decoded = TOKEN_ACCOUNT_LAYOUT.decode(data)?;
        Ok(Self {
            mint: decoded.pubkey("mint")?,
            owner: decoded.pubkey("owner")?,
            amount: decoded.u64("amount")?,
        })
    }
}

/// Decoded mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintInfo {
    /// Raw total supply.
    pub supply: u64,
    /// Decimal places.
    pub decimals: u8,
}

impl MintInfo {
    /// Decodes a mint account.
    pub fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        let decoded = MINT_LAYOUT.decode(data)?;
        Ok(Self {
            supply: decoded.u64("supply")?,
            decimals: decoded.u8("decimals")?,
        })
    }
}

/// Encodes a token account, for fixtures.
#[cfg(any(test, feature = "test-fixtures"))]
pub fn encode_token_account(mint: &Pubkey, owner: &Pubkey, amount: u64) -> Vec<u8> {
    let mut data = vec![0u8; TOKEN_ACCOUNT_LAYOUT.size];
    data[0..32].copy_from_slice(mint.as_ref());
    data[32..64].copy_from_slice(owner.as_ref());
    data[64..72].copy_from_slice(&amount.to_le_bytes());
    data
}

/// Encodes a mint account, for fixtures.
#[cfg(any(test, feature = "test-fixtures"))]
pub fn encode_mint(supply: u64, decimals: u8) -> Vec<u8> {
    let mut data = vec![0u8; MINT_LAYOUT.size];
    data[36..44].copy_from_slice(&supply.to_le_bytes());
    data[44] = decimals;
    data[45] = 1; // is_initialized
    data
}
