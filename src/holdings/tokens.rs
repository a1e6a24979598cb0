//! Fungible holdings: token-2022 accounts resolved against their mints.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, warn};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use spl_token_2022::{
    extension::{BaseStateWithExtensions, StateWithExtensions},
    state::Mint,
};
use spl_token_metadata_interface::state::TokenMetadata;

use super::HoldingsSource;
use crate::rpc::{LedgerClient, OwnedTokenAccount};

pub const UNKNOWN_TOKEN: &str = "Unknown Token";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TokenHolding {
    pub account: String,
    pub mint: String,
    pub raw_amount: u64,
    pub decimals: u8,
    /// `raw_amount` scaled by `decimals`, trailing zeros trimmed.
    pub amount: String,
    pub symbol: Option<String>,
    pub name: String,
    pub uri: Option<String>,
}

impl TokenHolding {
    fn new(account: &OwnedTokenAccount, decimals: u8, metadata: Option<TokenMetadata>) -> Self {
        let non_empty = |s: String| {
            let s = s.trim_end_matches('\0').trim().to_string();
            (!s.is_empty()).then_some(s)
        };
        let (name, symbol, uri) = match metadata {
            Some(md) => (non_empty(md.name), non_empty(md.symbol), non_empty(md.uri)),
            None => (None, None, None),
        };
        Self {
            account: account.address.to_string(),
            mint: account.mint.to_string(),
            raw_amount: account.amount,
            decimals,
            amount: spl_token::amount_to_ui_amount_string_trimmed(account.amount, decimals),
            symbol,
            name: name.unwrap_or_else(|| UNKNOWN_TOKEN.to_string()),
            uri,
        }
    }
}

/// Decimals and the embedded metadata extension (if any) of a mint account.
pub fn decode_mint(data: &[u8]) -> Result<(u8, Option<TokenMetadata>)> {
    let state = StateWithExtensions::<Mint>::unpack(data).map_err(|e| anyhow!("not a mint: {e}"))?;
    let metadata = state.get_variable_len_extension::<TokenMetadata>().ok();
    Ok((state.base.decimals, metadata))
}

pub struct TokenSource;

async fn resolve(ledger: &dyn LedgerClient, account: &OwnedTokenAccount) -> Result<TokenHolding> {
    let mint = ledger
        .account(&account.mint)
        .await?
        .ok_or_else(|| anyhow!("mint {} not found", account.mint))?;
    let (decimals, metadata) = decode_mint(&mint.data)?;
    if metadata.is_none() {
        debug!("[HOLDINGS] mint {} carries no metadata", account.mint);
    }
    Ok(TokenHolding::new(account, decimals, metadata))
}

#[async_trait]
impl HoldingsSource for TokenSource {
    type Item = TokenHolding;
    const LABEL: &'static str = "tokens";

    async fn load(&self, ledger: &dyn LedgerClient, owner: &Pubkey) -> Result<Vec<TokenHolding>> {
        let accounts = ledger
            .token_accounts_by_owner(owner, &spl_token_2022::id())
            .await?;

        let resolved = join_all(accounts.iter().map(|acc| resolve(ledger, acc))).await;

        Ok(accounts
            .iter()
            .zip(resolved)
            .filter_map(|(acc, res)| match res {
                Ok(holding) => Some(holding),
                Err(e) => {
                    warn!("[HOLDINGS] dropping token account {}: {e:#}", acc.address);
                    None
                }
            })
            .collect())
    }
}
