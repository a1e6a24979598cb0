//! Everything that signs and submits.
//!
//! Each operation validates its input, assembles a [`PendingTransaction`]
//! and hands it to [`PendingTransaction::submit`]. Nothing is retried and
//! nothing is deduplicated: submitting twice creates two transactions.

pub mod airdrop;
pub mod burn_close;
pub mod create_token;
pub mod pending;
pub mod transfer;

use std::str::FromStr;

use solana_program::program_error::ProgramError;
use solana_sdk::pubkey::Pubkey;

use crate::{
    error::{DashboardError, Result},
    rpc::LedgerClient,
};

pub use airdrop::request_airdrop;
pub use burn_close::{burn_tokens, close_token_account};
pub use create_token::{create_token, CreatedToken, TokenCreationRequest};
pub use pending::PendingTransaction;
pub use transfer::{send_sol, transfer_token};

pub(crate) fn parse_address(raw: &str, what: &str) -> Result<Pubkey> {
    Pubkey::from_str(raw.trim())
        .map_err(|_| DashboardError::validation(format!("Invalid {what} address: `{}`", raw.trim())))
}

pub(crate) fn build_error(e: ProgramError) -> DashboardError {
    DashboardError::validation(format!("could not build instruction: {e}"))
}

/// Parse a decimal amount such as `"12.5"` into base units.
pub(crate) fn parse_ui_amount(raw: &str, decimals: u8) -> Result<u64> {
    let raw = raw.trim();
    let invalid = || DashboardError::validation(format!("Invalid amount `{raw}`"));
    let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
    if (whole.is_empty() && frac.is_empty())
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    if frac.len() > decimals as usize {
        return Err(DashboardError::validation(format!(
            "Amount `{raw}` has more than {decimals} decimal places"
        )));
    }
    let scale = 10u64
        .checked_pow(decimals as u32)
        .ok_or_else(invalid)?;
    let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
    let frac_units: u64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<width$}", width = decimals as usize);
        padded.parse().map_err(|_| invalid())?
    };
    let amount = whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(invalid)?;
    if amount == 0 {
        return Err(DashboardError::validation("Amount must be greater than zero"));
    }
    Ok(amount)
}

/// Owner program and decimals of `mint`.
pub(crate) async fn mint_info(ledger: &dyn LedgerClient, mint: &Pubkey) -> Result<(Pubkey, u8)> {
    let account = ledger
        .account(mint)
        .await
        .map_err(|e| DashboardError::connectivity("Failed to load mint", e))?
        .ok_or_else(|| DashboardError::validation(format!("Mint {mint} does not exist")))?;
    if account.owner != spl_token::id() && account.owner != spl_token_2022::id() {
        return Err(DashboardError::validation(format!(
            "{mint} is not owned by a token program"
        )));
    }
    let (decimals, _) = crate::holdings::tokens::decode_mint(&account.data)
        .map_err(|e| DashboardError::validation(e.to_string()))?;
    Ok((account.owner, decimals))
}
