//! Burning supply and closing emptied token accounts.

use log::info;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address_with_program_id;
use spl_token_2022::{
    extension::StateWithExtensions,
    instruction::{burn_checked, close_account},
    state::Account,
};

use super::{build_error, mint_info, parse_address, parse_ui_amount, PendingTransaction};
use crate::{
    error::{DashboardError, Result},
    rpc::LedgerClient,
    wallet::WalletSigner,
};

#[derive(Clone, Debug, Serialize)]
pub struct AccountAction {
    pub signature: String,
    pub account: String,
    pub amount: u64,
}

async fn owned_balance(ledger: &dyn LedgerClient, account: &Pubkey) -> Result<u64> {
    let snapshot = ledger
        .account(account)
        .await
        .map_err(|e| DashboardError::connectivity("Failed to load token account", e))?
        .ok_or_else(|| DashboardError::validation(format!("Token account {account} does not exist")))?;
    let state = StateWithExtensions::<Account>::unpack(&snapshot.data)
        .map_err(|e| DashboardError::validation(format!("{account} is not a token account: {e}")))?;
    Ok(state.base.amount)
}

/// Burn `amount` (UI units) from the signer's associated account for `mint`.
pub async fn burn_tokens(
    ledger: &dyn LedgerClient,
    signer: &dyn WalletSigner,
    mint: &str,
    amount: &str,
) -> Result<AccountAction> {
    let mint = parse_address(mint, "mint")?;
    if !signer.is_connected() {
        return Err(DashboardError::WalletNotConnected);
    }
    let (program, decimals) = mint_info(ledger, &mint).await?;
    let raw = parse_ui_amount(amount, decimals)?;
    let owner = signer.pubkey();
    let account = get_associated_token_address_with_program_id(&owner, &mint, &program);

    let balance = owned_balance(ledger, &account).await?;
    if raw > balance {
        return Err(DashboardError::validation(format!(
            "Cannot burn {raw}, account holds {balance}"
        )));
    }

    let ix = burn_checked(&program, &account, &mint, &owner, &[], raw, decimals).map_err(build_error)?;
    let signature = PendingTransaction::new(vec![ix], owner).submit(ledger, signer).await?;
    info!("[BURN] {raw} of {mint} from {account}: {signature}");
    Ok(AccountAction {
        signature: signature.to_string(),
        account: account.to_string(),
        amount: raw,
    })
}

/// Close the signer's associated account for `mint`, reclaiming its rent.
/// The account must already be empty.
pub async fn close_token_account(
    ledger: &dyn LedgerClient,
    signer: &dyn WalletSigner,
    mint: &str,
) -> Result<AccountAction> {
    let mint = parse_address(mint, "mint")?;
    if !signer.is_connected() {
        return Err(DashboardError::WalletNotConnected);
    }
    let (program, _) = mint_info(ledger, &mint).await?;
    let owner = signer.pubkey();
    let account = get_associated_token_address_with_program_id(&owner, &mint, &program);

    let balance = owned_balance(ledger, &account).await?;
    if balance != 0 {
        return Err(DashboardError::validation(format!(
            "Account {account} still holds {balance}; burn or transfer it first"
        )));
    }

    let ix = close_account(&program, &account, &owner, &owner, &[]).map_err(build_error)?;
    let signature = PendingTransaction::new(vec![ix], owner).submit(ledger, signer).await?;
    info!("[CLOSE] {account} closed: {signature}");
    Ok(AccountAction {
        signature: signature.to_string(),
        account: account.to_string(),
        amount: 0,
    })
}
