use log::info;
use serde::Serialize;
use solana_sdk::{native_token::LAMPORTS_PER_SOL, signature::Signature, system_instruction};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id,
    instruction::create_associated_token_account_idempotent,
};
use spl_token_2022::instruction::transfer_checked;

use super::{build_error, mint_info, parse_address, parse_ui_amount, PendingTransaction};
use crate::{
    error::{DashboardError, Result},
    rpc::LedgerClient,
    wallet::WalletSigner,
};

#[derive(Clone, Debug, Serialize)]
pub struct TransferReceipt {
    pub signature: String,
    pub recipient: String,
    /// Base units (lamports for SOL).
    pub amount: u64,
}

fn require_fields(recipient: &str, amount: &str) -> Result<()> {
    if recipient.trim().is_empty() || amount.trim().is_empty() {
        return Err(DashboardError::validation("Recipient and amount required"));
    }
    Ok(())
}

/// Send `amount` (UI units) of `mint` from the signer's associated account
/// to the recipient's, creating the latter when it does not exist yet.
pub async fn transfer_token(
    ledger: &dyn LedgerClient,
    signer: &dyn WalletSigner,
    mint: &str,
    recipient: &str,
    amount: &str,
) -> Result<TransferReceipt> {
    require_fields(recipient, amount)?;
    let recipient = parse_address(recipient, "recipient")?;
    let mint = parse_address(mint, "mint")?;
    if !signer.is_connected() {
        return Err(DashboardError::WalletNotConnected);
    }

    let (program, decimals) = mint_info(ledger, &mint).await?;
    let raw = parse_ui_amount(amount, decimals)?;
    let owner = signer.pubkey();
    let source = get_associated_token_address_with_program_id(&owner, &mint, &program);
    let destination = get_associated_token_address_with_program_id(&recipient, &mint, &program);

    let mut ixs = Vec::with_capacity(2);
    let exists = ledger
        .account(&destination)
        .await
        .map_err(|e| DashboardError::connectivity("Failed to look up recipient account", e))?
        .is_some();
    if !exists {
        info!("[TRANSFER] creating {destination} for {recipient}");
        ixs.push(create_associated_token_account_idempotent(
            &owner, &recipient, &mint, &program,
        ));
    }
    ixs.push(
        transfer_checked(&program, &source, &mint, &destination, &owner, &[], raw, decimals)
            .map_err(build_error)?,
    );

    let signature = PendingTransaction::new(ixs, owner).submit(ledger, signer).await?;
    info!("[TRANSFER] {raw} of {mint} -> {recipient}: {signature}");
    Ok(TransferReceipt {
        signature: signature.to_string(),
        recipient: recipient.to_string(),
        amount: raw,
    })
}

/// Native SOL transfer. The recipient must be a wallet address (on the
/// ed25519 curve), not a program-derived one.
pub async fn send_sol(
    ledger: &dyn LedgerClient,
    signer: &dyn WalletSigner,
    recipient: &str,
    amount_sol: &str,
) -> Result<TransferReceipt> {
    require_fields(recipient, amount_sol)?;
    let recipient = parse_address(recipient, "recipient")?;
    if !recipient.is_on_curve() {
        return Err(DashboardError::validation(format!(
            "{recipient} is not a wallet address"
        )));
    }
    let lamports = parse_ui_amount(amount_sol, 9)?;
    if !signer.is_connected() {
        return Err(DashboardError::WalletNotConnected);
    }

    let from = signer.pubkey();
    let ix = system_instruction::transfer(&from, &recipient, lamports);
    let signature: Signature = PendingTransaction::new(vec![ix], from)
        .submit(ledger, signer)
        .await?;
    info!(
        "[SEND_SOL] {} SOL -> {recipient}: {signature}",
        lamports as f64 / LAMPORTS_PER_SOL as f64
    );
    Ok(TransferReceipt {
        signature: signature.to_string(),
        recipient: recipient.to_string(),
        amount: lamports,
    })
}
