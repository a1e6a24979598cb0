use log::info;
use solana_sdk::{native_token::LAMPORTS_PER_SOL, pubkey::Pubkey, signature::Signature};

use crate::{
    config::Cluster,
    error::{DashboardError, Result},
    rpc::LedgerClient,
};

/// Ask the cluster faucet for `lamports` and wait for the grant to confirm.
pub async fn request_airdrop(
    ledger: &dyn LedgerClient,
    cluster: Cluster,
    address: &Pubkey,
    lamports: u64,
) -> Result<Signature> {
    if !cluster.has_faucet() {
        return Err(DashboardError::validation(format!("{cluster} has no faucet")));
    }
    if lamports == 0 {
        return Err(DashboardError::validation("Airdrop amount must be greater than zero"));
    }

    let (_, last_valid_block_height) = ledger
        .latest_blockhash()
        .await
        .map_err(|e| DashboardError::connectivity("Airdrop failed", e))?;
    let signature = ledger
        .request_airdrop(address, lamports)
        .await
        .map_err(|e| DashboardError::connectivity("Airdrop failed", e))?;

    if let Some(err) = ledger
        .confirm_transaction(&signature, last_valid_block_height)
        .await
        .map_err(|e| DashboardError::connectivity("Airdrop failed", e))?
    {
        let raw = serde_json::to_string(&err).unwrap_or_else(|_| err.to_string());
        return Err(DashboardError::LedgerRejected(raw));
    }

    info!(
        "[AIRDROP] {} SOL added to {address} ({signature})",
        lamports as f64 / LAMPORTS_PER_SOL as f64
    );
    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLedger;

    #[tokio::test]
    async fn mainnet_has_no_faucet() {
        let ledger = MockLedger::new();
        let err = request_airdrop(&ledger, Cluster::MainnetBeta, &Pubkey::new_unique(), 1)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(ledger.airdrops().is_empty());
    }

    #[tokio::test]
    async fn devnet_grant_is_requested() {
        let ledger = MockLedger::new();
        let to = Pubkey::new_unique();
        request_airdrop(&ledger, Cluster::Devnet, &to, 2 * LAMPORTS_PER_SOL)
            .await
            .unwrap();
        assert_eq!(ledger.airdrops(), vec![(to, 2 * LAMPORTS_PER_SOL)]);
    }

    #[tokio::test]
    async fn failed_confirmation_is_a_rejection() {
        let ledger = MockLedger::new();
        ledger.fail_confirmation(solana_sdk::transaction::TransactionError::AccountNotFound);
        let err = request_airdrop(&ledger, Cluster::Testnet, &Pubkey::new_unique(), LAMPORTS_PER_SOL)
            .await
            .unwrap_err();
        match err {
            DashboardError::LedgerRejected(raw) => assert!(raw.contains("AccountNotFound")),
            other => panic!("expected a rejection, got {other:?}"),
        }
        assert_eq!(ledger.airdrops().len(), 1);
    }
}
