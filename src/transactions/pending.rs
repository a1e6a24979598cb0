use log::{info, warn};
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};

use crate::{
    error::{DashboardError, Result},
    rpc::{LedgerClient, Rejected},
    wallet::WalletSigner,
};

/// An ordered instruction list waiting for a blockhash and signatures.
/// Built fresh per action and consumed by [`submit`](Self::submit).
pub struct PendingTransaction {
    pub instructions: Vec<Instruction>,
    pub fee_payer: Pubkey,
    /// Keypairs that must sign besides the wallet (e.g. a new mint).
    pub co_signers: Vec<Keypair>,
}

impl PendingTransaction {
    pub fn new(instructions: Vec<Instruction>, fee_payer: Pubkey) -> Self {
        Self {
            instructions,
            fee_payer,
            co_signers: Vec::new(),
        }
    }

    pub fn with_co_signer(mut self, keypair: Keypair) -> Self {
        self.co_signers.push(keypair);
        self
    }

    /// Blockhash, wallet signature, co-signer signatures, send, confirm.
    pub async fn submit(
        self,
        ledger: &dyn LedgerClient,
        signer: &dyn WalletSigner,
    ) -> Result<Signature> {
        if !signer.is_connected() {
            return Err(DashboardError::WalletNotConnected);
        }

        let (blockhash, last_valid_block_height) = ledger
            .latest_blockhash()
            .await
            .map_err(|e| DashboardError::connectivity("Failed to fetch blockhash", e))?;

        let mut tx = Transaction::new_with_payer(&self.instructions, Some(&self.fee_payer));
        tx.message.recent_blockhash = blockhash;

        let mut tx = signer
            .sign_transaction(tx)
            .await
            .map_err(|e| DashboardError::Signing(format!("{e:#}")))?;
        if !self.co_signers.is_empty() {
            let co_signers: Vec<&Keypair> = self.co_signers.iter().collect();
            tx.try_partial_sign(co_signers.as_slice(), blockhash)
                .map_err(|e| DashboardError::Signing(e.to_string()))?;
        }
        if !tx.is_signed() {
            return Err(DashboardError::Signing(
                "transaction is missing required signatures".into(),
            ));
        }

        let signature = ledger.send_transaction(&tx).await.map_err(send_error)?;
        info!(
            "[SUBMIT] {signature} sent ({} instructions), valid until block {last_valid_block_height}",
            self.instructions.len()
        );

        match ledger
            .confirm_transaction(&signature, last_valid_block_height)
            .await
            .map_err(|e| DashboardError::connectivity("Failed to confirm transaction", e))?
        {
            None => {
                info!("[SUBMIT] {signature} confirmed");
                Ok(signature)
            }
            Some(err) => {
                warn!("[SUBMIT] {signature} failed on-chain: {err}");
                let raw = serde_json::to_string(&err).unwrap_or_else(|_| err.to_string());
                Err(DashboardError::LedgerRejected(raw))
            }
        }
    }
}

fn send_error(e: anyhow::Error) -> DashboardError {
    match e.downcast_ref::<Rejected>() {
        Some(Rejected(raw)) => DashboardError::LedgerRejected(raw.clone()),
        None => DashboardError::connectivity("Failed to send transaction", e),
    }
}

#[cfg(test)]
mod tests {
    use solana_sdk::{
        instruction::InstructionError, signature::Signer, system_instruction,
        transaction::TransactionError,
    };

    use super::*;
    use crate::testing::{MockLedger, MockSigner};

    fn transfer(signer: &MockSigner) -> PendingTransaction {
        let ix = system_instruction::transfer(&signer.pubkey(), &Pubkey::new_unique(), 5);
        PendingTransaction::new(vec![ix], signer.pubkey())
    }

    #[tokio::test]
    async fn disconnected_signer_is_refused() {
        let ledger = MockLedger::new();
        let signer = MockSigner::disconnected();
        let err = transfer(&signer).submit(&ledger, &signer).await.unwrap_err();
        assert!(matches!(err, DashboardError::WalletNotConnected));
        assert_eq!(signer.sign_calls(), 0);
    }

    #[tokio::test]
    async fn confirmed_transaction_returns_signature() {
        let ledger = MockLedger::new();
        let signer = MockSigner::new();
        let sig = transfer(&signer).submit(&ledger, &signer).await.unwrap();
        assert_eq!(ledger.sent()[0].signatures[0], sig);
    }

    #[tokio::test]
    async fn missing_co_signer_never_reaches_ledger() {
        let ledger = MockLedger::new();
        let signer = MockSigner::new();
        let other = Keypair::new();
        let ix = system_instruction::transfer(&other.pubkey(), &Pubkey::new_unique(), 5);
        let err = PendingTransaction::new(vec![ix], signer.pubkey())
            .submit(&ledger, &signer)
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::Signing(_)));
        assert!(ledger.sent().is_empty());
    }

    #[tokio::test]
    async fn on_chain_failure_carries_json_payload() {
        let ledger = MockLedger::new();
        ledger.fail_confirmation(TransactionError::InstructionError(
            0,
            InstructionError::Custom(1),
        ));
        let signer = MockSigner::new();
        let err = transfer(&signer).submit(&ledger, &signer).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"Transaction failed: {"InstructionError":[0,{"Custom":1}]}"#
        );
    }

    #[tokio::test]
    async fn preflight_rejection_is_a_ledger_error() {
        let ledger = MockLedger::new();
        ledger.reject_sends("Attempt to debit an account but found no record of a prior credit.");
        let signer = MockSigner::new();
        let err = transfer(&signer).submit(&ledger, &signer).await.unwrap_err();
        assert!(matches!(err, DashboardError::LedgerRejected(_)));
    }
}
