//! Signing capability handed to the transaction layer.

use std::path::Path;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
    transaction::Transaction,
};

/// Anything able to add the fee payer's signature to a transaction: a local
/// keypair, a hardware device, a remote wallet.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    fn is_connected(&self) -> bool {
        true
    }

    /// Sign against the blockhash already set on the message. Other
    /// signatures present on the transaction must be preserved.
    async fn sign_transaction(&self, tx: Transaction) -> Result<Transaction>;
}

pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Solana CLI keypair file (JSON array of 64 bytes).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let keypair = read_keypair_file(path.as_ref())
            .map_err(|e| anyhow!("reading keypair {:?}: {e}", path.as_ref()))?;
        Ok(Self::new(keypair))
    }
}

#[async_trait]
impl WalletSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(&self, mut tx: Transaction) -> Result<Transaction> {
        let blockhash = tx.message.recent_blockhash;
        tx.try_partial_sign(&[&self.keypair], blockhash)?;
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{hash::Hash, system_instruction};

    #[tokio::test]
    async fn keypair_signer_fills_payer_slot() {
        let signer = KeypairSigner::new(Keypair::new());
        let ix = system_instruction::transfer(&signer.pubkey(), &Pubkey::new_unique(), 1);
        let mut tx = Transaction::new_with_payer(&[ix], Some(&signer.pubkey()));
        tx.message.recent_blockhash = Hash::new_unique();

        let signed = signer.sign_transaction(tx).await.unwrap();
        assert!(signed.is_signed());
        assert!(signed.verify().is_ok());
    }

    #[test]
    fn reads_cli_keypair_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id.json");
        let keypair = Keypair::new();
        std::fs::write(&path, serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap()).unwrap();

        let signer = KeypairSigner::from_file(&path).unwrap();
        assert_eq!(signer.pubkey(), keypair.pubkey());
        assert!(KeypairSigner::from_file(dir.path().join("missing.json")).is_err());
    }
}
