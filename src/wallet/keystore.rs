//! DEMO ONLY: local wallet kept as a plaintext secret key.
//!
//! The secret key is written as a JSON byte array under `walletSecretKey`
//! in whatever [`KeyValueStore`] backs it, unencrypted. Anyone who can read
//! the store owns the wallet. Use a keypair file or a hardware signer for
//! anything holding value.

use log::{info, warn};
use solana_sdk::signature::{Keypair, Signer};

use super::signer::KeypairSigner;
use crate::{
    error::{DashboardError, Result},
    state::KeyValueStore,
};

pub const SECRET_KEY_STORAGE_KEY: &str = "walletSecretKey";

pub struct DemoPlaintextKeystore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> DemoPlaintextKeystore<S> {
    pub fn new(store: S) -> Self {
        warn!("[KEYSTORE] plaintext demo keystore in use, secret key is stored unencrypted");
        Self { store }
    }

    pub fn load(&self) -> Result<Option<Keypair>> {
        let Some(raw) = self.store.get(SECRET_KEY_STORAGE_KEY)? else {
            return Ok(None);
        };
        let bytes: Vec<u8> = serde_json::from_str(&raw)
            .map_err(|e| DashboardError::Storage(format!("stored secret key is not a byte array: {e}")))?;
        let keypair = Keypair::from_bytes(&bytes)
            .map_err(|e| DashboardError::Storage(format!("stored secret key is invalid: {e}")))?;
        Ok(Some(keypair))
    }

    /// Generate and persist a fresh keypair. Refuses to replace an existing one.
    pub fn create(&self) -> Result<Keypair> {
        if self.store.get(SECRET_KEY_STORAGE_KEY)?.is_some() {
            return Err(DashboardError::validation("A wallet is already generated"));
        }
        let keypair = Keypair::new();
        let encoded = serde_json::to_string(&keypair.to_bytes().to_vec())
            .map_err(|e| DashboardError::Storage(e.to_string()))?;
        self.store.set(SECRET_KEY_STORAGE_KEY, &encoded)?;
        info!("[KEYSTORE] created wallet {}", keypair.pubkey());
        Ok(keypair)
    }

    pub fn export_base58(&self) -> Result<Option<String>> {
        Ok(self
            .load()?
            .map(|kp| bs58::encode(kp.to_bytes()).into_string()))
    }

    pub fn signer(&self) -> Result<Option<KeypairSigner>> {
        Ok(self.load()?.map(KeypairSigner::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStore;
    use crate::wallet::WalletSigner;

    #[test]
    fn create_then_load_round_trips() {
        let keystore = DemoPlaintextKeystore::new(MemoryStore::new());
        assert!(keystore.load().unwrap().is_none());

        let created = keystore.create().unwrap();
        let loaded = keystore.load().unwrap().unwrap();
        assert_eq!(created.pubkey(), loaded.pubkey());

        let signer = keystore.signer().unwrap().unwrap();
        assert_eq!(signer.pubkey(), created.pubkey());
    }

    #[test]
    fn second_create_is_refused() {
        let keystore = DemoPlaintextKeystore::new(MemoryStore::new());
        keystore.create().unwrap();
        let err = keystore.create().unwrap_err();
        assert_eq!(err.to_string(), "A wallet is already generated");
    }

    #[test]
    fn export_is_base58_of_all_64_bytes() {
        let keystore = DemoPlaintextKeystore::new(MemoryStore::new());
        let kp = keystore.create().unwrap();
        let exported = keystore.export_base58().unwrap().unwrap();
        assert_eq!(bs58::decode(exported).into_vec().unwrap(), kp.to_bytes().to_vec());
    }

    #[test]
    fn garbage_in_store_is_a_storage_error() {
        let store = MemoryStore::new();
        store.set(SECRET_KEY_STORAGE_KEY, "[1,2,3]").unwrap();
        let keystore = DemoPlaintextKeystore::new(store);
        assert!(matches!(keystore.load(), Err(DashboardError::Storage(_))));
    }
}
