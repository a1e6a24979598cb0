//! In-process doubles for the ledger and signer seams.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use solana_program::{program_option::COption, program_pack::Pack};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::{Transaction, TransactionError},
};
use spl_pod::optional_keys::OptionalNonZeroPubkey;
use spl_token_2022::{
    extension::{metadata_pointer::MetadataPointer, *},
    state::Mint,
};
use spl_token_metadata_interface::state::TokenMetadata;
use tokio::sync::Notify;

use crate::{
    rpc::{AccountSnapshot, LedgerClient, OwnedTokenAccount, Rejected},
    wallet::WalletSigner,
};

pub const LAST_VALID_BLOCK_HEIGHT: u64 = 150;

#[derive(Default)]
pub struct MockLedger {
    token_accounts: Mutex<HashMap<(Pubkey, Pubkey), Vec<OwnedTokenAccount>>>,
    accounts: Mutex<HashMap<Pubkey, AccountSnapshot>>,
    balances: Mutex<HashMap<Pubkey, u64>>,
    enumeration_error: Mutex<Option<String>>,
    send_rejection: Mutex<Option<String>>,
    confirm_error: Mutex<Option<TransactionError>>,
    gate: Mutex<Option<Arc<Notify>>>,
    enumerations: AtomicUsize,
    sent: Mutex<Vec<Transaction>>,
    airdrops: Mutex<Vec<(Pubkey, u64)>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token_accounts(
        self,
        owner: Pubkey,
        program: Pubkey,
        accounts: Vec<OwnedTokenAccount>,
    ) -> Self {
        self.token_accounts
            .lock()
            .unwrap()
            .insert((owner, program), accounts);
        self
    }

    pub fn insert_account(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(
            address,
            AccountSnapshot {
                owner,
                lamports: 1_461_600,
                data,
            },
        );
    }

    pub fn set_balance(&self, address: Pubkey, lamports: u64) {
        self.balances.lock().unwrap().insert(address, lamports);
    }

    pub fn fail_enumeration(&self, msg: &str) {
        *self.enumeration_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn reject_sends(&self, msg: &str) {
        *self.send_rejection.lock().unwrap() = Some(msg.to_string());
    }

    pub fn fail_confirmation(&self, err: TransactionError) {
        *self.confirm_error.lock().unwrap() = Some(err);
    }

    /// Block owner enumeration until the returned notify is signalled.
    pub fn gate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub fn enumerations(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn airdrops(&self) -> Vec<(Pubkey, u64)> {
        self.airdrops.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    fn endpoint(&self) -> String {
        "mock://ledger".into()
    }

    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<Vec<OwnedTokenAccount>> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(msg) = self.enumeration_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        Ok(self
            .token_accounts
            .lock()
            .unwrap()
            .get(&(*owner, *token_program))
            .cloned()
            .unwrap_or_default())
    }

    async fn account(&self, address: &Pubkey) -> Result<Option<AccountSnapshot>> {
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn multiple_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<AccountSnapshot>>> {
        let accounts = self.accounts.lock().unwrap();
        Ok(addresses.iter().map(|a| accounts.get(a).cloned()).collect())
    }

    async fn balance(&self, address: &Pubkey) -> Result<u64> {
        Ok(self.balances.lock().unwrap().get(address).copied().unwrap_or(0))
    }

    async fn latest_blockhash(&self) -> Result<(Hash, u64)> {
        Ok((Hash::new_unique(), LAST_VALID_BLOCK_HEIGHT))
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        Ok(890_880 + 6_960 * data_len as u64)
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature> {
        if let Some(msg) = self.send_rejection.lock().unwrap().clone() {
            return Err(Rejected(msg).into());
        }
        tx.verify().map_err(|e| anyhow!("signature verification failed: {e}"))?;
        self.sent.lock().unwrap().push(tx.clone());
        Ok(tx.signatures[0])
    }

    async fn confirm_transaction(
        &self,
        _signature: &Signature,
        _last_valid_block_height: u64,
    ) -> Result<Option<TransactionError>> {
        Ok(self.confirm_error.lock().unwrap().clone())
    }

    async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature> {
        self.airdrops.lock().unwrap().push((*address, lamports));
        Ok(Signature::new_unique())
    }
}

/// Keypair-backed signer that counts how often it was asked to sign.
pub struct MockSigner {
    keypair: Keypair,
    connected: bool,
    calls: AtomicUsize,
}

impl MockSigner {
    pub fn new() -> Self {
        Self {
            keypair: Keypair::new(),
            connected: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new()
        }
    }

    pub fn sign_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for MockSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn sign_transaction(&self, mut tx: Transaction) -> Result<Transaction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let blockhash = tx.message.recent_blockhash;
        tx.try_partial_sign(&[&self.keypair], blockhash)?;
        Ok(tx)
    }
}

/* --------------------------------------------------------------------- */
/*  Account data builders                                                */
/* --------------------------------------------------------------------- */

/// Base-only mint, valid for both token programs.
pub fn plain_mint_data(decimals: u8) -> Vec<u8> {
    let mint = Mint {
        mint_authority: COption::Some(Pubkey::new_unique()),
        supply: 1_000_000,
        decimals,
        is_initialized: true,
        freeze_authority: COption::None,
    };
    let mut data = vec![0u8; Mint::LEN];
    Mint::pack(mint, &mut data).unwrap();
    data
}

/// Token-2022 mint carrying a metadata pointer to itself and the metadata.
pub fn mint_with_metadata(mint: Pubkey, decimals: u8, name: &str, symbol: &str, uri: &str) -> Vec<u8> {
    let metadata = TokenMetadata {
        update_authority: OptionalNonZeroPubkey::try_from(Some(mint)).unwrap(),
        mint,
        name: name.into(),
        symbol: symbol.into(),
        uri: uri.into(),
        additional_metadata: vec![],
    };
    let base_len =
        ExtensionType::try_calculate_account_len::<Mint>(&[ExtensionType::MetadataPointer]).unwrap();
    let mut data = vec![0u8; base_len + metadata.tlv_size_of().unwrap()];

    let mut state = StateWithExtensionsMut::<Mint>::unpack_uninitialized(&mut data).unwrap();
    let pointer = state.init_extension::<MetadataPointer>(true).unwrap();
    pointer.metadata_address = OptionalNonZeroPubkey::try_from(Some(mint)).unwrap();
    state.base = Mint {
        mint_authority: COption::Some(Pubkey::new_unique()),
        supply: 0,
        decimals,
        is_initialized: true,
        freeze_authority: COption::None,
    };
    state.pack_base();
    state.init_account_type().unwrap();
    state.init_variable_len_extension(&metadata, false).unwrap();
    data
}
