//! Ledger RPC boundary.
//!
//! Everything the dashboard asks of a cluster goes through [`LedgerClient`],
//! so the holdings and transaction layers never touch a concrete client.

pub mod client;
pub mod subscribe;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use solana_sdk::{
    hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction,
    transaction::TransactionError,
};

use crate::config::{Cluster, Settings};

pub use client::RpcLedger;
pub use subscribe::watch_balance;

/// A token account as returned by an owner enumeration, already decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedTokenAccount {
    pub address: Pubkey,
    pub mint: Pubkey,
    pub amount: u64,
    /// Present when the node returned parsed data.
    pub decimals: Option<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub owner: Pubkey,
    pub lamports: u64,
    pub data: Vec<u8>,
}

/// The ledger refused the transaction (preflight simulation or execution).
/// Carried inside `anyhow::Error` so callers can tell it from a transport
/// failure.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct Rejected(pub String);

#[async_trait]
pub trait LedgerClient: Send + Sync {
    fn endpoint(&self) -> String;

    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<Vec<OwnedTokenAccount>>;

    async fn account(&self, address: &Pubkey) -> Result<Option<AccountSnapshot>>;

    async fn multiple_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<AccountSnapshot>>>;

    async fn balance(&self, address: &Pubkey) -> Result<u64>;

    /// Latest blockhash together with the last block height it stays valid for.
    async fn latest_blockhash(&self) -> Result<(Hash, u64)>;

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64>;

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature>;

    /// Poll until the signature is confirmed or the validity window closes.
    /// `Ok(Some(_))` is an on-chain failure.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<Option<TransactionError>>;

    async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature>;
}

/// Resolves the ledger handle for a cluster.
pub trait LedgerFactory: Send + Sync {
    fn connect(&self, cluster: Cluster) -> Arc<dyn LedgerClient>;
}

/// Builds [`RpcLedger`]s from the endpoints in [`Settings`].
pub struct RpcLedgerFactory {
    settings: Settings,
}

impl RpcLedgerFactory {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl LedgerFactory for RpcLedgerFactory {
    fn connect(&self, cluster: Cluster) -> Arc<dyn LedgerClient> {
        Arc::new(RpcLedger::new(
            self.settings.rpc_url(cluster),
            std::time::Duration::from_millis(self.settings.confirm_poll_ms),
        ))
    }
}
