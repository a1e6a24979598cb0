//! Holdings Fetcher.
//!
//! A [`HoldingsFetcher`] turns `(wallet, cluster)` into a display-ready
//! snapshot of what that wallet owns. Each refresh replaces the snapshot
//! wholesale; there is no merging with earlier results.
//!
//! Two sources exist: [`TokenSource`] (token-2022 accounts with the mint's
//! metadata extension) and [`NftSource`] (legacy token accounts holding
//! exactly one unit, resolved through their Metaplex metadata account).

pub mod fetcher;
pub mod nfts;
pub mod tokens;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use crate::{config::Cluster, rpc::LedgerClient};

pub use fetcher::HoldingsFetcher;
pub use nfts::{NftHolding, NftSource};
pub use tokens::{TokenHolding, TokenSource};

pub const CONNECT_WALLET: &str = "Connect your wallet";

#[derive(Clone, Debug, Serialize)]
pub struct HoldingsSnapshot<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub cluster: Option<Cluster>,
    /// Base58 address the snapshot was fetched for.
    pub owner: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> Default for HoldingsSnapshot<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
            cluster: None,
            owner: None,
            fetched_at: None,
        }
    }
}

/// One kind of holding the fetcher can enumerate.
#[async_trait]
pub trait HoldingsSource: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    /// Plural noun used in error messages ("tokens", "NFTs").
    const LABEL: &'static str;

    /// Enumerate and resolve everything `owner` holds. An `Err` means the
    /// enumeration itself failed; per-item failures are dropped inside.
    async fn load(&self, ledger: &dyn LedgerClient, owner: &Pubkey) -> Result<Vec<Self::Item>>;
}
