//! Generation-ticketed refresh of a [`HoldingsSource`] into a shared snapshot.

use std::{
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

use chrono::Utc;
use log::{debug, info, warn};
use solana_sdk::pubkey::Pubkey;
use tokio::sync::RwLock;

use super::{HoldingsSnapshot, HoldingsSource, CONNECT_WALLET};
use crate::{
    config::{Cluster, StaleFetchPolicy},
    rpc::LedgerClient,
};

/// Holds the latest snapshot for one [`HoldingsSource`].
///
/// Every refresh takes a generation ticket. Under
/// [`StaleFetchPolicy::Overwrite`] whichever fetch resolves last is what
/// gets shown, even if the selection changed in between. Under
/// [`StaleFetchPolicy::Discard`] only the newest ticket may commit.
pub struct HoldingsFetcher<S: HoldingsSource> {
    source: S,
    policy: StaleFetchPolicy,
    state: RwLock<HoldingsSnapshot<S::Item>>,
    generation: AtomicU64,
    /// Tickets at or below this value never commit.
    cancelled_through: AtomicU64,
}

impl<S: HoldingsSource> HoldingsFetcher<S> {
    pub fn new(source: S, policy: StaleFetchPolicy) -> Self {
        Self {
            source,
            policy,
            state: RwLock::new(HoldingsSnapshot::default()),
            generation: AtomicU64::new(0),
            cancelled_through: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> StaleFetchPolicy {
        self.policy
    }

    pub async fn snapshot(&self) -> HoldingsSnapshot<S::Item> {
        self.state.read().await.clone()
    }

    /// Invalidate every fetch currently in flight, whatever the policy.
    pub fn cancel_pending(&self) {
        let current = self.generation.load(Ordering::SeqCst);
        self.cancelled_through.fetch_max(current, Ordering::SeqCst);
        debug!("[HOLDINGS] {} fetches up to #{current} cancelled", S::LABEL);
    }

    /// Re-enumerate holdings for `wallet` (or the signer when `wallet` is
    /// blank) and return the snapshot as it stands afterwards.
    pub async fn refresh(
        &self,
        ledger: &dyn LedgerClient,
        wallet: &str,
        signer: Option<Pubkey>,
        cluster: Cluster,
    ) -> HoldingsSnapshot<S::Item> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let target = match wallet.trim() {
            "" => signer.map(|p| p.to_string()),
            addr => Some(addr.to_string()),
        };
        let Some(target) = target else {
            self.commit(ticket, failed(cluster, None, CONNECT_WALLET.to_string()))
                .await;
            return self.snapshot().await;
        };

        {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error = None;
        }

        let owner = match Pubkey::from_str(&target) {
            Ok(owner) => owner,
            Err(e) => {
                warn!("[HOLDINGS] `{target}` is not a valid address: {e}");
                let msg = format!("Failed to load {}: invalid wallet address `{target}`", S::LABEL);
                self.commit(ticket, failed(cluster, Some(target), msg)).await;
                return self.snapshot().await;
            }
        };

        let next = match self.source.load(ledger, &owner).await {
            Ok(items) => {
                info!(
                    "[HOLDINGS] {} {} for {owner} on {cluster}",
                    items.len(),
                    S::LABEL
                );
                HoldingsSnapshot {
                    items,
                    loading: false,
                    error: None,
                    cluster: Some(cluster),
                    owner: Some(target),
                    fetched_at: Some(Utc::now()),
                }
            }
            Err(e) => {
                warn!("[HOLDINGS] enumerating {} for {owner} failed: {e:#}", S::LABEL);
                let msg = format!("Failed to load {}: {e}", S::LABEL);
                failed(cluster, Some(target), msg)
            }
        };
        self.commit(ticket, next).await;
        self.snapshot().await
    }

    async fn commit(&self, ticket: u64, next: HoldingsSnapshot<S::Item>) -> bool {
        let mut state = self.state.write().await;
        let latest = self.generation.load(Ordering::SeqCst);
        if ticket <= self.cancelled_through.load(Ordering::SeqCst) {
            debug!("[HOLDINGS] fetch #{ticket} was cancelled, dropping result");
            // Nothing newer is in flight to clear the flag later.
            if ticket == latest {
                state.loading = false;
            }
            return false;
        }
        if ticket != latest {
            match self.policy {
                StaleFetchPolicy::Discard => {
                    debug!("[HOLDINGS] fetch #{ticket} superseded by #{latest}, dropping result");
                    return false;
                }
                StaleFetchPolicy::Overwrite => {
                    warn!("[HOLDINGS] stale fetch #{ticket} overwrote state (latest is #{latest})");
                }
            }
        }
        *state = next;
        true
    }
}

fn failed<T>(cluster: Cluster, owner: Option<String>, msg: String) -> HoldingsSnapshot<T> {
    HoldingsSnapshot {
        items: Vec::new(),
        loading: false,
        error: Some(msg),
        cluster: Some(cluster),
        owner,
        fetched_at: Some(Utc::now()),
    }
}
