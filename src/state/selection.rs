//! Cluster/wallet selection store.
//!
//! Holds the selected cluster and the wallet address under inspection (which
//! may differ from the signer). Reads persisted values on open, mirrors every
//! write to the backing store and broadcasts the new selection to watchers.
//! The wallet address is stored verbatim; fetchers deal with malformed input.

use std::str::FromStr;

use log::{info, warn};
use serde::Serialize;
use tokio::sync::watch;

use super::store::KeyValueStore;
use crate::{config::Cluster, error::Result};

pub const CLUSTER_KEY: &str = "cluster";
pub const WALLET_KEY: &str = "wallet";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub cluster: Cluster,
    pub wallet: String,
}

pub struct SelectionStore<S: KeyValueStore> {
    store: S,
    current: watch::Sender<Selection>,
}

impl<S: KeyValueStore> SelectionStore<S> {
    pub fn open(store: S) -> Result<Self> {
        let cluster = match store.get(CLUSTER_KEY)? {
            Some(raw) => Cluster::from_str(&raw).unwrap_or_else(|_| {
                warn!("[STORE] persisted cluster `{raw}` is unknown, using devnet");
                Cluster::Devnet
            }),
            None => Cluster::Devnet,
        };
        let wallet = store.get(WALLET_KEY)?.unwrap_or_default();

        let (current, _) = watch::channel(Selection { cluster, wallet });
        Ok(Self { store, current })
    }

    pub fn selection(&self) -> Selection {
        self.current.borrow().clone()
    }

    pub fn cluster(&self) -> Cluster {
        self.current.borrow().cluster
    }

    pub fn wallet(&self) -> String {
        self.current.borrow().wallet.clone()
    }

    pub fn set_cluster(&self, cluster: Cluster) -> Result<()> {
        self.store.set(CLUSTER_KEY, cluster.as_ref())?;
        self.current.send_modify(|sel| sel.cluster = cluster);
        info!("[STORE] cluster -> {cluster}");
        Ok(())
    }

    pub fn set_wallet(&self, wallet: &str) -> Result<()> {
        self.store.set(WALLET_KEY, wallet)?;
        self.current.send_modify(|sel| sel.wallet = wallet.to_string());
        info!("[STORE] inspected wallet -> `{wallet}`");
        Ok(())
    }

    /// Every setter call is observed, even when the value is unchanged.
    pub fn subscribe(&self) -> watch::Receiver<Selection> {
        self.current.subscribe()
    }

    pub fn backing_store(&self) -> &S {
        &self.store
    }
}
