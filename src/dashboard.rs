//! Application-state handle.
//!
//! [`Dashboard`] owns the selection store, the holdings fetchers, the ledger
//! factory and the (optional) signer. Front ends hold one and call into it;
//! nothing here is global.

use std::{str::FromStr, sync::Arc};

use log::{debug, info};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use tokio::sync::watch;

use crate::{
    config::{Cluster, Settings},
    error::{DashboardError, Result},
    holdings::{HoldingsFetcher, HoldingsSnapshot, NftHolding, NftSource, TokenHolding, TokenSource},
    rpc::{LedgerClient, LedgerFactory},
    state::{KeyValueStore, Selection, SelectionStore},
    transactions::{
        self, burn_close::AccountAction, transfer::TransferReceipt, CreatedToken,
        TokenCreationRequest,
    },
    wallet::WalletSigner,
};

pub struct Dashboard<S: KeyValueStore> {
    settings: Settings,
    selection: SelectionStore<S>,
    ledgers: Box<dyn LedgerFactory>,
    signer: Option<Arc<dyn WalletSigner>>,
    tokens: HoldingsFetcher<TokenSource>,
    nfts: HoldingsFetcher<NftSource>,
}

impl<S: KeyValueStore> Dashboard<S> {
    pub fn new(
        settings: Settings,
        selection: SelectionStore<S>,
        ledgers: Box<dyn LedgerFactory>,
        signer: Option<Arc<dyn WalletSigner>>,
    ) -> Self {
        let policy = settings.stale_fetch_policy;
        Self {
            settings,
            selection,
            ledgers,
            signer,
            tokens: HoldingsFetcher::new(TokenSource, policy),
            nfts: HoldingsFetcher::new(NftSource, policy),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn selection(&self) -> Selection {
        self.selection.selection()
    }

    pub fn subscribe(&self) -> watch::Receiver<Selection> {
        self.selection.subscribe()
    }

    pub fn signer(&self) -> Option<&dyn WalletSigner> {
        self.signer.as_deref()
    }

    fn require_signer(&self) -> Result<&dyn WalletSigner> {
        match self.signer() {
            Some(signer) if signer.is_connected() => Ok(signer),
            _ => Err(DashboardError::WalletNotConnected),
        }
    }

    /// Ledger handle for the currently selected cluster.
    pub fn ledger(&self) -> Arc<dyn LedgerClient> {
        self.ledgers.connect(self.selection.cluster())
    }

    /// The inspected wallet, or the signer when none is set.
    pub fn inspected_address(&self) -> Result<Pubkey> {
        let wallet = self.selection.wallet();
        match wallet.trim() {
            "" => self
                .signer()
                .map(|s| s.pubkey())
                .ok_or(DashboardError::WalletNotConnected),
            addr => Pubkey::from_str(addr)
                .map_err(|_| DashboardError::validation(format!("Invalid wallet address: `{addr}`"))),
        }
    }

    /* ------------------------------ selection ------------------------ */

    pub async fn set_cluster(&self, cluster: Cluster) -> Result<()> {
        self.selection.set_cluster(cluster)?;
        self.refresh_holdings().await;
        Ok(())
    }

    pub async fn set_wallet(&self, wallet: &str) -> Result<()> {
        self.selection.set_wallet(wallet)?;
        self.refresh_holdings().await;
        Ok(())
    }

    /* ------------------------------ holdings ------------------------- */

    /// Re-fetch tokens and NFTs for the current selection, concurrently.
    pub async fn refresh_holdings(
        &self,
    ) -> (HoldingsSnapshot<TokenHolding>, HoldingsSnapshot<NftHolding>) {
        let Selection { cluster, wallet } = self.selection();
        let ledger = self.ledgers.connect(cluster);
        let signer = self
            .signer()
            .filter(|s| s.is_connected())
            .map(|s| s.pubkey());
        debug!("[DASHBOARD] refreshing holdings on {cluster} via {}", ledger.endpoint());
        tokio::join!(
            self.tokens.refresh(ledger.as_ref(), &wallet, signer, cluster),
            self.nfts.refresh(ledger.as_ref(), &wallet, signer, cluster),
        )
    }

    pub async fn tokens(&self) -> HoldingsSnapshot<TokenHolding> {
        self.tokens.snapshot().await
    }

    pub async fn nfts(&self) -> HoldingsSnapshot<NftHolding> {
        self.nfts.snapshot().await
    }

    /// Drop whatever holdings fetches are still running.
    pub fn cancel_pending(&self) {
        self.tokens.cancel_pending();
        self.nfts.cancel_pending();
    }

    pub async fn balance(&self) -> Result<u64> {
        let address = self.inspected_address()?;
        self.ledger()
            .balance(&address)
            .await
            .map_err(|e| DashboardError::connectivity("Failed to fetch balance", e))
    }

    /* ------------------------------ submissions ---------------------- */

    async fn after_submit(&self) {
        if self.settings.refresh_after_submit {
            self.refresh_holdings().await;
        }
    }

    pub async fn create_token(&self, req: &TokenCreationRequest) -> Result<CreatedToken> {
        let signer = self.require_signer()?;
        let created = transactions::create_token(self.ledger().as_ref(), signer, req).await?;
        self.after_submit().await;
        Ok(created)
    }

    pub async fn transfer_token(
        &self,
        mint: &str,
        recipient: &str,
        amount: &str,
    ) -> Result<TransferReceipt> {
        let signer = self.require_signer()?;
        let receipt =
            transactions::transfer_token(self.ledger().as_ref(), signer, mint, recipient, amount)
                .await?;
        self.after_submit().await;
        Ok(receipt)
    }

    pub async fn send_sol(&self, recipient: &str, amount_sol: &str) -> Result<TransferReceipt> {
        let signer = self.require_signer()?;
        let receipt =
            transactions::send_sol(self.ledger().as_ref(), signer, recipient, amount_sol).await?;
        self.after_submit().await;
        Ok(receipt)
    }

    /// Faucet grant to the signer (or the inspected wallet when there is no
    /// signer). `sol` defaults to the configured amount.
    pub async fn airdrop(&self, sol: Option<f64>) -> Result<Signature> {
        let address = match self.signer() {
            Some(signer) => signer.pubkey(),
            None => self.inspected_address()?,
        };
        let lamports = Settings::sol_to_lamports(sol.unwrap_or(self.settings.airdrop_sol));
        let cluster = self.selection.cluster();
        let signature =
            transactions::request_airdrop(self.ledger().as_ref(), cluster, &address, lamports)
                .await?;
        info!("[DASHBOARD] airdrop to {address} confirmed");
        Ok(signature)
    }

    pub async fn burn_tokens(&self, mint: &str, amount: &str) -> Result<AccountAction> {
        let signer = self.require_signer()?;
        let done = transactions::burn_tokens(self.ledger().as_ref(), signer, mint, amount).await?;
        self.after_submit().await;
        Ok(done)
    }

    pub async fn close_token_account(&self, mint: &str) -> Result<AccountAction> {
        let signer = self.require_signer()?;
        let done = transactions::close_token_account(self.ledger().as_ref(), signer, mint).await?;
        self.after_submit().await;
        Ok(done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        holdings::CONNECT_WALLET,
        state::MemoryStore,
        testing::{MockLedger, MockSigner},
    };

    /// Every cluster resolves to the same mock.
    struct FixedLedger(Arc<MockLedger>);

    impl LedgerFactory for FixedLedger {
        fn connect(&self, _cluster: Cluster) -> Arc<dyn LedgerClient> {
            self.0.clone()
        }
    }

    fn dashboard(
        settings: Settings,
        signer: Option<Arc<MockSigner>>,
    ) -> (Dashboard<MemoryStore>, Arc<MockLedger>) {
        let ledger = Arc::new(MockLedger::new());
        let selection = SelectionStore::open(MemoryStore::new()).unwrap();
        let signer = signer.map(|s| s as Arc<dyn WalletSigner>);
        let dash = Dashboard::new(
            settings,
            selection,
            Box::new(FixedLedger(ledger.clone())),
            signer,
        );
        (dash, ledger)
    }

    #[tokio::test]
    async fn no_signer_and_no_wallet() {
        let (dash, ledger) = dashboard(Settings::default(), None);
        let (tokens, nfts) = dash.refresh_holdings().await;
        assert_eq!(tokens.error.as_deref(), Some(CONNECT_WALLET));
        assert_eq!(nfts.error.as_deref(), Some(CONNECT_WALLET));
        assert_eq!(ledger.enumerations(), 0);

        let err = dash.send_sol(&Pubkey::new_unique().to_string(), "1").await.unwrap_err();
        assert!(matches!(err, DashboardError::WalletNotConnected));
        assert!(matches!(dash.balance().await, Err(DashboardError::WalletNotConnected)));
    }

    #[tokio::test]
    async fn cluster_change_persists_and_refetches() {
        let signer = Arc::new(MockSigner::new());
        let (dash, ledger) = dashboard(Settings::default(), Some(signer));
        dash.set_cluster(Cluster::Testnet).await.unwrap();

        assert_eq!(dash.selection().cluster, Cluster::Testnet);
        assert_eq!(ledger.enumerations(), 2);
        let tokens = dash.tokens().await;
        assert_eq!(tokens.cluster, Some(Cluster::Testnet));
        assert!(tokens.error.is_none());
    }

    #[tokio::test]
    async fn inspected_wallet_overrides_signer() {
        let signer = Arc::new(MockSigner::new());
        let (dash, ledger) = dashboard(Settings::default(), Some(signer.clone()));
        let other = Pubkey::new_unique();
        ledger.set_balance(signer.pubkey(), 1);
        ledger.set_balance(other, 42);

        assert_eq!(dash.balance().await.unwrap(), 1);
        dash.set_wallet(&other.to_string()).await.unwrap();
        assert_eq!(dash.balance().await.unwrap(), 42);
        assert_eq!(dash.tokens().await.owner, Some(other.to_string()));
    }

    #[tokio::test]
    async fn submission_refreshes_when_configured() {
        let signer = Arc::new(MockSigner::new());
        let to = MockSigner::new().pubkey();

        let (dash, ledger) = dashboard(Settings::default(), Some(signer.clone()));
        dash.send_sol(&to.to_string(), "0.1").await.unwrap();
        assert_eq!(ledger.enumerations(), 2);

        let settings = Settings {
            refresh_after_submit: false,
            ..Settings::default()
        };
        let (dash, ledger) = dashboard(settings, Some(signer));
        dash.send_sol(&to.to_string(), "0.1").await.unwrap();
        assert_eq!(ledger.enumerations(), 0);
        assert_eq!(ledger.sent().len(), 1);
    }

    #[tokio::test]
    async fn airdrop_uses_configured_amount() {
        let signer = Arc::new(MockSigner::new());
        let (dash, ledger) = dashboard(Settings::default(), Some(signer.clone()));
        dash.airdrop(None).await.unwrap();
        assert_eq!(ledger.airdrops(), vec![(signer.pubkey(), 2_000_000_000)]);
    }
}
