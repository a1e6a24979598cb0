//! Account-change subscription used for balance auto-refresh.

use anyhow::Result;
use futures::StreamExt;
use log::{info, warn};
use solana_account_decoder::UiAccountEncoding;
use solana_client::rpc_config::RpcAccountInfoConfig;
use solana_pubsub_client::nonblocking::pubsub_client::PubsubClient;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use tokio::sync::oneshot;

/// Stream lamport balances of `address` into `on_change` until `cancel`
/// fires or the server closes the subscription.
pub async fn watch_balance<F>(
    ws_url: &str,
    address: &Pubkey,
    mut cancel: oneshot::Receiver<()>,
    mut on_change: F,
) -> Result<()>
where
    F: FnMut(u64) + Send,
{
    let client = PubsubClient::new(ws_url).await?;
    let config = RpcAccountInfoConfig {
        encoding: Some(UiAccountEncoding::Base64),
        commitment: Some(CommitmentConfig::confirmed()),
        ..RpcAccountInfoConfig::default()
    };
    let (mut updates, unsubscribe) = client.account_subscribe(address, Some(config)).await?;
    info!("[WATCH] subscribed to {address} on {ws_url}");

    loop {
        tokio::select! {
            _ = &mut cancel => break,
            update = updates.next() => match update {
                Some(resp) => on_change(resp.value.lamports),
                None => {
                    warn!("[WATCH] subscription for {address} closed by server");
                    break;
                }
            },
        }
    }

    drop(updates);
    unsubscribe().await;
    info!("[WATCH] unsubscribed from {address}");
    Ok(())
}
