//! Network cluster names and the public endpoints they resolve to.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use url::Url;

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    #[default]
    Devnet,
    Testnet,
    MainnetBeta,
}

impl Cluster {
    /// Public JSON-RPC endpoint for the cluster.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
        }
    }

    /// Only the test clusters run a faucet.
    pub fn has_faucet(&self) -> bool {
        !matches!(self, Cluster::MainnetBeta)
    }

    pub fn explorer_tx_url(&self, signature: &str) -> String {
        format!("https://explorer.solana.com/tx/{signature}?cluster={self}")
    }
}

/// Derive the pubsub endpoint from an HTTP endpoint.
///
/// `http` becomes `ws`, `https` becomes `wss`; an explicit port is bumped by
/// one, matching the validator's default RPC/pubsub port pairing.
pub fn websocket_url_for(http_url: &str) -> Result<String> {
    let mut url = Url::parse(http_url).map_err(|e| anyhow!("invalid rpc url {http_url}: {e}"))?;
    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => return Err(anyhow!("unsupported rpc scheme `{other}`")),
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow!("cannot switch {http_url} to {scheme}"))?;
    if let Some(port) = url.port() {
        url.set_port(Some(port.saturating_add(1)))
            .map_err(|_| anyhow!("cannot set port on {http_url}"))?;
    }
    Ok(url.to_string())
}
