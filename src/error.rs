//! Error taxonomy surfaced to the user.
//!
//! Every variant renders as a human readable line; nothing here is retried.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// Missing or malformed form input, caught before any network call.
    #[error("{0}")]
    Validation(String),

    #[error("Wallet not connected or signTransaction not available")]
    WalletNotConnected,

    /// RPC unreachable, malformed address, expired blockhash.
    #[error("{0}")]
    Connectivity(String),

    /// Simulation or execution failure reported by the ledger.
    #[error("Transaction failed: {0}")]
    LedgerRejected(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("upload failed: {0}")]
    Upload(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

impl DashboardError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn connectivity(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Connectivity(format!("{context}: {err}"))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
