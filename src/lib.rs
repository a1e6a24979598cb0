//! Solana token dashboard: wallet/cluster selection, holdings sync and the
//! token transactions a wallet dashboard issues.

// App-specific modules
pub mod config;
pub mod dashboard;
pub mod error;
pub mod holdings;
pub mod metadata;
pub mod rpc;
pub mod state;
pub mod transactions;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use dashboard::Dashboard;
pub use error::{DashboardError, Result};
