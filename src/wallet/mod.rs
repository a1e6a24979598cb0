//! Wallet signer boundary.

pub mod keystore;
pub mod signer;

pub use keystore::DemoPlaintextKeystore;
pub use signer::{KeypairSigner, WalletSigner};
