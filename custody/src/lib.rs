//! Key-custody client for keykeeper.
//!
//! Provides:
//! - [`CustodyService`]: the custody daemon calls the core relies on, with an
//!   HTTP implementation in [`KmdClient`]
//! - [`WalletCredential`]: trimmed, validated, zeroized wallet credentials
//! - [`HandleSession`]: scoped wallet handle leases, released on every exit
//! - [`WalletManager`] / [`CustodyWallets`]: create, recover and back up wallets
//! - [`AccountManager`] / [`CustodyAccounts`]: account lifecycle, with
//!   concurrent bulk deletion reporting per-address failures
//! - [`WalletSigner`]: a transaction signer over a custody wallet

pub mod accounts;
pub mod credential;
pub mod error;
pub mod kmd;
pub mod service;
pub mod session;
pub mod signer;
pub mod wallet;

pub use accounts::{AccountManager, CustodyAccounts, PartialCreation};
pub use credential::WalletCredential;
pub use kmd::KmdClient;
pub use service::{CustodyService, DEFAULT_WALLET_DRIVER};
pub use session::HandleSession;
pub use signer::WalletSigner;
pub use wallet::{CustodyWallets, WalletManager};
