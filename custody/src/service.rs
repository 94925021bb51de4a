//! The custody service calls the core depends on.

use async_trait::async_trait;
use keykeeper_types::{Address, MasterDerivationKey, PrivateKey, Result, Wallet, WalletHandle, WalletId};

/// Storage driver requested for new wallets.
pub const DEFAULT_WALLET_DRIVER: &str = "sqlite";

/// A key-custody daemon, consumed as an opaque service.
///
/// Implemented over HTTP by [`crate::KmdClient`] and in memory by
/// `keykeeper_nullables::NullCustody`. Implementations report semantic
/// failures with the kinds in [`crate::error`] (`WalletNotFound`,
/// `WrongPassword`, …) and everything else as `CustodyRequestFailed`.
#[async_trait]
pub trait CustodyService: Send + Sync {
    /// All wallets, in the service's own order.
    async fn list_wallets(&self) -> Result<Vec<Wallet>>;

    /// Create a wallet. When `master_key` is given the wallet's accounts are
    /// derived from it; otherwise the service generates a fresh one.
    async fn create_wallet(
        &self,
        name: &str,
        password: &str,
        driver: &str,
        master_key: Option<&MasterDerivationKey>,
    ) -> Result<Wallet>;

    async fn init_wallet_handle(&self, wallet_id: &WalletId, password: &str) -> Result<WalletHandle>;

    async fn release_wallet_handle(&self, handle: &WalletHandle) -> Result<()>;

    async fn list_keys(&self, handle: &WalletHandle) -> Result<Vec<Address>>;

    /// Derive the wallet's next account.
    async fn generate_key(&self, handle: &WalletHandle) -> Result<Address>;

    async fn delete_key(&self, handle: &WalletHandle, password: &str, address: &Address) -> Result<()>;

    async fn export_key(
        &self,
        handle: &WalletHandle,
        password: &str,
        address: &Address,
    ) -> Result<PrivateKey>;

    async fn export_master_derivation_key(
        &self,
        handle: &WalletHandle,
        password: &str,
    ) -> Result<MasterDerivationKey>;
}
