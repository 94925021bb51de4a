//! Named, password-protected wallets.

use async_trait::async_trait;
use keykeeper_crypto::{decode_mnemonic, encode_mnemonic};
use keykeeper_types::{MasterDerivationKey, Result, Wallet};
use std::sync::Arc;
use zeroize::Zeroize;

use crate::credential::{normalize_wallet_name, WalletCredential};
use crate::error::{
    in_context, CREATE_WALLET_FAILED, EXPORT_MASTER_KEY_FAILED, INVALID_BACKUP_PHRASE,
    KEY_ENCODING_FAILED,
};
use crate::service::{CustodyService, DEFAULT_WALLET_DRIVER};
use crate::session::HandleSession;

/// Create, look up, recover and back up wallets.
#[async_trait]
pub trait WalletManager: Send + Sync {
    /// All wallets, in the custody service's order.
    async fn list(&self) -> Result<Vec<Wallet>>;

    async fn get(&self, name: &str) -> Result<Wallet>;

    async fn contains(&self, name: &str) -> Result<bool>;

    async fn create(&self, name: &str, password: &str) -> Result<Wallet>;

    /// Create a new wallet seeded from a backup phrase.
    ///
    /// The result is a separate wallet with its own id; it derives the same
    /// accounts, in the same order, as the wallet the phrase came from.
    async fn recover(&self, name: &str, password: &str, backup_phrase: &str) -> Result<Wallet>;

    /// The wallet's master derivation key as a mnemonic phrase.
    async fn export_backup_phrase(&self, name: &str, password: &str) -> Result<String>;
}

/// [`WalletManager`] backed by a [`CustodyService`].
pub struct CustodyWallets {
    session: HandleSession,
    driver: String,
}

impl CustodyWallets {
    pub fn new(service: Arc<dyn CustodyService>) -> Self {
        Self {
            session: HandleSession::new(service),
            driver: DEFAULT_WALLET_DRIVER.to_string(),
        }
    }

    /// Use a storage driver other than [`DEFAULT_WALLET_DRIVER`].
    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    async fn create_seeded(
        &self,
        credential: &WalletCredential,
        master_key: Option<&MasterDerivationKey>,
    ) -> Result<Wallet> {
        let wallet = self
            .session
            .service()
            .create_wallet(credential.name(), credential.password(), &self.driver, master_key)
            .await
            .map_err(in_context(
                CREATE_WALLET_FAILED,
                format!("failed to create wallet '{}'", credential.name()),
            ))?;
        tracing::info!(
            wallet = %wallet.name,
            id = %wallet.id,
            recovered = master_key.is_some(),
            "wallet created"
        );
        Ok(wallet)
    }
}

#[async_trait]
impl WalletManager for CustodyWallets {
    async fn list(&self) -> Result<Vec<Wallet>> {
        self.session.list_wallets().await
    }

    async fn get(&self, name: &str) -> Result<Wallet> {
        self.session.resolve_wallet(name).await
    }

    async fn contains(&self, name: &str) -> Result<bool> {
        let name = normalize_wallet_name(name)?;
        Ok(self.list().await?.iter().any(|wallet| wallet.name == name))
    }

    async fn create(&self, name: &str, password: &str) -> Result<Wallet> {
        let credential = WalletCredential::new(name, password)?;
        self.create_seeded(&credential, None).await
    }

    async fn recover(&self, name: &str, password: &str, backup_phrase: &str) -> Result<Wallet> {
        let credential = WalletCredential::new(name, password)?;
        let mut secret = decode_mnemonic(backup_phrase).map_err(|e| {
            INVALID_BACKUP_PHRASE
                .error("backup phrase does not decode to a master derivation key")
                .with_upstream(e)
        })?;
        let master_key = MasterDerivationKey(secret);
        secret.zeroize();
        self.create_seeded(&credential, Some(&master_key)).await
    }

    async fn export_backup_phrase(&self, name: &str, password: &str) -> Result<String> {
        let credential = WalletCredential::new(name, password)?;
        let service = self.session.service();
        let (name, password) = (credential.name(), credential.password());
        let master_key = self
            .session
            .with_handle(&credential, |handle| async move {
                service
                    .export_master_derivation_key(&handle, password)
                    .await
                    .map_err(in_context(
                        EXPORT_MASTER_KEY_FAILED,
                        format!("failed to export the master key of '{name}'"),
                    ))
            })
            .await?;
        encode_mnemonic(master_key.as_bytes()).map_err(|e| {
            KEY_ENCODING_FAILED
                .error("failed to encode master derivation key as a phrase")
                .with_upstream(e)
        })
    }
}
