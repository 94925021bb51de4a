//! Account lifecycle inside a wallet.
//!
//! Creation is sequential so the returned addresses are in derivation order
//! and a partial result is a meaningful prefix. Deletion fans out: one task
//! per address, all sharing the batch's single handle lease, joined behind a
//! full barrier and merged into the failure map afterwards.

use async_trait::async_trait;
use keykeeper_crypto::encode_mnemonic;
use keykeeper_types::{Address, Error, Result, WalletHandle};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use zeroize::Zeroizing;

use crate::credential::WalletCredential;
use crate::error::{
    in_context, ACCOUNT_NOT_FOUND, DELETE_KEY_FAILED, EMPTY_ADDRESS_LIST, EXPORT_KEY_FAILED,
    GENERATE_KEY_FAILED, INVALID_ACCOUNT_COUNT, KEY_ENCODING_FAILED, LIST_KEYS_FAILED,
};
use crate::service::CustodyService;
use crate::session::HandleSession;

/// A batch creation that stopped early.
///
/// `created` holds the accounts that were made before `error`, in order.
/// They exist in the wallet; the caller decides whether to keep them.
#[derive(Debug, Error)]
#[error("created {} of {requested} accounts: {error}", .created.len())]
pub struct PartialCreation {
    pub created: Vec<Address>,
    pub requested: usize,
    #[source]
    pub error: Error,
}

impl PartialCreation {
    fn nothing(requested: usize, error: Error) -> Self {
        Self {
            created: Vec::new(),
            requested,
            error,
        }
    }
}

/// Create, list, delete and export accounts.
#[async_trait]
pub trait AccountManager: Send + Sync {
    async fn list_accounts(&self, wallet: &str, password: &str) -> Result<Vec<Address>>;

    async fn contains_account(&self, wallet: &str, password: &str, address: &Address) -> Result<bool>;

    async fn create_account(&self, wallet: &str, password: &str) -> Result<Address>;

    /// Create `count` accounts one after another under a single lease.
    async fn create_accounts(
        &self,
        wallet: &str,
        password: &str,
        count: usize,
    ) -> std::result::Result<Vec<Address>, PartialCreation>;

    /// Delete an account. Deleting an address the wallet does not hold succeeds.
    async fn delete_account(&self, wallet: &str, password: &str, address: &Address) -> Result<()>;

    /// Delete many accounts concurrently.
    ///
    /// The map holds only the addresses whose deletion failed; an empty map
    /// means every deletion succeeded. The outer error means the batch never
    /// ran (bad input, wallet not found, wrong password, …).
    async fn delete_accounts(
        &self,
        wallet: &str,
        password: &str,
        addresses: &[Address],
    ) -> Result<HashMap<Address, Error>>;

    /// The account's private key as a mnemonic phrase.
    async fn export_private_key(&self, wallet: &str, password: &str, address: &Address) -> Result<String>;
}

/// [`AccountManager`] backed by a [`CustodyService`].
pub struct CustodyAccounts {
    session: HandleSession,
}

impl CustodyAccounts {
    pub fn new(service: Arc<dyn CustodyService>) -> Self {
        Self {
            session: HandleSession::new(service),
        }
    }
}

async fn generate(service: &dyn CustodyService, handle: &WalletHandle) -> Result<Address> {
    service
        .generate_key(handle)
        .await
        .map_err(in_context(GENERATE_KEY_FAILED, "failed to generate a new account"))
}

async fn delete_if_present(
    service: &dyn CustodyService,
    handle: &WalletHandle,
    password: &str,
    address: &Address,
) -> Result<()> {
    match service.delete_key(handle, password, address).await {
        Ok(()) => {
            tracing::debug!(%address, "account deleted");
            Ok(())
        }
        Err(e) if e.is(ACCOUNT_NOT_FOUND) => {
            tracing::debug!(%address, "account not in wallet; nothing to delete");
            Ok(())
        }
        Err(e) => Err(in_context(
            DELETE_KEY_FAILED,
            format!("failed to delete account {address}"),
        )(e)),
    }
}

#[async_trait]
impl AccountManager for CustodyAccounts {
    async fn list_accounts(&self, wallet: &str, password: &str) -> Result<Vec<Address>> {
        let credential = WalletCredential::new(wallet, password)?;
        let service = self.session.service();
        self.session
            .with_handle(&credential, |handle| async move {
                service
                    .list_keys(&handle)
                    .await
                    .map_err(in_context(LIST_KEYS_FAILED, "failed to list accounts"))
            })
            .await
    }

    async fn contains_account(&self, wallet: &str, password: &str, address: &Address) -> Result<bool> {
        Ok(self.list_accounts(wallet, password).await?.contains(address))
    }

    async fn create_account(&self, wallet: &str, password: &str) -> Result<Address> {
        let credential = WalletCredential::new(wallet, password)?;
        let service = self.session.service();
        let address = self
            .session
            .with_handle(&credential, |handle| async move {
                generate(service.as_ref(), &handle).await
            })
            .await?;
        tracing::info!(wallet = credential.name(), %address, "account created");
        Ok(address)
    }

    async fn create_accounts(
        &self,
        wallet: &str,
        password: &str,
        count: usize,
    ) -> std::result::Result<Vec<Address>, PartialCreation> {
        if count == 0 {
            return Err(PartialCreation::nothing(
                count,
                INVALID_ACCOUNT_COUNT.error("account count must be at least 1"),
            ));
        }
        let credential =
            WalletCredential::new(wallet, password).map_err(|e| PartialCreation::nothing(count, e))?;
        let service = self.session.service();

        let mut created = Vec::new();
        let sink = &mut created;
        let outcome = self
            .session
            .with_handle(&credential, |handle| async move {
                for _ in 0..count {
                    sink.push(generate(service.as_ref(), &handle).await?);
                }
                Ok(())
            })
            .await;

        match outcome {
            Ok(()) => {
                tracing::info!(wallet = credential.name(), count, "accounts created");
                Ok(created)
            }
            Err(error) => {
                tracing::warn!(
                    wallet = credential.name(),
                    created = created.len(),
                    requested = count,
                    error = %error.report(),
                    "account creation stopped early"
                );
                Err(PartialCreation {
                    created,
                    requested: count,
                    error,
                })
            }
        }
    }

    async fn delete_account(&self, wallet: &str, password: &str, address: &Address) -> Result<()> {
        let credential = WalletCredential::new(wallet, password)?;
        let service = self.session.service();
        let password = credential.password();
        self.session
            .with_handle(&credential, |handle| async move {
                delete_if_present(service.as_ref(), &handle, password, address).await
            })
            .await
    }

    async fn delete_accounts(
        &self,
        wallet: &str,
        password: &str,
        addresses: &[Address],
    ) -> Result<HashMap<Address, Error>> {
        if addresses.is_empty() {
            return Err(EMPTY_ADDRESS_LIST.error("at least one address is required"));
        }
        let credential = WalletCredential::new(wallet, password)?;
        let service = self.session.service();

        let mut seen = HashSet::with_capacity(addresses.len());
        let targets: Vec<Address> = addresses
            .iter()
            .filter(|address| seen.insert(*address))
            .cloned()
            .collect();

        let password = credential.password();
        let failures = self
            .session
            .with_handle(&credential, |handle| async move {
                let mut tasks = JoinSet::new();
                for address in &targets {
                    let service = Arc::clone(service);
                    let handle = handle.clone();
                    let password = Zeroizing::new(password.to_string());
                    let address = address.clone();
                    tasks.spawn(async move {
                        let outcome =
                            delete_if_present(service.as_ref(), &handle, &password, &address).await;
                        (address, outcome)
                    });
                }

                let mut unfinished: HashSet<Address> = targets.into_iter().collect();
                let mut failures = HashMap::new();
                while let Some(joined) = tasks.join_next().await {
                    match joined {
                        Ok((address, outcome)) => {
                            unfinished.remove(&address);
                            if let Err(e) = outcome {
                                tracing::warn!(%address, error = %e.report(), "account deletion failed");
                                failures.insert(address, e);
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "account deletion task did not complete"),
                    }
                }
                for address in unfinished {
                    let e = DELETE_KEY_FAILED
                        .error(format!("deletion of account {address} did not complete"));
                    failures.insert(address, e);
                }
                Ok(failures)
            })
            .await?;

        tracing::info!(
            wallet = credential.name(),
            requested = seen.len(),
            failed = failures.len(),
            "bulk account deletion finished"
        );
        Ok(failures)
    }

    async fn export_private_key(&self, wallet: &str, password: &str, address: &Address) -> Result<String> {
        let credential = WalletCredential::new(wallet, password)?;
        let service = self.session.service();
        let password = credential.password();
        let key = self
            .session
            .with_handle(&credential, |handle| async move {
                service
                    .export_key(&handle, password, address)
                    .await
                    .map_err(in_context(
                        EXPORT_KEY_FAILED,
                        format!("failed to export the key of {address}"),
                    ))
            })
            .await?;
        encode_mnemonic(key.as_bytes()).map_err(|e| {
            KEY_ENCODING_FAILED
                .error("failed to encode private key as a phrase")
                .with_upstream(e)
        })
    }
}
