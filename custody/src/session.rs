//! Scoped wallet handle leases.
//!
//! [`HandleSession::with_handle`] is the only way the rest of the crate gets
//! hold of a [`WalletHandle`]. The handle is released when the scope ends,
//! whatever way it ends:
//!
//! - normal return or error: released inline before `with_handle` returns;
//! - the closure panics, or the `with_handle` future is dropped mid-flight:
//!   the lease's `Drop` spawns the release onto the current tokio runtime.
//!
//! A failed release is logged and otherwise ignored; it never replaces the
//! scope's own result.

use keykeeper_types::{Result, Wallet, WalletHandle};
use std::future::Future;
use std::sync::Arc;

use crate::credential::{normalize_wallet_name, WalletCredential};
use crate::error::{in_context, INIT_WALLET_HANDLE_FAILED, LIST_WALLETS_FAILED, WALLET_NOT_FOUND};
use crate::service::CustodyService;

#[derive(Clone)]
pub struct HandleSession {
    service: Arc<dyn CustodyService>,
}

impl HandleSession {
    pub fn new(service: Arc<dyn CustodyService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<dyn CustodyService> {
        &self.service
    }

    pub async fn list_wallets(&self) -> Result<Vec<Wallet>> {
        tracing::debug!("listing wallets");
        self.service
            .list_wallets()
            .await
            .map_err(in_context(LIST_WALLETS_FAILED, "failed to list wallets"))
    }

    /// Find a wallet by (trimmed) name.
    pub async fn resolve_wallet(&self, name: &str) -> Result<Wallet> {
        let name = normalize_wallet_name(name)?;
        self.list_wallets()
            .await?
            .into_iter()
            .find(|wallet| wallet.name == name)
            .ok_or_else(|| WALLET_NOT_FOUND.error(format!("no wallet named '{name}'")))
    }

    /// Lease a handle for `credential`'s wallet and run `f` with it.
    ///
    /// `f` receives its own clone of the token; it must not outlive the call.
    pub async fn with_handle<T, F, Fut>(&self, credential: &WalletCredential, f: F) -> Result<T>
    where
        F: FnOnce(WalletHandle) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let wallet = self.resolve_wallet(credential.name()).await?;
        let handle = self
            .service
            .init_wallet_handle(&wallet.id, credential.password())
            .await
            .map_err(in_context(
                INIT_WALLET_HANDLE_FAILED,
                format!("failed to open a handle on wallet '{}'", wallet.name),
            ))?;
        tracing::debug!(wallet = %wallet.name, "wallet handle leased");

        let mut lease = Lease {
            service: Arc::clone(&self.service),
            handle: Some(handle.clone()),
            wallet: wallet.name,
        };
        let result = f(handle).await;
        lease.release().await;
        result
    }
}

/// An outstanding handle that still has to be released.
struct Lease {
    service: Arc<dyn CustodyService>,
    handle: Option<WalletHandle>,
    wallet: String,
}

impl Lease {
    async fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            release(self.service.as_ref(), &handle, &self.wallet).await;
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let wallet = std::mem::take(&mut self.wallet);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let service = Arc::clone(&self.service);
                runtime.spawn(async move {
                    release(service.as_ref(), &handle, &wallet).await;
                });
            }
            Err(_) => {
                tracing::warn!(wallet = %wallet, "no runtime to release wallet handle; it will expire on its own");
            }
        }
    }
}

async fn release(service: &dyn CustodyService, handle: &WalletHandle, wallet: &str) {
    match service.release_wallet_handle(handle).await {
        Ok(()) => tracing::debug!(wallet, "wallet handle released"),
        Err(e) => tracing::warn!(wallet, error = %e.report(), "failed to release wallet handle"),
    }
}
