//! Signing with keys held in a custody wallet.

use async_trait::async_trait;
use keykeeper_crypto::keypair_from_private;
use keykeeper_ledger::error::SIGNER_UNAVAILABLE;
use keykeeper_ledger::signer::sign_with;
use keykeeper_ledger::{SignedTransaction, Transaction, TransactionSigner};
use keykeeper_types::{Address, Result};
use std::sync::Arc;

use crate::credential::WalletCredential;
use crate::error::{in_context, ACCOUNT_NOT_FOUND, EXPORT_KEY_FAILED, LIST_KEYS_FAILED};
use crate::service::CustodyService;
use crate::session::HandleSession;

/// A [`TransactionSigner`] for the accounts of one wallet.
///
/// Each signature leases a handle, exports the signer's key, signs locally
/// and releases the handle. The key is dropped (and zeroized) right after.
pub struct WalletSigner {
    session: HandleSession,
    credential: WalletCredential,
}

impl WalletSigner {
    pub fn new(service: Arc<dyn CustodyService>, wallet: &str, password: &str) -> Result<Self> {
        Ok(Self {
            session: HandleSession::new(service),
            credential: WalletCredential::new(wallet, password)?,
        })
    }

    pub fn wallet_name(&self) -> &str {
        self.credential.name()
    }
}

#[async_trait]
impl TransactionSigner for WalletSigner {
    async fn can_sign_for(&self, address: &Address) -> Result<bool> {
        let service = self.session.service();
        let keys = self
            .session
            .with_handle(&self.credential, |handle| async move {
                service
                    .list_keys(&handle)
                    .await
                    .map_err(in_context(LIST_KEYS_FAILED, "failed to list accounts"))
            })
            .await?;
        Ok(keys.contains(address))
    }

    async fn sign(&self, txn: &Transaction, signer: &Address) -> Result<SignedTransaction> {
        let service = self.session.service();
        let password = self.credential.password();
        let private = self
            .session
            .with_handle(&self.credential, |handle| async move {
                service
                    .export_key(&handle, password, signer)
                    .await
                    .map_err(in_context(
                        EXPORT_KEY_FAILED,
                        format!("failed to export the key of {signer}"),
                    ))
            })
            .await
            .map_err(|e| {
                if e.is(ACCOUNT_NOT_FOUND) {
                    SIGNER_UNAVAILABLE
                        .error(format!(
                            "wallet '{}' holds no key for {signer}",
                            self.credential.name()
                        ))
                        .with_cause(e)
                } else {
                    e
                }
            })?;
        let keypair = keypair_from_private(private);
        tracing::debug!(wallet = self.credential.name(), %signer, "signing transaction");
        sign_with(txn, &keypair, signer)
    }
}
