//! Account rekeying.
//!
//! A rekey is a zero-amount payment from an account to itself whose
//! `rekey_to` field names the address that will hold the account's signing
//! authority from then on. Rekeying back is the same transaction with the
//! account's own address as the target.
//!
//! The ledger is the source of truth for who may sign: [`get_auth_addr`]
//! asks it. The free functions here only build transactions; [`LedgerRekeying`]
//! additionally signs them as the current auth address and submits them.

use async_trait::async_trait;
use keykeeper_types::{Address, Result};
use std::sync::Arc;

use crate::error::{
    ACCOUNT_ALREADY_REKEYED, GET_AUTH_ADDR_FAILED, GET_SUGGESTED_PARAMS_FAILED,
    SIGN_TRANSACTION_FAILED, SUBMIT_TRANSACTION_FAILED,
};
use crate::service::LedgerService;
use crate::signer::TransactionSigner;
use crate::transaction::{Transaction, TxId};

/// Look up the address authorized to sign for `address`.
///
/// An account that has never been rekeyed (or was rekeyed back) signs for
/// itself.
pub async fn get_auth_addr(ledger: &dyn LedgerService, address: &Address) -> Result<Address> {
    let info = ledger.account_information(address).await.map_err(|e| {
        GET_AUTH_ADDR_FAILED
            .error(format!("failed to get auth address for {address}"))
            .with_cause(e)
    })?;
    Ok(info.auth_addr.unwrap_or_else(|| address.clone()))
}

/// Build the transaction that rekeys `from` to `to`.
///
/// The transaction is neither signed nor submitted. It must be signed by
/// `from`'s current auth address, which is not necessarily `from`.
pub async fn make_rekey_transaction(
    ledger: &dyn LedgerService,
    from: &Address,
    to: &Address,
) -> Result<Transaction> {
    let params = ledger.suggested_params().await.map_err(|e| {
        GET_SUGGESTED_PARAMS_FAILED
            .error("failed to get suggested params for constructing a new transaction")
            .with_cause(e)
    })?;
    let mut txn = Transaction::payment(from, from, 0, Vec::new(), &params)?;
    txn.rekey(to)?;
    Ok(txn)
}

/// Build the transaction that restores `address`'s authority to itself.
pub async fn make_rekey_back_transaction(
    ledger: &dyn LedgerService,
    address: &Address,
) -> Result<Transaction> {
    make_rekey_transaction(ledger, address, address).await
}

/// Whether a rekey may replace an existing, different auth address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RekeyPolicy {
    /// Always build and submit; the new target simply replaces the old one.
    #[default]
    AllowOverwrite,
    /// Refuse to rekey an account that is already rekeyed to some other
    /// address. It must be rekeyed back first.
    RequireRekeyBack,
}

/// Transfer and restore signing authority.
#[async_trait]
pub trait Rekeying: Send + Sync {
    /// Rekey `from` so that `to` signs for it. Returns the submitted id.
    async fn rekey(&self, from: &Address, to: &Address) -> Result<TxId>;

    /// Rekey `account` back to itself. Returns `None` when the account is
    /// not rekeyed, in which case nothing is submitted.
    async fn rekey_back(&self, account: &Address) -> Result<Option<TxId>>;
}

/// [`Rekeying`] against a ledger, signing as the current auth address.
pub struct LedgerRekeying {
    ledger: Arc<dyn LedgerService>,
    signer: Arc<dyn TransactionSigner>,
    policy: RekeyPolicy,
}

impl LedgerRekeying {
    pub fn new(ledger: Arc<dyn LedgerService>, signer: Arc<dyn TransactionSigner>) -> Self {
        Self {
            ledger,
            signer,
            policy: RekeyPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RekeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RekeyPolicy {
        self.policy
    }

    async fn sign_and_submit(&self, txn: Transaction, auth_addr: &Address) -> Result<TxId> {
        let signed = self.signer.sign(&txn, auth_addr).await.map_err(|e| {
            SIGN_TRANSACTION_FAILED
                .error(format!("failed to sign transaction as {auth_addr}"))
                .with_cause(e)
        })?;
        let bytes = signed.encode()?;
        self.ledger.send_raw_transaction(&bytes).await.map_err(|e| {
            SUBMIT_TRANSACTION_FAILED
                .error(format!("failed to submit transaction from {}", txn.sender))
                .with_cause(e)
        })
    }
}

#[async_trait]
impl Rekeying for LedgerRekeying {
    async fn rekey(&self, from: &Address, to: &Address) -> Result<TxId> {
        let auth_addr = get_auth_addr(self.ledger.as_ref(), from).await?;
        if self.policy == RekeyPolicy::RequireRekeyBack && &auth_addr != from && &auth_addr != to {
            return Err(ACCOUNT_ALREADY_REKEYED.error(format!(
                "account has already been rekeyed: {from} -> {auth_addr}"
            )));
        }

        let txn = make_rekey_transaction(self.ledger.as_ref(), from, to).await?;
        let tx_id = self.sign_and_submit(txn, &auth_addr).await?;
        tracing::info!(%from, %to, signer = %auth_addr, %tx_id, "rekey submitted");
        Ok(tx_id)
    }

    async fn rekey_back(&self, account: &Address) -> Result<Option<TxId>> {
        let auth_addr = get_auth_addr(self.ledger.as_ref(), account).await?;
        if &auth_addr == account {
            tracing::debug!(%account, "account is not rekeyed; nothing to do");
            return Ok(None);
        }

        let txn = make_rekey_back_transaction(self.ledger.as_ref(), account).await?;
        let tx_id = self.sign_and_submit(txn, &auth_addr).await?;
        tracing::info!(%account, signer = %auth_addr, %tx_id, "rekey back submitted");
        Ok(Some(tx_id))
    }
}
