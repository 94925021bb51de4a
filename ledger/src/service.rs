//! The ledger node calls the core depends on.

use async_trait::async_trait;
use keykeeper_types::{Address, Result};
use serde::{Deserialize, Serialize};

use crate::transaction::{SuggestedParams, TxId};

/// What the ledger reports about one account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub address: Address,
    /// Balance in base units.
    pub amount: u64,
    /// Address currently authorized to sign for this account, when it is not
    /// the account itself.
    pub auth_addr: Option<Address>,
}

/// A ledger node, consumed as an opaque service.
///
/// Implemented over HTTP by [`crate::AlgodClient`] and in memory by
/// `keykeeper_nullables::NullLedger`.
#[async_trait]
pub trait LedgerService: Send + Sync {
    async fn account_information(&self, address: &Address) -> Result<AccountInfo>;

    async fn suggested_params(&self) -> Result<SuggestedParams>;

    /// Submit an encoded [`crate::SignedTransaction`].
    async fn send_raw_transaction(&self, signed: &[u8]) -> Result<TxId>;
}
