//! Ledger node client for keykeeper.
//!
//! Provides:
//! - [`LedgerService`]: the three node calls the core relies on, with an
//!   HTTP implementation in [`AlgodClient`]
//! - Payment transactions and their signed envelope
//! - [`TransactionSigner`] and an in-memory [`KeyPairSigner`]
//! - The rekey protocol: resolving an account's auth address, building rekey
//!   and rekey-back transactions, and [`LedgerRekeying`] which signs and
//!   submits them

pub mod algod;
pub mod error;
pub mod msgpack;
pub mod rekey;
pub mod service;
pub mod signer;
pub mod transaction;

pub use algod::AlgodClient;
pub use rekey::{
    get_auth_addr, make_rekey_back_transaction, make_rekey_transaction, LedgerRekeying,
    RekeyPolicy, Rekeying,
};
pub use service::{AccountInfo, LedgerService};
pub use signer::{KeyPairSigner, TransactionSigner};
pub use transaction::{SignedTransaction, SuggestedParams, Transaction, TxId};
