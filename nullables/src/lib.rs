//! Nullable infrastructure for deterministic testing.
//!
//! The core talks to two remote services, both behind traits. This crate
//! provides in-memory implementations that:
//! - Return deterministic values (wallet ids, handle tokens, master keys)
//! - Can be controlled programmatically (fund accounts, inject failures)
//! - Never touch the network
//!
//! Usage: hand an `Arc<NullCustody>` or `Arc<NullLedger>` to the component
//! under test where production code would pass a `KmdClient` or `AlgodClient`.

pub mod custody;
pub mod ledger;

pub use custody::NullCustody;
pub use ledger::NullLedger;
