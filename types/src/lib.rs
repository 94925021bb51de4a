//! Fundamental types for keykeeper.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! account addresses, wallets and wallet handles, key material, and the
//! identity-based [`Error`] that threads causality through every operation.

pub mod address;
pub mod error;
pub mod keys;
pub mod wallet;

pub use address::Address;
pub use error::{Category, Cause, Error, ErrorId, ErrorKind, Result};
pub use keys::{KeyPair, MasterDerivationKey, PrivateKey, PublicKey, Signature};
pub use wallet::{Wallet, WalletHandle, WalletId};
