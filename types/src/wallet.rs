//! Wallets hosted by the custody service and the handles that unlock them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque wallet identifier assigned by the custody service.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(String);

impl WalletId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, password-protected container of accounts.
///
/// Names are unique within one custody service. A wallet is immutable once
/// created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub name: String,
}

impl Wallet {
    pub fn new(id: WalletId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A short-lived lease token bound to one wallet.
///
/// Handles are only ever obtained inside a scoped session and are released
/// when that scope ends. The token is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct WalletHandle(String);

impl WalletHandle {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token to present to the custody service.
    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for WalletHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "WalletHandle({prefix}…)")
    }
}
