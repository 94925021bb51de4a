//! Wallet credentials and the single place they are validated.

use keykeeper_types::Result;
use std::fmt;
use zeroize::Zeroizing;

use crate::error::{INVALID_WALLET_NAME, INVALID_WALLET_PASSWORD};

/// A wallet name and password, trimmed and known to be non-blank.
///
/// Never persisted. The password is wiped from memory when the credential is
/// dropped and never appears in `Debug` output.
#[derive(Clone)]
pub struct WalletCredential {
    name: String,
    password: Zeroizing<String>,
}

impl WalletCredential {
    pub fn new(name: &str, password: &str) -> Result<Self> {
        let name = normalize_wallet_name(name)?;
        let password = password.trim();
        if password.is_empty() {
            return Err(INVALID_WALLET_PASSWORD.error("wallet password must not be blank"));
        }
        Ok(Self {
            name,
            password: Zeroizing::new(password.to_string()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for WalletCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletCredential")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Trim a wallet name, rejecting it when nothing is left.
pub fn normalize_wallet_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(INVALID_WALLET_NAME.error("wallet name must not be blank"));
    }
    Ok(name.to_string())
}
