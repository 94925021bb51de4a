//! Account address type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A ledger account address: the public-key encoding that identifies an account.
///
/// The encoding is produced and checked by `keykeeper_crypto::address`; this
/// type only carries the string. Addresses are compared by exact text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Length of a well-formed address: base32 of 32 key bytes + 4 checksum bytes.
    pub const ENCODED_LEN: usize = 58;

    /// Wrap a raw address string without validating it.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cheap shape check (length and alphabet). Checksum validation lives in
    /// `keykeeper_crypto::validate_address`.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == Self::ENCODED_LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
