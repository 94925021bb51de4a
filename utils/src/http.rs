//! HTTP client settings shared by the custody and ledger clients.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts applied to every outbound request.
///
/// The core adds no timeout layer of its own; these are the only bounds on
/// how long a remote call may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl HttpSettings {
    pub fn from_secs(request_timeout_secs: u64, connect_timeout_secs: u64) -> Self {
        Self {
            request_timeout: Duration::from_secs(request_timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
        }
    }

    /// Build a `reqwest` client with these timeouts.
    pub fn build_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .build()
    }
}
