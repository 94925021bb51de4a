//! HTTP client for an algod-style ledger node.

use async_trait::async_trait;
use keykeeper_types::{Address, Error, Result};
use keykeeper_utils::HttpSettings;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{LEDGER_REQUEST_FAILED, TRANSACTION_REJECTED};
use crate::service::{AccountInfo, LedgerService};
use crate::transaction::{SuggestedParams, TxId, VALIDITY_WINDOW};

/// Header carrying the node API token.
const TOKEN_HEADER: &str = "X-Algod-API-Token";

/// HTTP client for a ledger node.
///
/// Wraps `reqwest::Client` with the node's base URL and API token and maps
/// each [`LedgerService`] call onto the node's REST endpoints.
#[derive(Clone)]
pub struct AlgodClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    address: String,
    amount: u64,
    #[serde(rename = "auth-addr", default)]
    auth_addr: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ParamsResponse {
    fee: u64,
    #[serde(rename = "min-fee")]
    min_fee: u64,
    #[serde(rename = "last-round")]
    last_round: u64,
    #[serde(rename = "genesis-id")]
    genesis_id: String,
    #[serde(rename = "genesis-hash")]
    genesis_hash: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(rename = "txId")]
    tx_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

impl AlgodClient {
    /// Create a client targeting `base_url` (e.g. `http://localhost:4001`).
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        settings: HttpSettings,
    ) -> Result<Self> {
        let http = settings.build_client().map_err(|e| {
            LEDGER_REQUEST_FAILED
                .error("failed to create HTTP client")
                .with_upstream(e)
        })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        tracing::debug!(path, "ledger GET");
        let response = self
            .http
            .get(self.url(path))
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(|e| request_failed(path, e))?;
        decode_response(path, response).await
    }
}

fn request_failed(path: &str, e: reqwest::Error) -> Error {
    LEDGER_REQUEST_FAILED
        .error(format!("request to {path} failed"))
        .with_upstream(e)
}

async fn decode_response<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .json::<ErrorResponse>()
            .await
            .map(|body| body.message)
            .unwrap_or_default();
        let kind = if status == StatusCode::BAD_REQUEST && path == "/v2/transactions" {
            TRANSACTION_REJECTED
        } else {
            LEDGER_REQUEST_FAILED
        };
        return Err(kind.error(format!("{path} returned HTTP {status}: {message}")));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| {
            LEDGER_REQUEST_FAILED
                .error(format!("invalid response from {path}"))
                .with_upstream(e)
        })
}

#[async_trait]
impl LedgerService for AlgodClient {
    async fn account_information(&self, address: &Address) -> Result<AccountInfo> {
        let path = format!("/v2/accounts/{address}?exclude=all");
        let resp: AccountResponse = self.get_json(&path).await?;
        Ok(AccountInfo {
            address: Address::new(resp.address),
            amount: resp.amount,
            auth_addr: resp
                .auth_addr
                .filter(|a| !a.is_empty())
                .map(Address::new),
        })
    }

    async fn suggested_params(&self) -> Result<SuggestedParams> {
        let resp: ParamsResponse = self.get_json("/v2/transactions/params").await?;
        Ok(SuggestedParams {
            fee: resp.fee,
            min_fee: resp.min_fee,
            first_valid: resp.last_round,
            last_valid: resp.last_round + VALIDITY_WINDOW,
            genesis_id: resp.genesis_id,
            genesis_hash: resp.genesis_hash,
        })
    }

    async fn send_raw_transaction(&self, signed: &[u8]) -> Result<TxId> {
        let path = "/v2/transactions";
        tracing::debug!(path, bytes = signed.len(), "ledger POST");
        let response = self
            .http
            .post(self.url(path))
            .header(TOKEN_HEADER, &self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/x-binary")
            .body(signed.to_vec())
            .send()
            .await
            .map_err(|e| request_failed(path, e))?;
        let resp: SubmitResponse = decode_response(path, response).await?;
        Ok(TxId::new(resp.tx_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation_trims_trailing_slash() {
        let client = AlgodClient::new("http://127.0.0.1:4001/", "a".repeat(64), HttpSettings::default())
            .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:4001");
        assert_eq!(client.url("/v2/status"), "http://127.0.0.1:4001/v2/status");
    }

    #[test]
    fn account_response_without_auth_addr_parses() {
        let resp: AccountResponse =
            serde_json::from_str(r#"{"address":"ABC","amount":7}"#).unwrap();
        assert_eq!(resp.auth_addr, None);
        assert_eq!(resp.amount, 7);
    }

    #[test]
    fn params_response_parses_kebab_case() {
        let resp: ParamsResponse = serde_json::from_str(
            r#"{"fee":0,"min-fee":1000,"last-round":42,"genesis-id":"dev","genesis-hash":"aGFzaA=="}"#,
        )
        .unwrap();
        assert_eq!(resp.min_fee, 1000);
        assert_eq!(resp.last_round, 42);
    }

    #[tokio::test]
    async fn unreachable_node_is_upstream_failure() {
        let client = AlgodClient::new(
            "http://127.0.0.1:9",
            "token",
            HttpSettings::from_secs(2, 1),
        )
        .unwrap();
        let err = client.suggested_params().await.unwrap_err();
        assert!(err.is(LEDGER_REQUEST_FAILED));
        assert!(err.find_upstream::<reqwest::Error>().is_some());
    }
}
