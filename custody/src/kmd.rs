//! HTTP client for a kmd-style key-custody daemon.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use keykeeper_crypto::{derive_address, keypair_from_exported};
use keykeeper_types::{
    Address, Error, ErrorKind, MasterDerivationKey, PrivateKey, Result, Wallet, WalletHandle,
    WalletId,
};
use keykeeper_utils::HttpSettings;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{
    ACCOUNT_NOT_FOUND, CUSTODY_REQUEST_FAILED, INVALID_WALLET_HANDLE, WALLET_ALREADY_EXISTS,
    WALLET_NOT_FOUND, WRONG_PASSWORD,
};
use crate::service::CustodyService;

/// Header carrying the daemon API token.
const TOKEN_HEADER: &str = "X-KMD-API-Token";

/// Backend message fragments and the kinds they map to. Checked in order.
const MESSAGE_KINDS: &[(&str, ErrorKind)] = &[
    ("wrong password", WRONG_PASSWORD),
    ("wallet not found", WALLET_NOT_FOUND),
    ("same name already exists", WALLET_ALREADY_EXISTS),
    ("key does not exist", ACCOUNT_NOT_FOUND),
    ("handle does not exist", INVALID_WALLET_HANDLE),
    ("handle has expired", INVALID_WALLET_HANDLE),
];

/// HTTP client for a custody daemon.
///
/// Wraps `reqwest::Client` with the daemon's base URL and API token and maps
/// each [`CustodyService`] call onto the daemon's `/v1` endpoints. Binary
/// fields travel as base64 strings.
#[derive(Clone)]
pub struct KmdClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct WalletRecord {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ListWalletsResponse {
    #[serde(default)]
    wallets: Vec<WalletRecord>,
}

#[derive(Debug, Deserialize)]
struct CreateWalletResponse {
    wallet: WalletRecord,
}

#[derive(Debug, Serialize)]
struct CreateWalletRequest<'a> {
    wallet_name: &'a str,
    wallet_password: &'a str,
    wallet_driver_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    master_derivation_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct InitHandleRequest<'a> {
    wallet_id: &'a str,
    wallet_password: &'a str,
}

#[derive(Debug, Deserialize)]
struct InitHandleResponse {
    wallet_handle_token: String,
}

#[derive(Debug, Serialize)]
struct HandleRequest<'a> {
    wallet_handle_token: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerateKeyRequest<'a> {
    wallet_handle_token: &'a str,
    display_mnemonic: bool,
}

#[derive(Debug, Serialize)]
struct KeyRequest<'a> {
    wallet_handle_token: &'a str,
    wallet_password: &'a str,
    address: &'a str,
}

#[derive(Debug, Serialize)]
struct PasswordRequest<'a> {
    wallet_handle_token: &'a str,
    wallet_password: &'a str,
}

#[derive(Debug, Deserialize)]
struct ListKeysResponse {
    #[serde(default)]
    addresses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateKeyResponse {
    address: String,
}

#[derive(Deserialize)]
struct ExportKeyResponse {
    private_key: String,
}

#[derive(Deserialize)]
struct ExportMasterKeyResponse {
    master_derivation_key: String,
}

#[derive(Debug, Deserialize)]
struct Empty {}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
}

impl KmdClient {
    /// Create a client targeting `base_url` (e.g. `http://localhost:4002`).
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        settings: HttpSettings,
    ) -> Result<Self> {
        let http = settings.build_client().map_err(|e| {
            CUSTODY_REQUEST_FAILED
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

    async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        tracing::debug!(%method, path, "custody request");
        let mut request = self
            .http
            .request(method, self.url(path))
            .header(TOKEN_HEADER, &self.token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|e| {
            CUSTODY_REQUEST_FAILED
                .error(format!("request to {path} failed"))
                .with_upstream(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.message)
                .unwrap_or_default();
            return Err(classify(path, status, &message));
        }
        response.json::<T>().await.map_err(|e| {
            CUSTODY_REQUEST_FAILED
                .error(format!("invalid response from {path}"))
                .with_upstream(e)
        })
    }
}

/// Turn a failed response into an error of the matching kind.
fn classify(path: &str, status: StatusCode, message: &str) -> Error {
    let lowered = message.to_ascii_lowercase();
    let kind = MESSAGE_KINDS
        .iter()
        .find(|(fragment, _)| lowered.contains(fragment))
        .map(|(_, kind)| *kind)
        .unwrap_or(CUSTODY_REQUEST_FAILED);
    if kind == CUSTODY_REQUEST_FAILED {
        kind.error(format!("{path} returned HTTP {status}: {message}"))
    } else {
        kind.error(message.to_string())
    }
}

fn decode_base64(field: &str, encoded: &str) -> Result<Vec<u8>> {
    BASE64.decode(encoded).map_err(|e| {
        CUSTODY_REQUEST_FAILED
            .error(format!("{field} is not valid base64"))
            .with_upstream(e)
    })
}

#[async_trait]
impl CustodyService for KmdClient {
    async fn list_wallets(&self) -> Result<Vec<Wallet>> {
        let resp: ListWalletsResponse = self.call::<(), _>(Method::GET, "/v1/wallets", None).await?;
        Ok(resp
            .wallets
            .into_iter()
            .map(|w| Wallet::new(WalletId::new(w.id), w.name))
            .collect())
    }

    async fn create_wallet(
        &self,
        name: &str,
        password: &str,
        driver: &str,
        master_key: Option<&MasterDerivationKey>,
    ) -> Result<Wallet> {
        let request = CreateWalletRequest {
            wallet_name: name,
            wallet_password: password,
            wallet_driver_name: driver,
            master_derivation_key: master_key.map(|mdk| BASE64.encode(mdk.as_bytes())),
        };
        let resp: CreateWalletResponse =
            self.call(Method::POST, "/v1/wallet", Some(&request)).await?;
        Ok(Wallet::new(WalletId::new(resp.wallet.id), resp.wallet.name))
    }

    async fn init_wallet_handle(&self, wallet_id: &WalletId, password: &str) -> Result<WalletHandle> {
        let request = InitHandleRequest {
            wallet_id: wallet_id.as_str(),
            wallet_password: password,
        };
        let resp: InitHandleResponse =
            self.call(Method::POST, "/v1/wallet/init", Some(&request)).await?;
        Ok(WalletHandle::new(resp.wallet_handle_token))
    }

    async fn release_wallet_handle(&self, handle: &WalletHandle) -> Result<()> {
        let request = HandleRequest {
            wallet_handle_token: handle.token(),
        };
        let _: Empty = self
            .call(Method::POST, "/v1/wallet/release", Some(&request))
            .await?;
        Ok(())
    }

    async fn list_keys(&self, handle: &WalletHandle) -> Result<Vec<Address>> {
        let request = HandleRequest {
            wallet_handle_token: handle.token(),
        };
        let resp: ListKeysResponse = self.call(Method::POST, "/v1/key/list", Some(&request)).await?;
        Ok(resp.addresses.into_iter().map(Address::new).collect())
    }

    async fn generate_key(&self, handle: &WalletHandle) -> Result<Address> {
        let request = GenerateKeyRequest {
            wallet_handle_token: handle.token(),
            display_mnemonic: false,
        };
        let resp: GenerateKeyResponse = self.call(Method::POST, "/v1/key", Some(&request)).await?;
        Ok(Address::new(resp.address))
    }

    async fn delete_key(&self, handle: &WalletHandle, password: &str, address: &Address) -> Result<()> {
        let request = KeyRequest {
            wallet_handle_token: handle.token(),
            wallet_password: password,
            address: address.as_str(),
        };
        let _: Empty = self.call(Method::DELETE, "/v1/key", Some(&request)).await?;
        Ok(())
    }

    async fn export_key(
        &self,
        handle: &WalletHandle,
        password: &str,
        address: &Address,
    ) -> Result<PrivateKey> {
        let request = KeyRequest {
            wallet_handle_token: handle.token(),
            wallet_password: password,
            address: address.as_str(),
        };
        let resp: ExportKeyResponse =
            self.call(Method::POST, "/v1/key/export", Some(&request)).await?;
        let mut bytes = decode_base64("private_key", &resp.private_key)?;
        let imported = keypair_from_exported(&bytes);
        bytes.zeroize();
        let keypair = imported.map_err(|e| {
            CUSTODY_REQUEST_FAILED
                .error("exported private key is malformed")
                .with_upstream(e)
        })?;
        if &derive_address(&keypair.public) != address {
            return Err(CUSTODY_REQUEST_FAILED.error(format!(
                "exported private key does not belong to {address}"
            )));
        }
        Ok(keypair.private)
    }

    async fn export_master_derivation_key(
        &self,
        handle: &WalletHandle,
        password: &str,
    ) -> Result<MasterDerivationKey> {
        let request = PasswordRequest {
            wallet_handle_token: handle.token(),
            wallet_password: password,
        };
        let resp: ExportMasterKeyResponse = self
            .call(Method::POST, "/v1/master-key/export", Some(&request))
            .await?;
        let mut bytes = decode_base64("master_derivation_key", &resp.master_derivation_key)?;
        let mut key = [0u8; 32];
        let result = if bytes.len() == key.len() {
            key.copy_from_slice(&bytes);
            Ok(MasterDerivationKey(key))
        } else {
            Err(CUSTODY_REQUEST_FAILED.error(format!(
                "master derivation key must be 32 bytes, got {}",
                bytes.len()
            )))
        };
        bytes.zeroize();
        key.zeroize();
        result
    }
}
