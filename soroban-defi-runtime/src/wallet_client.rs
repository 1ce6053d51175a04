//! REST client for the custodial smart-wallet provider.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::address::is_account_id;
use crate::config::{Network, SdkConfig};
use crate::error::{ConfigErrorCode, DefiError, Result, WalletErrorCode};
use crate::http::{HttpFailure, send_json};
use crate::types::{
    CreateWalletRequest, SignedTransaction, Signer, SubmittedTransaction, TokenBalance, Wallet,
};

const API_VERSION: &str = "v1";
const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone)]
pub struct WalletClient {
    network: Network,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateWalletBody<'a> {
    network: Network,
    #[serde(flatten)]
    request: &'a CreateWalletRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionBody<'a> {
    network: Network,
    xdr: &'a str,
}

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    balances: Vec<TokenBalance>,
}

impl WalletClient {
    pub fn new(network: Network, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(network, base_url, api_key, reqwest::Client::new())
    }

    pub fn with_client(
        network: Network,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            network,
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &SdkConfig, client: reqwest::Client) -> Self {
        Self::with_client(
            config.network,
            config.wallet_base_url(),
            config.wallet.api_key.clone(),
            client,
        )
        .with_timeout(config.timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    fn ensure_api_key(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(DefiError::config(
                ConfigErrorCode::MissingApiKey,
                "Wallet API key is not configured",
            ));
        }
        Ok(())
    }

    fn ensure_address(address: &str) -> Result<()> {
        if !is_account_id(address) {
            return Err(DefiError::wallet(
                WalletErrorCode::InvalidAddress,
                format!("Invalid wallet address '{address}'"),
            ));
        }
        Ok(())
    }

    /// Signer keys are strkeys or base64. Anything else, `.` and `..` in
    /// particular, never reaches a URL path.
    fn ensure_signer_key(public_key: &str) -> Result<()> {
        let valid = !public_key.is_empty()
            && public_key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=' | b'-' | b'_'));
        if !valid {
            return Err(DefiError::wallet(
                WalletErrorCode::SignerUpdateFailed,
                format!("Invalid signer public key '{public_key}'"),
            ));
        }
        Ok(())
    }

    /// `{base}/v1/{segments...}`. Each segment is percent-encoded on its own,
    /// so a `/` inside a value cannot add a path level.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let invalid = || {
            DefiError::config(
                ConfigErrorCode::InvalidUrl,
                format!("Invalid wallet API URL '{}'", self.base_url),
            )
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid().with_source(e))?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .push(API_VERSION)
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, segments: &[&str]) -> Result<reqwest::RequestBuilder> {
        let url = self.url(segments)?;
        debug!(%method, %url, "wallet api request");
        Ok(self
            .client
            .request(method, url)
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(self.timeout))
    }

    /// Map a failed call. 404 on a wallet path means the wallet is unknown
    /// to the provider.
    fn fail(failure: HttpFailure, code: WalletErrorCode, context: String) -> DefiError {
        Self::fail_with(failure, code, WalletErrorCode::NotFound, context)
    }

    fn fail_with(
        failure: HttpFailure,
        code: WalletErrorCode,
        not_found: WalletErrorCode,
        context: String,
    ) -> DefiError {
        warn!(status = ?failure.status(), %context, "wallet api call failed");
        failure.into_error(|api| {
            let code = if api.status == 404 { not_found } else { code };
            DefiError::wallet(code, format!("{context}: HTTP {}", api.status))
        })
    }

    /// Create a smart wallet controlled by `request.signers`.
    pub async fn create_wallet(&self, request: &CreateWalletRequest) -> Result<Wallet> {
        self.ensure_api_key()?;
        if request.signers.is_empty() {
            return Err(DefiError::wallet(
                WalletErrorCode::CreationFailed,
                "At least one signer is required",
            ));
        }

        let body = CreateWalletBody {
            network: self.network,
            request,
        };
        send_json(self.request(reqwest::Method::POST, &["wallets"])?.json(&body))
            .await
            .map_err(|f| {
                // A 404 here is the collection route itself, not a wallet.
                warn!(status = ?f.status(), "wallet creation failed");
                f.into_error(|api| {
                    DefiError::wallet(
                        WalletErrorCode::CreationFailed,
                        format!("Wallet creation failed: HTTP {}", api.status),
                    )
                })
            })
    }

    pub async fn get_wallet(&self, address: &str) -> Result<Wallet> {
        self.ensure_api_key()?;
        Self::ensure_address(address)?;

        send_json(self.request(reqwest::Method::GET, &["wallets", address])?)
            .await
            .map_err(|f| {
                Self::fail(
                    f,
                    WalletErrorCode::RequestFailed,
                    format!("Failed to fetch wallet {address}"),
                )
            })
    }

    pub async fn add_signer(&self, address: &str, signer: &Signer) -> Result<Wallet> {
        self.ensure_api_key()?;
        Self::ensure_address(address)?;

        send_json(
            self.request(reqwest::Method::POST, &["wallets", address, "signers"])?
                .json(signer),
        )
        .await
        .map_err(|f| {
            Self::fail(
                f,
                WalletErrorCode::SignerUpdateFailed,
                format!("Failed to add signer to {address}"),
            )
        })
    }

    pub async fn remove_signer(&self, address: &str, public_key: &str) -> Result<Wallet> {
        self.ensure_api_key()?;
        Self::ensure_address(address)?;
        Self::ensure_signer_key(public_key)?;

        send_json(self.request(
            reqwest::Method::DELETE,
            &["wallets", address, "signers", public_key],
        )?)
        .await
        .map_err(|f| {
            // The wallet was resolved by the caller; 404 here is the signer.
            Self::fail_with(
                f,
                WalletErrorCode::SignerUpdateFailed,
                WalletErrorCode::SignerUpdateFailed,
                format!("Failed to remove signer {public_key} from {address}"),
            )
        })
    }

    /// Have the provider sign `xdr` with the wallet's custodial signer.
    pub async fn sign_transaction(&self, address: &str, xdr: &str) -> Result<SignedTransaction> {
        self.ensure_api_key()?;
        Self::ensure_address(address)?;

        let body = TransactionBody {
            network: self.network,
            xdr,
        };
        send_json(
            self.request(
                reqwest::Method::POST,
                &["wallets", address, "transactions", "sign"],
            )?
            .json(&body),
        )
        .await
        .map_err(|f| {
            Self::fail(
                f,
                WalletErrorCode::SigningFailed,
                format!("Failed to sign transaction for {address}"),
            )
        })
    }

    pub async fn submit_transaction(
        &self,
        address: &str,
        signed_xdr: &str,
    ) -> Result<SubmittedTransaction> {
        self.ensure_api_key()?;
        Self::ensure_address(address)?;

        let body = TransactionBody {
            network: self.network,
            xdr: signed_xdr,
        };
        send_json(
            self.request(
                reqwest::Method::POST,
                &["wallets", address, "transactions", "submit"],
            )?
            .json(&body),
        )
        .await
        .map_err(|f| {
            Self::fail(
                f,
                WalletErrorCode::SubmissionFailed,
                format!("Failed to submit transaction for {address}"),
            )
        })
    }

    /// Sign with the custodial signer, then submit.
    pub async fn sign_and_submit(&self, address: &str, xdr: &str) -> Result<SubmittedTransaction> {
        let signed = self.sign_transaction(address, xdr).await?;
        self.submit_transaction(address, &signed.signed_xdr).await
    }

    /// Token balances held by the wallet, optionally filtered to one token.
    pub async fn get_balances(&self, address: &str, token: Option<&str>) -> Result<Vec<TokenBalance>> {
        self.ensure_api_key()?;
        Self::ensure_address(address)?;

        let mut request = self.request(reqwest::Method::GET, &["wallets", address, "balances"])?;
        if let Some(token) = token {
            request = request.query(&[("token", token)]);
        }

        let resp: BalancesResponse = send_json(request).await.map_err(|f| {
            Self::fail(
                f,
                WalletErrorCode::BalanceFailed,
                format!("Failed to fetch balances for {address}"),
            )
        })?;
        Ok(resp.balances)
    }
}
