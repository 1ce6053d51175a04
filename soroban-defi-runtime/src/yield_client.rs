//! Yield-vault client.
//!
//! Vault metadata and positions come from a built-in catalogue rather than
//! from ledger reads, and deposit/withdraw payloads are base64-encoded JSON
//! describing the vault call. Only the APY lookup hits the vault API.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::address::{is_account_id, is_contract_id};
use crate::config::{Network, SdkConfig};
use crate::error::{ConfigErrorCode, DefiError, Result, YieldErrorCode};
use crate::http::{join_url, send_json};
use crate::quote::{minimum_received, mul_div, resolve_slippage};
use crate::types::{
    DepositRequest, StrategyAllocation, Vault, VaultAsset, VaultOperation, VaultPosition,
    VaultTransaction, WithdrawRequest,
};

const TESTNET_XLM_VAULT: &str = "CCLV4H7WTLJQ7ATLHBBQV2WW3OINF3FOY5XZ7VPHZO7NH3D2ZS4GFSF6";
const TESTNET_USDC_VAULT: &str = "CDR5UL4LX6KKHNJQ7UZ7GVNPO3XN5QGAWXHZTGYRVP3RWZU5D5AKTDQC";
const TESTNET_USDC: &str = "CBIELTK6YBZJU5UP2WWQEUCYKLPU6AUNZ2BQ4WWFEIE3USCIHMXQDAMA";
const MAINNET_XLM_VAULT: &str = "CDB2WMKQQNVZMEBY7Q7GZ5C7E7IAFSNMZ7GGVD6WKTCEWK7XOIAVZSAP";
const MAINNET_USDC_VAULT: &str = "CA2FIPJ7U6BG3N7EOZFI74XPJZOEOD4TYWXFVCIO5VDCHTVAGS6F4UKK";
const MAINNET_USDC: &str = "CCW67TSZV3SSS2HXMBQ5JFGCKJNXKZM7UQUWUZPUTHXSTZLEO7SJMI75";

const BLEND_XLM_STRATEGY: &str = "CDVLOSPJPQOTB6ZCWO5VSGTOLGMKTXSFWYTUP572GTPNOWX4F76X3HPM";
const BLEND_USDC_STRATEGY: &str = "CALLOM5I7XLQPPOPQMYAHUWW4N7O3JKT42KQ4ASEEVBXDJMNJOVWMBS7";
const VAULT_MANAGER: &str = "GDLKAUKHGXHSBYTXW7SBX6MZPZ2CUUQX2OGX5LSOI7U6RXVQ2VFO34N3";
const EMERGENCY_MANAGER: &str = "GCQMGZ2HPPBGBGRNZP3NA4DZ4A3E3K7QH5E3TG2MBBIPD6HFHVZQHZRU";
const FEE_RECEIVER: &str = "GAPUMTUJMVQJXFTJJ4Y2JHVPVPNOMEMLHNXTUMV5ANK4FV6XNHRLXTAW";

/// Mock share price: 1.25 underlying units per share.
const MOCK_TOTAL_VALUE_LOCKED: u128 = 1_250_000_000_000;
const MOCK_TOTAL_SHARES: u128 = 1_000_000_000_000;
const MOCK_POSITION_SHARES: u128 = 100_000_000;

#[derive(Debug, Clone)]
pub struct YieldClient {
    network: Network,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ApyResponse {
    apy: Decimal,
}

/// Contract call described by a placeholder payload.
#[derive(Debug, Serialize)]
struct VaultCall<'a> {
    network: &'a str,
    contract: &'a str,
    method: &'a str,
    source: &'a str,
    args: serde_json::Value,
}

fn vault_entry(network: Network, address: &str, asset: &str, symbol: &str, strategy: &str) -> Vault {
    Vault {
        address: address.to_string(),
        name: format!("DeFindex {symbol} Vault"),
        symbol: format!("df{symbol}"),
        assets: vec![VaultAsset {
            address: asset.to_string(),
            symbol: symbol.to_string(),
            allocation_pct: Decimal::ONE_HUNDRED,
        }],
        strategies: vec![StrategyAllocation {
            address: strategy.to_string(),
            name: format!("Blend {symbol} Autocompound"),
            asset: asset.to_string(),
            amount: MOCK_TOTAL_VALUE_LOCKED,
            paused: false,
        }],
        total_value_locked: MOCK_TOTAL_VALUE_LOCKED,
        total_shares: MOCK_TOTAL_SHARES,
        vault_fee_pct: Decimal::new(5, 1),
        protocol_fee_pct: Decimal::new(5, 2),
        manager: VAULT_MANAGER.to_string(),
        emergency_manager: EMERGENCY_MANAGER.to_string(),
        fee_receiver: FEE_RECEIVER.to_string(),
        network,
    }
}

fn catalogue(network: Network) -> Vec<Vault> {
    let native = network.native_asset();
    match network {
        Network::Testnet => vec![
            vault_entry(network, TESTNET_XLM_VAULT, native, "XLM", BLEND_XLM_STRATEGY),
            vault_entry(network, TESTNET_USDC_VAULT, TESTNET_USDC, "USDC", BLEND_USDC_STRATEGY),
        ],
        Network::Mainnet => vec![
            vault_entry(network, MAINNET_XLM_VAULT, native, "XLM", BLEND_XLM_STRATEGY),
            vault_entry(network, MAINNET_USDC_VAULT, MAINNET_USDC, "USDC", BLEND_USDC_STRATEGY),
        ],
    }
}

fn ensure_vault(address: &str) -> Result<()> {
    if !is_contract_id(address) {
        return Err(DefiError::vault(
            YieldErrorCode::InvalidVault,
            format!("Invalid vault address '{address}'"),
        ));
    }
    Ok(())
}

fn ensure_account(address: &str) -> Result<()> {
    if !is_account_id(address) {
        return Err(DefiError::vault(
            YieldErrorCode::InvalidAccount,
            format!("Invalid account address '{address}'"),
        ));
    }
    Ok(())
}

/// `amount * multiplier / denominator`, zero for an empty vault.
fn pro_rata(amount: u128, multiplier: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        return Some(0);
    }
    mul_div(amount, multiplier, denominator)
}

fn overflow(amount: u128) -> DefiError {
    DefiError::vault(
        YieldErrorCode::InvalidAmount,
        format!("Amount {amount} too large for this vault"),
    )
}

impl YieldClient {
    pub fn new(network: Network, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            network,
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &SdkConfig, client: reqwest::Client) -> Self {
        Self {
            network: config.network,
            base_url: config.yield_base_url(),
            api_key: config.yield_.api_key.clone(),
            client,
            timeout: config.timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Every vault known for the configured network.
    pub fn list_vaults(&self) -> Vec<Vault> {
        catalogue(self.network)
    }

    /// Vault metadata. Unknown addresses get a single-asset native vault.
    pub fn get_vault(&self, address: &str) -> Result<Vault> {
        ensure_vault(address)?;
        let vault = catalogue(self.network)
            .into_iter()
            .find(|v| v.address == address)
            .unwrap_or_else(|| {
                vault_entry(
                    self.network,
                    address,
                    self.network.native_asset(),
                    "XLM",
                    BLEND_XLM_STRATEGY,
                )
            });
        debug!(vault = %vault.address, tvl = vault.total_value_locked, "vault metadata");
        Ok(vault)
    }

    pub fn get_position(&self, vault: &str, user: &str) -> Result<VaultPosition> {
        let meta = self.get_vault(vault)?;
        ensure_account(user)?;
        let underlying_value = pro_rata(MOCK_POSITION_SHARES, meta.total_value_locked, meta.total_shares)
            .ok_or_else(|| overflow(MOCK_POSITION_SHARES))?;
        Ok(VaultPosition {
            vault: meta.address,
            user: user.to_string(),
            shares: MOCK_POSITION_SHARES,
            underlying_value,
        })
    }

    /// Current APY in percent, from the vault API.
    pub async fn get_apy(&self, vault: &str) -> Result<Decimal> {
        ensure_vault(vault)?;
        if self.api_key.trim().is_empty() {
            return Err(DefiError::config(
                ConfigErrorCode::MissingApiKey,
                "Yield API key is not configured",
            ));
        }

        let url = join_url(&self.base_url, &format!("vault/{vault}/apy"));
        debug!(%url, network = %self.network, "vault api request");
        let resp: ApyResponse = send_json(
            self.client
                .get(url)
                .query(&[("network", self.network.as_str())])
                .bearer_auth(&self.api_key)
                .timeout(self.timeout),
        )
        .await
        .map_err(|f| {
            warn!(%vault, status = ?f.status(), "apy query failed");
            f.into_error(|api| {
                DefiError::vault(
                    YieldErrorCode::ApyFailed,
                    format!("APY query for {vault} failed: HTTP {}", api.status),
                )
            })
        })?;
        Ok(resp.apy)
    }

    fn encode(&self, call: &VaultCall<'_>) -> Result<String> {
        Ok(BASE64.encode(serde_json::to_vec(call)?))
    }

    /// Deposit payload. Shares are estimated pro rata against the vault's
    /// total value locked.
    pub fn build_deposit(&self, request: &DepositRequest) -> Result<VaultTransaction> {
        let vault = self.get_vault(&request.vault)?;
        ensure_account(&request.from)?;
        let slippage_bps = resolve_slippage(request.slippage_bps)?;
        if request.amounts.is_empty() || request.amounts.iter().any(|&a| a == 0) {
            return Err(DefiError::vault(
                YieldErrorCode::InvalidAmount,
                "Deposit amounts must be non-empty and positive",
            ));
        }
        if request.amounts.len() > vault.assets.len() {
            return Err(DefiError::vault(
                YieldErrorCode::InvalidAmount,
                format!(
                    "Vault {} holds {} asset(s), got {} amounts",
                    vault.address,
                    vault.assets.len(),
                    request.amounts.len()
                ),
            ));
        }

        let total = request
            .amounts
            .iter()
            .try_fold(0u128, |acc, &a| acc.checked_add(a))
            .ok_or_else(|| overflow(u128::MAX))?;
        let shares = pro_rata(total, vault.total_shares, vault.total_value_locked)
            .ok_or_else(|| overflow(total))?;
        let amounts_min: Vec<String> = request
            .amounts
            .iter()
            .map(|&a| minimum_received(a, slippage_bps).to_string())
            .collect();

        let xdr = self.encode(&VaultCall {
            network: self.network.as_str(),
            contract: &vault.address,
            method: "deposit",
            source: &request.from,
            args: serde_json::json!({
                "amountsDesired": request.amounts.iter().map(u128::to_string).collect::<Vec<_>>(),
                "amountsMin": amounts_min,
                "from": request.from,
                "invest": request.invest,
            }),
        })?;

        info!(vault = %vault.address, from = %request.from, shares, "built vault deposit");
        Ok(VaultTransaction {
            xdr,
            vault: vault.address,
            operation: VaultOperation::Deposit,
            estimated_shares: Some(shares),
            estimated_amounts: request.amounts.clone(),
            built_at: Utc::now(),
        })
    }

    /// Withdraw payload. The underlying amount is estimated from the share
    /// price and floored by the slippage tolerance in the call arguments.
    pub fn build_withdraw(&self, request: &WithdrawRequest) -> Result<VaultTransaction> {
        let vault = self.get_vault(&request.vault)?;
        ensure_account(&request.from)?;
        let slippage_bps = resolve_slippage(request.slippage_bps)?;
        if request.shares == 0 {
            return Err(DefiError::vault(
                YieldErrorCode::InvalidAmount,
                "Withdraw shares must be positive",
            ));
        }

        let underlying = pro_rata(request.shares, vault.total_value_locked, vault.total_shares)
            .ok_or_else(|| overflow(request.shares))?;
        let xdr = self.encode(&VaultCall {
            network: self.network.as_str(),
            contract: &vault.address,
            method: "withdraw",
            source: &request.from,
            args: serde_json::json!({
                "withdrawShares": request.shares.to_string(),
                "minAmountsOut": [minimum_received(underlying, slippage_bps).to_string()],
                "from": request.from,
            }),
        })?;

        info!(vault = %vault.address, from = %request.from, shares = request.shares, "built vault withdraw");
        Ok(VaultTransaction {
            xdr,
            vault: vault.address,
            operation: VaultOperation::Withdraw,
            estimated_shares: Some(request.shares),
            estimated_amounts: vec![underlying],
            built_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::fixtures::{USDC, USER, VAULT, XLM};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> YieldClient {
        YieldClient::new(Network::Testnet, "http://localhost:1", "yield-key")
    }

    fn decode(xdr: &str) -> serde_json::Value {
        serde_json::from_slice(&BASE64.decode(xdr).unwrap()).unwrap()
    }

    #[test]
    fn test_catalogue_addresses_are_contracts() {
        for network in [Network::Testnet, Network::Mainnet] {
            for vault in catalogue(network) {
                assert!(is_contract_id(&vault.address), "{}", vault.address);
                assert!(is_contract_id(vault.primary_asset().unwrap()));
                for strategy in &vault.strategies {
                    assert!(is_contract_id(&strategy.address));
                }
                for account in [&vault.manager, &vault.emergency_manager, &vault.fee_receiver] {
                    assert!(is_account_id(account), "{account}");
                }
            }
        }
    }

    #[test]
    fn test_get_vault() {
        let vault = client().get_vault(VAULT).unwrap();
        assert_eq!(vault.address, VAULT);
        assert_eq!(vault.primary_asset(), Some(XLM));

        let usdc = client().get_vault(TESTNET_USDC_VAULT).unwrap();
        assert_eq!(usdc.primary_asset(), Some(USDC));
    }

    #[test]
    fn test_invalid_vault_address() {
        let err = client().get_vault("not-a-vault").unwrap_err();
        assert_eq!(err.code(), "INVALID_VAULT");
        let err = client().get_vault(USER).unwrap_err();
        assert_eq!(err.code(), "INVALID_VAULT");
    }

    #[test]
    fn test_position_values_shares_at_share_price() {
        let position = client().get_position(VAULT, USER).unwrap();
        assert_eq!(position.shares, 100_000_000);
        assert_eq!(position.underlying_value, 125_000_000);
        assert_eq!(
            client().get_position(VAULT, "bob").unwrap_err().code(),
            "INVALID_VAULT_ACCOUNT"
        );
    }

    #[test]
    fn test_build_deposit() {
        let tx = client()
            .build_deposit(&DepositRequest {
                vault: VAULT.into(),
                amounts: vec![1_000_000_000],
                from: USER.into(),
                invest: true,
                slippage_bps: None,
            })
            .unwrap();
        assert_eq!(tx.operation, VaultOperation::Deposit);
        assert_eq!(tx.estimated_shares, Some(800_000_000));
        assert_eq!(tx.estimated_amounts, vec![1_000_000_000]);

        let payload = decode(&tx.xdr);
        assert_eq!(payload["method"], "deposit");
        assert_eq!(payload["contract"], VAULT);
        assert_eq!(payload["args"]["amountsDesired"][0], "1000000000");
        assert_eq!(payload["args"]["amountsMin"][0], "990000000");
        assert_eq!(payload["args"]["invest"], true);
    }

    #[test]
    fn test_build_deposit_rejects_bad_amounts() {
        let base = DepositRequest {
            vault: VAULT.into(),
            amounts: vec![],
            from: USER.into(),
            invest: false,
            slippage_bps: None,
        };
        let err = client().build_deposit(&base).unwrap_err();
        assert_eq!(err.code(), "INVALID_VAULT_AMOUNT");

        let zero = DepositRequest { amounts: vec![0], ..base.clone() };
        assert_eq!(client().build_deposit(&zero).unwrap_err().code(), "INVALID_VAULT_AMOUNT");

        let too_many = DepositRequest { amounts: vec![1, 2], ..base.clone() };
        assert_eq!(
            client().build_deposit(&too_many).unwrap_err().code(),
            "INVALID_VAULT_AMOUNT"
        );

        let bad_vault = DepositRequest { vault: "CX".into(), amounts: vec![1], ..base };
        assert_eq!(client().build_deposit(&bad_vault).unwrap_err().code(), "INVALID_VAULT");
    }

    #[test]
    fn test_build_withdraw() {
        let tx = client()
            .build_withdraw(&WithdrawRequest {
                vault: VAULT.into(),
                shares: 800_000_000,
                from: USER.into(),
                slippage_bps: Some(50),
            })
            .unwrap();
        assert_eq!(tx.operation, VaultOperation::Withdraw);
        assert_eq!(tx.estimated_amounts, vec![1_000_000_000]);

        let payload = decode(&tx.xdr);
        assert_eq!(payload["method"], "withdraw");
        assert_eq!(payload["args"]["withdrawShares"], "800000000");
        assert_eq!(payload["args"]["minAmountsOut"][0], "995000000");

        let err = client()
            .build_withdraw(&WithdrawRequest {
                vault: VAULT.into(),
                shares: 0,
                from: USER.into(),
                slippage_bps: None,
            })
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_VAULT_AMOUNT");
    }

    #[tokio::test]
    async fn test_get_apy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/vault/{VAULT}/apy")))
            .and(query_param("network", "testnet"))
            .and(header("authorization", "Bearer yield-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "apy": "7.42" })))
            .expect(1)
            .mount(&server)
            .await;

        let yields = YieldClient::new(Network::Testnet, server.uri(), "yield-key");
        assert_eq!(yields.get_apy(VAULT).await.unwrap(), Decimal::new(742, 2));
    }

    #[tokio::test]
    async fn test_get_apy_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream"))
            .mount(&server)
            .await;

        let yields = YieldClient::new(Network::Testnet, server.uri(), "yield-key");
        let err = yields.get_apy(VAULT).await.unwrap_err();
        assert_eq!(err.code(), "APY_QUERY_FAILED");
        assert_eq!(err.api_error().unwrap().status, 502);

        let keyless = YieldClient::new(Network::Testnet, server.uri(), "");
        assert_eq!(
            keyless.get_apy(VAULT).await.unwrap_err().code(),
            "CONFIG_MISSING_API_KEY"
        );
    }
}
