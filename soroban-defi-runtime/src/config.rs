//! Client configuration: network selection, per-module API keys and URL
//! overrides.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigErrorCode, DefiError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

const WALLET_API_TESTNET: &str = "https://staging.crossmint.com/api";
const WALLET_API_MAINNET: &str = "https://www.crossmint.com/api";
const DEX_API: &str = "https://api.soroswap.finance";
const YIELD_API: &str = "https://api.defindex.io";
const SOROBAN_RPC_TESTNET: &str = "https://soroban-testnet.stellar.org";
const SOROBAN_RPC_MAINNET: &str = "https://mainnet.sorobanrpc.com";

/// Soroswap router contract per network.
const ROUTER_TESTNET: &str = "CCJUD55AG6W5HAI5LRVNKAE5WDP5XGZBUDS5WNTIVDU7O264UZZE7BRD";
const ROUTER_MAINNET: &str = "CAG5LRYQ5JVEUI5TEID72EYOVX44TTUJT5BQR2J6J77FH65PCCFAJDDH";

/// Stellar network the clients talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }

    /// Network passphrase used when signing transactions.
    pub fn passphrase(&self) -> &'static str {
        match self {
            Network::Testnet => "Test SDF Network ; September 2015",
            Network::Mainnet => "Public Global Stellar Network ; September 2015",
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Testnet => SOROBAN_RPC_TESTNET,
            Network::Mainnet => SOROBAN_RPC_MAINNET,
        }
    }

    pub fn default_wallet_api(&self) -> &'static str {
        match self {
            Network::Testnet => WALLET_API_TESTNET,
            Network::Mainnet => WALLET_API_MAINNET,
        }
    }

    pub fn default_router(&self) -> &'static str {
        match self {
            Network::Testnet => ROUTER_TESTNET,
            Network::Mainnet => ROUTER_MAINNET,
        }
    }

    /// Stellar asset contract wrapping native XLM.
    pub fn native_asset(&self) -> &'static str {
        match self {
            Network::Testnet => "CDLZFC3SYJYDZT7K67VZ75HPJVIEUVNIXF47ZG2FB2RMQQVU2HHGCYSC",
            Network::Mainnet => "CAS3J7GYLGXMF6TDJBBYYSE3HQ6BBSMLNUQ34T6TZMYMW2EVH34XOWMA",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = DefiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" | "public" => Ok(Network::Mainnet),
            other => Err(DefiError::config(
                ConfigErrorCode::InvalidNetwork,
                format!("Unknown network '{other}', expected 'testnet' or 'mainnet'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    #[serde(default)]
    pub api_key: String,
    /// Override for proxying the wallet provider.
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DexConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub router_address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct YieldConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Top-level configuration handed to [`crate::DefiClient::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub dex: DexConfig,
    #[serde(default, rename = "yield")]
    pub yield_: YieldConfig,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self::new(Network::default())
    }
}

impl SdkConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            wallet: WalletConfig::default(),
            dex: DexConfig::default(),
            yield_: YieldConfig::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Build from process environment variables.
    ///
    /// `STELLAR_NETWORK`, `WALLET_API_KEY`, `WALLET_BASE_URL`, `DEX_API_KEY`,
    /// `DEX_BASE_URL`, `DEX_ROUTER_ADDRESS`, `YIELD_API_KEY`, `YIELD_BASE_URL`,
    /// `SOROBAN_RPC_URL` and `HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let network = match get("STELLAR_NETWORK") {
            Some(v) => v.parse()?,
            None => Network::default(),
        };

        let config = Self {
            network,
            wallet: WalletConfig {
                api_key: get("WALLET_API_KEY").unwrap_or_default(),
                base_url: get("WALLET_BASE_URL"),
            },
            dex: DexConfig {
                api_key: get("DEX_API_KEY").unwrap_or_default(),
                base_url: get("DEX_BASE_URL"),
                rpc_url: get("SOROBAN_RPC_URL"),
                router_address: get("DEX_ROUTER_ADDRESS"),
            },
            yield_: YieldConfig {
                api_key: get("YIELD_API_KEY").unwrap_or_default(),
                base_url: get("YIELD_BASE_URL"),
            },
            timeout_secs: get("HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document with `network`, `[wallet]`, `[dex]` and `[yield]`
    /// tables.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: SdkConfig = toml::from_str(raw).map_err(|e| {
            DefiError::config(ConfigErrorCode::Parse, format!("Invalid config: {e}")).with_source(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every URL override is an absolute http(s) URL and that the
    /// request timeout is non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(DefiError::config(
                ConfigErrorCode::InvalidTimeout,
                "timeout_secs must be at least 1",
            ));
        }
        let overrides = [
            ("wallet.base_url", &self.wallet.base_url),
            ("dex.base_url", &self.dex.base_url),
            ("dex.rpc_url", &self.dex.rpc_url),
            ("yield.base_url", &self.yield_.base_url),
        ];
        for (field, value) in overrides {
            if let Some(raw) = value {
                check_url(field, raw)?;
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn wallet_base_url(&self) -> String {
        self.wallet
            .base_url
            .clone()
            .unwrap_or_else(|| self.network.default_wallet_api().to_string())
    }

    pub fn dex_base_url(&self) -> String {
        self.dex.base_url.clone().unwrap_or_else(|| DEX_API.to_string())
    }

    pub fn yield_base_url(&self) -> String {
        self.yield_.base_url.clone().unwrap_or_else(|| YIELD_API.to_string())
    }

    pub fn dex_rpc_url(&self) -> String {
        self.dex
            .rpc_url
            .clone()
            .unwrap_or_else(|| self.network.default_rpc_url().to_string())
    }

    pub fn router_address(&self) -> String {
        self.dex
            .router_address
            .clone()
            .unwrap_or_else(|| self.network.default_router().to_string())
    }
}

fn check_url(field: &str, raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw).map_err(|e| {
        DefiError::config(ConfigErrorCode::InvalidUrl, format!("{field}: invalid URL '{raw}'"))
            .with_source(e)
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(DefiError::config(
            ConfigErrorCode::InvalidUrl,
            format!("{field}: unsupported scheme '{other}'"),
        )),
    }
}
