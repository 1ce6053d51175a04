//! Unified client over the wallet, DEX and yield-vault services.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{Network, SdkConfig};
use crate::dex_client::DexClient;
use crate::error::{DefiError, Result, YieldErrorCode};
use crate::types::{
    DepositRequest, Quote, QuoteRequest, SwapTransaction, TradeType, VaultTransaction,
    WithdrawRequest, amount,
};
use crate::wallet_client::WalletClient;
use crate::yield_client::YieldClient;

static SHARED: OnceCell<DefiClient> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapAndDepositRequest {
    pub token_in: String,
    pub token_out: String,
    #[serde(with = "amount")]
    pub amount: u128,
    pub vault: String,
    pub from: String,
    #[serde(default)]
    pub slippage_bps: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapAndDepositResult {
    pub quote: Quote,
    pub swap: SwapTransaction,
    pub deposit: VaultTransaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawAndSwapRequest {
    pub vault: String,
    #[serde(with = "amount")]
    pub shares: u128,
    pub token_out: String,
    pub from: String,
    #[serde(default)]
    pub slippage_bps: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawAndSwapResult {
    pub withdraw: VaultTransaction,
    /// `None` when the vault already holds the requested asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap: Option<SwapTransaction>,
}

/// Entry point of the SDK. Sub-clients share one connection pool and hold
/// only immutable configuration, so the client is cheap to clone and safe to
/// use from concurrent tasks.
#[derive(Debug, Clone)]
pub struct DefiClient {
    config: SdkConfig,
    wallet: WalletClient,
    dex: DexClient,
    vaults: YieldClient,
}

impl DefiClient {
    pub fn new(config: SdkConfig) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        let client = Self {
            wallet: WalletClient::from_config(&config, http.clone()),
            dex: DexClient::from_config(&config, http.clone()),
            vaults: YieldClient::from_config(&config, http),
            config,
        };
        info!(
            network = %client.config.network,
            router = %client.dex.router_address(),
            "defi client ready"
        );
        Ok(client)
    }

    /// Process-wide client built from the environment on first use.
    pub fn shared() -> Result<&'static DefiClient> {
        SHARED.get_or_try_init(|| SdkConfig::from_env().and_then(Self::new))
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn network(&self) -> Network {
        self.config.network
    }

    pub fn wallet(&self) -> &WalletClient {
        &self.wallet
    }

    pub fn dex(&self) -> &DexClient {
        &self.dex
    }

    pub fn vaults(&self) -> &YieldClient {
        &self.vaults
    }

    /// Quote, build the swap, then build a deposit of the quoted output.
    ///
    /// The steps are independent calls. If the deposit cannot be built the
    /// already-built swap is discarded and the deposit error is returned.
    pub async fn swap_and_deposit(&self, request: &SwapAndDepositRequest) -> Result<SwapAndDepositResult> {
        let quote = self.dex.get_quote(&QuoteRequest {
            token_in: request.token_in.clone(),
            token_out: request.token_out.clone(),
            amount: request.amount,
            trade_type: TradeType::ExactIn,
            slippage_bps: request.slippage_bps,
        })?;
        let swap = self.dex.build_swap_transaction(&quote, &request.from).await?;

        let deposit = self
            .vaults
            .build_deposit(&DepositRequest {
                vault: request.vault.clone(),
                amounts: vec![quote.amount_out],
                from: request.from.clone(),
                invest: true,
                slippage_bps: request.slippage_bps,
            })
            .inspect_err(|e| {
                warn!(vault = %request.vault, code = e.code(), "deposit build failed, discarding swap");
            })?;

        info!(
            vault = %request.vault,
            amount_in = quote.amount_in,
            amount_out = quote.amount_out,
            "swap and deposit prepared"
        );
        Ok(SwapAndDepositResult { quote, swap, deposit })
    }

    /// Build a withdraw, then a swap into `token_out` when the vault holds a
    /// different asset. The swap is sized by the share count, not by the
    /// withdrawn amount.
    pub async fn withdraw_and_swap(&self, request: &WithdrawAndSwapRequest) -> Result<WithdrawAndSwapResult> {
        let vault = self.vaults.get_vault(&request.vault)?;
        let withdraw = self.vaults.build_withdraw(&WithdrawRequest {
            vault: request.vault.clone(),
            shares: request.shares,
            from: request.from.clone(),
            slippage_bps: request.slippage_bps,
        })?;

        let asset = vault.primary_asset().ok_or_else(|| {
            DefiError::vault(
                YieldErrorCode::VaultNotFound,
                format!("Vault {} has no underlying asset", vault.address),
            )
        })?;
        if asset == request.token_out {
            info!(vault = %vault.address, "vault asset already matches, no swap");
            return Ok(WithdrawAndSwapResult { withdraw, swap: None });
        }

        let quote = self.dex.get_quote(&QuoteRequest {
            token_in: asset.to_string(),
            token_out: request.token_out.clone(),
            amount: request.shares,
            trade_type: TradeType::ExactIn,
            slippage_bps: request.slippage_bps,
        })?;
        let swap = self.dex.build_swap_transaction(&quote, &request.from).await?;

        info!(vault = %vault.address, token_out = %request.token_out, "withdraw and swap prepared");
        Ok(WithdrawAndSwapResult { withdraw, swap: Some(swap) })
    }
}
