//! DEX aggregator client: quoting and router invocation building.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::address::is_account_id;
use crate::config::{Network, SdkConfig};
use crate::envelope;
use crate::error::{ConfigErrorCode, DefiError, DexErrorCode, Result};
use crate::http::{join_url, send_json};
use crate::quote::{self, maximum_sent, minimum_received, resolve_slippage, validate_token_pair};
use crate::rpc::SorobanRpcClient;
use crate::types::{Quote, QuoteRequest, SwapTransaction, TradeType, amount};

/// Liquidity sources the aggregator may route through.
const PROTOCOLS: &[&str] = &["soroswap", "phoenix", "aqua"];

#[derive(Debug, Clone)]
pub struct DexClient {
    network: Network,
    base_url: String,
    api_key: String,
    router: String,
    client: reqwest::Client,
    rpc: SorobanRpcClient,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregatorQuoteRequest<'a> {
    asset_in: &'a str,
    asset_out: &'a str,
    #[serde(with = "amount")]
    amount: u128,
    trade_type: TradeType,
    slippage_bps: u32,
    protocols: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregatorQuote {
    #[serde(with = "amount")]
    amount_in: u128,
    #[serde(with = "amount")]
    amount_out: u128,
    #[serde(default)]
    price_impact_pct: Option<Decimal>,
    #[serde(default)]
    route: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildRequest<'a> {
    quote: &'a Quote,
    from: &'a str,
    to: &'a str,
    router: &'a str,
}

#[derive(Debug, Deserialize)]
struct BuildResponse {
    xdr: String,
}

impl DexClient {
    pub fn new(
        network: Network,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        rpc_url: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::new();
        Self {
            network,
            base_url: base_url.into(),
            api_key: api_key.into(),
            router: network.default_router().to_string(),
            rpc: SorobanRpcClient::with_client(rpc_url, client.clone()),
            client,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &SdkConfig, client: reqwest::Client) -> Self {
        Self {
            network: config.network,
            base_url: config.dex_base_url(),
            api_key: config.dex.api_key.clone(),
            router: config.router_address(),
            rpc: SorobanRpcClient::with_client(config.dex_rpc_url(), client.clone())
                .with_timeout(config.timeout()),
            client,
            timeout: config.timeout(),
        }
    }

    pub fn with_router(mut self, router: impl Into<String>) -> Self {
        self.router = router.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.rpc = self.rpc.with_timeout(timeout);
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn router_address(&self) -> &str {
        &self.router
    }

    pub fn rpc(&self) -> &SorobanRpcClient {
        &self.rpc
    }

    fn ensure_api_key(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(DefiError::config(
                ConfigErrorCode::MissingApiKey,
                "DEX API key is not configured",
            ));
        }
        Ok(())
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let url = join_url(&self.base_url, path);
        debug!(%url, network = %self.network, "dex api request");
        self.client
            .post(url)
            .query(&[("network", self.network.as_str())])
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
    }

    /// Constant-fee estimate for `request`. Token identifiers are checked
    /// before anything else; no network call is made.
    pub fn get_quote(&self, request: &QuoteRequest) -> Result<Quote> {
        let quote = quote::estimate(request)?;
        debug!(
            token_in = %quote.token_in,
            token_out = %quote.token_out,
            amount_in = quote.amount_in,
            amount_out = quote.amount_out,
            "estimated quote"
        );
        Ok(quote)
    }

    /// Quote from the aggregator's routing engine. Slippage bounds are
    /// applied locally so they match [`Self::get_quote`].
    pub async fn get_aggregator_quote(&self, request: &QuoteRequest) -> Result<Quote> {
        validate_token_pair(&request.token_in, &request.token_out)?;
        let slippage_bps = resolve_slippage(request.slippage_bps)?;
        if request.amount == 0 {
            return Err(DefiError::dex(DexErrorCode::InvalidAmount, "Amount must be positive"));
        }
        self.ensure_api_key()?;

        let body = AggregatorQuoteRequest {
            asset_in: &request.token_in,
            asset_out: &request.token_out,
            amount: request.amount,
            trade_type: request.trade_type,
            slippage_bps,
            protocols: PROTOCOLS,
        };
        let resp: AggregatorQuote = send_json(self.post("quote").json(&body))
            .await
            .map_err(|f| {
                warn!(status = ?f.status(), "aggregator quote failed");
                f.into_error(|api| {
                    DefiError::dex(
                        DexErrorCode::QuoteFailed,
                        format!("Aggregator quote failed: HTTP {}", api.status),
                    )
                })
            })?;

        let (minimum, maximum) = match request.trade_type {
            TradeType::ExactIn => (Some(minimum_received(resp.amount_out, slippage_bps)), None),
            TradeType::ExactOut => {
                let max = maximum_sent(resp.amount_in, slippage_bps).ok_or_else(|| {
                    DefiError::dex(DexErrorCode::AmountOverflow, "Maximum sent overflows")
                })?;
                (None, Some(max))
            }
        };
        let route = if resp.route.is_empty() {
            vec![request.token_in.clone(), request.token_out.clone()]
        } else {
            resp.route
        };

        Ok(Quote {
            token_in: request.token_in.clone(),
            token_out: request.token_out.clone(),
            amount_in: resp.amount_in,
            amount_out: resp.amount_out,
            price_impact_pct: resp
                .price_impact_pct
                .unwrap_or_else(|| quote::price_impact_pct(resp.amount_in)),
            route,
            trade_type: request.trade_type,
            slippage_bps,
            minimum_received: minimum,
            maximum_sent: maximum,
        })
    }

    /// Build the router invocation for `quote` on behalf of `from`, simulate
    /// it, and assemble the simulated footprint, fee and authorization into
    /// the envelope so the caller gets one that is ready to sign.
    pub async fn build_swap_transaction(&self, quote: &Quote, from: &str) -> Result<SwapTransaction> {
        validate_token_pair(&quote.token_in, &quote.token_out)?;
        if !is_account_id(from) {
            return Err(DefiError::dex(
                DexErrorCode::InvalidSender,
                format!("Invalid sender address '{from}'"),
            ));
        }
        self.ensure_api_key()?;

        let body = BuildRequest {
            quote,
            from,
            to: from,
            router: &self.router,
        };
        let built: BuildResponse = send_json(self.post("quote/build").json(&body))
            .await
            .map_err(|f| {
                warn!(status = ?f.status(), "swap build failed");
                f.into_error(|api| {
                    DefiError::dex(
                        DexErrorCode::BuildFailed,
                        format!("Swap build failed: HTTP {}", api.status),
                    )
                })
            })?;

        let simulation = self.rpc.simulate_transaction(&built.xdr).await?;
        debug!(
            router = %self.router,
            min_resource_fee = ?simulation.min_resource_fee(),
            "swap simulated"
        );

        let xdr = envelope::assemble(&built.xdr, &simulation)?;

        Ok(SwapTransaction {
            xdr,
            router: self.router.clone(),
            from: from.to_string(),
            quote: quote.clone(),
            min_resource_fee: simulation.min_resource_fee(),
            latest_ledger: Some(simulation.latest_ledger),
        })
    }
}
