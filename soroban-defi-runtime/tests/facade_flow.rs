//! End-to-end facade flows against mocked wallet, aggregator and RPC servers.

use serde_json::json;
use soroban_defi_runtime::envelope::testing::{transaction_data, unsigned_swap_envelope};
use soroban_defi_runtime::{
    DefiClient, Network, SdkConfig, SwapAndDepositRequest, TransactionStatus, VaultOperation,
    WithdrawAndSwapRequest,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ──────────────────────────────────────────────────────────────────

const XLM: &str = "CDLZFC3SYJYDZT7K67VZ75HPJVIEUVNIXF47ZG2FB2RMQQVU2HHGCYSC";
const USDC: &str = "CBIELTK6YBZJU5UP2WWQEUCYKLPU6AUNZ2BQ4WWFEIE3USCIHMXQDAMA";
const XLM_VAULT: &str = "CCLV4H7WTLJQ7ATLHBBQV2WW3OINF3FOY5XZ7VPHZO7NH3D2ZS4GFSF6";
const USER: &str = "GBZXN7PIRZGNMHGA7MUUUF4GWPY5AYPV6LY4UV2GL6VJGIQRXFDNMADI";

struct Harness {
    wallet: MockServer,
    aggregator: MockServer,
    rpc: MockServer,
}

impl Harness {
    async fn start() -> Self {
        let harness = Self {
            wallet: MockServer::start().await,
            aggregator: MockServer::start().await,
            rpc: MockServer::start().await,
        };
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "simulateTransaction" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "result": {
                    "latestLedger": 777,
                    "minResourceFee": "120000",
                    "transactionData": transaction_data(120_000)
                }
            })))
            .mount(&harness.rpc)
            .await;
        harness
    }

    async fn expect_builds(&self, count: u64) {
        Mock::given(method("POST"))
            .and(path("/quote/build"))
            .and(header("authorization", "Bearer dex-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "xdr": unsigned_swap_envelope() })))
            .expect(count)
            .mount(&self.aggregator)
            .await;
    }

    fn client(&self) -> DefiClient {
        let mut config = SdkConfig::new(Network::Testnet);
        config.wallet.api_key = "wallet-key".into();
        config.wallet.base_url = Some(self.wallet.uri());
        config.dex.api_key = "dex-key".into();
        config.dex.base_url = Some(self.aggregator.uri());
        config.dex.rpc_url = Some(self.rpc.uri());
        DefiClient::new(config).unwrap()
    }
}

// ── Flows ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn swap_and_deposit_seeds_deposit_with_quoted_output() {
    let harness = Harness::start().await;
    harness.expect_builds(1).await;
    let client = harness.client();

    let result = client
        .swap_and_deposit(&SwapAndDepositRequest {
            token_in: USDC.into(),
            token_out: XLM.into(),
            amount: 1_000_000_000,
            vault: XLM_VAULT.into(),
            from: USER.into(),
            slippage_bps: None,
        })
        .await
        .unwrap();

    assert_eq!(result.quote.amount_out, 997_000_000);
    assert_eq!(result.swap.min_resource_fee, Some(120_000));
    assert_ne!(result.swap.xdr, unsigned_swap_envelope());
    assert_eq!(result.deposit.operation, VaultOperation::Deposit);
    assert_eq!(result.deposit.estimated_amounts, vec![997_000_000]);
}

#[tokio::test]
async fn swap_and_deposit_fails_after_swap_was_built() {
    let harness = Harness::start().await;
    harness.expect_builds(1).await;
    let client = harness.client();

    let err = client
        .swap_and_deposit(&SwapAndDepositRequest {
            token_in: USDC.into(),
            token_out: XLM.into(),
            amount: 1_000_000_000,
            vault: "not-a-vault".into(),
            from: USER.into(),
            slippage_bps: None,
        })
        .await
        .unwrap_err();

    // The swap payload was requested before the deposit step rejected the vault.
    assert_eq!(err.code(), "INVALID_VAULT");
}

#[tokio::test]
async fn withdraw_and_swap_sizes_swap_by_shares() {
    let harness = Harness::start().await;
    harness.expect_builds(1).await;
    let client = harness.client();

    let result = client
        .withdraw_and_swap(&WithdrawAndSwapRequest {
            vault: XLM_VAULT.into(),
            shares: 400_000_000,
            token_out: USDC.into(),
            from: USER.into(),
            slippage_bps: Some(50),
        })
        .await
        .unwrap();

    assert_eq!(result.withdraw.estimated_amounts, vec![500_000_000]);
    let swap = result.swap.unwrap();
    assert_eq!(swap.quote.token_in, XLM);
    assert_eq!(swap.quote.amount_in, 400_000_000);
    assert_eq!(swap.quote.minimum_received, Some(396_806_000));
}

#[tokio::test]
async fn wallet_signs_and_submits_through_facade() {
    let harness = Harness::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/wallets/{USER}/transactions/sign")))
        .and(header("x-api-key", "wallet-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "signedXdr": "SIGNED" })))
        .expect(1)
        .mount(&harness.wallet)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/wallets/{USER}/transactions/submit")))
        .and(body_partial_json(json!({ "xdr": "SIGNED", "network": "testnet" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hash": "abc123", "status": "SUCCESS", "ledger": 778
        })))
        .expect(1)
        .mount(&harness.wallet)
        .await;

    let client = harness.client();
    let submitted = client.wallet().sign_and_submit(USER, "UNSIGNED").await.unwrap();
    assert_eq!(submitted.hash, "abc123");
    assert_eq!(submitted.status, TransactionStatus::Success);
}
