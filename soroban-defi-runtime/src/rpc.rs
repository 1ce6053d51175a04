//! Soroban RPC (JSON-RPC 2.0 over HTTP).

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::error::{DefiError, NetworkErrorCode, Result, TransactionErrorCode};
use crate::http::send_json;
use crate::types::{SubmittedTransaction, TransactionStatus};

/// Error object returned inside a JSON-RPC envelope.
#[derive(Error, Debug, Clone, PartialEq, Deserialize)]
#[error("RPC error {code}: {message}")]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub latest_ledger: Option<u32>,
    #[serde(default)]
    pub oldest_ledger: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestLedger {
    pub id: String,
    pub protocol_version: u32,
    pub sequence: u32,
}

/// Return value and authorization entries of one simulated host function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFunctionResult {
    #[serde(default)]
    pub xdr: String,
    /// Base64 `SorobanAuthorizationEntry` values the invocation requires.
    #[serde(default)]
    pub auth: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    #[serde(default)]
    pub transaction_data: Option<String>,
    /// Stroops, sent by the server as a decimal string.
    #[serde(default)]
    pub min_resource_fee: Option<String>,
    pub latest_ledger: u32,
    #[serde(default)]
    pub results: Vec<HostFunctionResult>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SimulationResult {
    pub fn min_resource_fee(&self) -> Option<u64> {
        self.min_resource_fee.as_deref().and_then(|f| f.parse().ok())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendTransactionResult {
    hash: String,
    status: String,
    #[serde(default)]
    latest_ledger: Option<u32>,
    #[serde(default)]
    error_result_xdr: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    /// `SUCCESS`, `FAILED` or `NOT_FOUND`.
    pub status: String,
    pub latest_ledger: u32,
    #[serde(default)]
    pub ledger: Option<u32>,
    #[serde(default)]
    pub result_xdr: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SorobanRpcClient {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl SorobanRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        debug!(method, url = %self.url, "soroban rpc call");
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let envelope: RpcEnvelope<T> = send_json(
            self.client.post(&self.url).json(&body).timeout(self.timeout),
        )
        .await
        .map_err(|f| {
            f.into_error(|api| {
                DefiError::network(
                    NetworkErrorCode::RequestFailed,
                    format!("{method} failed with HTTP {}", api.status),
                )
            })
        })?;

        if let Some(err) = envelope.error {
            return Err(DefiError::network(
                NetworkErrorCode::RpcError,
                format!("{method}: {}", err.message),
            )
            .with_source(err));
        }
        envelope.result.ok_or_else(|| {
            DefiError::network(
                NetworkErrorCode::InvalidResponse,
                format!("{method}: missing 'result' field"),
            )
        })
    }

    pub async fn get_health(&self) -> Result<HealthStatus> {
        self.call("getHealth", Value::Null).await
    }

    pub async fn get_latest_ledger(&self) -> Result<LatestLedger> {
        self.call("getLatestLedger", Value::Null).await
    }

    /// Dry-run a base64 transaction envelope. A simulation that reports an
    /// error is returned as [`TransactionErrorCode::SimulationFailed`].
    pub async fn simulate_transaction(&self, xdr: &str) -> Result<SimulationResult> {
        let sim: SimulationResult = self
            .call("simulateTransaction", json!({ "transaction": xdr }))
            .await?;
        if let Some(reason) = &sim.error {
            return Err(DefiError::transaction(
                TransactionErrorCode::SimulationFailed,
                format!("Simulation failed: {reason}"),
            ));
        }
        Ok(sim)
    }

    /// Submit a signed envelope. The ledger only acknowledges receipt here;
    /// poll [`Self::get_transaction`] for the outcome.
    pub async fn send_transaction(&self, signed_xdr: &str) -> Result<SubmittedTransaction> {
        let sent: SendTransactionResult = self
            .call("sendTransaction", json!({ "transaction": signed_xdr }))
            .await?;

        let status = match sent.status.as_str() {
            "PENDING" => TransactionStatus::Pending,
            "DUPLICATE" => TransactionStatus::Duplicate,
            "TRY_AGAIN_LATER" => TransactionStatus::TryAgainLater,
            _ => {
                return Err(DefiError::transaction(
                    TransactionErrorCode::SubmissionFailed,
                    format!(
                        "Transaction {} rejected ({}): {}",
                        sent.hash,
                        sent.status,
                        sent.error_result_xdr.unwrap_or_default()
                    ),
                ));
            }
        };

        Ok(SubmittedTransaction {
            hash: sent.hash,
            status,
            ledger: sent.latest_ledger,
        })
    }

    pub async fn get_transaction(&self, hash: &str) -> Result<TransactionInfo> {
        self.call("getTransaction", json!({ "hash": hash })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_rpc(rpc_method: &str, response: Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": rpc_method })))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_get_latest_ledger() {
        let server = mock_rpc(
            "getLatestLedger",
            json!({
                "jsonrpc": "2.0", "id": 1,
                "result": { "id": "abc", "protocolVersion": 22, "sequence": 1234 }
            }),
        )
        .await;

        let rpc = SorobanRpcClient::new(server.uri());
        let ledger = rpc.get_latest_ledger().await.unwrap();
        assert_eq!(ledger.sequence, 1234);
        assert_eq!(ledger.protocol_version, 22);
    }

    #[tokio::test]
    async fn test_rpc_error_object() {
        let server = mock_rpc(
            "getHealth",
            json!({
                "jsonrpc": "2.0", "id": 1,
                "error": { "code": -32601, "message": "method not found" }
            }),
        )
        .await;

        let err = SorobanRpcClient::new(server.uri()).get_health().await.unwrap_err();
        assert_eq!(err.code(), "RPC_ERROR");
        let cause = std::error::Error::source(&err)
            .and_then(|e| e.downcast_ref::<RpcErrorObject>())
            .unwrap();
        assert_eq!(cause.code, -32601);
    }

    #[tokio::test]
    async fn test_simulation_error() {
        let server = mock_rpc(
            "simulateTransaction",
            json!({
                "jsonrpc": "2.0", "id": 1,
                "result": { "latestLedger": 10, "error": "HostError: insufficient balance" }
            }),
        )
        .await;

        let err = SorobanRpcClient::new(server.uri())
            .simulate_transaction("AAAA")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SIMULATION_FAILED");
    }

    #[tokio::test]
    async fn test_simulation_ok() {
        let server = mock_rpc(
            "simulateTransaction",
            json!({
                "jsonrpc": "2.0", "id": 1,
                "result": {
                    "latestLedger": 10,
                    "minResourceFee": "51234",
                    "transactionData": "AAAB",
                    "results": [{ "xdr": "AAAC", "auth": [] }]
                }
            }),
        )
        .await;

        let sim = SorobanRpcClient::new(server.uri())
            .simulate_transaction("AAAA")
            .await
            .unwrap();
        assert_eq!(sim.min_resource_fee(), Some(51234));
        assert_eq!(sim.latest_ledger, 10);
        assert_eq!(sim.results.len(), 1);
        assert_eq!(sim.results[0].xdr, "AAAC");
    }

    #[tokio::test]
    async fn test_get_health() {
        let server = mock_rpc(
            "getHealth",
            json!({
                "jsonrpc": "2.0", "id": 1,
                "result": { "status": "healthy", "latestLedger": 51583, "oldestLedger": 50000 }
            }),
        )
        .await;

        let health = SorobanRpcClient::new(server.uri()).get_health().await.unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.latest_ledger, Some(51583));
        assert_eq!(health.oldest_ledger, Some(50000));
    }

    #[tokio::test]
    async fn test_get_transaction() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "getTransaction",
                "params": { "hash": "deadbeef" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "result": {
                    "status": "SUCCESS",
                    "latestLedger": 120,
                    "ledger": 118,
                    "resultXdr": "AAAAAAAAAGQAAAAAAAAAAQAAAAAAAAAYAAAAAAAAAAA="
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let info = SorobanRpcClient::new(server.uri())
            .get_transaction("deadbeef")
            .await
            .unwrap();
        assert_eq!(info.status, "SUCCESS");
        assert_eq!(info.ledger, Some(118));
        assert_eq!(info.latest_ledger, 120);
        assert!(info.result_xdr.is_some());
    }

    #[tokio::test]
    async fn test_missing_result_is_invalid_response() {
        let server = mock_rpc("getLatestLedger", json!({ "jsonrpc": "2.0", "id": 1 })).await;

        let err = SorobanRpcClient::new(server.uri())
            .get_latest_ledger()
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_RESPONSE");
        assert!(matches!(err, DefiError::Network { .. }));
    }

    #[tokio::test]
    async fn test_send_transaction_statuses() {
        let server = mock_rpc(
            "sendTransaction",
            json!({
                "jsonrpc": "2.0", "id": 1,
                "result": { "hash": "deadbeef", "status": "PENDING", "latestLedger": 99 }
            }),
        )
        .await;
        let sent = SorobanRpcClient::new(server.uri())
            .send_transaction("AAAA")
            .await
            .unwrap();
        assert_eq!(sent.status, TransactionStatus::Pending);
        assert_eq!(sent.ledger, Some(99));

        let server = mock_rpc(
            "sendTransaction",
            json!({
                "jsonrpc": "2.0", "id": 1,
                "result": { "hash": "deadbeef", "status": "ERROR", "errorResultXdr": "AAAD" }
            }),
        )
        .await;
        let err = SorobanRpcClient::new(server.uri())
            .send_transaction("AAAA")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TRANSACTION_SUBMISSION_FAILED");
    }

    #[tokio::test]
    async fn test_http_failure_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = SorobanRpcClient::new(server.uri()).get_health().await.unwrap_err();
        assert_eq!(err.code(), "NETWORK_REQUEST_FAILED");
        assert_eq!(err.api_error().unwrap().status, 503);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let rpc = SorobanRpcClient::new("http://localhost:1")
            .with_timeout(Duration::from_millis(100));
        let err = rpc.get_health().await.unwrap_err();
        assert!(matches!(err, DefiError::Network { .. }));
    }
}
