//! Rendering of SDK errors as JSON responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use soroban_defi_runtime::DefiError;

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Handler error wrapping a [`DefiError`].
#[derive(Debug)]
pub struct ApiFailure(pub DefiError);

impl From<DefiError> for ApiFailure {
    fn from(e: DefiError) -> Self {
        Self(e)
    }
}

pub type ApiResult<T> = Result<T, ApiFailure>;

pub fn status_for(err: &DefiError) -> StatusCode {
    match err.code() {
        "WALLET_NOT_FOUND" | "VAULT_NOT_FOUND" => StatusCode::NOT_FOUND,
        "AMOUNT_OVERFLOW" => StatusCode::BAD_REQUEST,
        "SIMULATION_FAILED" => StatusCode::UNPROCESSABLE_ENTITY,
        "NETWORK_TIMEOUT" => StatusCode::GATEWAY_TIMEOUT,
        "INVALID_RESPONSE" => StatusCode::BAD_GATEWAY,
        // Envelope encoding happens locally.
        "SERIALIZATION_FAILED" | "TRANSACTION_ASSEMBLY_FAILED" => StatusCode::INTERNAL_SERVER_ERROR,
        code if code.starts_with("INVALID_") => StatusCode::BAD_REQUEST,
        _ => match err {
            DefiError::Config { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        },
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::warn!(code = self.0.code(), error = %self.0, "request failed");
        }
        let body = ErrorBody {
            code: self.0.code().to_string(),
            message: self.0.message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soroban_defi_runtime::error::{
        ConfigErrorCode, DexErrorCode, NetworkErrorCode, TransactionErrorCode, WalletErrorCode,
        YieldErrorCode,
    };

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DefiError::wallet(WalletErrorCode::NotFound, "x"), StatusCode::NOT_FOUND),
            (DefiError::wallet(WalletErrorCode::InvalidAddress, "x"), StatusCode::BAD_REQUEST),
            (DefiError::dex(DexErrorCode::InvalidToken, "x"), StatusCode::BAD_REQUEST),
            (DefiError::vault(YieldErrorCode::InvalidAmount, "x"), StatusCode::BAD_REQUEST),
            (DefiError::dex(DexErrorCode::QuoteFailed, "x"), StatusCode::BAD_GATEWAY),
            (DefiError::network(NetworkErrorCode::InvalidResponse, "x"), StatusCode::BAD_GATEWAY),
            (DefiError::network(NetworkErrorCode::Timeout, "x"), StatusCode::GATEWAY_TIMEOUT),
            (
                DefiError::config(ConfigErrorCode::MissingApiKey, "x"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                DefiError::transaction(TransactionErrorCode::SimulationFailed, "x"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                DefiError::transaction(TransactionErrorCode::SubmissionFailed, "x"),
                StatusCode::BAD_GATEWAY,
            ),
            (
                DefiError::transaction(TransactionErrorCode::Serialization, "x"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                DefiError::transaction(TransactionErrorCode::AssemblyFailed, "x"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(status_for(&err), status, "{}", err.code());
        }
    }
}
