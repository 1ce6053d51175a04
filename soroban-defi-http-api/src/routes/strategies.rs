use axum::{Json, Router, extract::State, routing::post};
use std::sync::Arc;

use soroban_defi_runtime::{
    SwapAndDepositRequest, SwapAndDepositResult, WithdrawAndSwapRequest, WithdrawAndSwapResult,
};

use crate::DefiApiState;
use crate::error::ApiResult;

pub fn router() -> Router<Arc<DefiApiState>> {
    Router::new()
        .route("/strategies/swap-and-deposit", post(swap_and_deposit))
        .route("/strategies/withdraw-and-swap", post(withdraw_and_swap))
}

async fn swap_and_deposit(
    State(state): State<Arc<DefiApiState>>,
    Json(request): Json<SwapAndDepositRequest>,
) -> ApiResult<Json<SwapAndDepositResult>> {
    Ok(Json(state.client.swap_and_deposit(&request).await?))
}

async fn withdraw_and_swap(
    State(state): State<Arc<DefiApiState>>,
    Json(request): Json<WithdrawAndSwapRequest>,
) -> ApiResult<Json<WithdrawAndSwapResult>> {
    Ok(Json(state.client.withdraw_and_swap(&request).await?))
}
