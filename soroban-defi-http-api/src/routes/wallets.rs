use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use soroban_defi_runtime::{
    CreateWalletRequest, Signer, SubmittedTransaction, TokenBalance, Wallet,
};

use crate::DefiApiState;
use crate::error::ApiResult;

#[derive(Deserialize)]
pub struct BalanceQuery {
    pub token: Option<String>,
}

#[derive(Deserialize)]
pub struct TransactionBody {
    pub xdr: String,
}

pub fn router() -> Router<Arc<DefiApiState>> {
    Router::new()
        .route("/wallets", post(create_wallet))
        .route("/wallets/{address}", get(get_wallet))
        .route("/wallets/{address}/signers", post(add_signer))
        .route("/wallets/{address}/signers/{public_key}", delete(remove_signer))
        .route("/wallets/{address}/balances", get(get_balances))
        .route("/wallets/{address}/transactions", post(sign_and_submit))
}

async fn create_wallet(
    State(state): State<Arc<DefiApiState>>,
    Json(request): Json<CreateWalletRequest>,
) -> ApiResult<(StatusCode, Json<Wallet>)> {
    let wallet = state.client.wallet().create_wallet(&request).await?;
    Ok((StatusCode::CREATED, Json(wallet)))
}

async fn get_wallet(
    State(state): State<Arc<DefiApiState>>,
    Path(address): Path<String>,
) -> ApiResult<Json<Wallet>> {
    Ok(Json(state.client.wallet().get_wallet(&address).await?))
}

async fn add_signer(
    State(state): State<Arc<DefiApiState>>,
    Path(address): Path<String>,
    Json(signer): Json<Signer>,
) -> ApiResult<Json<Wallet>> {
    Ok(Json(state.client.wallet().add_signer(&address, &signer).await?))
}

async fn remove_signer(
    State(state): State<Arc<DefiApiState>>,
    Path((address, public_key)): Path<(String, String)>,
) -> ApiResult<Json<Wallet>> {
    Ok(Json(
        state.client.wallet().remove_signer(&address, &public_key).await?,
    ))
}

async fn get_balances(
    State(state): State<Arc<DefiApiState>>,
    Path(address): Path<String>,
    Query(query): Query<BalanceQuery>,
) -> ApiResult<Json<Vec<TokenBalance>>> {
    let balances = state
        .client
        .wallet()
        .get_balances(&address, query.token.as_deref())
        .await?;
    Ok(Json(balances))
}

async fn sign_and_submit(
    State(state): State<Arc<DefiApiState>>,
    Path(address): Path<String>,
    Json(body): Json<TransactionBody>,
) -> ApiResult<Json<SubmittedTransaction>> {
    Ok(Json(
        state.client.wallet().sign_and_submit(&address, &body.xdr).await?,
    ))
}
