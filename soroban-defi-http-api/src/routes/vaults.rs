use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use soroban_defi_runtime::types::amount;
use soroban_defi_runtime::{DepositRequest, Vault, VaultPosition, VaultTransaction, WithdrawRequest};

use crate::DefiApiState;
use crate::error::ApiResult;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositBody {
    #[serde(with = "amount::vec")]
    pub amounts: Vec<u128>,
    pub from: String,
    #[serde(default = "default_invest")]
    pub invest: bool,
    #[serde(default)]
    pub slippage_bps: Option<u32>,
}

fn default_invest() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawBody {
    #[serde(with = "amount")]
    pub shares: u128,
    pub from: String,
    #[serde(default)]
    pub slippage_bps: Option<u32>,
}

#[derive(Serialize)]
pub struct ApyResponse {
    pub vault: String,
    pub apy: Decimal,
}

pub fn router() -> Router<Arc<DefiApiState>> {
    Router::new()
        .route("/vaults", get(list_vaults))
        .route("/vaults/{address}", get(get_vault))
        .route("/vaults/{address}/apy", get(get_apy))
        .route("/vaults/{address}/positions/{user}", get(get_position))
        .route("/vaults/{address}/deposit", post(build_deposit))
        .route("/vaults/{address}/withdraw", post(build_withdraw))
}

async fn list_vaults(State(state): State<Arc<DefiApiState>>) -> Json<Vec<Vault>> {
    Json(state.client.vaults().list_vaults())
}

async fn get_vault(
    State(state): State<Arc<DefiApiState>>,
    Path(address): Path<String>,
) -> ApiResult<Json<Vault>> {
    Ok(Json(state.client.vaults().get_vault(&address)?))
}

async fn get_apy(
    State(state): State<Arc<DefiApiState>>,
    Path(address): Path<String>,
) -> ApiResult<Json<ApyResponse>> {
    let apy = state.client.vaults().get_apy(&address).await?;
    Ok(Json(ApyResponse { vault: address, apy }))
}

async fn get_position(
    State(state): State<Arc<DefiApiState>>,
    Path((address, user)): Path<(String, String)>,
) -> ApiResult<Json<VaultPosition>> {
    Ok(Json(state.client.vaults().get_position(&address, &user)?))
}

async fn build_deposit(
    State(state): State<Arc<DefiApiState>>,
    Path(address): Path<String>,
    Json(body): Json<DepositBody>,
) -> ApiResult<Json<VaultTransaction>> {
    let tx = state.client.vaults().build_deposit(&DepositRequest {
        vault: address,
        amounts: body.amounts,
        from: body.from,
        invest: body.invest,
        slippage_bps: body.slippage_bps,
    })?;
    Ok(Json(tx))
}

async fn build_withdraw(
    State(state): State<Arc<DefiApiState>>,
    Path(address): Path<String>,
    Json(body): Json<WithdrawBody>,
) -> ApiResult<Json<VaultTransaction>> {
    let tx = state.client.vaults().build_withdraw(&WithdrawRequest {
        vault: address,
        shares: body.shares,
        from: body.from,
        slippage_bps: body.slippage_bps,
    })?;
    Ok(Json(tx))
}
