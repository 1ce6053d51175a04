use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;
use std::sync::Arc;

use soroban_defi_runtime::{Quote, QuoteRequest, SwapTransaction};

use crate::DefiApiState;
use crate::error::ApiResult;

#[derive(Deserialize)]
pub struct SwapBody {
    pub quote: Quote,
    pub from: String,
}

pub fn router() -> Router<Arc<DefiApiState>> {
    Router::new()
        .route("/dex/quote", post(quote))
        .route("/dex/quote/aggregator", post(aggregator_quote))
        .route("/dex/swap", post(build_swap))
}

async fn quote(
    State(state): State<Arc<DefiApiState>>,
    Json(request): Json<QuoteRequest>,
) -> ApiResult<Json<Quote>> {
    Ok(Json(state.client.dex().get_quote(&request)?))
}

async fn aggregator_quote(
    State(state): State<Arc<DefiApiState>>,
    Json(request): Json<QuoteRequest>,
) -> ApiResult<Json<Quote>> {
    Ok(Json(state.client.dex().get_aggregator_quote(&request).await?))
}

async fn build_swap(
    State(state): State<Arc<DefiApiState>>,
    Json(body): Json<SwapBody>,
) -> ApiResult<Json<SwapTransaction>> {
    let tx = state
        .client
        .dex()
        .build_swap_transaction(&body.quote, &body.from)
        .await?;
    Ok(Json(tx))
}
