use axum::{Router, routing::get, extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use crate::DefiApiState;

pub fn router() -> Router<Arc<DefiApiState>> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<Arc<DefiApiState>>) -> Json<Value> {
    let client = &state.client;
    Json(json!({
        "status": "ok",
        "network": client.network(),
        "router": client.dex().router_address(),
    }))
}
