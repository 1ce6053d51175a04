pub mod auth;
pub mod error;
pub mod routes;

use std::sync::Arc;
use axum::Router;

use soroban_defi_runtime::DefiClient;

pub struct DefiApiState {
    pub client: DefiClient,
    /// Bearer token callers must present. `None` leaves the API open.
    pub api_token: Option<String>,
}

pub fn build_router(state: Arc<DefiApiState>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::wallets::router())
        .merge(routes::dex::router())
        .merge(routes::vaults::router())
        .merge(routes::strategies::router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .with_state(state)
}
