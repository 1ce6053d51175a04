//! Binary runner for the Soroban DeFi demo API.
//!
//! Loads configuration from the environment (or the TOML file named by
//! `DEFI_CONFIG`), builds the shared client and serves the JSON API.

use std::sync::Arc;

use soroban_defi_http_api::{DefiApiState, build_router};
use soroban_defi_runtime::{DefiClient, DefiError, SdkConfig};
use tower_http::cors::{Any, CorsLayer};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Sdk(#[from] DefiError),
    #[error("failed to read {path}: {source}")]
    ConfigFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("API server error: {0}")]
    Server(#[from] std::io::Error),
}

fn load_config() -> Result<SdkConfig, StartupError> {
    match std::env::var("DEFI_CONFIG") {
        Ok(path) if !path.trim().is_empty() => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|source| StartupError::ConfigFile { path: path.clone(), source })?;
            tracing::info!("Loaded configuration from {path}");
            Ok(SdkConfig::from_toml_str(&raw)?)
        }
        _ => Ok(SdkConfig::from_env()?),
    }
}

fn cors_layer() -> CorsLayer {
    let origins = std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default();
    if origins == "*" || origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let parsed: Vec<_> = origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(parsed)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("Ctrl-C handler unavailable, running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();
    setup_log();

    let config = load_config()?;
    let client = DefiClient::new(config)?;

    let api_token = std::env::var("DEMO_API_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());
    if api_token.is_none() {
        tracing::warn!("DEMO_API_TOKEN not set, API is unauthenticated");
    }

    let state = Arc::new(DefiApiState { client, api_token });
    let router = build_router(state).layer(cors_layer());

    let port: u16 = std::env::var("DEMO_API_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Demo API listening on 0.0.0.0:{port}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};
    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .is_err()
    {}
}
