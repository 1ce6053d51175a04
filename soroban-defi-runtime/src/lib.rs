pub mod error;
pub mod config;
pub mod address;
pub mod types;
pub mod quote;
pub mod rpc;
pub mod envelope;
pub mod wallet_client;
pub mod dex_client;
pub mod yield_client;
pub mod client;

mod http;

pub use error::{ApiError, DefiError};
pub use config::{Network, SdkConfig};
pub use types::*;
pub use client::{
    DefiClient, SwapAndDepositRequest, SwapAndDepositResult, WithdrawAndSwapRequest,
    WithdrawAndSwapResult,
};
pub use dex_client::DexClient;
pub use wallet_client::WalletClient;
pub use yield_client::YieldClient;
