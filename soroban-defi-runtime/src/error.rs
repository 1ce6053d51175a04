use std::fmt;

use thiserror::Error;

/// Boxed underlying cause carried by every [`DefiError`] variant.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, DefiError>;

/// A non-success HTTP response from one of the upstream services.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("HTTP {status}: {body}")]
pub struct ApiError {
    pub status: u16,
    pub body: String,
}

macro_rules! error_codes {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

error_codes!(
    /// Codes raised by the custodial wallet client.
    WalletErrorCode {
        CreationFailed => "WALLET_CREATION_FAILED",
        NotFound => "WALLET_NOT_FOUND",
        InvalidAddress => "INVALID_ADDRESS",
        SignerUpdateFailed => "SIGNER_UPDATE_FAILED",
        SigningFailed => "SIGNING_FAILED",
        SubmissionFailed => "SUBMISSION_FAILED",
        BalanceFailed => "BALANCE_QUERY_FAILED",
        RequestFailed => "WALLET_REQUEST_FAILED",
    }
);

error_codes!(
    /// Codes raised by the DEX client and the quote calculator.
    DexErrorCode {
        InvalidToken => "INVALID_TOKEN",
        InvalidSender => "INVALID_SENDER",
        InvalidAmount => "INVALID_AMOUNT",
        InvalidSlippage => "INVALID_SLIPPAGE",
        AmountOverflow => "AMOUNT_OVERFLOW",
        QuoteFailed => "QUOTE_FAILED",
        BuildFailed => "SWAP_BUILD_FAILED",
    }
);

error_codes!(
    /// Codes raised by the yield-vault client.
    YieldErrorCode {
        InvalidVault => "INVALID_VAULT",
        InvalidAmount => "INVALID_VAULT_AMOUNT",
        InvalidAccount => "INVALID_VAULT_ACCOUNT",
        VaultNotFound => "VAULT_NOT_FOUND",
        DepositFailed => "DEPOSIT_FAILED",
        WithdrawFailed => "WITHDRAW_FAILED",
        ApyFailed => "APY_QUERY_FAILED",
    }
);

error_codes!(
    NetworkErrorCode {
        RequestFailed => "NETWORK_REQUEST_FAILED",
        Timeout => "NETWORK_TIMEOUT",
        RpcError => "RPC_ERROR",
        InvalidResponse => "INVALID_RESPONSE",
    }
);

error_codes!(
    TransactionErrorCode {
        SimulationFailed => "SIMULATION_FAILED",
        SubmissionFailed => "TRANSACTION_SUBMISSION_FAILED",
        Serialization => "SERIALIZATION_FAILED",
        AssemblyFailed => "TRANSACTION_ASSEMBLY_FAILED",
    }
);

error_codes!(
    ConfigErrorCode {
        MissingApiKey => "CONFIG_MISSING_API_KEY",
        InvalidNetwork => "CONFIG_INVALID_NETWORK",
        InvalidUrl => "CONFIG_INVALID_URL",
        Parse => "CONFIG_PARSE_FAILED",
        InvalidTimeout => "CONFIG_INVALID_TIMEOUT",
    }
);

/// Every failure surfaced by the SDK. The variant names the domain, the code
/// narrows it, and the optional source keeps whatever was thrown upstream.
#[derive(Error, Debug)]
pub enum DefiError {
    #[error("Wallet error [{code}]: {message}")]
    Wallet {
        code: WalletErrorCode,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("DEX error [{code}]: {message}")]
    Dex {
        code: DexErrorCode,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Yield error [{code}]: {message}")]
    Yield {
        code: YieldErrorCode,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Network error [{code}]: {message}")]
    Network {
        code: NetworkErrorCode,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Transaction error [{code}]: {message}")]
    Transaction {
        code: TransactionErrorCode,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Configuration error [{code}]: {message}")]
    Config {
        code: ConfigErrorCode,
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl DefiError {
    pub fn wallet(code: WalletErrorCode, message: impl Into<String>) -> Self {
        DefiError::Wallet { code, message: message.into(), source: None }
    }

    pub fn dex(code: DexErrorCode, message: impl Into<String>) -> Self {
        DefiError::Dex { code, message: message.into(), source: None }
    }

    pub fn vault(code: YieldErrorCode, message: impl Into<String>) -> Self {
        DefiError::Yield { code, message: message.into(), source: None }
    }

    pub fn network(code: NetworkErrorCode, message: impl Into<String>) -> Self {
        DefiError::Network { code, message: message.into(), source: None }
    }

    pub fn transaction(code: TransactionErrorCode, message: impl Into<String>) -> Self {
        DefiError::Transaction { code, message: message.into(), source: None }
    }

    pub fn config(code: ConfigErrorCode, message: impl Into<String>) -> Self {
        DefiError::Config { code, message: message.into(), source: None }
    }

    /// Attach the underlying cause, replacing any previous one.
    pub fn with_source(mut self, cause: impl Into<BoxError>) -> Self {
        let slot = match &mut self {
            DefiError::Wallet { source, .. }
            | DefiError::Dex { source, .. }
            | DefiError::Yield { source, .. }
            | DefiError::Network { source, .. }
            | DefiError::Transaction { source, .. }
            | DefiError::Config { source, .. } => source,
        };
        *slot = Some(cause.into());
        self
    }

    /// Stable machine-readable code, e.g. `WALLET_NOT_FOUND`.
    pub fn code(&self) -> &'static str {
        match self {
            DefiError::Wallet { code, .. } => code.as_str(),
            DefiError::Dex { code, .. } => code.as_str(),
            DefiError::Yield { code, .. } => code.as_str(),
            DefiError::Network { code, .. } => code.as_str(),
            DefiError::Transaction { code, .. } => code.as_str(),
            DefiError::Config { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            DefiError::Wallet { message, .. }
            | DefiError::Dex { message, .. }
            | DefiError::Yield { message, .. }
            | DefiError::Network { message, .. }
            | DefiError::Transaction { message, .. }
            | DefiError::Config { message, .. } => message,
        }
    }

    /// The HTTP error that caused this failure, if the upstream answered with
    /// a non-success status.
    pub fn api_error(&self) -> Option<&ApiError> {
        std::error::Error::source(self).and_then(|e| e.downcast_ref::<ApiError>())
    }
}

impl From<reqwest::Error> for DefiError {
    fn from(e: reqwest::Error) -> Self {
        let code = if e.is_timeout() {
            NetworkErrorCode::Timeout
        } else if e.is_decode() {
            NetworkErrorCode::InvalidResponse
        } else {
            NetworkErrorCode::RequestFailed
        };
        DefiError::network(code, e.to_string()).with_source(e)
    }
}

impl From<serde_json::Error> for DefiError {
    fn from(e: serde_json::Error) -> Self {
        DefiError::transaction(TransactionErrorCode::Serialization, e.to_string()).with_source(e)
    }
}
