use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::Network;

/// Token amounts travel as decimal strings; JSON numbers are accepted on input.
pub mod amount {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s
                .trim()
                .parse::<u128>()
                .map_err(|e| D::Error::custom(format!("invalid amount '{s}': {e}"))),
            Raw::Number(n) => Ok(u128::from(n)),
        }
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        #[derive(Deserialize)]
        struct Wrapped(#[serde(with = "super")] u128);

        pub fn serialize<S: Serializer>(value: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => super::serialize(v, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u128>, D::Error> {
            Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|w| w.0))
        }
    }

    pub mod vec {
        use serde::ser::SerializeSeq;
        use serde::{Deserialize, Deserializer, Serializer};

        #[derive(Deserialize)]
        struct Wrapped(#[serde(with = "super")] u128);

        pub fn serialize<S: Serializer>(values: &[u128], serializer: S) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(values.len()))?;
            for v in values {
                seq.serialize_element(&v.to_string())?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u128>, D::Error> {
            Ok(Vec::<Wrapped>::deserialize(deserializer)?
                .into_iter()
                .map(|w| w.0)
                .collect())
        }
    }
}

// ── Wallet ───────────────────────────────────────────────────────────────────

/// Smart wallet as reported by the custodial provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub address: String,
    pub public_key: String,
    #[serde(default)]
    pub signers: Vec<Signer>,
    #[serde(default)]
    pub policies: Vec<Policy>,
    pub network: Network,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signer {
    pub key_type: SignerKeyType,
    pub public_key: String,
    pub role: SignerRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignerKeyType {
    Ed25519,
    /// Passkey (WebAuthn) credential.
    Secp256r1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignerRole {
    Admin,
    Standard,
}

/// Spending / authorization policy attached to a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub policy_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletRequest {
    pub signers: Vec<Signer>,
    #[serde(default)]
    pub policies: Vec<Policy>,
    /// Caller-side identifier of the wallet owner (email, user id, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub token: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(with = "amount")]
    pub amount: u128,
    pub decimals: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    pub signed_xdr: String,
    #[serde(default)]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    Duplicate,
    TryAgainLater,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTransaction {
    pub hash: String,
    pub status: TransactionStatus,
    #[serde(default)]
    pub ledger: Option<u32>,
}

// ── DEX ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeType {
    #[default]
    ExactIn,
    ExactOut,
}

/// Input to a quote. `amount` is the input amount for exact-in trades and the
/// desired output for exact-out trades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub token_in: String,
    pub token_out: String,
    #[serde(with = "amount")]
    pub amount: u128,
    #[serde(default)]
    pub trade_type: TradeType,
    #[serde(default)]
    pub slippage_bps: Option<u32>,
}

/// Estimate of a prospective swap. Recomputed on every call, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub token_in: String,
    pub token_out: String,
    #[serde(with = "amount")]
    pub amount_in: u128,
    #[serde(with = "amount")]
    pub amount_out: u128,
    pub price_impact_pct: Decimal,
    pub route: Vec<String>,
    pub trade_type: TradeType,
    pub slippage_bps: u32,
    #[serde(default, with = "amount::option", skip_serializing_if = "Option::is_none")]
    pub minimum_received: Option<u128>,
    #[serde(default, with = "amount::option", skip_serializing_if = "Option::is_none")]
    pub maximum_sent: Option<u128>,
}

/// Router invocation ready for signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTransaction {
    pub xdr: String,
    pub router: String,
    pub from: String,
    pub quote: Quote,
    #[serde(default)]
    pub min_resource_fee: Option<u64>,
    #[serde(default)]
    pub latest_ledger: Option<u32>,
}

// ── Yield ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultAsset {
    pub address: String,
    pub symbol: String,
    /// Share of the vault's value held in this asset.
    pub allocation_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyAllocation {
    pub address: String,
    pub name: String,
    pub asset: String,
    #[serde(with = "amount")]
    pub amount: u128,
    pub paused: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub assets: Vec<VaultAsset>,
    pub strategies: Vec<StrategyAllocation>,
    #[serde(with = "amount")]
    pub total_value_locked: u128,
    #[serde(with = "amount")]
    pub total_shares: u128,
    pub vault_fee_pct: Decimal,
    pub protocol_fee_pct: Decimal,
    pub manager: String,
    pub emergency_manager: String,
    pub fee_receiver: String,
    pub network: Network,
}

impl Vault {
    /// Underlying asset the vault primarily holds.
    pub fn primary_asset(&self) -> Option<&str> {
        self.assets.first().map(|a| a.address.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultPosition {
    pub vault: String,
    pub user: String,
    #[serde(with = "amount")]
    pub shares: u128,
    #[serde(with = "amount")]
    pub underlying_value: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub vault: String,
    #[serde(with = "amount::vec")]
    pub amounts: Vec<u128>,
    pub from: String,
    /// Immediately push the deposit into the vault's strategies.
    #[serde(default = "default_invest")]
    pub invest: bool,
    #[serde(default)]
    pub slippage_bps: Option<u32>,
}

fn default_invest() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub vault: String,
    #[serde(with = "amount")]
    pub shares: u128,
    pub from: String,
    #[serde(default)]
    pub slippage_bps: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultOperation {
    Deposit,
    Withdraw,
}

/// Vault transaction payload. `xdr` is a base64 placeholder, not a ledger
/// envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultTransaction {
    pub xdr: String,
    pub vault: String,
    pub operation: VaultOperation,
    #[serde(default, with = "amount::option", skip_serializing_if = "Option::is_none")]
    pub estimated_shares: Option<u128>,
    #[serde(with = "amount::vec")]
    pub estimated_amounts: Vec<u128>,
    pub built_at: DateTime<Utc>,
}
