//! Textual Stellar identifier checks, run before any network call.

/// Length of a strkey-encoded account or contract identifier.
pub const STRKEY_LEN: usize = 56;

/// Prefix of contract identifiers (tokens, vaults, routers, smart wallets).
pub const CONTRACT_PREFIX: char = 'C';

/// Prefix of classic account identifiers.
pub const ACCOUNT_PREFIX: char = 'G';

/// 56 ASCII characters from the RFC 4648 base32 alphabet (`A-Z`, `2-7`).
fn is_strkey_shaped(id: &str) -> bool {
    id.len() == STRKEY_LEN && id.bytes().all(|b| matches!(b, b'A'..=b'Z' | b'2'..=b'7'))
}

/// `true` when `id` looks like a contract identifier: a `C...` strkey.
pub fn is_contract_id(id: &str) -> bool {
    is_strkey_shaped(id) && id.starts_with(CONTRACT_PREFIX)
}

/// `true` for anything that can own funds: a classic account or a contract.
pub fn is_account_id(id: &str) -> bool {
    is_strkey_shaped(id) && (id.starts_with(ACCOUNT_PREFIX) || id.starts_with(CONTRACT_PREFIX))
}
