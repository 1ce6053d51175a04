pub mod health;
pub mod wallets;
pub mod dex;
pub mod vaults;
pub mod strategies;
