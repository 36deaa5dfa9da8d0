//! Simulated Wallet
//!
//! Fake trades against a persisted USD + BTC balance.

mod ledger;
mod store;

pub use ledger::WalletLedger;
pub use store::{FileWalletStore, MemoryWalletStore, WALLET_STORAGE_KEY, WalletStore};
