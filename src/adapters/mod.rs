//! Adapters layer: Concrete implementations of ports.
//!
//! These modules form a local devnet plus log hygiene:
//! - `sqlite`: SQLite-backed ledger emulating the diary contract
//! - `tfhe`: tfhe-rs co-processor emulating the FHE SDK and its gateway
//! - `wallet`: single-account local wallet
//! - `sanitize`: identifier and secret filtering for logs

pub mod sanitize;
pub mod sqlite;
pub mod tfhe;
pub mod wallet;

pub use sqlite::{LedgerError, LedgerSigner, SqliteLedger};
pub use self::tfhe::TfheCoprocessor;
pub use wallet::LocalWallet;
