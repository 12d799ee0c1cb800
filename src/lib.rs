//! # CipherDiary
//!
//! Terminal client for an encrypted personal diary kept on an FHE-enabled chain.
//!
//! This crate provides:
//! - Mood values encrypted client-side before they are submitted on-chain
//! - Verified decryption: off-chain decrypt plus an on-chain proof check
//! - A local devnet (SQLite ledger + tfhe co-processor) to run against
//! - Terminal UI with connect, browse, compose and verify screens
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (DiaryEntry, DiaryStats, Address, Handle)
//! - `ports`: Trait definitions for the contract, FHE SDK and wallet
//! - `adapters`: Devnet implementations (SQLite ledger, tfhe-rs co-processor)
//! - `application`: Data loading, create/decrypt flows, controller state
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{DiaryEntry, DiaryStats, RecordId};

/// Result type for CipherDiary operations
pub type Result<T> = std::result::Result<T, DiaryError>;

/// Main error type for CipherDiary.
///
/// `Display` is the message shown to the user. Underlying causes of generic
/// failures are logged where they occur and are not part of the message.
#[derive(Debug, thiserror::Error)]
pub enum DiaryError {
    #[error("Please connect wallet first")]
    WalletNotConnected,

    #[error("FHE is not initialized yet")]
    FheNotReady,

    #[error("FHEVM initialization failed")]
    FheInitialization(#[source] ports::FheError),

    #[error("{0}")]
    InvalidDraft(#[from] domain::DraftError),

    #[error("Failed to load diaries")]
    Load(#[source] ports::ContractError),

    #[error("Transaction rejected")]
    TransactionRejected,

    #[error("Creation failed: {0}")]
    Creation(String),

    #[error("Decryption failed")]
    Decryption,

    #[error("Another operation is still running")]
    Busy,
}
