//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (diary contract, FHE
//! co-processor SDK, wallet).

mod contract;
mod fhe_sdk;
mod wallet;

pub use contract::{
    BusinessData, ContractError, ContractReader, ContractWriter, PendingTx, TxReceipt,
};
pub use fhe_sdk::{FheError, FheSdk, SubmitDecryption, VerifiedDecryption};
pub use wallet::Wallet;
