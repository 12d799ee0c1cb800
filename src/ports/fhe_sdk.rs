//! FHE SDK port: Trait for client-side encryption and verified decryption.
//!
//! This trait abstracts the FHE co-processor SDK from the application logic.

use std::collections::BTreeMap;

use crate::domain::{Address, EncryptedInput, Handle};

use super::contract::{ContractError, PendingTx, TxReceipt};

/// Errors that can occur during FHE SDK operations.
#[derive(Debug, thiserror::Error)]
pub enum FheError {
    #[error("FHE SDK not initialized")]
    NotInitialized,

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Unknown ciphertext handle: {0:?}")]
    UnknownHandle(Handle),

    #[error("Decryption submission failed: {0}")]
    Submission(#[from] ContractError),
}

impl FheError {
    /// The contract error behind a failed submission, if any.
    #[must_use]
    pub fn contract_error(&self) -> Option<&ContractError> {
        match self {
            Self::Submission(err) => Some(err),
            _ => None,
        }
    }
}

/// Capability the SDK uses to put a decryption result on-chain.
///
/// The SDK decrypts off-chain, then hands the encoded clear values and the
/// decryption proof to this capability, and waits on the returned transaction.
pub trait SubmitDecryption {
    /// Submit the verification transaction.
    ///
    /// # Errors
    /// Returns the contract error if submission fails.
    fn submit(
        &self,
        abi_encoded_clear_values: &[u8],
        decryption_proof: &[u8],
    ) -> Result<Box<dyn PendingTx>, ContractError>;
}

impl<F> SubmitDecryption for F
where
    F: Fn(&[u8], &[u8]) -> Result<Box<dyn PendingTx>, ContractError>,
{
    fn submit(
        &self,
        abi_encoded_clear_values: &[u8],
        decryption_proof: &[u8],
    ) -> Result<Box<dyn PendingTx>, ContractError> {
        self(abi_encoded_clear_values, decryption_proof)
    }
}

/// Result of a verified decryption.
#[derive(Debug, Clone)]
pub struct VerifiedDecryption {
    /// Clear value per requested handle
    pub clear_values: BTreeMap<Handle, u64>,

    /// Receipt of the on-chain verification transaction
    pub receipt: TxReceipt,
}

impl VerifiedDecryption {
    /// Clear value for one handle.
    #[must_use]
    pub fn value_of(&self, handle: &Handle) -> Option<u64> {
        self.clear_values.get(handle).copied()
    }
}

/// Trait for the FHE co-processor SDK.
///
/// `initialize` must complete before `encrypt` or `verify_decryption`;
/// both return `FheError::NotInitialized` otherwise.
pub trait FheSdk: Send + Sync {
    /// Prepare keys and parameters. Idempotent.
    ///
    /// # Errors
    /// Returns `FheError::Initialization` if setup fails.
    fn initialize(&self) -> Result<(), FheError>;

    /// Whether `initialize` has completed.
    fn is_initialized(&self) -> bool;

    /// Encrypt a value for `contract`, bound to `account`.
    ///
    /// May take a long time (client-side cryptographic work).
    ///
    /// # Errors
    /// Returns `FheError::Encryption` if encryption fails.
    fn encrypt(
        &self,
        contract: &Address,
        account: &Address,
        value: u32,
    ) -> Result<EncryptedInput, FheError>;

    /// Decrypt `handles` off-chain and submit the result through `submit`.
    ///
    /// # Errors
    /// Returns `FheError::Submission` carrying the contract error if the
    /// on-chain step fails, or a decryption error.
    fn verify_decryption(
        &self,
        handles: &[Handle],
        contract: &Address,
        submit: &dyn SubmitDecryption,
    ) -> Result<VerifiedDecryption, FheError>;
}
