//! Contract port: read and write access to the diary contract.
//!
//! Reads need no signer. Writes go through a signer-backed client and return
//! a [`PendingTx`] whose `wait()` blocks until the transaction is confirmed.

use crate::domain::{Address, Handle, RecordId};

/// Errors surfaced by contract clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    /// The wallet declined to sign.
    #[error("user rejected transaction")]
    UserRejected,

    /// The record was verified by someone else first.
    #[error("Data already verified")]
    AlreadyVerified,

    #[error("execution reverted: {0}")]
    Revert(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl ContractError {
    /// Whether this error means the record is already in its verified state.
    #[must_use]
    pub fn is_already_verified(&self) -> bool {
        match self {
            Self::AlreadyVerified => true,
            Self::Revert(reason) => reason.to_lowercase().contains("already verified"),
            _ => false,
        }
    }
}

/// Record fields as stored by the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessData {
    pub name: String,
    pub description: String,
    pub public_value1: u32,
    pub public_value2: u32,
    /// Block timestamp of creation (unix seconds)
    pub timestamp: i64,
    pub creator: Address,
    pub is_verified: bool,
    pub decrypted_value: u32,
}

/// Receipt of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: u64,
}

/// A submitted, not yet confirmed, transaction.
pub trait PendingTx: Send {
    /// Transaction hash assigned at submission.
    fn hash(&self) -> &str;

    /// Block until the transaction is confirmed.
    ///
    /// There is no timeout.
    ///
    /// # Errors
    /// Returns the revert or transport error if the transaction fails.
    fn wait(&self) -> Result<TxReceipt, ContractError>;
}

/// Read-only view of the diary contract.
pub trait ContractReader: Send + Sync {
    /// Address the contract is deployed at.
    fn contract_address(&self) -> Address;

    /// All record identifiers, in creation order.
    ///
    /// # Errors
    /// Returns error if the call fails.
    fn get_all_business_ids(&self) -> Result<Vec<RecordId>, ContractError>;

    /// Fields of one record.
    ///
    /// # Errors
    /// Returns `ContractError::NotFound` for unknown identifiers.
    fn get_business_data(&self, id: &RecordId) -> Result<BusinessData, ContractError>;

    /// Handle of the record's encrypted mood.
    ///
    /// # Errors
    /// Returns `ContractError::NotFound` for unknown identifiers.
    fn get_encrypted_value(&self, id: &RecordId) -> Result<Handle, ContractError>;
}

/// Signer-backed access to the diary contract.
pub trait ContractWriter: Send + Sync {
    /// Submit a new encrypted record.
    ///
    /// # Errors
    /// Returns `ContractError::UserRejected` if the signer declines, or a revert.
    #[allow(clippy::too_many_arguments)]
    fn create_business_data(
        &self,
        id: &RecordId,
        name: &str,
        encrypted_value: &Handle,
        input_proof: &[u8],
        public_value1: u32,
        public_value2: u32,
        description: &str,
    ) -> Result<Box<dyn PendingTx>, ContractError>;

    /// Submit a decryption result with its proof, marking the record verified.
    ///
    /// # Errors
    /// Returns `ContractError::AlreadyVerified` (or an equivalent revert) if the
    /// record is already verified.
    fn verify_decryption(
        &self,
        id: &RecordId,
        abi_encoded_clear_values: &[u8],
        decryption_proof: &[u8],
    ) -> Result<Box<dyn PendingTx>, ContractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_verified_classification() {
        assert!(ContractError::AlreadyVerified.is_already_verified());
        assert!(ContractError::Revert("Data Already Verified".into()).is_already_verified());
        assert!(!ContractError::Revert("bad proof".into()).is_already_verified());
        assert!(!ContractError::UserRejected.is_already_verified());
    }
}
