//! Diary service: the collaborator-facing half of the controller.
//!
//! Holds the ports and runs the three flows (load, create, decrypt). It owns
//! no UI state; results are handed to `ControllerState` transitions.

use std::sync::Arc;

use crate::domain::{Address, DiaryEntry, DiaryStats, RecordIdGenerator};
use crate::ports::{ContractReader, ContractWriter, FheSdk, Wallet};
use crate::DiaryError;

/// Progress reported by a running flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowProgress {
    /// Client-side encryption in progress
    Encrypting,
    /// Transaction handed to the signer
    Submitting,
    /// Waiting on confirmation of a submitted transaction
    AwaitingConfirmation { tx_hash: String },
    /// Off-chain decryption and on-chain verification in progress
    VerifyingDecryption,
    /// Reloading the diary list
    Reloading,
}

/// A full diary list with its statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedDiaries {
    pub entries: Vec<DiaryEntry>,
    pub stats: DiaryStats,
}

/// Service running diary flows against the contract and FHE SDK.
pub struct DiaryService<R, W, F>
where
    R: ContractReader,
    W: ContractWriter,
    F: FheSdk,
{
    pub(super) reader: Arc<R>,
    pub(super) writer: Arc<W>,
    pub(super) fhe: Arc<F>,
    pub(super) wallet: Arc<dyn Wallet>,
    pub(super) ids: RecordIdGenerator,
}

impl<R, W, F> DiaryService<R, W, F>
where
    R: ContractReader,
    W: ContractWriter + 'static,
    F: FheSdk,
{
    /// Create a new diary service.
    pub fn new(reader: Arc<R>, writer: Arc<W>, fhe: Arc<F>, wallet: Arc<dyn Wallet>) -> Self {
        Self {
            reader,
            writer,
            fhe,
            wallet,
            ids: RecordIdGenerator::new(),
        }
    }

    /// Address of the diary contract.
    #[must_use]
    pub fn contract_address(&self) -> Address {
        self.reader.contract_address()
    }

    /// The wallet this service signs with.
    #[must_use]
    pub fn wallet(&self) -> &Arc<dyn Wallet> {
        &self.wallet
    }

    /// Whether the FHE SDK is ready for encrypt/decrypt.
    #[must_use]
    pub fn is_fhe_ready(&self) -> bool {
        self.fhe.is_initialized()
    }

    /// Active account, or the "connect wallet" precondition error.
    pub(super) fn require_account(&self) -> Result<Address, DiaryError> {
        self.wallet.account().ok_or(DiaryError::WalletNotConnected)
    }

    /// Initialize the FHE SDK.
    ///
    /// Only attempted with a connected wallet.
    ///
    /// # Errors
    /// Returns `DiaryError::WalletNotConnected` or `DiaryError::FheInitialization`.
    pub fn initialize_fhe(&self) -> Result<(), DiaryError> {
        self.require_account()?;

        tracing::info!("Initializing FHE SDK for the diary contract...");
        self.fhe.initialize().map_err(|e| {
            tracing::error!("Failed to initialize FHE SDK: {e}");
            DiaryError::FheInitialization(e)
        })?;
        tracing::info!("FHE SDK initialized");
        Ok(())
    }
}
