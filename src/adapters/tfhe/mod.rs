//! TFHE adapter: Implementation of FheSdk using tfhe-rs.
//!
//! Emulates the FHE co-processor and its gateway locally:
//!
//! - `initialize()` generates a tfhe-rs client key (slow, done once)
//! - `encrypt()` produces an `FheUint32` ciphertext, keeps it in the
//!   co-processor store and returns its handle plus a gateway-signed input proof
//! - `verify_decryption()` decrypts the ciphertexts behind the handles, signs
//!   the ABI-encoded clear values and hands both to the submit capability
//!
//! # Gateway key
//!
//! Input and decryption proofs are Ed25519 signatures. The ledger must be
//! built with [`TfheCoprocessor::gateway_key`] to accept them.
//!
//! # Thread Safety
//!
//! Key generation runs at most once; concurrent `initialize()` calls wait for
//! the first one. No server key is installed: nothing here computes on
//! ciphertexts, so the thread-local `set_server_key` is never needed.

use std::collections::{BTreeMap, HashMap};
use std::panic;
use std::sync::{Mutex, OnceLock};

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

// tfhe-rs imports
use tfhe::prelude::*;
use tfhe::{ClientKey as TfheClientKey, ConfigBuilder, FheUint32};

use crate::domain::{
    decryption_proof_message, encode_clear_values, input_proof_message, Address, EncryptedInput,
    Handle,
};
use crate::ports::{FheError, FheSdk, SubmitDecryption, VerifiedDecryption};

/// A ciphertext held by the co-processor, with the contract it was created for.
struct StoredCiphertext {
    contract: Address,
    bytes: Vec<u8>,
}

/// FHE co-processor backed by tfhe-rs.
pub struct TfheCoprocessor {
    client_key: OnceLock<TfheClientKey>,
    init_lock: Mutex<()>,
    ciphertexts: Mutex<HashMap<Handle, StoredCiphertext>>,
    gateway: SigningKey,
}

impl TfheCoprocessor {
    /// Create a co-processor with a random gateway key.
    #[must_use]
    pub fn new() -> Self {
        let mut rng = ChaCha20Rng::from_entropy();
        Self::with_gateway_seed(rng.gen())
    }

    /// Create a co-processor with a fixed gateway key seed.
    ///
    /// A fixed seed keeps proofs valid against a persisted ledger across runs.
    #[must_use]
    pub fn with_gateway_seed(seed: [u8; 32]) -> Self {
        Self {
            client_key: OnceLock::new(),
            init_lock: Mutex::new(()),
            ciphertexts: Mutex::new(HashMap::new()),
            gateway: SigningKey::from_bytes(&seed),
        }
    }

    /// Public half of the gateway key, for proof verification on the ledger.
    #[must_use]
    pub fn gateway_key(&self) -> VerifyingKey {
        self.gateway.verifying_key()
    }

    fn key(&self) -> Result<&TfheClientKey, FheError> {
        self.client_key.get().ok_or(FheError::NotInitialized)
    }

    fn decrypt_handle(
        &self,
        key: &TfheClientKey,
        handle: &Handle,
        contract: &Address,
    ) -> Result<u64, FheError> {
        let store = self
            .ciphertexts
            .lock()
            .map_err(|_| FheError::Decryption("ciphertext store lock poisoned".into()))?;
        let stored = store.get(handle).ok_or(FheError::UnknownHandle(*handle))?;

        if stored.contract != *contract {
            return Err(FheError::Decryption(format!(
                "handle {handle:?} is not bound to contract {contract}"
            )));
        }

        let ciphertext: FheUint32 = bincode::deserialize(&stored.bytes).map_err(|e| {
            FheError::Decryption(format!("Failed to deserialize ciphertext {handle:?}: {e}"))
        })?;
        let clear: u32 = ciphertext.decrypt(key);
        Ok(u64::from(clear))
    }
}

impl Default for TfheCoprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FheSdk for TfheCoprocessor {
    fn initialize(&self) -> Result<(), FheError> {
        if self.client_key.get().is_some() {
            return Ok(());
        }

        let _guard = self
            .init_lock
            .lock()
            .map_err(|_| FheError::Initialization("init lock poisoned".into()))?;
        if self.client_key.get().is_some() {
            return Ok(());
        }

        tracing::info!("Generating FHE client key...");
        let config = ConfigBuilder::default().build();
        // tfhe-rs panics when no entropy source is available on this platform.
        let client_key =
            panic::catch_unwind(panic::AssertUnwindSafe(move || TfheClientKey::generate(config)))
                .map_err(|_| FheError::Initialization("client key generation panicked".into()))?;

        if self.client_key.set(client_key).is_err() {
            tracing::debug!("FHE key was set concurrently");
        }
        tracing::info!("FHE co-processor ready");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.client_key.get().is_some()
    }

    fn encrypt(
        &self,
        contract: &Address,
        account: &Address,
        value: u32,
    ) -> Result<EncryptedInput, FheError> {
        let key = self.key()?;

        tracing::debug!("Encrypting input for {contract}...");
        let ciphertext = FheUint32::encrypt(value, key);
        let bytes = bincode::serialize(&ciphertext)
            .map_err(|e| FheError::Encryption(format!("Failed to serialize ciphertext: {e}")))?;

        let handle = Handle::for_ciphertext(&bytes, contract, account);
        let size = bytes.len();

        self.ciphertexts
            .lock()
            .map_err(|_| FheError::Encryption("ciphertext store lock poisoned".into()))?
            .insert(
                handle,
                StoredCiphertext {
                    contract: *contract,
                    bytes,
                },
            );

        let proof = self
            .gateway
            .sign(&input_proof_message(&handle, contract, account))
            .to_bytes()
            .to_vec();

        tracing::info!("Encrypted input {handle:?} (ciphertext size: {size} bytes)");

        Ok(EncryptedInput::new(handle, proof))
    }

    fn verify_decryption(
        &self,
        handles: &[Handle],
        contract: &Address,
        submit: &dyn SubmitDecryption,
    ) -> Result<VerifiedDecryption, FheError> {
        let key = self.key()?;
        if handles.is_empty() {
            return Err(FheError::Decryption("no handles requested".into()));
        }

        // Off-chain decryption.
        let mut clear_values = BTreeMap::new();
        let mut ordered = Vec::with_capacity(handles.len());
        for handle in handles {
            let value = self.decrypt_handle(key, handle, contract)?;
            clear_values.insert(*handle, value);
            ordered.push(value);
        }

        let encoded = encode_clear_values(&ordered);
        let proof = self
            .gateway
            .sign(&decryption_proof_message(handles, &encoded))
            .to_bytes();

        // On-chain submission through the caller's capability.
        tracing::debug!("Submitting decryption proof for {} handle(s)", handles.len());
        let pending = submit.submit(&encoded, &proof)?;
        tracing::debug!("Verification tx {} submitted, waiting...", pending.hash());
        let receipt = pending.wait()?;

        tracing::info!(
            "Decryption verified in block {} ({} handle(s))",
            receipt.block_number,
            handles.len()
        );

        Ok(VerifiedDecryption {
            clear_values,
            receipt,
        })
    }
}
