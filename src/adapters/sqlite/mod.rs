//! SQLite adapter: a local ledger emulating the diary contract.
//!
//! Implements `ContractReader` directly and `ContractWriter` through
//! [`LedgerSigner`], which submits on behalf of the wallet's active account.
//!
//! # Contract rules
//!
//! - Identifiers are unique: a second `createBusinessData` with the same id
//!   reverts with "Business data already exists".
//! - Input proofs must be gateway signatures over
//!   `sha256(handle || contract || sender)`.
//! - `verifyDecryption` checks the gateway signature over the record's handle
//!   and the encoded clear values, then flips `is_verified`. A record that is
//!   already verified reverts with "Data already verified".
//!
//! # Confirmation
//!
//! State changes apply at submission. `PendingTx::wait()` blocks for the
//! configured block time so callers observe a real confirmation delay.
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::domain::{
    decode_clear_values, decryption_proof_message, input_proof_message, Address, Handle, RecordId,
};
use crate::ports::{
    BusinessData, ContractError, ContractReader, ContractWriter, PendingTx, TxReceipt, Wallet,
};

/// Error type for ledger setup.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// SQLite-backed diary contract.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
    contract: Address,
    gateway: VerifyingKey,
    block_time: Duration,
}

impl SqliteLedger {
    /// Open (or create) a ledger database at `path`.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(
        path: P,
        contract: Address,
        gateway: VerifyingKey,
    ) -> Result<Self, LedgerError> {
        Self::with_connection(Connection::open(path)?, contract, gateway)
    }

    /// Create an in-memory ledger.
    ///
    /// # Errors
    /// Returns error if the database cannot be created.
    pub fn in_memory(contract: Address, gateway: VerifyingKey) -> Result<Self, LedgerError> {
        Self::with_connection(Connection::open_in_memory()?, contract, gateway)
    }

    fn with_connection(
        conn: Connection,
        contract: Address,
        gateway: VerifyingKey,
    ) -> Result<Self, LedgerError> {
        let ledger = Self {
            conn: Mutex::new(conn),
            contract,
            gateway,
            block_time: Duration::ZERO,
        };
        ledger.init_schema()?;
        Ok(ledger)
    }

    /// Set the simulated confirmation delay.
    #[must_use]
    pub fn with_block_time(mut self, block_time: Duration) -> Self {
        self.block_time = block_time;
        self
    }

    fn init_schema(&self) -> Result<(), LedgerError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                handle BLOB NOT NULL,
                public_value1 INTEGER NOT NULL,
                public_value2 INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                creator TEXT NOT NULL,
                is_verified INTEGER NOT NULL DEFAULT 0,
                decrypted_value INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS transactions (
                block INTEGER PRIMARY KEY AUTOINCREMENT,
                hash TEXT NOT NULL UNIQUE,
                sender TEXT NOT NULL,
                method TEXT NOT NULL,
                record_id TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            ",
        )?;

        Ok(())
    }

    /// A signer submitting as the wallet's active account.
    pub fn signer<W: Wallet>(self: &Arc<Self>, wallet: Arc<W>) -> LedgerSigner<W> {
        LedgerSigner {
            ledger: Arc::clone(self),
            wallet,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ContractError> {
        self.conn
            .lock()
            .map_err(|_| ContractError::Transport("ledger lock poisoned".into()))
    }

    fn verify_gateway_signature(&self, message: &[u8; 32], proof: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(proof) else {
            return false;
        };
        self.gateway.verify(message, &signature).is_ok()
    }

    fn record_transaction(
        &self,
        conn: &Connection,
        sender: &Address,
        method: &str,
        id: &RecordId,
    ) -> Result<LedgerTx, ContractError> {
        let now = chrono::Utc::now();
        let mut hasher = Sha256::new();
        hasher.update(sender.as_bytes());
        hasher.update(method.as_bytes());
        hasher.update(id.as_str().as_bytes());
        hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
        let hash: String = std::iter::once("0x".to_string())
            .chain(hasher.finalize().iter().map(|b| format!("{b:02x}")))
            .collect();

        conn.execute(
            "INSERT INTO transactions (hash, sender, method, record_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![hash, sender.to_string(), method, id.as_str(), now.timestamp()],
        )
        .map_err(transport)?;
        let block = u64::try_from(conn.last_insert_rowid()).unwrap_or_default();

        tracing::debug!("Ledger mined {method} for {id} in block {block}");

        Ok(LedgerTx {
            receipt: TxReceipt {
                tx_hash: hash,
                block_number: block,
            },
            confirmed_at: Instant::now() + self.block_time,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn create(
        &self,
        sender: &Address,
        id: &RecordId,
        name: &str,
        handle: &Handle,
        input_proof: &[u8],
        public_value1: u32,
        public_value2: u32,
        description: &str,
    ) -> Result<LedgerTx, ContractError> {
        let message = input_proof_message(handle, &self.contract, sender);
        if !self.verify_gateway_signature(&message, input_proof) {
            return Err(ContractError::Revert("Invalid input proof".into()));
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(transport)?;

        let exists: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM records WHERE id = ?1)",
                params![id.as_str()],
                |row| row.get(0),
            )
            .map_err(transport)?;
        if exists {
            return Err(ContractError::Revert("Business data already exists".into()));
        }

        tx.execute(
            "INSERT INTO records
                (id, name, description, handle, public_value1, public_value2, timestamp, creator)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.as_str(),
                name,
                description,
                handle.as_bytes().as_slice(),
                public_value1,
                public_value2,
                chrono::Utc::now().timestamp(),
                sender.to_string(),
            ],
        )
        .map_err(transport)?;

        let pending = self.record_transaction(&tx, sender, "createBusinessData", id)?;
        tx.commit().map_err(transport)?;
        Ok(pending)
    }

    fn verify(
        &self,
        sender: &Address,
        id: &RecordId,
        encoded: &[u8],
        proof: &[u8],
    ) -> Result<LedgerTx, ContractError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(transport)?;

        let row: Option<(Vec<u8>, bool)> = tx
            .query_row(
                "SELECT handle, is_verified FROM records WHERE id = ?1",
                params![id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(transport)?;
        let Some((handle_bytes, verified)) = row else {
            return Err(ContractError::Revert("Business data does not exist".into()));
        };
        if verified {
            return Err(ContractError::AlreadyVerified);
        }

        let handle = Handle::from_slice(&handle_bytes).map_err(transport)?;
        let message = decryption_proof_message(&[handle], encoded);
        if !self.verify_gateway_signature(&message, proof) {
            return Err(ContractError::Revert("Invalid decryption proof".into()));
        }

        let values = decode_clear_values(encoded)
            .map_err(|e| ContractError::Revert(format!("Invalid clear values: {e}")))?;
        let clear = values
            .first()
            .copied()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| ContractError::Revert("Clear value out of range".into()))?;

        tx.execute(
            "UPDATE records SET is_verified = 1, decrypted_value = ?2 WHERE id = ?1",
            params![id.as_str(), clear],
        )
        .map_err(transport)?;

        let pending = self.record_transaction(&tx, sender, "verifyDecryption", id)?;
        tx.commit().map_err(transport)?;
        Ok(pending)
    }
}

fn transport(err: impl std::fmt::Display) -> ContractError {
    ContractError::Transport(err.to_string())
}

impl ContractReader for SqliteLedger {
    fn contract_address(&self) -> Address {
        self.contract
    }

    fn get_all_business_ids(&self) -> Result<Vec<RecordId>, ContractError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id FROM records ORDER BY seq ASC")
            .map_err(transport)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(transport)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(transport)?;
        Ok(ids.into_iter().map(RecordId::new).collect())
    }

    fn get_business_data(&self, id: &RecordId) -> Result<BusinessData, ContractError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT name, description, public_value1, public_value2, timestamp, creator,
                        is_verified, decrypted_value
                 FROM records WHERE id = ?1",
                params![id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, bool>(6)?,
                        row.get::<_, u32>(7)?,
                    ))
                },
            )
            .optional()
            .map_err(transport)?
            .ok_or_else(|| ContractError::NotFound(id.to_string()))?;

        let (
            name,
            description,
            public_value1,
            public_value2,
            timestamp,
            creator,
            is_verified,
            decrypted_value,
        ) = row;
        let creator: Address = creator.parse().map_err(transport)?;

        Ok(BusinessData {
            name,
            description,
            public_value1,
            public_value2,
            timestamp,
            creator,
            is_verified,
            decrypted_value,
        })
    }

    fn get_encrypted_value(&self, id: &RecordId) -> Result<Handle, ContractError> {
        let conn = self.lock()?;
        let bytes: Vec<u8> = conn
            .query_row(
                "SELECT handle FROM records WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(transport)?
            .ok_or_else(|| ContractError::NotFound(id.to_string()))?;
        Handle::from_slice(&bytes).map_err(transport)
    }
}

/// A transaction mined by the ledger, confirmed after the block time.
pub struct LedgerTx {
    receipt: TxReceipt,
    confirmed_at: Instant,
}

impl PendingTx for LedgerTx {
    fn hash(&self) -> &str {
        &self.receipt.tx_hash
    }

    fn wait(&self) -> Result<TxReceipt, ContractError> {
        let remaining = self.confirmed_at.saturating_duration_since(Instant::now());
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
        Ok(self.receipt.clone())
    }
}

/// Signer-backed client submitting as the wallet's active account.
pub struct LedgerSigner<W: Wallet> {
    ledger: Arc<SqliteLedger>,
    wallet: Arc<W>,
}

impl<W: Wallet> LedgerSigner<W> {
    fn sender(&self) -> Result<Address, ContractError> {
        self.wallet
            .account()
            .ok_or_else(|| ContractError::Transport("no signer available".into()))
    }
}

impl<W: Wallet> ContractWriter for LedgerSigner<W> {
    fn create_business_data(
        &self,
        id: &RecordId,
        name: &str,
        encrypted_value: &Handle,
        input_proof: &[u8],
        public_value1: u32,
        public_value2: u32,
        description: &str,
    ) -> Result<Box<dyn PendingTx>, ContractError> {
        let sender = self.sender()?;
        let tx = self.ledger.create(
            &sender,
            id,
            name,
            encrypted_value,
            input_proof,
            public_value1,
            public_value2,
            description,
        )?;
        Ok(Box::new(tx))
    }

    fn verify_decryption(
        &self,
        id: &RecordId,
        abi_encoded_clear_values: &[u8],
        decryption_proof: &[u8],
    ) -> Result<Box<dyn PendingTx>, ContractError> {
        let sender = self.sender()?;
        let tx = self
            .ledger
            .verify(&sender, id, abi_encoded_clear_values, decryption_proof)?;
        Ok(Box::new(tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::wallet::LocalWallet;
    use crate::domain::encode_clear_values;
    use ed25519_dalek::{Signer, SigningKey};

    struct Fixture {
        ledger: Arc<SqliteLedger>,
        signer: LedgerSigner<LocalWallet>,
        gateway: SigningKey,
        account: Address,
    }

    fn fixture() -> Fixture {
        let gateway = SigningKey::from_bytes(&[9u8; 32]);
        let contract = Address::derive(b"contract");
        let ledger = Arc::new(
            SqliteLedger::in_memory(contract, gateway.verifying_key())
                .expect("Should create ledger"),
        );
        let account = Address::derive(b"alice");
        let wallet = Arc::new(LocalWallet::new(account));
        wallet.connect();
        let signer = ledger.signer(wallet);
        Fixture {
            ledger,
            signer,
            gateway,
            account,
        }
    }

    fn create(fx: &Fixture, id: &RecordId, mood: u32) -> Result<Box<dyn PendingTx>, ContractError> {
        let contract = fx.ledger.contract_address();
        let handle = Handle::for_ciphertext(id.as_str().as_bytes(), &contract, &fx.account);
        let message = input_proof_message(&handle, &contract, &fx.account);
        let proof = fx.gateway.sign(&message).to_bytes();
        fx.signer
            .create_business_data(id, "Day 1", &handle, &proof, mood, 0, "Felt okay")
    }

    fn verify_proof(fx: &Fixture, id: &RecordId, value: u64) -> (Vec<u8>, Vec<u8>) {
        let handle = fx.ledger.get_encrypted_value(id).expect("handle");
        let encoded = encode_clear_values(&[value]);
        let proof = fx
            .gateway
            .sign(&decryption_proof_message(&[handle], &encoded))
            .to_bytes()
            .to_vec();
        (encoded, proof)
    }

    #[test]
    fn test_create_and_read_back() {
        let fx = fixture();
        let id = RecordId::new("diary-1");
        let tx = create(&fx, &id, 7).expect("Should create");
        let receipt = tx.wait().expect("Should confirm");
        assert_eq!(receipt.block_number, 1);
        assert!(receipt.tx_hash.starts_with("0x"));

        assert_eq!(fx.ledger.get_all_business_ids().expect("ids"), vec![id.clone()]);
        let data = fx.ledger.get_business_data(&id).expect("data");
        assert_eq!(data.name, "Day 1");
        assert_eq!(data.public_value1, 7);
        assert_eq!(data.creator, fx.account);
        assert!(!data.is_verified);
    }

    #[test]
    fn test_duplicate_id_reverts() {
        let fx = fixture();
        let id = RecordId::new("diary-1");
        create(&fx, &id, 7).expect("first create");
        let err = create(&fx, &id, 3).err().expect("duplicate must revert");
        assert_eq!(err, ContractError::Revert("Business data already exists".into()));
    }

    #[test]
    fn test_forged_input_proof_reverts() {
        let fx = fixture();
        let handle = Handle::from_bytes([1; 32]);
        let err = fx
            .signer
            .create_business_data(&RecordId::new("diary-2"), "t", &handle, &[0u8; 64], 5, 0, "c")
            .err()
            .expect("must revert");
        assert_eq!(err, ContractError::Revert("Invalid input proof".into()));
        assert!(fx.ledger.get_all_business_ids().expect("ids").is_empty());
    }

    #[test]
    fn test_verify_is_one_way() {
        let fx = fixture();
        let id = RecordId::new("diary-1");
        create(&fx, &id, 7).expect("create");

        let (encoded, proof) = verify_proof(&fx, &id, 7);
        fx.signer
            .verify_decryption(&id, &encoded, &proof)
            .expect("verify")
            .wait()
            .expect("confirm");

        let data = fx.ledger.get_business_data(&id).expect("data");
        assert!(data.is_verified);
        assert_eq!(data.decrypted_value, 7);

        let err = fx
            .signer
            .verify_decryption(&id, &encoded, &proof)
            .err()
            .expect("second verify must fail");
        assert!(err.is_already_verified());
    }

    #[test]
    fn test_verify_rejects_tampered_value() {
        let fx = fixture();
        let id = RecordId::new("diary-1");
        create(&fx, &id, 7).expect("create");

        let (_, proof) = verify_proof(&fx, &id, 7);
        let err = fx
            .signer
            .verify_decryption(&id, &encode_clear_values(&[9]), &proof)
            .err()
            .expect("must revert");
        assert_eq!(err, ContractError::Revert("Invalid decryption proof".into()));
    }

    #[test]
    fn test_disconnected_wallet_cannot_sign() {
        let fx = fixture();
        let wallet = Arc::new(LocalWallet::new(fx.account));
        let signer = fx.ledger.signer(wallet);
        let err = signer
            .verify_decryption(&RecordId::new("diary-1"), &[], &[])
            .err()
            .expect("no signer");
        assert!(matches!(err, ContractError::Transport(_)));
    }

    #[test]
    fn test_unknown_record() {
        let fx = fixture();
        let err = fx.ledger.get_business_data(&RecordId::new("diary-404")).expect_err("missing");
        assert_eq!(err, ContractError::NotFound("diary-404".into()));
    }

    #[test]
    fn test_persists_to_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger.db");
        let gateway = SigningKey::from_bytes(&[9u8; 32]);
        let contract = Address::derive(b"contract");
        {
            let ledger = Arc::new(
                SqliteLedger::new(&path, contract, gateway.verifying_key()).expect("open"),
            );
            let account = Address::derive(b"alice");
            let wallet = Arc::new(LocalWallet::new(account));
            wallet.connect();
            let fx = Fixture {
                signer: ledger.signer(wallet),
                ledger,
                gateway: gateway.clone(),
                account,
            };
            create(&fx, &RecordId::new("diary-5"), 4).expect("create");
        }

        let reopened = SqliteLedger::new(&path, contract, gateway.verifying_key()).expect("reopen");
        assert_eq!(
            reopened.get_all_business_ids().expect("ids"),
            vec![RecordId::new("diary-5")]
        );
    }
}
