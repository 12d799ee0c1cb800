//! In-memory collaborators for application tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::adapters::LocalWallet;
use crate::domain::{
    decode_clear_values, encode_clear_values, Address, EncryptedInput, Handle, RecordId,
};
use crate::ports::{
    BusinessData, ContractError, ContractReader, ContractWriter, FheError, FheSdk, PendingTx,
    SubmitDecryption, TxReceipt, VerifiedDecryption, Wallet,
};

use super::DiaryService;

pub(crate) fn business(mood: u32, timestamp: i64, is_verified: bool) -> BusinessData {
    BusinessData {
        name: "Entry".to_string(),
        description: "Body".to_string(),
        public_value1: mood,
        public_value2: 0,
        timestamp,
        creator: Address::derive(b"alice"),
        is_verified,
        decrypted_value: if is_verified { mood } else { 0 },
    }
}

struct FakeTx(Result<TxReceipt, ContractError>);

impl PendingTx for FakeTx {
    fn hash(&self) -> &str {
        "0xfake"
    }

    fn wait(&self) -> Result<TxReceipt, ContractError> {
        self.0.clone()
    }
}

fn receipt() -> TxReceipt {
    TxReceipt {
        tx_hash: "0xfake".to_string(),
        block_number: 1,
    }
}

struct StoredRecord {
    id: RecordId,
    data: BusinessData,
    handle: Handle,
}

#[derive(Default)]
pub(crate) struct FakeContract {
    records: Mutex<Vec<StoredRecord>>,
    failing_ids: Mutex<Option<ContractError>>,
    failing_records: Mutex<HashSet<RecordId>>,
    reject_write: AtomicBool,
    next_wait_error: Mutex<Option<ContractError>>,
    next_verify_error: Mutex<Option<ContractError>>,
    race_next_verify: Mutex<Option<ContractError>>,
    create_calls: AtomicUsize,
    verify_calls: AtomicUsize,
}

impl FakeContract {
    fn address() -> Address {
        Address::derive(b"fake-contract")
    }

    pub(crate) fn insert(&self, id: &str, data: BusinessData) {
        let handle = Handle::for_ciphertext(id.as_bytes(), &Self::address(), &data.creator);
        self.records.lock().expect("lock").push(StoredRecord {
            id: RecordId::new(id),
            data,
            handle,
        });
    }

    pub(crate) fn fail_ids(&self, err: ContractError) {
        *self.failing_ids.lock().expect("lock") = Some(err);
    }

    pub(crate) fn fail_record(&self, id: &str) {
        self.failing_records.lock().expect("lock").insert(RecordId::new(id));
    }

    pub(crate) fn reject_next_write(&self) {
        self.reject_write.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_next_wait(&self, err: ContractError) {
        *self.next_wait_error.lock().expect("lock") = Some(err);
    }

    pub(crate) fn fail_next_verify(&self, err: ContractError) {
        *self.next_verify_error.lock().expect("lock") = Some(err);
    }

    /// Another client verifies the record first; this submission then fails with `err`.
    pub(crate) fn lose_next_verify_race(&self, err: ContractError) {
        *self.race_next_verify.lock().expect("lock") = Some(err);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.lock().expect("lock").is_empty()
    }

    pub(crate) fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    fn with_record<T>(
        &self,
        id: &RecordId,
        f: impl FnOnce(&mut StoredRecord) -> T,
    ) -> Result<T, ContractError> {
        if self.failing_records.lock().expect("lock").contains(id) {
            return Err(ContractError::Transport(format!("cannot read {id}")));
        }
        let mut records = self.records.lock().expect("lock");
        records
            .iter_mut()
            .find(|r| &r.id == id)
            .map(f)
            .ok_or_else(|| ContractError::NotFound(id.to_string()))
    }
}

impl ContractReader for FakeContract {
    fn contract_address(&self) -> Address {
        Self::address()
    }

    fn get_all_business_ids(&self) -> Result<Vec<RecordId>, ContractError> {
        if let Some(err) = self.failing_ids.lock().expect("lock").clone() {
            return Err(err);
        }
        Ok(self
            .records
            .lock()
            .expect("lock")
            .iter()
            .map(|r| r.id.clone())
            .collect())
    }

    fn get_business_data(&self, id: &RecordId) -> Result<BusinessData, ContractError> {
        self.with_record(id, |r| r.data.clone())
    }

    fn get_encrypted_value(&self, id: &RecordId) -> Result<Handle, ContractError> {
        self.with_record(id, |r| r.handle)
    }
}

impl ContractWriter for FakeContract {
    fn create_business_data(
        &self,
        id: &RecordId,
        name: &str,
        encrypted_value: &Handle,
        _input_proof: &[u8],
        public_value1: u32,
        public_value2: u32,
        description: &str,
    ) -> Result<Box<dyn PendingTx>, ContractError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_write.swap(false, Ordering::SeqCst) {
            return Err(ContractError::UserRejected);
        }
        if let Some(err) = self.next_wait_error.lock().expect("lock").take() {
            return Ok(Box::new(FakeTx(Err(err))));
        }

        self.records.lock().expect("lock").push(StoredRecord {
            id: id.clone(),
            data: BusinessData {
                name: name.to_string(),
                description: description.to_string(),
                public_value1,
                public_value2,
                timestamp: chrono::Utc::now().timestamp(),
                creator: Address::derive(b"alice"),
                is_verified: false,
                decrypted_value: 0,
            },
            handle: *encrypted_value,
        });
        Ok(Box::new(FakeTx(Ok(receipt()))))
    }

    fn verify_decryption(
        &self,
        id: &RecordId,
        abi_encoded_clear_values: &[u8],
        _decryption_proof: &[u8],
    ) -> Result<Box<dyn PendingTx>, ContractError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.next_verify_error.lock().expect("lock").take() {
            return Err(err);
        }

        let values = decode_clear_values(abi_encoded_clear_values)
            .map_err(|e| ContractError::Revert(e.to_string()))?;
        let value = values
            .first()
            .and_then(|v| u32::try_from(*v).ok())
            .ok_or_else(|| ContractError::Revert("bad clear value".into()))?;

        if let Some(err) = self.race_next_verify.lock().expect("lock").take() {
            self.with_record(id, |r| {
                r.data.is_verified = true;
                r.data.decrypted_value = value;
            })?;
            return Err(err);
        }

        self.with_record(id, |r| {
            if r.data.is_verified {
                return Err(ContractError::AlreadyVerified);
            }
            r.data.is_verified = true;
            r.data.decrypted_value = value;
            Ok(())
        })??;
        Ok(Box::new(FakeTx(Ok(receipt()))))
    }
}

/// FHE SDK keeping clear values in a map.
#[derive(Default)]
pub(crate) struct FakeFhe {
    ready: AtomicBool,
    fail_init: AtomicBool,
    panic_init: AtomicBool,
    panic_encrypt: AtomicBool,
    next_decrypt_error: Mutex<Option<FheError>>,
    values: Mutex<HashMap<Handle, u64>>,
    encrypt_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
}

impl FakeFhe {
    pub(crate) fn set_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_initialization(&self) {
        self.fail_init.store(true, Ordering::SeqCst);
    }

    pub(crate) fn panic_on_initialize(&self) {
        self.panic_init.store(true, Ordering::SeqCst);
    }

    pub(crate) fn panic_on_encrypt(&self) {
        self.panic_encrypt.store(true, Ordering::SeqCst);
    }

    /// The next `verify_decryption` fails with `err` after submitting.
    pub(crate) fn fail_next_decrypt(&self, err: FheError) {
        *self.next_decrypt_error.lock().expect("lock") = Some(err);
    }

    pub(crate) fn encrypt_calls(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }
}

impl FheSdk for FakeFhe {
    fn initialize(&self) -> Result<(), FheError> {
        assert!(!self.panic_init.load(Ordering::SeqCst), "no entropy source");
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(FheError::Initialization("relayer unreachable".into()));
        }
        self.set_ready();
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn encrypt(
        &self,
        contract: &Address,
        account: &Address,
        value: u32,
    ) -> Result<EncryptedInput, FheError> {
        if !self.is_initialized() {
            return Err(FheError::NotInitialized);
        }
        assert!(!self.panic_encrypt.load(Ordering::SeqCst), "encryptor crashed");
        let n = self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        let handle = Handle::for_ciphertext(&n.to_be_bytes(), contract, account);
        self.values
            .lock()
            .expect("lock")
            .insert(handle, u64::from(value));
        Ok(EncryptedInput::new(handle, vec![0xaa; 64]))
    }

    fn verify_decryption(
        &self,
        handles: &[Handle],
        _contract: &Address,
        submit: &dyn SubmitDecryption,
    ) -> Result<VerifiedDecryption, FheError> {
        if !self.is_initialized() {
            return Err(FheError::NotInitialized);
        }
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);

        let mut clear_values = BTreeMap::new();
        let mut ordered = Vec::new();
        {
            let values = self.values.lock().expect("lock");
            for handle in handles {
                let value = *values.get(handle).ok_or(FheError::UnknownHandle(*handle))?;
                clear_values.insert(*handle, value);
                ordered.push(value);
            }
        }

        let submitted = submit.submit(&encode_clear_values(&ordered), &[0xbb; 64]);
        // A relayer reports its own error text whatever the submission did.
        if let Some(err) = self.next_decrypt_error.lock().expect("lock").take() {
            return Err(err);
        }
        let pending = submitted?;
        let receipt = pending.wait()?;
        Ok(VerifiedDecryption {
            clear_values,
            receipt,
        })
    }
}

pub(crate) type TestService = DiaryService<FakeContract, FakeContract, FakeFhe>;

pub(crate) struct Harness {
    pub service: TestService,
    pub contract: Arc<FakeContract>,
    pub fhe: Arc<FakeFhe>,
    pub wallet: Arc<LocalWallet>,
}

impl Harness {
    pub(crate) fn connect_wallet(&self) {
        self.wallet.connect();
    }

    pub(crate) fn connect_ready(&self) {
        self.connect_wallet();
        self.fhe.set_ready();
    }
}

pub(crate) fn harness() -> Harness {
    let contract = Arc::new(FakeContract::default());
    let fhe = Arc::new(FakeFhe::default());
    let wallet = Arc::new(LocalWallet::new(Address::derive(b"alice")));
    let service = DiaryService::new(
        Arc::clone(&contract),
        Arc::clone(&contract),
        Arc::clone(&fhe),
        Arc::clone(&wallet) as Arc<dyn Wallet>,
    );
    Harness {
        service,
        contract,
        fhe,
        wallet,
    }
}
