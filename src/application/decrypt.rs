//! Decrypt flow: verified decryption of one diary's encrypted mood.

use std::sync::Arc;

use crate::domain::RecordId;
use crate::ports::{ContractError, ContractReader, ContractWriter, FheError, FheSdk, PendingTx};
use crate::DiaryError;

use super::service::{DiaryService, FlowProgress, LoadedDiaries};

/// How a decrypt request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DecryptOutcome {
    /// The record was verified before the request; its stored value is returned.
    AlreadyVerified { value: u32 },
    /// Decryption verified on-chain by this request.
    Verified {
        value: u32,
        diaries: Option<LoadedDiaries>,
    },
    /// Someone else verified the record while this request was in flight.
    ConcurrentlyVerified { diaries: Option<LoadedDiaries> },
}

impl DecryptOutcome {
    /// The clear value to show, if this outcome carries one.
    #[must_use]
    pub fn value(&self) -> Option<u32> {
        match self {
            Self::AlreadyVerified { value } | Self::Verified { value, .. } => Some(*value),
            Self::ConcurrentlyVerified { .. } => None,
        }
    }
}

fn already_verified(err: &FheError) -> bool {
    err.contract_error()
        .is_some_and(ContractError::is_already_verified)
        || err.to_string().to_lowercase().contains("already verified")
}

impl<R, W, F> DiaryService<R, W, F>
where
    R: ContractReader,
    W: ContractWriter + 'static,
    F: FheSdk,
{
    /// Decrypt a diary's mood and record the result on-chain.
    ///
    /// Verified records return their stored value without touching the SDK.
    ///
    /// # Errors
    /// - `DiaryError::WalletNotConnected` / `DiaryError::FheNotReady` on preconditions
    /// - `DiaryError::Decryption` for any other failure (the cause is logged)
    pub fn decrypt_diary(
        &self,
        record_id: &RecordId,
        progress: &mut dyn FnMut(FlowProgress),
    ) -> Result<DecryptOutcome, DiaryError> {
        self.require_account()?;

        let current = self.reader.get_business_data(record_id).map_err(|e| {
            tracing::error!("Failed to read {record_id} for decryption: {e}");
            DiaryError::Decryption
        })?;
        if current.is_verified {
            tracing::info!("Diary {record_id} already verified");
            return Ok(DecryptOutcome::AlreadyVerified {
                value: current.decrypted_value,
            });
        }

        if !self.fhe.is_initialized() {
            return Err(DiaryError::FheNotReady);
        }

        let handle = self.reader.get_encrypted_value(record_id).map_err(|e| {
            tracing::error!("Failed to read handle of {record_id}: {e}");
            DiaryError::Decryption
        })?;
        let contract = self.reader.contract_address();

        let writer = Arc::clone(&self.writer);
        let target = record_id.clone();
        let submit =
            move |clear: &[u8], proof: &[u8]| -> Result<Box<dyn PendingTx>, ContractError> {
                writer.verify_decryption(&target, clear, proof)
            };

        progress(FlowProgress::VerifyingDecryption);
        match self.fhe.verify_decryption(&[handle], &contract, &submit) {
            Ok(verified) => {
                let value = verified
                    .value_of(&handle)
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| {
                        tracing::error!("No usable clear value for {record_id}");
                        DiaryError::Decryption
                    })?;
                tracing::info!(
                    "Diary {record_id} verified in block {}",
                    verified.receipt.block_number
                );

                progress(FlowProgress::Reloading);
                Ok(DecryptOutcome::Verified {
                    value,
                    diaries: self.reload_after(record_id),
                })
            }
            Err(e) if already_verified(&e) => {
                tracing::info!("Diary {record_id} was verified concurrently");
                progress(FlowProgress::Reloading);
                Ok(DecryptOutcome::ConcurrentlyVerified {
                    diaries: self.reload_after(record_id),
                })
            }
            Err(e) => {
                tracing::error!("Decryption of {record_id} failed: {e}");
                Err(DiaryError::Decryption)
            }
        }
    }

    fn reload_after(&self, record_id: &RecordId) -> Option<LoadedDiaries> {
        self.load_diaries()
            .map_err(|e| tracing::warn!("Reload after decrypting {record_id} failed: {e}"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fakes::{business, harness};
    use crate::domain::DiaryDraft;

    fn created(h: &crate::application::fakes::Harness, mood: &str) -> RecordId {
        let draft = DiaryDraft::parse("Entry", "Body", mood).expect("valid");
        h.service
            .create_diary(&draft, &mut |_| {})
            .expect("create")
            .record_id
    }

    #[test]
    fn test_decrypt_round_trip() {
        let h = harness();
        h.connect_ready();
        let id = created(&h, "7");

        let mut steps = Vec::new();
        let outcome = h
            .service
            .decrypt_diary(&id, &mut |p| steps.push(p))
            .expect("Should decrypt");

        assert_eq!(outcome.value(), Some(7));
        let DecryptOutcome::Verified { diaries, .. } = outcome else {
            panic!("expected fresh verification");
        };
        let entry = &diaries.expect("reloaded").entries[0];
        assert!(entry.is_verified);
        assert_eq!(entry.decrypted_value, 7);
        assert_eq!(steps.first(), Some(&FlowProgress::VerifyingDecryption));
    }

    #[test]
    fn test_only_requested_record_is_verified() {
        let h = harness();
        h.connect_ready();
        let first = created(&h, "3");
        let second = created(&h, "8");

        let outcome = h.service.decrypt_diary(&second, &mut |_| {}).expect("decrypt");
        let DecryptOutcome::Verified { value, diaries } = outcome else {
            panic!("expected fresh verification");
        };
        assert_eq!(value, 8);

        let entries = diaries.expect("reloaded").entries;
        let by_id = |id: &RecordId| entries.iter().find(|e| &e.record_id == id).cloned();
        assert!(!by_id(&first).expect("first").is_verified);
        assert!(by_id(&second).expect("second").is_verified);
        assert_eq!(h.contract.verify_calls(), 1);
    }

    #[test]
    fn test_already_verified_skips_sdk() {
        let h = harness();
        h.connect_ready();
        let mut data = business(4, 0, true);
        data.decrypted_value = 4;
        h.contract.insert("diary-9", data);

        let outcome = h
            .service
            .decrypt_diary(&RecordId::new("diary-9"), &mut |_| {})
            .expect("Should short-circuit");
        assert_eq!(outcome, DecryptOutcome::AlreadyVerified { value: 4 });
        assert_eq!(h.fhe.decrypt_calls(), 0);
        assert_eq!(h.contract.verify_calls(), 0);
    }

    #[test]
    fn test_verified_twice_returns_stored_value() {
        let h = harness();
        h.connect_ready();
        let id = created(&h, "9");

        h.service.decrypt_diary(&id, &mut |_| {}).expect("first");
        let second = h.service.decrypt_diary(&id, &mut |_| {}).expect("second");
        assert_eq!(second, DecryptOutcome::AlreadyVerified { value: 9 });
        assert_eq!(h.fhe.decrypt_calls(), 1);
    }

    #[test]
    fn test_concurrent_verification_is_not_an_error() {
        let h = harness();
        h.connect_ready();
        let id = created(&h, "5");
        h.contract.lose_next_verify_race(ContractError::AlreadyVerified);

        let outcome = h
            .service
            .decrypt_diary(&id, &mut |_| {})
            .expect("Should report concurrent verification");
        assert_eq!(outcome.value(), None);
        let DecryptOutcome::ConcurrentlyVerified { diaries } = outcome else {
            panic!("expected concurrent verification");
        };
        let entry = &diaries.expect("reloaded").entries[0];
        assert!(entry.is_verified);
        assert_eq!(entry.decrypted_value, 5);
    }

    #[test]
    fn test_already_verified_revert_reason_is_recognized() {
        let h = harness();
        h.connect_ready();
        let id = created(&h, "6");
        h.contract
            .lose_next_verify_race(ContractError::Revert("Data already verified".into()));

        let outcome = h.service.decrypt_diary(&id, &mut |_| {}).expect("not an error");
        let DecryptOutcome::ConcurrentlyVerified { diaries } = outcome else {
            panic!("expected concurrent verification");
        };
        assert!(diaries.expect("reloaded").entries[0].is_verified);
    }

    #[test]
    fn test_already_verified_sdk_message_is_recognized() {
        let h = harness();
        h.connect_ready();
        let id = created(&h, "2");
        h.contract
            .lose_next_verify_race(ContractError::Transport("relayer timeout".into()));
        h.fhe
            .fail_next_decrypt(FheError::Decryption("relayer: record Already Verified".into()));

        let outcome = h.service.decrypt_diary(&id, &mut |_| {}).expect("not an error");
        let DecryptOutcome::ConcurrentlyVerified { diaries } = outcome else {
            panic!("expected concurrent verification");
        };
        let entry = &diaries.expect("reloaded").entries[0];
        assert!(entry.is_verified);
        assert_eq!(entry.decrypted_value, 2);
    }

    #[test]
    fn test_other_failures_are_generic() {
        let h = harness();
        h.connect_ready();
        let id = created(&h, "5");
        h.contract
            .fail_next_verify(ContractError::Revert("Invalid decryption proof".into()));

        let err = h
            .service
            .decrypt_diary(&id, &mut |_| {})
            .expect_err("must fail");
        assert_eq!(err.to_string(), "Decryption failed");
    }

    #[test]
    fn test_unknown_record_fails() {
        let h = harness();
        h.connect_ready();

        let err = h
            .service
            .decrypt_diary(&RecordId::new("diary-404"), &mut |_| {})
            .expect_err("must fail");
        assert!(matches!(err, DiaryError::Decryption));
    }

    #[test]
    fn test_requires_wallet() {
        let h = harness();
        let err = h
            .service
            .decrypt_diary(&RecordId::new("diary-1"), &mut |_| {})
            .expect_err("must fail");
        assert!(matches!(err, DiaryError::WalletNotConnected));
    }
}
