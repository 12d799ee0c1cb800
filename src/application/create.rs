//! Create flow: encrypt the mood, submit the record, wait, reload.

use crate::domain::{DiaryDraft, RecordId};
use crate::ports::{ContractError, ContractReader, ContractWriter, FheSdk, TxReceipt};
use crate::DiaryError;

use super::service::{DiaryService, FlowProgress, LoadedDiaries};

/// Result of a confirmed creation.
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub record_id: RecordId,
    pub receipt: TxReceipt,
    /// Reloaded list; `None` if the reload after creation failed.
    pub diaries: Option<LoadedDiaries>,
}

fn classify(err: ContractError) -> DiaryError {
    match err {
        ContractError::UserRejected => DiaryError::TransactionRejected,
        other => DiaryError::Creation(other.to_string()),
    }
}

impl<R, W, F> DiaryService<R, W, F>
where
    R: ContractReader,
    W: ContractWriter + 'static,
    F: FheSdk,
{
    /// Create a diary entry with the draft's mood encrypted.
    ///
    /// The clear mood is also stored as `public_value1`; `public_value2` is 0.
    ///
    /// # Errors
    /// - `DiaryError::WalletNotConnected` / `DiaryError::FheNotReady` on preconditions
    /// - `DiaryError::TransactionRejected` if the signer declined
    /// - `DiaryError::Creation` for any other failure, carrying its cause
    pub fn create_diary(
        &self,
        draft: &DiaryDraft,
        progress: &mut dyn FnMut(FlowProgress),
    ) -> Result<CreateOutcome, DiaryError> {
        let account = self.require_account()?;
        if !self.fhe.is_initialized() {
            return Err(DiaryError::FheNotReady);
        }

        let contract = self.reader.contract_address();
        let record_id = self.ids.next_id();
        tracing::info!("Creating diary {record_id}...");

        progress(FlowProgress::Encrypting);
        let input = self
            .fhe
            .encrypt(&contract, &account, draft.mood())
            .map_err(|e| {
                tracing::error!("Encryption for {record_id} failed: {e}");
                DiaryError::Creation(e.to_string())
            })?;

        progress(FlowProgress::Submitting);
        let pending = self
            .writer
            .create_business_data(
                &record_id,
                draft.title(),
                &input.encrypted_data,
                &input.proof,
                draft.mood(),
                0,
                draft.content(),
            )
            .map_err(|e| {
                tracing::warn!("Submission of {record_id} failed: {e}");
                classify(e)
            })?;

        progress(FlowProgress::AwaitingConfirmation {
            tx_hash: pending.hash().to_string(),
        });
        let receipt = pending.wait().map_err(|e| {
            tracing::warn!("Transaction for {record_id} failed: {e}");
            classify(e)
        })?;
        tracing::info!(
            "Diary {record_id} confirmed in block {}",
            receipt.block_number
        );

        progress(FlowProgress::Reloading);
        let diaries = match self.load_diaries() {
            Ok(loaded) => Some(loaded),
            Err(e) => {
                tracing::warn!("Reload after creating {record_id} failed: {e}");
                None
            }
        };

        Ok(CreateOutcome {
            record_id,
            receipt,
            diaries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fakes::harness;

    fn draft() -> DiaryDraft {
        DiaryDraft::parse("Day 1", "Felt okay", "7").expect("valid draft")
    }

    #[test]
    fn test_create_happy_path() {
        let h = harness();
        h.connect_ready();

        let mut steps = Vec::new();
        let outcome = h
            .service
            .create_diary(&draft(), &mut |p| steps.push(p))
            .expect("Should create");

        assert!(outcome.record_id.as_str().starts_with("diary-"));
        let diaries = outcome.diaries.expect("reloaded");
        assert_eq!(diaries.entries.len(), 1);
        let entry = &diaries.entries[0];
        assert_eq!(entry.title, "Day 1");
        assert_eq!(entry.content, "Felt okay");
        assert_eq!(entry.mood, 7);
        assert_eq!(entry.public_value2, 0);
        assert!(!entry.is_verified);

        assert_eq!(steps.first(), Some(&FlowProgress::Encrypting));
        assert!(steps
            .iter()
            .any(|s| matches!(s, FlowProgress::AwaitingConfirmation { .. })));
        assert_eq!(h.fhe.encrypt_calls(), 1);
    }

    #[test]
    fn test_requires_wallet() {
        let h = harness();
        h.fhe.set_ready();

        let err = h
            .service
            .create_diary(&draft(), &mut |_| {})
            .expect_err("must fail");
        assert!(matches!(err, DiaryError::WalletNotConnected));
        assert_eq!(err.to_string(), "Please connect wallet first");
        assert_eq!(h.fhe.encrypt_calls(), 0);
    }

    #[test]
    fn test_requires_fhe() {
        let h = harness();
        h.connect_wallet();

        let err = h
            .service
            .create_diary(&draft(), &mut |_| {})
            .expect_err("must fail");
        assert!(matches!(err, DiaryError::FheNotReady));
        assert_eq!(h.contract.create_calls(), 0);
    }

    #[test]
    fn test_user_rejection() {
        let h = harness();
        h.connect_ready();
        h.contract.reject_next_write();

        let err = h
            .service
            .create_diary(&draft(), &mut |_| {})
            .expect_err("must fail");
        assert_eq!(err.to_string(), "Transaction rejected");
        assert!(h.contract.is_empty());
    }

    #[test]
    fn test_revert_carries_cause() {
        let h = harness();
        h.connect_ready();
        h.contract
            .fail_next_wait(ContractError::Revert("out of gas".into()));

        let err = h
            .service
            .create_diary(&draft(), &mut |_| {})
            .expect_err("must fail");
        assert_eq!(err.to_string(), "Creation failed: execution reverted: out of gas");
    }

    #[test]
    fn test_consecutive_creates_get_distinct_ids() {
        let h = harness();
        h.connect_ready();

        let a = h.service.create_diary(&draft(), &mut |_| {}).expect("a");
        let b = h.service.create_diary(&draft(), &mut |_| {}).expect("b");
        assert_ne!(a.record_id, b.record_id);
        assert_eq!(b.diaries.expect("reloaded").entries.len(), 2);
    }
}
