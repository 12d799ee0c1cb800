//! Data loader: fetches every diary record and derives statistics.

use std::collections::HashSet;

use crate::domain::{unix_millis, DiaryEntry, DiaryStats, RecordId};
use crate::ports::{BusinessData, ContractReader, ContractWriter, FheSdk};
use crate::DiaryError;

use super::service::{DiaryService, LoadedDiaries};

fn entry_from(record_id: RecordId, data: BusinessData, id: u64) -> DiaryEntry {
    DiaryEntry {
        id,
        record_id,
        title: data.name,
        content: data.description,
        mood: data.public_value1,
        date: data.timestamp,
        creator: data.creator,
        public_value1: data.public_value1,
        public_value2: data.public_value2,
        is_verified: data.is_verified,
        decrypted_value: data.decrypted_value,
    }
}

impl<R, W, F> DiaryService<R, W, F>
where
    R: ContractReader,
    W: ContractWriter + 'static,
    F: FheSdk,
{
    /// Load the complete diary list.
    ///
    /// Records that fail to load are logged and skipped.
    ///
    /// # Errors
    /// Returns `DiaryError::Load` if the identifier list cannot be fetched.
    pub fn load_diaries(&self) -> Result<LoadedDiaries, DiaryError> {
        self.load_diaries_at(chrono::Utc::now().timestamp())
    }

    /// Load the diary list, computing recency relative to `now_secs`.
    ///
    /// # Errors
    /// Returns `DiaryError::Load` if the identifier list cannot be fetched.
    pub fn load_diaries_at(&self, now_secs: i64) -> Result<LoadedDiaries, DiaryError> {
        let ids = self.reader.get_all_business_ids().map_err(|e| {
            tracing::error!("Failed to fetch diary ids: {e}");
            DiaryError::Load(e)
        })?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.reader.get_business_data(&id) {
                Ok(data) => records.push((id, data)),
                Err(e) => tracing::warn!("Skipping diary {id}: {e}"),
            }
        }

        // Identifiers outside `diary-<n>` get numbers no other record uses.
        let mut taken: HashSet<u64> = records.iter().filter_map(|(id, _)| id.numeric()).collect();
        let mut next_fallback = unix_millis();
        let mut entries = Vec::with_capacity(records.len());
        for (id, data) in records {
            let numeric = match id.numeric() {
                Some(n) => n,
                None => {
                    while !taken.insert(next_fallback) {
                        next_fallback += 1;
                    }
                    next_fallback
                }
            };
            entries.push(entry_from(id, data, numeric));
        }

        let stats = DiaryStats::compute(&entries, now_secs);
        tracing::debug!(
            "Loaded {} diaries ({} verified)",
            stats.total_entries,
            stats.verified_entries
        );

        Ok(LoadedDiaries { entries, stats })
    }
}
