//! Domain layer: Core diary types.
//!
//! Pure Rust types with no knowledge of the chain, the FHE library or the UI.

mod crypto;
mod entry;

pub use crypto::{
    decode_clear_values, decryption_proof_message, encode_clear_values, input_proof_message,
    Address, CryptoError, EncryptedInput, Handle, ABI_WORD,
};
pub use entry::{
    DiaryDraft, DiaryEntry, DiaryStats, DraftError, RecordId, RecordIdGenerator, MOOD_MAX,
    MOOD_MIN, RECENT_WINDOW_SECS, RECORD_PREFIX,
};

pub(crate) use entry::unix_millis;

#[cfg(test)]
pub(crate) use entry::sample_entry;
