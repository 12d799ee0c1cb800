//! Diary records and the statistics derived from them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::Address;

/// Prefix of every on-chain diary identifier.
pub const RECORD_PREFIX: &str = "diary-";

/// Window (seconds) for an entry to count as recent.
pub const RECENT_WINDOW_SECS: i64 = 60 * 60 * 24 * 7;

/// Lowest accepted mood.
pub const MOOD_MIN: u32 = 1;

/// Highest accepted mood.
pub const MOOD_MAX: u32 = 10;

/// On-chain identifier of a diary record (`"diary-<n>"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Identifier for a numeric diary id.
    #[must_use]
    pub fn from_numeric(id: u64) -> Self {
        Self(format!("{RECORD_PREFIX}{id}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric suffix, if the identifier is exactly `diary-<n>`.
    ///
    /// Non-canonical spellings such as `diary-007` or `diary-+7` yield `None`,
    /// so two distinct identifiers never share a number.
    #[must_use]
    pub fn numeric(&self) -> Option<u64> {
        let digits = self.0.strip_prefix(RECORD_PREFIX)?;
        let canonical = !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && (digits == "0" || !digits.starts_with('0'));
        if !canonical {
            return None;
        }
        digits.parse().ok()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues `diary-<millis>` identifiers that never repeat within a process.
///
/// Two requests inside the same millisecond get consecutive values.
#[derive(Debug, Default)]
pub struct RecordIdGenerator {
    last: AtomicU64,
}

impl RecordIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next identifier, using the wall clock.
    pub fn next_id(&self) -> RecordId {
        self.next_at(unix_millis())
    }

    /// Next identifier for an explicit clock reading.
    pub fn next_at(&self, now_millis: u64) -> RecordId {
        let mut issued = now_millis;
        // fetch_update only fails if the closure returns None, which it never does.
        let _ = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                issued = now_millis.max(last.saturating_add(1));
                Some(issued)
            });
        RecordId::from_numeric(issued)
    }
}

pub(crate) fn unix_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

/// One user-authored diary record as seen by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    /// Numeric id, unique within a loaded list
    pub id: u64,

    /// Full on-chain identifier
    pub record_id: RecordId,

    pub title: String,
    pub content: String,

    /// Public mirror of the encrypted mood; unverified until `is_verified`
    pub mood: u32,

    /// Creation time (unix seconds)
    pub date: i64,

    pub creator: Address,
    pub public_value1: u32,
    pub public_value2: u32,

    /// Set once the on-chain verification transaction succeeded
    pub is_verified: bool,

    /// Proven plaintext, meaningful only when `is_verified`
    pub decrypted_value: u32,
}

impl DiaryEntry {
    /// Whether the entry matches a search term (title or content, case-insensitive).
    #[must_use]
    pub fn matches(&self, term: &str) -> bool {
        if term.is_empty() {
            return true;
        }
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term) || self.content.to_lowercase().contains(&term)
    }

    /// Creation time as a UTC timestamp, for display.
    #[must_use]
    pub fn created_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.date, 0)
    }
}

/// Aggregate statistics over the loaded diary list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DiaryStats {
    pub total_entries: usize,
    pub verified_entries: usize,
    pub avg_mood: f64,
    pub recent_entries: usize,
}

impl DiaryStats {
    /// Compute statistics for `entries` relative to `now_secs`.
    #[must_use]
    pub fn compute(entries: &[DiaryEntry], now_secs: i64) -> Self {
        let total_entries = entries.len();
        let verified_entries = entries.iter().filter(|e| e.is_verified).count();
        let avg_mood = if total_entries > 0 {
            entries.iter().map(|e| f64::from(e.mood)).sum::<f64>() / total_entries as f64
        } else {
            0.0
        };
        let recent_entries = entries
            .iter()
            .filter(|e| now_secs - e.date < RECENT_WINDOW_SECS)
            .count();

        Self {
            total_entries,
            verified_entries,
            avg_mood,
            recent_entries,
        }
    }
}

/// Reasons a create-form submission is refused before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("Title is required")]
    EmptyTitle,

    #[error("Content is required")]
    EmptyContent,

    #[error("Mood is required")]
    MissingMood,

    #[error("Mood must be between {MOOD_MIN} and {MOOD_MAX}")]
    MoodOutOfRange,
}

/// A validated create-form payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiaryDraft {
    title: String,
    content: String,
    mood: u32,
}

impl DiaryDraft {
    /// Validate raw form input.
    ///
    /// Non-digit characters in the mood buffer are ignored.
    ///
    /// # Errors
    /// Returns the first failing rule.
    pub fn parse(title: &str, content: &str, mood: &str) -> Result<Self, DraftError> {
        let title = title.trim();
        let content = content.trim();
        if title.is_empty() {
            return Err(DraftError::EmptyTitle);
        }
        if content.is_empty() {
            return Err(DraftError::EmptyContent);
        }

        let digits: String = mood.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(DraftError::MissingMood);
        }
        let mood: u32 = digits.parse().map_err(|_| DraftError::MoodOutOfRange)?;
        if !(MOOD_MIN..=MOOD_MAX).contains(&mood) {
            return Err(DraftError::MoodOutOfRange);
        }

        Ok(Self {
            title: title.to_string(),
            content: content.to_string(),
            mood,
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn mood(&self) -> u32 {
        self.mood
    }
}

#[cfg(test)]
pub(crate) fn sample_entry(id: u64, mood: u32, date: i64, verified: bool) -> DiaryEntry {
    DiaryEntry {
        id,
        record_id: RecordId::from_numeric(id),
        title: format!("Entry {id}"),
        content: "Felt okay".to_string(),
        mood,
        date,
        creator: Address::derive(b"alice"),
        public_value1: mood,
        public_value2: 0,
        is_verified: verified,
        decrypted_value: if verified { mood } else { 0 },
    }
}
