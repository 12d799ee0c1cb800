//! Controller state: everything the views render, changed only through
//! named transitions.
//!
//! Flows run elsewhere (see `DiaryService`); their results are applied here.

use std::time::{Duration, Instant};

use zeroize::Zeroize;

use crate::domain::{Address, DiaryDraft, DiaryEntry, DiaryStats, DraftError, RecordId};
use crate::DiaryError;

use super::service::{FlowProgress, LoadedDiaries};
use super::{CreateOutcome, DecryptOutcome};

/// How long a success status stays visible.
pub const SUCCESS_DISPLAY: Duration = Duration::from_secs(2);

/// How long an error status stays visible.
pub const ERROR_DISPLAY: Duration = Duration::from_secs(3);

pub const MSG_CREATING: &str = "Creating encrypted diary entry...";
pub const MSG_CONFIRMING: &str = "Waiting for transaction confirmation...";
pub const MSG_CREATED: &str = "Diary created successfully!";
pub const MSG_VERIFYING: &str = "Verifying decryption...";
pub const MSG_VERIFIED: &str = "Data verified successfully!";
pub const MSG_ALREADY_VERIFIED: &str = "Data already verified";
pub const MSG_CONCURRENTLY_VERIFIED: &str = "Data is already verified";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Pending,
    Success,
    Error,
}

/// The single transaction-status slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionStatus {
    pub kind: StatusKind,
    pub message: String,
    /// `None` for pending statuses, which persist until overwritten
    pub expires_at: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FheStatus {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

/// Mutually exclusive top-level views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Disconnected,
    Initializing,
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComposeField {
    #[default]
    Title,
    Content,
    Mood,
}

/// Create-form buffers.
#[derive(Debug, Default)]
pub struct ComposeForm {
    title: String,
    content: String,
    mood: String,
    focus: ComposeField,
}

impl ComposeForm {
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn mood(&self) -> &str {
        &self.mood
    }

    #[must_use]
    pub fn focus(&self) -> ComposeField {
        self.focus
    }

    pub fn next_field(&mut self) {
        self.focus = match self.focus {
            ComposeField::Title => ComposeField::Content,
            ComposeField::Content => ComposeField::Mood,
            ComposeField::Mood => ComposeField::Title,
        };
    }

    pub fn prev_field(&mut self) {
        self.focus = match self.focus {
            ComposeField::Title => ComposeField::Mood,
            ComposeField::Content => ComposeField::Title,
            ComposeField::Mood => ComposeField::Content,
        };
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            ComposeField::Title => &mut self.title,
            ComposeField::Content => &mut self.content,
            ComposeField::Mood => &mut self.mood,
        }
    }

    /// Add a character to the focused field. The mood field takes digits only.
    pub fn input_char(&mut self, c: char) {
        if self.focus == ComposeField::Mood && !c.is_ascii_digit() {
            return;
        }
        self.focused_mut().push(c);
    }

    pub fn delete_char(&mut self) {
        self.focused_mut().pop();
    }

    /// Validate the buffers.
    ///
    /// # Errors
    /// Returns the first failing validation rule.
    pub fn draft(&self) -> Result<DiaryDraft, DraftError> {
        DiaryDraft::parse(&self.title, &self.content, &self.mood)
    }

    /// Wipe all buffers from memory.
    pub fn clear_sensitive(&mut self) {
        self.title.zeroize();
        self.content.zeroize();
        self.mood.zeroize();
        self.focus = ComposeField::Title;
    }
}

/// Diary controller state.
#[derive(Debug, Default)]
pub struct ControllerState {
    connected: bool,
    account: Option<Address>,
    fhe: FheStatus,
    loading: bool,
    refreshing: bool,
    creating: bool,
    encrypting: bool,
    decrypting: Option<RecordId>,
    diaries: Vec<DiaryEntry>,
    stats: DiaryStats,
    cursor: usize,
    selected: Option<RecordId>,
    decrypted: Option<(RecordId, u32)>,
    search: String,
    show_create: bool,
    form: ComposeForm,
    status: Option<TransactionStatus>,
}

impl ControllerState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current top-level view.
    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        if !self.connected {
            ViewMode::Disconnected
        } else if self.fhe != FheStatus::Ready {
            ViewMode::Initializing
        } else if self.loading {
            ViewMode::Loading
        } else {
            ViewMode::Ready
        }
    }

    // Accessors

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[must_use]
    pub fn account(&self) -> Option<Address> {
        self.account
    }

    #[must_use]
    pub fn fhe_status(&self) -> FheStatus {
        self.fhe
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    #[must_use]
    pub fn is_creating(&self) -> bool {
        self.creating
    }

    #[must_use]
    pub fn is_encrypting(&self) -> bool {
        self.encrypting
    }

    #[must_use]
    pub fn is_decrypting(&self) -> bool {
        self.decrypting.is_some()
    }

    /// Whether a collaborator call is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.refreshing
            || self.creating
            || self.decrypting.is_some()
            || self.fhe == FheStatus::Initializing
    }

    #[must_use]
    pub fn diaries(&self) -> &[DiaryEntry] {
        &self.diaries
    }

    #[must_use]
    pub fn stats(&self) -> &DiaryStats {
        &self.stats
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Entries matching the search term, in load order.
    #[must_use]
    pub fn visible_entries(&self) -> Vec<&DiaryEntry> {
        let term = self.search.trim();
        self.diaries.iter().filter(|e| e.matches(term)).collect()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Entry shown in the detail pane.
    #[must_use]
    pub fn selected(&self) -> Option<&DiaryEntry> {
        let id = self.selected.as_ref()?;
        self.diaries.iter().find(|e| &e.record_id == id)
    }

    /// Decrypted value for the entry in the detail pane.
    #[must_use]
    pub fn decrypted_value(&self) -> Option<u32> {
        match (&self.decrypted, &self.selected) {
            (Some((id, value)), Some(selected)) if id == selected => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn show_create(&self) -> bool {
        self.show_create
    }

    #[must_use]
    pub fn form(&self) -> &ComposeForm {
        &self.form
    }

    #[must_use]
    pub fn status(&self) -> Option<&TransactionStatus> {
        self.status.as_ref()
    }

    // Status slot

    fn set_status(&mut self, kind: StatusKind, message: impl Into<String>, now: Instant) {
        let expires_at = match kind {
            StatusKind::Pending => None,
            StatusKind::Success => Some(now + SUCCESS_DISPLAY),
            StatusKind::Error => Some(now + ERROR_DISPLAY),
        };
        self.status = Some(TransactionStatus {
            kind,
            message: message.into(),
            expires_at,
        });
    }

    /// Show an error in the status slot.
    pub fn report_error(&mut self, err: &DiaryError, now: Instant) {
        self.set_status(StatusKind::Error, err.to_string(), now);
    }

    /// Clear an expired status.
    pub fn tick(&mut self, now: Instant) {
        let expired = self
            .status
            .as_ref()
            .and_then(|s| s.expires_at)
            .is_some_and(|at| at <= now);
        if expired {
            self.status = None;
        }
    }

    fn refuse_if_busy(&mut self, now: Instant) -> bool {
        if self.is_busy() {
            self.report_error(&DiaryError::Busy, now);
            return true;
        }
        false
    }

    fn apply(&mut self, loaded: LoadedDiaries) {
        self.diaries = loaded.entries;
        self.stats = loaded.stats;

        let visible = self.visible_entries().len();
        self.cursor = self.cursor.min(visible.saturating_sub(1));
        if self.selected().is_none() {
            self.selected = None;
            self.decrypted = None;
        }
    }

    // Connection

    /// Wallet connected; the initial load is pending.
    pub fn connect(&mut self, account: Address) {
        self.connected = true;
        self.account = Some(account);
        self.loading = true;
    }

    /// Wallet disconnected; all session state is dropped.
    pub fn disconnect(&mut self) {
        self.form.clear_sensitive();
        *self = Self::default();
    }

    // FHE initialization

    /// Begin FHE initialization. Returns `false` if not connected or
    /// initialization is already running or done.
    pub fn start_fhe_init(&mut self) -> bool {
        if !self.connected || matches!(self.fhe, FheStatus::Initializing | FheStatus::Ready) {
            return false;
        }
        self.fhe = FheStatus::Initializing;
        true
    }

    pub fn finish_fhe_init(&mut self) {
        if self.connected {
            self.fhe = FheStatus::Ready;
        }
    }

    pub fn fail_fhe_init(&mut self, err: &DiaryError, now: Instant) {
        if !self.connected {
            return;
        }
        self.fhe = FheStatus::Failed;
        self.report_error(err, now);
    }

    // Loading

    /// Begin a refresh. Returns `false` if one is already running.
    pub fn start_refresh(&mut self) -> bool {
        if self.refreshing || !self.connected {
            return false;
        }
        self.refreshing = true;
        true
    }

    pub fn finish_refresh(&mut self, loaded: LoadedDiaries) {
        self.refreshing = false;
        if !self.connected {
            return;
        }
        self.loading = false;
        self.apply(loaded);
    }

    /// The previous list stays in place.
    pub fn fail_refresh(&mut self, err: &DiaryError, now: Instant) {
        self.refreshing = false;
        if !self.connected {
            return;
        }
        self.loading = false;
        self.report_error(err, now);
    }

    // Create

    pub fn open_compose(&mut self) {
        self.show_create = true;
    }

    /// Close the form and wipe its buffers.
    pub fn close_compose(&mut self) {
        self.show_create = false;
        self.form.clear_sensitive();
    }

    pub fn form_input(&mut self, c: char) {
        self.form.input_char(c);
    }

    pub fn form_backspace(&mut self) {
        self.form.delete_char();
    }

    pub fn form_next_field(&mut self) {
        self.form.next_field();
    }

    pub fn form_prev_field(&mut self) {
        self.form.prev_field();
    }

    /// Validate the form and begin creation.
    ///
    /// Returns `None` (with an error status) if not connected, busy, or the
    /// form is invalid.
    pub fn start_create(&mut self, now: Instant) -> Option<DiaryDraft> {
        if !self.connected {
            self.report_error(&DiaryError::WalletNotConnected, now);
            return None;
        }
        if self.refuse_if_busy(now) {
            return None;
        }
        let draft = match self.form.draft() {
            Ok(draft) => draft,
            Err(e) => {
                self.report_error(&DiaryError::InvalidDraft(e), now);
                return None;
            }
        };

        self.creating = true;
        self.set_status(StatusKind::Pending, MSG_CREATING, now);
        Some(draft)
    }

    /// Apply flow progress to the status slot.
    pub fn progress(&mut self, progress: &FlowProgress, now: Instant) {
        if !self.connected {
            return;
        }
        match progress {
            FlowProgress::Encrypting => self.encrypting = true,
            FlowProgress::Submitting => self.encrypting = false,
            FlowProgress::AwaitingConfirmation { .. } => {
                self.encrypting = false;
                self.set_status(StatusKind::Pending, MSG_CONFIRMING, now);
            }
            FlowProgress::VerifyingDecryption => {
                self.set_status(StatusKind::Pending, MSG_VERIFYING, now);
            }
            FlowProgress::Reloading => {}
        }
    }

    pub fn finish_create(&mut self, outcome: CreateOutcome, now: Instant) {
        self.creating = false;
        self.encrypting = false;
        if !self.connected {
            return;
        }
        if let Some(loaded) = outcome.diaries {
            self.apply(loaded);
        }
        self.close_compose();
        self.set_status(StatusKind::Success, MSG_CREATED, now);
    }

    /// The form stays open with its buffers.
    pub fn fail_create(&mut self, err: &DiaryError, now: Instant) {
        self.creating = false;
        self.encrypting = false;
        if !self.connected {
            return;
        }
        self.report_error(err, now);
    }

    // Decrypt

    /// Decrypt/hide toggle for the detail pane.
    ///
    /// Hides a shown value without any call; otherwise begins decryption of
    /// the selected entry and returns its identifier.
    pub fn start_decrypt(&mut self, now: Instant) -> Option<RecordId> {
        if self.decrypted_value().is_some() {
            self.decrypted = None;
            return None;
        }
        if !self.connected {
            self.report_error(&DiaryError::WalletNotConnected, now);
            return None;
        }
        if self.refuse_if_busy(now) {
            return None;
        }
        let record_id = self.selected()?.record_id.clone();

        self.decrypting = Some(record_id.clone());
        self.set_status(StatusKind::Pending, MSG_VERIFYING, now);
        Some(record_id)
    }

    pub fn finish_decrypt(&mut self, outcome: DecryptOutcome, now: Instant) {
        let Some(id) = self.decrypting.take() else {
            return;
        };
        if !self.connected {
            return;
        }
        match outcome {
            DecryptOutcome::AlreadyVerified { value } => {
                self.decrypted = Some((id, value));
                self.set_status(StatusKind::Success, MSG_ALREADY_VERIFIED, now);
            }
            DecryptOutcome::Verified { value, diaries } => {
                if let Some(loaded) = diaries {
                    self.apply(loaded);
                }
                self.decrypted = Some((id, value));
                self.set_status(StatusKind::Success, MSG_VERIFIED, now);
            }
            DecryptOutcome::ConcurrentlyVerified { diaries } => {
                if let Some(loaded) = diaries {
                    self.apply(loaded);
                }
                self.set_status(StatusKind::Success, MSG_CONCURRENTLY_VERIFIED, now);
            }
        }
    }

    pub fn fail_decrypt(&mut self, err: &DiaryError, now: Instant) {
        self.decrypting = None;
        if !self.connected {
            return;
        }
        self.report_error(err, now);
    }

    // Selection and search

    /// Move the list cursor by `delta`, clamped to the visible entries.
    pub fn move_cursor(&mut self, delta: isize) {
        let visible = self.visible_entries().len();
        if visible == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = self
            .cursor
            .saturating_add_signed(delta)
            .min(visible - 1);
    }

    /// Open the detail pane for the entry under the cursor.
    pub fn select(&mut self) {
        let id = self
            .visible_entries()
            .get(self.cursor)
            .map(|e| e.record_id.clone());
        if id.is_some() && id != self.selected {
            self.decrypted = None;
        }
        self.selected = id;
    }

    pub fn close_detail(&mut self) {
        self.selected = None;
        self.decrypted = None;
    }

    pub fn search_input(&mut self, c: char) {
        self.search.push(c);
        self.cursor = 0;
    }

    pub fn search_backspace(&mut self) {
        self.search.pop();
        self.cursor = 0;
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
        self.cursor = 0;
    }
}
