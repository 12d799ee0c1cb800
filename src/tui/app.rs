//! Main TUI application loop.
//!
//! Handles:
//! - Input event handling per view
//! - Wallet connect/disconnect
//! - Diary flows via the background worker

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::{LedgerSigner, LocalWallet, SqliteLedger, TfheCoprocessor};
use crate::application::{ControllerState, DiaryService, ViewMode};
use crate::DiaryError;

use super::ui::{
    compose::render_compose, detail::render_detail, diary_list::render_diary_list,
    gate::render_gate, render_header, render_status_bar,
};
use super::worker::{FlowJob, FlowWorker, FlowWorkerHandle, WorkerMessage};

/// Diary service wired to the local devnet.
pub type DevnetService = DiaryService<SqliteLedger, LedgerSigner<LocalWallet>, TfheCoprocessor>;

/// Screen inside the ready view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    List,
    Compose,
    Detail,
}

/// Main application state
pub struct App {
    service: Arc<DevnetService>,
    state: ControllerState,
    worker: Option<FlowWorkerHandle>,
    /// Search bar has input focus
    searching: bool,
    should_quit: bool,
}

impl App {
    /// Create application with injected dependencies (Composition Root pattern).
    #[must_use]
    pub fn with_dependencies(service: Arc<DevnetService>) -> Self {
        Self {
            service,
            state: ControllerState::new(),
            worker: None,
            searching: false,
            should_quit: false,
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn screen(&self) -> Screen {
        if self.state.show_create() {
            Screen::Compose
        } else if self.state.selected().is_some() {
            Screen::Detail
        } else {
            Screen::List
        }
    }

    fn hints(&self) -> &'static [(&'static str, &'static str)] {
        match self.state.view_mode() {
            ViewMode::Disconnected => &[("C", "Connect"), ("Q", "Quit")],
            ViewMode::Initializing | ViewMode::Loading => &[("X", "Disconnect"), ("Q", "Quit")],
            ViewMode::Ready => match self.screen() {
                Screen::List if self.searching => &[("Enter", "Done"), ("Esc", "Clear")],
                Screen::List => &[
                    ("↑↓", "Move"),
                    ("Enter", "Open"),
                    ("N", "New"),
                    ("/", "Search"),
                    ("R", "Refresh"),
                    ("X", "Disconnect"),
                    ("Q", "Quit"),
                ],
                Screen::Compose => &[
                    ("Tab", "Next field"),
                    ("Enter", "Create"),
                    ("Esc", "Cancel"),
                ],
                Screen::Detail => &[("D", "Decrypt/Hide"), ("Esc", "Back")],
            },
        }
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            self.poll_worker();
            self.state.tick(Instant::now());

            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(1),
                        Constraint::Min(0),
                        Constraint::Length(2),
                    ])
                    .split(f.area());

                render_header(f, chunks[0], &self.state);
                match self.state.view_mode() {
                    ViewMode::Ready => match self.screen() {
                        Screen::List => {
                            render_diary_list(f, chunks[1], &self.state, self.searching);
                        }
                        Screen::Compose => render_compose(f, chunks[1], &self.state),
                        Screen::Detail => render_detail(f, chunks[1], &self.state),
                    },
                    _ => render_gate(f, chunks[1], &self.state),
                }
                render_status_bar(f, chunks[2], &self.state, self.hints());
            })?;

            // Short poll to stay responsive
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Apply every message the worker has sent so far.
    fn poll_worker(&mut self) {
        loop {
            let Some(message) = self.worker.as_ref().and_then(FlowWorkerHandle::try_recv) else {
                break;
            };
            self.apply(message);
        }

        if self.worker.as_ref().is_some_and(FlowWorkerHandle::is_finished) {
            // Catch anything sent between the drain and the exit check.
            while let Some(message) = self.worker.as_ref().and_then(FlowWorkerHandle::try_recv) {
                self.apply(message);
            }
            self.worker = None;
        }
    }

    fn apply(&mut self, message: WorkerMessage) {
        let now = Instant::now();
        match message {
            WorkerMessage::Progress(progress) => self.state.progress(&progress, now),
            WorkerMessage::FheReady => self.state.finish_fhe_init(),
            WorkerMessage::FheFailed(e) => self.state.fail_fhe_init(&e, now),
            WorkerMessage::Loaded(Ok(loaded)) => self.state.finish_refresh(loaded),
            WorkerMessage::Loaded(Err(e)) => self.state.fail_refresh(&e, now),
            WorkerMessage::Created(Ok(outcome)) => self.state.finish_create(outcome, now),
            WorkerMessage::Created(Err(e)) => self.state.fail_create(&e, now),
            WorkerMessage::Decrypted(Ok(outcome)) => self.state.finish_decrypt(outcome, now),
            WorkerMessage::Decrypted(Err(e)) => self.state.fail_decrypt(&e, now),
        }
    }

    /// At most one worker runs at a time.
    fn worker_idle(&mut self) -> bool {
        if self.worker.is_some() {
            self.state.report_error(&DiaryError::Busy, Instant::now());
            return false;
        }
        true
    }

    fn spawn(&mut self, job: FlowJob) {
        self.worker = Some(FlowWorker::spawn(Arc::clone(&self.service), job));
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            self.should_quit = true;
            return;
        }

        match self.state.view_mode() {
            ViewMode::Disconnected | ViewMode::Initializing | ViewMode::Loading => {
                self.handle_gate_key(key);
            }
            ViewMode::Ready => match self.screen() {
                Screen::List if self.searching => self.handle_search_key(key),
                Screen::List => self.handle_list_key(key),
                Screen::Compose => self.handle_compose_key(key),
                Screen::Detail => self.handle_detail_key(key),
            },
        }
    }

    fn handle_gate_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('c' | 'C') => self.connect(),
            KeyCode::Char('x' | 'X') => self.disconnect(),
            KeyCode::Char('q' | 'Q') => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_list_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up | KeyCode::Char('k') => self.state.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.state.move_cursor(1),
            KeyCode::Enter => self.state.select(),
            KeyCode::Char('n' | 'N') => self.state.open_compose(),
            KeyCode::Char('/') => self.searching = true,
            KeyCode::Char('r' | 'R') => self.refresh(),
            KeyCode::Char('x' | 'X') => self.disconnect(),
            KeyCode::Char('q' | 'Q') => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter => self.searching = false,
            KeyCode::Esc => {
                self.state.clear_search();
                self.searching = false;
            }
            KeyCode::Backspace => self.state.search_backspace(),
            KeyCode::Char(c) => self.state.search_input(c),
            _ => {}
        }
    }

    fn handle_compose_key(&mut self, key: KeyCode) {
        match key {
            // Leaving while a create is in flight keeps the buffers until it settles.
            KeyCode::Esc if !self.state.is_creating() => self.state.close_compose(),
            KeyCode::Tab | KeyCode::Down => self.state.form_next_field(),
            KeyCode::BackTab | KeyCode::Up => self.state.form_prev_field(),
            KeyCode::Enter => self.submit_create(),
            KeyCode::Backspace => self.state.form_backspace(),
            KeyCode::Char(c) => self.state.form_input(c),
            _ => {}
        }
    }

    fn handle_detail_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Backspace => self.state.close_detail(),
            KeyCode::Char('d' | 'D') => self.decrypt(),
            KeyCode::Char('q' | 'Q') => self.should_quit = true,
            _ => {}
        }
    }

    fn connect(&mut self) {
        if !self.worker_idle() {
            return;
        }

        if !self.state.is_connected() {
            let wallet = self.service.wallet();
            wallet.connect();
            let Some(account) = wallet.account() else {
                self.state
                    .report_error(&DiaryError::WalletNotConnected, Instant::now());
                return;
            };
            self.state.connect(account);
        }
        if self.state.start_fhe_init() {
            self.spawn(FlowJob::Connect);
        }
    }

    fn disconnect(&mut self) {
        if !self.state.is_connected() {
            return;
        }
        self.service.wallet().disconnect();
        self.state.disconnect();
        self.searching = false;
    }

    fn refresh(&mut self) {
        if self.worker_idle() && self.state.start_refresh() {
            self.spawn(FlowJob::Refresh);
        }
    }

    fn submit_create(&mut self) {
        if !self.worker_idle() {
            return;
        }
        if let Some(draft) = self.state.start_create(Instant::now()) {
            self.spawn(FlowJob::Create(draft));
        }
    }

    fn decrypt(&mut self) {
        // Hiding a shown value needs no worker.
        if self.state.decrypted_value().is_none() && !self.worker_idle() {
            return;
        }
        if let Some(record_id) = self.state.start_decrypt(Instant::now()) {
            self.spawn(FlowJob::Decrypt(record_id));
        }
    }
}
