//! Full-screen views shown before the diary list is available.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::application::{ControllerState, FheStatus, ViewMode};
use crate::tui::styles::DiaryTheme;

pub fn render_gate(f: &mut Frame, area: Rect, state: &ControllerState) {
    let lines = match state.view_mode() {
        ViewMode::Disconnected => vec![
            Line::from(Span::styled("Encrypted Mood Diary", DiaryTheme::title())),
            Line::from(""),
            Line::from(Span::styled(
                "Your mood is encrypted before it leaves this machine.",
                DiaryTheme::text_dim(),
            )),
            Line::from(Span::styled(
                "Connect your wallet to view your encrypted diary.",
                DiaryTheme::text_dim(),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("[C] ", DiaryTheme::key_hint()),
                Span::styled("Connect wallet", DiaryTheme::key_desc()),
            ]),
        ],
        ViewMode::Initializing if state.fhe_status() == FheStatus::Failed => vec![
            Line::from(Span::styled("FHEVM initialization failed", DiaryTheme::error())),
            Line::from(""),
            Line::from(vec![
                Span::styled("[C] ", DiaryTheme::key_hint()),
                Span::styled("Retry  ", DiaryTheme::key_desc()),
                Span::styled("[X] ", DiaryTheme::key_hint()),
                Span::styled("Disconnect", DiaryTheme::key_desc()),
            ]),
        ],
        ViewMode::Initializing => vec![
            Line::from(Span::styled("Initializing FHE...", DiaryTheme::subtitle())),
            Line::from(""),
            Line::from(Span::styled(
                "Generating encryption keys. This can take a while.",
                DiaryTheme::text_faint(),
            )),
        ],
        ViewMode::Loading => vec![Line::from(Span::styled(
            "Loading diaries...",
            DiaryTheme::subtitle(),
        ))],
        ViewMode::Ready => Vec::new(),
    };

    let height = u16::try_from(lines.len()).unwrap_or(u16::MAX).saturating_add(2);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    let card = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(DiaryTheme::border_focused()),
        );

    f.render_widget(card, rows[1]);
}
