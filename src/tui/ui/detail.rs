//! Detail pane for one diary entry.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::application::ControllerState;
use crate::domain::DiaryEntry;
use crate::tui::styles::DiaryTheme;

pub fn render_detail(f: &mut Frame, area: Rect, state: &ControllerState) {
    let Some(entry) = state.selected() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(3),    // Content
            Constraint::Length(6), // Encrypted data
        ])
        .margin(1)
        .split(area);

    let date = entry
        .created_at()
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_default();
    let title = Paragraph::new(vec![
        Line::from(Span::styled(entry.title.clone(), DiaryTheme::title())),
        Line::from(vec![
            Span::styled(date, DiaryTheme::text_faint()),
            Span::styled(format!("  by {}", entry.creator.short()), DiaryTheme::text_faint()),
        ]),
    ]);
    f.render_widget(title, chunks[0]);

    let content = Paragraph::new(entry.content.clone())
        .style(DiaryTheme::text())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(DiaryTheme::border()),
        );
    f.render_widget(content, chunks[1]);

    render_encrypted(f, chunks[2], entry, state);
}

fn render_encrypted(f: &mut Frame, area: Rect, entry: &DiaryEntry, state: &ControllerState) {
    let value_line = match state.decrypted_value() {
        Some(value) => Line::from(vec![
            Span::styled("Decrypted mood: ", DiaryTheme::text_dim()),
            Span::styled(value.to_string(), DiaryTheme::cipher()),
            Span::styled(" (on-chain verified)", DiaryTheme::success()),
        ]),
        None if state.is_decrypting() => Line::from(Span::styled(
            "Decrypting...",
            DiaryTheme::cipher(),
        )),
        None => Line::from(vec![
            Span::styled("Encrypted mood: ", DiaryTheme::text_dim()),
            Span::styled("🔒 ********", DiaryTheme::cipher()),
        ]),
    };

    let verification = if entry.is_verified {
        Span::styled("✓ Verified", DiaryTheme::success())
    } else {
        Span::styled("Not yet verified", DiaryTheme::text_faint())
    };

    let action = if state.decrypted_value().is_some() {
        "Hide"
    } else if entry.is_verified {
        "Show"
    } else {
        "Decrypt & verify"
    };

    let lines = vec![
        value_line,
        Line::from(vec![
            Span::styled(format!("Public mood: {}  ", entry.public_value1), DiaryTheme::text_dim()),
            verification,
        ]),
        Line::from(vec![
            Span::styled("[D] ", DiaryTheme::key_hint()),
            Span::styled(action, DiaryTheme::key_desc()),
        ]),
    ];

    let block = Block::default()
        .title(Span::styled(" Encrypted Data ", DiaryTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(DiaryTheme::border_focused());
    f.render_widget(Paragraph::new(lines).block(block), area);
}
