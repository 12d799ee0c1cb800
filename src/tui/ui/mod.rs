//! UI module: View components for the TUI.

pub mod compose;
pub mod detail;
pub mod diary_list;
pub mod gate;

use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::application::ControllerState;
use crate::tui::styles::{DiaryTheme, LOGO_SMALL};

/// Header bar: app name and the connected account.
pub fn render_header(f: &mut Frame, area: Rect, state: &ControllerState) {
    let account = match state.account() {
        Some(account) => Span::styled(format!(" {} ", account.short()), DiaryTheme::header()),
        None => Span::styled(" not connected ", DiaryTheme::header()),
    };

    let line = Line::from(vec![
        Span::styled(format!(" {LOGO_SMALL} "), DiaryTheme::header()),
        Span::styled("│", DiaryTheme::header()),
        account,
    ]);

    f.render_widget(Paragraph::new(line).style(DiaryTheme::header()), area);
}

/// Footer: the transaction-status slot, or key hints when it is empty.
pub fn render_status_bar(
    f: &mut Frame,
    area: Rect,
    state: &ControllerState,
    hints: &[(&str, &str)],
) {
    let line = match state.status() {
        Some(status) => Line::from(vec![Span::styled(
            status.message.clone(),
            DiaryTheme::status(status.kind),
        )]),
        None => Line::from(
            hints
                .iter()
                .flat_map(|(key, desc)| {
                    [
                        Span::styled(format!("[{key}] "), DiaryTheme::key_hint()),
                        Span::styled(format!("{desc}  "), DiaryTheme::key_desc()),
                    ]
                })
                .collect::<Vec<_>>(),
        ),
    };

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(DiaryTheme::border());

    f.render_widget(
        Paragraph::new(line).block(block).alignment(Alignment::Left),
        area,
    );
}
