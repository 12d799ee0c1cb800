//! New diary entry form.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::application::{ComposeField, ComposeForm, ControllerState};
use crate::tui::styles::DiaryTheme;

/// Render the create form.
pub fn render_compose(f: &mut Frame, area: Rect, state: &ControllerState) {
    let form = state.form();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Header
            Constraint::Length(3), // Title
            Constraint::Min(5),    // Content
            Constraint::Length(3), // Mood
            Constraint::Length(2), // Progress
        ])
        .margin(1)
        .split(area);

    let header = Paragraph::new(Line::from(vec![
        Span::styled("New Diary Entry", DiaryTheme::title()),
        Span::styled(" │ mood is encrypted on submit", DiaryTheme::text_dim()),
    ]));
    f.render_widget(header, chunks[0]);

    render_field(f, chunks[1], form, ComposeField::Title, "Title", "What happened today?");
    render_field(
        f,
        chunks[2],
        form,
        ComposeField::Content,
        "Content",
        "Write your thoughts...",
    );
    render_field(f, chunks[3], form, ComposeField::Mood, "Mood (1-10)", "1 = low, 10 = great");

    let progress = if state.is_encrypting() {
        Span::styled("Encrypting mood...", DiaryTheme::cipher())
    } else if state.is_creating() {
        Span::styled("Submitting...", DiaryTheme::text_dim())
    } else {
        Span::raw("")
    };
    f.render_widget(Paragraph::new(Line::from(progress)), chunks[4]);
}

fn render_field(
    f: &mut Frame,
    area: Rect,
    form: &ComposeForm,
    field: ComposeField,
    label: &str,
    hint: &str,
) {
    let focused = form.focus() == field;
    let value = match field {
        ComposeField::Title => form.title(),
        ComposeField::Content => form.content(),
        ComposeField::Mood => form.mood(),
    };

    let (border, title_style) = if focused {
        (DiaryTheme::border_focused(), DiaryTheme::focused())
    } else {
        (DiaryTheme::border(), DiaryTheme::text_dim())
    };

    let mut spans = vec![Span::raw(" ")];
    if value.is_empty() {
        spans.push(Span::styled(hint.to_string(), DiaryTheme::text_faint()));
    } else {
        spans.push(Span::styled(value.to_string(), DiaryTheme::text()));
    }
    if focused {
        spans.push(Span::styled("▌", DiaryTheme::focused()));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(Span::styled(format!(" {label} "), title_style))
                .borders(Borders::ALL)
                .border_style(border),
        );
    f.render_widget(paragraph, area);
}
