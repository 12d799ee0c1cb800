//! Diary list with statistics and search.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::application::ControllerState;
use crate::domain::{DiaryEntry, DiaryStats};
use crate::tui::styles::DiaryTheme;

/// Render the stats header, search bar and entry list.
pub fn render_diary_list(f: &mut Frame, area: Rect, state: &ControllerState, searching: bool) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Stats
            Constraint::Length(3), // Search
            Constraint::Min(0),    // List
        ])
        .split(area);

    render_stats(f, chunks[0], state.stats());
    render_search(f, chunks[1], state.search(), searching);
    render_entries(f, chunks[2], state);
}

fn stat_card<'a>(label: &'a str, value: String) -> Paragraph<'a> {
    Paragraph::new(vec![
        Line::from(Span::styled(value, DiaryTheme::title())),
        Line::from(Span::styled(label, DiaryTheme::text_faint())),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(DiaryTheme::border()),
    )
}

fn render_stats(f: &mut Frame, area: Rect, stats: &DiaryStats) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    f.render_widget(stat_card("Total Entries", stats.total_entries.to_string()), cards[0]);
    f.render_widget(stat_card("Verified", stats.verified_entries.to_string()), cards[1]);
    f.render_widget(stat_card("Avg Mood", format!("{:.1}", stats.avg_mood)), cards[2]);
    f.render_widget(stat_card("This Week", stats.recent_entries.to_string()), cards[3]);
}

fn render_search(f: &mut Frame, area: Rect, term: &str, searching: bool) {
    let border = if searching {
        DiaryTheme::border_focused()
    } else {
        DiaryTheme::border()
    };
    let content = if term.is_empty() && !searching {
        Span::styled("Press / to search diaries...", DiaryTheme::text_faint())
    } else {
        Span::styled(term.to_string(), DiaryTheme::text())
    };

    let mut spans = vec![Span::raw(" "), content];
    if searching {
        spans.push(Span::styled("▌", DiaryTheme::focused()));
    }

    let search = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title(Span::styled(" Search ", DiaryTheme::text_dim()))
            .borders(Borders::ALL)
            .border_style(border),
    );
    f.render_widget(search, area);
}

fn entry_item(entry: &DiaryEntry) -> ListItem<'_> {
    let date = entry
        .created_at()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    let badge = if entry.is_verified {
        Span::styled(" ✓ verified ", DiaryTheme::success())
    } else {
        Span::styled(" 🔒 encrypted ", DiaryTheme::cipher())
    };

    ListItem::new(Line::from(vec![
        Span::styled(format!("{date}  "), DiaryTheme::text_faint()),
        Span::styled(entry.title.clone(), DiaryTheme::text()),
        Span::raw("  "),
        Span::styled(format!("mood {}", entry.mood), DiaryTheme::mood(entry.mood)),
        badge,
    ]))
}

fn render_entries(f: &mut Frame, area: Rect, state: &ControllerState) {
    let visible = state.visible_entries();
    let block = Block::default()
        .title(Span::styled(" My Diaries ", DiaryTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(DiaryTheme::border());

    if visible.is_empty() {
        let message = if state.diaries().is_empty() {
            "No diaries yet. Press N to write your first entry."
        } else {
            "No diaries match your search."
        };
        f.render_widget(
            Paragraph::new(Span::styled(message, DiaryTheme::text_faint())).block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = visible.into_iter().map(entry_item).collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(DiaryTheme::selected())
        .highlight_symbol("▶ ");

    let mut list_state = ListState::default();
    list_state.select(Some(state.cursor()));
    f.render_stateful_widget(list, area, &mut list_state);
}
