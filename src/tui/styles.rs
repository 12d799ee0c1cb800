//! Diary color palette and styles.
//!
//! Muted violet on a dark ink background; semantic colors for the status slot.

use ratatui::style::{Color, Modifier, Style};

use crate::application::StatusKind;

/// Diary theme color palette.
pub struct DiaryTheme;

impl DiaryTheme {
    // === Accent ===

    /// Violet - primary accent
    pub const ACCENT: Color = Color::Rgb(139, 92, 246); // #8B5CF6

    /// Light violet for highlights
    pub const ACCENT_LIGHT: Color = Color::Rgb(196, 181, 253); // #C4B5FD

    /// Deep violet for the header bar
    pub const ACCENT_DARK: Color = Color::Rgb(91, 33, 182); // #5B21B6

    /// Stone for borders
    pub const BORDER: Color = Color::Rgb(168, 162, 158); // #A8A29E

    // === Semantic ===

    pub const SUCCESS: Color = Color::Rgb(74, 222, 128); // #4ADE80
    pub const PENDING: Color = Color::Rgb(250, 204, 21); // #FACC15
    pub const ERROR: Color = Color::Rgb(248, 113, 113); // #F87171

    /// Encrypted values
    pub const CIPHER: Color = Color::Rgb(56, 189, 248); // #38BDF8

    // === Background / text ===

    pub const BG_INK: Color = Color::Rgb(24, 24, 27); // #18181B
    pub const TEXT: Color = Color::Rgb(244, 244, 245); // #F4F4F5
    pub const TEXT_DIM: Color = Color::Rgb(161, 161, 170); // #A1A1AA
    pub const TEXT_FAINT: Color = Color::Rgb(113, 113, 122); // #71717A

    // === Preset Styles ===

    #[must_use]
    pub fn title() -> Style {
        Style::default().fg(Self::TEXT).add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn subtitle() -> Style {
        Style::default()
            .fg(Self::ACCENT_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn text() -> Style {
        Style::default().fg(Self::TEXT)
    }

    #[must_use]
    pub fn text_dim() -> Style {
        Style::default().fg(Self::TEXT_DIM)
    }

    #[must_use]
    pub fn text_faint() -> Style {
        Style::default().fg(Self::TEXT_FAINT)
    }

    #[must_use]
    pub fn success() -> Style {
        Style::default().fg(Self::SUCCESS)
    }

    #[must_use]
    pub fn error() -> Style {
        Style::default().fg(Self::ERROR)
    }

    /// Style for encrypted or decrypted mood values
    #[must_use]
    pub fn cipher() -> Style {
        Style::default()
            .fg(Self::CIPHER)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for the list row under the cursor
    #[must_use]
    pub fn selected() -> Style {
        Style::default()
            .fg(Self::BG_INK)
            .bg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for the focused form field
    #[must_use]
    pub fn focused() -> Style {
        Style::default()
            .fg(Self::ACCENT_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    #[must_use]
    pub fn border_focused() -> Style {
        Style::default().fg(Self::ACCENT)
    }

    #[must_use]
    pub fn header() -> Style {
        Style::default()
            .fg(Self::TEXT)
            .bg(Self::ACCENT_DARK)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_hint() -> Style {
        Style::default()
            .fg(Self::ACCENT_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_desc() -> Style {
        Style::default().fg(Self::TEXT_DIM)
    }

    /// Style for a transaction status
    #[must_use]
    pub fn status(kind: StatusKind) -> Style {
        match kind {
            StatusKind::Pending => Style::default().fg(Self::PENDING),
            StatusKind::Success => Self::success(),
            StatusKind::Error => Self::error(),
        }
    }

    /// Style for a mood on the 1-10 scale
    #[must_use]
    pub fn mood(mood: u32) -> Style {
        match mood {
            8.. => Self::success(),
            4..=7 => Style::default().fg(Self::PENDING),
            _ => Self::error(),
        }
    }
}

/// Inline logo for the header
pub const LOGO_SMALL: &str = "CipherDiary";
