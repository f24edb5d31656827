use ratatui::style::{Color, Modifier, Style};

use axe_types::TailStatus;

/// Color theme for the pager
pub struct Theme;

impl Theme {
    // Base colors
    pub const FG: Color = Color::White;
    pub const FG_DIM: Color = Color::DarkGray;
    pub const BAR_BG: Color = Color::Blue;

    // Accent colors
    pub const PRIMARY: Color = Color::Cyan;
    pub const HIGHLIGHT: Color = Color::Yellow;

    // Status colors
    pub const SUCCESS: Color = Color::Green;
    pub const WARNING: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;

    pub fn text() -> Style {
        Style::default().fg(Self::FG)
    }

    /// Lines emitted by axe itself
    pub fn text_status() -> Style {
        Style::default().fg(Self::PRIMARY)
    }

    /// The `source]` prefix of a container line
    pub fn source() -> Style {
        Style::default().fg(Self::FG_DIM)
    }

    // Status bar
    pub fn status_bar() -> Style {
        Style::default().fg(Self::FG).bg(Self::BAR_BG)
    }

    pub fn status_label(status: TailStatus) -> Style {
        let bg = match status {
            TailStatus::Syncing => Self::WARNING,
            TailStatus::Tailing => Self::SUCCESS,
            TailStatus::Error => Self::ERROR,
        };
        Style::default()
            .fg(Color::Black)
            .bg(bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn status_bar_key() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .bg(Self::BAR_BG)
            .add_modifier(Modifier::BOLD)
    }

    // Help popup
    pub fn border_focused() -> Style {
        Style::default().fg(Self::PRIMARY)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn heading() -> Style {
        Style::default().fg(Self::HIGHLIGHT)
    }

    pub fn key() -> Style {
        Style::default().fg(Self::SUCCESS)
    }
}
