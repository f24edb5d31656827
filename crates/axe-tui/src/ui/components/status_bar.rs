use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};

use axe_types::TailStatus;

use crate::ui::Theme;

/// Status bar: lifecycle label, message, and scroll position
pub struct StatusBar<'a> {
    status: TailStatus,
    message: &'a str,
    percent: u16,
    following: bool,
}

impl<'a> StatusBar<'a> {
    pub fn new(status: TailStatus, message: &'a str) -> Self {
        Self {
            status,
            message,
            percent: 100,
            following: true,
        }
    }

    pub fn scroll(mut self, percent: u16, following: bool) -> Self {
        self.percent = percent;
        self.following = following;
        self
    }

    /// Right-hand text, e.g. ` [F]  42% `
    fn right_text(&self) -> String {
        let follow = if self.following { "F" } else { " " };
        format!(" [{follow}] {:>3}% ", self.percent)
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, Theme::status_bar());

        let right = self.right_text();
        let right_width = right.len() as u16;

        let left = Line::from(vec![
            Span::styled(format!(" {:<8} ", self.status.label()), Theme::status_label(self.status)),
            Span::styled(format!(" {} ", self.message), Theme::status_bar()),
        ]);
        buf.set_line(area.x, area.y, &left, area.width.saturating_sub(right_width));

        if area.width > right_width {
            let right_x = area.x + area.width - right_width;
            let span = Span::styled(right, Theme::status_bar_key());
            buf.set_span(right_x, area.y, &span, right_width);
        }
    }
}
