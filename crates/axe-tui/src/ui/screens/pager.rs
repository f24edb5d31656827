use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use axe_types::STATUS_SOURCE;

use crate::app::AppState;
use crate::ui::components::{HelpOverlay, StatusBar};
use crate::ui::{Layout, Theme};

/// The only screen: scrollback plus status bar
pub struct PagerScreen;

impl PagerScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState) {
        let (content, status) = Layout::main(frame.area());

        Self::render_lines(frame, content, state);

        let bar = StatusBar::new(state.status, &state.message)
            .scroll(state.pager.percent(), state.pager.is_following());
        frame.render_widget(bar, status);

        if state.help_visible {
            HelpOverlay::render(frame);
        }
    }

    fn render_lines(frame: &mut Frame, area: Rect, state: &mut AppState) {
        state.pager.set_height(area.height as usize);

        let lines: Vec<Line> = state.pager.visible().map(styled_line).collect();
        frame.render_widget(Paragraph::new(lines), area);
    }
}

/// Dim the `source]` prefix; status lines are drawn in the accent color
fn styled_line(line: &str) -> Line<'_> {
    match line.split_once("] ") {
        Some((source, _)) if source == STATUS_SOURCE => {
            Line::from(Span::styled(line, Theme::text_status()))
        }
        Some((source, text)) => Line::from(vec![
            Span::styled(source, Theme::source()),
            Span::styled("] ", Theme::source()),
            Span::styled(text, Theme::text()),
        ]),
        None => Line::from(Span::styled(line, Theme::text())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_line_splits_at_source() {
        let line = styled_line("p1/c1] hello] world");
        let parts: Vec<&str> = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(parts, vec!["p1/c1", "] ", "hello] world"]);
    }

    #[test]
    fn test_status_line_is_one_span() {
        let line = styled_line("axe] cache synced for namespace demo");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].style, Theme::text_status());
    }
}
