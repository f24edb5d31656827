use axe_types::{LogRecord, TailStatus};

use super::{Action, Pager};

/// Global pager state
pub struct AppState {
    pub pager: Pager,

    /// Lifecycle label shown at the left of the status bar
    pub status: TailStatus,

    /// Free-form message shown next to the status label
    pub message: String,

    /// Is help overlay visible?
    pub help_visible: bool,

    /// Whether app should quit
    pub should_quit: bool,

    /// Dirty flag for rendering - only render when true
    pub render_dirty: bool,
}

impl AppState {
    pub fn new(scrollback: usize) -> Self {
        Self {
            pager: Pager::new(scrollback),
            status: TailStatus::default(),
            message: String::new(),
            help_visible: false,
            should_quit: false,
            render_dirty: true, // Start dirty to ensure initial render
        }
    }

    /// Append a record to the scrollback, returning the line as displayed
    pub fn push_record(&mut self, record: &LogRecord) -> String {
        let line = record.display_line();
        self.pager.push(line.clone());
        self.render_dirty = true;
        line
    }

    pub fn set_status(&mut self, status: TailStatus) {
        self.status = status;
        self.render_dirty = true;
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.render_dirty = true;
    }

    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::ToggleHelp => self.help_visible = !self.help_visible,
            Action::ScrollUp(n) => self.pager.scroll_up(n),
            Action::ScrollDown(n) => self.pager.scroll_down(n),
            Action::PageUp => self.pager.page_up(),
            Action::PageDown => self.pager.page_down(),
            Action::ScrollToTop => self.pager.scroll_to_top(),
            Action::ScrollToBottom => self.pager.scroll_to_bottom(),
            Action::ToggleFollow => self.pager.toggle_follow(),
        }
        self.render_dirty = true;
    }
}
