use std::collections::VecDeque;

/// Scrollback of display lines with a viewport over it.
///
/// Holds at most `capacity` lines; the oldest line is evicted first. In
/// follow mode the viewport sticks to the newest line.
#[derive(Debug)]
pub struct Pager {
    lines: VecDeque<String>,
    capacity: usize,

    /// Bytes of text currently held
    bytes: usize,

    /// Index of the first visible line
    offset: usize,

    /// Viewport height, updated on every render
    height: usize,

    follow: bool,
}

impl Pager {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            bytes: 0,
            offset: 0,
            height: 1,
            follow: true,
        }
    }

    /// Append a line, evicting the oldest if at capacity
    pub fn push(&mut self, line: String) {
        if self.lines.len() >= self.capacity {
            if let Some(evicted) = self.lines.pop_front() {
                self.bytes -= evicted.len();
            }
            // Keep the same text in view while scrolled back
            self.offset = self.offset.saturating_sub(1);
        }

        self.bytes += line.len();
        self.lines.push_back(line);

        if self.follow {
            self.offset = self.max_offset();
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total size of the text held, in bytes
    pub fn byte_len(&self) -> usize {
        self.bytes
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height.max(1);
        self.offset = if self.follow {
            self.max_offset()
        } else {
            self.offset.min(self.max_offset())
        };
    }

    fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.height)
    }

    /// Scrolling back leaves follow mode
    pub fn scroll_up(&mut self, rows: usize) {
        self.follow = false;
        self.offset = self.offset.saturating_sub(rows);
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.offset = self.offset.saturating_add(rows).min(self.max_offset());
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.height);
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.height);
    }

    pub fn scroll_to_top(&mut self) {
        self.follow = false;
        self.offset = 0;
    }

    /// Jump to the newest line and resume following
    pub fn scroll_to_bottom(&mut self) {
        self.follow = true;
        self.offset = self.max_offset();
    }

    pub fn toggle_follow(&mut self) {
        if self.follow {
            self.follow = false;
        } else {
            self.scroll_to_bottom();
        }
    }

    /// Lines inside the viewport, oldest first
    pub fn visible(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .skip(self.offset)
            .take(self.height)
            .map(String::as_str)
    }

    /// Scroll position as a percentage of the scrollable range
    pub fn percent(&self) -> u16 {
        let max = self.max_offset();
        if max == 0 {
            return 100;
        }
        (self.offset.min(max) * 100 / max) as u16
    }
}
