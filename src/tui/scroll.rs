/// Scroll position of the transcript, counted in wrapped lines above the
/// bottom. Zero means the view follows new output.
#[derive(Debug, Clone, Default)]
pub struct ScrollState {
    offset: usize,
    total_lines: usize,
    viewport_height: usize,
}

impl ScrollState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            offset: 0,
            total_lines: 0,
            viewport_height: 0,
        }
    }

    #[must_use]
    pub const fn is_following(&self) -> bool {
        self.offset == 0
    }

    const fn max_offset(&self) -> usize {
        self.total_lines.saturating_sub(self.viewport_height)
    }

    pub fn update(&mut self, total_lines: usize, viewport_height: usize) {
        self.total_lines = total_lines;
        self.viewport_height = viewport_height;
        self.offset = self.offset.min(self.max_offset());
    }

    /// Index of the first visible line.
    #[must_use]
    pub const fn top(&self) -> usize {
        self.max_offset() - self.offset
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.offset = (self.offset + lines).min(self.max_offset());
    }

    pub const fn scroll_down(&mut self, lines: usize) {
        self.offset = self.offset.saturating_sub(lines);
    }

    #[must_use]
    pub const fn page(&self) -> usize {
        if self.viewport_height > 1 {
            self.viewport_height - 1
        } else {
            1
        }
    }

    pub const fn reset(&mut self) {
        self.offset = 0;
    }
}
