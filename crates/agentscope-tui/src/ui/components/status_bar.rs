use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use crate::ui::Theme;

/// One-line bar with key hints (or a message) on the left and counters on the right
pub struct StatusBar<'a> {
    hints: Vec<(&'a str, &'a str)>,
    message: Option<&'a str>,
    right: Vec<Span<'a>>,
}

impl<'a> StatusBar<'a> {
    pub fn new() -> Self {
        Self {
            hints: Vec::new(),
            message: None,
            right: Vec::new(),
        }
    }

    /// Add keyboard hints as (key, description) pairs
    pub fn hints<I>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.hints = hints.into_iter().collect();
        self
    }

    /// Replace the hints with a message
    pub fn message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }

    /// Spans to right-align
    pub fn right(mut self, spans: Vec<Span<'a>>) -> Self {
        self.right = spans;
        self
    }
}

impl Default for StatusBar<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Fill background
        buf.set_style(area, Theme::status_bar());

        let left = match self.message {
            Some(message) => Line::from(Span::styled(message, Theme::status_bar_key())),
            None => {
                let mut spans = Vec::new();
                for (i, (key, desc)) in self.hints.iter().enumerate() {
                    if i > 0 {
                        spans.push(Span::styled(" ", Theme::status_bar()));
                    }
                    spans.push(Span::styled(format!("[{}]", key), Theme::status_bar_key()));
                    spans.push(Span::styled(*desc, Theme::status_bar()));
                }
                Line::from(spans)
            }
        };

        let right = Line::from(self.right);
        let right_width = right
            .spans
            .iter()
            .map(|s| s.content.width())
            .sum::<usize>() as u16;
        let left_width = left.width() as u16;

        // Right side wins when both do not fit
        let right_x = area.x + area.width.saturating_sub(right_width + 1);
        let left_limit = if right_width > 0 {
            right_x.saturating_sub(area.x + 2)
        } else {
            area.width.saturating_sub(2)
        };
        buf.set_line(area.x + 1, area.y, &left, left_limit.min(left_width));

        if right_width > 0 && right_width + 2 <= area.width {
            buf.set_line(right_x, area.y, &right, right_width);
        }
    }
}
