use ratatui::{
    Frame,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::ui::{Layout, Theme};

/// Help overlay showing keybindings
pub struct HelpOverlay;

impl HelpOverlay {
    const SECTIONS: &'static [(&'static str, &'static [(&'static str, &'static str)])] = &[
        (
            "Navigation",
            &[
                ("j/↓", "Scroll to older"),
                ("k/↑", "Scroll to newer"),
                ("PgDn/^d", "Page down"),
                ("PgUp/^u", "Page up"),
                ("g", "Newest (follow)"),
                ("G", "Oldest"),
            ],
        ),
        (
            "Stream",
            &[
                ("p", "Pause / resume"),
                ("R", "Reconnect"),
                ("c", "Clear logs"),
                ("e", "Export view to JSON"),
            ],
        ),
        (
            "Filter",
            &[
                ("/", "Search messages"),
                ("r", "Toggle regex search"),
                ("l", "Cycle level"),
                ("s", "Cycle status"),
                ("a", "Cycle agent"),
                ("n", "Clear filters"),
            ],
        ),
        (
            "Display",
            &[
                ("f", "Toggle follow mode"),
                ("t", "Toggle timestamps"),
                ("S", "Toggle stats bar"),
                ("?", "Toggle this help"),
                ("q", "Quit"),
            ],
        ),
    ];

    pub fn render(frame: &mut Frame) {
        let mut help_text = vec![
            Line::from(Span::styled("Keybindings", Theme::title())),
            Line::from(""),
        ];
        for (i, (section, keys)) in Self::SECTIONS.iter().enumerate() {
            if i > 0 {
                help_text.push(Line::from(""));
            }
            help_text.push(Line::from(Span::styled(*section, Theme::text_highlight())));
            help_text.extend(keys.iter().map(|(key, desc)| Self::key_line(key, desc)));
        }

        let height = help_text.len() as u16 + 2;
        let popup_area = Layout::centered(frame.area(), 44, height);

        // Clear the background
        frame.render_widget(Clear, popup_area);

        let help_widget = Paragraph::new(help_text).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::title())
                .title(Span::styled(" Help ", Theme::title())),
        );

        frame.render_widget(help_widget, popup_area);
    }

    fn key_line(key: &'static str, desc: &'static str) -> Line<'static> {
        Line::from(vec![
            Span::styled(format!("  {:>8}", key), Style::default().fg(Theme::SUCCESS)),
            Span::styled(format!("  {}", desc), Theme::text()),
        ])
    }
}
