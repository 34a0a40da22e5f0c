use chrono::Local;
use ratatui::{
    Frame,
    layout::{Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use agentscope_logs::{ConnectionState, LogEntry, LogSnapshot, LogStats};

use crate::app::AppState;
use crate::ui::components::StatusBar;
use crate::ui::{Layout, Theme};

/// Display width of the agent column
const AGENT_WIDTH: usize = 16;

/// Log viewer screen
pub struct LogViewerScreen;

impl LogViewerScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState, snapshot: &LogSnapshot) {
        state.refresh_view(&snapshot.logs);

        let show_filter_bar = state.ui_state.search_active
            || state.is_filtered()
            || state.ui_state.filter_error.is_some();
        let areas = Layout::log_viewer(frame.area(), state.ui_state.stats_visible, show_filter_bar);

        Self::render_header(frame, areas.header, state, snapshot);
        if let Some(area) = areas.stats {
            Self::render_stats_bar(frame, area, state.view_stats());
        }
        if let Some(area) = areas.filter {
            Self::render_filter_bar(frame, area, state);
        }
        Self::render_logs(frame, areas.logs, state, snapshot.logs.len());
        Self::render_status_bar(frame, areas.status, state, snapshot);
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &AppState, snapshot: &LogSnapshot) {
        let mut spans = vec![
            Span::styled("agentscope", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(state.source.clone(), Theme::text()),
            Span::styled(" │ ", Theme::text_dim()),
            stream_indicator(snapshot),
        ];

        if let Some(error) = &snapshot.error {
            spans.push(Span::styled(" │ ", Theme::text_dim()));
            spans.push(Span::styled(error.clone(), Theme::error()));
        }

        let header = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }

    fn render_stats_bar(frame: &mut Frame, area: Rect, stats: &LogStats) {
        let mut spans = vec![Span::raw(" ")];

        for (tag, count, color) in [
            ("ERR:", stats.levels.error, Color::Red),
            ("WRN:", stats.levels.warning, Color::Yellow),
            ("INF:", stats.levels.info, Color::Green),
            ("DBG:", stats.levels.debug, Color::Cyan),
        ] {
            spans.push(Span::styled(
                tag,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(format!("{} ", count), Theme::text()));
        }

        spans.push(Span::styled("│ Failed:", Theme::text_dim()));
        spans.push(Span::styled(format!("{} ", stats.failed), Theme::text()));
        spans.push(Span::styled("│ Tokens:", Theme::text_dim()));
        spans.push(Span::styled(format!("{} ", stats.total_tokens), Theme::text()));
        spans.push(Span::styled("│ Cost:", Theme::text_dim()));
        spans.push(Span::styled(format!("${:.4} ", stats.total_cost), Theme::text()));
        spans.push(Span::styled("│ Avg latency:", Theme::text_dim()));
        spans.push(Span::styled(
            format!("{:.0}ms", stats.avg_latency_ms),
            Theme::text(),
        ));

        let stats_widget = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(" Stats ", Theme::title())),
        );
        frame.render_widget(stats_widget, area);
    }

    fn render_filter_bar(frame: &mut Frame, area: Rect, state: &AppState) {
        let ui = &state.ui_state;
        let mut spans = vec![];

        if ui.search_active {
            spans.push(Span::styled(" /", Theme::text_highlight()));
            spans.push(Span::styled(ui.search_input.clone(), Theme::text_highlight()));
            spans.push(Span::styled(
                "█",
                Style::default()
                    .fg(Theme::HIGHLIGHT)
                    .add_modifier(Modifier::SLOW_BLINK),
            ));
        } else {
            spans.push(Span::styled(" Filter: ", Theme::text_dim()));
            spans.push(Span::styled(ui.pattern.clone(), Theme::text_highlight()));
        }

        spans.push(Span::styled("  ", Theme::text()));
        spans.push(Span::styled(state.filter_summary(), Theme::text_dim()));

        if let Some(err) = &ui.filter_error {
            spans.push(Span::styled(" ", Theme::text()));
            spans.push(Span::styled(format!("⚠ {}", err), Theme::error()));
        }

        if ui.search_active {
            spans.push(Span::styled("  [Enter] Apply  [Esc] Cancel", Theme::text_dim()));
        } else {
            spans.push(Span::styled("  [n] Clear  [/] Edit", Theme::text_dim()));
        }

        let border_style = if ui.search_active {
            Theme::border_active()
        } else if ui.filter_error.is_some() {
            Theme::border_error()
        } else {
            Theme::border()
        };

        let filter_bar = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(Span::styled(" Search/Filter ", Theme::title())),
        );

        frame.render_widget(filter_bar, area);
    }

    fn render_logs(frame: &mut Frame, area: Rect, state: &mut AppState, retained: usize) {
        let total_logs = state.view().len();

        // Visible rows inside the border
        let inner_height = area.height.saturating_sub(2) as usize;
        let max_scroll = total_logs.saturating_sub(inner_height);

        if state.ui_state.follow {
            state.ui_state.log_scroll = 0;
        }
        if state.ui_state.log_scroll > max_scroll {
            state.ui_state.log_scroll = max_scroll;
        }
        let scroll = state.ui_state.log_scroll;

        // 2 for borders, 1 for the scrollbar
        let inner_width = area.width.saturating_sub(3) as usize;

        let lines: Vec<Line> = state
            .view()
            .iter()
            .skip(scroll)
            .take(inner_height)
            .map(|entry| Self::format_log_line(entry, state, inner_width))
            .collect();

        let title = if state.is_filtered() {
            format!(" Logs ({} of {}) ", total_logs, retained)
        } else {
            format!(" Logs ({}) ", total_logs)
        };

        let logs_widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(title, Theme::title())),
        );
        frame.render_widget(logs_widget, area);

        if total_logs > inner_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut scrollbar_state = ScrollbarState::default()
                .content_length(max_scroll)
                .position(scroll);
            frame.render_stateful_widget(
                scrollbar,
                area.inner(Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }

    /// One row: time, level, status, agent, message, then tokens and latency
    fn format_log_line(entry: &LogEntry, state: &AppState, available_width: usize) -> Line<'static> {
        let mut spans = Vec::new();
        let mut prefix_width = 0;

        if state.ui_state.show_timestamps {
            let time = entry.timestamp.with_timezone(&Local).format("%H:%M:%S");
            spans.push(Span::styled(format!("{} ", time), Theme::text_dim()));
            prefix_width += 9;
        }

        spans.push(Span::styled(entry.level.as_str(), Theme::level(entry.level)));
        spans.push(Span::styled(
            format!(" {}", entry.status.symbol()),
            Style::default().fg(entry.status.color()),
        ));
        spans.push(Span::styled(
            format!(" {}", pad_to_width(entry.agent_label(), AGENT_WIDTH)),
            Style::default().fg(agent_color(&entry.agent_id)),
        ));
        spans.push(Span::styled(" │ ", Theme::text_dim()));
        prefix_width += 3 + 2 + 1 + AGENT_WIDTH + 3;

        let metrics = if entry.total_tokens > 0 || entry.latency > 0 {
            format!("  {}tok {}ms", entry.total_tokens, entry.latency)
        } else {
            String::new()
        };

        let mut message_width = available_width.saturating_sub(prefix_width);
        let show_metrics = !metrics.is_empty() && message_width >= metrics.width() + 10;
        if show_metrics {
            message_width -= metrics.width();
        }

        let message = truncate_to_width(&entry.message, message_width);
        let base_style = Theme::level_text(entry.level);

        // Search highlighting over the displayed text
        let mut last_end = 0;
        for (start, end) in state.ui_state.filter.find_matches(&message) {
            if start > last_end {
                spans.push(Span::styled(message[last_end..start].to_string(), base_style));
            }
            spans.push(Span::styled(
                message[start..end].to_string(),
                Theme::search_match(),
            ));
            last_end = end;
        }
        if last_end < message.len() {
            spans.push(Span::styled(message[last_end..].to_string(), base_style));
        }

        if show_metrics {
            spans.push(Span::styled(metrics, Theme::text_dim()));
        }

        Line::from(spans)
    }

    fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, snapshot: &LogSnapshot) {
        let stats = state.view_stats();
        let pause_hint = if snapshot.paused { "Resume" } else { "Pause" };

        let mut right = vec![Span::styled(
            format!(
                "E:{} W:{} | {}/{} logs",
                stats.errors(),
                stats.warnings(),
                state.view().len(),
                snapshot.logs.len()
            ),
            Theme::status_bar(),
        )];
        if snapshot.evicted > 0 {
            right.push(Span::styled(
                format!(" | {} evicted", snapshot.evicted),
                Theme::status_bar(),
            ));
        }
        if snapshot.discarded > 0 {
            right.push(Span::styled(
                format!(" | {} discarded", snapshot.discarded),
                Theme::status_bar_alert(),
            ));
        }
        if snapshot.overflowed > 0 {
            right.push(Span::styled(
                format!(" | {} dropped", snapshot.overflowed),
                Theme::status_bar_alert(),
            ));
        }
        right.push(Span::styled(
            if state.ui_state.follow { " ▲" } else { "  " },
            Theme::status_bar_key(),
        ));

        let status = StatusBar::new()
            .hints([
                ("p", pause_hint),
                ("/", "Search"),
                ("l/s/a", "Filter"),
                ("e", "Export"),
                ("?", "Help"),
                ("q", "Quit"),
            ])
            .message(state.ui_state.message.as_deref())
            .right(right);

        frame.render_widget(status, area);
    }
}

/// Live/Paused/Connecting/Error marker for the header
fn stream_indicator(snapshot: &LogSnapshot) -> Span<'static> {
    if snapshot.paused {
        return Span::styled("⏸ Paused", Theme::paused());
    }
    let label = match snapshot.state {
        ConnectionState::Connected => "● Live",
        ConnectionState::Connecting => "◌ Connecting",
        ConnectionState::Errored => "✖ Error",
        ConnectionState::Disconnected => "○ Disconnected",
    };
    Span::styled(label, Theme::connection(snapshot.state))
}

/// Get a consistent color for an agent id
fn agent_color(agent_id: &str) -> Color {
    let hash: u32 = agent_id
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));

    let colors = [
        Color::Cyan,
        Color::Magenta,
        Color::Blue,
        Color::LightGreen,
        Color::LightCyan,
        Color::LightMagenta,
        Color::LightBlue,
    ];

    colors[(hash as usize) % colors.len()]
}

/// Cut `s` to at most `max` display columns, marking the cut with an ellipsis
fn truncate_to_width(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut width = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > max - 1 {
            break;
        }
        out.push(c);
        width += w;
    }
    out.push('…');
    out
}

/// Truncate or pad `s` to exactly `width` display columns
fn pad_to_width(s: &str, width: usize) -> String {
    let mut out = truncate_to_width(s, width);
    let used = out.width();
    out.extend(std::iter::repeat_n(' ', width.saturating_sub(used)));
    out
}
