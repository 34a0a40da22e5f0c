use ratatui::layout::{Constraint, Direction, Layout as RatatuiLayout, Rect};

/// Regions of the log viewer screen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogViewerAreas {
    pub header: Rect,
    pub stats: Option<Rect>,
    pub filter: Option<Rect>,
    pub logs: Rect,
    pub status: Rect,
}

/// Layout helper for consistent screen layouts
pub struct Layout;

impl Layout {
    /// Header, optional stats and filter bars, log list, status bar
    pub fn log_viewer(area: Rect, show_stats: bool, show_filter: bool) -> LogViewerAreas {
        let mut constraints = vec![Constraint::Length(3)]; // Header always
        if show_stats {
            constraints.push(Constraint::Length(3));
        }
        if show_filter {
            constraints.push(Constraint::Length(3));
        }
        constraints.push(Constraint::Min(1)); // Logs
        constraints.push(Constraint::Length(1)); // Status bar

        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let mut idx = 1;
        let stats = show_stats.then(|| {
            idx += 1;
            chunks[idx - 1]
        });
        let filter = show_filter.then(|| {
            idx += 1;
            chunks[idx - 1]
        });

        LogViewerAreas {
            header: chunks[0],
            stats,
            filter,
            logs: chunks[idx],
            status: chunks[idx + 1],
        }
    }

    /// A popup of at most `width` x `height` centered in `area`
    pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
        let width = width.min(area.width.saturating_sub(4));
        let height = height.min(area.height.saturating_sub(4));
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        Rect::new(x, y, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_viewer_areas() {
        let area = Rect::new(0, 0, 80, 30);

        let bare = Layout::log_viewer(area, false, false);
        assert!(bare.stats.is_none() && bare.filter.is_none());
        assert_eq!(bare.header.height, 3);
        assert_eq!(bare.logs.height, 26);
        assert_eq!(bare.status.y, 29);

        let full = Layout::log_viewer(area, true, true);
        assert_eq!(full.stats.map(|r| r.y), Some(3));
        assert_eq!(full.filter.map(|r| r.y), Some(6));
        assert_eq!(full.logs.y, 9);
        assert_eq!(full.logs.height, 20);
    }

    #[test]
    fn test_centered_fits_small_terminals() {
        let popup = Layout::centered(Rect::new(0, 0, 20, 10), 50, 24);
        assert_eq!(popup, Rect::new(2, 2, 16, 6));
    }
}
