use std::collections::BTreeSet;

use tokio::sync::mpsc;

use super::Action;
use agentscope_logs::{ArcLogEntry, EntryStatus, LogEntry, LogFilter, LogLevel, LogStats};

/// Cache for the filtered view to avoid re-filtering on every render
#[derive(Default)]
pub struct ViewCache {
    /// Buffer revision the cache was built from
    logs_revision: u64,
    /// Filter revision the cache was built from
    filter_revision: u64,
    /// The cached filtered entries, newest first
    pub entries: Vec<ArcLogEntry>,
    /// Aggregates over `entries`
    pub stats: LogStats,
    pub is_valid: bool,
}

impl ViewCache {
    pub fn needs_refresh(&self, logs_revision: u64, filter_revision: u64) -> bool {
        !self.is_valid
            || self.logs_revision != logs_revision
            || self.filter_revision != filter_revision
    }

    pub fn update(&mut self, logs_revision: u64, filter_revision: u64, entries: Vec<ArcLogEntry>) {
        self.stats = LogStats::collect(entries.iter().map(|e| &**e));
        self.entries = entries;
        self.logs_revision = logs_revision;
        self.filter_revision = filter_revision;
        self.is_valid = true;
    }

    pub fn invalidate(&mut self) {
        self.is_valid = false;
    }
}

/// UI-specific transient state
pub struct UiState {
    /// Is search/filter bar active?
    pub search_active: bool,

    /// Current search input text
    pub search_input: String,

    /// Is help overlay visible?
    pub help_visible: bool,

    /// Transient status line message (export results, errors)
    pub message: Option<String>,

    /// First visible row of the filtered view (0 = newest)
    pub log_scroll: usize,

    /// Keep the viewport pinned to the newest entry?
    pub follow: bool,

    pub show_timestamps: bool,

    /// Show statistics bar?
    pub stats_visible: bool,

    /// Applied message pattern (empty = none)
    pub pattern: String,

    /// Interpret the pattern as a regex instead of literal text
    pub regex_mode: bool,

    pub level: Option<LogLevel>,
    pub status: Option<EntryStatus>,
    pub agent: Option<String>,

    /// Compiled filter built from the fields above
    pub filter: LogFilter,

    /// Filter input error message (e.g., invalid regex)
    pub filter_error: Option<String>,

    pub view_cache: ViewCache,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            search_active: false,
            search_input: String::new(),
            help_visible: false,
            message: None,
            log_scroll: 0,
            follow: true,
            show_timestamps: true,
            stats_visible: true,
            pattern: String::new(),
            regex_mode: false,
            level: None,
            status: None,
            agent: None,
            filter: LogFilter::all(),
            filter_error: None,
            view_cache: ViewCache::default(),
        }
    }
}

/// Global application state
pub struct AppState {
    /// Description of the log source shown in the header
    pub source: String,

    /// UI state
    pub ui_state: UiState,

    /// Whether app should quit
    pub should_quit: bool,

    /// Channel sender for actions
    pub action_tx: mpsc::UnboundedSender<Action>,

    /// Dirty flag for rendering - only render when true
    pub render_dirty: bool,

    logs_revision: u64,
    filter_revision: u64,

    /// Agent ids seen so far, for cycling the agent filter
    agents: BTreeSet<String>,
}

impl AppState {
    pub fn new(source: impl Into<String>, action_tx: mpsc::UnboundedSender<Action>) -> Self {
        Self {
            source: source.into(),
            ui_state: UiState::default(),
            should_quit: false,
            action_tx,
            render_dirty: true, // Start dirty to ensure initial render
            logs_revision: 0,
            filter_revision: 0,
            agents: BTreeSet::new(),
        }
    }

    /// Record that the buffer contents changed
    pub fn mark_logs_changed(&mut self) {
        self.logs_revision += 1;
        self.render_dirty = true;
    }

    /// Note a newly ingested entry
    pub fn note_entry(&mut self, entry: &LogEntry) {
        if !self.agents.contains(&entry.agent_id) {
            self.agents.insert(entry.agent_id.clone());
        }
        self.mark_logs_changed();
    }

    /// Learn the agents present in an existing set of entries
    pub fn observe_agents(&mut self, logs: &[ArcLogEntry]) {
        for entry in logs {
            if !self.agents.contains(&entry.agent_id) {
                self.agents.insert(entry.agent_id.clone());
            }
        }
    }

    pub fn agents(&self) -> impl Iterator<Item = &str> {
        self.agents.iter().map(String::as_str)
    }

    /// Re-filter the buffer if it or the filter changed since the last call
    pub fn refresh_view(&mut self, logs: &[ArcLogEntry]) {
        let cache = &self.ui_state.view_cache;
        if cache.needs_refresh(self.logs_revision, self.filter_revision) {
            let entries = self.ui_state.filter.apply(logs);
            self.ui_state
                .view_cache
                .update(self.logs_revision, self.filter_revision, entries);
        }
    }

    /// The filtered view as of the last refresh
    pub fn view(&self) -> &[ArcLogEntry] {
        &self.ui_state.view_cache.entries
    }

    pub fn view_stats(&self) -> &LogStats {
        &self.ui_state.view_cache.stats
    }

    /// Show a message in the status line
    pub fn show_message(&mut self, msg: impl Into<String>) {
        self.ui_state.message = Some(msg.into());
    }

    pub fn dismiss_message(&mut self) {
        self.ui_state.message = None;
    }

    /// Start search/filter input mode, editing the current pattern
    pub fn start_search(&mut self) {
        self.ui_state.search_active = true;
        self.ui_state.search_input = self.ui_state.pattern.clone();
        self.ui_state.filter_error = None;
    }

    /// Cancel search input and drop the message pattern
    pub fn cancel_search(&mut self) {
        self.ui_state.search_active = false;
        self.ui_state.search_input.clear();
        self.ui_state.pattern.clear();
        self.rebuild_filter();
    }

    /// Apply the current search input as the message pattern
    pub fn apply_filter(&mut self) {
        self.ui_state.search_active = false;
        self.ui_state.pattern = self.ui_state.search_input.clone();
        if !self.rebuild_filter() {
            self.ui_state.search_active = true; // Keep input open to fix
        }
    }

    /// Clear every filter constraint
    pub fn clear_filter(&mut self) {
        self.ui_state.pattern.clear();
        self.ui_state.search_input.clear();
        self.ui_state.level = None;
        self.ui_state.status = None;
        self.ui_state.agent = None;
        self.rebuild_filter();
    }

    pub fn toggle_regex(&mut self) {
        self.ui_state.regex_mode = !self.ui_state.regex_mode;
        self.rebuild_filter();
    }

    /// all -> debug -> info -> warning -> error -> all
    pub fn cycle_level(&mut self) {
        self.ui_state.level = cycle(self.ui_state.level.as_ref(), &LogLevel::ALL);
        self.rebuild_filter();
    }

    pub fn cycle_status(&mut self) {
        self.ui_state.status = cycle(self.ui_state.status.as_ref(), &EntryStatus::ALL);
        self.rebuild_filter();
    }

    pub fn cycle_agent(&mut self) {
        let agents: Vec<String> = self.agents.iter().cloned().collect();
        self.ui_state.agent = cycle(self.ui_state.agent.as_ref(), &agents);
        self.rebuild_filter();
    }

    /// Add a character to search input
    pub fn search_input_char(&mut self, c: char) {
        self.ui_state.search_input.push(c);
    }

    /// Remove last character from search input
    pub fn search_input_backspace(&mut self) {
        self.ui_state.search_input.pop();
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.ui_state.follow = false;
        self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_sub(n);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.ui_state.follow = false;
        // Clamped against the view length at render time
        self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_add(n);
    }

    /// Jump to the newest entry and follow new arrivals
    pub fn scroll_to_top(&mut self) {
        self.ui_state.follow = true;
        self.ui_state.log_scroll = 0;
    }

    /// Jump to the oldest retained entry
    pub fn scroll_to_bottom(&mut self) {
        self.ui_state.follow = false;
        self.ui_state.log_scroll = usize::MAX;
    }

    pub fn toggle_follow(&mut self) {
        self.ui_state.follow = !self.ui_state.follow;
        if self.ui_state.follow {
            self.ui_state.log_scroll = 0;
        }
    }

    /// Short description of the active constraints for the filter bar
    pub fn filter_summary(&self) -> String {
        let ui = &self.ui_state;
        format!(
            "level:{} status:{} agent:{}{}",
            ui.level.map_or("all", |l| l.name()),
            ui.status.map_or("all", |s| s.name()),
            ui.agent.as_deref().unwrap_or("all"),
            if ui.regex_mode { " [regex]" } else { "" },
        )
    }

    /// Whether any constraint is active
    pub fn is_filtered(&self) -> bool {
        !self.ui_state.filter.is_empty()
    }

    fn rebuild_filter(&mut self) -> bool {
        let ui = &self.ui_state;
        let base = if ui.regex_mode {
            LogFilter::regex(&ui.pattern, true)
        } else {
            Ok(LogFilter::search(&ui.pattern))
        };

        match base {
            Ok(filter) => {
                self.ui_state.filter = filter
                    .with_level(ui.level)
                    .with_status(ui.status)
                    .with_agent(ui.agent.clone());
                self.ui_state.filter_error = None;
                self.ui_state.log_scroll = 0;
                self.filter_revision += 1;
                self.render_dirty = true;
                true
            }
            Err(e) => {
                self.ui_state.filter_error = Some(format!("Invalid regex: {}", e));
                self.render_dirty = true;
                false
            }
        }
    }
}

/// Step to the next choice; past the last one wraps back to "all"
fn cycle<T: Clone + PartialEq>(current: Option<&T>, choices: &[T]) -> Option<T> {
    match current {
        None => choices.first().cloned(),
        Some(current) => choices
            .iter()
            .position(|c| c == current)
            .and_then(|i| choices.get(i + 1))
            .cloned(),
    }
}
