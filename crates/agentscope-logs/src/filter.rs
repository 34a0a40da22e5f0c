use regex::Regex;
use std::collections::HashSet;

use agentscope_types::{EntryStatus, LogEntry, LogLevel};

/// Compiled filter for log entries
#[derive(Clone)]
pub struct LogFilter {
    /// Compiled message pattern (if any)
    regex: Option<Regex>,

    /// Original pattern string
    pattern: String,

    /// Log levels to include (empty = all)
    levels: HashSet<LogLevel>,

    /// Agent ids to include (empty = all)
    agents: HashSet<String>,

    /// Statuses to include (empty = all)
    statuses: HashSet<EntryStatus>,

    case_insensitive: bool,
}

impl LogFilter {
    /// A filter matching every entry
    pub fn all() -> Self {
        Self {
            regex: None,
            pattern: String::new(),
            levels: HashSet::new(),
            agents: HashSet::new(),
            statuses: HashSet::new(),
            case_insensitive: true,
        }
    }

    /// Case-insensitive literal search over the message
    pub fn search(text: &str) -> Self {
        let regex = if text.is_empty() {
            None
        } else {
            // Escaped input always compiles
            Regex::new(&format!("(?i){}", regex::escape(text))).ok()
        };

        Self {
            regex,
            pattern: text.to_string(),
            ..Self::all()
        }
    }

    /// Regex search over the message
    pub fn regex(pattern: &str, case_insensitive: bool) -> Result<Self, regex::Error> {
        let regex = if pattern.is_empty() {
            None
        } else if case_insensitive {
            Some(Regex::new(&format!("(?i){}", pattern))?)
        } else {
            Some(Regex::new(pattern)?)
        };

        Ok(Self {
            regex,
            pattern: pattern.to_string(),
            case_insensitive,
            ..Self::all()
        })
    }

    pub fn with_levels<I: IntoIterator<Item = LogLevel>>(mut self, levels: I) -> Self {
        self.levels = levels.into_iter().collect();
        self
    }

    /// Restrict to a single level; `None` removes the constraint
    pub fn with_level(self, level: Option<LogLevel>) -> Self {
        self.with_levels(level)
    }

    pub fn with_agents<I, S>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.agents = agents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_agent(self, agent_id: Option<String>) -> Self {
        self.with_agents(agent_id)
    }

    pub fn with_statuses<I: IntoIterator<Item = EntryStatus>>(mut self, statuses: I) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_status(self, status: Option<EntryStatus>) -> Self {
        self.with_statuses(status)
    }

    /// Check if a log entry matches this filter
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if !self.levels.is_empty() && !self.levels.contains(&entry.level) {
            return false;
        }

        if !self.agents.is_empty() && !self.agents.contains(&entry.agent_id) {
            return false;
        }

        if !self.statuses.is_empty() && !self.statuses.contains(&entry.status) {
            return false;
        }

        match &self.regex {
            Some(re) => re.is_match(&entry.message),
            None => true,
        }
    }

    /// Apply the filter to a newest-first slice, preserving order
    pub fn apply<'a, T>(&self, entries: &'a [T]) -> Vec<T>
    where
        T: AsRef<LogEntry> + Clone + 'a,
    {
        entries
            .iter()
            .filter(|e| self.matches(e.as_ref()))
            .cloned()
            .collect()
    }

    /// Find all match positions in a string (for highlighting)
    pub fn find_matches(&self, text: &str) -> Vec<(usize, usize)> {
        match &self.regex {
            Some(re) => re.find_iter(text).map(|m| (m.start(), m.end())).collect(),
            None => Vec::new(),
        }
    }

    /// Get the original pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check if filter is empty (matches everything)
    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
            && self.levels.is_empty()
            && self.agents.is_empty()
            && self.statuses.is_empty()
    }

    pub fn has_pattern(&self) -> bool {
        self.regex.is_some()
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }
}

impl Default for LogFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl std::fmt::Debug for LogFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogFilter")
            .field("pattern", &self.pattern)
            .field("levels", &self.levels)
            .field("agents", &self.agents)
            .field("statuses", &self.statuses)
            .finish()
    }
}

/// Quick filter presets
pub struct FilterPresets;

impl FilterPresets {
    pub fn errors_only() -> LogFilter {
        LogFilter::all().with_levels([LogLevel::Error])
    }

    pub fn warnings_and_errors() -> LogFilter {
        LogFilter::all().with_levels([LogLevel::Warning, LogLevel::Error])
    }

    /// Entries whose execution failed, regardless of level
    pub fn failed() -> LogFilter {
        LogFilter::all().with_statuses([EntryStatus::Error])
    }
}
