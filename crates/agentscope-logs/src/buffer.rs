use std::collections::VecDeque;
use std::sync::Arc;

use agentscope_types::{ArcLogEntry, LogEntry, LogLevel};

use crate::stats::LevelCounts;

/// Default retention bound for the live buffer
pub const DEFAULT_CAPACITY: usize = 500;

/// Bounded newest-first log buffer
///
/// Insertion prepends. Once the capacity is exceeded the oldest entries are
/// dropped from the tail; pushing never fails and never blocks.
#[derive(Clone, Debug)]
pub struct LogBuffer {
    /// Internal storage, index 0 is the newest entry.
    /// Uses Arc<LogEntry> so snapshots are reference count bumps, not deep clones
    entries: VecDeque<ArcLogEntry>,

    /// Maximum capacity
    capacity: usize,

    /// Incrementally maintained level counts
    level_counts: LevelCounts,

    /// Entries dropped from the tail since creation
    evicted: u64,
}

impl LogBuffer {
    /// Create a new log buffer with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY * 4)),
            capacity,
            level_counts: LevelCounts::default(),
            evicted: 0,
        }
    }

    /// Prepend an entry, truncating the tail down to capacity
    pub fn push(&mut self, entry: LogEntry) -> ArcLogEntry {
        let entry = Arc::new(entry);
        self.level_counts.increment(entry.level);
        self.entries.push_front(Arc::clone(&entry));

        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_back() {
                self.level_counts.decrement(evicted.level);
                self.evicted += 1;
            }
        }

        entry
    }

    /// All entries, newest first (Arc clones are cheap)
    pub fn all(&self) -> Vec<ArcLogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Iterate newest first
    pub fn iter(&self) -> impl Iterator<Item = &ArcLogEntry> {
        self.entries.iter()
    }

    /// Get entries filtered by a predicate
    pub fn filtered<F>(&self, predicate: F) -> Vec<ArcLogEntry>
    where
        F: Fn(&LogEntry) -> bool,
    {
        self.entries
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    /// Get entries at or above a minimum severity
    pub fn by_level(&self, min_level: LogLevel) -> Vec<ArcLogEntry> {
        let min = min_level.severity();
        self.filtered(|e| e.level.severity() >= min)
    }

    /// Per-level counts of the retained entries
    pub fn level_counts(&self) -> LevelCounts {
        self.level_counts
    }

    /// The newest `n` entries
    pub fn head(&self, n: usize) -> Vec<ArcLogEntry> {
        self.entries.iter().take(n).cloned().collect()
    }

    /// Get entries in a range (for virtual scrolling)
    pub fn range(&self, start: usize, count: usize) -> Vec<ArcLogEntry> {
        self.entries.iter().skip(start).take(count).cloned().collect()
    }

    pub fn newest(&self) -> Option<&ArcLogEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries dropped by the retention bound so far
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.level_counts = LevelCounts::default();
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
