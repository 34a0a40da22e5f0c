use agentscope_types::{EntryStatus, LogEntry, LogLevel};

/// Counts per log level
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LevelCounts {
    pub debug: usize,
    pub info: usize,
    pub warning: usize,
    pub error: usize,
}

impl LevelCounts {
    pub fn increment(&mut self, level: LogLevel) {
        *self.slot(level) += 1;
    }

    pub fn decrement(&mut self, level: LogLevel) {
        let slot = self.slot(level);
        *slot = slot.saturating_sub(1);
    }

    pub fn get(&self, level: LogLevel) -> usize {
        match level {
            LogLevel::Debug => self.debug,
            LogLevel::Info => self.info,
            LogLevel::Warning => self.warning,
            LogLevel::Error => self.error,
        }
    }

    pub fn total(&self) -> usize {
        self.debug + self.info + self.warning + self.error
    }

    fn slot(&mut self, level: LogLevel) -> &mut usize {
        match level {
            LogLevel::Debug => &mut self.debug,
            LogLevel::Info => &mut self.info,
            LogLevel::Warning => &mut self.warning,
            LogLevel::Error => &mut self.error,
        }
    }
}

/// Aggregate figures over a view of the buffer
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogStats {
    pub count: usize,
    pub levels: LevelCounts,
    pub failed: usize,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub avg_latency_ms: f64,
}

impl LogStats {
    pub fn collect<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a LogEntry>,
    {
        let mut stats = Self::default();
        let mut latency_sum: u64 = 0;

        for entry in entries {
            stats.count += 1;
            stats.levels.increment(entry.level);
            if entry.status == EntryStatus::Error {
                stats.failed += 1;
            }
            stats.total_tokens = stats.total_tokens.saturating_add(entry.total_tokens);
            stats.total_cost += entry.cost;
            latency_sum = latency_sum.saturating_add(entry.latency);
        }

        if stats.count > 0 {
            stats.avg_latency_ms = latency_sum as f64 / stats.count as f64;
        }
        stats
    }

    pub fn errors(&self) -> usize {
        self.levels.error
    }

    pub fn warnings(&self) -> usize {
        self.levels.warning
    }
}
