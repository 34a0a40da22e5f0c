use std::fs;
use std::path::Path;

use agentscope_types::LogEntry;

use crate::FeedError;

/// Sample records compiled into the binary, newest first
const BUILTIN_FIXTURES: &str = include_str!("../fixtures/logs.json");

/// Source of pre-built log records
///
/// Used to seed the buffer and as the round-robin pool of the synthetic
/// transport. Entries are ordered newest first.
pub trait FixtureProvider: Send + Sync {
    fn entries(&self) -> &[LogEntry];

    /// The first `n` entries, used to seed a fresh buffer
    fn seed(&self, n: usize) -> &[LogEntry] {
        let entries = self.entries();
        &entries[..n.min(entries.len())]
    }
}

/// In-memory fixture pool
#[derive(Clone, Debug, Default)]
pub struct StaticFixtures {
    entries: Vec<LogEntry>,
}

impl StaticFixtures {
    pub fn new(entries: Vec<LogEntry>) -> Self {
        Self { entries }
    }

    /// Parse a JSON array of log entries
    pub fn from_json_str(json: &str) -> Result<Self, FeedError> {
        let entries: Vec<LogEntry> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    /// Load a JSON array of log entries from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| FeedError::ReadFixtures {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// The sample set shipped with agentscope
    pub fn builtin() -> Result<Self, FeedError> {
        Self::from_json_str(BUILTIN_FIXTURES)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FixtureProvider for StaticFixtures {
    fn entries(&self) -> &[LogEntry] {
        &self.entries
    }
}
