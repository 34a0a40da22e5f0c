//! Shared types for agentscope
//!
//! This crate contains the log record and connection types used across the
//! feed, log processing and terminal UI crates.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};

// ============================================================================
// Log Types
// ============================================================================

/// Log severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub const ALL: [LogLevel; 4] = [Self::Debug, Self::Info, Self::Warning, Self::Error];

    /// Get display color for this level
    pub fn color(&self) -> Color {
        match self {
            Self::Debug => Color::Cyan,
            Self::Info => Color::Green,
            Self::Warning => Color::Yellow,
            Self::Error => Color::Red,
        }
    }

    /// Short display string (3 chars)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DBG",
            Self::Info => "INF",
            Self::Warning => "WRN",
            Self::Error => "ERR",
        }
    }

    /// Lowercase name, as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Ordinal for severity comparison
    pub fn severity(&self) -> u8 {
        match self {
            Self::Debug => 0,
            Self::Info => 1,
            Self::Warning => 2,
            Self::Error => 3,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogLevel {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" | "dbg" => Ok(Self::Debug),
            "info" | "inf" => Ok(Self::Info),
            "warning" | "warn" | "wrn" => Ok(Self::Warning),
            "error" | "err" => Ok(Self::Error),
            _ => Err(ParseChoiceError::new("level", s)),
        }
    }
}

/// Outcome of an agent execution
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    #[default]
    Success,
    Error,
    Pending,
}

impl EntryStatus {
    pub const ALL: [EntryStatus; 3] = [Self::Success, Self::Error, Self::Pending];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Pending => "pending",
        }
    }

    /// Single-glyph marker for dense views
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Success => "✓",
            Self::Error => "✗",
            Self::Pending => "…",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Success => Color::Green,
            Self::Error => Color::Red,
            Self::Pending => Color::Yellow,
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntryStatus {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "success" | "ok" => Ok(Self::Success),
            "error" | "err" | "failed" => Ok(Self::Error),
            "pending" => Ok(Self::Pending),
            _ => Err(ParseChoiceError::new("status", s)),
        }
    }
}

/// Error returned when a level/status name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseChoiceError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseChoiceError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Parse a select-style value where `"all"` (or empty) means no constraint
pub fn parse_choice<T>(value: &str) -> Result<Option<T>, T::Err>
where
    T: FromStr,
{
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    trimmed.parse().map(Some)
}

/// A single observed event from an agent execution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Unique identifier
    pub id: String,

    pub timestamp: DateTime<Utc>,

    pub level: LogLevel,

    pub agent_id: String,

    /// Display name of the agent
    pub agent_name: String,

    pub session_id: String,

    pub trace_id: String,

    pub span_id: String,

    pub message: String,

    pub input_tokens: u64,

    pub output_tokens: u64,

    /// Always `input_tokens + output_tokens`
    pub total_tokens: u64,

    /// Latency in milliseconds
    pub latency: u64,

    /// Cost in currency units
    pub cost: f64,

    pub status: EntryStatus,

    /// Model name
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Opaque key-value metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Shared handle to an immutable log entry
pub type ArcLogEntry = Arc<LogEntry>;

impl LogEntry {
    /// Create a new log entry with minimal fields
    ///
    /// Status follows the level by convention (`error` level gives `error`
    /// status); callers may override it afterwards.
    pub fn new(id: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp: Utc::now(),
            level,
            agent_id: String::new(),
            agent_name: String::new(),
            session_id: String::new(),
            trace_id: String::new(),
            span_id: String::new(),
            message: message.into(),
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            latency: 0,
            cost: 0.0,
            status: if level == LogLevel::Error {
                EntryStatus::Error
            } else {
                EntryStatus::Success
            },
            model: String::new(),
            input: None,
            output: None,
            metadata: None,
        }
    }

    pub fn with_agent(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.agent_id = id.into();
        self.agent_name = name.into();
        self
    }

    /// Set token counts, keeping the total consistent
    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self.total_tokens = input + output;
        self
    }

    pub fn with_status(mut self, status: EntryStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency = latency_ms;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether the token total matches its parts
    pub fn tokens_consistent(&self) -> bool {
        self.input_tokens.checked_add(self.output_tokens) == Some(self.total_tokens)
    }

    /// Agent display name, falling back to the id
    pub fn agent_label(&self) -> &str {
        if self.agent_name.is_empty() {
            &self.agent_id
        } else {
            &self.agent_name
        }
    }
}

// ============================================================================
// Connection Types
// ============================================================================

/// Lifecycle state of a log stream subscription
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Errored,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Errored => "error",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Disconnected => Color::DarkGray,
            Self::Connecting => Color::Yellow,
            Self::Connected => Color::Green,
            Self::Errored => Color::Red,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
