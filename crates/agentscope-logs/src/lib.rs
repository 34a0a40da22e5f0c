//! Log processing for agentscope
//!
//! This crate provides the bounded log buffer, payload decoding, filtering,
//! aggregate stats, export, and the stream consumer that ties a transport to
//! the buffer.

mod buffer;
mod consumer;
mod export;
mod filter;
mod parser;
mod reconnect;
mod stats;

pub use buffer::{DEFAULT_CAPACITY, LogBuffer};
pub use consumer::{LogSnapshot, LogStreamConsumer, Update};
pub use export::{ExportError, export_filename, export_json, write_export};
pub use filter::{FilterPresets, LogFilter};
pub use parser::{DecodeError, LogParser};
pub use reconnect::ReconnectPolicy;
pub use stats::{LevelCounts, LogStats};

// Re-export types used in our public API
pub use agentscope_types::{ArcLogEntry, ConnectionState, EntryStatus, LogEntry, LogLevel};
