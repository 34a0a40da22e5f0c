//! Log event transports for agentscope
//!
//! This crate provides the transport boundary of the log stream: a live
//! WebSocket feed, a synthetic feed replaying fixtures on a timer, and the
//! fixture sources the synthetic feed draws from.

mod error;
mod fixtures;
mod transport;

pub use error::FeedError;
pub use fixtures::{FixtureProvider, StaticFixtures};
pub use transport::{
    DEFAULT_SYNTHETIC_INTERVAL, Envelope, EventSink, Generation, SyntheticTransport, Transport,
    TransportEvent, WebSocketTransport,
};

// Re-export types used in our public API
pub use agentscope_types::{LogEntry, LogLevel};
