use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use agentscope_logs::{DEFAULT_CAPACITY, ReconnectPolicy};

pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws/logs";

/// Where log events come from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Replay fixtures on a timer
    #[default]
    Synthetic,
    /// Live WebSocket feed
    Websocket,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// Maximum retained entries
    pub capacity: usize,

    /// Fixtures preloaded before the synthetic feed starts
    pub seed: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            seed: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub kind: SourceKind,

    /// e.g. "ws://localhost:8000/ws/logs"
    pub url: String,

    /// Delay between synthesized entries
    pub interval_ms: u64,

    /// JSON array of log entries; the built-in sample set when unset
    pub fixtures: Option<PathBuf>,
}

impl SourceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            url: DEFAULT_WS_URL.to_string(),
            interval_ms: 3000,
            fixtures: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconnectConfig {
    /// 0 disables automatic reconnection
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl ReconnectConfig {
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        let policy = ReconnectPolicy::disabled();
        Self {
            max_retries: policy.max_retries,
            initial_delay_ms: millis(policy.initial_delay),
            max_delay_ms: millis(policy.max_delay),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Command line values that take precedence over the file
#[derive(Debug, Default)]
pub struct Overrides {
    pub source: Option<SourceKind>,
    pub url: Option<String>,
    pub capacity: Option<usize>,
    pub seed: Option<usize>,
    pub interval_ms: Option<u64>,
    pub fixtures: Option<PathBuf>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub stream: StreamConfig,
    pub source: SourceConfig,
    pub reconnect: ReconnectConfig,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(kind) = overrides.source {
            self.source.kind = kind;
        }
        if let Some(url) = overrides.url {
            self.source.url = url;
        }
        if let Some(capacity) = overrides.capacity {
            self.stream.capacity = capacity;
        }
        if let Some(seed) = overrides.seed {
            self.stream.seed = seed;
        }
        if let Some(interval_ms) = overrides.interval_ms {
            self.source.interval_ms = interval_ms;
        }
        if overrides.fixtures.is_some() {
            self.source.fixtures = overrides.fixtures;
        }
        if let Some(max_retries) = overrides.max_retries {
            self.reconnect.max_retries = max_retries;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stream.capacity == 0 {
            anyhow::bail!("stream.capacity must be greater than zero");
        }

        if self.source.interval_ms == 0 {
            anyhow::bail!("source.interval_ms must be greater than zero");
        }

        if self.source.kind == SourceKind::Websocket
            && !(self.source.url.starts_with("ws://") || self.source.url.starts_with("wss://"))
        {
            anyhow::bail!(
                "source.url '{}' must start with ws:// or wss://",
                self.source.url
            );
        }

        if self.reconnect.initial_delay_ms > self.reconnect.max_delay_ms {
            anyhow::bail!(
                "reconnect.initial_delay_ms ({}) exceeds reconnect.max_delay_ms ({})",
                self.reconnect.initial_delay_ms,
                self.reconnect.max_delay_ms
            );
        }

        Ok(())
    }
}
