use std::path::PathBuf;

/// Errors raised while loading fixtures
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("failed to read fixture file {path}: {source}")]
    ReadFixtures {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid fixture data: {0}")]
    InvalidFixtures(#[from] serde_json::Error),
}
