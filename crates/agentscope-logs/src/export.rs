use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use agentscope_types::LogEntry;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to serialize logs: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pretty-printed JSON array of the given entries, in the given order
pub fn export_json<T: AsRef<LogEntry>>(entries: &[T]) -> Result<String, ExportError> {
    let refs: Vec<&LogEntry> = entries.iter().map(AsRef::as_ref).collect();
    Ok(serde_json::to_string_pretty(&refs)?)
}

/// Default export file name for a point in time
pub fn export_filename(at: DateTime<Local>) -> String {
    format!("logs-{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// Write entries to `path`, returning how many were written
pub fn write_export<T: AsRef<LogEntry>>(
    path: impl AsRef<Path>,
    entries: &[T],
) -> Result<usize, ExportError> {
    let path = path.as_ref();
    let json = export_json(entries)?;
    fs::write(path, json).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(entries.len())
}
