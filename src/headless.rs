use std::io::{self, Write};

use anyhow::Result;
use chrono::Local;

use agentscope_logs::{ConnectionState, LogEntry, LogStreamConsumer, Update};

/// Stream entries to stdout, one line each, until Ctrl-C or the stream ends
///
/// Returns an error when the stream fails and no reconnect is pending.
pub async fn run(mut consumer: LogStreamConsumer) -> Result<()> {
    let mut out = io::stdout();

    // Retained entries first, oldest to newest
    for entry in consumer.logs().iter().rev() {
        writeln!(out, "{}", format_entry(entry))?;
    }

    consumer.connect();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,

            update = consumer.process_next() => {
                let Some(update) = update else { break };
                match update {
                    Update::Ingested(entry) => writeln!(out, "{}", format_entry(&entry))?,
                    Update::StateChanged(state) => {
                        writeln!(out, "{}", format_state(state, consumer.error()))?;
                    }
                    Update::RetryStarted(attempt) => {
                        writeln!(out, "-- reconnecting (attempt {})", attempt)?;
                    }
                    Update::Discarded(_) | Update::Stale(_) => {}
                }
                out.flush()?;

                if consumer.generation().is_none() && consumer.retry_pending().is_none() {
                    break;
                }
            }
        }
    }

    consumer.disconnect();

    match (consumer.state(), consumer.error()) {
        (ConnectionState::Errored, Some(error)) => anyhow::bail!("log stream failed: {}", error),
        _ => Ok(()),
    }
}

fn format_entry(entry: &LogEntry) -> String {
    format!(
        "{} {} {} [{}] {} ({} tok, {} ms, ${:.4})",
        entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        entry.level.as_str(),
        entry.status.symbol(),
        entry.agent_label(),
        entry.message,
        entry.total_tokens,
        entry.latency,
        entry.cost,
    )
}

fn format_state(state: ConnectionState, error: Option<&str>) -> String {
    match (state, error) {
        (ConnectionState::Errored, Some(error)) => format!("-- {}: {}", state, error),
        _ => format!("-- {}", state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentscope_logs::{EntryStatus, LogLevel};

    #[test]
    fn test_format_entry() {
        let entry = LogEntry::new("log-1", LogLevel::Error, "tool execution failed")
            .with_agent("coder-1", "Code Agent")
            .with_tokens(100, 20)
            .with_latency(950)
            .with_cost(0.0042);

        let line = format_entry(&entry);
        assert!(line.contains("ERR"));
        assert!(line.contains(EntryStatus::Error.symbol()));
        assert!(line.ends_with("[Code Agent] tool execution failed (120 tok, 950 ms, $0.0042)"));
    }

    #[test]
    fn test_format_state() {
        assert_eq!(format_state(ConnectionState::Connected, None), "-- connected");
        assert_eq!(
            format_state(ConnectionState::Errored, Some("refused")),
            "-- error: refused"
        );
    }
}
