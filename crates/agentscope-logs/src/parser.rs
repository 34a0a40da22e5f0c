use agentscope_types::LogEntry;

/// Reasons a received payload cannot become a log entry
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed log payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid cost {0}")]
    InvalidCost(f64),
}

/// Decoder for serialized log entries received from a transport
pub struct LogParser;

impl LogParser {
    /// Parse one JSON object into a LogEntry
    ///
    /// A token total that disagrees with its parts is replaced by the sum.
    pub fn decode(payload: &str) -> Result<LogEntry, DecodeError> {
        let mut entry: LogEntry = serde_json::from_str(payload.trim())?;

        if !entry.cost.is_finite() || entry.cost < 0.0 {
            return Err(DecodeError::InvalidCost(entry.cost));
        }

        if !entry.tokens_consistent() {
            tracing::debug!(
                id = %entry.id,
                total = entry.total_tokens,
                input = entry.input_tokens,
                output = entry.output_tokens,
                "correcting inconsistent token total"
            );
            entry.total_tokens = entry.input_tokens.saturating_add(entry.output_tokens);
        }

        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentscope_types::{EntryStatus, LogLevel};

    const VALID: &str = r#"{
        "id": "log-42",
        "timestamp": "2024-06-01T12:00:00Z",
        "level": "error",
        "agentId": "planner-1",
        "agentName": "Task Planner",
        "sessionId": "session-1",
        "traceId": "trace-1",
        "spanId": "span-1",
        "message": "Task Planner API connection timeout",
        "inputTokens": 430,
        "outputTokens": 260,
        "totalTokens": 690,
        "latency": 2890,
        "cost": 0.0121,
        "status": "error",
        "model": "gpt-4-turbo",
        "metadata": {"retries": 1}
    }"#;

    #[test]
    fn test_decode_valid_payload() {
        let entry = LogParser::decode(VALID).unwrap();
        assert_eq!(entry.id, "log-42");
        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.status, EntryStatus::Error);
        assert_eq!(entry.total_tokens, 690);
        assert!(entry.input.is_none());
        assert_eq!(entry.metadata.unwrap()["retries"], 1);
    }

    #[test]
    fn test_decode_corrects_token_total() {
        let payload = VALID.replace("\"totalTokens\": 690", "\"totalTokens\": 1");
        let entry = LogParser::decode(&payload).unwrap();
        assert_eq!(entry.total_tokens, 690);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            LogParser::decode("not json"),
            Err(DecodeError::Json(_))
        ));
        assert!(LogParser::decode(r#"{"id": "partial"}"#).is_err());
        assert!(LogParser::decode("[]").is_err());
    }

    #[test]
    fn test_decode_rejects_negative_values() {
        let payload = VALID.replace("\"cost\": 0.0121", "\"cost\": -1.0");
        assert!(matches!(
            LogParser::decode(&payload),
            Err(DecodeError::InvalidCost(_))
        ));

        let payload = VALID.replace("\"latency\": 2890", "\"latency\": -5");
        assert!(LogParser::decode(&payload).is_err());
    }

    #[test]
    fn test_decode_unknown_level_is_malformed() {
        let payload = VALID.replace("\"level\": \"error\"", "\"level\": \"fatal\"");
        assert!(LogParser::decode(&payload).is_err());
    }
}
