//! LogLine parser: one JSON record per line into a [`LogEntry`].
//!
//! Stateless. A malformed line yields a [`ParseError`] for that line only;
//! [`parse_log`] keeps going and reports every failure alongside the valid
//! entries.

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use thiserror::Error;

use crate::timeline::LogEntry;

/// Offset-less timestamp layouts accepted after RFC 3339. Interpreted as UTC.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid log record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unparseable timestamp: {0}")]
    Timestamp(String),
}

/// Raw record as written by a participant.
#[derive(Debug, Clone, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub message: String,
}

/// A line that failed to parse, with its 1-based position in the body.
#[derive(Debug)]
pub struct LineError {
    pub line_num: usize,
    pub error: ParseError,
}

/// Result of parsing a whole log body.
#[derive(Debug, Default)]
pub struct ParsedLog {
    pub entries: Vec<LogEntry>,
    pub errors: Vec<LineError>,
}

/// Parse one line for `participant`.
pub fn parse_line(participant: &str, line: &str) -> Result<LogEntry, ParseError> {
    let record: LogRecord = serde_json::from_str(line)?;
    let timestamp_ms = parse_timestamp_ms(&record.timestamp)?;
    Ok(LogEntry::new(
        timestamp_ms,
        format!("[{}] {}: {}", record.timestamp, participant, record.message),
    ))
}

/// Parse a full newline-delimited body. Blank lines are skipped silently.
pub fn parse_log(participant: &str, body: &str) -> ParsedLog {
    let mut parsed = ParsedLog::default();
    for (idx, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(participant, line) {
            Ok(entry) => parsed.entries.push(entry),
            Err(error) => parsed.errors.push(LineError {
                line_num: idx + 1,
                error,
            }),
        }
    }
    parsed
}

/// Milliseconds since the Unix epoch for an ISO-8601 timestamp.
pub fn parse_timestamp_ms(raw: &str) -> Result<i64, ParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
        .ok_or_else(|| ParseError::Timestamp(raw.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_line() {
        let entry = parse_line("ds1", r#"{"timestamp":"2024-01-01T00:00:00Z","message":"ok"}"#)
            .expect("valid line");
        assert_eq!(entry.timestamp_ms, 1_704_067_200_000);
        assert_eq!(entry.display_line, "[2024-01-01T00:00:00Z] ds1: ok");
    }

    #[test]
    fn valid_then_malformed_yields_one_entry_one_error() {
        let body = "{\"timestamp\":\"2024-01-01T00:00:00Z\",\"message\":\"ok\"}\nnot json\n";
        let parsed = parse_log("ds1", body);
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].line_num, 2);
        assert!(matches!(parsed.errors[0].error, ParseError::Json(_)));
    }

    #[test]
    fn malformed_line_does_not_abort_rest() {
        let body = concat!(
            "garbage\n",
            r#"{"timestamp":"2024-01-01T00:00:01Z","message":"a"}"#,
            "\n",
            r#"{"timestamp":"yesterday","message":"b"}"#,
            "\n",
            r#"{"timestamp":"2024-01-01T00:00:02Z","message":"c"}"#,
        );
        let parsed = parse_log("ds2", body);
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.errors.len(), 2);
        assert!(matches!(parsed.errors[1].error, ParseError::Timestamp(_)));
        assert_eq!(parsed.errors[1].line_num, 3);
    }

    #[test]
    fn missing_message_is_an_error() {
        assert!(parse_line("ds1", r#"{"timestamp":"2024-01-01T00:00:00Z"}"#).is_err());
    }

    #[test]
    fn blank_lines_and_crlf_are_ignored() {
        let body = "\r\n{\"timestamp\":\"2024-01-01T00:00:00Z\",\"message\":\"x\"}\r\n\r\n";
        let parsed = parse_log("ds1", body);
        assert_eq!(parsed.entries.len(), 1);
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn empty_body_is_empty() {
        let parsed = parse_log("ds1", "");
        assert!(parsed.entries.is_empty());
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn timestamp_variants() {
        assert_eq!(
            parse_timestamp_ms("2024-01-01T01:00:00+01:00").expect("offset"),
            1_704_067_200_000
        );
        assert_eq!(
            parse_timestamp_ms("2024-01-01T00:00:00.250").expect("naive fractional"),
            1_704_067_200_250
        );
        assert_eq!(
            parse_timestamp_ms("2024-01-01 00:00:00").expect("naive space"),
            1_704_067_200_000
        );
        assert!(parse_timestamp_ms("").is_err());
    }
}
