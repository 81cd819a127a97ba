//! fedtail-core: data model for federated-project log tailing.
//! Activity manifest types, project identity, the log line parser and the
//! timeline merge buffer. No IO, no async.

pub mod parse;
pub mod timeline;
pub mod types;

pub use parse::{LineError, LogRecord, ParseError, ParsedLog, parse_line, parse_log};
pub use timeline::{LogEntry, Timeline};
pub use types::{Activity, FedtailError, PollerKey, Project, ProjectStatus, format_id, log_path};
