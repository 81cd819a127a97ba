//! Per-project log buffers: one shared timeline plus one per participant.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use fedtail_core::{LogEntry, Timeline};

/// Handle shared between a project's pollers and its readers.
pub type SharedLogs = Arc<Mutex<ProjectLogs>>;

#[derive(Debug, Default)]
pub struct ProjectLogs {
    shared: Timeline,
    participants: BTreeMap<String, Timeline>,
}

impl ProjectLogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> SharedLogs {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Insert entries into the participant's timeline and the shared one.
    ///
    /// Returns how many entries were new to the shared timeline.
    pub fn apply(&mut self, participant: &str, entries: Vec<LogEntry>) -> usize {
        let own = self.participants.entry(participant.to_owned()).or_default();
        own.extend(entries.iter().cloned());
        self.shared.extend(entries)
    }

    pub fn shared(&self) -> &Timeline {
        &self.shared
    }

    pub fn participant(&self, participant: &str) -> Option<&Timeline> {
        self.participants.get(participant)
    }

    /// Participants that have delivered at least one fetch result.
    pub fn participants(&self) -> impl Iterator<Item = &str> {
        self.participants.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_fills_both_timelines() {
        let mut logs = ProjectLogs::new();
        let new = logs.apply(
            "ds1",
            vec![LogEntry::new(2, "[t2] ds1: b"), LogEntry::new(1, "[t1] ds1: a")],
        );
        assert_eq!(new, 2);
        let new = logs.apply("ds2", vec![LogEntry::new(3, "[t3] ds2: c")]);
        assert_eq!(new, 1);

        assert_eq!(logs.shared().len(), 3);
        assert_eq!(logs.participant("ds1").map(Timeline::len), Some(2));
        assert_eq!(logs.participant("ds2").map(Timeline::len), Some(1));
        assert!(logs.participant("ds3").is_none());
        assert_eq!(logs.participants().collect::<Vec<_>>(), ["ds1", "ds2"]);
    }

    #[test]
    fn reapply_of_same_body_adds_nothing() {
        let mut logs = ProjectLogs::new();
        let body = vec![LogEntry::new(1, "[t1] ds1: a")];
        logs.apply("ds1", body.clone());
        assert_eq!(logs.apply("ds1", body), 0);
        assert_eq!(logs.shared().len(), 1);
        assert_eq!(logs.participant("ds1").map(Timeline::len), Some(1));
    }
}
