//! Timeline merge buffer: deduplicated, time-ordered log entries.
//!
//! Every poll re-reads a log resource from the start, so the same record is
//! offered many times. Entries are unique by `display_line`; a repeat insert
//! is a no-op. Order is ascending by `timestamp_ms`, and entries with equal
//! timestamps keep their arrival order.

use std::collections::HashSet;

use serde::Serialize;

/// One formatted log event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LogEntry {
    pub timestamp_ms: i64,
    pub display_line: String,
}

impl LogEntry {
    pub fn new(timestamp_ms: i64, display_line: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            display_line: display_line.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    entries: Vec<LogEntry>,
    seen: HashSet<String>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry` unless an entry with the same display line exists.
    ///
    /// Returns `true` if the buffer changed.
    pub fn insert(&mut self, entry: LogEntry) -> bool {
        if self.seen.contains(&entry.display_line) {
            return false;
        }
        // Position after every entry with timestamp <= new one: same result
        // as a stable sort after push.
        let pos = self
            .entries
            .partition_point(|e| e.timestamp_ms <= entry.timestamp_ms);
        self.seen.insert(entry.display_line.clone());
        self.entries.insert(pos, entry);
        true
    }

    /// Insert many entries; returns how many were new.
    pub fn extend<I: IntoIterator<Item = LogEntry>>(&mut self, entries: I) -> usize {
        entries
            .into_iter()
            .map(|e| self.insert(e))
            .filter(|&inserted| inserted)
            .count()
    }

    /// Ordered, read-only view of the buffer.
    pub fn snapshot(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose display line contains `term`, ignoring case.
    pub fn search(&self, term: &str) -> Vec<&LogEntry> {
        let needle = term.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.display_line.to_lowercase().contains(&needle))
            .collect()
    }

    /// Display lines joined by `\n`, as shown in a log viewer.
    pub fn render(&self) -> String {
        let lines: Vec<&str> = self
            .entries
            .iter()
            .map(|e| e.display_line.as_str())
            .collect();
        lines.join("\n")
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Entries from one source: small timestamp range to force ties, short
    /// messages to force duplicate display lines.
    fn arb_entries(source: &'static str) -> impl Strategy<Value = Vec<LogEntry>> {
        prop::collection::vec((0i64..50, "[a-d]{1,3}"), 0..40).prop_map(move |raw| {
            raw.into_iter()
                .map(|(ts, msg)| LogEntry::new(ts, format!("[{ts}] {source}: {msg}")))
                .collect()
        })
    }

    fn content(tl: &Timeline) -> Vec<(i64, String)> {
        let mut out: Vec<(i64, String)> = tl
            .snapshot()
            .iter()
            .map(|e| (e.timestamp_ms, e.display_line.clone()))
            .collect();
        out.sort();
        out
    }

    proptest! {
        /// Every adjacent pair of a snapshot is in non-decreasing timestamp order.
        #[test]
        fn snapshot_is_always_sorted(entries in arb_entries("ds1")) {
            let mut tl = Timeline::new();
            for entry in entries {
                tl.insert(entry);
                prop_assert!(tl.snapshot().windows(2).all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));
            }
        }

        /// Display lines are unique, and inserting everything again changes nothing.
        #[test]
        fn reinsertion_is_idempotent(entries in arb_entries("ds1")) {
            let mut tl = Timeline::new();
            tl.extend(entries.clone());
            let before = tl.snapshot().to_vec();

            let lines: HashSet<&str> = before.iter().map(|e| e.display_line.as_str()).collect();
            prop_assert_eq!(lines.len(), before.len());

            prop_assert_eq!(tl.extend(entries), 0);
            prop_assert_eq!(tl.snapshot(), before.as_slice());
        }

        /// Merge order of two disjoint sources does not change the content.
        #[test]
        fn merge_order_does_not_matter(a in arb_entries("ds1"), b in arb_entries("ds2")) {
            let mut ab = Timeline::new();
            ab.extend(a.clone());
            ab.extend(b.clone());

            let mut ba = Timeline::new();
            ba.extend(b);
            ba.extend(a);

            prop_assert_eq!(content(&ab), content(&ba));
            let ts_ab: Vec<i64> = ab.snapshot().iter().map(|e| e.timestamp_ms).collect();
            let ts_ba: Vec<i64> = ba.snapshot().iter().map(|e| e.timestamp_ms).collect();
            prop_assert_eq!(ts_ab, ts_ba);
        }
    }
}
