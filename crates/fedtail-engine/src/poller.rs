//! Tail poller: one participant's fetch → parse → merge cycle.
//!
//! A running poller re-reads the whole log resource every tick and relies on
//! timeline dedup to absorb lines it has already seen. Ticks never overlap:
//! the next tick waits for the current fetch, and missed ticks are delayed
//! rather than burst.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use fedtail_core::{PollerKey, parse_log};

use crate::logs::SharedLogs;
use crate::source::LogSource;

/// Shortest tick period; `tokio::time::interval` rejects zero.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// What a single fetch did to the timelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Body fetched and merged. `inserted` counts entries new to the shared timeline.
    Applied { inserted: usize, parse_errors: usize },
    /// Fetch failed; timelines left untouched.
    FetchFailed,
    /// The poller was stopped while the fetch was in flight; result dropped.
    Cancelled,
}

pub struct TailPoller<S> {
    key: PollerKey,
    path: String,
    source: Arc<S>,
    logs: SharedLogs,
}

impl<S: LogSource> TailPoller<S> {
    pub fn new(key: PollerKey, path: impl Into<String>, source: Arc<S>, logs: SharedLogs) -> Self {
        Self {
            key,
            path: path.into(),
            source,
            logs,
        }
    }

    pub fn key(&self) -> &PollerKey {
        &self.key
    }

    /// Fetch, parse and merge once.
    ///
    /// The cancellation check happens under the project log lock, so a
    /// [`PollerHandle::stop`] that has returned is never followed by a write.
    pub async fn fetch_once(&self, token: &CancellationToken) -> TickOutcome {
        let body = match self.source.fetch(&self.path).await {
            Ok(body) => body,
            Err(e) => {
                warn!(poller = %self.key, path = %self.path, error = %e, "log fetch failed");
                return TickOutcome::FetchFailed;
            }
        };

        let parsed = parse_log(&self.key.participant, &body);
        for failure in &parsed.errors {
            warn!(
                poller = %self.key,
                line = failure.line_num,
                error = %failure.error,
                "skipping malformed log line"
            );
        }
        let parse_errors = parsed.errors.len();

        let mut logs = self.logs.lock().await;
        if token.is_cancelled() {
            debug!(poller = %self.key, "dropping fetch result after stop");
            return TickOutcome::Cancelled;
        }
        let inserted = logs.apply(&self.key.participant, parsed.entries);
        TickOutcome::Applied {
            inserted,
            parse_errors,
        }
    }

    /// Start ticking every `period` on the tokio runtime. The first tick fires
    /// immediately. Periods below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn spawn(self, period: Duration) -> PollerHandle {
        let period = period.max(MIN_POLL_INTERVAL);
        let token = CancellationToken::new();
        let key = self.key.clone();
        let logs = Arc::clone(&self.logs);
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            self.run(period, task_token).await;
        });
        debug!(poller = %key, period_ms = period.as_millis() as u64, "poller started");
        PollerHandle {
            key,
            token,
            logs,
            task: Some(task),
        }
    }

    async fn run(self, period: Duration, token: CancellationToken) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                outcome = self.fetch_once(&token) => {
                    if outcome == TickOutcome::Cancelled {
                        break;
                    }
                }
            }
        }
        debug!(poller = %self.key, "poller stopped");
    }
}

/// Cancellation handle for a spawned [`TailPoller`].
///
/// Dropping the handle cancels the poller as well.
#[derive(Debug)]
pub struct PollerHandle {
    key: PollerKey,
    token: CancellationToken,
    logs: SharedLogs,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn key(&self) -> &PollerKey {
        &self.key
    }

    /// True until stopped, or until the task exits on its own.
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop future ticks and suppress any in-flight result. Idempotent.
    pub async fn stop(&self) {
        let _logs = self.logs.lock().await;
        self.token.cancel();
    }

    /// Stop, then wait for the task to exit.
    pub async fn join(mut self) {
        self.stop().await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::ProjectLogs;
    use crate::source::{FetchError, MemorySource};

    const PATH: &str = "/datasites/ds1/fedreduce/running/carol/alpha.yaml.log";

    fn poller(source: &Arc<MemorySource>, logs: &SharedLogs) -> TailPoller<MemorySource> {
        TailPoller::new(
            PollerKey::new("carol-alpha", "ds1"),
            PATH,
            Arc::clone(source),
            Arc::clone(logs),
        )
    }

    fn line(ts: &str, msg: &str) -> String {
        format!(r#"{{"timestamp":"{ts}","message":"{msg}"}}"#)
    }

    #[tokio::test]
    async fn fetch_once_merges_and_reports_parse_errors() {
        let source = Arc::new(MemorySource::new());
        source.set_body(
            PATH,
            format!("{}\nnot json\n{}", line("2024-01-01T00:00:02Z", "b"), line("2024-01-01T00:00:01Z", "a")),
        );
        let logs = ProjectLogs::new_shared();
        let outcome = poller(&source, &logs).fetch_once(&CancellationToken::new()).await;
        assert_eq!(
            outcome,
            TickOutcome::Applied {
                inserted: 2,
                parse_errors: 1
            }
        );

        let logs = logs.lock().await;
        assert_eq!(logs.shared().render(), "[2024-01-01T00:00:01Z] ds1: a\n[2024-01-01T00:00:02Z] ds1: b");
        assert_eq!(logs.participant("ds1").map(|t| t.len()), Some(2));
    }

    #[tokio::test]
    async fn fetch_failure_keeps_existing_content() {
        let source = Arc::new(MemorySource::new());
        source.set_body(PATH, line("2024-01-01T00:00:00Z", "kept"));
        let logs = ProjectLogs::new_shared();
        let p = poller(&source, &logs);
        let token = CancellationToken::new();
        p.fetch_once(&token).await;

        source.set_error(PATH, FetchError::Status(503));
        assert_eq!(p.fetch_once(&token).await, TickOutcome::FetchFailed);
        assert_eq!(logs.lock().await.shared().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_suppresses_write() {
        let source = Arc::new(MemorySource::new());
        source.set_body(PATH, line("2024-01-01T00:00:00Z", "late"));
        let logs = ProjectLogs::new_shared();
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(poller(&source, &logs).fetch_once(&token).await, TickOutcome::Cancelled);
        assert!(logs.lock().await.shared().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_poller_ticks_every_period() {
        let source = Arc::new(MemorySource::new());
        source.set_body(PATH, line("2024-01-01T00:00:00Z", "x"));
        let logs = ProjectLogs::new_shared();
        let handle = poller(&source, &logs).spawn(Duration::from_millis(1000));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(source.fetch_count(PATH), 3);
        assert!(handle.is_active());
        assert_eq!(logs.lock().await.shared().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_fetch_after_stop() {
        let source = Arc::new(MemorySource::new());
        source.set_body(PATH, line("2024-01-01T00:00:00Z", "x"));
        let logs = ProjectLogs::new_shared();
        let handle = poller(&source, &logs).spawn(Duration::from_millis(1000));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        handle.stop().await;
        handle.stop().await;
        let before = source.fetch_count(PATH);
        assert_eq!(before, 2);

        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(source.fetch_count(PATH), before);
        assert!(!handle.is_active());
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_is_clamped() {
        let source = Arc::new(MemorySource::new());
        source.set_body(PATH, line("2024-01-01T00:00:00Z", "x"));
        let logs = ProjectLogs::new_shared();
        let handle = poller(&source, &logs).spawn(Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(handle.is_active());
        assert!(source.fetch_count(PATH) >= 2);
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_cancels() {
        let source = Arc::new(MemorySource::new());
        source.set_body(PATH, line("2024-01-01T00:00:00Z", "x"));
        let logs = ProjectLogs::new_shared();
        let handle = poller(&source, &logs).spawn(Duration::from_millis(1000));
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(handle);

        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(source.fetch_count(PATH), 1);
    }

    /// Blocks every fetch until released.
    struct GatedSource {
        gate: tokio::sync::Notify,
        body: String,
        started: std::sync::atomic::AtomicUsize,
    }

    impl GatedSource {
        fn new(body: String) -> Self {
            Self {
                gate: tokio::sync::Notify::new(),
                body,
                started: std::sync::atomic::AtomicUsize::new(0),
            }
        }

        fn started(&self) -> usize {
            self.started.load(std::sync::atomic::Ordering::SeqCst)
        }

        fn release(&self) {
            self.gate.notify_waiters();
        }
    }

    impl LogSource for GatedSource {
        fn fetch(&self, _path: &str) -> impl std::future::Future<Output = Result<String, FetchError>> + Send {
            async move {
                self.started.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                self.gate.notified().await;
                Ok(self.body.clone())
            }
        }
    }

    fn gated_poller(source: &Arc<GatedSource>, logs: &SharedLogs) -> TailPoller<GatedSource> {
        TailPoller::new(
            PollerKey::new("carol-alpha", "ds1"),
            PATH,
            Arc::clone(source),
            Arc::clone(logs),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_in_flight_fetch_drops_result() {
        let source = Arc::new(GatedSource::new(line("2024-01-01T00:00:00Z", "late")));
        let logs = ProjectLogs::new_shared();
        let handle = gated_poller(&source, &logs).spawn(Duration::from_millis(1000));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(source.started(), 1);

        handle.stop().await;
        source.release();
        tokio::time::sleep(Duration::from_millis(5000)).await;

        assert!(logs.lock().await.shared().is_empty());
        assert_eq!(source.started(), 1);
        handle.join().await;
    }

    #[tokio::test]
    async fn cancel_under_lock_while_fetch_suspended_suppresses_write() {
        let source = Arc::new(GatedSource::new(line("2024-01-01T00:00:00Z", "late")));
        let logs = ProjectLogs::new_shared();
        let p = gated_poller(&source, &logs);
        let token = CancellationToken::new();
        let task_token = token.clone();
        let task = tokio::spawn(async move { p.fetch_once(&task_token).await });

        while source.started() == 0 {
            tokio::task::yield_now().await;
        }
        {
            let _guard = logs.lock().await;
            token.cancel();
        }
        source.release();

        assert_eq!(task.await.expect("test"), TickOutcome::Cancelled);
        assert!(logs.lock().await.shared().is_empty());
    }
}
