//! Log aggregation controller: maps project status to polling behavior.
//!
//! Per project: `running` keeps one live poller per participant, `complete`
//! triggers a single parallel fetch the first time it is seen, `invite` has no
//! log state at all. The fetched-once marker and the buffers of completed
//! projects last for the session, so applying the same complete project again
//! never re-fetches.
//!
//! One-shot fetches run in the background: `apply` never waits on the network.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fedtail_core::{PollerKey, Project, ProjectStatus, Timeline, log_path};

use crate::logs::{ProjectLogs, SharedLogs};
use crate::poller::{MIN_POLL_INTERVAL, TailPoller, TickOutcome};
use crate::registry::PollerRegistry;
use crate::source::LogSource;

/// Tick interval of running-project pollers.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Controller phase of one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No log state (invite, or never seen).
    Idle,
    /// One live poller per participant.
    Polling,
    /// Running project with live updates switched off.
    Paused,
    /// Complete project, fetched once this session.
    FetchedOnce,
}

#[derive(Debug)]
struct ProjectLogState {
    author: String,
    name: String,
    status: ProjectStatus,
    participants: Vec<String>,
    logs: SharedLogs,
    phase: Phase,
}

pub struct LogController<S> {
    source: Arc<S>,
    registry: PollerRegistry,
    poll_interval: Duration,
    projects: HashMap<String, ProjectLogState>,
    /// Completed projects already fetched. Only ever grows.
    fetched: HashSet<String>,
    one_shots: JoinSet<()>,
}

impl<S: LogSource> LogController<S> {
    pub fn new(source: Arc<S>, registry: PollerRegistry) -> Self {
        Self {
            source,
            registry,
            poll_interval: DEFAULT_POLL_INTERVAL,
            projects: HashMap::new(),
            fetched: HashSet::new(),
            one_shots: JoinSet::new(),
        }
    }

    /// Tick interval for running projects, at least [`MIN_POLL_INTERVAL`].
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn registry(&self) -> &PollerRegistry {
        &self.registry
    }

    /// Drive one project to the behavior its `status` calls for.
    pub async fn apply(&mut self, status: ProjectStatus, project: &Project) -> Phase {
        let project_id = project.project_id();
        match status {
            ProjectStatus::Invite => {
                if !self.projects.contains_key(&project_id) {
                    return Phase::Idle;
                }
                self.registry.cancel_all(&project_id).await;
                if self.fetched.contains(&project_id) {
                    if let Some(state) = self.projects.get_mut(&project_id) {
                        state.status = ProjectStatus::Invite;
                        state.phase = Phase::Idle;
                    }
                    debug!(project_id = %project_id, "project back to invite, completed logs kept");
                } else {
                    self.projects.remove(&project_id);
                    debug!(project_id = %project_id, "project back to invite, log state dropped");
                }
                Phase::Idle
            }
            ProjectStatus::Running => self.apply_running(project_id, project).await,
            ProjectStatus::Complete => self.apply_complete(project_id, project).await,
        }
    }

    async fn apply_running(&mut self, project_id: String, project: &Project) -> Phase {
        let participants = unique_participants(&project.datasites);
        let state = self
            .projects
            .entry(project_id.clone())
            .or_insert_with(|| ProjectLogState::new(project));

        let unchanged = state.status == ProjectStatus::Running && state.participants == participants;
        if unchanged && state.phase == Phase::Paused {
            return Phase::Paused;
        }
        let was_polling = unchanged && state.phase == Phase::Polling;

        state.status = ProjectStatus::Running;
        state.participants = participants;
        state.phase = Phase::Polling;

        if was_polling && self.all_pollers_registered(&project_id) {
            return Phase::Polling;
        }
        self.start_pollers(&project_id).await;
        Phase::Polling
    }

    async fn apply_complete(&mut self, project_id: String, project: &Project) -> Phase {
        self.reap_one_shots();
        self.registry.cancel_all(&project_id).await;

        let state = self
            .projects
            .entry(project_id.clone())
            .or_insert_with(|| ProjectLogState::new(project));
        state.status = ProjectStatus::Complete;
        state.phase = Phase::FetchedOnce;

        if !self.fetched.insert(project_id.clone()) {
            debug!(project_id = %project_id, "complete project already fetched, using cache");
            return Phase::FetchedOnce;
        }
        state.participants = unique_participants(&project.datasites);

        let pollers: Vec<TailPoller<S>> = state
            .participants
            .iter()
            .map(|participant| {
                TailPoller::new(
                    PollerKey::new(project_id.clone(), participant.clone()),
                    project.log_path(participant, ProjectStatus::Complete),
                    Arc::clone(&self.source),
                    Arc::clone(&state.logs),
                )
            })
            .collect();

        self.one_shots.spawn(async move {
            let failed = fetch_all_once(&project_id, pollers).await;
            info!(project_id = %project_id, failed, "completed project logs fetched");
        });
        Phase::FetchedOnce
    }

    /// Wait for every background one-shot fetch started so far.
    pub async fn settle(&mut self) {
        while let Some(joined) = self.one_shots.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "one-shot fetch task failed");
            }
        }
    }

    /// Whether this project's completed logs were fetched this session.
    pub fn fetched_once(&self, project_id: &str) -> bool {
        self.fetched.contains(project_id)
    }

    /// One parallel fetch of every participant's log under `status`, into a
    /// fresh buffer. Tracked state and pollers are left alone.
    pub async fn snapshot(&self, status: ProjectStatus, project: &Project) -> SharedLogs {
        let project_id = project.project_id();
        let logs = ProjectLogs::new_shared();
        if !status.has_logs() {
            return logs;
        }
        let pollers: Vec<TailPoller<S>> = unique_participants(&project.datasites)
            .into_iter()
            .map(|participant| {
                TailPoller::new(
                    PollerKey::new(project_id.clone(), participant.clone()),
                    project.log_path(&participant, status),
                    Arc::clone(&self.source),
                    Arc::clone(&logs),
                )
            })
            .collect();
        let failed = fetch_all_once(&project_id, pollers).await;
        debug!(project_id = %project_id, %status, failed, "snapshot fetched");
        logs
    }

    /// Stop live updates of a running project. Returns `false` if it is not polling.
    pub async fn pause(&mut self, project_id: &str) -> bool {
        let Some(state) = self.projects.get_mut(project_id) else {
            return false;
        };
        if state.phase != Phase::Polling {
            return false;
        }
        state.phase = Phase::Paused;
        self.registry.cancel_all(project_id).await;
        info!(project_id = %project_id, "log updates paused");
        true
    }

    /// Restart live updates of a paused project. Returns `false` if it is not paused.
    pub async fn resume(&mut self, project_id: &str) -> bool {
        let Some(state) = self.projects.get_mut(project_id) else {
            return false;
        };
        if state.phase != Phase::Paused {
            return false;
        }
        state.phase = Phase::Polling;
        self.start_pollers(project_id).await;
        info!(project_id = %project_id, "log updates resumed");
        true
    }

    /// Tear down the view of a project: pollers stop, a running project goes
    /// back to idle. Completed-project caches survive.
    pub async fn close(&mut self, project_id: &str) {
        self.registry.cancel_all(project_id).await;
        let keep_cache = self.fetched.contains(project_id);
        let Some(state) = self.projects.get_mut(project_id) else {
            return;
        };
        if state.status != ProjectStatus::Running {
            return;
        }
        if keep_cache {
            state.phase = Phase::Idle;
        } else {
            self.projects.remove(project_id);
        }
    }

    pub fn phase(&self, project_id: &str) -> Phase {
        self.projects
            .get(project_id)
            .map_or(Phase::Idle, |s| s.phase)
    }

    /// Running/paused state for a UI toggle.
    pub fn is_polling(&self, project_id: &str) -> bool {
        self.phase(project_id) == Phase::Polling
    }

    pub fn logs(&self, project_id: &str) -> Option<SharedLogs> {
        self.projects.get(project_id).map(|s| Arc::clone(&s.logs))
    }

    /// Copy of the project-wide merged timeline.
    pub async fn shared_timeline(&self, project_id: &str) -> Option<Timeline> {
        let logs = self.logs(project_id)?;
        let logs = logs.lock().await;
        Some(logs.shared().clone())
    }

    /// Copy of one participant's timeline. Empty until its first successful fetch.
    pub async fn participant_timeline(&self, project_id: &str, participant: &str) -> Option<Timeline> {
        let state = self.projects.get(project_id)?;
        if !state.participants.iter().any(|p| p == participant) {
            return None;
        }
        let logs = state.logs.lock().await;
        Some(logs.participant(participant).cloned().unwrap_or_default())
    }

    /// Participants of a tracked project, in manifest order.
    pub fn participants(&self, project_id: &str) -> Vec<String> {
        self.projects
            .get(project_id)
            .map(|s| s.participants.clone())
            .unwrap_or_default()
    }

    pub fn tracked_projects(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.projects.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Stop every poller and abort in-flight one-shot fetches. Log buffers
    /// stay readable.
    pub async fn shutdown(&mut self) {
        self.one_shots.abort_all();
        while self.one_shots.join_next().await.is_some() {}
        let stopped = self.registry.shutdown().await;
        for state in self.projects.values_mut() {
            if state.phase == Phase::Polling {
                state.phase = Phase::Paused;
            }
        }
        debug!(stopped, "log controller shut down");
    }

    fn reap_one_shots(&mut self) {
        while let Some(joined) = self.one_shots.try_join_next() {
            if let Err(e) = joined {
                warn!(error = %e, "one-shot fetch task failed");
            }
        }
    }

    fn all_pollers_registered(&self, project_id: &str) -> bool {
        self.projects.get(project_id).is_some_and(|s| {
            s.participants
                .iter()
                .all(|p| self.registry.is_active(&PollerKey::new(project_id, p.as_str())))
        })
    }

    async fn start_pollers(&mut self, project_id: &str) {
        // Re-entrancy guard: never leave a previous generation running.
        self.registry.cancel_all(project_id).await;

        let Some(state) = self.projects.get(project_id) else {
            return;
        };
        for participant in &state.participants {
            let poller = TailPoller::new(
                PollerKey::new(project_id, participant.as_str()),
                log_path(participant, ProjectStatus::Running, &state.author, &state.name),
                Arc::clone(&self.source),
                Arc::clone(&state.logs),
            );
            if let Err(e) = self.registry.start(poller, self.poll_interval) {
                warn!(project_id = %project_id, error = %e, "poller not started");
            }
        }
        info!(
            project_id = %project_id,
            pollers = state.participants.len(),
            "polling running project logs"
        );
    }
}

impl ProjectLogState {
    fn new(project: &Project) -> Self {
        Self {
            author: project.author.clone(),
            name: project.name.clone(),
            status: ProjectStatus::Invite,
            participants: Vec::new(),
            logs: ProjectLogs::new_shared(),
            phase: Phase::Idle,
        }
    }
}

/// Run `fetch_once` for every poller in parallel and wait for all of them.
/// Returns how many did not apply.
async fn fetch_all_once<S: LogSource>(project_id: &str, pollers: Vec<TailPoller<S>>) -> usize {
    let mut fetches = JoinSet::new();
    for poller in pollers {
        fetches.spawn(async move {
            let outcome = poller.fetch_once(&CancellationToken::new()).await;
            (poller.key().clone(), outcome)
        });
    }

    let mut failed = 0usize;
    while let Some(joined) = fetches.join_next().await {
        match joined {
            Ok((_, TickOutcome::Applied { .. })) => {}
            Ok((key, outcome)) => {
                failed += 1;
                debug!(poller = %key, ?outcome, "one-shot fetch did not apply");
            }
            Err(e) => {
                failed += 1;
                warn!(project_id = %project_id, error = %e, "one-shot fetch task failed");
            }
        }
    }
    failed
}

/// Manifest order, duplicates removed.
fn unique_participants(datasites: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    datasites
        .iter()
        .filter(|d| seen.insert(d.as_str()))
        .cloned()
        .collect()
}
