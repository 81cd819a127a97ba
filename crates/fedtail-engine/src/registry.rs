//! Poller registry: the session-wide table of live tail pollers.
//!
//! At most one handle per [`PollerKey`]. Project-wide cancellation matches
//! `project_id` by exact equality, so `carol-alpha` never touches
//! `carol-alpha-2`.

use std::collections::HashMap;

use thiserror::Error;
use tokio::time::Duration;
use tracing::debug;

use fedtail_core::PollerKey;

use crate::poller::{PollerHandle, TailPoller};
use crate::source::LogSource;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("poller handle already registered for {0}")]
    DuplicateKey(PollerKey),

    #[error("poller already running for {0}")]
    AlreadyRunning(PollerKey),
}

#[derive(Debug, Default)]
pub struct PollerRegistry {
    handles: HashMap<PollerKey, PollerHandle>,
}

impl PollerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `poller` and register its handle.
    ///
    /// Fails with `AlreadyRunning` before spawning anything if the key is taken.
    pub fn start<S: LogSource>(
        &mut self,
        poller: TailPoller<S>,
        period: Duration,
    ) -> Result<(), RegistryError> {
        if self.handles.contains_key(poller.key()) {
            return Err(RegistryError::AlreadyRunning(poller.key().clone()));
        }
        let handle = poller.spawn(period);
        self.handles.insert(handle.key().clone(), handle);
        Ok(())
    }

    /// Register an already-spawned handle.
    ///
    /// On `DuplicateKey` the rejected handle is dropped, which cancels it.
    pub fn register(&mut self, handle: PollerHandle) -> Result<(), RegistryError> {
        if self.handles.contains_key(handle.key()) {
            return Err(RegistryError::DuplicateKey(handle.key().clone()));
        }
        self.handles.insert(handle.key().clone(), handle);
        Ok(())
    }

    /// Stop and remove one poller. Returns `false` if it was not registered.
    pub async fn stop(&mut self, key: &PollerKey) -> bool {
        match self.handles.remove(key) {
            Some(handle) => {
                handle.stop().await;
                debug!(poller = %key, "poller removed");
                true
            }
            None => false,
        }
    }

    /// Stop and remove every poller of `project_id`. Returns how many were removed.
    pub async fn cancel_all(&mut self, project_id: &str) -> usize {
        let keys = self.keys_for(project_id);
        for key in &keys {
            if let Some(handle) = self.handles.remove(key) {
                handle.stop().await;
            }
        }
        if !keys.is_empty() {
            debug!(project_id = %project_id, count = keys.len(), "pollers cancelled");
        }
        keys.len()
    }

    pub fn is_active(&self, key: &PollerKey) -> bool {
        self.handles.get(key).is_some_and(PollerHandle::is_active)
    }

    /// Registered keys of one project, sorted.
    pub fn keys_for(&self, project_id: &str) -> Vec<PollerKey> {
        let mut keys: Vec<PollerKey> = self
            .handles
            .keys()
            .filter(|k| k.project_id == project_id)
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stop everything. Used at session end.
    pub async fn shutdown(&mut self) -> usize {
        let count = self.handles.len();
        for (_, handle) in self.handles.drain() {
            handle.join().await;
        }
        count
    }
}
