//! Fetch seam for log resources. Enables fake injection for testing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("fetch failed: {0}")]
    Transport(String),

    #[error("non-success status {0}")]
    Status(u16),
}

/// Fetches the full body of a log resource by path
/// (`/datasites/{participant}/fedreduce/...`).
pub trait LogSource: Send + Sync + 'static {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// In-memory [`LogSource`] with a per-path fetch counter. Intended for tests.
///
/// Paths without a scripted response answer `Status(404)`.
#[derive(Debug, Default)]
pub struct MemorySource {
    responses: Mutex<HashMap<String, Result<String, FetchError>>>,
    counts: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `path` from now on.
    pub fn set_body(&self, path: impl Into<String>, body: impl Into<String>) {
        self.set_response(path, Ok(body.into()));
    }

    /// Fail every fetch of `path` with `error` from now on.
    pub fn set_error(&self, path: impl Into<String>, error: FetchError) {
        self.set_response(path, Err(error));
    }

    fn set_response(&self, path: impl Into<String>, response: Result<String, FetchError>) {
        if let Ok(mut map) = self.responses.lock() {
            map.insert(path.into(), response);
        }
    }

    /// Number of fetches issued for `path`.
    pub fn fetch_count(&self, path: &str) -> usize {
        self.counts
            .lock()
            .map(|c| c.get(path).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of fetches issued across all paths.
    pub fn total_fetches(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl LogSource for MemorySource {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<String, FetchError>> + Send {
        self.total.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(path.to_owned()).or_insert(0) += 1;
        }
        let response = self
            .responses
            .lock()
            .ok()
            .and_then(|map| map.get(path).cloned())
            .unwrap_or(Err(FetchError::Status(404)));
        std::future::ready(response)
    }
}
