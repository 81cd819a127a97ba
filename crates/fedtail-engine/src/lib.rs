//! fedtail-engine: live log aggregation for federated projects.
//! Tail pollers fetch per-participant log resources, merge them into shared
//! timelines, and are owned by a registry the controller drives from project
//! status.

pub mod controller;
pub mod logs;
pub mod poller;
pub mod registry;
pub mod source;

pub use controller::{DEFAULT_POLL_INTERVAL, LogController, Phase};
pub use logs::{ProjectLogs, SharedLogs};
pub use poller::{PollerHandle, TailPoller, TickOutcome};
pub use registry::{PollerRegistry, RegistryError};
pub use source::{FetchError, LogSource, MemorySource};
