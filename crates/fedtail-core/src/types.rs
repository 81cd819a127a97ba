use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FedtailError {
    #[error("unknown project status: {0}")]
    UnknownStatus(String),
}

// ─── Project Status ──────────────────────────────────────────────────

/// Lifecycle status of a project as published in the activity manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Invite,
    Running,
    Complete,
}

impl ProjectStatus {
    pub const ALL: [Self; 3] = [Self::Invite, Self::Running, Self::Complete];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invite => "invite",
            Self::Running => "running",
            Self::Complete => "complete",
        }
    }

    /// Whether a project in this status has log resources to show.
    pub fn has_logs(self) -> bool {
        !matches!(self, Self::Invite)
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = FedtailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "invite" => Ok(Self::Invite),
            "running" => Ok(Self::Running),
            "complete" => Ok(Self::Complete),
            _ => Err(FedtailError::UnknownStatus(s.to_owned())),
        }
    }
}

// ─── Manifest ────────────────────────────────────────────────────────

/// One project entry of `activity.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub author: String,
    #[serde(default)]
    pub language: String,
    /// Unix seconds.
    #[serde(rename = "file_timestamp", default)]
    pub file_timestamp: i64,
    #[serde(default)]
    pub datasites: Vec<String>,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub result_url: Option<String>,
    #[serde(default)]
    pub description: String,
    /// filename -> path
    #[serde(default)]
    pub code: BTreeMap<String, String>,
    #[serde(default)]
    pub shared_inputs: Option<serde_json::Value>,
}

impl Project {
    /// Stable identifier used to key log state for this project.
    pub fn project_id(&self) -> String {
        format_id(&format!("{}-{}", self.author, self.name))
    }

    /// Log resource path for one participant under the given status.
    pub fn log_path(&self, participant: &str, status: ProjectStatus) -> String {
        log_path(participant, status, &self.author, &self.name)
    }
}

/// The static activity manifest, grouped by lifecycle status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub invite: Vec<Project>,
    #[serde(default)]
    pub running: Vec<Project>,
    #[serde(default)]
    pub complete: Vec<Project>,
}

impl Activity {
    /// All projects tagged with their status, invite first, then running, then complete.
    pub fn projects(&self) -> Vec<(ProjectStatus, &Project)> {
        ProjectStatus::ALL
            .iter()
            .flat_map(|&status| self.section(status).iter().map(move |p| (status, p)))
            .collect()
    }

    pub fn section(&self, status: ProjectStatus) -> &[Project] {
        match status {
            ProjectStatus::Invite => &self.invite,
            ProjectStatus::Running => &self.running,
            ProjectStatus::Complete => &self.complete,
        }
    }

    /// Look up a project by its [`Project::project_id`].
    pub fn find(&self, project_id: &str) -> Option<(ProjectStatus, &Project)> {
        self.projects()
            .into_iter()
            .find(|(_, p)| p.project_id() == project_id)
    }
}

// ─── Identity ────────────────────────────────────────────────────────

/// Normalize a free-form value into an identifier-safe token.
///
/// `@` and whitespace become `-at-`; anything outside `[A-Za-z0-9_-]`
/// becomes `-`.
pub fn format_id(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '@' || c.is_whitespace() {
            out.push_str("-at-");
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
        } else {
            out.push('-');
        }
    }
    out
}

/// `/datasites/{participant}/fedreduce/{status}/{author}/{name}.yaml.log`
pub fn log_path(participant: &str, status: ProjectStatus, author: &str, name: &str) -> String {
    format!("/datasites/{participant}/fedreduce/{status}/{author}/{name}.yaml.log")
}

/// Composite identity of one Tail Poller: exact equality on both parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PollerKey {
    pub project_id: String,
    pub participant: String,
}

impl PollerKey {
    pub fn new(project_id: impl Into<String>, participant: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            participant: participant.into(),
        }
    }
}

impl fmt::Display for PollerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_id, self.participant)
    }
}
