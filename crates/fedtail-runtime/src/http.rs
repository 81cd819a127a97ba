//! HTTP access to the local coordination server and its log resources.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

use fedtail_engine::{FetchError, LogSource};

const FEDREDUCE_COMMAND_PATH: &str = "/apps/command/fedreduce";

/// Build the shared client. No timeout unless one is configured.
pub fn build_client(timeout: Option<Duration>) -> reqwest::Client {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().unwrap_or_else(|_| reqwest::Client::new())
}

/// [`LogSource`] that GETs `{base_url}{path}`.
#[derive(Debug, Clone)]
pub struct HttpLogSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLogSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl LogSource for HttpLogSource {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<String, FetchError>> + Send {
        let request = self.client.get(format!("{}{}", self.base_url, path));
        async move {
            let response = request
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }
            response
                .text()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))
        }
    }
}

/// A project the local datasite has joined, as reported by `list_projects`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedProject {
    pub state: String,
    pub source_url: String,
}

#[derive(Debug, Deserialize)]
struct ListedProject {
    #[serde(default)]
    state: String,
    #[serde(rename = "sourceUrl", default)]
    source_url: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    #[serde(default)]
    datasite: String,
}

/// Read-only client for the coordination server.
#[derive(Debug, Clone)]
pub struct CoordinationClient {
    client: reqwest::Client,
    base_url: String,
}

impl CoordinationClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /apps/` answers with a success status.
    pub async fn probe(&self) -> bool {
        match self.client.get(format!("{}/apps/", self.base_url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "server probe failed");
                false
            }
        }
    }

    /// The local datasite identity from `GET /metadata`.
    pub async fn metadata(&self) -> anyhow::Result<String> {
        let response = self
            .client
            .get(format!("{}/metadata", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        let metadata: Metadata = response.json().await?;
        Ok(metadata.datasite)
    }

    /// Projects in `join` or `running` state. Any failure yields an empty list.
    pub async fn list_joined(&self) -> Vec<JoinedProject> {
        match self.list_projects().await {
            Ok(listed) => filter_joined(listed),
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch joined projects");
                Vec::new()
            }
        }
    }

    async fn list_projects(&self) -> anyhow::Result<Vec<ListedProject>> {
        let response = self
            .client
            .post(format!("{}{FEDREDUCE_COMMAND_PATH}", self.base_url))
            .json(&serde_json::json!({ "command": "list_projects" }))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

fn filter_joined(listed: Vec<ListedProject>) -> Vec<JoinedProject> {
    listed
        .into_iter()
        .filter(|p| p.state == "join" || p.state == "running")
        .filter_map(|p| {
            let source_url = p.source_url.into_iter().next()?;
            Some(JoinedProject {
                state: p.state,
                source_url,
            })
        })
        .collect()
}
