//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default coordination server port.
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Parser)]
#[command(name = "fedtail", about = "Live logs for federated-computation projects")]
pub struct Cli {
    /// Coordination server port on localhost
    #[arg(long, global = true, env = "FEDTAIL_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Base URL for the server and log resources (overrides --port)
    #[arg(long, global = true, env = "FEDTAIL_BASE_URL")]
    pub base_url: Option<String>,

    /// Activity manifest: a file path or an http(s) URL
    #[arg(long, global = true, env = "FEDTAIL_MANIFEST", default_value = "activity.json")]
    pub manifest: String,

    /// Read log resources from this local directory instead of over HTTP
    #[arg(long, global = true, env = "FEDTAIL_DATASITES_ROOT")]
    pub datasites_root: Option<PathBuf>,

    /// Per-request timeout in seconds (no timeout when unset)
    #[arg(long, global = true, env = "FEDTAIL_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| default_base_url(self.port))
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Follow project logs live (default)
    Watch(WatchOpts),
    /// List projects from the activity manifest
    Projects(ProjectsOpts),
    /// Check the coordination server and show the local datasite
    Status,
    /// Fetch a project's logs once and write them out
    Dump(DumpOpts),
}

#[derive(clap::Args)]
pub struct WatchOpts {
    /// Project to display (`author-name` id); first running project if omitted
    #[arg(long)]
    pub project: Option<String>,

    /// Show one participant's log instead of the shared log
    #[arg(long)]
    pub participant: Option<String>,

    /// Only show lines containing this text (case-insensitive)
    #[arg(long)]
    pub search: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long, default_value = "1000")]
    pub poll_interval_ms: u64,

    /// Manifest re-read interval in seconds
    #[arg(long, default_value = "5")]
    pub refresh_secs: u64,

    /// Color output: auto, always, never
    #[arg(long, default_value = "auto")]
    pub color: String,
}

impl Default for WatchOpts {
    fn default() -> Self {
        Self {
            project: None,
            participant: None,
            search: None,
            poll_interval_ms: 1000,
            refresh_secs: 5,
            color: "auto".to_string(),
        }
    }
}

#[derive(clap::Args)]
pub struct ProjectsOpts {
    /// Color output: auto, always, never
    #[arg(long, default_value = "auto")]
    pub color: String,
}

#[derive(clap::Args)]
pub struct DumpOpts {
    /// Project id (`author-name`)
    #[arg(long)]
    pub project: String,

    /// Dump one participant's log instead of the shared log
    #[arg(long)]
    pub participant: Option<String>,

    /// Output file; `-` for stdout. Defaults to `{project}-{log}-logs.txt`
    #[arg(long, short = 'o')]
    pub output: Option<String>,
}

pub fn default_base_url(port: u16) -> String {
    format!("http://localhost:{port}")
}
