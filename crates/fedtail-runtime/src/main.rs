//! fedtail: live log viewer for federated-computation projects.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use fedtail_engine::{LogController, PollerRegistry};

mod backend;
mod cli;
mod cmd_dump;
mod cmd_projects;
mod cmd_status;
mod cmd_watch;
mod context;
mod dir_source;
mod http;
mod manifest;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = std::env::var("FEDTAIL_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let base_url = args.resolved_base_url();
    let client = http::build_client(args.request_timeout_secs.map(Duration::from_secs));
    let location = manifest::ManifestLocation::parse(&args.manifest);

    let command = args
        .command
        .unwrap_or_else(|| cli::Command::Watch(cli::WatchOpts::default()));

    match command {
        cli::Command::Watch(opts) => {
            tracing::info!(base_url = %base_url, manifest = %args.manifest, "fedtail watch starting");
            let backend = backend::LogBackend::select(client.clone(), &base_url, args.datasites_root);
            let controller = LogController::new(Arc::new(backend), PollerRegistry::new())
                .with_poll_interval(Duration::from_millis(opts.poll_interval_ms));
            cmd_watch::cmd_watch(controller, &location, &client, &opts).await?;
        }
        cli::Command::Projects(opts) => {
            let activity = manifest::load_activity(&location, &client).await?;
            let coordination = http::CoordinationClient::new(client, base_url);
            let use_color = context::resolve_color(&opts.color);
            cmd_projects::cmd_projects(&activity, &coordination, use_color).await?;
        }
        cli::Command::Status => {
            let coordination = http::CoordinationClient::new(client, base_url);
            cmd_status::cmd_status(&coordination).await?;
        }
        cli::Command::Dump(opts) => {
            let activity = manifest::load_activity(&location, &client).await?;
            let backend = backend::LogBackend::select(client, &base_url, args.datasites_root);
            let controller = LogController::new(Arc::new(backend), PollerRegistry::new());
            cmd_dump::cmd_dump(&activity, &controller, &opts).await?;
        }
    }

    Ok(())
}
