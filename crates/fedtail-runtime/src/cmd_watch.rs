//! `fedtail watch`: follow project logs live.
//!
//! Every manifest project is driven through the log controller; the screen
//! shows one project's shared or per-participant timeline and is redrawn on
//! each poll interval. The manifest is re-read every `refresh_secs`.

use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};

use fedtail_core::{Activity, ProjectStatus};
use fedtail_engine::{LogController, LogSource, Phase};

use crate::cli::WatchOpts;
use crate::context::{resolve_color, status_badge};
use crate::manifest::{ManifestLocation, load_activity};

/// Lines shown below the header.
const VIEW_LINES: usize = 40;

pub async fn cmd_watch<S: LogSource>(
    mut controller: LogController<S>,
    location: &ManifestLocation,
    client: &reqwest::Client,
    opts: &WatchOpts,
) -> anyhow::Result<()> {
    let use_color = resolve_color(&opts.color);
    let mut activity = load_activity(location, client).await?;
    sync_manifest(&mut controller, &activity).await;

    let mut redraw = interval(Duration::from_millis(opts.poll_interval_ms.max(1)));
    redraw.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let refresh_period = Duration::from_secs(opts.refresh_secs.max(1));
    let mut refresh = tokio::time::interval_at(tokio::time::Instant::now() + refresh_period, refresh_period);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = redraw.tick() => {
                let selected = select_project(&activity, opts.project.as_deref());
                let view = render_view(
                    &controller,
                    &activity,
                    selected.as_deref(),
                    opts.participant.as_deref(),
                    opts.search.as_deref(),
                    use_color,
                )
                .await;
                // Clear screen + cursor home
                print!("\x1b[2J\x1b[H");
                println!("{view}");
                if use_color {
                    println!("\n\x1b[2mfedtail watch \u{2014} Ctrl-C to quit\x1b[0m");
                } else {
                    println!("\nfedtail watch \u{2014} Ctrl-C to quit");
                }
            }
            _ = refresh.tick() => {
                match load_activity(location, client).await {
                    Ok(next) => {
                        if next != activity {
                            tracing::debug!("manifest changed");
                        }
                        activity = next;
                        sync_manifest(&mut controller, &activity).await;
                    }
                    Err(e) => tracing::warn!(error = %e, "manifest refresh failed, keeping previous"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.shutdown().await;
    Ok(())
}

/// Apply every manifest project, and close tracked projects the manifest no
/// longer lists.
pub async fn sync_manifest<S: LogSource>(controller: &mut LogController<S>, activity: &Activity) {
    for (status, project) in activity.projects() {
        controller.apply(status, project).await;
    }
    for project_id in controller.tracked_projects() {
        if activity.find(&project_id).is_none() {
            tracing::info!(project_id = %project_id, "project left the manifest");
            controller.close(&project_id).await;
        }
    }
}

/// The requested project, else the first running one, else the first complete one.
pub fn select_project(activity: &Activity, requested: Option<&str>) -> Option<String> {
    if let Some(id) = requested {
        return Some(id.to_string());
    }
    [ProjectStatus::Running, ProjectStatus::Complete]
        .iter()
        .find_map(|&status| activity.section(status).first())
        .map(|p| p.project_id())
}

pub async fn render_view<S: LogSource>(
    controller: &LogController<S>,
    activity: &Activity,
    project_id: Option<&str>,
    participant: Option<&str>,
    search: Option<&str>,
    use_color: bool,
) -> String {
    let Some(project_id) = project_id else {
        return "(no running or complete projects)".to_string();
    };
    let Some((status, project)) = activity.find(project_id) else {
        return format!("project {project_id} not in manifest");
    };

    let phase = match controller.phase(project_id) {
        Phase::Idle => "idle",
        Phase::Polling => "live",
        Phase::Paused => "paused",
        Phase::FetchedOnce => "final",
    };
    let view_name = participant.unwrap_or("shared");
    let mut out = format!(
        "{}  {project_id}  [{view_name}]  {phase}  ({} participants)\n",
        status_badge(status, use_color),
        project.datasites.len()
    );

    if !status.has_logs() {
        out.push_str("(invite: no logs yet)");
        return out;
    }

    if controller.logs(project_id).is_none() {
        out.push_str("(no log state yet)");
        return out;
    }
    let timeline = match participant {
        Some(p) => controller.participant_timeline(project_id, p).await,
        None => controller.shared_timeline(project_id).await,
    };
    let Some(timeline) = timeline else {
        out.push_str(&format!("({view_name} is not a participant)"));
        return out;
    };

    let lines: Vec<&str> = match search {
        Some(term) if !term.is_empty() => timeline
            .search(term)
            .into_iter()
            .map(|e| e.display_line.as_str())
            .collect(),
        _ => timeline.snapshot().iter().map(|e| e.display_line.as_str()).collect(),
    };
    if lines.is_empty() {
        out.push_str("(no log lines yet)");
        return out;
    }
    let start = lines.len().saturating_sub(VIEW_LINES);
    out.push_str(&lines[start..].join("\n"));
    out
}
