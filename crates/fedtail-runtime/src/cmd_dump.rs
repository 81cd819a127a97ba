//! `fedtail dump`: fetch a project's logs once and write them out.

use std::io::Write;

use anyhow::{Context, bail};

use fedtail_core::Activity;
use fedtail_engine::{LogController, LogSource};

use crate::cli::DumpOpts;

/// `{project_id}-{shared|participant}-logs.txt`
pub fn default_output_name(project_id: &str, participant: Option<&str>) -> String {
    format!("{project_id}-{}-logs.txt", participant.unwrap_or("shared"))
}

pub async fn cmd_dump<S: LogSource>(
    activity: &Activity,
    controller: &LogController<S>,
    opts: &DumpOpts,
) -> anyhow::Result<()> {
    let text = render_dump(activity, controller, &opts.project, opts.participant.as_deref()).await?;
    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| default_output_name(&opts.project, opts.participant.as_deref()));

    if output == "-" {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{text}")?;
        return Ok(());
    }
    std::fs::write(&output, format!("{text}\n")).with_context(|| format!("cannot write {output}"))?;
    eprintln!("logs written to {output}");
    Ok(())
}

/// Rendered timeline for the requested project and view.
pub async fn render_dump<S: LogSource>(
    activity: &Activity,
    controller: &LogController<S>,
    project_id: &str,
    participant: Option<&str>,
) -> anyhow::Result<String> {
    let Some((status, project)) = activity.find(project_id) else {
        bail!("project {project_id} not in manifest");
    };
    if !status.has_logs() {
        bail!("project {project_id} is still an invite and has no logs");
    }
    if let Some(p) = participant {
        if !project.datasites.iter().any(|d| d == p) {
            bail!("{p} is not a participant of {project_id}");
        }
    }

    let logs = controller.snapshot(status, project).await;
    let logs = logs.lock().await;
    let text = match participant {
        Some(p) => logs.participant(p).map(|t| t.render()).unwrap_or_default(),
        None => logs.shared().render(),
    };
    Ok(text)
}
