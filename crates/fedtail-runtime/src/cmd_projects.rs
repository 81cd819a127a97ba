//! `fedtail projects`: table of manifest projects with local markers.

use fedtail_core::Activity;

use crate::context::{age_label, status_badge, truncate};
use crate::http::{CoordinationClient, JoinedProject};

pub async fn cmd_projects(
    activity: &Activity,
    client: &CoordinationClient,
    use_color: bool,
) -> anyhow::Result<()> {
    let joined = client.list_joined().await;
    let datasite = match client.metadata().await {
        Ok(datasite) => Some(datasite),
        Err(e) => {
            tracing::debug!(error = %e, "metadata unavailable, author markers disabled");
            None
        }
    };

    let output = format_projects(activity, &joined, datasite.as_deref(), use_color, chrono::Utc::now());
    if output.is_empty() {
        println!("(no projects in manifest)");
    } else {
        print!("{output}");
    }
    Ok(())
}

/// One row per project: status, id, author, participant count, age, markers.
pub fn format_projects(
    activity: &Activity,
    joined: &[JoinedProject],
    datasite: Option<&str>,
    use_color: bool,
    now: chrono::DateTime<chrono::Utc>,
) -> String {
    let projects = activity.projects();
    if projects.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let header = format!(
        "{:<8}  {:<28}  {:<24}  {:>5}  {:<8}  {}\n",
        "STATUS", "PROJECT", "AUTHOR", "SITES", "UPDATED", "MARKS"
    );
    if use_color {
        out.push_str(&format!("\x1b[1m{header}\x1b[0m"));
    } else {
        out.push_str(&header);
    }

    for (status, project) in projects {
        let mut marks = Vec::new();
        if joined
            .iter()
            .any(|j| !project.source_url.is_empty() && j.source_url == project.source_url)
        {
            marks.push("joined");
        }
        if datasite.is_some_and(|d| d == project.author) {
            marks.push("author");
        }

        out.push_str(&format!(
            "{}  {:<28}  {:<24}  {:>5}  {:<8}  {}\n",
            status_badge(status, use_color),
            truncate(&project.project_id(), 28),
            truncate(&project.author, 24),
            project.datasites.len(),
            age_label(project.file_timestamp, now),
            marks.join(",")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_activity;

    fn activity() -> Activity {
        parse_activity(
            r#"{
                "invite": [{"name": "gamma", "author": "dave", "datasites": ["ds1"], "file_timestamp": 1699996400}],
                "running": [{"name": "alpha", "author": "carol", "datasites": ["ds1", "ds2"],
                             "sourceUrl": "syft://carol/alpha", "file_timestamp": 1699999940}],
                "complete": []
            }"#,
        )
        .expect("test")
    }

    fn now() -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(1_700_000_000, 0).expect("test")
    }

    #[test]
    fn rows_in_status_order_with_markers() {
        let joined = [JoinedProject {
            state: "running".into(),
            source_url: "syft://carol/alpha".into(),
        }];
        let out = format_projects(&activity(), &joined, Some("carol"), false, now());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("STATUS"));
        assert!(lines[1].starts_with("invite"));
        assert!(lines[1].contains("dave-gamma"));
        assert!(lines[1].contains("1h ago"));
        assert!(lines[1].trim_end().ends_with("ago"));
        assert!(lines[2].starts_with("running"));
        assert!(lines[2].contains("carol-alpha"));
        assert!(lines[2].contains("1m ago"));
        assert!(lines[2].ends_with("joined,author"));
    }

    #[test]
    fn empty_source_url_never_matches() {
        let joined = [JoinedProject {
            state: "join".into(),
            source_url: String::new(),
        }];
        let out = format_projects(&activity(), &joined, None, false, now());
        assert!(!out.contains("joined"));
    }

    #[test]
    fn empty_manifest_formats_nothing() {
        assert!(format_projects(&Activity::default(), &[], None, false, now()).is_empty());
    }
}
