//! Display helpers for CLI output: color resolution, status badges, truncation.

use fedtail_core::ProjectStatus;

/// Resolve color mode: "always" → true, "never" → false, "auto" → isatty(stdout).
pub fn resolve_color(color: &str) -> bool {
    use std::io::IsTerminal;
    match color {
        "always" => true,
        "never" => false,
        _ => std::io::stdout().is_terminal(),
    }
}

/// Fixed-width status label, colored when requested.
pub fn status_badge(status: ProjectStatus, use_color: bool) -> String {
    let padded = format!("{:<8}", status.as_str());
    if !use_color {
        return padded;
    }
    match status {
        ProjectStatus::Invite => format!("\x1b[33m{padded}\x1b[0m"),
        ProjectStatus::Running => format!("\x1b[32m{padded}\x1b[0m"),
        ProjectStatus::Complete => format!("\x1b[2m{padded}\x1b[0m"),
    }
}

/// Right-truncate to `max_len` characters, appending `…` if truncated.
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_len.saturating_sub(1)).collect();
    format!("{kept}\u{2026}")
}

/// Age of a unix-seconds timestamp relative to `now`, e.g. "3h ago".
pub fn age_label(timestamp: i64, now: chrono::DateTime<chrono::Utc>) -> String {
    let Some(then) = chrono::DateTime::from_timestamp(timestamp, 0) else {
        return "-".to_string();
    };
    let secs = (now - then).num_seconds();
    if secs < 0 {
        return "-".to_string();
    }
    match secs {
        0..60 => format!("{secs}s ago"),
        60..3600 => format!("{}m ago", secs / 60),
        3600..86400 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86400),
    }
}
