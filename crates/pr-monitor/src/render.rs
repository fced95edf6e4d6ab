//! Plain-text rendering of listings and action results for the terminal

use crate::service::{ActionResult, ActionStatus, RebaseResult};
use pr_monitor_client::{BranchUpdate, PipelineStatus, PullRequest};
use std::fmt::Write;

fn pipeline_line(pipeline: &PipelineStatus) -> String {
    let outcome = pipeline.conclusion.as_deref().unwrap_or("-");
    let mut line = format!("    {:<40} {:<12} {}", pipeline.name, pipeline.state, outcome);
    if let Some(command) = &pipeline.suggested_command {
        let _ = write!(line, "  [{}]", command);
    }
    line
}

/// Render one target's listing
///
/// Only problematic pipelines are shown unless `all_pipelines` is set.
pub fn render_listing(label: &str, prs: &[PullRequest], all_pipelines: bool) -> String {
    let mut out = format!("== {} ({} open) ==\n", label, prs.len());
    for pr in prs {
        let _ = writeln!(
            out,
            "{}#{} {} [{}] updated {}",
            pr.repo_full_name,
            pr.number,
            pr.title,
            pr.status_badge,
            pr.updated_at.format("%Y-%m-%d %H:%M UTC")
        );
        let _ = writeln!(out, "    {}", pr.url);
        if pr.has_conflicts {
            out.push_str("    ! merge conflicts\n");
        } else if pr.update_branch_available {
            out.push_str("    ! branch can be updated\n");
        }

        let pipelines: Vec<&PipelineStatus> = if all_pipelines {
            pr.pipelines.iter().collect()
        } else {
            pr.problematic_pipelines().collect()
        };
        for pipeline in pipelines {
            out.push_str(&pipeline_line(pipeline));
            out.push('\n');
        }
    }
    out
}

pub fn render_action(result: &ActionResult) -> String {
    match result.status {
        ActionStatus::Ok => format!("ok: {}", result.message),
        ActionStatus::Skipped => format!("skipped: {}", result.message),
    }
}

pub fn render_rebase(result: &RebaseResult) -> String {
    let update = match &result.update {
        BranchUpdate::Requested { message: Some(message) } => {
            format!("branch update requested: {}", message)
        }
        BranchUpdate::Requested { message: None } => "branch update requested".to_string(),
        BranchUpdate::AlreadyUpToDate => "branch already up to date".to_string(),
    };
    format!("{}\n{}", update, render_action(&result.rerun))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pr_monitor_client::PipelineSource;

    fn pipeline(name: &str, state: &str, conclusion: Option<&str>) -> PipelineStatus {
        PipelineStatus {
            name: name.to_string(),
            state: state.to_string(),
            conclusion: conclusion.map(str::to_string),
            target_url: None,
            description: None,
            suggested_command: pr_monitor_client::suggest_command(Some(name)).map(str::to_string),
            source: PipelineSource::Check,
        }
    }

    fn pr() -> PullRequest {
        PullRequest {
            number: 42,
            title: "Fix scan".to_string(),
            url: "https://github.com/apache/doris/pull/42".to_string(),
            repo_full_name: "apache/doris".to_string(),
            author: "alice".to_string(),
            updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap(),
            merge_state: "BEHIND".to_string(),
            mergeable: true,
            has_conflicts: false,
            update_branch_available: true,
            status_badge: "Behind".to_string(),
            pipelines: vec![
                pipeline("P0 Regression", "completed", Some("failure")),
                pipeline("Compile", "completed", Some("success")),
            ],
        }
    }

    #[test]
    fn test_listing_shows_problematic_only_by_default() {
        let text = render_listing("alice", &[pr()], false);
        assert!(text.starts_with("== alice (1 open) ==\n"));
        assert!(text.contains("apache/doris#42 Fix scan [Behind] updated 2024-05-01 10:30 UTC"));
        assert!(text.contains("! branch can be updated"));
        assert!(text.contains("[run p0]"));
        assert!(!text.contains("Compile"));
    }

    #[test]
    fn test_listing_with_all_pipelines() {
        let text = render_listing("alice", &[pr()], true);
        assert!(text.contains("[run compile]"));
    }

    #[test]
    fn test_render_rebase() {
        let result = RebaseResult {
            status: ActionStatus::Ok,
            update: BranchUpdate::AlreadyUpToDate,
            rerun: ActionResult {
                status: ActionStatus::Ok,
                message: "Triggered 'run buildall'".to_string(),
            },
        };
        assert_eq!(
            render_rebase(&result),
            "branch already up to date\nok: Triggered 'run buildall'"
        );
    }
}
