//! Normalized pull request and pipeline types
//!
//! These are the snapshots handed to callers. They are rebuilt from scratch on
//! every fetch and never patched in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline states that still need to finish before they can be judged
const RUNNING_STATES: [&str; 3] = ["pending", "queued", "in_progress"];

/// Conclusions that need no operator attention
const CLEAN_CONCLUSIONS: [&str; 3] = ["success", "neutral", "skipped"];

/// Which CI API a pipeline entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineSource {
    /// Legacy commit status context
    Status,
    /// Check-suite run
    Check,
}

/// One named CI signal of a pull request's head commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatus {
    /// Context or check-run name, unique within one pull request
    pub name: String,

    /// Lowercase lifecycle state (pending, queued, in_progress, completed, ...)
    pub state: String,

    /// Lowercase outcome, absent while a check is still running
    pub conclusion: Option<String>,

    /// Link to the CI run
    pub target_url: Option<String>,

    pub description: Option<String>,

    /// Comment command that would re-run this pipeline
    pub suggested_command: Option<String>,

    pub source: PipelineSource,
}

impl PipelineStatus {
    /// Whether the pipeline needs attention (running, unknown or failed)
    pub fn is_problematic(&self) -> bool {
        if RUNNING_STATES.contains(&self.state.to_lowercase().as_str()) {
            return true;
        }
        match &self.conclusion {
            None => true,
            Some(conclusion) => !CLEAN_CONCLUSIONS.contains(&conclusion.to_lowercase().as_str()),
        }
    }
}

/// An open pull request with its reconciled CI view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,

    pub title: String,

    /// PR URL for opening in browser
    pub url: String,

    /// `owner/name`
    pub repo_full_name: String,

    /// Author's GitHub login
    pub author: String,

    pub updated_at: DateTime<Utc>,

    /// Raw `mergeStateStatus` as reported by GitHub (e.g. `BEHIND`)
    pub merge_state: String,

    pub mergeable: bool,

    pub has_conflicts: bool,

    /// Mergeable and behind/unstable, so "Update branch" would do something
    pub update_branch_available: bool,

    /// Display badge: `Draft` or the title-cased merge state
    pub status_badge: String,

    pub pipelines: Vec<PipelineStatus>,
}

impl PullRequest {
    /// Pipelines that need attention, in display order
    pub fn problematic_pipelines(&self) -> impl Iterator<Item = &PipelineStatus> {
        self.pipelines.iter().filter(|p| p.is_problematic())
    }
}

/// Result of posting an issue comment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentReceipt {
    /// Comment id, absent when GitHub answered 304 Not Modified
    pub id: Option<u64>,

    pub html_url: Option<String>,
}

/// Result of requesting a branch update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BranchUpdate {
    /// GitHub accepted the update request
    Requested { message: Option<String> },
    /// The head branch already contains the base branch
    AlreadyUpToDate,
}
