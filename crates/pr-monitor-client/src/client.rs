//! Code host client trait
//!
//! This module defines the `CodeHost` trait the monitor service talks to.
//! The production implementation is [`crate::OctocrabCodeHost`]; tests swap in
//! in-memory fakes.

use crate::error::RemoteError;
use crate::types::{BranchUpdate, CommentReceipt, PullRequest};
use async_trait::async_trait;
use pr_monitor_config::TargetConfig;

/// Transport to the hosted code review platform
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one client can be shared between
/// concurrent requests.
#[async_trait]
pub trait CodeHost: Send + Sync {
    /// Fetch open pull requests authored by `target.user`
    ///
    /// # Arguments
    ///
    /// * `target` - Author and optional repository allow-list
    /// * `limit` - Maximum number of pull requests to return
    ///
    /// # Returns
    ///
    /// At most `limit` pull requests, each with the reconciled CI view of its
    /// head commit.
    async fn fetch_open_pull_requests(
        &self,
        target: &TargetConfig,
        limit: usize,
    ) -> Result<Vec<PullRequest>, RemoteError>;

    /// Post an issue comment on a pull request
    ///
    /// This is how CI commands such as `run buildall` are delivered.
    async fn post_comment(
        &self,
        repo_full_name: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<CommentReceipt, RemoteError>;

    /// Update a PR's head branch with the latest from its base branch
    ///
    /// This is equivalent to clicking "Update branch" in the GitHub UI. A branch
    /// that is already up to date is reported as [`BranchUpdate::AlreadyUpToDate`],
    /// not as an error.
    async fn request_branch_update(
        &self,
        repo_full_name: &str,
        pr_number: u64,
    ) -> Result<BranchUpdate, RemoteError>;
}
