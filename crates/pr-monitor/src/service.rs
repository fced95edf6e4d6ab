//! Pull request listing and CI action orchestration
//!
//! `PullRequestService` sits between callers (CLI, web layer) and a
//! [`CodeHost`]. Listings are cached per target for one polling interval;
//! trigger commands are deduplicated for [`DEDUP_TTL_SECONDS`] so that the same
//! comment is not posted twice in quick succession.

use crate::error::ServiceError;
use log::{debug, info, warn};
use pr_monitor_cache::ExpiringCache;
use pr_monitor_client::{BranchUpdate, CodeHost, PullRequest, COMMAND_CHOICES};
use pr_monitor_config::{AppConfig, TargetConfig};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Mutex as AsyncMutex;

/// How long an identical trigger command is suppressed
pub const DEDUP_TTL_SECONDS: i64 = 120;

/// Maximum number of pull requests fetched per target
pub const DEFAULT_FETCH_LIMIT: usize = 50;

/// Command posted after a branch update
pub const REBASE_RERUN_COMMAND: &str = "run buildall";

const COMMAND_PREFIX: &str = "run ";

/// Outcome of an action request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Ok,
    /// Identical command was triggered within the dedup window
    Skipped,
}

/// Result of `trigger_command`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub status: ActionStatus,
    pub message: String,
}

impl ActionResult {
    fn triggered(command: &str) -> Self {
        Self {
            status: ActionStatus::Ok,
            message: format!("Triggered '{}'", command),
        }
    }

    fn skipped() -> Self {
        Self {
            status: ActionStatus::Skipped,
            message: "Command already triggered recently.".to_string(),
        }
    }
}

/// Result of `rebase_and_rerun`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebaseResult {
    pub status: ActionStatus,
    pub update: BranchUpdate,
    pub rerun: ActionResult,
}

fn listing_key(label: &str) -> String {
    format!("prs:{}", label)
}

fn action_key(repo_full_name: &str, pr_number: u64, command: &str) -> String {
    format!("rerun:{}#{}:{}", repo_full_name, pr_number, command)
}

/// Monitor service over a code host
///
/// Owns its caches; two services never share listings or dedup state.
///
/// # Example
///
/// ```rust,ignore
/// let host = OctocrabCodeHost::from_config(&config.github)?;
/// let service = PullRequestService::from_config(host, &config);
///
/// let prs = service.list_pull_requests("alice").await?;
/// service.trigger_command("alice", "apache/doris", 42, "run p0").await?;
/// ```
pub struct PullRequestService<C> {
    host: C,
    targets: Vec<TargetConfig>,
    listing_ttl_seconds: i64,
    fetch_limit: usize,
    listings: ExpiringCache<Arc<Vec<PullRequest>>>,
    recent_actions: ExpiringCache<()>,
    /// One lock per label so concurrent misses share a single fetch
    fetch_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    /// Bumped on every invalidation; a fetch only caches its result if the
    /// generation it started under is still current
    generations: Mutex<HashMap<String, u64>>,
}

/// Releases a dedup claim on drop unless the command was delivered
struct ClaimGuard<'a> {
    cache: &'a ExpiringCache<()>,
    key: &'a str,
    delivered: bool,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if !self.delivered {
            debug!("Releasing dedup claim {}", self.key);
            self.cache.invalidate(self.key);
        }
    }
}

impl<C: CodeHost> PullRequestService<C> {
    /// Create a service
    ///
    /// # Arguments
    ///
    /// * `host` - Transport used for every remote call
    /// * `targets` - Configured targets, looked up by label
    /// * `polling_interval_seconds` - Lifetime of a cached listing
    pub fn new(host: C, targets: Vec<TargetConfig>, polling_interval_seconds: u64) -> Self {
        Self {
            host,
            targets,
            listing_ttl_seconds: i64::try_from(polling_interval_seconds).unwrap_or(i64::MAX),
            fetch_limit: DEFAULT_FETCH_LIMIT,
            listings: ExpiringCache::new(),
            recent_actions: ExpiringCache::new(),
            fetch_locks: Mutex::new(HashMap::new()),
            generations: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(host: C, config: &AppConfig) -> Self {
        Self::new(
            host,
            config.targets.clone(),
            config.polling.interval_seconds,
        )
    }

    /// Override the per-target fetch limit
    pub fn with_fetch_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = limit;
        self
    }

    pub fn host(&self) -> &C {
        &self.host
    }

    pub fn targets(&self) -> &[TargetConfig] {
        &self.targets
    }

    pub fn target(&self, label: &str) -> Result<&TargetConfig, ServiceError> {
        self.targets
            .iter()
            .find(|t| t.label == label)
            .ok_or_else(|| ServiceError::UnknownTarget(label.to_string()))
    }

    /// Commands offered to users, in display order
    pub fn available_commands(&self) -> &'static [&'static str] {
        COMMAND_CHOICES
    }

    /// Drop the cached listing so the next `list_pull_requests` fetches
    pub fn invalidate_listing(&self, label: &str) -> bool {
        let mut generations = self.lock_generations();
        *generations.entry(label.to_string()).or_default() += 1;
        self.listings.invalidate(&listing_key(label))
    }

    fn lock_generations(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self, label: &str) -> u64 {
        self.lock_generations().get(label).copied().unwrap_or_default()
    }

    /// Cache a fetched listing unless it was invalidated while in flight
    fn store_listing(&self, label: &str, started_at: u64, prs: &Arc<Vec<PullRequest>>) {
        // Held across the write so an invalidation cannot slip in between
        let generations = self.lock_generations();
        if generations.get(label).copied().unwrap_or_default() != started_at {
            debug!("Listing for {} invalidated during fetch, not caching", label);
            return;
        }
        self.listings
            .set(listing_key(label), Arc::clone(prs), self.listing_ttl_seconds);
    }

    fn fetch_lock(&self, label: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .fetch_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(label.to_string()).or_default())
    }

    /// List open pull requests for a target
    ///
    /// A cached listing is returned as-is until the polling interval elapses
    /// or an action on the target invalidates it.
    ///
    /// # Errors
    ///
    /// `UnknownTarget` when no target has `label`; remote failures otherwise.
    pub async fn list_pull_requests(
        &self,
        label: &str,
    ) -> Result<Arc<Vec<PullRequest>>, ServiceError> {
        let key = listing_key(label);
        if let Some(cached) = self.listings.get(&key) {
            debug!("Cache HIT for {} ({:?})", key, self.listings.stats());
            return Ok(cached);
        }

        let target = self.target(label)?;
        let lock = self.fetch_lock(label);
        let _guard = lock.lock().await;

        // Another caller may have filled the cache while we waited
        if let Some(cached) = self.listings.get(&key) {
            debug!("Cache HIT for {} after waiting on fetch", key);
            return Ok(cached);
        }

        debug!("Cache MISS for {}, fetching ({:?})", key, self.listings.stats());
        let started_at = self.generation(label);
        let prs = Arc::new(
            self.host
                .fetch_open_pull_requests(target, self.fetch_limit)
                .await?,
        );
        self.store_listing(label, started_at, &prs);
        info!("Fetched {} open PRs for {}", prs.len(), label);
        Ok(prs)
    }

    /// Post a CI command as a PR comment
    ///
    /// The command is trimmed and must start with `run `. An identical command
    /// for the same PR within [`DEDUP_TTL_SECONDS`] is skipped without
    /// contacting the host. If posting fails, or the call is dropped before the
    /// post completes, the dedup window is released so the command can be
    /// retried right away.
    pub async fn trigger_command(
        &self,
        label: &str,
        repo_full_name: &str,
        pr_number: u64,
        command: &str,
    ) -> Result<ActionResult, ServiceError> {
        let command = command.trim();
        if !command.starts_with(COMMAND_PREFIX) {
            return Err(ServiceError::InvalidCommand(command.to_string()));
        }

        let purged = self.recent_actions.purge_expired();
        if purged > 0 {
            debug!("Purged {} expired dedup entries", purged);
        }

        let key = action_key(repo_full_name, pr_number, command);
        if !self.recent_actions.claim(key.clone(), (), DEDUP_TTL_SECONDS) {
            warn!(
                "Skipping '{}' on {}#{}: already triggered recently",
                command, repo_full_name, pr_number
            );
            return Ok(ActionResult::skipped());
        }

        // Dropping this future mid-post releases the claim as well
        let mut claim = ClaimGuard {
            cache: &self.recent_actions,
            key: &key,
            delivered: false,
        };
        if let Err(e) = self
            .host
            .post_comment(repo_full_name, pr_number, command)
            .await
        {
            warn!(
                "Failed to trigger '{}' on {}#{}: {}",
                command, repo_full_name, pr_number, e
            );
            return Err(e.into());
        }
        claim.delivered = true;

        self.invalidate_listing(label);
        info!(
            "Triggered '{}' on {}#{}",
            command, repo_full_name, pr_number
        );
        Ok(ActionResult::triggered(command))
    }

    /// Update the PR branch, then trigger `run buildall`
    ///
    /// A failed branch update aborts before anything is posted. A branch that
    /// is already up to date still gets the rerun.
    pub async fn rebase_and_rerun(
        &self,
        label: &str,
        repo_full_name: &str,
        pr_number: u64,
    ) -> Result<RebaseResult, ServiceError> {
        let update = self
            .host
            .request_branch_update(repo_full_name, pr_number)
            .await?;
        if update == BranchUpdate::AlreadyUpToDate {
            info!("{}#{} is already up to date", repo_full_name, pr_number);
        }

        let rerun = self
            .trigger_command(label, repo_full_name, pr_number, REBASE_RERUN_COMMAND)
            .await?;

        Ok(RebaseResult {
            status: ActionStatus::Ok,
            update,
            rerun,
        })
    }
}
