//! pr-monitor service layer
//!
//! Ties the GitHub client, the expiring cache and the configuration together:
//! - [`PullRequestService`] lists open pull requests per target and triggers
//!   CI commands with deduplication
//! - [`render`] formats listings and action results for the terminal

pub mod error;
pub mod render;
pub mod service;

pub use error::ServiceError;
pub use service::{
    ActionResult, ActionStatus, PullRequestService, RebaseResult, DEDUP_TTL_SECONDS,
    DEFAULT_FETCH_LIMIT, REBASE_RERUN_COMMAND,
};
