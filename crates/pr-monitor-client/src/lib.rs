//! GitHub transport and CI signal reconciliation
//!
//! This crate provides the trait-based client the monitor service talks to,
//! and the pure logic that turns a GraphQL search payload into pull request
//! snapshots with one reconciled CI view per pull request.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 CodeHost trait                   │
//! │  - fetch_open_pull_requests()                    │
//! │  - post_comment()                                │
//! │  - request_branch_update()                       │
//! └──────────────────────────────────────────────────┘
//!                        │
//!                        ▼
//! ┌──────────────────────────────────────────────────┐
//! │ OctocrabCodeHost (GraphQL search + REST)         │
//! └──────────────────────────────────────────────────┘
//!                        │ search nodes
//!                        ▼
//! ┌──────────────────┐   ┌───────────────────────────┐
//! │ graphql (typed   │──►│ reconcile (status + check │
//! │ payload)         │   │ runs, via mapping)        │
//! └──────────────────┘   └───────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use pr_monitor_client::{CodeHost, OctocrabCodeHost};
//! use pr_monitor_config::{GitHubConfig, TargetConfig};
//!
//! # async fn example() -> Result<(), pr_monitor_client::RemoteError> {
//! let client = OctocrabCodeHost::from_config(&GitHubConfig {
//!     token: "token".to_string(),
//!     api_base: "https://api.github.com".to_string(),
//!     web_base: "https://github.com".to_string(),
//! })?;
//!
//! let target = TargetConfig {
//!     label: "alice".to_string(),
//!     user: "alice".to_string(),
//!     repos: vec!["apache/doris".to_string()],
//! };
//! for pr in client.fetch_open_pull_requests(&target, 50).await? {
//!     println!("#{} {} ({})", pr.number, pr.title, pr.status_badge);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod graphql;
pub mod mapping;
pub mod octocrab_client;
pub mod reconcile;
pub mod types;

pub use client::CodeHost;
pub use error::RemoteError;
pub use mapping::{suggest_command, COMMAND_CHOICES};
pub use octocrab_client::OctocrabCodeHost;
pub use reconcile::reconcile;
pub use types::{BranchUpdate, CommentReceipt, PipelineSource, PipelineStatus, PullRequest};
