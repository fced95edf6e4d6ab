//! GraphQL search query and typed response payload
//!
//! The search returns a page of issue nodes. Nodes are decoded into the
//! structs below before any normalization happens, so a malformed payload is
//! rejected here instead of surfacing as a missing field deep in the
//! reconciliation code.

use crate::error::RemoteError;
use crate::reconcile::reconcile;
use crate::types::PullRequest;
use chrono::{DateTime, Utc};
use pr_monitor_config::TargetConfig;
use serde::Deserialize;
use serde_json::Value;

/// Number of search results requested per page
pub const PAGE_SIZE: usize = 20;

/// Search for pull requests with the head commit's CI signals
pub const SEARCH_PR_QUERY: &str = r#"
query ($query: String!, $cursor: String) {
  search(query: $query, type: ISSUE, first: 20, after: $cursor) {
    issueCount
    pageInfo {
      hasNextPage
      endCursor
    }
    edges {
      node {
        ... on PullRequest {
          number
          title
          url
          updatedAt
          mergeable
          mergeStateStatus
          isDraft
          author {
            login
          }
          repository {
            nameWithOwner
          }
          commits(last: 1) {
            nodes {
              commit {
                oid
                status {
                  state
                  contexts {
                    context
                    state
                    targetUrl
                    description
                  }
                }
                checkSuites(first: 10) {
                  nodes {
                    status
                    conclusion
                    checkRuns(first: 10) {
                      nodes {
                        name
                        status
                        conclusion
                        detailsUrl
                      }
                    }
                  }
                }
              }
            }
          }
        }
      }
    }
  }
}
"#;

/// Build the search string for a target
///
/// `is:open` already excludes merged pull requests.
pub fn build_search_query(target: &TargetConfig) -> String {
    let mut parts = vec![
        "is:pr".to_string(),
        "is:open".to_string(),
        format!("author:{}", target.user),
    ];
    parts.extend(target.repos.iter().map(|repo| format!("repo:{}", repo)));
    parts.join(" ")
}

/// Top-level GraphQL envelope
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<Value>>,
}

impl<T> GraphQlResponse<T> {
    /// Fail on any `errors` entry, otherwise return `data`
    pub fn into_data(self, action: &str) -> Result<T, RemoteError> {
        if let Some(errors) = self.errors {
            return Err(RemoteError::GraphQl {
                errors: errors.iter().map(error_message).collect(),
            });
        }
        self.data.ok_or_else(|| RemoteError::Decode {
            action: action.to_string(),
            message: "response has no data".to_string(),
        })
    }
}

fn error_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

#[derive(Debug, Deserialize)]
pub struct SearchData {
    pub search: SearchConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConnection {
    pub page_info: PageInfo,
    #[serde(default)]
    pub edges: Vec<SearchEdge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// Search hits are issues and pull requests; issue nodes come back as `{}`
#[derive(Debug, Deserialize)]
pub struct SearchEdge {
    pub node: Option<Value>,
}

impl SearchEdge {
    /// Decode the node, returning `None` for non pull request hits
    pub fn into_pull_request_node(self) -> Result<Option<PullRequestNode>, RemoteError> {
        match self.node {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) if map.is_empty() => Ok(None),
            Some(node) => serde_json::from_value(node)
                .map(Some)
                .map_err(|e| RemoteError::Decode {
                    action: "decoding pull request node".to_string(),
                    message: e.to_string(),
                }),
        }
    }
}

/// GraphQL connection wrapper (`{ nodes: [...] }`)
#[derive(Debug, Deserialize)]
pub struct Connection<T> {
    pub nodes: Option<Vec<T>>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self { nodes: None }
    }
}

impl<T> Connection<T> {
    pub fn nodes(&self) -> &[T] {
        self.nodes.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestNode {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub updated_at: DateTime<Utc>,
    /// `MERGEABLE`, `CONFLICTING` or `UNKNOWN`
    pub mergeable: Option<String>,
    /// `BEHIND`, `BLOCKED`, `CLEAN`, `DIRTY`, `DRAFT`, `HAS_HOOKS`, `UNKNOWN`, `UNSTABLE`
    pub merge_state_status: Option<String>,
    #[serde(default)]
    pub is_draft: bool,
    /// `null` for deleted accounts
    pub author: Option<Actor>,
    pub repository: RepositoryRef,
    pub commits: Option<Connection<CommitNode>>,
}

#[derive(Debug, Deserialize)]
pub struct Actor {
    pub login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRef {
    pub name_with_owner: String,
}

#[derive(Debug, Deserialize)]
pub struct CommitNode {
    pub commit: Commit,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub oid: Option<String>,
    /// Legacy combined status, `null` when no context ever reported
    pub status: Option<StatusRollup>,
    pub check_suites: Option<Connection<CheckSuite>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusRollup {
    pub state: Option<String>,
    pub contexts: Option<Vec<StatusContext>>,
}

/// One legacy commit status context
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusContext {
    pub context: Option<String>,
    pub state: Option<String>,
    pub target_url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSuite {
    pub status: Option<String>,
    pub conclusion: Option<String>,
    pub check_runs: Option<Connection<CheckRun>>,
}

/// One check-suite run
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRun {
    pub name: Option<String>,
    pub status: Option<String>,
    pub conclusion: Option<String>,
    pub details_url: Option<String>,
}

impl Commit {
    pub fn status_contexts(&self) -> &[StatusContext] {
        self.status
            .as_ref()
            .and_then(|s| s.contexts.as_deref())
            .unwrap_or_default()
    }

    /// Check runs of all suites, in suite order
    pub fn check_runs(&self) -> impl Iterator<Item = &CheckRun> {
        self.check_suites
            .iter()
            .flat_map(|suites| suites.nodes())
            .flat_map(|suite| suite.check_runs.iter().flat_map(|runs| runs.nodes()))
    }
}

impl PullRequestNode {
    /// Normalize into the snapshot handed to callers
    pub fn into_pull_request(self) -> PullRequest {
        let merge_state = self
            .merge_state_status
            .clone()
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let merge_state_lower = merge_state.to_lowercase();
        let mergeable_raw = self
            .mergeable
            .as_deref()
            .unwrap_or("UNKNOWN")
            .to_uppercase();
        let mergeable = mergeable_raw == "MERGEABLE";

        let status_badge = if self.is_draft {
            "Draft".to_string()
        } else {
            title_case(&merge_state_lower.replace('_', " "))
        };

        // `commits(last: 1)` returns at most one node; take the last regardless
        let pipelines = self
            .commits
            .as_ref()
            .and_then(|c| c.nodes().last())
            .map(|node| reconcile(node.commit.status_contexts(), node.commit.check_runs()))
            .unwrap_or_default();

        PullRequest {
            number: self.number,
            title: self.title,
            url: self.url,
            repo_full_name: self.repository.name_with_owner,
            author: self
                .author
                .map(|a| a.login)
                .unwrap_or_else(|| "unknown".to_string()),
            updated_at: self.updated_at,
            update_branch_available: mergeable
                && matches!(merge_state_lower.as_str(), "behind" | "unstable"),
            merge_state,
            mergeable,
            has_conflicts: mergeable_raw == "CONFLICTING",
            status_badge,
            pipelines,
        }
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
