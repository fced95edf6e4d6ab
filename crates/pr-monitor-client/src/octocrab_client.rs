//! Octocrab-based code host client
//!
//! Direct implementation of the `CodeHost` trait on top of octocrab's raw
//! request methods. The raw methods hand back the HTTP response untouched,
//! which lets this module classify status codes and rate limit headers itself.
//! Octocrab's retry layer is disabled; every call is a single round trip bounded
//! by a timeout.

use crate::client::CodeHost;
use crate::error::{truncate_body, RemoteError};
use crate::graphql::{
    build_search_query, GraphQlResponse, SearchConnection, SearchData, SEARCH_PR_QUERY,
};
use crate::types::{BranchUpdate, CommentReceipt, PullRequest};
use async_trait::async_trait;
use http::{Method, StatusCode, Uri};
use log::{debug, info};
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::Octocrab;
use pr_monitor_config::{GitHubConfig, TargetConfig};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Timeout for comment and branch update calls
pub const MUTATION_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for one search page (larger payload)
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(20);

const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Status, relevant headers and body of one response
#[derive(Debug)]
struct RawResponse {
    status: StatusCode,
    rate_limit_reset: Option<String>,
    body: String,
}

impl RawResponse {
    /// Map non-success responses to errors; 304 counts as success
    fn error_for_status(self, action: &str) -> Result<Self, RemoteError> {
        if self.status == StatusCode::NOT_MODIFIED || self.status.is_success() {
            return Ok(self);
        }
        if self.status == StatusCode::FORBIDDEN {
            if let Some(reset_at) = self.rate_limit_reset {
                return Err(RemoteError::RateLimited {
                    action: action.to_string(),
                    reset_at,
                });
            }
        }
        Err(RemoteError::Status {
            action: action.to_string(),
            status: self.status.as_u16(),
            body: truncate_body(&self.body),
        })
    }

    fn is_not_modified(&self) -> bool {
        self.status == StatusCode::NOT_MODIFIED
    }

    fn json<T: for<'de> Deserialize<'de>>(&self, action: &str) -> Result<T, RemoteError> {
        serde_json::from_str(&self.body).map_err(|e| RemoteError::Decode {
            action: action.to_string(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiComment {
    id: u64,
    html_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

/// Direct GitHub client using octocrab
#[derive(Debug, Clone)]
pub struct OctocrabCodeHost {
    octocrab: Arc<Octocrab>,
    api_base: String,
    graphql_url: String,
    mutation_timeout: Duration,
    search_timeout: Duration,
}

impl OctocrabCodeHost {
    /// Create a client around an existing octocrab instance
    ///
    /// `api_base` is the REST root (e.g. `https://api.github.com`); GraphQL is
    /// served from `{api_base}/graphql` unless `api_base` already ends there.
    pub fn new(octocrab: Arc<Octocrab>, api_base: &str) -> Self {
        let trimmed = api_base.trim_end_matches('/');
        let graphql_url = if trimmed.ends_with("/graphql") {
            trimmed.to_string()
        } else {
            format!("{}/graphql", trimmed)
        };
        Self {
            octocrab,
            api_base: trimmed.to_string(),
            graphql_url,
            mutation_timeout: MUTATION_TIMEOUT,
            search_timeout: SEARCH_TIMEOUT,
        }
    }

    /// Replace the default per-call timeouts
    pub fn with_timeouts(mut self, mutation: Duration, search: Duration) -> Self {
        self.mutation_timeout = mutation;
        self.search_timeout = search;
        self
    }

    /// Build an authenticated client from configuration
    pub fn from_config(config: &GitHubConfig) -> Result<Self, RemoteError> {
        let build_error = |e: octocrab::Error| RemoteError::Transport {
            action: "building GitHub client".to_string(),
            message: e.to_string(),
        };
        let octocrab = Octocrab::builder()
            .personal_token(config.token.clone())
            .base_uri(config.api_base.as_str())
            .map_err(build_error)?
            .add_retry_config(RetryConfig::None)
            .build()
            .map_err(build_error)?;
        info!("GitHub client created for {}", config.api_base);
        Ok(Self::new(Arc::new(octocrab), &config.api_base))
    }

    /// Get a reference to the underlying octocrab instance
    pub fn octocrab(&self) -> &Octocrab {
        &self.octocrab
    }

    pub fn graphql_url(&self) -> &str {
        &self.graphql_url
    }

    fn parse_uri(url: &str, action: &str) -> Result<Uri, RemoteError> {
        url.parse::<Uri>().map_err(|e| RemoteError::Transport {
            action: action.to_string(),
            message: format!("invalid URL {}: {}", url, e),
        })
    }

    /// Send one request with a timeout and read the full response
    async fn send(
        &self,
        method: Method,
        uri: Uri,
        body: Option<&Value>,
        action: &str,
        timeout: Duration,
    ) -> Result<RawResponse, RemoteError> {
        let transport = |e: octocrab::Error| RemoteError::Transport {
            action: action.to_string(),
            message: e.to_string(),
        };
        let exchange = async {
            let response = if method == Method::PUT {
                self.octocrab._put(uri, body).await
            } else {
                self.octocrab._post(uri, body).await
            }
            .map_err(transport)?;

            let status = response.status();
            let rate_limit_reset = response
                .headers()
                .get(RATE_LIMIT_RESET_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let body = self
                .octocrab
                .body_to_string(response)
                .await
                .map_err(transport)?;
            Ok::<_, RemoteError>(RawResponse {
                status,
                rate_limit_reset,
                body,
            })
        };

        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| RemoteError::Timeout {
                action: action.to_string(),
                after: timeout,
            })?
    }

    /// Fetch one search page; `None` when GitHub answered 304
    async fn search_page(
        &self,
        query: &str,
        cursor: Option<&str>,
    ) -> Result<Option<SearchConnection>, RemoteError> {
        let action = "GraphQL query";
        let uri = Self::parse_uri(&self.graphql_url, action)?;
        let payload = json!({
            "query": SEARCH_PR_QUERY,
            "variables": { "query": query, "cursor": cursor },
        });

        let response = self
            .send(Method::POST, uri, Some(&payload), action, self.search_timeout)
            .await?
            .error_for_status(action)?;
        if response.is_not_modified() {
            return Ok(None);
        }

        let envelope: GraphQlResponse<SearchData> = response.json(action)?;
        Ok(Some(envelope.into_data(action)?.search))
    }
}

/// Split `owner/name`
fn split_repo(repo_full_name: &str) -> Result<(&str, &str), RemoteError> {
    match repo_full_name.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => Ok((owner, repo)),
        _ => Err(RemoteError::InvalidRepository(repo_full_name.to_string())),
    }
}

#[async_trait]
impl CodeHost for OctocrabCodeHost {
    async fn fetch_open_pull_requests(
        &self,
        target: &TargetConfig,
        limit: usize,
    ) -> Result<Vec<PullRequest>, RemoteError> {
        let query = build_search_query(target);
        debug!("Searching PRs for target {}: {}", target.label, query);

        let mut collected = Vec::new();
        let mut cursor: Option<String> = None;

        while collected.len() < limit {
            let Some(search) = self.search_page(&query, cursor.as_deref()).await? else {
                debug!("Search for {} not modified, stopping", target.label);
                break;
            };

            for edge in search.edges {
                if let Some(node) = edge.into_pull_request_node()? {
                    collected.push(node.into_pull_request());
                    if collected.len() >= limit {
                        break;
                    }
                }
            }

            match search.page_info.end_cursor {
                Some(next) if search.page_info.has_next_page => cursor = Some(next),
                _ => break,
            }
        }

        debug!("Fetched {} PRs for target {}", collected.len(), target.label);
        Ok(collected)
    }

    async fn post_comment(
        &self,
        repo_full_name: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<CommentReceipt, RemoteError> {
        let (owner, repo) = split_repo(repo_full_name)?;
        let action = format!("comment on PR #{}", pr_number);
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_base, owner, repo, pr_number
        );
        let uri = Self::parse_uri(&url, &action)?;
        let payload = json!({ "body": body });

        let response = self
            .send(Method::POST, uri, Some(&payload), &action, self.mutation_timeout)
            .await?
            .error_for_status(&action)?;
        if response.is_not_modified() {
            return Ok(CommentReceipt::default());
        }

        let comment: ApiComment = response.json(&action)?;
        info!("Commented on {}#{}: {}", repo_full_name, pr_number, body);
        Ok(CommentReceipt {
            id: Some(comment.id),
            html_url: comment.html_url,
        })
    }

    async fn request_branch_update(
        &self,
        repo_full_name: &str,
        pr_number: u64,
    ) -> Result<BranchUpdate, RemoteError> {
        let (owner, repo) = split_repo(repo_full_name)?;
        let action = format!("update branch for PR #{}", pr_number);
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/update-branch",
            self.api_base, owner, repo, pr_number
        );
        let uri = Self::parse_uri(&url, &action)?;

        let response = self
            .send(Method::PUT, uri, None, &action, self.mutation_timeout)
            .await?;

        if response.status == StatusCode::UNPROCESSABLE_ENTITY {
            info!("Update branch skipped for {}#{}", repo_full_name, pr_number);
            return Ok(BranchUpdate::AlreadyUpToDate);
        }

        let response = response.error_for_status(&action)?;
        let message = if response.is_not_modified() || response.body.trim().is_empty() {
            None
        } else {
            response.json::<ApiMessage>(&action)?.message
        };
        info!("Requested branch update for {}#{}", repo_full_name, pr_number);
        Ok(BranchUpdate::Requested { message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: u16, reset: Option<&str>, body: &str) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            rate_limit_reset: reset.map(str::to_string),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_split_repo() {
        assert_eq!(split_repo("apache/doris").unwrap(), ("apache", "doris"));
        assert!(matches!(
            split_repo("doris"),
            Err(RemoteError::InvalidRepository(_))
        ));
        assert!(split_repo("/doris").is_err());
        assert!(split_repo("apache/").is_err());
    }

    #[test]
    fn test_success_and_not_modified_pass() {
        assert!(raw(200, None, "{}").error_for_status("x").is_ok());
        assert!(raw(201, None, "{}").error_for_status("x").is_ok());
        assert!(raw(304, None, "").error_for_status("x").is_ok());
    }

    #[test]
    fn test_forbidden_with_reset_is_rate_limit() {
        let err = raw(403, Some("1700000000"), "rate limited")
            .error_for_status("GraphQL query")
            .unwrap_err();
        assert_eq!(err.reset_at(), Some("1700000000"));
    }

    #[test]
    fn test_forbidden_without_reset_is_status_error() {
        let err = raw(403, None, "forbidden").error_for_status("x").unwrap_err();
        assert_eq!(
            err,
            RemoteError::Status {
                action: "x".to_string(),
                status: 403,
                body: "forbidden".to_string()
            }
        );
    }

    #[test]
    fn test_error_body_is_truncated() {
        let err = raw(500, None, &"x".repeat(2000))
            .error_for_status("x")
            .unwrap_err();
        match err {
            RemoteError::Status { body, .. } => assert_eq!(body.len(), 500),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_graphql_url_derivation() {
        let octocrab = Arc::new(Octocrab::builder().build().unwrap());
        let host = OctocrabCodeHost::new(Arc::clone(&octocrab), "https://api.github.com/");
        assert_eq!(host.graphql_url(), "https://api.github.com/graphql");

        let host = OctocrabCodeHost::new(octocrab, "https://ghe.example.com/api/graphql");
        assert_eq!(host.graphql_url(), "https://ghe.example.com/api/graphql");
    }
}
