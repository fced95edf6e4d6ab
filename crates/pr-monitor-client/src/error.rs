//! Errors raised while talking to GitHub

use std::time::Duration;
use thiserror::Error;

/// Maximum number of characters of a response body kept in an error
pub const MAX_ERROR_BODY_CHARS: usize = 500;

/// Failure of a remote call
///
/// Every variant is a remote failure from the caller's point of view; nothing
/// in this crate retries, callers decide whether to try again.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// GitHub answered with a non-success status
    #[error("GitHub API error while {action}: {status} {body}")]
    Status {
        action: String,
        status: u16,
        /// Response body, truncated to [`MAX_ERROR_BODY_CHARS`]
        body: String,
    },

    /// 403 with an `X-RateLimit-Reset` header
    #[error("GitHub rate limit exceeded for {action}; resets at {reset_at}.")]
    RateLimited {
        action: String,
        /// Raw header value (unix seconds)
        reset_at: String,
    },

    /// HTTP success, but the GraphQL payload carried an `errors` collection
    #[error("GitHub GraphQL errors: {}", .errors.join("; "))]
    GraphQl { errors: Vec<String> },

    /// The request never produced a response
    #[error("network error while {action}: {message}")]
    Transport { action: String, message: String },

    #[error("{action} timed out after {}s", .after.as_secs())]
    Timeout { action: String, after: Duration },

    /// The response could not be decoded into the expected shape
    #[error("unexpected response while {action}: {message}")]
    Decode { action: String, message: String },

    /// Repository names must look like `owner/name`
    #[error("invalid repository name '{0}', expected owner/name")]
    InvalidRepository(String),
}

impl RemoteError {
    /// HTTP status associated with this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(403),
            _ => None,
        }
    }

    /// When the rate limit resets, for rate limit errors
    pub fn reset_at(&self) -> Option<&str> {
        match self {
            Self::RateLimited { reset_at, .. } => Some(reset_at),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Keep at most [`MAX_ERROR_BODY_CHARS`] characters of `body`
pub(crate) fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body() {
        let long = "é".repeat(MAX_ERROR_BODY_CHARS + 10);
        assert_eq!(truncate_body(&long).chars().count(), MAX_ERROR_BODY_CHARS);
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn test_status_accessors() {
        let err = RemoteError::RateLimited {
            action: "comment on PR #1".to_string(),
            reset_at: "1700000000".to_string(),
        };
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.reset_at(), Some("1700000000"));
        assert!(err.is_rate_limited());
        assert_eq!(
            err.to_string(),
            "GitHub rate limit exceeded for comment on PR #1; resets at 1700000000."
        );

        let err = RemoteError::GraphQl {
            errors: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "GitHub GraphQL errors: a; b");
    }
}
