//! Service-level errors

use pr_monitor_client::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// No configured target has this label
    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    /// Trigger commands must start with `run `
    #[error("Command must start with 'run ', got '{0}'")]
    InvalidCommand(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl ServiceError {
    /// Whether the caller sent a bad request (as opposed to a remote failure)
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::UnknownTarget(_) | Self::InvalidCommand(_))
    }
}
