//! Failures at the remote boundary.

use quill_shared::{ErrorResponse, FieldIssue};
use thiserror::Error;

/// Why a remote call did not produce an entity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    #[error("validation failed: {}", describe_issues(.0))]
    Validation(Vec<FieldIssue>),

    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("request timed out")]
    Timeout,
}

fn describe_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.field, i.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl RemoteError {
    /// Map a non-success status and its (possibly absent) problem body.
    pub fn from_status(status: u16, body: Option<ErrorResponse>) -> Self {
        let message = body
            .as_ref()
            .map(|b| b.describe().to_string())
            .unwrap_or_else(|| format!("HTTP {status}"));

        match status {
            400 => match body.and_then(|b| b.errors) {
                Some(issues) if !issues.is_empty() => Self::Validation(issues),
                _ => Self::Status { status, message },
            },
            401 => Self::Unauthenticated,
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::Status { status, message },
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
