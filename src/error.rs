//! Error types for the data-access layer.
//!
//! Every failure the pipeline can surface is a [`EuroparlError`] variant.
//! Callers branch on [`EuroparlError::kind()`] or
//! [`EuroparlError::status_code()`]: a status code means the remote rejected
//! the request, no status code means the pipeline itself gave up (timeout,
//! size limit, transport failure).

use std::fmt;
use std::time::Duration;

/// Errors produced while fetching from the European Parliament API.
#[derive(Debug, thiserror::Error)]
pub enum EuroparlError {
    // Pipeline-level failures
    #[error("request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("response exceeded {limit} bytes")]
    SizeLimitExceeded { limit: u64, received: u64 },

    #[error("attempt cancelled")]
    Cancelled,

    // Network/remote failures
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Coarse classification of [`EuroparlError`] for callers and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Timeout,
    RateLimitDenied,
    TransientNetwork,
    RemoteRejection,
    SizeLimitExceeded,
    Cancelled,
    InvalidResponse,
    InvalidInput,
    Configuration,
}

impl ErrorKind {
    /// Stable snake_case name, used as the `kind` metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::RateLimitDenied => "rate_limited",
            ErrorKind::TransientNetwork => "network",
            ErrorKind::RemoteRejection => "remote_rejection",
            ErrorKind::SizeLimitExceeded => "size_limit",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EuroparlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EuroparlError::Timeout { .. } => ErrorKind::Timeout,
            EuroparlError::RateLimited { .. } => ErrorKind::RateLimitDenied,
            EuroparlError::SizeLimitExceeded { .. } => ErrorKind::SizeLimitExceeded,
            EuroparlError::Cancelled => ErrorKind::Cancelled,
            EuroparlError::Http(_) => ErrorKind::TransientNetwork,
            EuroparlError::Api { .. } => ErrorKind::RemoteRejection,
            EuroparlError::Json(_) => ErrorKind::InvalidResponse,
            EuroparlError::InvalidInput(_) => ErrorKind::InvalidInput,
            EuroparlError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Whether a fresh attempt could plausibly succeed.
    ///
    /// Connection-level failures and 5xx responses are transient. Timeouts
    /// are deliberately excluded: the orchestrator never retries them.
    /// 4xx responses and oversized bodies would fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            EuroparlError::Http(_) => true,
            EuroparlError::Api { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }

    /// HTTP status of a remote rejection, `None` for pipeline-level failures.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            EuroparlError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Structured error payload returned by the remote, if any.
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            EuroparlError::Api { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    /// Suggested wait before the next admission attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            EuroparlError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Convert into the error shown at the tool boundary.
    pub fn into_tool_error(self, operation: impl Into<String>) -> ToolError {
        ToolError {
            operation: operation.into(),
            kind: self.kind(),
            status_code: self.status_code(),
            message: self.to_string(),
        }
    }
}

impl From<reqwest::Error> for EuroparlError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => EuroparlError::Api {
                status: status.as_u16(),
                message: err.to_string(),
                details: None,
            },
            None => EuroparlError::Http(err.to_string()),
        }
    }
}

/// A fetch failure as reported to a tool caller.
///
/// Names the operation that failed and carries a readable message; the
/// underlying error chain stays inside the crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed: {message}")]
pub struct ToolError {
    pub operation: String,
    pub kind: ErrorKind,
    pub status_code: Option<u16>,
    pub message: String,
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, EuroparlError>;
