//! Shared error types for the services crate.

use thiserror::Error;

use assess_core::model::ActivityError;
use assess_core::LedgerError;

use crate::sessions::SessionPhase;

/// Errors emitted while fetching or normalizing an activity.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error("not authorized to load content")]
    Unauthorized,
    #[error("content service returned status {status}")]
    Status {
        status: u16,
        message: Option<String>,
    },
    #[error("malformed activity payload: {0}")]
    Malformed(String),
    #[error("activity has no units after normalization")]
    Empty,
    #[error("content request aborted: {0}")]
    Aborted(String),
    #[error(transparent)]
    Invalid(#[from] ActivityError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by the scoring client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("not authorized to submit")]
    Unauthorized,
    #[error("scoring service returned status {status}")]
    Status {
        status: u16,
        message: Option<String>,
    },
    #[error("malformed scoring response: {0}")]
    Malformed(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while reading service configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("ASSESS_BASE_URL is not set")]
    MissingBaseUrl,
    #[error("invalid base url {raw}: {reason}")]
    InvalidBaseUrl { raw: String, reason: String },
    #[error("base url must use http or https, got {0}")]
    UnsupportedScheme(String),
    #[error("timeout must be a positive number of seconds, got {0}")]
    InvalidTimeout(String),
}

/// Why a session action was defensively refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Rejection {
    #[error("{answered} of {total} questions answered")]
    Incomplete { answered: usize, total: usize },
    #[error("action does not apply to this activity kind")]
    WrongActivityKind,
    #[error("lesson can only be finished from its last slide")]
    NotOnFinalUnit,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Session-level error taxonomy surfaced to the hosting shell.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    /// Load-time and fatal; recover with a full retry from `Loading`.
    #[error("content unavailable{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    ContentUnavailable {
        status: Option<u16>,
        message: Option<String>,
    },
    /// Terminates the session; the shell should re-authenticate.
    #[error("not authorized")]
    Unauthorized,
    /// Recoverable; the ledger is kept and the learner may retry.
    #[error("submission failed: {0}")]
    SubmissionFailed(String),
    #[error("rejected: {0}")]
    ValidationRejected(#[from] Rejection),
    #[error("cannot {action} while {phase:?}")]
    InvalidPhase {
        phase: SessionPhase,
        action: &'static str,
    },
    #[error("session is closed")]
    Closed,
}

impl SessionError {
    /// Whether a `retry` command can recover the session from this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::SubmissionFailed(_) | SessionError::ContentUnavailable { .. }
        )
    }
}

impl From<ContentError> for SessionError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Unauthorized => SessionError::Unauthorized,
            ContentError::Status { status, message } => SessionError::ContentUnavailable {
                status: Some(status),
                message,
            },
            other => SessionError::ContentUnavailable {
                status: None,
                message: Some(other.to_string()),
            },
        }
    }
}

impl From<ScoringError> for SessionError {
    fn from(err: ScoringError) -> Self {
        match err {
            ScoringError::Unauthorized => SessionError::Unauthorized,
            ScoringError::Status {
                status,
                message: Some(message),
            } => SessionError::SubmissionFailed(format!("{status}: {message}")),
            other => SessionError::SubmissionFailed(other.to_string()),
        }
    }
}

impl From<LedgerError> for SessionError {
    fn from(err: LedgerError) -> Self {
        SessionError::ValidationRejected(Rejection::Ledger(err))
    }
}
