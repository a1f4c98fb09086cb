//! Caller-facing error taxonomy.
//!
//! Every subsystem defines its own `thiserror` enum and maps it into
//! [`ServiceError`] at the service boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Typed reason attached to `FailedPrecondition`, sufficient for a caller to
/// decide remediation (top up, refresh, stop retrying).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Balance too low; recoverable by topping up.
    InsufficientFunds,
    /// The offer or task changed underneath the caller.
    WrongState,
    /// The task is no longer accepting offers or assignment.
    TaskNotOpen,
    /// The helper is not approved for the task's category.
    CategoryIneligible,
    /// The helper has not agreed to the poster's counter price.
    CounterNotAgreed,
    /// The dispute was already resolved with different terms.
    AlreadyResolved,
    /// The referenced user has no account.
    UserNotFound,
}

impl FailureReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientFunds => "insufficient_funds",
            Self::WrongState => "wrong_state",
            Self::TaskNotOpen => "task_not_open",
            Self::CategoryIneligible => "category_ineligible",
            Self::CounterNotAgreed => "counter_not_agreed",
            Self::AlreadyResolved => "already_resolved",
            Self::UserNotFound => "user_not_found",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned to authenticated callers.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum ServiceError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("failed precondition: {0}")]
    FailedPrecondition(FailureReason),

    #[error("internal: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable status code string.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::FailedPrecondition(_) => "failed_precondition",
            Self::Internal(_) => "internal",
        }
    }

    /// The precondition reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Self::FailedPrecondition(reason) => Some(*reason),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_precondition(&self, reason: FailureReason) -> bool {
        self.reason() == Some(reason)
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::InvalidArgument(err.to_string())
    }
}

/// Structural problem with a document or request payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("inconsistent document: {0}")]
    Inconsistent(String),
}

/// Rejects blank identifiers.
pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(())
    }
}

/// Rejects identifiers that cannot be used as a single path segment.
pub fn validate_entity_id(field: &'static str, value: &str) -> Result<(), ValidationError> {
    require_non_empty(field, value)?;
    if value.len() > 128 || value.contains('/') {
        return Err(ValidationError::InvalidField {
            field,
            reason: "must be at most 128 characters without '/'".into(),
        });
    }
    Ok(())
}
