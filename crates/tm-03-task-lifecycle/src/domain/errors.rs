//! Error types for the task lifecycle.

use shared_types::{FailureReason, ServiceError, TaskStatus};
use thiserror::Error;
use tm_01_document_store::StoreError;
use tm_02_wallet_ledger::LedgerError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("User {uid} does not own task {task_id}")]
    NotOwner { task_id: String, uid: String },

    #[error("User {uid} is not the helper assigned to task {task_id}")]
    NotAssignedHelper { task_id: String, uid: String },

    #[error("Task {task_id} is {status}; cannot {action}")]
    WrongState {
        task_id: String,
        status: TaskStatus,
        action: &'static str,
    },

    /// The task no longer accepts offers or assignment.
    #[error("Task {task_id} is not open (status {status})")]
    NotOpen { task_id: String, status: TaskStatus },

    #[error("Invalid task payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<TaskError> for ServiceError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::NotFound(id) => ServiceError::NotFound(format!("tasks/{id}")),
            TaskError::NotOwner { .. } | TaskError::NotAssignedHelper { .. } => {
                ServiceError::PermissionDenied(err.to_string())
            }
            TaskError::WrongState { .. } => ServiceError::FailedPrecondition(FailureReason::WrongState),
            TaskError::NotOpen { .. } => ServiceError::FailedPrecondition(FailureReason::TaskNotOpen),
            TaskError::InvalidPayload(_) => ServiceError::InvalidArgument(err.to_string()),
            TaskError::Ledger(e) => e.into(),
            TaskError::Store(e) => e.into(),
        }
    }
}
