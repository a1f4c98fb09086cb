//! Error types for dispute resolution.

use shared_types::{FailureReason, ServiceError};
use thiserror::Error;
use tm_01_document_store::StoreError;
use tm_02_wallet_ledger::LedgerError;
use tm_03_task_lifecycle::TaskError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DisputeError {
    #[error("Dispute not found: {0}")]
    NotFound(String),

    #[error("Dispute {0} is already resolved")]
    AlreadyResolved(String),

    #[error("User {uid} is not a party to dispute {dispute_id}")]
    NotParty { dispute_id: String, uid: String },

    #[error("Dispute parties do not match task {task_id}")]
    PartiesMismatch { task_id: String },

    #[error("Dispute id {0} belongs to another dispute")]
    DisputeIdTaken(String),

    #[error("Invalid dispute: {0}")]
    Invalid(String),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DisputeError> for ServiceError {
    fn from(err: DisputeError) -> Self {
        match err {
            DisputeError::NotFound(id) => ServiceError::NotFound(format!("disputes/{id}")),
            DisputeError::AlreadyResolved(_) => {
                ServiceError::FailedPrecondition(FailureReason::AlreadyResolved)
            }
            DisputeError::NotParty { .. } => ServiceError::PermissionDenied(err.to_string()),
            DisputeError::PartiesMismatch { .. }
            | DisputeError::DisputeIdTaken(_)
            | DisputeError::Invalid(_) => ServiceError::InvalidArgument(err.to_string()),
            DisputeError::Task(e) => e.into(),
            DisputeError::Ledger(e) => e.into(),
            DisputeError::Store(e) => e.into(),
        }
    }
}
