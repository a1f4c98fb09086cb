//! Error types for category eligibility.

use shared_types::{FailureReason, ServiceError};
use thiserror::Error;
use tm_01_document_store::StoreError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EligibilityError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Proof not found: {0}")]
    ProofNotFound(String),

    #[error("Invalid category: {0:?}")]
    InvalidCategory(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<EligibilityError> for ServiceError {
    fn from(err: EligibilityError) -> Self {
        match err {
            EligibilityError::UserNotFound(_) => {
                ServiceError::FailedPrecondition(FailureReason::UserNotFound)
            }
            EligibilityError::ProofNotFound(id) => ServiceError::NotFound(format!("category_proofs/{id}")),
            EligibilityError::InvalidCategory(_) => ServiceError::InvalidArgument(err.to_string()),
            EligibilityError::Store(e) => e.into(),
        }
    }
}
