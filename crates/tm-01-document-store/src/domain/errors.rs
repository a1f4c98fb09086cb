//! Error types for the document store.

use shared_types::{DocPath, ServiceError};
use thiserror::Error;

/// Errors from store reads, commits and transactions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A document or collection observed by the transaction changed before
    /// commit. Retried by `StoreClient::run_transaction`.
    #[error("Write conflict on {0}")]
    Conflict(String),

    /// A required document does not exist.
    #[error("Document not found: {0}")]
    NotFound(DocPath),

    /// A stored document failed to decode or validate.
    #[error("Corrupt document at {path}: {reason}")]
    CorruptDocument { path: DocPath, reason: String },

    /// A document written by the transaction failed validation.
    #[error("Invalid document for {path}: {reason}")]
    InvalidDocument { path: DocPath, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Conflicts persisted for every allowed attempt.
    #[error("Transaction retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(path) => ServiceError::NotFound(path.to_string()),
            StoreError::InvalidDocument { .. } => ServiceError::InvalidArgument(err.to_string()),
            StoreError::Conflict(_)
            | StoreError::CorruptDocument { .. }
            | StoreError::Serialization(_)
            | StoreError::RetriesExhausted { .. }
            | StoreError::Unavailable(_) => ServiceError::Internal(err.to_string()),
        }
    }
}
