//! Error types for the wallet ledger.

use shared_types::{FailureReason, ServiceError};
use thiserror::Error;
use tm_01_document_store::StoreError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Recoverable by the caller topping up.
    #[error("Insufficient funds for {uid}: balance {balance}, required {required}")]
    InsufficientFunds {
        uid: String,
        balance: u64,
        required: u64,
    },

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The idempotency key is already bound to an entry of another user.
    #[error("Idempotency key {key} belongs to {owner}")]
    KeyConflict { key: String, owner: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for ServiceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds { .. } => {
                ServiceError::FailedPrecondition(FailureReason::InsufficientFunds)
            }
            LedgerError::UserNotFound(_) => {
                ServiceError::FailedPrecondition(FailureReason::UserNotFound)
            }
            LedgerError::InvalidAmount(_) | LedgerError::KeyConflict { .. } => {
                ServiceError::InvalidArgument(err.to_string())
            }
            LedgerError::Store(e) => e.into(),
        }
    }
}
