//! Error types for offer negotiation.

use shared_types::{FailureReason, OfferAction, OfferStatus, ServiceError};
use thiserror::Error;
use tm_01_document_store::StoreError;
use tm_02_wallet_ledger::LedgerError;
use tm_03_task_lifecycle::TaskError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OfferError {
    #[error("Offer not found: {0}")]
    NotFound(String),

    /// Caller is neither the side allowed to perform `action`.
    #[error("User {uid} may not {action} offer {offer_id}")]
    NotParticipant {
        offer_id: String,
        uid: String,
        action: OfferAction,
    },

    #[error("Offer {offer_id} is {from}; cannot {action}")]
    InvalidTransition {
        offer_id: String,
        from: OfferStatus,
        action: OfferAction,
    },

    #[error("Helper has not agreed to the counter on offer {0}")]
    CounterNotAgreed(String),

    #[error("Helper {uid} is not eligible for category {category_id}")]
    CategoryIneligible { uid: String, category_id: String },

    #[error("Price must be positive")]
    InvalidPrice,

    #[error("User {0} cannot deal with themselves")]
    SelfDealing(String),

    #[error("Invalid category: {0:?}")]
    InvalidCategory(String),

    #[error("Offer id {0} belongs to another offer")]
    OfferIdTaken(String),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<OfferError> for ServiceError {
    fn from(err: OfferError) -> Self {
        match err {
            OfferError::NotFound(id) => ServiceError::NotFound(format!("offers/{id}")),
            OfferError::NotParticipant { .. } => ServiceError::PermissionDenied(err.to_string()),
            OfferError::InvalidTransition { .. } => {
                ServiceError::FailedPrecondition(FailureReason::WrongState)
            }
            OfferError::CounterNotAgreed(_) => {
                ServiceError::FailedPrecondition(FailureReason::CounterNotAgreed)
            }
            OfferError::CategoryIneligible { .. } => {
                ServiceError::FailedPrecondition(FailureReason::CategoryIneligible)
            }
            OfferError::InvalidPrice
            | OfferError::SelfDealing(_)
            | OfferError::InvalidCategory(_)
            | OfferError::OfferIdTaken(_) => ServiceError::InvalidArgument(err.to_string()),
            OfferError::Task(e) => e.into(),
            OfferError::Ledger(e) => e.into(),
            OfferError::Store(e) => e.into(),
        }
    }
}
