//! # Collaborator Ports
//!
//! Outbound contracts for the external collaborators the core hands work to
//! after commit. None of them is ever called inside a transaction, and a
//! failure never rolls back the operation that produced the event.

use async_trait::async_trait;
use thiserror::Error;
use tm_03_task_lifecycle::ModerationVerdict;

use crate::adapters::chat::ChatMessage;
use crate::adapters::notifications::Notification;

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("collaborator rejected the request: {0}")]
    Rejected(String),
}

/// Binary content classifier: task text in, safe/unsafe verdict out.
#[async_trait]
pub trait ContentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<ModerationVerdict, CollaboratorError>;
}

/// Push delivery. The dispatcher owns channel selection, fan-out to devices
/// and pruning of stale targets.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: &Notification) -> Result<(), CollaboratorError>;
}

/// Mirrors negotiation moves into the poster/helper chat thread.
#[async_trait]
pub trait ChatMirror: Send + Sync {
    async fn post(&self, message: &ChatMessage) -> Result<(), CollaboratorError>;
}
