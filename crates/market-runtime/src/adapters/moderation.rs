//! Content classifier adapters.

use async_trait::async_trait;
use tm_03_task_lifecycle::ModerationVerdict;
use tracing::debug;

use crate::adapters::ports::{CollaboratorError, ContentClassifier};

/// Classifier used when no moderation backend is configured: everything is safe.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopClassifier;

#[async_trait]
impl ContentClassifier for NoopClassifier {
    async fn classify(&self, text: &str) -> Result<ModerationVerdict, CollaboratorError> {
        debug!(chars = text.len(), "No classifier configured, treating text as safe");
        Ok(ModerationVerdict::Safe)
    }
}
