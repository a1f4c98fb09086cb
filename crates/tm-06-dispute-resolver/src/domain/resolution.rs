//! Dispute requests and outcomes.

use crate::domain::DisputeError;
use shared_types::{AuditRecord, DisputeDoc};

/// Request to open a dispute between a poster and a helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDispute {
    pub dispute_id: String,
    pub poster_id: String,
    pub helper_id: String,
    pub task_id: Option<String>,
    pub reason: Option<String>,
}

/// Admin decision on a dispute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub resolution: String,
    pub poster_delta: i64,
    pub helper_delta: i64,
    pub notes: Option<String>,
}

impl Resolution {
    pub fn validate(&self) -> Result<(), DisputeError> {
        if self.resolution.trim().is_empty() {
            return Err(DisputeError::Invalid("resolution is required".into()));
        }
        if self.poster_delta == i64::MIN || self.helper_delta == i64::MIN {
            return Err(DisputeError::Invalid("delta out of range".into()));
        }
        Ok(())
    }

    /// Whether `dispute` was already resolved with exactly this decision.
    #[must_use]
    pub fn matches(&self, dispute: &DisputeDoc) -> bool {
        dispute.resolution.as_deref() == Some(self.resolution.trim())
            && dispute.poster_delta == self.poster_delta
            && dispute.helper_delta == self.helper_delta
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOutcome {
    pub dispute: DisputeDoc,
    pub audit: AuditRecord,
    /// False for an identical replay of an earlier resolution.
    pub applied: bool,
    /// Balances after the adjustment, for the parties whose delta was non-zero.
    pub poster_balance: Option<u64>,
    pub helper_balance: Option<u64>,
}
