//! Operation payloads.
//!
//! None of these carries the acting user: the caller's identity comes only
//! from the envelope. Ids that appear here name *other* parties or entities.

use serde::{Deserialize, Serialize};
use shared_types::{ProofMode, ProofStatus};
use tm_03_task_lifecycle::TaskPayload;

/// Create, update or publish a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task_id: String,
    #[serde(flatten)]
    pub task: TaskPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub task_id: String,
}

/// Admin decision on a task held for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub task_id: String,
    pub reinstate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUpRequest {
    pub amount: u64,
    /// Client-chosen retry key; the same key never credits twice.
    #[serde(default)]
    pub idempotency_key: Option<String>,
    /// Wallet to credit, admin only. Defaults to the caller.
    #[serde(default)]
    pub target_uid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOfferRequest {
    pub task_id: String,
    pub offer_id: String,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRef {
    pub offer_id: String,
}

/// Price proposal from either side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRequest {
    pub offer_id: String,
    pub price: u64,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectOfferRequest {
    pub offer_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteRequest {
    pub helper_id: String,
    pub category_id: String,
    #[serde(default)]
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofSubmission {
    pub category_id: String,
    #[serde(default)]
    pub mode: ProofMode,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofReview {
    pub uid: String,
    pub category_id: String,
    pub status: ProofStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicApprovalRequest {
    pub uid: String,
    pub status: ProofStatus,
}

/// Target of an eligibility recompute; the caller when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeRequest {
    #[serde(default)]
    pub uid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenDisputeRequest {
    pub dispute_id: String,
    pub poster_id: String,
    pub helper_id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveDisputeRequest {
    pub dispute_id: String,
    pub resolution: String,
    #[serde(default)]
    pub poster_delta: i64,
    #[serde(default)]
    pub helper_delta: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_request_is_flat_on_the_wire() {
        let req: TaskRequest = serde_json::from_value(serde_json::json!({
            "task_id": "T1",
            "title": "Fix sink",
            "category_id": "plumbing",
            "budget": 1500
        }))
        .unwrap();
        assert_eq!(req.task_id, "T1");
        assert_eq!(req.task.title, "Fix sink");
        assert_eq!(req.task.budget, Some(1500));
    }

    #[test]
    fn test_resolve_request_defaults() {
        let req: ResolveDisputeRequest = serde_json::from_value(serde_json::json!({
            "dispute_id": "D1",
            "resolution": "no action"
        }))
        .unwrap();
        assert_eq!((req.poster_delta, req.helper_delta), (0, 0));
    }
}
