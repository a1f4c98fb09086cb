//! Reactions to a task reaching the board.
//!
//! 1. Post-fee safety net: a listing that skipped the gated publish is
//!    charged now, or deleted when the poster cannot pay.
//! 2. Moderation: the task text goes to the [`ContentClassifier`]; an unsafe
//!    verdict holds the task for admin review.
//!
//! Reinstated listings were already charged and reviewed, so both steps are
//! skipped for them. After lost records every unsettled task in the store is
//! put through the safety net.

use std::sync::Arc;

use async_trait::async_trait;
use market_telemetry::metric_inc;
use market_telemetry::metrics::{COLLABORATOR_FAILURES, TASK_TRANSITIONS};
use shared_bus::{EventRecord, ListingPath, MarketEvent};
use shared_types::{LedgerKind, TaskStatus};
use tm_02_wallet_ledger::keys;
use tm_03_task_lifecycle::{ModerationOutcome, SettleOutcome, TaskTransition};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{follow_up_id, EventHandler};
use crate::adapters::ContentClassifier;
use crate::service::{task_status_changed, MarketplaceService};

/// Reason recorded on a `task_removed` event from the safety net.
pub const UNPAID_POST_FEE: &str = "post fee unpaid";

pub struct ListingHandler {
    service: MarketplaceService,
    classifier: Arc<dyn ContentClassifier>,
}

impl ListingHandler {
    pub fn new(service: MarketplaceService, classifier: Arc<dyn ContentClassifier>) -> Self {
        Self {
            service,
            classifier,
        }
    }

    /// Returns false when the task no longer exists.
    async fn settle(&self, correlation_id: Uuid, task_id: &str, poster_id: &str) -> bool {
        let outcome = match self.service.container().tasks.settle_post_fee(task_id) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(task_id, error = %e, "Post fee settlement failed");
                return true;
            }
        };
        match outcome {
            SettleOutcome::Charged { fee, balance } => {
                self.service
                    .emit_posting(
                        correlation_id,
                        poster_id,
                        LedgerKind::PostFee,
                        keys::post_fee(task_id),
                        -(fee as i64),
                        balance,
                    )
                    .await;
                true
            }
            SettleOutcome::Removed { poster_id, .. } => {
                self.service
                    .emit(
                        correlation_id,
                        MarketEvent::TaskRemoved {
                            task_id: task_id.to_string(),
                            poster_id,
                            reason: UNPAID_POST_FEE.to_string(),
                        },
                    )
                    .await;
                false
            }
            SettleOutcome::Outstanding { .. }
            | SettleOutcome::AlreadyCharged
            | SettleOutcome::Skipped => true,
        }
    }

    async fn moderate(&self, correlation_id: Uuid, task_id: &str) {
        let tasks = &self.service.container().tasks;
        let text = match tasks.moderation_text(task_id) {
            Ok(Some(text)) => text,
            Ok(None) => return,
            Err(e) => {
                warn!(task_id, error = %e, "Could not read task for moderation");
                return;
            }
        };

        let verdict = match self.classifier.classify(&text).await {
            Ok(verdict) => verdict,
            Err(e) => {
                metric_inc!(COLLABORATOR_FAILURES, &["classifier"]);
                warn!(task_id, error = %e, "Content classifier failed; task stays listed");
                return;
            }
        };

        match tasks.moderate(task_id, &verdict) {
            Ok(ModerationOutcome::Flagged(task)) => {
                metric_inc!(TASK_TRANSITIONS, &[TaskStatus::UnderReview.as_str()]);
                let flagged = TaskTransition {
                    task,
                    from: TaskStatus::Listed,
                };
                self.service
                    .emit(correlation_id, task_status_changed(&flagged))
                    .await;
            }
            Ok(ModerationOutcome::Unchanged) => debug!(task_id, "Moderation passed"),
            Err(e) => warn!(task_id, error = %e, "Applying moderation verdict failed"),
        }
    }
}

#[async_trait]
impl EventHandler for ListingHandler {
    fn name(&self) -> &'static str {
        "listing"
    }

    async fn handle(&mut self, record: &EventRecord) {
        let MarketEvent::TaskListed {
            task_id,
            poster_id,
            via,
        } = &record.event
        else {
            return;
        };
        if *via == ListingPath::Reinstated {
            return;
        }
        let correlation_id = follow_up_id(record);
        if self.settle(correlation_id, task_id, poster_id).await {
            self.moderate(correlation_id, task_id).await;
        }
    }

    async fn reconcile(&mut self, missed: u64) {
        let unsettled = match self.service.container().tasks.unsettled() {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(error = %e, "Could not list unsettled tasks");
                return;
            }
        };
        let correlation_id = Uuid::new_v4();
        for task in &unsettled {
            if self.settle(correlation_id, &task.task_id, &task.poster_id).await
                && task.status == TaskStatus::Listed
            {
                self.moderate(correlation_id, &task.task_id).await;
            }
        }
        info!(missed, tasks = unsettled.len(), "Post fee safety net reconciled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{CollaboratorError, NoopClassifier};
    use crate::service::test_support::*;
    use crate::service::TaskRequest;
    use shared_types::AuthenticatedCall;
    use tm_03_task_lifecycle::{ModerationVerdict, TaskPayload};

    struct Flagging;

    #[async_trait]
    impl ContentClassifier for Flagging {
        async fn classify(&self, _text: &str) -> Result<ModerationVerdict, CollaboratorError> {
            Ok(ModerationVerdict::Unsafe {
                reason: Some("spam".into()),
            })
        }
    }

    struct Down;

    #[async_trait]
    impl ContentClassifier for Down {
        async fn classify(&self, _text: &str) -> Result<ModerationVerdict, CollaboratorError> {
            Err(CollaboratorError::Unavailable("timeout".into()))
        }
    }

    fn request() -> AuthenticatedCall<TaskRequest> {
        as_user(
            "P",
            TaskRequest {
                task_id: "T1".into(),
                task: TaskPayload {
                    title: "Fix sink".into(),
                    description: String::new(),
                    category_id: "plumbing".into(),
                    budget: None,
                },
            },
        )
    }

    fn listed(via: ListingPath) -> EventRecord {
        EventRecord::new(
            MarketEvent::TaskListed {
                task_id: "T1".into(),
                poster_id: "P".into(),
                via,
            },
            1,
            None,
        )
    }

    #[tokio::test]
    async fn test_direct_listing_is_charged_once() {
        let mut h = harness();
        h.funded("P", 100).await;
        h.service.create_listed_task(request()).await.unwrap();
        h.drain();

        let mut handler = ListingHandler::new(h.service.clone(), Arc::new(NoopClassifier));
        handler.handle(&listed(ListingPath::Direct)).await;
        handler.handle(&listed(ListingPath::Direct)).await;

        assert_eq!(h.balance("P"), 80);
        assert!(matches!(
            &h.drain()[..],
            [MarketEvent::WalletMutated { kind: LedgerKind::PostFee, amount: -20, balance: 80, .. }]
        ));
    }

    #[tokio::test]
    async fn test_unpaid_listing_is_removed() {
        let mut h = harness();
        h.funded("P", 5).await;
        h.service.create_listed_task(request()).await.unwrap();
        h.drain();

        let mut handler = ListingHandler::new(h.service.clone(), Arc::new(Flagging));
        handler.handle(&listed(ListingPath::Direct)).await;

        assert!(h.service.container().tasks.get("T1").unwrap().is_none());
        assert_eq!(h.balance("P"), 5);
        assert!(matches!(
            &h.drain()[..],
            [MarketEvent::TaskRemoved { reason, .. }] if reason == UNPAID_POST_FEE
        ));
    }

    #[tokio::test]
    async fn test_listing_accepted_before_settlement_still_pays() {
        let mut h = harness();
        h.funded("P", 100).await;
        h.funded("H", 100).await;
        let container = h.service.container().clone();
        container
            .eligibility
            .submit_proof("H", "plumbing", Default::default(), None)
            .unwrap();
        container
            .eligibility
            .review_proof("ops", "H", "plumbing", shared_types::ProofStatus::Approved, None)
            .unwrap();
        container.eligibility.recompute("H").unwrap();
        h.service.create_listed_task(request()).await.unwrap();
        container.offers.submit_offer("H", "T1", "O1", 300).unwrap();
        container.offers.accept_offer("P", "O1").unwrap();
        h.drain();

        let mut handler = ListingHandler::new(h.service.clone(), Arc::new(Flagging));
        handler.handle(&listed(ListingPath::Direct)).await;

        let task = container.tasks.get("T1").unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Assigned);
        assert_eq!(h.balance("P"), 80);
        assert!(container.ledger.entry("post_fee:T1").unwrap().is_some());
        assert!(matches!(
            &h.drain()[..],
            [MarketEvent::WalletMutated { kind: LedgerKind::PostFee, amount: -20, .. }]
        ));
    }

    #[tokio::test]
    async fn test_reconcile_settles_missed_listings() {
        let mut h = harness();
        h.funded("P", 100).await;
        h.funded("Q", 5).await;
        let container = h.service.container().clone();
        h.service.create_listed_task(request()).await.unwrap();
        container
            .tasks
            .create_listed(
                "Q",
                "T2",
                &TaskPayload {
                    title: "Walk dog".into(),
                    description: String::new(),
                    category_id: "pets".into(),
                    budget: None,
                },
            )
            .unwrap();
        h.drain();

        // Both task_listed records were lost; only the lag notice arrives.
        let mut handler = ListingHandler::new(h.service.clone(), Arc::new(NoopClassifier));
        handler.reconcile(2).await;

        assert_eq!(h.balance("P"), 80);
        assert!(container.tasks.get("T2").unwrap().is_none());
        assert!(container.tasks.unsettled().unwrap().is_empty());
        let events = h.drain();
        assert!(events.iter().any(|e| matches!(
            e,
            MarketEvent::WalletMutated { kind: LedgerKind::PostFee, amount: -20, .. }
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            MarketEvent::TaskRemoved { reason, .. } if reason == UNPAID_POST_FEE
        )));
    }

    #[tokio::test]
    async fn test_unsafe_text_goes_under_review() {
        let mut h = harness();
        h.funded("P", 1000).await;
        h.service.publish_task(request()).await.unwrap();
        h.drain();

        let mut handler = ListingHandler::new(h.service.clone(), Arc::new(Flagging));
        handler.handle(&listed(ListingPath::Publish)).await;

        let task = h.service.container().tasks.get("T1").unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::UnderReview);
        assert!(matches!(
            &h.drain()[..],
            [MarketEvent::TaskStatusChanged { from: TaskStatus::Listed, to: TaskStatus::UnderReview, .. }]
        ));
    }

    #[tokio::test]
    async fn test_reinstated_listing_is_left_alone() {
        let mut h = harness();
        h.funded("P", 1000).await;
        h.service.publish_task(request()).await.unwrap();
        h.drain();

        let mut handler = ListingHandler::new(h.service.clone(), Arc::new(Flagging));
        handler.handle(&listed(ListingPath::Reinstated)).await;

        let task = h.service.container().tasks.get("T1").unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Listed);
        assert!(h.drain().is_empty());
    }

    #[tokio::test]
    async fn test_classifier_outage_keeps_listing() {
        let mut h = harness();
        h.funded("P", 1000).await;
        h.service.publish_task(request()).await.unwrap();
        h.drain();

        let mut handler = ListingHandler::new(h.service.clone(), Arc::new(Down));
        handler.handle(&listed(ListingPath::Publish)).await;

        let task = h.service.container().tasks.get("T1").unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Listed);
        assert!(h.drain().is_empty());
    }
}
