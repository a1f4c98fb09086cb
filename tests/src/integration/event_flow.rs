//! # Event Flow
//!
//! Operations publish after commit; the runtime's handlers react on their
//! own tasks. These tests run the full loop with recording collaborators.
//!
//! ```text
//! service op ──commit──▶ bus ──▶ ListingHandler      ──▶ ContentClassifier
//!                              ──▶ NotificationHandler ──▶ NotificationDispatcher
//!                              ──▶ EligibilityHandler  ──▶ recompute
//! ```

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use market_runtime::adapters::{
        ChatMessage, ChatMirror, CollaboratorError, ContentClassifier, Notification,
        NotificationDispatcher, NotificationKind,
    };
    use market_runtime::service::{ProofReview, ProofSubmission};
    use market_runtime::{Collaborators, MarketConfig, MarketRuntime};
    use parking_lot::Mutex;
    use shared_bus::{EventFilter, EventTopic, MarketEvent};
    use shared_types::{ProofMode, ProofStatus, TaskStatus};
    use tm_03_task_lifecycle::ModerationVerdict;

    use crate::fixtures::*;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    /// Flags any text mentioning "scam".
    struct KeywordClassifier;

    #[async_trait]
    impl ContentClassifier for KeywordClassifier {
        async fn classify(&self, text: &str) -> Result<ModerationVerdict, CollaboratorError> {
            if text.to_lowercase().contains("scam") {
                Ok(ModerationVerdict::Unsafe {
                    reason: Some("keyword".into()),
                })
            } else {
                Ok(ModerationVerdict::Safe)
            }
        }
    }

    #[derive(Default)]
    struct Outbox {
        notifications: Mutex<Vec<Notification>>,
        chat: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl NotificationDispatcher for Outbox {
        async fn dispatch(&self, notification: &Notification) -> Result<(), CollaboratorError> {
            self.notifications.lock().push(notification.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl ChatMirror for Outbox {
        async fn post(&self, message: &ChatMessage) -> Result<(), CollaboratorError> {
            self.chat.lock().push(message.clone());
            Ok(())
        }
    }

    fn runtime(market: &Market, outbox: Arc<Outbox>) -> MarketRuntime {
        let runtime = MarketRuntime::with_container(
            Arc::clone(&market.container),
            Collaborators {
                classifier: Arc::new(KeywordClassifier),
                dispatcher: outbox.clone(),
                chat: outbox,
            },
        );
        runtime.start();
        runtime
    }

    /// Polls `check` until it holds or two seconds pass.
    async fn eventually(check: impl Fn() -> bool) -> bool {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    }

    // =========================================================================
    // MODERATION
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_flagged_listing_goes_under_review() {
        let market = Market::new();
        let outbox = Arc::new(Outbox::default());
        let mut tasks = market
            .container
            .event_bus
            .subscribe(EventFilter::topics(vec![EventTopic::Tasks]));
        let runtime = runtime(&market, outbox);

        market.account("P", 1000).await;
        let call = user("P", task_request("T1", "Totally not a scam"));
        let correlation_id = call.correlation_id;
        market.service.publish_task(call).await.unwrap();

        let flagged = eventually(|| {
            market
                .container
                .tasks
                .get("T1")
                .ok()
                .flatten()
                .is_some_and(|t| t.status == TaskStatus::UnderReview)
        })
        .await;
        assert!(flagged);

        // The follow-up carries the publish call's correlation id.
        let mut seen_review = false;
        while let Ok(Some(record)) = tasks.try_recv() {
            if let MarketEvent::TaskStatusChanged {
                to: TaskStatus::UnderReview,
                ..
            } = record.event
            {
                assert_eq!(record.correlation_id, Some(correlation_id));
                seen_review = true;
            }
        }
        assert!(seen_review);

        // Post fee was charged once by the gated publish, not again.
        assert_eq!(market.balance("P"), 980);
        runtime.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_clean_listing_stays_listed() {
        let market = Market::new();
        let runtime = runtime(&market, Arc::new(Outbox::default()));

        market.account("P", 1000).await;
        market.listed_task("P", "T1").await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let task = market.container.tasks.get("T1").unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Listed);
        runtime.shutdown().await;
    }

    // =========================================================================
    // NOTIFICATIONS AND CHAT
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_new_offer_reaches_poster_and_chat() {
        let market = Market::new();
        let outbox = Arc::new(Outbox::default());
        let runtime = runtime(&market, outbox.clone());

        market.account("P", 1000).await;
        market.account("H", 100).await;
        market.listed_task("P", "T1").await;
        market.offer("H", "T1", "O1", 1500).await;

        let notified = eventually(|| {
            outbox
                .notifications
                .lock()
                .iter()
                .any(|n| n.kind == NotificationKind::NewOffer && n.target_uid == "P")
        })
        .await;
        assert!(notified);

        let mirrored = eventually(|| !outbox.chat.lock().is_empty()).await;
        assert!(mirrored);
        assert_eq!(outbox.chat.lock()[0].chat_id, "T1_H_P");

        runtime.shutdown().await;
    }

    // =========================================================================
    // ELIGIBILITY
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_approval_converges_without_explicit_recompute() {
        let market = Market::new();
        let runtime = runtime(&market, Arc::new(Outbox::default()));

        market.account("H", 0).await;
        market
            .service
            .submit_category_proof(user(
                "H",
                ProofSubmission {
                    category_id: "Home Cleaning".into(),
                    mode: ProofMode::Online,
                    notes: None,
                },
            ))
            .await
            .unwrap();
        market
            .service
            .review_category_proof(admin(ProofReview {
                uid: "H".into(),
                category_id: "home cleaning".into(),
                status: ProofStatus::Approved,
                notes: None,
            }))
            .await
            .unwrap();

        let converged = eventually(|| {
            market
                .container
                .eligibility
                .allowed("H")
                .is_ok_and(|allowed| allowed.contains("home_cleaning"))
        })
        .await;
        assert!(converged);

        runtime.shutdown().await;
    }

    // =========================================================================
    // LAGGING HANDLERS
    // =========================================================================

    /// Single-threaded so the handlers cannot run until the test yields: the
    /// burst below overruns the bus before any of them reads a record.
    #[tokio::test]
    async fn test_lagging_handlers_converge_from_store() {
        let mut config = MarketConfig::default();
        config.bus.capacity = 4;
        let market = Market::with_config(config);
        let runtime = runtime(&market, Arc::new(Outbox::default()));

        market.account("P", 100).await;
        market.account("H", 0).await;
        market
            .service
            .submit_category_proof(user(
                "H",
                ProofSubmission {
                    category_id: "plumbing".into(),
                    mode: ProofMode::Online,
                    notes: None,
                },
            ))
            .await
            .unwrap();
        market
            .service
            .review_category_proof(admin(ProofReview {
                uid: "H".into(),
                category_id: "plumbing".into(),
                status: ProofStatus::Approved,
                notes: None,
            }))
            .await
            .unwrap();
        market
            .service
            .create_listed_task(user("P", task_request("T1", "Fix sink")))
            .await
            .unwrap();
        for i in 0..6 {
            market.account(&format!("U{i}"), 10).await;
        }

        let converged = eventually(|| {
            let allowed = market
                .container
                .eligibility
                .allowed("H")
                .is_ok_and(|allowed| allowed.contains("plumbing"));
            let settled = market
                .container
                .tasks
                .get("T1")
                .ok()
                .flatten()
                .is_some_and(|t| t.post_fee_txn_id.is_some());
            allowed && settled
        })
        .await;
        assert!(converged);
        assert_eq!(market.balance("P"), 80);

        runtime.shutdown().await;
    }
}
