//! # Marketplace Flows
//!
//! Whole journeys through the service surface: a poster funds a wallet,
//! publishes, negotiates, assigns, finishes and disputes.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use market_runtime::service::{
        CounterRequest, OfferRef, OpenDisputeRequest, ResolveDisputeRequest, TaskRef, TopUpRequest,
    };
    use market_runtime::MarketConfig;
    use shared_bus::MarketEvent;
    use shared_types::{
        DisputeStatus, FailureReason, LedgerKind, OfferStatus, ServiceError, TaskStatus,
    };
    use tm_04_offer_negotiation::InsufficientFundsPolicy;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    /// P (1000 coins) has T1 listed; H (100 coins) is approved for plumbing
    /// and has offered 1500 as O1.
    async fn negotiating() -> Market {
        let mut market = Market::new();
        market.account("P", 1000).await;
        market.account("H", 100).await;
        market.approve("H", "plumbing");
        market.listed_task("P", "T1").await;
        market.offer("H", "T1", "O1", 1500).await;
        market.drain();
        market
    }

    fn precondition(err: &ServiceError) -> Option<FailureReason> {
        err.reason()
    }

    // =========================================================================
    // HAPPY PATH
    // =========================================================================

    #[tokio::test]
    async fn test_full_task_journey() {
        let mut market = negotiating().await;

        // Poster counters, helper agrees, poster accepts at the counter price.
        market
            .service
            .propose_counter(user(
                "P",
                CounterRequest {
                    offer_id: "O1".into(),
                    price: 1300,
                    note: Some("materials included".into()),
                },
            ))
            .await
            .unwrap();
        market
            .service
            .agree_to_counter(user("H", OfferRef { offer_id: "O1".into() }))
            .await
            .unwrap();
        let outcome = market
            .service
            .accept_offer(user("P", OfferRef { offer_id: "O1".into() }))
            .await
            .unwrap();
        assert!(outcome.is_accepted());
        assert_eq!(outcome.offer().status, OfferStatus::Accepted);

        let task = market.container.tasks.get("T1").unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Assigned);
        assert_eq!(task.assigned_helper_id.as_deref(), Some("H"));
        assert_eq!(task.final_amount, Some(1300));

        // Helper paid the acceptance fee, poster only the post fee.
        assert_eq!(market.balance("H"), 75);
        assert_eq!(market.balance("P"), 980);

        market
            .service
            .start_work(user("H", TaskRef { task_id: "T1".into() }))
            .await
            .unwrap();
        let done = market
            .service
            .complete_task(user("P", TaskRef { task_id: "T1".into() }))
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Completed);

        let statuses: Vec<_> = market
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                MarketEvent::TaskStatusChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![TaskStatus::Assigned, TaskStatus::InProgress, TaskStatus::Completed]
        );
    }

    #[tokio::test]
    async fn test_dispute_resolution_moves_coins_once() {
        let mut market = negotiating().await;
        market
            .service
            .accept_offer(user("P", OfferRef { offer_id: "O1".into() }))
            .await
            .unwrap();
        market.drain();

        market
            .service
            .open_dispute(user(
                "H",
                OpenDisputeRequest {
                    dispute_id: "D1".into(),
                    poster_id: "P".into(),
                    helper_id: "H".into(),
                    task_id: Some("T1".into()),
                    reason: Some("scope changed".into()),
                },
            ))
            .await
            .unwrap();

        let resolve = ResolveDisputeRequest {
            dispute_id: "D1".into(),
            resolution: "partial refund".into(),
            poster_delta: -40,
            helper_delta: 40,
            notes: None,
        };
        let outcome = market.service.resolve_dispute(admin(resolve.clone())).await.unwrap();
        assert!(outcome.applied);
        assert_eq!(outcome.dispute.status, DisputeStatus::Resolved);
        assert_eq!(market.balance("P"), 940);
        assert_eq!(market.balance("H"), 115);

        let replay = market.service.resolve_dispute(admin(resolve)).await.unwrap();
        assert!(!replay.applied);
        assert_eq!(market.balance("P"), 940);

        let audited = market.container.disputes.audit_for("D1").unwrap();
        assert!(audited.is_some());

        let adjustments = market
            .drain()
            .into_iter()
            .filter(|e| {
                matches!(e, MarketEvent::WalletMutated { kind: LedgerKind::DisputeAdjustment, .. })
            })
            .count();
        assert_eq!(adjustments, 2);
    }

    // =========================================================================
    // FAILURE PATHS
    // =========================================================================

    #[tokio::test]
    async fn test_poor_helper_is_rejected_then_succeeds_after_top_up() {
        let mut market = Market::new();
        market.account("P", 1000).await;
        market.account("H", 10).await;
        market.approve("H", "plumbing");
        market.listed_task("P", "T1").await;
        market.offer("H", "T1", "O1", 1500).await;

        let err = market
            .service
            .accept_offer(user("P", OfferRef { offer_id: "O1".into() }))
            .await
            .unwrap_err();
        assert_eq!(precondition(&err), Some(FailureReason::InsufficientFunds));
        assert_eq!(market.balance("H"), 10);
        let offer = market.container.offers.get("O1").unwrap().unwrap();
        assert_eq!(offer.status, OfferStatus::Pending);

        market
            .service
            .top_up_coins(user(
                "H",
                TopUpRequest {
                    amount: 50,
                    idempotency_key: Some("card-1".into()),
                    target_uid: None,
                },
            ))
            .await
            .unwrap();
        let outcome = market
            .service
            .accept_offer(user("P", OfferRef { offer_id: "O1".into() }))
            .await
            .unwrap();
        assert!(outcome.is_accepted());
        assert_eq!(market.balance("H"), 35);
    }

    #[tokio::test]
    async fn test_hold_policy_lapses_back_to_pending() {
        let mut config = MarketConfig::default();
        config.offers.insufficient_funds = InsufficientFundsPolicy::HoldForTopUp;
        let grace = config.offers.top_up_grace_ms;

        let mut market = Market::with_config(config);
        market.account("P", 1000).await;
        market.account("H", 0).await;
        market.approve("H", "plumbing");
        market.listed_task("P", "T1").await;
        market.offer("H", "T1", "O1", 1500).await;

        let outcome = market
            .service
            .accept_offer(user("P", OfferRef { offer_id: "O1".into() }))
            .await
            .unwrap();
        assert!(!outcome.is_accepted());
        assert_eq!(outcome.offer().status, OfferStatus::AwaitingTopup);

        market.time.advance(grace + 1);
        let offer = market.container.offers.get("O1").unwrap().unwrap();
        assert_eq!(offer.status, OfferStatus::Pending);
        let task = market.container.tasks.get("T1").unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Listed);
    }

    #[tokio::test]
    async fn test_unapproved_helper_cannot_be_accepted() {
        let mut market = Market::new();
        market.account("P", 1000).await;
        market.account("H", 100).await;
        market.listed_task("P", "T1").await;

        // Offers are open to anyone; eligibility is enforced at acceptance.
        market.offer("H", "T1", "O1", 1500).await;

        let err = market
            .service
            .accept_offer(user("P", OfferRef { offer_id: "O1".into() }))
            .await
            .unwrap_err();
        assert_eq!(precondition(&err), Some(FailureReason::CategoryIneligible));
        assert_eq!(market.balance("H"), 100);
    }

    #[tokio::test]
    async fn test_only_the_poster_may_accept() {
        let mut market = negotiating().await;
        market.account("X", 1000).await;

        let err = market
            .service
            .accept_offer(user("X", OfferRef { offer_id: "O1".into() }))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));

        let err = market
            .service
            .accept_offer(user("H", OfferRef { offer_id: "O1".into() }))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_publish_below_minimum_balance_changes_nothing() {
        let mut market = Market::new();
        market.account("P", 100).await;
        market.drain();

        let err = market
            .service
            .publish_task(user("P", task_request("T1", "Fix sink")))
            .await
            .unwrap_err();
        assert_eq!(precondition(&err), Some(FailureReason::InsufficientFunds));
        assert_eq!(market.balance("P"), 100);
        assert!(market.container.tasks.get("T1").unwrap().is_none());
        assert!(market.drain().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_task_takes_no_more_offers() {
        let mut market = negotiating().await;
        market
            .service
            .cancel_task(user("P", TaskRef { task_id: "T1".into() }))
            .await
            .unwrap();

        let err = market
            .service
            .accept_offer(user("P", OfferRef { offer_id: "O1".into() }))
            .await
            .unwrap_err();
        assert!(err.reason().is_some());
        assert_eq!(market.balance("H"), 100);
    }
}
