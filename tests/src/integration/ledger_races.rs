//! # Ledger Races
//!
//! Many threads hammer the same documents through the component layer.
//! Whatever the interleaving, each idempotency key is charged at most once,
//! balances never underflow and a task is assigned to exactly one offer.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use market_runtime::{MarketConfig, MarketContainer};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use shared_types::{LedgerKind, MockTimeSource, ProofStatus, TaskStatus};
    use tm_01_document_store::InMemoryDocumentStore;
    use tm_02_wallet_ledger::{keys, LedgerError};
    use tm_03_task_lifecycle::TaskPayload;
    use tm_06_dispute_resolver::{OpenDispute, Resolution};

    const THREADS: usize = 8;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn container() -> Arc<MarketContainer> {
        let mut config = MarketConfig::default();
        // Every contender must eventually get through on a busy document.
        config.store.max_attempts = 256;
        Arc::new(MarketContainer::with_backend(
            config,
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(MockTimeSource::new(1_700_000_000_000)),
        ))
    }

    fn fund(c: &MarketContainer, uid: &str, coins: u64) {
        c.ledger.open_account(uid).unwrap();
        if coins > 0 {
            c.ledger.top_up(uid, coins, Some("seed")).unwrap();
        }
    }

    fn approve(c: &MarketContainer, uid: &str) {
        c.eligibility
            .submit_proof(uid, "plumbing", Default::default(), None)
            .unwrap();
        c.eligibility
            .review_proof("ops", uid, "plumbing", ProofStatus::Approved, None)
            .unwrap();
        c.eligibility.recompute(uid).unwrap();
    }

    fn payload() -> TaskPayload {
        TaskPayload {
            title: "Fix sink".into(),
            description: String::new(),
            category_id: "plumbing".into(),
            budget: Some(1500),
        }
    }

    /// Runs `f(i)` on `THREADS` threads released together.
    fn race<T, F>(f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        let barrier = Barrier::new(THREADS);
        thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|i| {
                    let barrier = &barrier;
                    let f = &f;
                    s.spawn(move || {
                        barrier.wait();
                        f(i)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    // =========================================================================
    // IDEMPOTENT CHARGES
    // =========================================================================

    #[test]
    fn test_same_key_charged_once_under_contention() {
        let c = container();
        fund(&c, "u1", 100);

        let receipts = race(|_| {
            c.ledger
                .charge("u1", 30, LedgerKind::PostFee, &keys::post_fee("T1"))
                .unwrap()
        });

        assert_eq!(receipts.iter().filter(|r| r.applied).count(), 1);
        assert!(receipts.iter().all(|r| r.balance == 70));
        assert_eq!(c.ledger.balance("u1").unwrap(), 70);
    }

    #[test]
    fn test_distinct_charges_never_overdraw() {
        let c = container();
        fund(&c, "u1", 100);

        // Eight charges of 30 against 100: exactly three can succeed.
        let results = race(|i| {
            c.ledger
                .charge("u1", 30, LedgerKind::PostFee, &keys::post_fee(&format!("T{i}")))
        });

        let applied = results.iter().filter(|r| r.is_ok()).count();
        let refused = results
            .iter()
            .filter(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. })))
            .count();
        assert_eq!(applied, 3);
        assert_eq!(refused, THREADS - 3);
        assert_eq!(c.ledger.balance("u1").unwrap(), 10);
    }

    #[test]
    fn test_random_postings_reconcile() {
        let c = container();
        fund(&c, "u1", 500);

        let deltas = race(|i| {
            let mut rng = StdRng::seed_from_u64(i as u64);
            let mut net: i64 = 0;
            for n in 0..25 {
                let amount = rng.gen_range(1..=40u64);
                let key = format!("t{i}-{n}");
                if rng.gen_bool(0.5) {
                    let r = c.ledger.credit("u1", amount, LedgerKind::Topup, &key).unwrap();
                    assert!(r.applied);
                    net += amount as i64;
                } else {
                    match c.ledger.charge("u1", amount, LedgerKind::PostFee, &key) {
                        Ok(r) => {
                            assert!(r.applied);
                            net -= amount as i64;
                        }
                        Err(LedgerError::InsufficientFunds { .. }) => {
                            assert!(c.ledger.entry(&key).unwrap().is_none());
                        }
                        Err(e) => panic!("unexpected ledger error: {e}"),
                    }
                }
            }
            net
        });

        let expected = 500 + deltas.iter().sum::<i64>();
        assert!(expected >= 0);
        assert_eq!(c.ledger.balance("u1").unwrap() as i64, expected);
    }

    // =========================================================================
    // TASKS AND OFFERS
    // =========================================================================

    #[test]
    fn test_concurrent_publish_charges_post_fee_once() {
        let c = container();
        fund(&c, "P", 1000);

        let outcomes = race(|_| c.tasks.publish("P", "T1", &payload()).unwrap());

        assert_eq!(outcomes.iter().filter(|o| !o.already_published).count(), 1);
        assert_eq!(c.ledger.balance("P").unwrap(), 980);
        let task = c.tasks.get("T1").unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Listed);
        assert_eq!(task.post_fee_txn_id, Some(keys::post_fee("T1")));
    }

    #[test]
    fn test_competing_offers_assign_exactly_one_helper() {
        let c = container();
        fund(&c, "P", 1000);
        for i in 0..THREADS {
            let helper = format!("H{i}");
            fund(&c, &helper, 100);
            approve(&c, &helper);
        }
        c.tasks.publish("P", "T1", &payload()).unwrap();
        for i in 0..THREADS {
            c.offers
                .submit_offer(&format!("H{i}"), "T1", &format!("O{i}"), 1500)
                .unwrap();
        }

        let results = race(|i| c.offers.accept_offer("P", &format!("O{i}")));

        let winners: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| matches!(r, Ok(outcome) if outcome.is_accepted()))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(winners.len(), 1);

        let winner = winners[0];
        let task = c.tasks.get("T1").unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Assigned);
        assert_eq!(task.accepted_offer_id, Some(format!("O{winner}")));

        // Only the winner paid the acceptance fee.
        for i in 0..THREADS {
            let balance = c.ledger.balance(&format!("H{i}")).unwrap();
            assert_eq!(balance, if i == winner { 75 } else { 100 });
        }
    }

    #[test]
    fn test_repeated_accept_of_one_offer_charges_once() {
        let c = container();
        fund(&c, "P", 1000);
        fund(&c, "H", 100);
        approve(&c, "H");
        c.tasks.publish("P", "T1", &payload()).unwrap();
        c.offers.submit_offer("H", "T1", "O1", 1500).unwrap();

        let results = race(|_| c.offers.accept_offer("P", "O1"));

        assert!(results.iter().any(|r| r.is_ok()));
        assert_eq!(c.ledger.balance("H").unwrap(), 75);
        assert!(c.ledger.entry(&keys::accept_fee("O1")).unwrap().is_some());
    }

    // =========================================================================
    // DISPUTES
    // =========================================================================

    #[test]
    fn test_concurrent_resolution_applies_once() {
        let c = container();
        fund(&c, "P", 100);
        fund(&c, "H", 100);
        c.disputes
            .open_dispute(
                "P",
                &OpenDispute {
                    dispute_id: "D1".into(),
                    poster_id: "P".into(),
                    helper_id: "H".into(),
                    task_id: None,
                    reason: None,
                },
            )
            .unwrap();
        let resolution = Resolution {
            resolution: "split".into(),
            poster_delta: 25,
            helper_delta: -25,
            notes: None,
        };

        let outcomes = race(|_| c.disputes.resolve("ops", "D1", &resolution).unwrap());

        assert_eq!(outcomes.iter().filter(|o| o.applied).count(), 1);
        assert_eq!(c.ledger.balance("P").unwrap(), 125);
        assert_eq!(c.ledger.balance("H").unwrap(), 75);
    }
}
