//! # Shared Test Fixtures
//!
//! A [`Market`] wraps one container over a fresh in-memory store and a
//! mock clock, plus a subscription that records every published event.

use std::sync::Arc;

use market_runtime::service::{SubmitOfferRequest, TaskRequest, TopUpRequest};
use market_runtime::{MarketConfig, MarketContainer, MarketplaceService};
use shared_bus::{EventFilter, MarketEvent, Subscription};
use shared_types::{AuthenticatedCall, IdentityClaims, MockTimeSource, ProofStatus};
use tm_01_document_store::InMemoryDocumentStore;
use tm_03_task_lifecycle::TaskPayload;

/// Clock start for every fixture market.
pub const EPOCH_MS: u64 = 1_700_000_000_000;

pub struct Market {
    pub service: MarketplaceService,
    pub container: Arc<MarketContainer>,
    pub time: Arc<MockTimeSource>,
    pub events: Subscription,
}

impl Market {
    pub fn new() -> Self {
        Self::with_config(MarketConfig::default())
    }

    pub fn with_config(config: MarketConfig) -> Self {
        let time = Arc::new(MockTimeSource::new(EPOCH_MS));
        let container = Arc::new(MarketContainer::with_backend(
            config,
            Arc::new(InMemoryDocumentStore::new()),
            time.clone(),
        ));
        let events = container.event_bus.subscribe(EventFilter::all());
        Self {
            service: MarketplaceService::new(Arc::clone(&container)),
            container,
            time,
            events,
        }
    }

    /// Opens `uid` and tops it up to `coins`.
    pub async fn account(&self, uid: &str, coins: u64) {
        self.service.open_account(user(uid, ())).await.unwrap();
        if coins > 0 {
            self.service
                .top_up_coins(user(
                    uid,
                    TopUpRequest {
                        amount: coins,
                        idempotency_key: Some(format!("seed-{uid}")),
                        target_uid: None,
                    },
                ))
                .await
                .unwrap();
        }
    }

    /// Approves `uid` for `category` and recomputes their allowed set.
    pub fn approve(&self, uid: &str, category: &str) {
        let eligibility = &self.container.eligibility;
        eligibility
            .submit_proof(uid, category, Default::default(), None)
            .unwrap();
        eligibility
            .review_proof("ops", uid, category, ProofStatus::Approved, None)
            .unwrap();
        eligibility.recompute(uid).unwrap();
    }

    /// Gated publish of a plumbing task.
    pub async fn listed_task(&self, poster: &str, task_id: &str) {
        self.service
            .publish_task(user(poster, task_request(task_id, "Fix sink")))
            .await
            .unwrap();
    }

    pub async fn offer(&self, helper: &str, task_id: &str, offer_id: &str, amount: u64) {
        self.service
            .submit_offer(user(
                helper,
                SubmitOfferRequest {
                    task_id: task_id.into(),
                    offer_id: offer_id.into(),
                    amount,
                },
            ))
            .await
            .unwrap();
    }

    pub fn balance(&self, uid: &str) -> u64 {
        self.container.ledger.balance(uid).unwrap()
    }

    /// Events published since the last drain.
    pub fn drain(&mut self) -> Vec<MarketEvent> {
        let mut out = Vec::new();
        while let Ok(Some(record)) = self.events.try_recv() {
            out.push(record.event);
        }
        out
    }
}

impl Default for Market {
    fn default() -> Self {
        Self::new()
    }
}

pub fn user<T>(uid: &str, payload: T) -> AuthenticatedCall<T> {
    AuthenticatedCall::from_user(IdentityClaims::user(uid), EPOCH_MS, payload)
}

pub fn admin<T>(payload: T) -> AuthenticatedCall<T> {
    AuthenticatedCall::from_user(IdentityClaims::admin("ops"), EPOCH_MS, payload)
}

pub fn task_request(task_id: &str, title: &str) -> TaskRequest {
    TaskRequest {
        task_id: task_id.into(),
        task: TaskPayload {
            title: title.into(),
            description: "Kitchen sink drips".into(),
            category_id: "plumbing".into(),
            budget: Some(1500),
        },
    }
}
