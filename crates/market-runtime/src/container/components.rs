//! # Component Container
//!
//! Holds every component instance built around one injected store client.
//!
//! ## Initialization Order
//!
//! ```text
//! Level 0: Document store client (no dependencies)
//! Level 1: Wallet Ledger, Category Eligibility
//! Level 2: Task Lifecycle (ledger)
//! Level 3: Offer Negotiation (ledger, tasks, eligibility), Dispute Resolver (ledger, tasks)
//! ```
//!
//! Components share nothing but the store client; they coordinate through
//! transactions and the event bus, never through in-process locks.

use std::sync::Arc;

use shared_bus::InMemoryEventBus;
use shared_types::{SystemTimeSource, TimeSource};
use tm_01_document_store::{DocumentStore, InMemoryDocumentStore, StoreClient};
use tm_02_wallet_ledger::WalletLedger;
use tm_03_task_lifecycle::TaskLifecycle;
use tm_04_offer_negotiation::OfferNegotiation;
use tm_05_category_eligibility::CategoryEligibility;
use tm_06_dispute_resolver::DisputeResolver;
use tracing::{info, instrument};

use crate::container::config::MarketConfig;

/// Central container holding all component instances.
pub struct MarketContainer {
    // =========================================================================
    // LEVEL 0
    // =========================================================================
    /// Shared store client; cloned into every component.
    pub client: StoreClient,

    // =========================================================================
    // LEVEL 1-3
    // =========================================================================
    pub ledger: WalletLedger,
    pub eligibility: CategoryEligibility,
    pub tasks: TaskLifecycle,
    pub offers: OfferNegotiation,
    pub disputes: DisputeResolver,

    // =========================================================================
    // SHARED INFRASTRUCTURE
    // =========================================================================
    /// Event bus carrying committed events to the reactive handlers.
    pub event_bus: Arc<InMemoryEventBus>,

    /// Clock shared with the store client.
    pub time: Arc<dyn TimeSource>,

    /// Configuration (immutable after initialization).
    pub config: MarketConfig,
}

impl MarketContainer {
    /// Container over a fresh in-memory store on the system clock.
    pub fn new(config: MarketConfig) -> Self {
        Self::with_backend(
            config,
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(SystemTimeSource),
        )
    }

    /// Container over the given store and clock.
    #[instrument(name = "market_init", skip_all)]
    pub fn with_backend(
        config: MarketConfig,
        store: Arc<dyn DocumentStore>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        info!("Initializing marketplace component container");

        let client = StoreClient::new(store, Arc::clone(&time), config.store.clone());
        info!(max_attempts = config.store.max_attempts, "  [01] Document store client ready");

        let ledger = WalletLedger::new(client.clone());
        let eligibility = CategoryEligibility::new(client.clone());
        info!("  [02] Wallet Ledger initialized");
        info!("  [05] Category Eligibility initialized");

        let tasks = TaskLifecycle::new(client.clone(), config.tasks.clone());
        info!(
            post_fee = config.tasks.post_fee,
            min_post_balance = config.tasks.min_post_balance,
            "  [03] Task Lifecycle initialized"
        );

        let offers = OfferNegotiation::new(client.clone(), config.offers.clone());
        info!(
            accept_fee = config.offers.accept_fee,
            policy = %config.offers.insufficient_funds,
            "  [04] Offer Negotiation initialized"
        );

        let disputes = DisputeResolver::new(client.clone());
        info!("  [06] Dispute Resolver initialized");

        let event_bus = Arc::new(InMemoryEventBus::with_capacity(config.bus.capacity));

        Self {
            client,
            ledger,
            eligibility,
            tasks,
            offers,
            disputes,
            event_bus,
            time,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::MockTimeSource;

    #[test]
    fn test_components_share_one_store() {
        let container = MarketContainer::with_backend(
            MarketConfig::default(),
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(MockTimeSource::new(1_000)),
        );
        container.ledger.open_account("u1").unwrap();
        container.ledger.top_up("u1", 40, Some("k")).unwrap();
        assert_eq!(container.eligibility.allowed("u1").unwrap().len(), 0);
        assert_eq!(container.ledger.balance("u1").unwrap(), 40);
        assert_eq!(container.client.now(), 1_000);
    }

    #[test]
    fn test_bus_capacity_from_config() {
        let mut config = MarketConfig::default();
        config.bus.capacity = 16;
        let container = MarketContainer::new(config);
        assert_eq!(container.event_bus.capacity(), 16);
    }
}
