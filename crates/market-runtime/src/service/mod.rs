//! # Marketplace Service
//!
//! The callable surface of the core. Every operation:
//!
//! 1. Reads the caller from the [`AuthenticatedCall`] envelope (never from
//!    the payload) and applies the role gate
//! 2. Runs exactly one component operation, i.e. one atomic transaction
//! 3. After commit, publishes the resulting [`MarketEvent`]s to the bus
//!
//! Errors leave as [`ServiceError`]; publishing never fails an operation.

mod disputes;
mod eligibility;
mod offers;
pub mod requests;
mod tasks;
mod wallet;

use std::sync::Arc;

use market_telemetry::metrics::{
    EVENTS_PUBLISHED, LEDGER_COINS, LEDGER_POSTINGS, OPERATION_ERRORS,
};
use market_telemetry::{metric_inc, record_store_stats, HistogramTimer};
use shared_bus::{EventPublisher, EventRecord, MarketEvent};
use shared_types::{LedgerKind, ServiceError};
use tracing::debug;
use uuid::Uuid;

use crate::container::MarketContainer;

pub use requests::*;
pub(crate) use tasks::task_status_changed;

/// Authenticated facade over the marketplace components.
#[derive(Clone)]
pub struct MarketplaceService {
    container: Arc<MarketContainer>,
    publisher: Arc<dyn EventPublisher>,
}

impl MarketplaceService {
    /// Service publishing to the container's own bus.
    pub fn new(container: Arc<MarketContainer>) -> Self {
        let publisher: Arc<dyn EventPublisher> = container.event_bus.clone();
        Self {
            container,
            publisher,
        }
    }

    /// Service publishing to a custom publisher.
    pub fn with_publisher(container: Arc<MarketContainer>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            container,
            publisher,
        }
    }

    pub fn container(&self) -> &Arc<MarketContainer> {
        &self.container
    }

    /// Runs one operation body with latency and error accounting.
    fn observe<T>(
        &self,
        operation: &'static str,
        body: impl FnOnce() -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let timer = HistogramTimer::operation(operation);
        let result = body();
        drop(timer);

        let stats = self.container.client.stats();
        record_store_stats(stats.commits(), stats.conflicts(), stats.exhausted());

        if let Err(err) = &result {
            metric_inc!(OPERATION_ERRORS, &[operation, err.code()]);
            debug!(operation, error = %err, "Operation failed");
        }
        result
    }

    /// Publishes one committed event under the call's correlation id.
    pub(crate) async fn emit(&self, correlation_id: Uuid, event: MarketEvent) {
        let record = EventRecord::new(event, self.container.time.now(), Some(correlation_id));
        metric_inc!(EVENTS_PUBLISHED, &[record.event.name()]);
        self.publisher.publish(record).await;
    }

    /// Publishes a ledger posting and counts it.
    pub(crate) async fn emit_posting(
        &self,
        correlation_id: Uuid,
        uid: &str,
        kind: LedgerKind,
        key: String,
        amount: i64,
        balance: u64,
    ) {
        let direction = if amount < 0 { "debit" } else { "credit" };
        metric_inc!(LEDGER_POSTINGS, &[kind.as_str(), direction]);
        LEDGER_COINS
            .with_label_values(&[direction])
            .inc_by(amount.unsigned_abs() as f64);

        self.emit(
            correlation_id,
            MarketEvent::WalletMutated {
                uid: uid.to_string(),
                kind,
                key,
                amount,
                balance,
            },
        )
        .await;
    }
}
