//! # Event Handlers
//!
//! Reactive consumers of the event bus. Each handler owns a filtered
//! [`Subscription`] and runs until the bus closes or shutdown is signalled.
//!
//! ```text
//! eligibility_input_changed ──▶ EligibilityHandler  ──▶ recompute ──▶ allowed_categories_updated
//! task_listed               ──▶ ListingHandler      ──▶ post fee safety net, moderation
//! offers / tasks / disputes ──▶ NotificationHandler ──▶ NotificationDispatcher
//! offer moves               ──▶ ChatMirrorHandler   ──▶ ChatMirror
//! ```
//!
//! Delivery is at-least-once, so every handler skips event ids it has
//! already processed and every reaction is itself idempotent. When a
//! subscription lags and records are lost, the handler is asked to
//! [`EventHandler::reconcile`] from the store instead.

pub mod chat;
pub mod eligibility;
pub mod listing;
pub mod notifications;

pub use chat::ChatMirrorHandler;
pub use eligibility::EligibilityHandler;
pub use listing::ListingHandler;
pub use notifications::NotificationHandler;

use std::sync::Arc;

use async_trait::async_trait;
use market_telemetry::metric_inc;
use market_telemetry::metrics::EVENTS_LAGGED;
use shared_bus::{Delivery, EventRecord, ProcessedEventCache, Subscription};
use shared_types::TimeSource;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A bus consumer reacting to one record at a time.
#[async_trait]
pub trait EventHandler: Send {
    /// Label for logs.
    fn name(&self) -> &'static str;

    async fn handle(&mut self, record: &EventRecord);

    /// Called after `missed` records were lost to lag. Handlers whose
    /// reactions must converge rebuild them from the store; the rest only
    /// log the gap.
    async fn reconcile(&mut self, missed: u64) {
        debug!(handler = self.name(), missed, "No reconcile pass for this handler");
    }
}

/// Feeds `subscription` into `handler`, dropping redeliveries, until the bus
/// closes or `shutdown` changes.
pub async fn drive<H: EventHandler>(
    mut handler: H,
    mut subscription: Subscription,
    mut seen: ProcessedEventCache,
    time: Arc<dyn TimeSource>,
    mut shutdown: watch::Receiver<bool>,
) {
    let name = handler.name();
    info!(handler = name, "Handler started");

    loop {
        tokio::select! {
            next = subscription.next_delivery() => {
                let record = match next {
                    Some(Delivery::Record(record)) => record,
                    Some(Delivery::Lagged(missed)) => {
                        warn!(handler = name, missed, "Handler lagged, reconciling from store");
                        metric_inc!(EVENTS_LAGGED, &[name]);
                        handler.reconcile(missed).await;
                        continue;
                    }
                    None => {
                        info!(handler = name, "Event bus closed, exiting");
                        break;
                    }
                };
                if !seen.first_delivery(record.event_id, time.now()) {
                    debug!(handler = name, event_id = %record.event_id, "Duplicate delivery skipped");
                    continue;
                }
                handler.handle(&record).await;
            }
            _ = shutdown.changed() => {
                info!(handler = name, "Shutdown signal received");
                break;
            }
        }
    }
}

/// Correlation id for follow-up events: the originating call's, else the
/// triggering record's own id.
pub(crate) fn follow_up_id(record: &EventRecord) -> Uuid {
    record.correlation_id.unwrap_or(record.event_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::{EventFilter, EventPublisher, InMemoryEventBus, MarketEvent};
    use shared_types::MockTimeSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn handle(&mut self, _record: &EventRecord) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Records reconcile passes and how many records each one covered.
    struct Reconciling {
        handled: Arc<AtomicUsize>,
        missed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for Reconciling {
        fn name(&self) -> &'static str {
            "reconciling"
        }

        async fn handle(&mut self, _record: &EventRecord) {
            self.handled.fetch_add(1, Ordering::SeqCst);
        }

        async fn reconcile(&mut self, missed: u64) {
            self.missed.fetch_add(missed as usize, Ordering::SeqCst);
        }
    }

    fn opened() -> EventRecord {
        EventRecord::new(MarketEvent::AccountOpened { uid: "u1".into() }, 1, None)
    }

    #[tokio::test]
    async fn test_redelivery_is_handled_once() {
        let bus = InMemoryEventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(drive(
            Counting(count.clone()),
            bus.subscribe(EventFilter::all()),
            ProcessedEventCache::new(),
            Arc::new(MockTimeSource::new(1)),
            shutdown_rx,
        ));

        let record = opened();
        bus.publish(record.clone()).await;
        bus.publish(record).await;
        bus.publish(opened()).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_lag_triggers_reconcile() {
        let bus = InMemoryEventBus::with_capacity(4);
        let handled = Arc::new(AtomicUsize::new(0));
        let missed = Arc::new(AtomicUsize::new(0));
        let subscription = bus.subscribe(EventFilter::all());

        // Overrun the channel before the handler starts polling.
        for _ in 0..10 {
            bus.publish(opened()).await;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(drive(
            Reconciling {
                handled: handled.clone(),
                missed: missed.clone(),
            },
            subscription,
            ProcessedEventCache::new(),
            Arc::new(MockTimeSource::new(1)),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(missed.load(Ordering::SeqCst), 6);
        assert_eq!(handled.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_follow_up_prefers_correlation() {
        let correlation = Uuid::new_v4();
        let record = EventRecord::new(
            MarketEvent::AccountOpened { uid: "u1".into() },
            1,
            Some(correlation),
        );
        assert_eq!(follow_up_id(&record), correlation);

        let orphan = opened();
        assert_eq!(follow_up_id(&orphan), orphan.event_id);
    }
}
