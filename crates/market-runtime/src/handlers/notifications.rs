//! Pushes notifications for committed events.

use std::sync::Arc;

use async_trait::async_trait;
use market_telemetry::metric_inc;
use market_telemetry::metrics::COLLABORATOR_FAILURES;
use shared_bus::{EventRecord, MarketEvent};
use tracing::warn;

use super::EventHandler;
use crate::adapters::{notifications_for, NotificationDispatcher};
use crate::service::MarketplaceService;

pub struct NotificationHandler {
    service: MarketplaceService,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl NotificationHandler {
    pub fn new(service: MarketplaceService, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            service,
            dispatcher,
        }
    }

    /// Current title of the task `event` refers to, if it can still be read.
    fn task_title(&self, event: &MarketEvent) -> Option<String> {
        let task_id = match event {
            MarketEvent::OfferSubmitted { task_id, .. }
            | MarketEvent::OfferTransitioned { task_id, .. }
            | MarketEvent::TaskStatusChanged { task_id, .. }
            | MarketEvent::TaskRemoved { task_id, .. } => task_id,
            _ => return None,
        };
        match self.service.container().tasks.get(task_id) {
            Ok(task) => task.map(|t| t.title).filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Task title lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl EventHandler for NotificationHandler {
    fn name(&self) -> &'static str {
        "notifications"
    }

    async fn handle(&mut self, record: &EventRecord) {
        let title = self.task_title(&record.event);
        for notification in notifications_for(record, title.as_deref()) {
            if let Err(e) = self.dispatcher.dispatch(&notification).await {
                metric_inc!(COLLABORATOR_FAILURES, &["notifications"]);
                warn!(
                    target_uid = %notification.target_uid,
                    kind = ?notification.kind,
                    error = %e,
                    "Notification dropped"
                );
            }
        }
    }
}
