//! Recomputes a user's allowed categories whenever one of its inputs
//! (a category proof or the basic approval) changes. After lost records the
//! whole user set is recomputed, which is safe because recompute converges.

use async_trait::async_trait;
use shared_bus::{EventRecord, MarketEvent};
use tracing::{info, warn};
use uuid::Uuid;

use super::{follow_up_id, EventHandler};
use crate::service::MarketplaceService;

pub struct EligibilityHandler {
    service: MarketplaceService,
}

impl EligibilityHandler {
    pub fn new(service: MarketplaceService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl EventHandler for EligibilityHandler {
    fn name(&self) -> &'static str {
        "eligibility"
    }

    async fn handle(&mut self, record: &EventRecord) {
        let MarketEvent::EligibilityInputChanged { uid } = &record.event else {
            return;
        };
        match self.service.container().eligibility.recompute(uid) {
            Ok(outcome) => {
                self.service
                    .publish_recompute(follow_up_id(record), &outcome)
                    .await;
            }
            Err(e) => warn!(uid = %uid, error = %e, "Eligibility recompute failed"),
        }
    }

    async fn reconcile(&mut self, missed: u64) {
        let eligibility = &self.service.container().eligibility;
        let users = match eligibility.users() {
            Ok(users) => users,
            Err(e) => {
                warn!(error = %e, "Could not list users for eligibility reconcile");
                return;
            }
        };
        let correlation_id = Uuid::new_v4();
        let mut updated = 0usize;
        for uid in &users {
            match eligibility.recompute(uid) {
                Ok(outcome) => {
                    updated += usize::from(outcome.changed);
                    self.service.publish_recompute(correlation_id, &outcome).await;
                }
                Err(e) => warn!(uid = %uid, error = %e, "Eligibility recompute failed"),
            }
        }
        info!(missed, users = users.len(), updated, "Eligibility reconciled");
    }
}
