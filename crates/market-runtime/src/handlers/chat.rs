//! Mirrors offer events into the poster/helper chat thread.

use std::sync::Arc;

use async_trait::async_trait;
use market_telemetry::metric_inc;
use market_telemetry::metrics::COLLABORATOR_FAILURES;
use shared_bus::EventRecord;
use tracing::warn;

use super::EventHandler;
use crate::adapters::{chat_message_for, ChatMirror};

pub struct ChatMirrorHandler {
    mirror: Arc<dyn ChatMirror>,
}

impl ChatMirrorHandler {
    pub fn new(mirror: Arc<dyn ChatMirror>) -> Self {
        Self { mirror }
    }
}

#[async_trait]
impl EventHandler for ChatMirrorHandler {
    fn name(&self) -> &'static str {
        "chat_mirror"
    }

    async fn handle(&mut self, record: &EventRecord) {
        let Some(message) = chat_message_for(record) else {
            return;
        };
        if let Err(e) = self.mirror.post(&message).await {
            metric_inc!(COLLABORATOR_FAILURES, &["chat"]);
            warn!(chat_id = %message.chat_id, error = %e, "Chat mirror failed");
        }
    }
}
