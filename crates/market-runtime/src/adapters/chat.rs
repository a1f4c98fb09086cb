//! # Chat Mirror
//!
//! Every offer and negotiation move is mirrored into the chat thread shared
//! by the poster and the helper of that task.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_bus::{EventRecord, MarketEvent};
use shared_types::{OfferAction, OfferStatus};
use tracing::info;
use uuid::Uuid;

use crate::adapters::ports::{ChatMirror, CollaboratorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMessageKind {
    Offer,
    Counter,
    Accept,
    System,
}

/// A mirrored negotiation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub chat_id: String,
    pub task_id: String,
    pub poster_id: String,
    pub helper_id: String,
    pub kind: ChatMessageKind,
    pub offer_id: String,
    pub price: Option<u64>,
    pub note: Option<String>,
    pub author_id: String,
    /// Short preview for the thread list.
    pub preview: String,
    /// Stable per event, so a redelivered record maps to the same message.
    pub message_id: Uuid,
}

/// Thread id for a (task, poster, helper) triple; independent of which party
/// opened it.
#[must_use]
pub fn chat_id_for(task_id: &str, poster_id: &str, helper_id: &str) -> String {
    let clean = |s: &str| -> String {
        s.chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect()
    };
    let (a, b) = (clean(poster_id), clean(helper_id));
    let pair = if a <= b {
        format!("{a}_{b}")
    } else {
        format!("{b}_{a}")
    };
    format!("{}_{pair}", clean(task_id))
}

/// The chat message mirroring `record`, if it is an offer event.
#[must_use]
pub fn chat_message_for(record: &EventRecord) -> Option<ChatMessage> {
    match &record.event {
        MarketEvent::OfferSubmitted {
            task_id,
            offer_id,
            helper_id,
            poster_id,
            amount,
            ..
        } => Some(ChatMessage {
            chat_id: chat_id_for(task_id, poster_id, helper_id),
            task_id: task_id.clone(),
            poster_id: poster_id.clone(),
            helper_id: helper_id.clone(),
            kind: ChatMessageKind::Offer,
            offer_id: offer_id.clone(),
            price: Some(*amount),
            note: None,
            author_id: helper_id.clone(),
            preview: "New offer".to_string(),
            message_id: record.event_id,
        }),

        MarketEvent::OfferTransitioned {
            task_id,
            offer_id,
            helper_id,
            poster_id,
            action,
            to,
            price,
            note,
            ..
        } => {
            let (kind, preview) = match (action, to) {
                (OfferAction::ProposeCounter | OfferAction::HelperCounter, _) => {
                    (ChatMessageKind::Counter, "Countered")
                }
                (OfferAction::Accept, OfferStatus::Accepted) => {
                    (ChatMessageKind::Accept, "Offer accepted")
                }
                (OfferAction::AgreeToCounter, _) => (ChatMessageKind::System, "Counter agreed"),
                (OfferAction::Withdraw, _) => (ChatMessageKind::System, "Offer withdrawn"),
                (OfferAction::Reject, _) => (ChatMessageKind::System, "Offer rejected"),
                (OfferAction::Accept, _) => (ChatMessageKind::System, "Offer updated"),
            };
            let author = if action.by_poster() {
                poster_id
            } else {
                helper_id
            };
            Some(ChatMessage {
                chat_id: chat_id_for(task_id, poster_id, helper_id),
                task_id: task_id.clone(),
                poster_id: poster_id.clone(),
                helper_id: helper_id.clone(),
                kind,
                offer_id: offer_id.clone(),
                price: *price,
                note: note.clone(),
                author_id: author.clone(),
                preview: preview.to_string(),
                message_id: record.event_id,
            })
        }

        _ => None,
    }
}

/// Mirror that only logs; used when no chat backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingChatMirror;

#[async_trait]
impl ChatMirror for LoggingChatMirror {
    async fn post(&self, message: &ChatMessage) -> Result<(), CollaboratorError> {
        info!(
            chat_id = %message.chat_id,
            kind = ?message.kind,
            offer_id = %message.offer_id,
            "Chat message mirrored"
        );
        Ok(())
    }
}
