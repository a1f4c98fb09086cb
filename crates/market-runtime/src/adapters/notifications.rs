//! # Notifications
//!
//! Maps committed events to push notifications for the affected party.
//! Delivery itself belongs to a [`NotificationDispatcher`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_bus::{EventRecord, MarketEvent};
use shared_types::{OfferAction, OfferStatus, TaskStatus};
use tracing::info;
use uuid::Uuid;

use crate::adapters::ports::{CollaboratorError, NotificationDispatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOffer,
    CounterOffer,
    HelperCounter,
    CounterAgreed,
    OfferRejected,
    OfferWithdrawn,
    OfferApproved,
    TaskAssigned,
    TopUpNeeded,
    TaskUpdate,
    TaskRemoved,
    Invite,
    DisputeResolved,
}

/// One push for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub target_uid: String,
    pub title: String,
    pub body: String,
    pub task_id: Option<String>,
    pub offer_id: Option<String>,
    pub event_id: Uuid,
    pub correlation_id: Option<Uuid>,
}

struct Draft<'a> {
    record: &'a EventRecord,
    task_id: Option<&'a str>,
    offer_id: Option<&'a str>,
}

impl Draft<'_> {
    fn to(&self, kind: NotificationKind, uid: &str, title: &str, body: String) -> Notification {
        Notification {
            kind,
            target_uid: uid.to_string(),
            title: title.to_string(),
            body,
            task_id: self.task_id.map(str::to_string),
            offer_id: self.offer_id.map(str::to_string),
            event_id: self.record.event_id,
            correlation_id: self.record.correlation_id,
        }
    }
}

/// Notifications owed for `record`.
///
/// `task_title` is the current title of the task the event refers to, when it
/// could be read; otherwise the task id stands in.
#[must_use]
pub fn notifications_for(record: &EventRecord, task_title: Option<&str>) -> Vec<Notification> {
    use NotificationKind as K;

    let label = |task_id: &str| {
        task_title
            .map(str::to_string)
            .unwrap_or_else(|| format!("Task {task_id}"))
    };

    match &record.event {
        MarketEvent::OfferSubmitted {
            task_id,
            offer_id,
            poster_id,
            amount,
            ..
        } => {
            let draft = Draft { record, task_id: Some(task_id), offer_id: Some(offer_id) };
            vec![draft.to(
                K::NewOffer,
                poster_id,
                "New offer",
                format!("A helper offered {amount} on “{}”.", label(task_id)),
            )]
        }

        MarketEvent::OfferTransitioned {
            task_id,
            offer_id,
            helper_id,
            poster_id,
            action,
            to,
            price,
            ..
        } => {
            let draft = Draft { record, task_id: Some(task_id), offer_id: Some(offer_id) };
            let title = label(task_id);
            let price = price.map(|p| p.to_string()).unwrap_or_default();
            match (action, to) {
                (OfferAction::ProposeCounter, _) => vec![draft.to(
                    K::CounterOffer,
                    helper_id,
                    "Counter offer",
                    format!("Poster countered on “{title}” at {price}"),
                )],
                (OfferAction::Reject, _) => vec![draft.to(
                    K::OfferRejected,
                    helper_id,
                    "Offer rejected",
                    format!("Your offer was rejected on “{title}”."),
                )],
                (OfferAction::AgreeToCounter, _) => vec![draft.to(
                    K::CounterAgreed,
                    poster_id,
                    "Helper accepted your counter",
                    format!("They agreed to your price on “{title}”. Tap to accept."),
                )],
                (OfferAction::HelperCounter, _) => vec![draft.to(
                    K::HelperCounter,
                    poster_id,
                    "New counter from helper",
                    format!("Helper countered on “{title}” at {price}."),
                )],
                (OfferAction::Withdraw, _) => vec![draft.to(
                    K::OfferWithdrawn,
                    poster_id,
                    "Offer withdrawn",
                    format!("Helper withdrew their offer on “{title}”."),
                )],
                (OfferAction::Accept, OfferStatus::Accepted) => vec![
                    draft.to(
                        K::OfferApproved,
                        helper_id,
                        "Offer approved",
                        format!("Your offer on “{title}” was accepted and the task is yours."),
                    ),
                    draft.to(
                        K::TaskAssigned,
                        poster_id,
                        "Task assigned",
                        format!("“{title}” has been assigned successfully."),
                    ),
                ],
                (OfferAction::Accept, OfferStatus::AwaitingTopup) => vec![draft.to(
                    K::TopUpNeeded,
                    helper_id,
                    "Top up needed",
                    format!("Add coins to secure the approval on “{title}”."),
                )],
                (OfferAction::Accept, _) => Vec::new(),
            }
        }

        MarketEvent::TaskStatusChanged {
            task_id,
            poster_id,
            helper_id,
            to,
            ..
        } => {
            let draft = Draft { record, task_id: Some(task_id), offer_id: None };
            let title = label(task_id);
            match (to, helper_id) {
                (TaskStatus::UnderReview, _) => vec![draft.to(
                    K::TaskUpdate,
                    poster_id,
                    "Task under review",
                    format!("“{title}” was flagged and is being reviewed."),
                )],
                (TaskStatus::InProgress, _) => vec![draft.to(
                    K::TaskUpdate,
                    poster_id,
                    "Work started",
                    format!("Your helper started working on “{title}”."),
                )],
                (TaskStatus::Completed, Some(helper)) => vec![draft.to(
                    K::TaskUpdate,
                    helper,
                    "Task completed",
                    format!("“{title}” was marked complete."),
                )],
                (TaskStatus::Cancelled, Some(helper)) => vec![draft.to(
                    K::TaskUpdate,
                    helper,
                    "Task cancelled",
                    format!("“{title}” was cancelled by the poster."),
                )],
                _ => Vec::new(),
            }
        }

        MarketEvent::TaskRemoved {
            task_id,
            poster_id,
            reason,
        } => {
            let draft = Draft { record, task_id: Some(task_id), offer_id: None };
            vec![draft.to(
                K::TaskRemoved,
                poster_id,
                "Task removed",
                format!("“{}” was removed: {reason}.", label(task_id)),
            )]
        }

        MarketEvent::HelperInvited {
            helper_id,
            task_id,
            category_id,
            ..
        } => {
            let draft = Draft { record, task_id: task_id.as_deref(), offer_id: None };
            vec![draft.to(
                K::Invite,
                helper_id,
                "You've been invited",
                format!("A poster invited you to a {category_id} task."),
            )]
        }

        MarketEvent::DisputeResolved {
            dispute_id,
            poster_id,
            helper_id,
            ..
        } => {
            let draft = Draft { record, task_id: None, offer_id: None };
            [poster_id, helper_id]
                .into_iter()
                .map(|uid| {
                    draft.to(
                        K::DisputeResolved,
                        uid,
                        "Dispute resolved",
                        format!("Dispute {dispute_id} has been resolved."),
                    )
                })
                .collect()
        }

        _ => Vec::new(),
    }
}

/// Dispatcher that only logs; used when no push backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<(), CollaboratorError> {
        info!(
            kind = ?notification.kind,
            target = %notification.target_uid,
            title = %notification.title,
            "Notification"
        );
        Ok(())
    }
}
