//! # Marketplace Events
//!
//! Immutable facts published after a transaction commits.

use serde::{Deserialize, Serialize};
use shared_types::entities::{LedgerKind, OfferAction, OfferOrigin, OfferStatus, TaskStatus};
use shared_types::Timestamp;
use uuid::Uuid;

/// How a task reached `listed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingPath {
    /// Through the gated publish operation; fee already charged.
    Publish,
    /// Written directly as listed; the safety net must settle the fee.
    Direct,
    /// Reinstated after moderation review.
    Reinstated,
}

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    // =========================================================================
    // WALLET
    // =========================================================================
    AccountOpened {
        uid: String,
    },

    /// A ledger entry was written. `amount` is signed.
    WalletMutated {
        uid: String,
        kind: LedgerKind,
        key: String,
        amount: i64,
        balance: u64,
    },

    // =========================================================================
    // TASKS
    // =========================================================================
    TaskDrafted {
        task_id: String,
        poster_id: String,
    },

    TaskListed {
        task_id: String,
        poster_id: String,
        via: ListingPath,
    },

    /// Status change other than listing (assignment, start, completion,
    /// cancellation, review).
    TaskStatusChanged {
        task_id: String,
        poster_id: String,
        helper_id: Option<String>,
        from: TaskStatus,
        to: TaskStatus,
    },

    /// Removed by the post-fee safety net because the fee could not be paid.
    TaskRemoved {
        task_id: String,
        poster_id: String,
        reason: String,
    },

    // =========================================================================
    // OFFERS
    // =========================================================================
    OfferSubmitted {
        task_id: String,
        offer_id: String,
        helper_id: String,
        poster_id: String,
        amount: u64,
        origin: OfferOrigin,
    },

    /// A negotiation move committed on an offer.
    OfferTransitioned {
        task_id: String,
        offer_id: String,
        helper_id: String,
        poster_id: String,
        action: OfferAction,
        from: OfferStatus,
        to: OfferStatus,
        /// Price carried by the move (counter price, agreed or final amount).
        price: Option<u64>,
        note: Option<String>,
    },

    HelperInvited {
        poster_id: String,
        helper_id: String,
        task_id: Option<String>,
        category_id: String,
    },

    // =========================================================================
    // ELIGIBILITY
    // =========================================================================
    /// A proof or basic approval changed; the user's allowed set is stale.
    EligibilityInputChanged {
        uid: String,
    },

    AllowedCategoriesUpdated {
        uid: String,
        allowed: Vec<String>,
    },

    // =========================================================================
    // DISPUTES
    // =========================================================================
    DisputeOpened {
        dispute_id: String,
        poster_id: String,
        helper_id: String,
    },

    DisputeResolved {
        dispute_id: String,
        poster_id: String,
        helper_id: String,
        poster_delta: i64,
        helper_delta: i64,
    },
}

impl MarketEvent {
    /// Get the topic for this event.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::AccountOpened { .. } | Self::WalletMutated { .. } => EventTopic::Wallet,
            Self::TaskDrafted { .. }
            | Self::TaskListed { .. }
            | Self::TaskStatusChanged { .. }
            | Self::TaskRemoved { .. } => EventTopic::Tasks,
            Self::OfferSubmitted { .. }
            | Self::OfferTransitioned { .. }
            | Self::HelperInvited { .. } => EventTopic::Offers,
            Self::EligibilityInputChanged { .. } | Self::AllowedCategoriesUpdated { .. } => {
                EventTopic::Eligibility
            }
            Self::DisputeOpened { .. } | Self::DisputeResolved { .. } => EventTopic::Disputes,
        }
    }

    /// Short name for logs and metrics labels.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AccountOpened { .. } => "account_opened",
            Self::WalletMutated { .. } => "wallet_mutated",
            Self::TaskDrafted { .. } => "task_drafted",
            Self::TaskListed { .. } => "task_listed",
            Self::TaskStatusChanged { .. } => "task_status_changed",
            Self::TaskRemoved { .. } => "task_removed",
            Self::OfferSubmitted { .. } => "offer_submitted",
            Self::OfferTransitioned { .. } => "offer_transitioned",
            Self::HelperInvited { .. } => "helper_invited",
            Self::EligibilityInputChanged { .. } => "eligibility_input_changed",
            Self::AllowedCategoriesUpdated { .. } => "allowed_categories_updated",
            Self::DisputeOpened { .. } => "dispute_opened",
            Self::DisputeResolved { .. } => "dispute_resolved",
        }
    }
}

/// Envelope around a published event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique per record; consumers deduplicate on it.
    pub event_id: Uuid,
    /// Correlation id of the call that produced the event.
    pub correlation_id: Option<Uuid>,
    pub occurred_at: Timestamp,
    pub event: MarketEvent,
}

impl EventRecord {
    #[must_use]
    pub fn new(event: MarketEvent, occurred_at: Timestamp, correlation_id: Option<Uuid>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            correlation_id,
            occurred_at,
            event,
        }
    }

    #[must_use]
    pub fn topic(&self) -> EventTopic {
        self.event.topic()
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Wallet,
    Tasks,
    Offers,
    Eligibility,
    Disputes,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if a record matches this filter.
    #[must_use]
    pub fn matches(&self, record: &EventRecord) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&record.topic())
    }
}
