//! Results of offer operations.

use shared_types::{InviteDoc, OfferAction, OfferDoc, OfferStatus, TaskDoc, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferSubmission {
    pub offer: OfferDoc,
    /// False when the same offer was already submitted.
    pub created: bool,
}

/// A committed negotiation move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferTransition {
    pub offer: OfferDoc,
    pub action: OfferAction,
    pub from: OfferStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// Offer accepted, fee charged, task assigned, all in one commit.
    Accepted {
        offer: OfferDoc,
        task: TaskDoc,
        from: OfferStatus,
        final_amount: u64,
        /// 0 for direct offers.
        fee_charged: u64,
        /// Helper balance after the fee, when one was charged.
        helper_balance: Option<u64>,
    },
    /// Helper short on coins; the offer is parked until `deadline`.
    AwaitingTopUp {
        offer: OfferDoc,
        from: OfferStatus,
        deadline: Timestamp,
        balance: u64,
        required: u64,
    },
}

impl AcceptOutcome {
    #[must_use]
    pub fn offer(&self) -> &OfferDoc {
        match self {
            Self::Accepted { offer, .. } | Self::AwaitingTopUp { offer, .. } => offer,
        }
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteOutcome {
    pub invite: InviteDoc,
    pub fee_charged: u64,
    /// Poster balance after the fee, when one was charged.
    pub balance: Option<u64>,
    /// False when the invite already existed.
    pub created: bool,
}
