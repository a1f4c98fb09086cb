//! Offer status edges.
//!
//! ```text
//! pending ──helper_counter──→ negotiating
//! pending | negotiating | counter ──propose_counter──→ counter (helper_agreed reset)
//! counter ──agree_to_counter──→ counter (helper_agreed = true)
//! pending | negotiating | counter* | awaiting_topup ──accept──→ accepted
//! negotiating | counter ──reject──→ rejected
//! pending ──withdraw──→ withdrawn
//!
//! * only once the helper agreed to the counter price
//! ```
//!
//! `awaiting_topup` lapses lazily: past its deadline the offer behaves as
//! the status it was held from.

use crate::domain::OfferError;
use shared_types::{OfferAction, OfferDoc, OfferStatus, Timestamp};

/// Status after the top-up hold has been checked against `now`.
#[must_use]
pub fn effective_status(offer: &OfferDoc, now: Timestamp) -> OfferStatus {
    match (offer.status, offer.held_from, offer.top_up_deadline) {
        (OfferStatus::AwaitingTopup, Some(held_from), Some(deadline)) if now > deadline => held_from,
        (status, _, _) => status,
    }
}

/// Rewrites a lapsed hold back to its previous status. Returns whether it did.
pub fn lapse_hold(offer: &mut OfferDoc, now: Timestamp) -> bool {
    let effective = effective_status(offer, now);
    if effective == offer.status {
        return false;
    }
    offer.status = effective;
    offer.held_from = None;
    offer.top_up_deadline = None;
    true
}

/// Target status of `action` from `from`, if the edge exists.
#[must_use]
pub fn next_status(from: OfferStatus, action: OfferAction) -> Option<OfferStatus> {
    use OfferAction::{Accept, AgreeToCounter, HelperCounter, ProposeCounter, Reject, Withdraw};
    use OfferStatus::{Accepted, AwaitingTopup, Counter, Negotiating, Pending, Rejected, Withdrawn};

    match (from, action) {
        (Pending, HelperCounter) => Some(Negotiating),
        (Pending | Negotiating | Counter, ProposeCounter) => Some(Counter),
        (Counter, AgreeToCounter) => Some(Counter),
        (Pending | Negotiating | Counter | AwaitingTopup, Accept) => Some(Accepted),
        (Negotiating | Counter, Reject) => Some(Rejected),
        (Pending, Withdraw) => Some(Withdrawn),
        _ => None,
    }
}

/// Checks that `action` may be applied to `offer` in its current status.
///
/// The offer must already have had its hold lapsed against the clock.
pub fn check_edge(offer: &OfferDoc, action: OfferAction) -> Result<OfferStatus, OfferError> {
    let to = next_status(offer.status, action).ok_or_else(|| OfferError::InvalidTransition {
        offer_id: offer.offer_id.clone(),
        from: offer.status,
        action,
    })?;
    if action == OfferAction::Accept && offer.status == OfferStatus::Counter && !offer.helper_agreed {
        return Err(OfferError::CounterNotAgreed(offer.offer_id.clone()));
    }
    Ok(to)
}

/// Price the task is assigned at when the offer is accepted.
#[must_use]
pub fn agreed_price(offer: &OfferDoc) -> u64 {
    let basis = match (offer.status, offer.held_from) {
        (OfferStatus::AwaitingTopup, Some(held_from)) => held_from,
        (status, _) => status,
    };
    match basis {
        OfferStatus::Counter => offer.counter_price.unwrap_or(offer.amount),
        OfferStatus::Negotiating => offer.helper_counter_price.unwrap_or(offer.amount),
        _ => offer.amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::OfferOrigin;

    const ALL_STATUSES: [OfferStatus; 7] = [
        OfferStatus::Pending,
        OfferStatus::Negotiating,
        OfferStatus::Counter,
        OfferStatus::Accepted,
        OfferStatus::Rejected,
        OfferStatus::Withdrawn,
        OfferStatus::AwaitingTopup,
    ];

    const ALL_ACTIONS: [OfferAction; 6] = [
        OfferAction::HelperCounter,
        OfferAction::ProposeCounter,
        OfferAction::AgreeToCounter,
        OfferAction::Accept,
        OfferAction::Reject,
        OfferAction::Withdraw,
    ];

    fn offer(status: OfferStatus) -> OfferDoc {
        OfferDoc {
            offer_id: "O1".into(),
            task_id: "T1".into(),
            helper_id: "H".into(),
            poster_id: "P".into(),
            amount: 1500,
            counter_price: None,
            counter_note: None,
            helper_counter_price: None,
            helper_agreed: false,
            origin: OfferOrigin::Public,
            status,
            held_from: None,
            top_up_deadline: None,
            reject_reason: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_terminal_states_have_no_edges() {
        for from in ALL_STATUSES.into_iter().filter(OfferStatus::is_terminal) {
            for action in ALL_ACTIONS {
                assert_eq!(next_status(from, action), None, "{from} --{action}-->");
            }
        }
    }

    #[test]
    fn test_edges_never_reach_awaiting_topup() {
        for from in ALL_STATUSES {
            for action in ALL_ACTIONS {
                assert_ne!(next_status(from, action), Some(OfferStatus::AwaitingTopup));
            }
        }
    }

    #[test]
    fn test_listed_edges() {
        use OfferAction::*;
        use OfferStatus::*;
        assert_eq!(next_status(Pending, HelperCounter), Some(Negotiating));
        assert_eq!(next_status(Pending, ProposeCounter), Some(Counter));
        assert_eq!(next_status(Pending, Accept), Some(Accepted));
        assert_eq!(next_status(Pending, Withdraw), Some(Withdrawn));
        assert_eq!(next_status(Counter, Reject), Some(Rejected));
        assert_eq!(next_status(Counter, AgreeToCounter), Some(Counter));
        assert_eq!(next_status(Counter, ProposeCounter), Some(Counter));
        assert_eq!(next_status(Negotiating, Accept), Some(Accepted));
        assert_eq!(next_status(Negotiating, ProposeCounter), Some(Counter));
        assert_eq!(next_status(Negotiating, Reject), Some(Rejected));
        assert_eq!(next_status(AwaitingTopup, Accept), Some(Accepted));

        assert_eq!(next_status(Pending, AgreeToCounter), None);
        assert_eq!(next_status(Counter, HelperCounter), None);
        assert_eq!(next_status(Counter, Withdraw), None);
        assert_eq!(next_status(Pending, Reject), None);
        assert_eq!(next_status(Negotiating, HelperCounter), None);
        assert_eq!(next_status(AwaitingTopup, Reject), None);
        assert_eq!(next_status(AwaitingTopup, Withdraw), None);
    }

    #[test]
    fn test_edge_table_is_exact() {
        use OfferAction::*;
        use OfferStatus::*;
        let listed = [
            (Pending, HelperCounter, Negotiating),
            (Pending, ProposeCounter, Counter),
            (Pending, Accept, Accepted),
            (Pending, Withdraw, Withdrawn),
            (Negotiating, ProposeCounter, Counter),
            (Negotiating, Accept, Accepted),
            (Negotiating, Reject, Rejected),
            (Counter, ProposeCounter, Counter),
            (Counter, AgreeToCounter, Counter),
            (Counter, Accept, Accepted),
            (Counter, Reject, Rejected),
            (AwaitingTopup, Accept, Accepted),
        ];
        for from in ALL_STATUSES {
            for action in ALL_ACTIONS {
                let expected = listed
                    .iter()
                    .find(|(f, a, _)| *f == from && *a == action)
                    .map(|(_, _, to)| *to);
                assert_eq!(next_status(from, action), expected, "{from} --{action}-->");
            }
        }
    }

    #[test]
    fn test_accept_counter_requires_agreement() {
        let mut o = offer(OfferStatus::Counter);
        o.counter_price = Some(1300);
        assert_eq!(
            check_edge(&o, OfferAction::Accept),
            Err(OfferError::CounterNotAgreed("O1".into()))
        );
        o.helper_agreed = true;
        assert_eq!(check_edge(&o, OfferAction::Accept), Ok(OfferStatus::Accepted));
        assert_eq!(agreed_price(&o), 1300);
    }

    #[test]
    fn test_terminal_is_invalid_transition() {
        let o = offer(OfferStatus::Withdrawn);
        assert!(matches!(
            check_edge(&o, OfferAction::Accept),
            Err(OfferError::InvalidTransition { from: OfferStatus::Withdrawn, .. })
        ));
    }

    #[test]
    fn test_hold_lapses_lazily() {
        let mut o = offer(OfferStatus::AwaitingTopup);
        o.held_from = Some(OfferStatus::Negotiating);
        o.helper_counter_price = Some(1200);
        o.top_up_deadline = Some(1_000);

        assert_eq!(effective_status(&o, 1_000), OfferStatus::AwaitingTopup);
        assert_eq!(agreed_price(&o), 1200);
        assert_eq!(effective_status(&o, 1_001), OfferStatus::Negotiating);

        assert!(!lapse_hold(&mut o, 500));
        assert!(lapse_hold(&mut o, 2_000));
        assert_eq!(o.status, OfferStatus::Negotiating);
        assert_eq!(o.held_from, None);
        assert_eq!(o.top_up_deadline, None);
    }

    #[test]
    fn test_agreed_price_by_status() {
        let mut o = offer(OfferStatus::Pending);
        o.helper_counter_price = Some(1200);
        o.counter_price = Some(1300);
        assert_eq!(agreed_price(&o), 1500);
        o.status = OfferStatus::Negotiating;
        assert_eq!(agreed_price(&o), 1200);
        o.status = OfferStatus::Counter;
        assert_eq!(agreed_price(&o), 1300);
    }
}
