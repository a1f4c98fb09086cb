//! Idempotency key formats.
//!
//! A key names one business operation; its ledger entry's existence proves the
//! operation's balance mutation happened.

use shared_types::NO_TASK;

/// Posting fee for a task.
#[must_use]
pub fn post_fee(task_id: &str) -> String {
    format!("post_fee:{task_id}")
}

/// Acceptance fee charged to the helper of an offer.
#[must_use]
pub fn accept_fee(offer_id: &str) -> String {
    format!("accept:{offer_id}")
}

/// First-contact fee charged to a poster inviting a helper.
#[must_use]
pub fn direct_contact(task_id: Option<&str>, poster_id: &str, helper_id: &str, category_id: &str) -> String {
    format!(
        "direct_contact:{}:{poster_id}:{helper_id}:{category_id}",
        task_id.unwrap_or(NO_TASK)
    )
}

/// Coin top-up; `client_key` is supplied by the client for retries.
#[must_use]
pub fn topup(uid: &str, client_key: &str) -> String {
    format!("topup:{uid}:{client_key}")
}

/// One side of a dispute settlement.
#[must_use]
pub fn dispute(dispute_id: &str, uid: &str) -> String {
    format!("dispute:{dispute_id}:{uid}")
}
