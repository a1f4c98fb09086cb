//! Offer operations, each one transaction.

use crate::config::{InsufficientFundsPolicy, OfferConfig};
use crate::domain::{
    agreed_price, check_edge, lapse_hold, AcceptOutcome, InviteOutcome, OfferError,
    OfferSubmission, OfferTransition,
};
use shared_types::{
    InviteDoc, LedgerKind, OfferAction, OfferDoc, OfferOrigin, OfferStatus, TaskDoc, TaskStatus,
    UserDoc,
};
use tm_01_document_store::{StoreClient, Transaction};
use tm_02_wallet_ledger::{charge_in, keys, LedgerError, Posting};
use tm_03_task_lifecycle::{assign_in, TaskError};
use tm_05_category_eligibility::normalize_category_id;
use tracing::{debug, info, warn};

/// Negotiation fields carried by a move.
#[derive(Debug, Default)]
struct MoveArgs {
    price: Option<u64>,
    note: Option<String>,
    reason: Option<String>,
}

#[derive(Clone)]
pub struct OfferNegotiation {
    client: StoreClient,
    config: OfferConfig,
}

impl OfferNegotiation {
    pub fn new(client: StoreClient, config: OfferConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &OfferConfig {
        &self.config
    }

    /// Current offer, with a lapsed top-up hold already rolled back.
    pub fn get(&self, offer_id: &str) -> Result<Option<OfferDoc>, OfferError> {
        let now = self.client.now();
        Ok(self.client.get::<OfferDoc>(offer_id)?.map(|mut offer| {
            lapse_hold(&mut offer, now);
            offer
        }))
    }

    /// Helper bids on a listed task.
    ///
    /// The offer is `direct` when the poster invited this helper to the task.
    /// Resubmitting the same `offer_id` returns the stored offer.
    pub fn submit_offer(
        &self,
        helper_id: &str,
        task_id: &str,
        offer_id: &str,
        amount: u64,
    ) -> Result<OfferSubmission, OfferError> {
        if amount == 0 {
            return Err(OfferError::InvalidPrice);
        }
        let submission = self.client.run_transaction(|tx| {
            if let Some(existing) = tx.get::<OfferDoc>(offer_id)? {
                if existing.helper_id == helper_id && existing.task_id == task_id {
                    return Ok(OfferSubmission {
                        offer: existing,
                        created: false,
                    });
                }
                return Err(OfferError::OfferIdTaken(offer_id.to_string()));
            }

            let task = tx
                .get::<TaskDoc>(task_id)?
                .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
            if task.poster_id == helper_id {
                return Err(OfferError::SelfDealing(helper_id.to_string()));
            }
            ensure_listed(&task)?;
            if !tx.exists::<UserDoc>(helper_id)? {
                return Err(OfferError::from(LedgerError::UserNotFound(helper_id.to_string())));
            }

            let invite_id = InviteDoc::invite_id_for(Some(task_id), &task.poster_id, helper_id);
            let origin = if tx.exists::<InviteDoc>(&invite_id)? {
                OfferOrigin::Direct
            } else {
                OfferOrigin::Public
            };

            let now = tx.now();
            let offer = OfferDoc {
                offer_id: offer_id.to_string(),
                task_id: task_id.to_string(),
                helper_id: helper_id.to_string(),
                poster_id: task.poster_id,
                amount,
                counter_price: None,
                counter_note: None,
                helper_counter_price: None,
                helper_agreed: false,
                origin,
                status: OfferStatus::Pending,
                held_from: None,
                top_up_deadline: None,
                reject_reason: None,
                created_at: now,
                updated_at: now,
            };
            tx.set(&offer)?;
            Ok(OfferSubmission {
                offer,
                created: true,
            })
        })?;

        if submission.created {
            info!(
                offer_id,
                task_id,
                helper_id,
                amount,
                origin = ?submission.offer.origin,
                "Offer submitted"
            );
        } else {
            debug!(offer_id, "Offer resubmission ignored");
        }
        Ok(submission)
    }

    /// Helper proposes a different price.
    pub fn helper_counter(
        &self,
        helper_id: &str,
        offer_id: &str,
        price: u64,
    ) -> Result<OfferTransition, OfferError> {
        if price == 0 {
            return Err(OfferError::InvalidPrice);
        }
        self.negotiate(
            helper_id,
            offer_id,
            OfferAction::HelperCounter,
            MoveArgs {
                price: Some(price),
                ..MoveArgs::default()
            },
        )
    }

    /// Poster proposes a different price. Any earlier helper agreement is void.
    pub fn propose_counter(
        &self,
        poster_id: &str,
        offer_id: &str,
        price: u64,
        note: Option<String>,
    ) -> Result<OfferTransition, OfferError> {
        if price == 0 {
            return Err(OfferError::InvalidPrice);
        }
        self.negotiate(
            poster_id,
            offer_id,
            OfferAction::ProposeCounter,
            MoveArgs {
                price: Some(price),
                note,
                ..MoveArgs::default()
            },
        )
    }

    /// Helper agrees to the poster's counter, unlocking acceptance.
    pub fn agree_to_counter(&self, helper_id: &str, offer_id: &str) -> Result<OfferTransition, OfferError> {
        self.negotiate(helper_id, offer_id, OfferAction::AgreeToCounter, MoveArgs::default())
    }

    pub fn reject_offer(
        &self,
        poster_id: &str,
        offer_id: &str,
        reason: Option<String>,
    ) -> Result<OfferTransition, OfferError> {
        self.negotiate(
            poster_id,
            offer_id,
            OfferAction::Reject,
            MoveArgs {
                reason,
                ..MoveArgs::default()
            },
        )
    }

    pub fn withdraw_offer(&self, helper_id: &str, offer_id: &str) -> Result<OfferTransition, OfferError> {
        self.negotiate(helper_id, offer_id, OfferAction::Withdraw, MoveArgs::default())
    }

    /// Accepts an offer: fee, eligibility and task assignment in one commit.
    pub fn accept_offer(&self, poster_id: &str, offer_id: &str) -> Result<AcceptOutcome, OfferError> {
        let outcome = self.client.run_transaction(|tx| {
            let (mut offer, task) = load_in(tx, offer_id)?;
            authorize(&offer, &task, poster_id, OfferAction::Accept)?;
            check_edge(&offer, OfferAction::Accept)?;
            ensure_listed(&task)?;

            let helper: UserDoc = tx
                .get(&offer.helper_id)?
                .ok_or_else(|| LedgerError::UserNotFound(offer.helper_id.clone()))?;
            if !helper.is_allowed(&task.category_id) {
                return Err(OfferError::CategoryIneligible {
                    uid: offer.helper_id.clone(),
                    category_id: task.category_id.clone(),
                });
            }

            let now = tx.now();
            let from = offer.status;
            let final_amount = agreed_price(&offer);
            let mut fee_charged = 0;
            let mut helper_balance = None;

            if offer.origin == OfferOrigin::Public && self.config.accept_fee > 0 {
                let posting = Posting::new(
                    &offer.helper_id,
                    self.config.accept_fee,
                    LedgerKind::AcceptFee,
                    keys::accept_fee(offer_id),
                )
                .with_task(&task.task_id)
                .with_offer(offer_id);

                match charge_in(tx, &posting) {
                    Ok(receipt) => {
                        if receipt.applied {
                            fee_charged = self.config.accept_fee;
                        }
                        helper_balance = Some(receipt.balance);
                    }
                    Err(LedgerError::InsufficientFunds { balance, required, .. })
                        if self.config.insufficient_funds == InsufficientFundsPolicy::HoldForTopUp =>
                    {
                        let deadline = hold_in(tx, &mut offer, self.config.top_up_grace_ms)?;
                        return Ok(AcceptOutcome::AwaitingTopUp {
                            offer,
                            from,
                            deadline,
                            balance,
                            required,
                        });
                    }
                    Err(e) => return Err(OfferError::from(e)),
                }
            }

            let assigned = assign_in(tx, &task.task_id, &offer.helper_id, offer_id, final_amount)?;
            offer.status = OfferStatus::Accepted;
            offer.held_from = None;
            offer.top_up_deadline = None;
            offer.updated_at = now;
            tx.set(&offer)?;

            Ok(AcceptOutcome::Accepted {
                offer,
                task: assigned.task,
                from,
                final_amount,
                fee_charged,
                helper_balance,
            })
        })?;

        match &outcome {
            AcceptOutcome::Accepted {
                offer,
                final_amount,
                fee_charged,
                ..
            } => info!(
                offer_id,
                task_id = %offer.task_id,
                helper_id = %offer.helper_id,
                final_amount,
                fee_charged,
                "Offer accepted"
            ),
            AcceptOutcome::AwaitingTopUp {
                offer,
                deadline,
                balance,
                required,
                ..
            } => warn!(
                offer_id,
                helper_id = %offer.helper_id,
                balance,
                required,
                deadline,
                "Offer held for helper top-up"
            ),
        }
        Ok(outcome)
    }

    /// Poster pays the direct contact fee to invite a helper.
    ///
    /// The helper must be allowed in `raw_category`. Repeating the invite for
    /// the same task and helper returns the stored invite without charging.
    pub fn invite_helper(
        &self,
        poster_id: &str,
        helper_id: &str,
        raw_category: &str,
        task_id: Option<&str>,
    ) -> Result<InviteOutcome, OfferError> {
        if poster_id == helper_id {
            return Err(OfferError::SelfDealing(poster_id.to_string()));
        }
        let category_id = normalize_category_id(raw_category);
        if category_id.is_empty() {
            return Err(OfferError::InvalidCategory(raw_category.to_string()));
        }
        let invite_id = InviteDoc::invite_id_for(task_id, poster_id, helper_id);
        let fee_key = keys::direct_contact(task_id, poster_id, helper_id, &category_id);

        let outcome = self.client.run_transaction(|tx| {
            if let Some(invite) = tx.get::<InviteDoc>(&invite_id)? {
                return Ok(InviteOutcome {
                    invite,
                    fee_charged: 0,
                    balance: None,
                    created: false,
                });
            }
            if let Some(task_id) = task_id {
                let task = tx
                    .get::<TaskDoc>(task_id)?
                    .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
                if task.poster_id != poster_id {
                    return Err(OfferError::from(TaskError::NotOwner {
                        task_id: task_id.to_string(),
                        uid: poster_id.to_string(),
                    }));
                }
                ensure_listed(&task)?;
            }

            let helper: UserDoc = tx
                .get(helper_id)?
                .ok_or_else(|| LedgerError::UserNotFound(helper_id.to_string()))?;
            if !helper.is_allowed(&category_id) {
                return Err(OfferError::CategoryIneligible {
                    uid: helper_id.to_string(),
                    category_id: category_id.clone(),
                });
            }

            let mut fee_charged = 0;
            let mut balance = None;
            if self.config.direct_contact_fee > 0 {
                let mut posting = Posting::new(
                    poster_id,
                    self.config.direct_contact_fee,
                    LedgerKind::DirectContactFee,
                    &fee_key,
                );
                if let Some(task_id) = task_id {
                    posting = posting.with_task(task_id);
                }
                let receipt = charge_in(tx, &posting)?;
                if receipt.applied {
                    fee_charged = self.config.direct_contact_fee;
                }
                balance = Some(receipt.balance);
            }

            let invite = InviteDoc {
                invite_id: invite_id.clone(),
                poster_id: poster_id.to_string(),
                helper_id: helper_id.to_string(),
                task_id: task_id.map(str::to_string),
                category_id: category_id.clone(),
                fee_key: fee_key.clone(),
                created_at: tx.now(),
            };
            tx.set(&invite)?;
            Ok(InviteOutcome {
                invite,
                fee_charged,
                balance,
                created: true,
            })
        })?;

        if outcome.created {
            info!(poster_id, helper_id, category = %category_id, fee = outcome.fee_charged, "Helper invited");
        } else {
            debug!(poster_id, helper_id, "Invite replay ignored");
        }
        Ok(outcome)
    }

    fn negotiate(
        &self,
        caller: &str,
        offer_id: &str,
        action: OfferAction,
        args: MoveArgs,
    ) -> Result<OfferTransition, OfferError> {
        let transition = self.client.run_transaction(|tx| {
            let (mut offer, task) = load_in(tx, offer_id)?;
            authorize(&offer, &task, caller, action)?;
            let to = check_edge(&offer, action)?;
            if !matches!(action, OfferAction::Reject | OfferAction::Withdraw) {
                ensure_listed(&task)?;
            }

            let from = offer.status;
            match action {
                OfferAction::HelperCounter => offer.helper_counter_price = args.price,
                OfferAction::ProposeCounter => {
                    offer.counter_price = args.price;
                    offer.counter_note = args.note.clone();
                    offer.helper_agreed = false;
                }
                OfferAction::AgreeToCounter => offer.helper_agreed = true,
                OfferAction::Reject => offer.reject_reason = args.reason.clone(),
                OfferAction::Withdraw | OfferAction::Accept => {}
            }
            offer.status = to;
            offer.held_from = None;
            offer.top_up_deadline = None;
            offer.updated_at = tx.now();
            tx.set(&offer)?;

            Ok::<_, OfferError>(OfferTransition { offer, action, from })
        })?;

        info!(
            offer_id,
            task_id = %transition.offer.task_id,
            action = %action,
            from = %transition.from,
            to = %transition.offer.status,
            "Offer transitioned"
        );
        Ok(transition)
    }
}

/// Loads an offer and its task, lapsing any expired hold and refreshing the
/// cached poster from the task.
fn load_in(tx: &mut Transaction<'_>, offer_id: &str) -> Result<(OfferDoc, TaskDoc), OfferError> {
    let mut offer = tx
        .get::<OfferDoc>(offer_id)?
        .ok_or_else(|| OfferError::NotFound(offer_id.to_string()))?;
    lapse_hold(&mut offer, tx.now());
    let task = tx
        .get::<TaskDoc>(&offer.task_id)?
        .ok_or_else(|| TaskError::NotFound(offer.task_id.clone()))?;
    offer.poster_id = task.poster_id.clone();
    Ok((offer, task))
}

/// Terminal offers fail for everyone; otherwise the caller must be the side
/// that owns `action`.
fn authorize(offer: &OfferDoc, task: &TaskDoc, caller: &str, action: OfferAction) -> Result<(), OfferError> {
    if offer.status.is_terminal() {
        return Err(OfferError::InvalidTransition {
            offer_id: offer.offer_id.clone(),
            from: offer.status,
            action,
        });
    }
    let party = if action.by_poster() {
        &task.poster_id
    } else {
        &offer.helper_id
    };
    if party != caller {
        return Err(OfferError::NotParticipant {
            offer_id: offer.offer_id.clone(),
            uid: caller.to_string(),
            action,
        });
    }
    Ok(())
}

fn ensure_listed(task: &TaskDoc) -> Result<(), OfferError> {
    if task.status == TaskStatus::Listed {
        Ok(())
    } else {
        Err(TaskError::NotOpen {
            task_id: task.task_id.clone(),
            status: task.status,
        }
        .into())
    }
}

/// Parks `offer` in `awaiting_topup`. A live hold keeps its deadline.
fn hold_in(tx: &mut Transaction<'_>, offer: &mut OfferDoc, grace_ms: u64) -> Result<u64, OfferError> {
    let now = tx.now();
    let deadline = match (offer.status, offer.top_up_deadline) {
        (OfferStatus::AwaitingTopup, Some(deadline)) => deadline,
        _ => {
            offer.held_from = Some(offer.status);
            now.saturating_add(grace_ms)
        }
    };
    offer.status = OfferStatus::AwaitingTopup;
    offer.top_up_deadline = Some(deadline);
    offer.updated_at = now;
    tx.set(&*offer)?;
    Ok(deadline)
}
