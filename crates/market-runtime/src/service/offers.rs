//! Offer negotiation operations.

use market_telemetry::metric_inc;
use market_telemetry::metrics::{INSUFFICIENT_FUNDS, OFFER_TRANSITIONS, TASK_TRANSITIONS};
use shared_bus::MarketEvent;
use shared_types::{
    AuthenticatedCall, FailureReason, LedgerKind, OfferAction, OfferDoc, OfferStatus, ServiceError,
    TaskStatus,
};
use tm_02_wallet_ledger::keys;
use tm_03_task_lifecycle::TaskTransition;
use tm_04_offer_negotiation::{AcceptOutcome, InviteOutcome, OfferSubmission, OfferTransition};
use uuid::Uuid;

use super::tasks::task_status_changed;
use super::{
    CounterRequest, InviteRequest, MarketplaceService, OfferRef, RejectOfferRequest,
    SubmitOfferRequest,
};

impl MarketplaceService {
    /// Helper offers on a listed task.
    pub async fn submit_offer(
        &self,
        call: AuthenticatedCall<SubmitOfferRequest>,
    ) -> Result<OfferSubmission, ServiceError> {
        let submission = self.observe("submit_offer", || {
            let caller = call.require_caller()?;
            let request = &call.payload;
            Ok(self.container.offers.submit_offer(
                &caller.uid,
                &request.task_id,
                &request.offer_id,
                request.amount,
            )?)
        })?;

        if submission.created {
            let offer = &submission.offer;
            self.emit(
                call.correlation_id,
                MarketEvent::OfferSubmitted {
                    task_id: offer.task_id.clone(),
                    offer_id: offer.offer_id.clone(),
                    helper_id: offer.helper_id.clone(),
                    poster_id: offer.poster_id.clone(),
                    amount: offer.amount,
                    origin: offer.origin,
                },
            )
            .await;
        }
        Ok(submission)
    }

    /// Helper proposes a different price.
    pub async fn helper_counter(
        &self,
        call: AuthenticatedCall<CounterRequest>,
    ) -> Result<OfferDoc, ServiceError> {
        let transition = self.observe("helper_counter", || {
            let caller = call.require_caller()?;
            let request = &call.payload;
            Ok(self
                .container
                .offers
                .helper_counter(&caller.uid, &request.offer_id, request.price)?)
        })?;
        let price = transition.offer.helper_counter_price;
        self.emit_offer_transition(call.correlation_id, &transition, price, None)
            .await;
        Ok(transition.offer)
    }

    /// Poster proposes a different price; resets the helper's agreement.
    pub async fn propose_counter(
        &self,
        call: AuthenticatedCall<CounterRequest>,
    ) -> Result<OfferDoc, ServiceError> {
        let transition = self.observe("propose_counter", || {
            let caller = call.require_caller()?;
            let request = &call.payload;
            Ok(self.container.offers.propose_counter(
                &caller.uid,
                &request.offer_id,
                request.price,
                request.note.clone(),
            )?)
        })?;
        let price = transition.offer.counter_price;
        let note = transition.offer.counter_note.clone();
        self.emit_offer_transition(call.correlation_id, &transition, price, note)
            .await;
        Ok(transition.offer)
    }

    /// Helper agrees to the poster's counter price, unlocking acceptance.
    pub async fn agree_to_counter(
        &self,
        call: AuthenticatedCall<OfferRef>,
    ) -> Result<OfferDoc, ServiceError> {
        let transition = self.observe("agree_to_counter", || {
            let caller = call.require_caller()?;
            Ok(self
                .container
                .offers
                .agree_to_counter(&caller.uid, &call.payload.offer_id)?)
        })?;
        let price = transition.offer.counter_price;
        self.emit_offer_transition(call.correlation_id, &transition, price, None)
            .await;
        Ok(transition.offer)
    }

    pub async fn reject_offer(
        &self,
        call: AuthenticatedCall<RejectOfferRequest>,
    ) -> Result<OfferDoc, ServiceError> {
        let transition = self.observe("reject_offer", || {
            let caller = call.require_caller()?;
            let request = &call.payload;
            Ok(self.container.offers.reject_offer(
                &caller.uid,
                &request.offer_id,
                request.reason.clone(),
            )?)
        })?;
        let reason = transition.offer.reject_reason.clone();
        self.emit_offer_transition(call.correlation_id, &transition, None, reason)
            .await;
        Ok(transition.offer)
    }

    pub async fn withdraw_offer(
        &self,
        call: AuthenticatedCall<OfferRef>,
    ) -> Result<OfferDoc, ServiceError> {
        let transition = self.observe("withdraw_offer", || {
            let caller = call.require_caller()?;
            Ok(self
                .container
                .offers
                .withdraw_offer(&caller.uid, &call.payload.offer_id)?)
        })?;
        self.emit_offer_transition(call.correlation_id, &transition, None, None)
            .await;
        Ok(transition.offer)
    }

    /// Poster accepts an offer: eligibility, acceptance fee and task
    /// assignment commit together or not at all.
    pub async fn accept_offer(
        &self,
        call: AuthenticatedCall<OfferRef>,
    ) -> Result<AcceptOutcome, ServiceError> {
        let outcome = self.observe("accept_offer", || {
            let caller = call.require_caller()?;
            self.container
                .offers
                .accept_offer(&caller.uid, &call.payload.offer_id)
                .map_err(ServiceError::from)
                .inspect_err(|err| {
                    if err.is_precondition(FailureReason::InsufficientFunds) {
                        metric_inc!(INSUFFICIENT_FUNDS, &["accept_offer"]);
                    }
                })
        })?;

        match &outcome {
            AcceptOutcome::Accepted {
                offer,
                task,
                from,
                final_amount,
                fee_charged,
                helper_balance,
            } => {
                if let Some(balance) = helper_balance.filter(|_| *fee_charged > 0) {
                    self.emit_posting(
                        call.correlation_id,
                        &offer.helper_id,
                        LedgerKind::AcceptFee,
                        keys::accept_fee(&offer.offer_id),
                        -(*fee_charged as i64),
                        balance,
                    )
                    .await;
                }
                let transition = OfferTransition {
                    offer: offer.clone(),
                    action: OfferAction::Accept,
                    from: *from,
                };
                self.emit_offer_transition(
                    call.correlation_id,
                    &transition,
                    Some(*final_amount),
                    None,
                )
                .await;

                metric_inc!(TASK_TRANSITIONS, &[TaskStatus::Assigned.as_str()]);
                let assigned = TaskTransition {
                    task: task.clone(),
                    from: TaskStatus::Listed,
                };
                self.emit(call.correlation_id, task_status_changed(&assigned))
                    .await;
            }
            AcceptOutcome::AwaitingTopUp { offer, from, .. } => {
                metric_inc!(INSUFFICIENT_FUNDS, &["accept_offer"]);
                // A retry while already held is not a new transition
                if *from != OfferStatus::AwaitingTopup {
                    let transition = OfferTransition {
                        offer: offer.clone(),
                        action: OfferAction::Accept,
                        from: *from,
                    };
                    self.emit_offer_transition(call.correlation_id, &transition, None, None)
                        .await;
                }
            }
        }
        Ok(outcome)
    }

    /// Poster invites a helper directly, paying the direct contact fee.
    pub async fn invite_helper(
        &self,
        call: AuthenticatedCall<InviteRequest>,
    ) -> Result<InviteOutcome, ServiceError> {
        let outcome = self.observe("invite_helper", || {
            let caller = call.require_caller()?;
            let request = &call.payload;
            Ok(self.container.offers.invite_helper(
                &caller.uid,
                &request.helper_id,
                &request.category_id,
                request.task_id.as_deref(),
            )?)
        })?;

        if outcome.created {
            let invite = &outcome.invite;
            if let Some(balance) = outcome.balance.filter(|_| outcome.fee_charged > 0) {
                self.emit_posting(
                    call.correlation_id,
                    &invite.poster_id,
                    LedgerKind::DirectContactFee,
                    invite.fee_key.clone(),
                    -(outcome.fee_charged as i64),
                    balance,
                )
                .await;
            }
            self.emit(
                call.correlation_id,
                MarketEvent::HelperInvited {
                    poster_id: invite.poster_id.clone(),
                    helper_id: invite.helper_id.clone(),
                    task_id: invite.task_id.clone(),
                    category_id: invite.category_id.clone(),
                },
            )
            .await;
        }
        Ok(outcome)
    }

    async fn emit_offer_transition(
        &self,
        correlation_id: Uuid,
        transition: &OfferTransition,
        price: Option<u64>,
        note: Option<String>,
    ) {
        let offer = &transition.offer;
        metric_inc!(
            OFFER_TRANSITIONS,
            &[transition.action.as_str(), offer.status.as_str()]
        );
        self.emit(
            correlation_id,
            MarketEvent::OfferTransitioned {
                task_id: offer.task_id.clone(),
                offer_id: offer.offer_id.clone(),
                helper_id: offer.helper_id.clone(),
                poster_id: offer.poster_id.clone(),
                action: transition.action,
                from: transition.from,
                to: offer.status,
                price,
                note,
            },
        )
        .await;
    }
}
