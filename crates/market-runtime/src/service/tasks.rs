//! Task lifecycle operations.

use market_telemetry::metric_inc;
use market_telemetry::metrics::{INSUFFICIENT_FUNDS, TASK_TRANSITIONS};
use shared_bus::{ListingPath, MarketEvent};
use shared_types::{
    AuthenticatedCall, FailureReason, LedgerKind, ServiceError, TaskDoc, TaskStatus,
};
use tm_02_wallet_ledger::keys;
use tm_03_task_lifecycle::{PublishOutcome, TaskTransition};
use tracing::info;
use uuid::Uuid;

use super::{MarketplaceService, ReviewDecision, TaskRef, TaskRequest};

impl MarketplaceService {
    /// Creates or updates a draft owned by the caller. No fee.
    pub async fn save_draft(&self, call: AuthenticatedCall<TaskRequest>) -> Result<TaskDoc, ServiceError> {
        let task = self.observe("save_draft", || {
            let caller = call.require_caller()?;
            let request = &call.payload;
            Ok(self
                .container
                .tasks
                .save_draft(&caller.uid, &request.task_id, &request.task)?)
        })?;
        self.emit(
            call.correlation_id,
            MarketEvent::TaskDrafted {
                task_id: task.task_id.clone(),
                poster_id: task.poster_id.clone(),
            },
        )
        .await;
        Ok(task)
    }

    /// Gated publish: balance check, listing and post fee in one transaction.
    pub async fn publish_task(
        &self,
        call: AuthenticatedCall<TaskRequest>,
    ) -> Result<PublishOutcome, ServiceError> {
        let outcome = self.observe("publish_task", || {
            let caller = call.require_caller()?;
            let request = &call.payload;
            self.container
                .tasks
                .publish(&caller.uid, &request.task_id, &request.task)
                .map_err(ServiceError::from)
                .inspect_err(|err| {
                    if err.is_precondition(FailureReason::InsufficientFunds) {
                        metric_inc!(INSUFFICIENT_FUNDS, &["publish_task"]);
                    }
                })
        })?;

        if outcome.already_published {
            return Ok(outcome);
        }
        let task = &outcome.task;
        if let Some(balance) = outcome.balance {
            self.emit_posting(
                call.correlation_id,
                &task.poster_id,
                LedgerKind::PostFee,
                keys::post_fee(&task.task_id),
                -(outcome.fee_charged as i64),
                balance,
            )
            .await;
        }
        metric_inc!(TASK_TRANSITIONS, &[TaskStatus::Listed.as_str()]);
        self.emit(
            call.correlation_id,
            MarketEvent::TaskListed {
                task_id: task.task_id.clone(),
                poster_id: task.poster_id.clone(),
                via: ListingPath::Publish,
            },
        )
        .await;
        Ok(outcome)
    }

    /// Lists a task without the pre-publish gate. The post-fee safety net
    /// settles the fee (or removes the task) after the listing event.
    pub async fn create_listed_task(
        &self,
        call: AuthenticatedCall<TaskRequest>,
    ) -> Result<TaskDoc, ServiceError> {
        let task = self.observe("create_listed_task", || {
            let caller = call.require_caller()?;
            let request = &call.payload;
            Ok(self
                .container
                .tasks
                .create_listed(&caller.uid, &request.task_id, &request.task)?)
        })?;
        metric_inc!(TASK_TRANSITIONS, &[TaskStatus::Listed.as_str()]);
        self.emit(
            call.correlation_id,
            MarketEvent::TaskListed {
                task_id: task.task_id.clone(),
                poster_id: task.poster_id.clone(),
                via: ListingPath::Direct,
            },
        )
        .await;
        Ok(task)
    }

    /// Assigned helper starts work.
    pub async fn start_work(&self, call: AuthenticatedCall<TaskRef>) -> Result<TaskDoc, ServiceError> {
        let transition = self.observe("start_work", || {
            let caller = call.require_caller()?;
            Ok(self.container.tasks.start_work(&caller.uid, &call.payload.task_id)?)
        })?;
        self.emit_task_transition(call.correlation_id, &transition).await;
        Ok(transition.task)
    }

    /// Poster marks the work done.
    pub async fn complete_task(&self, call: AuthenticatedCall<TaskRef>) -> Result<TaskDoc, ServiceError> {
        let transition = self.observe("complete_task", || {
            let caller = call.require_caller()?;
            Ok(self.container.tasks.complete(&caller.uid, &call.payload.task_id)?)
        })?;
        self.emit_task_transition(call.correlation_id, &transition).await;
        Ok(transition.task)
    }

    /// Poster cancels the task. Fees already charged are not refunded.
    pub async fn cancel_task(&self, call: AuthenticatedCall<TaskRef>) -> Result<TaskDoc, ServiceError> {
        let transition = self.observe("cancel_task", || {
            let caller = call.require_caller()?;
            Ok(self.container.tasks.cancel(&caller.uid, &call.payload.task_id)?)
        })?;
        self.emit_task_transition(call.correlation_id, &transition).await;
        Ok(transition.task)
    }

    /// Admin decision on a task held for review: reinstate or cancel.
    pub async fn resolve_review(
        &self,
        call: AuthenticatedCall<ReviewDecision>,
    ) -> Result<TaskDoc, ServiceError> {
        let transition = self.observe("resolve_review", || {
            let admin = call.require_admin()?;
            let decision = &call.payload;
            let transition = self
                .container
                .tasks
                .resolve_review(&decision.task_id, decision.reinstate)?;
            info!(admin = %admin.uid, task_id = %decision.task_id, reinstate = decision.reinstate, "Review resolved");
            Ok(transition)
        })?;

        if transition.task.status == TaskStatus::Listed {
            metric_inc!(TASK_TRANSITIONS, &[TaskStatus::Listed.as_str()]);
            self.emit(
                call.correlation_id,
                MarketEvent::TaskListed {
                    task_id: transition.task.task_id.clone(),
                    poster_id: transition.task.poster_id.clone(),
                    via: ListingPath::Reinstated,
                },
            )
            .await;
        } else {
            self.emit_task_transition(call.correlation_id, &transition).await;
        }
        Ok(transition.task)
    }

    pub(super) async fn emit_task_transition(&self, correlation_id: Uuid, transition: &TaskTransition) {
        metric_inc!(TASK_TRANSITIONS, &[transition.task.status.as_str()]);
        self.emit(correlation_id, task_status_changed(transition)).await;
    }
}

pub(crate) fn task_status_changed(transition: &TaskTransition) -> MarketEvent {
    MarketEvent::TaskStatusChanged {
        task_id: transition.task.task_id.clone(),
        poster_id: transition.task.poster_id.clone(),
        helper_id: transition.task.assigned_helper_id.clone(),
        from: transition.from,
        to: transition.task.status,
    }
}
