//! Task lifecycle operations, each one transaction.

use crate::config::TaskLifecycleConfig;
use crate::domain::transitions::{ensure_owner, load_in, load_owned_in, transition};
use crate::domain::{
    ModerationOutcome, ModerationVerdict, PublishOutcome, SettleOutcome, TaskError, TaskPayload,
    TaskTransition,
};
use shared_types::{
    LedgerEntry, LedgerKind, ModerationReport, PlatformSettings, ReportStatus, TaskDoc, TaskStatus,
    UserDoc,
};
use tm_01_document_store::{StoreClient, Transaction};
use tm_02_wallet_ledger::{charge_in, keys, LedgerError, Posting};
use tracing::{debug, info, warn};

/// Reason recorded when the classifier gives none.
const DEFAULT_FLAG_REASON: &str = "Automatically flagged for harmful content.";

#[derive(Clone)]
pub struct TaskLifecycle {
    client: StoreClient,
    config: TaskLifecycleConfig,
}

impl TaskLifecycle {
    pub fn new(client: StoreClient, config: TaskLifecycleConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &TaskLifecycleConfig {
        &self.config
    }

    pub fn get(&self, task_id: &str) -> Result<Option<TaskDoc>, TaskError> {
        Ok(self.client.get::<TaskDoc>(task_id)?)
    }

    /// Lists a task and charges the post fee, all or nothing.
    ///
    /// The poster must hold at least `min_post_balance + post_fee`. Publishing
    /// a task whose fee entry already exists is a no-op returning the task.
    pub fn publish(
        &self,
        poster_id: &str,
        task_id: &str,
        payload: &TaskPayload,
    ) -> Result<PublishOutcome, TaskError> {
        let payload = payload.normalized(false)?;
        let fee_key = keys::post_fee(task_id);

        let outcome = self.client.run_transaction(|tx| {
            let existing = tx.get::<TaskDoc>(task_id)?;
            let fee_paid = tx.exists::<LedgerEntry>(&fee_key)?;
            if let Some(task) = &existing {
                ensure_owner(task, poster_id)?;
                match task.status {
                    TaskStatus::Listed if fee_paid => {
                        return Ok(PublishOutcome {
                            task: task.clone(),
                            fee_charged: 0,
                            balance: None,
                            already_published: true,
                        });
                    }
                    TaskStatus::Draft | TaskStatus::Listed => {}
                    status => {
                        return Err(TaskError::WrongState {
                            task_id: task_id.to_string(),
                            status,
                            action: "publish",
                        });
                    }
                }
            }

            let settings = tx
                .get::<PlatformSettings>(PlatformSettings::DOC_ID)?
                .unwrap_or_default();
            let (min_balance, post_fee) = self.config.effective(&settings);
            let poster: UserDoc = tx
                .get(poster_id)?
                .ok_or_else(|| LedgerError::UserNotFound(poster_id.to_string()))?;

            let required = min_balance.saturating_add(post_fee);
            if !fee_paid && poster.wallet_balance < required {
                return Err(TaskError::from(LedgerError::InsufficientFunds {
                    uid: poster_id.to_string(),
                    balance: poster.wallet_balance,
                    required,
                }));
            }

            let now = tx.now();
            let mut task = match existing.clone() {
                Some(mut task) => {
                    payload.clone().merge_into(&mut task, now);
                    task
                }
                None => payload.clone().into_task(task_id, poster_id, TaskStatus::Draft, now),
            };
            task.status = TaskStatus::Listed;

            let mut fee_charged = 0;
            let mut balance = None;
            if !fee_paid && post_fee > 0 {
                let posting =
                    Posting::new(poster_id, post_fee, LedgerKind::PostFee, &fee_key).with_task(task_id);
                let receipt = charge_in(tx, &posting)?;
                fee_charged = post_fee;
                balance = Some(receipt.balance);
            }
            if fee_paid || fee_charged > 0 {
                task.post_fee_txn_id = Some(fee_key.clone());
            }
            tx.set(&task)?;

            Ok(PublishOutcome {
                task,
                fee_charged,
                balance,
                already_published: false,
            })
        })?;

        if outcome.already_published {
            debug!(task_id, poster_id, "Publish replay ignored");
        } else {
            info!(
                task_id,
                poster_id,
                fee = outcome.fee_charged,
                balance = ?outcome.balance,
                "Task published"
            );
        }
        Ok(outcome)
    }

    /// Creates or edits a draft. No fee, no balance gate.
    pub fn save_draft(
        &self,
        poster_id: &str,
        task_id: &str,
        payload: &TaskPayload,
    ) -> Result<TaskDoc, TaskError> {
        let payload = payload.normalized(true)?;
        let task = self.client.run_transaction(|tx| {
            let now = tx.now();
            let task = match tx.get::<TaskDoc>(task_id)? {
                Some(mut task) => {
                    ensure_owner(&task, poster_id)?;
                    if task.status != TaskStatus::Draft {
                        return Err(TaskError::WrongState {
                            task_id: task_id.to_string(),
                            status: task.status,
                            action: "save draft",
                        });
                    }
                    payload.clone().merge_into(&mut task, now);
                    task
                }
                None => payload.clone().into_task(task_id, poster_id, TaskStatus::Draft, now),
            };
            tx.set(&task)?;
            Ok(task)
        })?;
        debug!(task_id, poster_id, "Draft saved");
        Ok(task)
    }

    /// Writes a task straight to `listed` without charging.
    ///
    /// Used by direct-contact flows; `settle_post_fee` collects the fee
    /// afterwards.
    pub fn create_listed(
        &self,
        poster_id: &str,
        task_id: &str,
        payload: &TaskPayload,
    ) -> Result<TaskDoc, TaskError> {
        let payload = payload.normalized(false)?;
        let (task, created) = self.client.run_transaction(|tx| {
            if let Some(task) = tx.get::<TaskDoc>(task_id)? {
                ensure_owner(&task, poster_id)?;
                if task.status != TaskStatus::Listed {
                    return Err(TaskError::WrongState {
                        task_id: task_id.to_string(),
                        status: task.status,
                        action: "list",
                    });
                }
                return Ok((task, false));
            }
            let task = payload
                .clone()
                .into_task(task_id, poster_id, TaskStatus::Listed, tx.now());
            tx.set(&task)?;
            Ok((task, true))
        })?;
        if created {
            info!(task_id, poster_id, "Task listed without fee");
        }
        Ok(task)
    }

    /// Charges the post fee for any non-draft task that has not paid it.
    ///
    /// When the poster cannot pay, a task still on the board with no accepted
    /// offer is deleted. A task that has already moved on is kept and
    /// reported as [`SettleOutcome::Outstanding`].
    pub fn settle_post_fee(&self, task_id: &str) -> Result<SettleOutcome, TaskError> {
        let fee_key = keys::post_fee(task_id);
        let outcome = self.client.run_transaction(|tx| {
            let Some(mut task) = tx.get::<TaskDoc>(task_id)? else {
                return Ok(SettleOutcome::Skipped);
            };
            if task.status == TaskStatus::Draft {
                return Ok(SettleOutcome::Skipped);
            }
            if tx.exists::<LedgerEntry>(&fee_key)? {
                if task.post_fee_txn_id.is_none() {
                    task.post_fee_txn_id = Some(fee_key.clone());
                    tx.set(&task)?;
                }
                return Ok(SettleOutcome::AlreadyCharged);
            }

            let settings = tx
                .get::<PlatformSettings>(PlatformSettings::DOC_ID)?
                .unwrap_or_default();
            let (_, post_fee) = self.config.effective(&settings);
            if post_fee == 0 {
                return Ok(SettleOutcome::Skipped);
            }

            let posting = Posting::new(&task.poster_id, post_fee, LedgerKind::PostFee, &fee_key)
                .with_task(task_id);
            let balance = match charge_in(tx, &posting) {
                Ok(receipt) => {
                    task.post_fee_txn_id = Some(fee_key.clone());
                    task.updated_at = tx.now();
                    tx.set(&task)?;
                    return Ok(SettleOutcome::Charged {
                        fee: post_fee,
                        balance: receipt.balance,
                    });
                }
                Err(LedgerError::InsufficientFunds { balance, .. }) => balance,
                Err(LedgerError::UserNotFound(_)) => 0,
                Err(e) => return Err(TaskError::from(e)),
            };

            let poster_id = task.poster_id.clone();
            let on_board = matches!(task.status, TaskStatus::Listed | TaskStatus::UnderReview);
            if on_board && task.accepted_offer_id.is_none() {
                tx.delete::<TaskDoc>(task_id);
                Ok(SettleOutcome::Removed { poster_id, balance })
            } else {
                Ok(SettleOutcome::Outstanding {
                    poster_id,
                    status: task.status,
                    balance,
                })
            }
        })?;

        match &outcome {
            SettleOutcome::Charged { fee, balance } => {
                info!(task_id, fee, balance, "Post fee settled");
            }
            SettleOutcome::Removed { poster_id, balance } => {
                warn!(task_id, poster_id = %poster_id, balance, "Task removed: post fee unpaid");
            }
            SettleOutcome::Outstanding {
                poster_id,
                status,
                balance,
            } => {
                warn!(
                    task_id,
                    poster_id = %poster_id,
                    status = %status,
                    balance,
                    "Post fee outstanding on a task past listing"
                );
            }
            SettleOutcome::AlreadyCharged | SettleOutcome::Skipped => {
                debug!(task_id, ?outcome, "Post fee settlement not needed");
            }
        }
        Ok(outcome)
    }

    /// Non-draft tasks that carry no post-fee reference yet.
    pub fn unsettled(&self) -> Result<Vec<TaskDoc>, TaskError> {
        Ok(self
            .client
            .query::<TaskDoc>("")?
            .into_iter()
            .filter(|task| task.status != TaskStatus::Draft && task.post_fee_txn_id.is_none())
            .collect())
    }

    /// Text submitted to the content classifier: title and description.
    pub fn moderation_text(&self, task_id: &str) -> Result<Option<String>, TaskError> {
        Ok(self.get(task_id)?.map(|task| {
            format!("{} {}", task.title, task.description)
                .trim()
                .to_string()
        }))
    }

    /// Applies a classifier verdict to a listed task.
    ///
    /// `Unsafe` moves it to `under_review` and files one report per task.
    pub fn moderate(
        &self,
        task_id: &str,
        verdict: &ModerationVerdict,
    ) -> Result<ModerationOutcome, TaskError> {
        let reason = match verdict {
            ModerationVerdict::Safe => return Ok(ModerationOutcome::Unchanged),
            ModerationVerdict::Unsafe { reason } => reason
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_FLAG_REASON)
                .to_string(),
        };

        let outcome = self.client.run_transaction(|tx| {
            let Some(task) = tx.get::<TaskDoc>(task_id)? else {
                return Ok::<_, TaskError>(ModerationOutcome::Unchanged);
            };
            if task.status != TaskStatus::Listed {
                return Ok(ModerationOutcome::Unchanged);
            }
            let flagged = transition(
                tx,
                task,
                &[TaskStatus::Listed],
                TaskStatus::UnderReview,
                "flag",
            )?;
            file_report_in(tx, &flagged.task, &reason)?;
            Ok(ModerationOutcome::Flagged(flagged.task))
        })?;

        if let ModerationOutcome::Flagged(task) = &outcome {
            warn!(task_id, poster_id = %task.poster_id, reason = %reason, "Task flagged for review");
        }
        Ok(outcome)
    }

    /// Admin decision on a flagged task: back to `listed` or `cancelled`.
    pub fn resolve_review(&self, task_id: &str, reinstate: bool) -> Result<TaskTransition, TaskError> {
        let to = if reinstate {
            TaskStatus::Listed
        } else {
            TaskStatus::Cancelled
        };
        let moved = self.client.run_transaction(|tx| {
            let task = load_in(tx, task_id)?;
            let moved = transition(tx, task, &[TaskStatus::UnderReview], to, "resolve review")?;
            let report_id = ModerationReport::report_id_for(task_id);
            if let Some(mut report) = tx.get::<ModerationReport>(&report_id)? {
                report.status = ReportStatus::Closed;
                tx.set(&report)?;
            }
            Ok::<_, TaskError>(moved)
        })?;
        info!(task_id, reinstate, "Review resolved");
        Ok(moved)
    }

    /// Assigned helper starts the work.
    pub fn start_work(&self, helper_id: &str, task_id: &str) -> Result<TaskTransition, TaskError> {
        let moved = self.client.run_transaction(|tx| {
            let task = load_in(tx, task_id)?;
            if task.assigned_helper_id.as_deref() != Some(helper_id) {
                return Err(TaskError::NotAssignedHelper {
                    task_id: task_id.to_string(),
                    uid: helper_id.to_string(),
                });
            }
            transition(tx, task, &[TaskStatus::Assigned], TaskStatus::InProgress, "start")
        })?;
        info!(task_id, helper_id, "Work started");
        Ok(moved)
    }

    /// Poster marks the work done.
    pub fn complete(&self, poster_id: &str, task_id: &str) -> Result<TaskTransition, TaskError> {
        let moved = self.client.run_transaction(|tx| {
            let task = load_owned_in(tx, task_id, poster_id)?;
            transition(tx, task, &[TaskStatus::InProgress], TaskStatus::Completed, "complete")
        })?;
        info!(task_id, poster_id, "Task completed");
        Ok(moved)
    }

    /// Poster withdraws the task. Fees already charged are not refunded.
    pub fn cancel(&self, poster_id: &str, task_id: &str) -> Result<TaskTransition, TaskError> {
        let moved = self.client.run_transaction(|tx| {
            let task = load_owned_in(tx, task_id, poster_id)?;
            transition(
                tx,
                task,
                &[
                    TaskStatus::Draft,
                    TaskStatus::Listed,
                    TaskStatus::Assigned,
                    TaskStatus::InProgress,
                ],
                TaskStatus::Cancelled,
                "cancel",
            )
        })?;
        info!(task_id, poster_id, from = %moved.from, "Task cancelled");
        Ok(moved)
    }
}

fn file_report_in(tx: &mut Transaction<'_>, task: &TaskDoc, reason: &str) -> Result<(), TaskError> {
    let report_id = ModerationReport::report_id_for(&task.task_id);
    if tx.exists::<ModerationReport>(&report_id)? {
        return Ok(());
    }
    let report = ModerationReport {
        report_id,
        task_id: task.task_id.clone(),
        poster_id: task.poster_id.clone(),
        snippet: task.title.clone(),
        reason: reason.to_string(),
        reporter: ModerationReport::SYSTEM_REPORTER.to_string(),
        status: ReportStatus::Pending,
        created_at: tx.now(),
    };
    tx.set(&report)?;
    Ok(())
}
