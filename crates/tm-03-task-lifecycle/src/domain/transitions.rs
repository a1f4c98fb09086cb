//! Status edges shared by the service and by other subsystems' transactions.

use crate::domain::{TaskError, TaskTransition};
use shared_types::{TaskDoc, TaskStatus};
use tm_01_document_store::Transaction;

/// Loads a task or fails with `NotFound`.
pub(crate) fn load_in(tx: &mut Transaction<'_>, task_id: &str) -> Result<TaskDoc, TaskError> {
    tx.get::<TaskDoc>(task_id)?
        .ok_or_else(|| TaskError::NotFound(task_id.to_string()))
}

/// Loads a task and checks that `uid` posted it.
pub(crate) fn load_owned_in(
    tx: &mut Transaction<'_>,
    task_id: &str,
    uid: &str,
) -> Result<TaskDoc, TaskError> {
    let task = load_in(tx, task_id)?;
    ensure_owner(&task, uid)?;
    Ok(task)
}

pub(crate) fn ensure_owner(task: &TaskDoc, uid: &str) -> Result<(), TaskError> {
    if task.poster_id == uid {
        Ok(())
    } else {
        Err(TaskError::NotOwner {
            task_id: task.task_id.clone(),
            uid: uid.to_string(),
        })
    }
}

/// Moves `task` to `to` if its current status is one of `allowed`.
pub(crate) fn transition(
    tx: &mut Transaction<'_>,
    mut task: TaskDoc,
    allowed: &[TaskStatus],
    to: TaskStatus,
    action: &'static str,
) -> Result<TaskTransition, TaskError> {
    let from = task.status;
    if !allowed.contains(&from) {
        return Err(TaskError::WrongState {
            task_id: task.task_id,
            status: from,
            action,
        });
    }
    task.status = to;
    if !to.has_helper() {
        task.assigned_helper_id = None;
    }
    task.updated_at = tx.now();
    tx.set(&task)?;
    Ok(TaskTransition { task, from })
}

/// Assigns a listed task to the helper of an accepted offer.
///
/// Runs inside the acceptance transaction so that the task and the offer
/// change together. A task that is no longer listed fails with `NotOpen`.
pub fn assign_in(
    tx: &mut Transaction<'_>,
    task_id: &str,
    helper_id: &str,
    offer_id: &str,
    final_amount: u64,
) -> Result<TaskTransition, TaskError> {
    let mut task = load_in(tx, task_id)?;
    let from = task.status;
    if from != TaskStatus::Listed {
        return Err(TaskError::NotOpen {
            task_id: task.task_id,
            status: from,
        });
    }
    task.status = TaskStatus::Assigned;
    task.assigned_helper_id = Some(helper_id.to_string());
    task.accepted_offer_id = Some(offer_id.to_string());
    task.final_amount = Some(final_amount);
    task.updated_at = tx.now();
    tx.set(&task)?;
    Ok(TaskTransition { task, from })
}
